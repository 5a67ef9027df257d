use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;

// Module for routing segregation (public gateway, queries, admin console).
pub mod routes;
use routes::{admin, public, queries};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point
// and to the integration tests.
pub use auth::TokenIssuer;
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generated OpenAPI documentation, aggregating every handler
/// decorated with `#[utoipa::path]` and the schemas used in request and
/// response bodies. Served as JSON at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::profile,
        handlers::list_queries, handlers::get_query, handlers::my_queries,
        handlers::create_query, handlers::respond, handlers::my_responses,
        handlers::admin_stats, handlers::admin_overview, handlers::admin_queries,
        handlers::admin_users, handlers::add_user, handlers::suspend_user,
        handlers::unsuspend_user, handlers::delete_user, handlers::change_role,
        handlers::delete_query, handlers::delete_response,
    ),
    components(
        schemas(
            models::Role, models::AccountView, models::QueryView, models::ResponseView,
            models::FacultyResponseView, models::AdminStats,
            models::RegisterRequest, models::LoginRequest, models::NewQueryRequest,
            models::RespondRequest, models::AddUserRequest, models::ChangeRoleRequest,
            models::MessageResponse, models::LoginResponse, models::ProfileResponse,
            models::QueryCreatedResponse, models::ResponseCreatedResponse,
            models::UserCreatedResponse,
        )
    ),
    tags(
        (name = "fact-forum", description = "Role-based Q&A forum API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container holding every shared service: the
/// repository, the token issuer, and the loaded configuration. Cloned per
/// request by Axum; all members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer behind the `Repository` trait object.
    pub repo: RepositoryState,
    /// Session token issuing and verification.
    pub tokens: TokenIssuer,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Allow extractors and handlers to pull individual components out of the
// shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(app_state: &AppState) -> TokenIssuer {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global
/// middleware, and registers the application state. The route prefixes
/// mirror the service's three sub-APIs: `/auth` and `/health` at the top
/// level, query operations under `/queries`, account oversight under
/// `/admin`.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Gateway routes: health, register, login, profile.
        .merge(public::public_routes())
        // Query operations, including the admin console sub-paths.
        // axum 0.8's `nest` exposes the inner `/` route at `/queries` only,
        // not at the trailing-slash `/queries/` form the listing is
        // documented under; register the listing explicitly so both resolve.
        .route("/queries/", axum::routing::get(handlers::list_queries))
        .nest("/queries", queries::query_routes())
        // Account oversight console.
        .nest("/admin", admin::admin_routes())
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID per request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: spans the request/response lifecycle,
                // correlated by the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer, outermost.
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes `TraceLayer` span creation: includes the `x-request-id`
/// header in the structured logging metadata alongside method and URI, so
/// every log line of one request shares a correlation ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
