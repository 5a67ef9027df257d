use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// Queries Router Module
///
/// Everything nested under `/queries`: the anonymous-readable listings, the
/// student submission flow, the faculty response flow, and the admin query
/// console the source exposed under the same prefix.
///
/// Static segments (`/my`, `/new`, `/respond`, `/responses`, `/admin`) take
/// precedence over the trailing `/{id}` capture.
pub fn query_routes() -> Router<AppState> {
    Router::new()
        // GET /queries/
        // All queries with their responses. Anonymous access permitted; a
        // presented token is verified but never required.
        .route("/", get(handlers::list_queries))
        // GET /queries/my
        // The authenticated student's own queries.
        .route("/my", get(handlers::my_queries))
        // POST /queries/new
        // Student-only query submission.
        .route("/new", post(handlers::create_query))
        // POST /queries/respond/{id}
        // Faculty-only response submission; first response marks the query
        // answered.
        .route("/respond/{id}", post(handlers::respond))
        // GET /queries/responses/my
        // The authenticated faculty member's own responses.
        .route("/responses/my", get(handlers::my_responses))
        // --- Admin console sub-paths ---
        // GET /queries/admin/stats
        // Dashboard counters, both answered metrics included.
        .route("/admin/stats", get(handlers::admin_stats))
        // GET /queries/admin/queries
        // Admin view of all queries with responses.
        .route("/admin/queries", get(handlers::admin_queries))
        // GET /queries/admin/users
        // All accounts, hashes omitted.
        .route("/admin/users", get(handlers::admin_users))
        // POST /queries/admin/add_user
        // Direct account creation with any role, including admin.
        .route("/admin/add_user", post(handlers::add_user))
        // PATCH /queries/admin/{suspend|unsuspend}_user/{id}
        // Toggles the active flag; idempotent in both directions.
        .route("/admin/suspend_user/{id}", patch(handlers::suspend_user))
        .route("/admin/unsuspend_user/{id}", patch(handlers::unsuspend_user))
        // DELETE /queries/admin/delete_user/{id}
        // Account removal, refused while the account owns queries or
        // responses.
        .route("/admin/delete_user/{id}", delete(handlers::delete_user))
        // DELETE /queries/admin/delete_query/{id}
        // Two-phase cascade: responses first, then the query.
        .route("/admin/delete_query/{id}", delete(handlers::delete_query))
        // DELETE /queries/admin/delete_response/{id}
        // Single response removal; the answered flag stays as it is.
        .route(
            "/admin/delete_response/{id}",
            delete(handlers::delete_response),
        )
        // GET /queries/{id}
        // A single query with its ordered responses. Anonymous access
        // permitted.
        .route("/{id}", get(handlers::get_query))
}
