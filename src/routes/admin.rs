use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, put},
};

/// Admin Router Module
///
/// The account-oversight endpoints nested under `/admin`. Every handler
/// here declares `Guard<AdminOnly>`, so a valid non-admin token receives
/// 403 uniformly.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/overview
        // The console's second statistics path; serves the same document as
        // /queries/admin/stats.
        .route("/overview", get(handlers::admin_overview))
        // GET /admin/users
        // All accounts, hashes omitted.
        .route("/users", get(handlers::admin_users))
        // PUT /admin/user/{id}/role
        // Promote or demote within the closed role set.
        .route("/user/{id}/role", put(handlers::change_role))
        // DELETE /admin/user/{id}
        // Account removal, refused while dependents exist.
        .route("/user/{id}", delete(handlers::delete_user))
}
