use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// The unauthenticated gateway endpoints plus the token smoke-test route.
/// Registration and login are the only operations that run without any
/// token; `/auth/profile` requires one of any role.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness endpoint for monitoring and load
        // balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        // Self-registration with an asserted role from the closed set.
        .route("/auth/register", post(handlers::register))
        // POST /auth/login
        // Credential check plus role assertion; returns the signed session
        // token on success.
        .route("/auth/login", post(handlers::login))
        // GET /auth/profile
        // Returns the identity and role claims of the presented token.
        .route("/auth/profile", get(handlers::profile))
}
