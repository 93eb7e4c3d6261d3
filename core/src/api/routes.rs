//! API Routes
//!
//! Router configuration for the HTTP API.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::handlers::{self, ApiState};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Elections
        .route("/elections", post(handlers::create_election))
        .route("/elections/{id}", get(handlers::get_election))
        .route("/elections/{id}/finalize", post(handlers::finalize_election))
        .route("/elections/{id}/cast", post(handlers::cast_vote))
        // Roster management
        .route("/roster/register", post(handlers::register_voter))
        .route("/roster/remove", post(handlers::remove_voter))
        .route("/roster/root", get(handlers::roster_root))
        // Eligibility query surface
        .route("/eligibility/proof", post(handlers::eligibility_proof))
        // CORS
        .layer(CorsLayer::permissive())
        .with_state(state)
}
