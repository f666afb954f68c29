//! HTTP API handlers

mod agent;
mod health;
mod reconcile;
mod workspace;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Agent routes
        .route("/agents", post(agent::create_agent))
        .route("/agents/{id}", get(agent::get_agent))
        .route("/agents/{id}/config", get(agent::get_agent_config))
        .route("/agents/{id}/config", put(agent::set_agent_config))
        .route("/agents/{id}/reconcile", post(reconcile::reconcile))
        // Workspace routes
        .route("/workspaces", post(workspace::create_workspace))
        .route("/workspaces", get(workspace::list_workspaces))
        .route("/workspaces/{id}", get(workspace::get_workspace))
        .route("/workspaces/{id}", patch(workspace::update_workspace));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
