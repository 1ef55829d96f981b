pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assembly::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/layouts", get(handlers::handle_list_layouts))
        .route("/api/v1/assemble", post(handlers::handle_assemble))
        .route(
            "/api/v1/assemble/loss-report",
            post(handlers::handle_loss_report),
        )
        .with_state(state)
}
