pub mod notify;

use crate::state::AppState;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/send", post(notify::send_notification))
        .route("/health", get(health_check))
        .with_state(state)
}
