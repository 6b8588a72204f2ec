pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::candidates::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/api/v1/upload", post(handlers::handle_upload))
        .route("/api/v1/candidates", get(handlers::handle_list_candidates))
        .route(
            "/api/v1/candidates/:candidate_id",
            get(handlers::handle_get_candidate),
        )
        .route(
            "/api/v1/candidates/:candidate_id/ask",
            post(handlers::handle_ask),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
