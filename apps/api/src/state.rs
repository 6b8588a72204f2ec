use std::sync::Arc;

use crate::candidates::store::CandidateStore;
use crate::config::Config;
use crate::jobs::JobQueue;
use crate::llm_client::LlmClient;
use crate::storage::BlobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub candidates: Arc<dyn CandidateStore>,
    pub blobs: Arc<dyn BlobStore>,
    /// Producer side of the parse queue; workers hold their own handles.
    pub jobs: Arc<dyn JobQueue>,
    pub llm: LlmClient,
    pub config: Config,
}
