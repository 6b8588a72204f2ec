use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::candidates::store::{CandidateStore, StoreError};
use crate::extraction::{MediaType, RawDocument};
use crate::jobs::{JobQueue, ParseJob};
use crate::models::candidate::ParseStatus;
use crate::parsing::{ResumeParser, StageReporter};
use crate::storage::BlobStore;

/// Pause after a queue error before polling again.
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(2);

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub const STALLED_MESSAGE: &str = "Processing was interrupted before completion";

/// Persists pipeline stages onto the candidate row.
///
/// `Received` is written at insert time. `Complete` is written together
/// with the record, so a reader never sees a complete row without a profile.
pub struct StoreReporter {
    store: Arc<dyn CandidateStore>,
}

impl StoreReporter {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StageReporter for StoreReporter {
    async fn report(&self, candidate_id: Uuid, stage: ParseStatus, detail: Option<&str>) {
        if matches!(stage, ParseStatus::Received | ParseStatus::Complete) {
            return;
        }
        if let Err(e) = self.store.set_status(candidate_id, stage, detail).await {
            warn!(
                "Failed to record stage {} for candidate {candidate_id}: {e}",
                stage.as_str()
            );
        }
    }
}

/// Runs one job end to end. Every failure lands on the row as `failed`;
/// nothing is returned to the caller.
pub async fn process_job(
    job: ParseJob,
    blobs: &dyn BlobStore,
    store: Arc<dyn CandidateStore>,
    parser: &ResumeParser,
) {
    let candidate_id = job.candidate_id;
    info!("Processing {} for candidate {candidate_id}", job.filename);

    let mark_failed = |message: String| {
        let store = store.clone();
        async move {
            error!("Parse failed for candidate {candidate_id}: {message}");
            if let Err(e) = store
                .set_status(candidate_id, ParseStatus::Failed, Some(&message))
                .await
            {
                error!("Failed to mark candidate {candidate_id} as failed: {e}");
            }
        }
    };

    let created_at = match store.get(candidate_id).await {
        Ok(Some(row)) if row.parse_status().is_terminal() => {
            warn!(
                "Skipping job for candidate {candidate_id}: already {}",
                row.status
            );
            return;
        }
        Ok(Some(row)) => row.created_at,
        Ok(None) => {
            warn!("Skipping job for unknown candidate {candidate_id}");
            return;
        }
        Err(e) => return mark_failed(format!("Failed to load candidate: {e}")).await,
    };

    let media_type = match MediaType::from_mime(&job.content_type) {
        Ok(media_type) => media_type,
        Err(e) => return mark_failed(e.to_string()).await,
    };

    let bytes = match blobs.fetch(&job.file_id).await {
        Ok(bytes) => bytes,
        Err(e) => return mark_failed(e.to_string()).await,
    };

    let reporter = StoreReporter::new(store.clone());
    let document = RawDocument { bytes, media_type };

    // The parser already reported `Failed` with its message on error.
    let record = match parser
        .parse_resume(candidate_id, created_at, document, &reporter)
        .await
    {
        Ok(record) => record,
        Err(e) => {
            warn!("Candidate {candidate_id} left as failed: {e}");
            return;
        }
    };

    match store.complete(candidate_id, &record).await {
        Ok(()) => info!("Candidate {candidate_id} complete"),
        Err(e) => mark_failed(format!("Failed to store parsed record: {e}")).await,
    }
}

/// Marks rows stuck in an in-progress stage for longer than `stalled_after`
/// as failed. A job popped by a worker that then died leaves its row in such
/// a stage with nothing left to finish it. Rows still `received` are waiting
/// in the queue and are left alone.
pub async fn sweep_stalled(
    store: &dyn CandidateStore,
    stalled_after: chrono::Duration,
) -> Result<u64, StoreError> {
    let cutoff = Utc::now() - stalled_after;
    let swept = store.fail_stalled(cutoff, STALLED_MESSAGE).await?;
    if swept > 0 {
        warn!("Marked {swept} stalled candidate(s) as failed");
    }
    Ok(swept)
}

/// Runs [`sweep_stalled`] once at startup and then every `SWEEP_INTERVAL`.
pub async fn run_sweeper(store: Arc<dyn CandidateStore>, stalled_after: chrono::Duration) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = sweep_stalled(store.as_ref(), stalled_after).await {
            error!("Stalled-job sweep failed: {e}");
        }
    }
}

/// Worker loop: pops jobs until the process exits. Each worker owns its
/// queue value and therefore its own connection.
pub async fn run_worker(
    worker_id: usize,
    queue: Arc<dyn JobQueue>,
    blobs: Arc<dyn BlobStore>,
    store: Arc<dyn CandidateStore>,
    parser: ResumeParser,
) {
    info!("Parse worker {worker_id} started");
    loop {
        match queue.dequeue().await {
            Ok(Some(job)) => process_job(job, blobs.as_ref(), store.clone(), &parser).await,
            Ok(None) => {}
            Err(e) => {
                error!("Worker {worker_id} queue error: {e}");
                tokio::time::sleep(QUEUE_ERROR_BACKOFF).await;
            }
        }
    }
}
