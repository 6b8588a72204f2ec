//! Background parse jobs: a queue abstraction plus the worker loop that
//! drains it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub mod worker;

pub use worker::{process_job, run_sweeper, run_worker};

pub const PARSE_QUEUE_KEY: &str = "resume_parse_jobs";

/// How long one `dequeue` call blocks before returning `None`.
pub const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a worker needs to parse one upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseJob {
    pub candidate_id: Uuid,
    /// Object storage path of the uploaded document.
    pub file_id: String,
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Queue error: {0}")]
    Queue(#[from] redis::RedisError),

    #[error("Job payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: ParseJob) -> Result<(), JobError>;

    /// Waits up to the poll timeout for a job.
    async fn dequeue(&self) -> Result<Option<ParseJob>, JobError>;
}

/// Redis list queue: producers `LPUSH`, workers `BRPOP`.
///
/// Each value owns one connection, so a worker blocked in `BRPOP` never
/// stalls another worker or the upload path.
pub struct RedisJobQueue {
    connection: redis::aio::MultiplexedConnection,
    key: String,
}

impl RedisJobQueue {
    pub async fn connect(client: &redis::Client) -> Result<Self, JobError> {
        let connection = client.get_multiplexed_tokio_connection().await?;
        Ok(Self {
            connection,
            key: PARSE_QUEUE_KEY.to_string(),
        })
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: ParseJob) -> Result<(), JobError> {
        let payload = serde_json::to_string(&job)?;
        let mut conn = self.connection.clone();
        redis::cmd("LPUSH")
            .arg(&self.key)
            .arg(payload)
            .query_async::<_, i64>(&mut conn)
            .await?;
        debug!("Enqueued parse job for candidate {}", job.candidate_id);
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<ParseJob>, JobError> {
        let mut conn = self.connection.clone();
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.key)
            .arg(DEQUEUE_TIMEOUT.as_secs())
            .query_async(&mut conn)
            .await?;

        match popped {
            Some((_, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}
