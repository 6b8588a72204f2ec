use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::candidate::{CandidateRecord, CandidateRow, NewCandidate, ParseStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Candidate {0} not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence for candidate rows and their parsed records.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn insert(&self, candidate: NewCandidate) -> Result<CandidateRow, StoreError>;

    async fn get(&self, candidate_id: Uuid) -> Result<Option<CandidateRow>, StoreError>;

    /// Newest first.
    async fn list(&self, limit: i64) -> Result<Vec<CandidateRow>, StoreError>;

    async fn set_status(
        &self,
        candidate_id: Uuid,
        status: ParseStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Stores the record and marks the row `complete` in one write.
    async fn complete(&self, candidate_id: Uuid, record: &CandidateRecord) -> Result<(), StoreError>;

    /// Marks every row sitting in an in-progress stage (anything past
    /// `received` and short of terminal) whose last update is older than
    /// `cutoff` as `failed`. Returns how many rows changed.
    async fn fail_stalled(&self, cutoff: DateTime<Utc>, message: &str) -> Result<u64, StoreError>;
}

/// Stages a live worker moves a row through.
pub const IN_PROGRESS: [ParseStatus; 4] = [
    ParseStatus::Extracting,
    ParseStatus::Prompting,
    ParseStatus::AwaitingModel,
    ParseStatus::Normalizing,
];

pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn insert(&self, candidate: NewCandidate) -> Result<CandidateRow, StoreError> {
        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates
                (id, candidate_id, file_id, filename, content_type, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(candidate.candidate_id)
        .bind(&candidate.file_id)
        .bind(&candidate.filename)
        .bind(&candidate.content_type)
        .bind(ParseStatus::Received.as_str())
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted candidate {}", row.candidate_id);
        Ok(row)
    }

    async fn get(&self, candidate_id: Uuid) -> Result<Option<CandidateRow>, StoreError> {
        Ok(
            sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE candidate_id = $1")
                .bind(candidate_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list(&self, limit: i64) -> Result<Vec<CandidateRow>, StoreError> {
        Ok(sqlx::query_as::<_, CandidateRow>(
            "SELECT * FROM candidates ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_status(
        &self,
        candidate_id: Uuid,
        status: ParseStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE candidates
            SET status = $2, error_message = $3, updated_at = now()
            WHERE candidate_id = $1
            "#,
        )
        .bind(candidate_id)
        .bind(status.as_str())
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(candidate_id));
        }
        Ok(())
    }

    async fn complete(&self, candidate_id: Uuid, record: &CandidateRecord) -> Result<(), StoreError> {
        let profile = serde_json::to_value(record)?;
        let result = sqlx::query(
            r#"
            UPDATE candidates
            SET status = $2, profile = $3, error_message = NULL, updated_at = now()
            WHERE candidate_id = $1
            "#,
        )
        .bind(candidate_id)
        .bind(ParseStatus::Complete.as_str())
        .bind(profile)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(candidate_id));
        }
        Ok(())
    }

    async fn fail_stalled(&self, cutoff: DateTime<Utc>, message: &str) -> Result<u64, StoreError> {
        let stages: Vec<&str> = IN_PROGRESS.iter().map(ParseStatus::as_str).collect();
        let result = sqlx::query(
            r#"
            UPDATE candidates
            SET status = $1, error_message = $2, updated_at = now()
            WHERE status = ANY($3) AND updated_at < $4
            "#,
        )
        .bind(ParseStatus::Failed.as_str())
        .bind(message)
        .bind(&stages)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
