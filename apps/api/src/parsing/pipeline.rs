use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::extraction::{extract_blocking, ExtractError, RawDocument};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::candidate::{CandidateRecord, ParseStatus};
use crate::parsing::normalizer::normalize;
use crate::parsing::prompts::build_extraction_prompt;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Document contains no extractable text")]
    EmptyText,

    #[error(transparent)]
    Unavailable(#[from] LlmError),
}

impl From<ExtractError> for ParseError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::UnsupportedFormat(m) => ParseError::UnsupportedFormat(m),
            ExtractError::CorruptDocument(m) => ParseError::CorruptDocument(m),
            ExtractError::EmptyText => ParseError::EmptyText,
        }
    }
}

/// Receives pipeline stage transitions. Reporting is best-effort: an
/// implementation logs its own failures and never aborts the parse.
#[async_trait]
pub trait StageReporter: Send + Sync {
    async fn report(&self, candidate_id: Uuid, stage: ParseStatus, detail: Option<&str>);
}

/// Extractor, prompt builder, model and normalizer, in that order.
///
/// Stages: Received -> Extracting -> Prompting -> AwaitingModel ->
/// Normalizing -> Complete. Extraction failure and model exhaustion go
/// straight to Failed; normalization cannot fail.
#[derive(Clone)]
pub struct ResumeParser {
    llm: LlmClient,
}

impl ResumeParser {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// `created_at` is the candidate's creation time; the returned record
    /// carries it unchanged.
    pub async fn parse_resume(
        &self,
        candidate_id: Uuid,
        created_at: DateTime<Utc>,
        document: RawDocument,
        reporter: &dyn StageReporter,
    ) -> Result<CandidateRecord, ParseError> {
        reporter.report(candidate_id, ParseStatus::Received, None).await;

        reporter.report(candidate_id, ParseStatus::Extracting, None).await;
        let text = match extract_blocking(document).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Extraction failed for candidate {candidate_id}: {e}");
                let message = e.to_string();
                reporter
                    .report(candidate_id, ParseStatus::Failed, Some(&message))
                    .await;
                return Err(e.into());
            }
        };

        reporter.report(candidate_id, ParseStatus::Prompting, None).await;
        let prompt = build_extraction_prompt(&text);

        reporter.report(candidate_id, ParseStatus::AwaitingModel, None).await;
        let raw = match self.llm.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                let message = e.to_string();
                reporter
                    .report(candidate_id, ParseStatus::Failed, Some(&message))
                    .await;
                return Err(e.into());
            }
        };

        reporter.report(candidate_id, ParseStatus::Normalizing, None).await;
        let record = normalize(&raw, candidate_id, created_at);

        info!(
            "Parsed candidate {candidate_id}: {} skills, {} projects, {} certifications",
            record.skills.len(),
            record.projects.len(),
            record.certifications.len()
        );
        reporter.report(candidate_id, ParseStatus::Complete, None).await;

        Ok(record)
    }
}
