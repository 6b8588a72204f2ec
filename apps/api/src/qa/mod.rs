//! Q&A over a stored candidate record.
//!
//! The answer is whatever the model says, returned verbatim; free-form
//! answers are the point of this endpoint.

use thiserror::Error;
use tracing::info;

use crate::llm_client::{LlmClient, LlmError};
use crate::models::candidate::CandidateRecord;

pub mod prompts;

use prompts::build_qa_prompt;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Unavailable(#[from] LlmError),
}

/// Answers `question` about `record`, trying `model` ahead of the configured
/// chain when given. Blank questions are rejected before the model is
/// contacted; any other question goes into the prompt exactly as asked.
pub async fn answer(
    llm: &LlmClient,
    record: &CandidateRecord,
    question: &str,
    model: Option<&str>,
) -> Result<String, QaError> {
    if question.trim().is_empty() {
        return Err(QaError::Validation("Question cannot be empty".to_string()));
    }

    info!(
        "Answering question for candidate {}: {}",
        record.candidate_id,
        question.trim().chars().take(100).collect::<String>()
    );

    let prompt = build_qa_prompt(record, question);
    let text = match model.map(str::trim).filter(|m| !m.is_empty()) {
        Some(model) => llm.complete_with_model(&prompt, model).await?,
        None => llm.complete(&prompt).await?,
    };
    Ok(text)
}
