use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{ExtractError, MediaType};
use crate::jobs::ParseJob;
use crate::models::candidate::{CandidateRecord, CandidateRow, NewCandidate, ParseStatus};
use crate::qa;
use crate::state::AppState;
use crate::storage::resume_object_key;

const LIST_LIMIT: i64 = 100;
const SUMMARY_SKILLS: usize = 5;

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_id: String,
    pub candidate_id: Uuid,
    pub filename: String,
    pub upload_time: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub candidate_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<String>,
    pub status: ParseStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&CandidateRow> for CandidateSummary {
    fn from(row: &CandidateRow) -> Self {
        let record = row.record();
        let experience_years = Some(record.experience.total_years.clone()).filter(|y| !y.is_empty());
        Self {
            id: row.id,
            candidate_id: row.candidate_id,
            name: record.display_name(),
            skills: record.skills.into_iter().take(SUMMARY_SKILLS).collect(),
            experience_years,
            status: row.parse_status(),
            created_at: row.created_at,
        }
    }
}

/// The full record plus row metadata, flattened into one object.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateDetail {
    pub id: Uuid,
    pub filename: String,
    pub status: ParseStatus,
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub record: CandidateRecord,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Tried ahead of the configured model chain.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub candidate_id: Uuid,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// POST /api/v1/upload
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(|f| f.trim().to_string());
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, content_type, bytes));
        break;
    }

    let (filename, content_type, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))?;
    let filename = filename
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::Validation("Uploaded file has no filename".to_string()))?;

    let max = state.config.max_upload_bytes;
    if bytes.len() > max {
        return Err(AppError::PayloadTooLarge(format!(
            "File is {} bytes; the limit is {max} bytes",
            bytes.len()
        )));
    }
    let media_type = MediaType::resolve(content_type.as_deref(), Some(&filename))?;
    if bytes.is_empty() {
        return Err(ExtractError::CorruptDocument("zero-byte document".to_string()).into());
    }

    let candidate_id = Uuid::new_v4();
    let key = resume_object_key(candidate_id, media_type.extension());
    let size = bytes.len();
    let file_id = state.blobs.store(bytes, &key, media_type.mime()).await?;

    let row = state
        .candidates
        .insert(NewCandidate {
            candidate_id,
            file_id: file_id.clone(),
            filename: filename.clone(),
            content_type: media_type.mime().to_string(),
        })
        .await?;

    let job = ParseJob {
        candidate_id,
        file_id: file_id.clone(),
        filename: filename.clone(),
        content_type: media_type.mime().to_string(),
    };
    if let Err(e) = state.jobs.enqueue(job).await {
        let message = format!("Failed to schedule processing: {e}");
        if let Err(store_err) = state
            .candidates
            .set_status(candidate_id, ParseStatus::Failed, Some(&message))
            .await
        {
            error!("Failed to mark candidate {candidate_id} as failed: {store_err}");
        }
        return Err(e.into());
    }

    info!("Accepted {filename} ({size} bytes) as candidate {candidate_id}");

    Ok(Json(UploadResponse {
        message: "File uploaded successfully and processing started".to_string(),
        file_id,
        candidate_id,
        filename,
        upload_time: row.created_at,
    }))
}

/// GET /api/v1/candidates
pub async fn handle_list_candidates(
    State(state): State<AppState>,
) -> Result<Json<Vec<CandidateSummary>>, AppError> {
    let rows = state.candidates.list(LIST_LIMIT).await?;
    Ok(Json(rows.iter().map(CandidateSummary::from).collect()))
}

async fn load_candidate(state: &AppState, candidate_id: Uuid) -> Result<CandidateRow, AppError> {
    state
        .candidates
        .get(candidate_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

/// GET /api/v1/candidates/:candidate_id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<CandidateDetail>, AppError> {
    let row = load_candidate(&state, candidate_id).await?;
    Ok(Json(CandidateDetail {
        id: row.id,
        filename: row.filename.clone(),
        status: row.parse_status(),
        error_message: row.error_message.clone(),
        record: row.record(),
    }))
}

/// POST /api/v1/candidates/:candidate_id/ask
pub async fn handle_ask(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(AppError::Validation("Question cannot be empty".to_string()));
    }

    let row = load_candidate(&state, candidate_id).await?;
    let status = row.parse_status();
    if status != ParseStatus::Complete {
        return Err(AppError::UnprocessableEntity(format!(
            "Candidate {candidate_id} is not ready (status: {})",
            status.as_str()
        )));
    }
    let record = row.record();
    if !record.has_content() {
        return Err(AppError::UnprocessableEntity(format!(
            "Candidate {candidate_id} has no parsed data to answer from"
        )));
    }

    let answer = qa::answer(&state.llm, &record, &req.question, req.model.as_deref()).await?;

    Ok(Json(AskResponse {
        question: req.question,
        answer,
        candidate_id,
    }))
}
