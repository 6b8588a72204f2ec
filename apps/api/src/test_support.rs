//! Fixtures and in-memory collaborators shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::candidates::store::{CandidateStore, StoreError, IN_PROGRESS};
use crate::config::{Config, LlmSettings};
use crate::jobs::{JobError, JobQueue, ParseJob};
use crate::llm_client::{LlmClient, ModelEndpoint, ModelError, Prompt};
use crate::models::candidate::{
    CandidateRecord, CandidateRow, Education, Experience, NewCandidate, ParseStatus,
};
use crate::parsing::StageReporter;
use crate::state::AppState;
use crate::storage::{BlobError, BlobStore};

// ---------- documents ----------

fn escape_pdf_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// A one-page PDF showing `text` in Helvetica, with a valid xref table.
pub fn minimal_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", escape_pdf_text(text));
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_at = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.extend_from_slice(xref.as_bytes());
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf
}

/// A ZIP archive holding the given (name, contents) entries.
pub fn zip_with_entries(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A DOCX whose `<w:body>` holds `body` verbatim.
pub fn docx_from_body(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    zip_with_entries(&[
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#,
        ),
        ("word/document.xml", &document),
    ])
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A DOCX with one single-run paragraph per entry.
pub fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            format!(
                r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                escape_xml(p)
            )
        })
        .collect();
    docx_from_body(&body)
}

// ---------- model doubles ----------

pub fn prompt() -> Prompt {
    Prompt {
        system: "Return JSON.".to_string(),
        user: "Resume text".to_string(),
        max_tokens: 100,
        temperature: 0.1,
    }
}

type FailFn = Box<dyn Fn() -> ModelError + Send + Sync>;

enum Script {
    Reply(String),
    Fail(FailFn),
    Hang,
}

/// A `ModelEndpoint` that answers per model name from a fixed script and
/// records every call. Unscripted models fail as unavailable.
#[derive(Default)]
pub struct ScriptedEndpoint {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<(String, Prompt)>>,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, model: &str, text: &str) -> Self {
        self.scripts
            .insert(model.to_string(), Script::Reply(text.to_string()));
        self
    }

    pub fn fail<F>(mut self, model: &str, error: F) -> Self
    where
        F: Fn() -> ModelError + Send + Sync + 'static,
    {
        self.scripts
            .insert(model.to_string(), Script::Fail(Box::new(error)));
        self
    }

    /// The model never answers; only the client's timeout ends the attempt.
    pub fn hang(mut self, model: &str) -> Self {
        self.scripts.insert(model.to_string(), Script::Hang);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(model, _)| model.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }
}

#[async_trait]
impl ModelEndpoint for ScriptedEndpoint {
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ModelError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.clone()));

        match self.scripts.get(model) {
            Some(Script::Reply(text)) => Ok(text.clone()),
            Some(Script::Fail(error)) => Err(error()),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ModelError::Unavailable("hung".to_string()))
            }
            None => Err(ModelError::Unavailable(format!("unscripted model {model}"))),
        }
    }
}

pub fn llm_with(endpoint: Arc<ScriptedEndpoint>, models: &[&str]) -> LlmClient {
    LlmClient::with_endpoint(
        endpoint,
        models.iter().map(|m| m.to_string()).collect(),
        Duration::from_millis(500),
    )
}

// ---------- pipeline reporters ----------

#[derive(Default)]
pub struct RecordingReporter {
    stages: Mutex<Vec<ParseStatus>>,
}

impl RecordingReporter {
    pub fn stages(&self) -> Vec<ParseStatus> {
        self.stages.lock().unwrap().clone()
    }
}

#[async_trait]
impl StageReporter for RecordingReporter {
    async fn report(&self, _candidate_id: Uuid, stage: ParseStatus, _detail: Option<&str>) {
        self.stages.lock().unwrap().push(stage);
    }
}

pub struct NoopReporter;

#[async_trait]
impl StageReporter for NoopReporter {
    async fn report(&self, _candidate_id: Uuid, _stage: ParseStatus, _detail: Option<&str>) {}
}

// ---------- records ----------

pub fn sample_record(candidate_id: Uuid) -> CandidateRecord {
    CandidateRecord {
        candidate_id,
        introduction: "Jane Doe | Email: jane@example.com".to_string(),
        education: Education {
            degree: "BSc Computer Science".to_string(),
            institution: "MIT".to_string(),
            field: "Computer Science".to_string(),
            year: "2019".to_string(),
        },
        experience: Experience {
            total_years: "5 years".to_string(),
            companies: "Acme, Initech".to_string(),
            positions: "Backend Engineer".to_string(),
        },
        skills: vec!["Rust".to_string(), "Go".to_string(), "SQL".to_string()],
        hobbies: vec!["Chess".to_string()],
        certifications: vec!["AWS Certified Developer".to_string()],
        projects: vec!["Search Engine".to_string()],
        created_at: Utc::now(),
    }
}

// ---------- in-memory collaborators ----------

/// Rows kept in insertion order; `list` returns newest first.
#[derive(Default)]
pub struct MemoryCandidateStore {
    rows: Mutex<Vec<CandidateRow>>,
    history: Mutex<HashMap<Uuid, Vec<ParseStatus>>>,
}

impl MemoryCandidateStore {
    /// Every status the row has been given, starting with `received`.
    pub fn history(&self, candidate_id: Uuid) -> Vec<ParseStatus> {
        self.history
            .lock()
            .unwrap()
            .get(&candidate_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Moves the row's last update into the past.
    pub fn backdate(&self, candidate_id: Uuid, by: chrono::Duration) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.candidate_id == candidate_id) {
            row.updated_at -= by;
        }
    }

    fn update<F>(&self, candidate_id: Uuid, status: ParseStatus, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut CandidateRow),
    {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.candidate_id == candidate_id)
            .ok_or(StoreError::NotFound(candidate_id))?;
        row.status = status.as_str().to_string();
        row.updated_at = Utc::now();
        apply(row);
        self.history
            .lock()
            .unwrap()
            .entry(candidate_id)
            .or_default()
            .push(status);
        Ok(())
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn insert(&self, candidate: NewCandidate) -> Result<CandidateRow, StoreError> {
        let now = Utc::now();
        let row = CandidateRow {
            id: Uuid::new_v4(),
            candidate_id: candidate.candidate_id,
            file_id: candidate.file_id,
            filename: candidate.filename,
            content_type: candidate.content_type,
            status: ParseStatus::Received.as_str().to_string(),
            error_message: None,
            profile: None,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(row.clone());
        self.history
            .lock()
            .unwrap()
            .insert(row.candidate_id, vec![ParseStatus::Received]);
        Ok(row)
    }

    async fn get(&self, candidate_id: Uuid) -> Result<Option<CandidateRow>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.candidate_id == candidate_id)
            .cloned())
    }

    async fn list(&self, limit: i64) -> Result<Vec<CandidateRow>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn set_status(
        &self,
        candidate_id: Uuid,
        status: ParseStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let error_message = error_message.map(str::to_string);
        self.update(candidate_id, status, |row| row.error_message = error_message)
    }

    async fn complete(&self, candidate_id: Uuid, record: &CandidateRecord) -> Result<(), StoreError> {
        let profile = serde_json::to_value(record)?;
        self.update(candidate_id, ParseStatus::Complete, |row| {
            row.profile = Some(profile);
            row.error_message = None;
        })
    }

    async fn fail_stalled(&self, cutoff: DateTime<Utc>, message: &str) -> Result<u64, StoreError> {
        let stalled: Vec<Uuid> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| IN_PROGRESS.contains(&r.parse_status()) && r.updated_at < cutoff)
            .map(|r| r.candidate_id)
            .collect();
        for candidate_id in &stalled {
            self.update(*candidate_id, ParseStatus::Failed, |row| {
                row.error_message = Some(message.to_string())
            })?;
        }
        Ok(stalled.len() as u64)
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn put(&self, path: &str, bytes: Bytes) {
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(
        &self,
        bytes: Bytes,
        suggested_path: &str,
        _content_type: &str,
    ) -> Result<String, BlobError> {
        self.put(suggested_path, bytes);
        Ok(suggested_path.to_string())
    }

    async fn fetch(&self, storage_path: &str) -> Result<Bytes, BlobError> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_path)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(storage_path.to_string()))
    }
}

/// FIFO queue that never blocks: an empty queue dequeues `None`.
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<VecDeque<ParseJob>>,
}

impl MemoryJobQueue {
    pub fn pending(&self) -> Vec<ParseJob> {
        self.jobs.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: ParseJob) -> Result<(), JobError> {
        self.jobs.lock().unwrap().push_back(job);
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<ParseJob>, JobError> {
        Ok(self.jobs.lock().unwrap().pop_front())
    }
}

// ---------- application ----------

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        redis_url: "redis://localhost".to_string(),
        s3_bucket: "resumes".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        s3_region: "us-east-1".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        llm: LlmSettings {
            api_key: "test".to_string(),
            base_url: "http://localhost:1".to_string(),
            models: vec!["primary".to_string()],
            timeout: Duration::from_millis(500),
        },
        max_upload_bytes: 64 * 1024,
        worker_concurrency: 1,
        stalled_job_after: Duration::from_secs(900),
        port: 0,
        rust_log: "debug".to_string(),
    }
}

/// An `AppState` over in-memory collaborators, with handles kept for
/// assertions.
pub struct TestApp {
    pub state: AppState,
    pub candidates: Arc<MemoryCandidateStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub jobs: Arc<MemoryJobQueue>,
    pub endpoint: Arc<ScriptedEndpoint>,
}

impl TestApp {
    pub fn new(endpoint: ScriptedEndpoint) -> Self {
        let candidates = Arc::new(MemoryCandidateStore::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let jobs = Arc::new(MemoryJobQueue::default());
        let endpoint = Arc::new(endpoint);
        let state = AppState {
            candidates: candidates.clone(),
            blobs: blobs.clone(),
            jobs: jobs.clone(),
            llm: llm_with(endpoint.clone(), &["primary"]),
            config: test_config(),
        };
        Self {
            state,
            candidates,
            blobs,
            jobs,
            endpoint,
        }
    }
}
