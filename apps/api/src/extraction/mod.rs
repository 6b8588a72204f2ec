//! Text extraction for uploaded resume documents.
//!
//! Callers hand over bytes plus a media type; this module returns plain text.
//! Corruption is never transient, so nothing here retries.

use thiserror::Error;
use tracing::{debug, warn};

mod docx;
mod pdf;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Document contains no extractable text")]
    EmptyText,
}

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Docx,
}

impl MediaType {
    /// Resolves a declared content type, falling back to the filename
    /// extension when the declaration is missing or generic.
    pub fn resolve(content_type: Option<&str>, filename: Option<&str>) -> Result<Self, ExtractError> {
        let declared = content_type
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty());

        match declared.as_deref() {
            Some(MIME_PDF) => return Ok(MediaType::Pdf),
            Some(MIME_DOCX) => return Ok(MediaType::Docx),
            None | Some("application/octet-stream") | Some("binary/octet-stream") => {}
            Some(other) => return Err(ExtractError::UnsupportedFormat(other.to_string())),
        }

        match filename.and_then(|f| f.rsplit_once('.')).map(|(_, ext)| ext.to_ascii_lowercase()) {
            Some(ext) if ext == "pdf" => Ok(MediaType::Pdf),
            Some(ext) if ext == "docx" => Ok(MediaType::Docx),
            Some(ext) => Err(ExtractError::UnsupportedFormat(format!(".{ext}"))),
            None => Err(ExtractError::UnsupportedFormat(
                declared.unwrap_or_else(|| "unknown".to_string()),
            )),
        }
    }

    /// Parses a stored MIME string, without any filename fallback.
    pub fn from_mime(mime: &str) -> Result<Self, ExtractError> {
        match mime {
            MIME_PDF => Ok(MediaType::Pdf),
            MIME_DOCX => Ok(MediaType::Docx),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => MIME_PDF,
            MediaType::Docx => MIME_DOCX,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Docx => "docx",
        }
    }
}

/// An uploaded document, owned by one pipeline invocation.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: bytes::Bytes,
    pub media_type: MediaType,
}

/// Extracts plain text from a document.
///
/// A zero-byte input is corrupt; a document that parses but yields only
/// whitespace fails with `EmptyText`.
pub fn extract(bytes: &[u8], media_type: MediaType) -> Result<String, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::CorruptDocument("zero-byte document".to_string()));
    }

    let text = match media_type {
        MediaType::Pdf => pdf::extract_pdf(bytes)?,
        MediaType::Docx => docx::extract_docx(bytes)?,
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        warn!("{:?} document produced no text", media_type);
        return Err(ExtractError::EmptyText);
    }

    debug!("Extracted {} characters from {:?}", text.chars().count(), media_type);
    Ok(text)
}

/// Runs [`extract`] on the blocking pool. A panic inside the PDF parser is
/// reported as a corrupt document instead of unwinding into the caller.
pub async fn extract_blocking(document: RawDocument) -> Result<String, ExtractError> {
    let RawDocument { bytes, media_type } = document;
    match tokio::task::spawn_blocking(move || extract(&bytes, media_type)).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ExtractError::CorruptDocument(
            "document parser aborted on malformed input".to_string(),
        )),
        Err(e) => Err(ExtractError::CorruptDocument(format!("extraction task failed: {e}"))),
    }
}
