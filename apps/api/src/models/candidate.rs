use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Education block of a candidate. Every member is always present; unknown
/// values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub year: String,
}

impl Education {
    pub fn is_empty(&self) -> bool {
        self.degree.is_empty()
            && self.institution.is_empty()
            && self.field.is_empty()
            && self.year.is_empty()
    }
}

/// Work experience summary as reported by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub total_years: String,
    #[serde(default)]
    pub companies: String,
    #[serde(default)]
    pub positions: String,
}

impl Experience {
    pub fn is_empty(&self) -> bool {
        self.total_years.is_empty() && self.companies.is_empty() && self.positions.is_empty()
    }
}

/// The normalized candidate record produced by the parsing pipeline.
///
/// Serialization always emits every key so consumers see a stable shape,
/// even for a candidate whose parse never completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub candidate_id: Uuid,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub education: Education,
    #[serde(default)]
    pub experience: Experience,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub hobbies: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// A record with every field at its empty default.
    pub fn empty(candidate_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            candidate_id,
            introduction: String::new(),
            education: Education::default(),
            experience: Experience::default(),
            skills: Vec::new(),
            hobbies: Vec::new(),
            certifications: Vec::new(),
            projects: Vec::new(),
            created_at,
        }
    }

    /// True if at least one field carries something a question could be
    /// answered from.
    pub fn has_content(&self) -> bool {
        !self.introduction.trim().is_empty()
            || !self.education.is_empty()
            || !self.experience.is_empty()
            || !self.skills.is_empty()
            || !self.hobbies.is_empty()
            || !self.certifications.is_empty()
            || !self.projects.is_empty()
    }

    /// Best-effort candidate name: the introduction up to the first `|`
    /// (or `Email:`), when it is short enough to plausibly be a name.
    pub fn display_name(&self) -> Option<String> {
        let intro = self.introduction.trim();
        if intro.is_empty() {
            return None;
        }
        let name = match intro.split_once('|') {
            Some((head, _)) => head,
            None => intro.split("Email:").next().unwrap_or(intro),
        }
        .trim();
        if name.is_empty() || name.chars().count() > 50 {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// Lifecycle of a stored candidate, mirroring the parsing pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Received,
    Extracting,
    Prompting,
    AwaitingModel,
    Normalizing,
    Complete,
    Failed,
}

impl ParseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStatus::Received => "received",
            ParseStatus::Extracting => "extracting",
            ParseStatus::Prompting => "prompting",
            ParseStatus::AwaitingModel => "awaiting_model",
            ParseStatus::Normalizing => "normalizing",
            ParseStatus::Complete => "complete",
            ParseStatus::Failed => "failed",
        }
    }

    /// Parses the stored column value. Unknown values read as `Failed` so a
    /// corrupted row never looks like work in progress.
    pub fn from_db(value: &str) -> Self {
        match value {
            "received" => ParseStatus::Received,
            "extracting" => ParseStatus::Extracting,
            "prompting" => ParseStatus::Prompting,
            "awaiting_model" => ParseStatus::AwaitingModel,
            "normalizing" => ParseStatus::Normalizing,
            "complete" => ParseStatus::Complete,
            _ => ParseStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ParseStatus::Complete | ParseStatus::Failed)
    }
}

/// A row of the `candidates` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub file_id: String,
    pub filename: String,
    pub content_type: String,
    pub status: String,
    pub error_message: Option<String>,
    pub profile: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRow {
    pub fn parse_status(&self) -> ParseStatus {
        ParseStatus::from_db(&self.status)
    }

    /// The stored record, or an empty-default record while the parse is
    /// pending or after it failed.
    pub fn record(&self) -> CandidateRecord {
        self.profile
            .as_ref()
            .and_then(|v| serde_json::from_value::<CandidateRecord>(v.clone()).ok())
            .unwrap_or_else(|| CandidateRecord::empty(self.candidate_id, self.created_at))
    }
}

/// Values needed to create a candidate row at upload time.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub candidate_id: Uuid,
    pub file_id: String,
    pub filename: String,
    pub content_type: String,
}
