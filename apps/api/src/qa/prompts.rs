// Candidate Q&A prompt templates.

use crate::llm_client::prompts::{fill_template, Prompt};
use crate::models::candidate::CandidateRecord;

const QA_MAX_TOKENS: u32 = 200;
const QA_TEMPERATURE: f32 = 0.3;

const MAX_SKILLS: usize = 20;
const MAX_PROJECTS: usize = 8;
const MAX_HOBBIES: usize = 15;
const MAX_CERTIFICATIONS: usize = 10;

pub const QA_SYSTEM: &str = "\
You are a helpful assistant answering questions about job candidates. \
Be concise and direct.";

pub const QA_PROMPT: &str = r#"Answer this question about a job candidate concisely.

CANDIDATE INFORMATION:
{context}

QUESTION: {question}

Answer using ONLY the candidate information above. If it does not contain the answer, say so. Keep it brief (1-2 sentences)."#;

fn capped(items: &[String], max: usize) -> String {
    items
        .iter()
        .take(max)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders a record as labelled lines for the model. Empty sections are
/// left out rather than shown as blanks.
pub fn render_candidate_context(record: &CandidateRecord) -> String {
    let mut lines = Vec::new();

    if !record.introduction.trim().is_empty() {
        if let Some(name) = record.display_name() {
            lines.push(format!("Name: {name}"));
        }
        lines.push(format!("Contact: {}", record.introduction.trim()));
    }

    let edu = &record.education;
    let mut edu_parts = Vec::new();
    if !edu.degree.is_empty() {
        edu_parts.push(edu.degree.clone());
    }
    if !edu.institution.is_empty() {
        edu_parts.push(format!("from {}", edu.institution));
    }
    if !edu.field.is_empty() {
        edu_parts.push(format!("in {}", edu.field));
    }
    if !edu.year.is_empty() {
        edu_parts.push(format!("({})", edu.year));
    }
    if !edu_parts.is_empty() {
        lines.push(format!("Education: {}", edu_parts.join(" ")));
    }

    let exp = &record.experience;
    let exp_parts: Vec<String> = [
        ("total years", &exp.total_years),
        ("companies", &exp.companies),
        ("positions", &exp.positions),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(label, value)| format!("{label}: {value}"))
    .collect();
    if !exp_parts.is_empty() {
        lines.push(format!("Experience: {}", exp_parts.join(", ")));
    }

    if !record.skills.is_empty() {
        lines.push(format!("Skills: {}", capped(&record.skills, MAX_SKILLS)));
    }
    if !record.projects.is_empty() {
        lines.push(format!("Projects: {}", capped(&record.projects, MAX_PROJECTS)));
    }
    if !record.hobbies.is_empty() {
        lines.push(format!("Hobbies: {}", capped(&record.hobbies, MAX_HOBBIES)));
    }
    if !record.certifications.is_empty() {
        lines.push(format!(
            "Certifications: {}",
            capped(&record.certifications, MAX_CERTIFICATIONS)
        ));
    }

    lines.join("\n")
}

pub fn build_qa_prompt(record: &CandidateRecord, question: &str) -> Prompt {
    let context = render_candidate_context(record);
    Prompt {
        system: QA_SYSTEM.to_string(),
        user: fill_template(QA_PROMPT, &[("context", context.as_str()), ("question", question)]),
        max_tokens: QA_MAX_TOKENS,
        temperature: QA_TEMPERATURE,
    }
}
