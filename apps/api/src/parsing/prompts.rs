// Resume extraction prompt templates.
// All prompts for the parsing module are defined here.

use crate::llm_client::prompts::{fill_template, Prompt, JSON_ONLY_SYSTEM};

/// Resume text beyond this many characters is cut before prompting.
pub const MAX_RESUME_CHARS: usize = 6000;

const EXTRACTION_MAX_TOKENS: u32 = 1500;
const EXTRACTION_TEMPERATURE: f32 = 0.1;

pub const RESUME_PARSE_SYSTEM: &str = "\
You are a resume parser that extracts structured candidate data. \
Report only what the resume states; never invent employers, dates, or skills.";

pub const RESUME_PARSE_PROMPT: &str = r#"Extract structured information from this resume and return ONLY valid JSON.

RESUME TEXT:
{resume_text}

OUTPUT SCHEMA (return exactly these keys; use "" or [] when not found):
{
  "introduction": "Full Name | Email: email@example.com | Phone: +1234567890",
  "education": {
    "degree": "Bachelor of Technology in Computer Science",
    "institution": "University Name",
    "field": "Computer Science",
    "year": "2023"
  },
  "experience": {
    "total_years": "3 years",
    "companies": "Company A, Company B",
    "positions": "Software Engineer, Developer"
  },
  "skills": ["Python", "JavaScript"],
  "hobbies": ["Reading", "Photography"],
  "certifications": ["AWS Certified Developer"],
  "projects": ["E-commerce Platform", "Chat Application"]
}

RULES:
1. All scalar values are strings; all list values are arrays of strings.
2. Do not add keys beyond the schema.
3. Return ONLY the JSON object, with no prose and no code fences."#;

/// First `MAX_RESUME_CHARS` characters of the text, never splitting a char.
pub fn truncate_resume_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_RESUME_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub fn build_extraction_prompt(text: &str) -> Prompt {
    let resume_text = truncate_resume_text(text);
    Prompt {
        system: format!("{RESUME_PARSE_SYSTEM} {JSON_ONLY_SYSTEM}"),
        user: fill_template(RESUME_PARSE_PROMPT, &[("resume_text", resume_text)]),
        max_tokens: EXTRACTION_MAX_TOKENS,
        temperature: EXTRACTION_TEMPERATURE,
    }
}
