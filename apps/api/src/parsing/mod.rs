pub mod normalizer;
pub mod pipeline;
pub mod prompts;

pub use pipeline::{ParseError, ResumeParser, StageReporter};
