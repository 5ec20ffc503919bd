//! LLM layer: applicability prompts, response extraction, and the chat-completions client.

pub mod extract;
pub mod profile;
pub mod prompts;

#[cfg(feature = "http")]
pub mod openai;

pub use extract::{PLACEHOLDER_REASON, extract_assessments, parse_control_section};
pub use profile::{OrganizationalProfile, decode_profile};

#[cfg(feature = "http")]
pub use openai::{AssessmentRequest, AssessmentRun, LlmConfig, LlmError, OpenAiClient};
