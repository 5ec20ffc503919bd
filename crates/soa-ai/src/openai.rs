//! Chat-completions client for applicability assessment and systems descriptions.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use soa_core::{AssessmentResult, ContextEntry, ControlRef};
use thiserror::Error;
use tracing::info;

use crate::extract::extract_assessments;
use crate::profile::{OrganizationalProfile, decode_profile};
use crate::prompts;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM API key not configured")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM server returned {status}: {body}")]
    Server { status: u16, body: String },
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Input to a two-phase assessment run.
#[derive(Debug, Clone)]
pub struct AssessmentRequest {
    pub context_entries: Vec<ContextEntry>,
    pub controls: Vec<ControlRef>,
}

/// Output of a two-phase assessment run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRun {
    pub results: Vec<AssessmentResult>,
    pub organizational_profile: OrganizationalProfile,
    pub total_processed: usize,
    pub processing_time_ms: u64,
}

impl AssessmentRun {
    pub fn required_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_required).count()
    }

    pub fn not_required_count(&self) -> usize {
        self.results.len() - self.required_count()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_completion_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible chat-completions API.
pub struct OpenAiClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenAiClient {
    /// `config.base_url` should be like `https://api.openai.com/v1`; a trailing slash is removed.
    pub fn new(mut config: LlmConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Send one system + user exchange and return the first choice's text, trimmed.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        if self.config.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_completion_tokens: max_tokens,
        };

        info!(url = %url, model = %self.config.model, max_tokens, "requesting completion");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();
        Ok(text.trim().to_string())
    }

    /// Phase 1: distil the context entries into an organisational profile.
    pub async fn analyze_context(
        &self,
        entries: &[ContextEntry],
    ) -> Result<OrganizationalProfile, LlmError> {
        let text = self
            .complete(
                prompts::CONTEXT_ANALYSIS_SYSTEM_PROMPT,
                &prompts::build_context_analysis_prompt(entries),
                0.1,
                2000,
            )
            .await?;
        Ok(decode_profile(&text))
    }

    /// Run context analysis then control assessment, returning one verdict per control.
    pub async fn assess_controls(
        &self,
        request: &AssessmentRequest,
    ) -> Result<AssessmentRun, LlmError> {
        if self.config.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let start = Instant::now();

        info!(entries = request.context_entries.len(), "phase 1: context analysis");
        let profile = self.analyze_context(&request.context_entries).await?;

        info!(controls = request.controls.len(), "phase 2: control assessment");
        let text = self
            .complete(
                prompts::ASSESSMENT_SYSTEM_PROMPT,
                &prompts::build_assessment_prompt(&profile, &request.controls),
                0.2,
                4000,
            )
            .await?;

        let results = extract_assessments(&text, &request.controls);
        let run = AssessmentRun {
            total_processed: results.len(),
            results,
            organizational_profile: profile,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            total = run.total_processed,
            required = run.required_count(),
            not_required = run.not_required_count(),
            elapsed_ms = run.processing_time_ms,
            "assessment complete"
        );
        Ok(run)
    }

    /// Generate a prose systems description from the organisation's context entries.
    pub async fn generate_systems_description(
        &self,
        entries: &[ContextEntry],
    ) -> Result<String, LlmError> {
        self.complete(
            prompts::SYSTEMS_DESCRIPTION_SYSTEM_PROMPT,
            &prompts::build_systems_description_prompt(entries),
            0.2,
            1000,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let mut config = LlmConfig::new("sk-test");
        config.base_url = "http://localhost:8080/v1/".into();
        let client = OpenAiClient::new(config);
        assert_eq!(client.config.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn config_defaults() {
        let config = LlmConfig::new("sk-test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn chat_request_shape() {
        let body = ChatRequest {
            model: "gpt-4-turbo",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "usr",
                },
            ],
            temperature: 0.5,
            max_completion_tokens: 100,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["max_completion_tokens"], 100);
    }

    #[test]
    fn chat_response_tolerates_missing_content() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{}}]}"#).unwrap();
        assert!(parsed.choices[0].message.as_ref().unwrap().content.is_none());
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[tokio::test]
    async fn missing_key_fails_before_request() {
        let client = OpenAiClient::new(LlmConfig::new(""));
        let err = client
            .assess_controls(&AssessmentRequest {
                context_entries: vec![],
                controls: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[test]
    fn run_counts() {
        let run = AssessmentRun {
            results: vec![
                AssessmentResult::required("5.1"),
                AssessmentResult {
                    control_number: "5.2".into(),
                    is_required: false,
                    reason: Some("n/a".into()),
                },
            ],
            organizational_profile: OrganizationalProfile::fallback(),
            total_processed: 2,
            processing_time_ms: 10,
        };
        assert_eq!(run.required_count(), 1);
        assert_eq!(run.not_required_count(), 1);
    }
}
