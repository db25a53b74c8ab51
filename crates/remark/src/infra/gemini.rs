//! Client for the Gemini `generateContent` API.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infra::config::Config;

/// Something that turns a prompt into generated text.
///
/// `Ok(None)` means the call succeeded but the model produced no text.
pub trait GenerativeClient: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Option<String>, ClientError>> + Send;
}

/// Errors from the generative-language API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no Gemini API key configured; set GEMINI_API_KEY or [api] api_key")]
    MissingApiKey,

    #[error("request to Gemini failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Gemini returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse Gemini response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl GeminiConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            model: config.defaults.model.clone(),
            api_key: config.api.api_key.clone(),
        }
    }

    /// Full `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// HTTP client for a single Gemini model. No timeout and no retries are applied.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl GenerativeClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, ClientError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ClientError::MissingApiKey)?;

        let url = self.config.endpoint();
        tracing::info!(model = %self.config.model, chars = prompt.chars().count(), "sending prompt to Gemini");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = api_error_message(&body);
            tracing::warn!(status = status.as_u16(), %message, "Gemini request rejected");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        Ok(parsed.text())
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn from_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate, if any.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GeminiConfig {
        GeminiConfig {
            base_url: "https://generativelanguage.googleapis.com/v1beta/".into(),
            model: "gemini-2.5-flash".into(),
            api_key: None,
        }
    }

    #[test]
    fn endpoint_joins_base_url_and_model() {
        assert_eq!(
            config().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn request_body_wraps_prompt_in_single_user_part() {
        let body = serde_json::to_value(GenerateRequest::from_prompt("hi")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let parsed: GenerateResponse = serde_json::from_str(
            r##"{"candidates": [
                {"content": {"role": "model", "parts": [{"text": "# Summary\n"}, {"text": "Answer: ||42||"}]}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]}"##,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("# Summary\nAnswer: ||42||"));
    }

    #[test]
    fn response_without_text_is_none() {
        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert_eq!(blocked.text(), None);

        let empty: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn api_error_message_prefers_structured_body() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message(" upstream timeout \n"), "upstream timeout");
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let client = GeminiClient::new(config());
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, ClientError::MissingApiKey));
    }
}
