//! Google Gemini backend.
//!
//! Calls the `generateContent` REST endpoint with a single user turn and
//! concatenates the text parts of the first candidate.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::trait_def::{GenerateOptions, Generation, GenerationBackend};

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENVS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Connection settings for [`GeminiBackend`].
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Scheme and host, without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read the API key from `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
    pub fn api_key_from_env() -> Option<String> {
        API_KEY_ENVS
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .filter(|k| !k.trim().is_empty())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// [`GenerationBackend`] for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self { config, client })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

/// Pull the generated text out of a `generateContent` response body.
fn extract_text(response: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        bail!("prompt was blocked by the model: {reason}");
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        bail!("model returned no candidates");
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        match candidate.finish_reason {
            Some(reason) => bail!("model returned no text (finish reason: {reason})"),
            None => bail!("model returned no text"),
        }
    }
    Ok(text)
}

/// Render a non-success response body as an error message.
fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => match env.error.status {
            Some(status) => format!("{status}: {}", env.error.message),
            None => env.error.message,
        },
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<Generation> {
        let body = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: options.temperature,
            },
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("request to Gemini failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!(
                "Gemini returned HTTP {}: {}",
                status.as_u16(),
                describe_error_body(&text)
            );
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("failed to decode Gemini response")?;

        let text = extract_text(parsed)?;
        debug!(model = %self.config.model, len = text.len(), "Gemini generation complete");
        Ok(Generation { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn endpoint_includes_model() {
        let mut cfg = GeminiConfig::new("k");
        cfg.base_url = "http://localhost:9999/".to_string();
        cfg.model = "gemini-test".to_string();
        assert_eq!(
            cfg.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let cfg = GeminiConfig::new("super-secret-key");
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("super-secret-key"), "{shown}");
        assert!(shown.contains(GeminiConfig::DEFAULT_MODEL));
    }

    #[test]
    fn request_body_shape() {
        let body = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: "hi" }],
            }],
            generation_config: GenerationConfig { temperature: 0.5 },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }],
                "generationConfig": { "temperature": 0.5 }
            })
        );
    }

    #[test]
    fn extract_text_joins_parts() {
        let resp = parse(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "```json\n{" }, { "text": "}\n```" }] },
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(extract_text(resp).unwrap(), "```json\n{}\n```");
    }

    #[test]
    fn extract_text_rejects_empty_candidates() {
        let err = extract_text(parse(serde_json::json!({ "candidates": [] }))).unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }

    #[test]
    fn extract_text_reports_finish_reason() {
        let resp = parse(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }));
        let err = extract_text(resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"), "{err}");
    }

    #[test]
    fn extract_text_reports_blocked_prompt() {
        let resp = parse(serde_json::json!({
            "promptFeedback": { "blockReason": "OTHER" }
        }));
        let err = extract_text(resp).unwrap_err();
        assert!(err.to_string().contains("blocked"), "{err}");
    }

    #[test]
    fn error_body_prefers_api_message() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(describe_error_body(body), "RESOURCE_EXHAUSTED: Quota exceeded");
        assert_eq!(describe_error_body("bad gateway"), "bad gateway");
        assert_eq!(describe_error_body(""), "empty response body");
    }
}
