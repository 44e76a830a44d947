//! Answer generation from retrieved context.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::error::{AgentError, Result};

/// The default Gemini REST API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default generation model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// A text model that answers a question from supplied context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Produce an answer to `question` grounded in `context`.
    async fn generate(&self, context: &str, question: &str) -> Result<String>;
}

/// Build the nephrology-assistant prompt for a context and question.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a kind and helpful nephrology assistant.\n\n\
         Use the context below to answer the patient's question clearly.\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:\n"
    )
}

/// Strip output that a markdown renderer would misread.
///
/// Removes fenced-code delimiters so the answer cannot open a code block,
/// and runs of four spaces so indented lines are not shown as code.
pub fn sanitize_answer(answer: &str) -> String {
    answer.replace("```", "").replace("    ", "").trim().to_string()
}

/// [`AnswerGenerator`] backed by the Gemini `generateContent` REST API.
///
/// # Example
///
/// ```rust,ignore
/// use medai_agent::generator::{GeminiGenerator, GEMINI_BASE_URL};
///
/// let generator = GeminiGenerator::new(GEMINI_BASE_URL, api_key, "gemini-2.5-flash", timeout)?;
/// let answer = generator.generate(&context, "What is eGFR?").await?;
/// ```
pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiGenerator {
    /// Create a generator for `model` under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the API key is blank or the HTTP
    /// client cannot be built.
    pub fn new(
        base_url: impl AsRef<str>,
        api_key: impl Into<String>,
        model: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AgentError::Config("Gemini API key must not be empty".into()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            AgentError::Config(format!("failed to build generation HTTP client: {e}"))
        })?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            base_url.as_ref().trim_end_matches('/'),
            model.as_ref()
        );

        Ok(Self { client, endpoint, api_key })
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn generation_error(message: impl Into<String>) -> AgentError {
    AgentError::Generation { provider: "Gemini".into(), message: message.into() }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        let prompt = build_prompt(context, question);
        debug!(provider = "Gemini", prompt_len = prompt.len(), "generating answer");

        let body = GenerateRequest {
            contents: vec![json!({"role": "user", "parts": [{"text": prompt}]})],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Gemini", error = %e, "request failed");
                generation_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "Gemini", %status, "API error");
            return Err(generation_error(format!("API returned {status}: {body}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| generation_error(format!("failed to parse response: {e}")))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(generation_error("response contained no text"));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn prompt_places_context_before_question() {
        let prompt = build_prompt("Kidneys filter blood.", "What do kidneys do?");
        let context_at = prompt.find("Kidneys filter blood.").unwrap();
        let question_at = prompt.find("What do kidneys do?").unwrap();
        assert!(prompt.starts_with("You are a kind and helpful nephrology assistant."));
        assert!(context_at < question_at);
        assert!(prompt.trim_end().ends_with("Answer:"));
    }

    #[test]
    fn sanitize_removes_fences_and_indentation_runs() {
        let raw = "```\n    Drink water.\n```\n  Rest.";
        assert_eq!(sanitize_answer(raw), "Drink water.\n\n  Rest.");
    }

    #[test]
    fn blank_api_key_is_rejected() {
        assert!(
            GeminiGenerator::new(GEMINI_BASE_URL, " ", DEFAULT_GEMINI_MODEL, Duration::from_secs(1))
                .is_err()
        );
    }

    #[tokio::test]
    async fn joins_text_parts_of_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": " Stay "}, {"text": "hydrated. "}]}}]
            })))
            .mount(&server)
            .await;

        let generator =
            GeminiGenerator::new(server.uri(), "g-key", DEFAULT_GEMINI_MODEL, Duration::from_secs(5))
                .unwrap();
        assert_eq!(generator.generate("ctx", "q").await.unwrap(), "Stay hydrated.");
    }

    #[tokio::test]
    async fn error_status_is_a_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let generator =
            GeminiGenerator::new(server.uri(), "g-key", DEFAULT_GEMINI_MODEL, Duration::from_secs(5))
                .unwrap();
        assert!(matches!(
            generator.generate("ctx", "q").await,
            Err(AgentError::Generation { .. })
        ));
    }

    #[tokio::test]
    async fn empty_candidates_are_a_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let generator =
            GeminiGenerator::new(server.uri(), "g-key", DEFAULT_GEMINI_MODEL, Duration::from_secs(5))
                .unwrap();
        assert!(generator.generate("ctx", "q").await.is_err());
    }
}
