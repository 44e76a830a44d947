//! The clinical agent: document-grounded answers with a web fallback.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use medai_rag::Retriever;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::generator::{AnswerGenerator, sanitize_answer};
use crate::search::WebSearch;

/// Appended to every clinical answer.
pub const FOLLOW_UP_PROMPT: &str = "\n\nHow else can I assist you today?";

/// Default label for answers grounded in the indexed document.
pub const DEFAULT_DOCUMENT_LABEL: &str = "Source: Nephrology PDF";

/// Label for answers taken from the web fallback.
pub const WEB_LABEL: &str = "Source: Web (Tavily)";

/// Label for answers that could not be produced.
pub const UNAVAILABLE_LABEL: &str = "Source: unavailable";

/// Shown in place of an answer when generation fails or times out.
pub const GENERATION_APOLOGY: &str =
    "I'm sorry, I couldn't prepare an answer right now. Please try again in a moment, \
     or contact your care team if your concern is urgent.";

/// Where a clinical answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// Generated from retrieved document chunks.
    Document,
    /// Returned by the web search fallback.
    Web,
    /// Generation failed; the text is an apology.
    Unavailable,
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Web => write!(f, "web"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A clinical reply ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicalAnswer {
    /// Answer text, follow-up prompt included.
    pub text: String,
    /// Where the answer came from.
    pub source: AnswerSource,
    /// Human-readable source attribution.
    pub source_label: String,
}

/// Answers medical questions from the indexed document, falling back to the web.
pub struct ClinicalAgent {
    retriever: Arc<Retriever>,
    web_search: Arc<dyn WebSearch>,
    generator: Arc<dyn AnswerGenerator>,
    document_label: String,
    generation_timeout: Duration,
}

impl ClinicalAgent {
    /// Wire the agent to its three services.
    pub fn new(
        retriever: Arc<Retriever>,
        web_search: Arc<dyn WebSearch>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            retriever,
            web_search,
            generator,
            document_label: DEFAULT_DOCUMENT_LABEL.to_string(),
            generation_timeout: Duration::from_secs(60),
        }
    }

    /// Override the attribution shown for document-grounded answers.
    pub fn with_document_label(mut self, label: impl Into<String>) -> Self {
        self.document_label = label.into();
        self
    }

    /// Bound how long a single generation may take.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Answer `question`. Never fails; service errors degrade to fallbacks.
    pub async fn answer(&self, question: &str) -> ClinicalAnswer {
        let chunks = match self.retriever.retrieve(question).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "retrieval failed; treating as no relevant chunks");
                Vec::new()
            }
        };

        let (text, source) = if chunks.is_empty() {
            info!(question, "no relevant chunks; using web fallback");
            (self.web_search.search(question).await, AnswerSource::Web)
        } else {
            let context =
                chunks.iter().map(|c| c.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
            self.generate(&context, question).await
        };

        let source_label = match source {
            AnswerSource::Document => self.document_label.clone(),
            AnswerSource::Web => WEB_LABEL.to_string(),
            AnswerSource::Unavailable => UNAVAILABLE_LABEL.to_string(),
        };

        info!(%source, answer_len = text.len(), "clinical answer ready");
        ClinicalAnswer { text: format!("{text}{FOLLOW_UP_PROMPT}"), source, source_label }
    }

    async fn generate(&self, context: &str, question: &str) -> (String, AnswerSource) {
        match tokio::time::timeout(self.generation_timeout, self.generator.generate(context, question))
            .await
        {
            Ok(Ok(answer)) => (sanitize_answer(&answer), AnswerSource::Document),
            Ok(Err(e)) => {
                error!(error = %e, "answer generation failed");
                (GENERATION_APOLOGY.to_string(), AnswerSource::Unavailable)
            }
            Err(_) => {
                error!(timeout_secs = self.generation_timeout.as_secs_f64(), "answer generation timed out");
                (GENERATION_APOLOGY.to_string(), AnswerSource::Unavailable)
            }
        }
    }
}
