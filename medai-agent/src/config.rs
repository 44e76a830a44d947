//! Assistant configuration: TOML file, environment overrides, validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use medai_rag::RagConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clinical::DEFAULT_DOCUMENT_LABEL;
use crate::dialogue::DialoguePolicy;
use crate::error::{AgentError, Result};
use crate::generator::{DEFAULT_GEMINI_MODEL, GEMINI_BASE_URL};
use crate::search::TAVILY_SEARCH_URL;

/// Embedding service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// OpenAI-compatible API root; `/embeddings` is appended.
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// Web search fallback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: String,
    pub search_depth: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: TAVILY_SEARCH_URL.to_string(),
            search_depth: "basic".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Everything the `medai` binary needs to run.
///
/// ```toml
/// index_dir = "embeddings/index"
/// patient_data = "patient_reports.json"
///
/// [rag]
/// top_k = 5
/// distance_threshold = 0.8
///
/// [generation]
/// model = "gemini-2.5-flash"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Directory holding `vectors.json` and `chunks.json`.
    pub index_dir: PathBuf,
    /// JSON array of discharge reports.
    pub patient_data: PathBuf,
    /// JSON-lines transcript file.
    pub session_log: PathBuf,
    /// Attribution shown for document-grounded answers.
    pub document_label: String,
    pub rag: RagConfig,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub search: SearchSettings,
    pub dialogue: DialoguePolicy,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("embeddings/index"),
            patient_data: PathBuf::from("patient_reports.json"),
            session_log: PathBuf::from("logs/medai_session.jsonl"),
            document_label: DEFAULT_DOCUMENT_LABEL.to_string(),
            rag: RagConfig::default(),
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
            search: SearchSettings::default(),
            dialogue: DialoguePolicy::default(),
        }
    }
}

impl AssistantConfig {
    /// Parse a TOML document; absent keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AgentError::Config(format!("invalid TOML: {e}")))
    }

    /// Read and parse the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("cannot read {}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&text)
    }

    /// Fill credentials and endpoints from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// Credentials: `GEMINI_API_KEY` (falling back to `GOOGLE_API_KEY`),
    /// `TAVILY_API_KEY`, `MEDAI_EMBEDDING_API_KEY` (falling back to
    /// `OPENAI_API_KEY`). Endpoints: `MEDAI_EMBEDDING_URL`, `MEDAI_INDEX_DIR`,
    /// `MEDAI_PATIENT_DATA`.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.generation.api_key = Some(key);
        }
        if let Some(key) = get("TAVILY_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(key) = get("MEDAI_EMBEDDING_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.embedding.api_key = Some(key);
        }
        if let Some(url) = get("MEDAI_EMBEDDING_URL") {
            self.embedding.base_url = url;
        }
        if let Some(dir) = get("MEDAI_INDEX_DIR") {
            self.index_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("MEDAI_PATIENT_DATA") {
            self.patient_data = PathBuf::from(path);
        }
        self
    }

    /// Check value ranges; credentials are checked where they are used.
    pub fn validate(&self) -> Result<()> {
        self.rag.validate()?;
        if self.embedding.dimensions == 0 {
            return Err(AgentError::Config("embedding.dimensions must be greater than zero".into()));
        }
        for (name, secs) in [
            ("embedding.timeout_secs", self.embedding.timeout_secs),
            ("generation.timeout_secs", self.generation.timeout_secs),
            ("search.timeout_secs", self.search.timeout_secs),
        ] {
            if secs == 0 {
                return Err(AgentError::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.dialogue.farewells.iter().all(|f| f.trim().is_empty()) {
            return Err(AgentError::Config("dialogue.farewells must not be empty".into()));
        }
        Ok(())
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search.timeout_secs)
    }
}
