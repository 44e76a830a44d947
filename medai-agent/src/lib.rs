//! Conversation layer of the MedAI assistant.
//!
//! This crate provides:
//! - Discharge report loading and patient lookup
//! - The receptionist dialogue state machine
//! - The clinical agent with its web search and answer generation boundaries
//! - A turn driver that records every message to a JSON-lines session log

pub mod assistant;
pub mod clinical;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod generator;
pub mod patient;
pub mod search;
pub mod session_log;

pub use assistant::Assistant;
pub use clinical::{AnswerSource, ClinicalAgent, ClinicalAnswer};
pub use config::{AssistantConfig, EmbeddingSettings, GenerationSettings, SearchSettings};
pub use dialogue::{
    DialoguePolicy, DialogueState, Effect, Reply, Role, Session, Transition, step,
};
pub use error::{AgentError, Result};
pub use generator::{AnswerGenerator, GeminiGenerator, build_prompt, sanitize_answer};
pub use patient::{Lookup, PatientDirectory, PatientRecord};
pub use search::{NO_WEB_RESULTS, TavilySearch, WebSearch};
pub use session_log::{LogEntry, SessionLog};
