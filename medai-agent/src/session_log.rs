//! Append-only JSON-lines transcript of a session.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialogue::Role;
use crate::error::{AgentError, Result};

/// One line of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Writes every exchanged message of one session to a shared log file.
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
    session_id: Uuid,
}

impl SessionLog {
    /// Open `path` for appending under a new session id, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_session_id(path, Uuid::new_v4())
    }

    pub fn with_session_id(path: impl AsRef<Path>, session_id: Uuid) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AgentError::SessionLog(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        Ok(Self { path, session_id })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one message.
    pub fn append(&self, role: Role, content: &str, source: Option<&str>) -> Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now(),
            session_id: self.session_id,
            role,
            content: content.to_string(),
            source: source.map(str::to_string),
        };
        let mut line = serde_json::to_string(&entry)
            .map_err(|e| AgentError::SessionLog(format!("cannot encode entry: {e}")))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AgentError::SessionLog(format!("cannot open {}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .map_err(|e| AgentError::SessionLog(format!("cannot write {}: {e}", self.path.display())))
    }
}
