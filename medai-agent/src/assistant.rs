//! Turn driver tying the dialogue to the clinical agent and the session log.

use tracing::{debug, info, warn};

use crate::clinical::ClinicalAgent;
use crate::dialogue::{DialoguePolicy, Effect, Reply, Role, Session, WELCOME, step};
use crate::patient::PatientDirectory;
use crate::session_log::SessionLog;

/// One patient conversation.
///
/// # Example
///
/// ```rust,ignore
/// let mut assistant = Assistant::new(directory, DialoguePolicy::default(), clinical)
///     .with_session_log(SessionLog::open("logs/session.jsonl")?);
///
/// print(assistant.welcome());
/// while !assistant.is_done() {
///     let replies = assistant.handle_turn(&read_line()?).await;
///     print(replies);
/// }
/// ```
pub struct Assistant {
    session: Session,
    directory: PatientDirectory,
    policy: DialoguePolicy,
    clinical: ClinicalAgent,
    log: Option<SessionLog>,
}

impl Assistant {
    pub fn new(directory: PatientDirectory, policy: DialoguePolicy, clinical: ClinicalAgent) -> Self {
        Self { session: Session::new(), directory, policy, clinical, log: None }
    }

    /// Record every exchanged message in `log`.
    pub fn with_session_log(mut self, log: SessionLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_done(&self) -> bool {
        self.session.is_done()
    }

    /// The opening message.
    pub fn welcome(&self) -> Vec<Reply> {
        let replies = vec![Reply::receptionist(WELCOME)];
        self.record(&replies);
        replies
    }

    /// Process one line of user input and return what to show.
    pub async fn handle_turn(&mut self, input: &str) -> Vec<Reply> {
        if !input.trim().is_empty() {
            self.append(Role::User, input.trim(), None);
        }

        let before = self.session.state();
        let transition = step(&self.session, input, &self.directory, &self.policy);
        let mut replies = transition.replies;

        if let Some(Effect::ConsultClinical { question }) = transition.effect {
            debug!(question = %question, "consulting clinical agent");
            let answer = self.clinical.answer(&question).await;
            replies.push(Reply::clinical(answer.text));
            replies.push(Reply::source(answer.source_label));
        }

        self.session = transition.session;
        if before != self.session.state() {
            info!(from = ?before, to = ?self.session.state(), "dialogue state changed");
        }

        self.record(&replies);
        replies
    }

    fn record(&self, replies: &[Reply]) {
        // A clinical answer is immediately followed by its source label.
        let mut iter = replies.iter().peekable();
        while let Some(reply) = iter.next() {
            let source = match (reply.role, iter.peek()) {
                (Role::Clinical, Some(next)) if next.role == Role::Source => Some(next.content.as_str()),
                _ => None,
            };
            self.append(reply.role, &reply.content, source);
        }
    }

    fn append(&self, role: Role, content: &str, source: Option<&str>) {
        let Some(log) = &self.log else {
            return;
        };
        if let Err(e) = log.append(role, content, source) {
            warn!(error = %e, path = %log.path().display(), "failed to write session log");
        }
    }
}
