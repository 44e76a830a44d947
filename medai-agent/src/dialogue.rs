//! Scripted receptionist dialogue.
//!
//! The conversation is a small state machine driven one user turn at a time by
//! [`step`]. `step` is pure: it takes the current [`Session`] and returns the
//! next one along with the replies to show and, when a medical question has to
//! be answered, an [`Effect`] for the caller to carry out.
//!
//! ```text
//! AwaitingName ──found──▶ AskingQuestions ──medical / last answer──▶ ClinicalMode
//!                                                                   │ farewell
//!                        Chatting ◀──all answered── FollowupMode ◀──┘
//!                           │ farewell
//!                           ▼
//!                          Done
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::patient::{Lookup, PatientDirectory, PatientRecord};

/// First message of every session.
pub const WELCOME: &str = "Hello! I'm your MedAI care assistant. Please type your full name \
     as it appears on your discharge report.";
pub const PATIENT_NOT_FOUND: &str = "Patient not found!!";
pub const AMBIGUOUS_NAME: &str = "Multiple matches found. Please enter full name with more detail.";
pub const FORWARDING: &str = "Forwarding to Clinical Agent for medical assistance...";
pub const CHECKLIST_DONE: &str =
    "Thanks for your answers. Let me know any medical issues you're facing.";
pub const CLINICAL_FAREWELL: &str = "I hope I was able to answer all your medical queries. \
     Transferring you back to the receptionist for any final checkups.";
pub const WRAP_UP: &str = "Is there anything else I can assist you with?";
pub const GOODBYE: &str =
    "Thank you for using MedAI Assistant. Wishing you good health and a speedy recovery!";
pub const STILL_HERE: &str = "You may still ask questions or type 'bye' to end the session.";
pub const SESSION_ENDED: &str = "This session has ended. Start a new session to continue.";

/// Who a line of conversation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Receptionist,
    Clinical,
    /// Source attribution shown under a clinical answer.
    Source,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Receptionist => "receptionist",
            Self::Clinical => "clinical",
            Self::Source => "source",
        };
        f.write_str(name)
    }
}

/// One message produced by the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub role: Role,
    pub content: String,
}

impl Reply {
    pub fn receptionist(content: impl Into<String>) -> Self {
        Self { role: Role::Receptionist, content: content.into() }
    }

    pub fn clinical(content: impl Into<String>) -> Self {
        Self { role: Role::Clinical, content: content.into() }
    }

    pub fn source(content: impl Into<String>) -> Self {
        Self { role: Role::Source, content: content.into() }
    }
}

/// Where the conversation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    AwaitingName,
    AskingQuestions,
    ClinicalMode,
    FollowupMode,
    Chatting,
    Done,
}

/// Per-conversation state, owned by the driver and replaced on every turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    state: DialogueState,
    patient: Option<PatientRecord>,
    checklist: Vec<String>,
    current: usize,
    answered: BTreeSet<usize>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session waiting for the patient's name.
    pub fn new() -> Self {
        Self {
            state: DialogueState::AwaitingName,
            patient: None,
            checklist: Vec::new(),
            current: 0,
            answered: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    /// The identified patient, once the name has been matched.
    pub fn patient(&self) -> Option<&PatientRecord> {
        self.patient.as_ref()
    }

    pub fn checklist(&self) -> &[String] {
        &self.checklist
    }

    /// Index of the checklist question most recently asked.
    pub fn current_question(&self) -> usize {
        self.current
    }

    /// Checklist indices already answered, ascending.
    pub fn answered(&self) -> &BTreeSet<usize> {
        &self.answered
    }

    pub fn is_done(&self) -> bool {
        self.state == DialogueState::Done
    }

    fn next_unanswered(&self) -> Option<usize> {
        (0..self.checklist.len()).find(|i| !self.answered.contains(i))
    }

    fn mark_current_answered(&mut self) {
        if self.current < self.checklist.len() {
            self.answered.insert(self.current);
        }
    }

    /// Ask the lowest unanswered question, or wrap up when none remain.
    fn resume_checklist(&mut self, replies: &mut Vec<Reply>) {
        match self.next_unanswered() {
            Some(index) => {
                self.current = index;
                self.state = DialogueState::FollowupMode;
                replies.push(Reply::receptionist(self.checklist[index].clone()));
            }
            None => {
                self.state = DialogueState::Chatting;
                replies.push(Reply::receptionist(WRAP_UP));
            }
        }
    }
}

/// Work the driver must perform after a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Answer `question` with the clinical agent and show the result.
    ConsultClinical { question: String },
}

/// Result of one [`step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: Session,
    pub replies: Vec<Reply>,
    pub effect: Option<Effect>,
}

/// Vocabularies that steer the dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialoguePolicy {
    /// Words or phrases that mark input as a medical question.
    pub medical_keywords: Vec<String>,
    /// Whole inputs that end the current phase of the conversation.
    pub farewells: Vec<String>,
}

impl Default for DialoguePolicy {
    fn default() -> Self {
        let medical_keywords = [
            "pain", "swelling", "urine", "blood", "symptom", "symptoms", "dizzy", "nausea",
            "vomiting", "gfr", "kidney", "kidneys", "dialysis", "drug", "drugs", "nephrology",
            "medicine", "medicines", "medication", "medications", "side effects",
        ];
        let farewells = ["bye", "exit", "goodbye", "thank you", "thanks"];
        Self {
            medical_keywords: medical_keywords.into_iter().map(String::from).collect(),
            farewells: farewells.into_iter().map(String::from).collect(),
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

impl DialoguePolicy {
    /// Whether any keyword occurs in `input` as a whole word or word sequence.
    pub fn is_medical(&self, input: &str) -> bool {
        let input = words(input);
        self.medical_keywords.iter().any(|keyword| {
            let keyword = words(keyword);
            !keyword.is_empty() && input.windows(keyword.len()).any(|window| window == keyword)
        })
    }

    /// Whether the whole trimmed input is a farewell.
    pub fn is_farewell(&self, input: &str) -> bool {
        let input = input.trim().to_lowercase();
        self.farewells.iter().any(|f| f.trim().to_lowercase() == input)
    }
}

/// Advance the conversation by one user turn.
///
/// Blank input leaves the session untouched and produces no replies.
pub fn step(
    session: &Session,
    input: &str,
    directory: &PatientDirectory,
    policy: &DialoguePolicy,
) -> Transition {
    let mut next = session.clone();
    let mut replies = Vec::new();
    let mut effect = None;
    let input = input.trim();

    if input.is_empty() {
        return Transition { session: next, replies, effect };
    }

    let mut consult = |next: &mut Session, replies: &mut Vec<Reply>| {
        next.state = DialogueState::ClinicalMode;
        replies.push(Reply::receptionist(FORWARDING));
        effect = Some(Effect::ConsultClinical { question: input.to_string() });
    };

    match session.state {
        DialogueState::AwaitingName => match directory.find_by_name(input) {
            Lookup::NotFound => replies.push(Reply::receptionist(PATIENT_NOT_FOUND)),
            Lookup::Ambiguous(_) => replies.push(Reply::receptionist(AMBIGUOUS_NAME)),
            Lookup::Found(record) => {
                next.checklist = record.checklist();
                next.current = 0;
                next.answered.clear();
                next.state = DialogueState::AskingQuestions;
                replies.push(Reply::receptionist(format!(
                    "Hello {}! Your diagnosis is {}.\n\n{}",
                    record.patient_name, record.primary_diagnosis, next.checklist[0]
                )));
                next.patient = Some(record.clone());
            }
        },
        DialogueState::AskingQuestions => {
            if policy.is_medical(input) {
                consult(&mut next, &mut replies);
            } else {
                next.mark_current_answered();
                let following =
                    (next.current + 1..next.checklist.len()).find(|i| !next.answered.contains(i));
                match following {
                    Some(index) => {
                        next.current = index;
                        replies.push(Reply::receptionist(next.checklist[index].clone()));
                    }
                    None => {
                        next.state = DialogueState::ClinicalMode;
                        replies.push(Reply::receptionist(CHECKLIST_DONE));
                    }
                }
            }
        }
        DialogueState::ClinicalMode => {
            if policy.is_farewell(input) {
                replies.push(Reply::clinical(CLINICAL_FAREWELL));
                next.resume_checklist(&mut replies);
            } else {
                consult(&mut next, &mut replies);
            }
        }
        DialogueState::FollowupMode => {
            next.mark_current_answered();
            next.resume_checklist(&mut replies);
        }
        DialogueState::Chatting => {
            if policy.is_farewell(input) {
                next.state = DialogueState::Done;
                replies.push(Reply::receptionist(GOODBYE));
            } else if policy.is_medical(input) {
                consult(&mut next, &mut replies);
            } else if next.next_unanswered().is_some() {
                next.resume_checklist(&mut replies);
            } else {
                replies.push(Reply::receptionist(STILL_HERE));
            }
        }
        DialogueState::Done => replies.push(Reply::receptionist(SESSION_ENDED)),
    }

    Transition { session: next, replies, effect }
}
