//! Discharge report records and name lookup.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::{AgentError, Result};

/// One patient's discharge report, as stored in the patient data file.
///
/// List-like fields accept either a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Full name as printed on the discharge report.
    pub patient_name: String,
    /// Discharge date, `YYYY-MM-DD`.
    pub discharge_date: String,
    /// Primary diagnosis at discharge.
    pub primary_diagnosis: String,
    /// Prescribed medications.
    #[serde(deserialize_with = "one_or_many")]
    pub medications: Vec<String>,
    /// Dietary restrictions.
    #[serde(deserialize_with = "one_or_many")]
    pub dietary_restrictions: Vec<String>,
    /// Scheduled follow-up items.
    #[serde(deserialize_with = "one_or_many")]
    pub follow_up: Vec<String>,
    /// Symptoms that should prompt a call to the care team.
    #[serde(deserialize_with = "one_or_many")]
    pub warning_signs: Vec<String>,
    /// Free-text discharge instructions.
    #[serde(default)]
    pub discharge_instructions: String,
}

impl PatientRecord {
    /// The recovery checklist the receptionist walks through, in asking order.
    pub fn checklist(&self) -> Vec<String> {
        vec![
            format!(
                "Are you taking your medications as prescribed: {}?",
                self.medications.join(", ")
            ),
            format!(
                "Are you following your dietary restrictions: {}?",
                self.dietary_restrictions.join(", ")
            ),
            format!("Have you noticed any warning signs like {}?", self.warning_signs.join(", ")),
            format!("Have you scheduled your follow-up: {}?", self.follow_up.join(", ")),
        ]
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Outcome of a name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// No record carries the name.
    NotFound,
    /// Exactly one record carries the name.
    Found(&'a PatientRecord),
    /// Several records share the name, in file order.
    Ambiguous(Vec<&'a PatientRecord>),
}

/// The read-only set of discharge reports.
#[derive(Debug, Clone, Default)]
pub struct PatientDirectory {
    records: Vec<PatientRecord>,
}

impl PatientDirectory {
    /// Wrap already-parsed records, keeping their order.
    pub fn new(records: Vec<PatientRecord>) -> Self {
        Self { records }
    }

    /// Load the JSON array of reports at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::PatientData`] if the file cannot be read or is
    /// not an array of well-formed records.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let patient_data_error = |message: String| AgentError::PatientData {
            path: path.display().to_string(),
            message,
        };

        let bytes = std::fs::read(path).map_err(|e| patient_data_error(e.to_string()))?;
        let records: Vec<PatientRecord> =
            serde_json::from_slice(&bytes).map_err(|e| patient_data_error(e.to_string()))?;

        info!(path = %path.display(), patients = records.len(), "loaded patient data");
        Ok(Self::new(records))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find records whose name equals `name`, ignoring case and surrounding whitespace.
    pub fn find_by_name(&self, name: &str) -> Lookup<'_> {
        let wanted = name.trim().to_lowercase();
        let mut matches: Vec<&PatientRecord> =
            self.records.iter().filter(|r| r.patient_name.to_lowercase() == wanted).collect();

        match matches.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(matches.remove(0)),
            _ => Lookup::Ambiguous(matches),
        }
    }
}
