use serde::{Deserialize, Serialize};

/// Subject families the contradiction detector compares like-with-like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Age,
    Location,
    SelfIdentity,
}

impl Subject {
    pub fn label(&self) -> &'static str {
        match self {
            Subject::Age => "âge",
            Subject::Location => "lieu de résidence",
            Subject::SelfIdentity => "identité déclarée",
        }
    }
}

/// A same-subject conflict between a new statement and a stored fact.
/// Advisory only: resolving it belongs to the store or a human reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub subject: Subject,
    /// Content of the conflicting stored fact
    pub existing: String,
    pub conflict: String,
    pub severity: f32,
}
