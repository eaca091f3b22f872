use chrono::{DateTime, Utc};
use std::path::Path;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::Category;
use crate::error::SouvenirError;

/// Provenance of a candidate fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactSource {
    Regex,
    Contextual,
    Inference,
    Correction,
    Update,
    Addition,
}

impl FactSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactSource::Regex => "regex",
            FactSource::Contextual => "contextual",
            FactSource::Inference => "inference",
            FactSource::Correction => "correction",
            FactSource::Update => "update",
            FactSource::Addition => "addition",
        }
    }
}

/// A provisional fact proposed by extraction. Never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFact {
    pub content: String,
    pub category: Category,
    /// Always within [0, 1], whether built here or decoded from JSON
    #[serde(deserialize_with = "clamped_confidence")]
    pub confidence: f32,
    pub source: FactSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Prior assertion a correction replaces, when one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
}

impl CandidateFact {
    pub fn new(
        content: impl Into<String>,
        category: Category,
        confidence: f32,
        source: FactSource,
    ) -> Self {
        Self {
            content: content.into(),
            category,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            reasoning: None,
            old_content: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_old_content(mut self, old_content: Option<String>) -> Self {
        self.old_content = old_content;
        self
    }
}

fn clamped_confidence<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    if value.is_nan() {
        return Err(serde::de::Error::custom("confidence must be a number"));
    }
    Ok(value.clamp(0.0, 1.0))
}

/// A fact owned by the external memory store. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFact {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub content: String,
    pub category: Category,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl StoredFact {
    pub fn new(content: impl Into<String>, category: Category) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            category,
            created_at: now,
            updated_at: now,
            embedding: None,
        }
    }

    /// Read a JSON array of stored facts, as exported by the memory store
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>, SouvenirError> {
        let raw = std::fs::read_to_string(path)?;
        let facts: Vec<Self> = serde_json::from_str(&raw)?;
        Ok(facts)
    }
}
