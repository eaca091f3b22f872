use thiserror::Error;

use crate::models::Category;

#[derive(Error, Debug)]
pub enum SouvenirError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Rule set error: {0}")]
    Rules(#[from] RuleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rule-table problems. All of these are raised while a rule set is loaded,
/// before any utterance is processed.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("failed to parse rule set: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read rule set {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("rule '{rule}': invalid regex: {source}")]
    InvalidRegex {
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule}': malformed placeholder at byte {position} in template \"{template}\"")]
    MalformedPlaceholder {
        rule: String,
        template: String,
        position: usize,
    },

    #[error("rule '{rule}': template uses group {{{group}}} but the regex only has {available} group(s)")]
    MissingGroup {
        rule: String,
        group: usize,
        available: usize,
    },

    #[error("rule '{rule}': confidence {value} is outside [0, 1]")]
    InvalidConfidence { rule: String, value: f32 },

    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),

    #[error("rule '{0}' has no {1}")]
    EmptyField(String, &'static str),

    #[error("category '{0}' has no {1}")]
    UncoveredCategory(Category, &'static str),

    #[error("category '{0}' appears more than once in the lexicon")]
    DuplicateCategory(Category),
}
