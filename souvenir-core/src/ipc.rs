use serde::{Deserialize, Serialize};

use crate::models::{CandidateFact, ConversationContext, StoredFact};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SouvenirRequest {
    Ping,
    Extract {
        text: String,
    },
    Classify {
        text: String,
        context: Option<ConversationContext>,
        #[serde(default)]
        memory: Vec<StoredFact>,
    },
    DetectChanges {
        text: String,
        context: Option<ConversationContext>,
        #[serde(default)]
        memory: Vec<StoredFact>,
    },
    Contradictions {
        text: String,
        #[serde(default)]
        memory: Vec<StoredFact>,
    },
    Consolidate {
        candidates: Vec<CandidateFact>,
    },
    ProcessTurn {
        text: String,
        context: Option<ConversationContext>,
        #[serde(default)]
        memory: Vec<StoredFact>,
        max: Option<usize>,
    },
    Suggest {
        #[serde(default)]
        recent: Vec<String>,
        #[serde(default)]
        memory: Vec<StoredFact>,
        max: Option<usize>,
    },
    Gaps {
        #[serde(default)]
        memory: Vec<StoredFact>,
    },
    MarkUsed {
        id: String,
    },
    RulesInfo,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SouvenirResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl SouvenirResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
