use serde::{Deserialize, Serialize};

use super::Category;

/// A proactive follow-up question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Stable id (`<rule id>:<question index>`), used for de-duplication
    pub id: String,
    pub question: String,
    pub category: Category,
    pub priority: u32,
    pub confidence: f32,
    /// Why the suggestion was triggered
    pub context: String,
}

impl Suggestion {
    /// Ranking key: `priority × confidence`
    pub fn score(&self) -> f32 {
        self.priority as f32 * self.confidence
    }
}

/// Result of a memory gap analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryGaps {
    pub missing_categories: Vec<Category>,
    pub suggestions: Vec<Suggestion>,
}
