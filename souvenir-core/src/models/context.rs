use serde::{Deserialize, Serialize};

/// Conversation state handed in by the transport layer for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Prior utterances, oldest first. The current utterance is not included.
    #[serde(default)]
    pub recent_utterances: Vec<String>,
    #[serde(default)]
    pub current_topic: Option<String>,
}

impl ConversationContext {
    pub fn new(recent_utterances: Vec<String>) -> Self {
        Self {
            recent_utterances,
            current_topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.current_topic = Some(topic.into());
        self
    }

    /// The last `size` utterances, oldest first.
    pub fn window(&self, size: usize) -> &[String] {
        let start = self.recent_utterances.len().saturating_sub(size);
        &self.recent_utterances[start..]
    }
}
