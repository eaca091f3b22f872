pub mod pipeline;
pub mod router;
pub mod subsystems;

pub use pipeline::{Pipeline, TurnOutcome, TurnReport};
pub use subsystems::suggest::{SuggestionEngine, SuggestionSession};
