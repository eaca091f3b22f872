pub mod category;
pub mod context;
pub mod contradiction;
pub mod fact;
pub mod suggestion;

pub use category::{Category, UnknownCategory};
pub use context::ConversationContext;
pub use contradiction::{Contradiction, Subject};
pub use fact::{CandidateFact, FactSource, StoredFact};
pub use suggestion::{MemoryGaps, Suggestion};
