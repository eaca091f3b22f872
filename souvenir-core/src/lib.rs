pub mod config;
pub mod error;
pub mod ipc;
pub mod models;
pub mod rules;
pub mod text;

pub use config::SouvenirConfig;
pub use error::{RuleError, SouvenirError};
pub use rules::RuleSet;
