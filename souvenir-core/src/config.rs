use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SouvenirConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub contextual: ContextualConfig,
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    #[serde(default)]
    pub suggestions: SuggestionConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Pattern extractor scoring
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractionConfig {
    pub context_boost: f32,
    pub boost_cap: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            context_boost: 0.1,
            boost_cap: 0.95,
        }
    }
}

/// Contextual classifier scoring and correction policy
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ContextualConfig {
    pub lexicon_base: f32,
    pub lexicon_step: f32,
    pub lexicon_cap: f32,
    pub topic_boost: f32,
    pub topic_cap: f32,
    pub correction_window: usize,
    /// Downgrade corrections with no anchored prior assertion to additions.
    pub degrade_unanchored_corrections: bool,
}

impl Default for ContextualConfig {
    fn default() -> Self {
        Self {
            lexicon_base: 0.5,
            lexicon_step: 0.1,
            lexicon_cap: 0.8,
            topic_boost: 0.15,
            topic_cap: 0.9,
            correction_window: 3,
            degrade_unanchored_corrections: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Candidates must be strictly above this to be kept.
    pub min_confidence: f32,
    /// Maximum word-level Jaccard similarity to an already accepted candidate.
    pub max_similarity: f32,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            max_similarity: 0.7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SuggestionConfig {
    pub default_max: usize,
    /// How many used suggestion ids a session remembers before trimming the oldest.
    pub used_capacity: usize,
    pub base_confidence: f32,
    pub trigger_step: f32,
    pub confidence_cap: f32,
    pub absent_category_bonus: u32,
    pub gap_bonus: u32,
    pub gap_confidence: f32,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            default_max: 3,
            used_capacity: 256,
            base_confidence: 0.5,
            trigger_step: 0.2,
            confidence_cap: 0.9,
            absent_category_bonus: 2,
            gap_bonus: 3,
            gap_confidence: 0.7,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RulesConfig {
    /// Rule set file replacing the built-in one. `~` is expanded.
    pub path: Option<String>,
}

impl SouvenirConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("SOUVENIR").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    /// Like [`SouvenirConfig::load`], but a missing file yields the defaults
    /// (still overlaid with `SOUVENIR__*` environment variables).
    pub fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SOUVENIR").separator("__"))
            .build()?;
        s.try_deserialize()
    }
}
