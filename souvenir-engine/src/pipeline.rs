//! Turn pipeline
//!
//! utterance → pattern extractor → (nothing matched) contextual classifier
//! → contradiction check against memory → consolidation.
//! Suggestions are computed from the recent window plus the new utterance.

use std::sync::Arc;

use serde::Serialize;
use souvenir_core::config::SouvenirConfig;
use souvenir_core::models::{
    CandidateFact, Contradiction, ConversationContext, StoredFact, Suggestion,
};
use souvenir_core::rules::RuleSet;
use souvenir_core::text;
use souvenir_core::SouvenirError;
use tracing::info;

use crate::subsystems::consolidate::Consolidator;
use crate::subsystems::contextual::ContextualClassifier;
use crate::subsystems::contradiction::ContradictionDetector;
use crate::subsystems::extract::PatternExtractor;
use crate::subsystems::suggest::{SuggestionEngine, SuggestionSession};

/// Counts describing how one turn was processed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnReport {
    pub regex_hits: usize,
    pub contextual_hits: usize,
    pub dropped_low_confidence: usize,
    pub dropped_duplicates: usize,
    pub contradictions: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Consolidated facts, ready for the external store
    pub facts: Vec<CandidateFact>,
    pub contradictions: Vec<Contradiction>,
    /// Correction / update / inference signals, whether or not a rule fired
    pub changes: Vec<CandidateFact>,
    pub suggestions: Vec<Suggestion>,
    pub report: TurnReport,
}

pub struct Pipeline {
    pub rules: Arc<RuleSet>,
    pub extractor: PatternExtractor,
    pub classifier: ContextualClassifier,
    pub detector: ContradictionDetector,
    pub consolidator: Consolidator,
    pub suggestions: SuggestionEngine,
}

impl Pipeline {
    pub fn new(rules: RuleSet, config: &SouvenirConfig) -> Result<Self, SouvenirError> {
        let rules = Arc::new(rules);
        Ok(Self {
            extractor: PatternExtractor::new(rules.clone(), &config.extraction),
            classifier: ContextualClassifier::new(rules.clone(), &config.contextual)?,
            detector: ContradictionDetector::new(rules.clone())?,
            consolidator: Consolidator::new(&config.consolidation),
            suggestions: SuggestionEngine::new(rules.clone(), &config.suggestions),
            rules,
        })
    }

    /// Rules from `config.rules.path` when set, the built-in table otherwise
    pub fn from_config(config: &SouvenirConfig) -> Result<Self, SouvenirError> {
        let rules = RuleSet::from_config(&config.rules)?;
        Self::new(rules, config)
    }

    pub fn builtin() -> Result<Self, SouvenirError> {
        Self::new(RuleSet::builtin()?, &SouvenirConfig::default())
    }

    pub fn new_session(&self) -> SuggestionSession {
        self.suggestions.new_session()
    }

    pub fn process_turn(
        &self,
        utterance: &str,
        context: Option<&ConversationContext>,
        memory: &[StoredFact],
        session: &SuggestionSession,
        max_suggestions: usize,
    ) -> TurnOutcome {
        if text::normalize(utterance).is_none() {
            return TurnOutcome::default();
        }
        let mut report = TurnReport::default();

        let changes = self.classifier.detect_changes(utterance, context, memory);
        let mut candidates = self.extractor.extract(utterance);
        report.regex_hits = candidates.len();
        if candidates.is_empty() {
            candidates = self.classifier.classify(utterance, context, memory);
            report.contextual_hits = candidates.len();
        }

        let contradictions = self.detector.detect_contradictions(utterance, memory);
        report.contradictions = contradictions.len();

        let consolidation = self.consolidator.consolidate_detailed(candidates);
        report.dropped_low_confidence = consolidation.dropped_low_confidence;
        report.dropped_duplicates = consolidation.dropped_duplicates;

        let mut recent: Vec<String> = context
            .map(|c| c.recent_utterances.clone())
            .unwrap_or_default();
        recent.push(utterance.to_string());
        let suggestions =
            self.suggestions
                .generate_suggestions(session, &recent, memory, max_suggestions);

        info!(
            "Turn processed: {} fact(s) kept ({} regex, {} contextual, {} below floor, {} duplicate), {} contradiction(s), {} suggestion(s)",
            consolidation.facts.len(),
            report.regex_hits,
            report.contextual_hits,
            report.dropped_low_confidence,
            report.dropped_duplicates,
            report.contradictions,
            suggestions.len()
        );

        TurnOutcome {
            facts: consolidation.facts,
            contradictions,
            changes,
            suggestions,
            report,
        }
    }
}
