//! Pattern Extractor — utterance → candidate facts via the ordered rule table
//!
//! For each rule, in table order:
//! - the regex must match and the exclusion regex (if any) must not
//! - the template is rendered from the first match's capture groups
//! - confidence = base, +0.1 (capped at 0.95) when a context word co-occurs
//!
//! No deduplication here: one utterance can fire several rules, and the
//! Consolidation Engine collapses near-duplicates afterwards.

use std::sync::Arc;

use souvenir_core::config::ExtractionConfig;
use souvenir_core::models::{CandidateFact, FactSource};
use souvenir_core::rules::{PatternRule, RuleSet};
use souvenir_core::text;

pub struct PatternExtractor {
    rules: Arc<RuleSet>,
    context_boost: f32,
    boost_cap: f32,
}

impl PatternExtractor {
    pub fn new(rules: Arc<RuleSet>, config: &ExtractionConfig) -> Self {
        Self {
            rules,
            context_boost: config.context_boost,
            boost_cap: config.boost_cap,
        }
    }

    pub fn extract(&self, utterance: &str) -> Vec<CandidateFact> {
        let Some(text) = text::normalize(utterance) else {
            return Vec::new();
        };
        let lower = text.to_lowercase();

        self.rules
            .patterns
            .iter()
            .filter_map(|rule| self.apply_rule(rule, text, &lower))
            .collect()
    }

    fn apply_rule(&self, rule: &PatternRule, text: &str, lower: &str) -> Option<CandidateFact> {
        let caps = rule.regex.captures(text)?;
        if rule.exclude.as_ref().is_some_and(|ex| ex.is_match(text)) {
            tracing::debug!("Rule {} matched but was excluded", rule.id);
            return None;
        }

        let content = rule.template.render(&caps);
        if content.is_empty() {
            return None;
        }

        let boosted_by = rule
            .context_words
            .iter()
            .find(|w| text::contains_term(lower, w));
        let confidence = match boosted_by {
            Some(_) => boost(rule.base_confidence, self.context_boost, self.boost_cap),
            None => rule.base_confidence,
        };

        tracing::debug!(
            "Rule {} fired: \"{}\" (confidence {:.2})",
            rule.id,
            content,
            confidence
        );

        let reasoning = match boosted_by {
            Some(word) => format!("Règle {} (renforcée par « {} »)", rule.id, word),
            None => format!("Règle {}", rule.id),
        };

        Some(
            CandidateFact::new(content, rule.category, confidence, FactSource::Regex)
                .with_reasoning(reasoning),
        )
    }
}

/// Additive boost, capped, and never below the base
fn boost(base: f32, amount: f32, cap: f32) -> f32 {
    (base + amount).min(cap).max(base).min(1.0)
}
