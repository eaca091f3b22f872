//! Consolidation Engine — one pass from raw candidates to storable facts
//!
//! 1. stable sort by confidence, highest first
//! 2. drop anything at or below the confidence floor (0.6)
//! 3. drop anything whose word-level Jaccard similarity to an already accepted
//!    candidate exceeds 0.7
//!
//! Near-duplicate phrasings therefore collapse to their most trusted variant
//! and the output order is the trust order.

use souvenir_core::config::ConsolidationConfig;
use souvenir_core::models::CandidateFact;
use souvenir_core::text;

/// Output of a consolidation pass with what was dropped and why
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Consolidation {
    pub facts: Vec<CandidateFact>,
    pub dropped_low_confidence: usize,
    pub dropped_duplicates: usize,
}

pub struct Consolidator {
    min_confidence: f32,
    max_similarity: f32,
}

impl Consolidator {
    pub fn new(config: &ConsolidationConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            max_similarity: config.max_similarity,
        }
    }

    pub fn consolidate(&self, candidates: Vec<CandidateFact>) -> Vec<CandidateFact> {
        self.consolidate_detailed(candidates).facts
    }

    pub fn consolidate_detailed(&self, mut candidates: Vec<CandidateFact>) -> Consolidation {
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut report = Consolidation::default();
        for candidate in candidates {
            if candidate.confidence <= self.min_confidence {
                report.dropped_low_confidence += 1;
                continue;
            }
            let duplicate = report
                .facts
                .iter()
                .any(|kept| text::jaccard(&kept.content, &candidate.content) > self.max_similarity);
            if duplicate {
                tracing::debug!("Dropping near-duplicate \"{}\"", candidate.content);
                report.dropped_duplicates += 1;
                continue;
            }
            report.facts.push(candidate);
        }
        report
    }
}
