//! Contextual Classifier — cheaper, weaker candidates when no pattern fires
//!
//! Two independent passes over one utterance:
//! - Lexicon pass: one candidate per category whose keywords appear,
//!   confidence = min(0.8, 0.5 + 0.1 × hits), +0.15 (cap 0.9) when the current
//!   topic names the category
//! - Change pass: linguistic triggers ("en fait", "maintenant", "donc", ...)
//!   tag the utterance as a correction, update, addition or inference
//!
//! Corrections are anchored to the most recent same-category utterance in the
//! last three turns (`old_content`). An unanchored correction is still emitted
//! with `old_content = None`; `degrade_unanchored_corrections` turns it into an
//! addition instead. A correction is dropped outright when nothing in memory
//! shares its category: there is nothing to correct.

use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use souvenir_core::config::ContextualConfig;
use souvenir_core::error::RuleError;
use souvenir_core::models::{CandidateFact, Category, ConversationContext, FactSource, StoredFact};
use souvenir_core::rules::RuleSet;
use souvenir_core::text;

// ============================================================================
// CHANGE PATTERNS
// ============================================================================

/// Kind of contextual change an utterance signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Correction,
    BeforeAfter,
    Update,
    LifeChange,
    Addition,
    Inference,
    CausalInference,
}

struct ChangePatternSpec {
    kind: ChangeKind,
    priority: u8,
    source: FactSource,
    confidence: f32,
    triggers: &'static [&'static str],
    description: &'static str,
}

/// Evaluated in priority order. Triggers are regex fragments.
const CHANGE_PATTERNS: &[ChangePatternSpec] = &[
    ChangePatternSpec {
        kind: ChangeKind::Correction,
        priority: 10,
        source: FactSource::Correction,
        confidence: 0.9,
        triggers: &[
            r"en\s+fait",
            r"je\s+me\s+suis\s+trompée?",
            r"je\s+voulais\s+dire",
            r"je\s+corrige",
            r"correction",
            r"rectification",
            r"c['’]est\s+faux",
            r"non\s*,",
        ],
        description: "l'utilisateur rectifie une information précédente",
    },
    ChangePatternSpec {
        kind: ChangeKind::BeforeAfter,
        priority: 9,
        source: FactSource::Update,
        confidence: 0.85,
        triggers: &[
            r"avant[^.!?]*maintenant",
            r"auparavant",
            r"autrefois",
            r"j['’]ai\s+arrêté",
            r"je\s+ne\s+\p{L}+\s+plus",
            r"n['’]\p{L}+\s+plus",
        ],
        description: "l'utilisateur oppose une situation passée à la situation actuelle",
    },
    ChangePatternSpec {
        kind: ChangeKind::Update,
        priority: 8,
        source: FactSource::Update,
        confidence: 0.8,
        triggers: &[
            r"maintenant",
            r"désormais",
            r"dorénavant",
            r"à\s+présent",
            r"depuis\s+peu",
            r"actuellement",
        ],
        description: "l'utilisateur met à jour une information",
    },
    ChangePatternSpec {
        kind: ChangeKind::LifeChange,
        priority: 8,
        source: FactSource::Update,
        confidence: 0.8,
        triggers: &[
            r"j['’]ai\s+déménagé",
            r"je\s+me\s+suis\s+mariée?",
            r"j['’]ai\s+changé\s+de",
            r"nouveau\s+(?:travail|boulot|poste|job|appartement)",
            r"nouvelle\s+(?:ville|maison|voiture|entreprise)",
            r"je\s+viens\s+de\s+(?:commencer|déménager|rencontrer|changer)",
            r"j['’]ai\s+eu\s+un\s+bébé",
            r"je\s+suis\s+à\s+la\s+retraite",
        ],
        description: "l'utilisateur annonce un changement de vie",
    },
    ChangePatternSpec {
        kind: ChangeKind::Addition,
        priority: 7,
        source: FactSource::Addition,
        confidence: 0.75,
        triggers: &[
            r"d['’]ailleurs",
            r"aussi",
            r"également",
            r"en\s+plus",
            r"de\s+plus",
            r"par\s+ailleurs",
        ],
        description: "l'utilisateur complète une information",
    },
    ChangePatternSpec {
        kind: ChangeKind::Inference,
        priority: 6,
        source: FactSource::Inference,
        confidence: 0.65,
        triggers: &[
            r"donc",
            r"j['’]en\s+déduis",
            r"ça\s+veut\s+dire",
            r"ce\s+qui\s+signifie",
            r"du\s+coup",
        ],
        description: "l'utilisateur tire une conclusion",
    },
    ChangePatternSpec {
        kind: ChangeKind::CausalInference,
        priority: 6,
        source: FactSource::Inference,
        confidence: 0.65,
        triggers: &[
            r"parce\s+que?",
            r"car",
            r"puisque?",
            r"à\s+cause\s+d(?:e|u|es)?",
            r"grâce\s+à",
        ],
        description: "l'utilisateur donne une cause",
    },
];

struct ChangePattern {
    kind: ChangeKind,
    priority: u8,
    source: FactSource,
    confidence: f32,
    regex: Regex,
    description: &'static str,
}

fn compile_change_patterns() -> Result<Vec<ChangePattern>, RuleError> {
    let mut patterns = CHANGE_PATTERNS
        .iter()
        .map(|spec| {
            // Triggers must stand as whole words; fragments may end with
            // punctuation, so boundaries are spelled out instead of \b.
            let pattern = format!(
                r"(?:^|[^\p{{L}}\p{{N}}_])(?P<trigger>{})(?:[^\p{{L}}\p{{N}}_]|$)",
                spec.triggers.join("|")
            );
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| RuleError::InvalidRegex {
                    rule: format!("change:{:?}", spec.kind),
                    source,
                })?;
            Ok(ChangePattern {
                kind: spec.kind,
                priority: spec.priority,
                source: spec.source,
                confidence: spec.confidence,
                regex,
                description: spec.description,
            })
        })
        .collect::<Result<Vec<_>, RuleError>>()?;
    // Stable: equal priorities keep table order
    patterns.sort_by(|a, b| b.priority.cmp(&a.priority));
    Ok(patterns)
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct ContextualClassifier {
    rules: Arc<RuleSet>,
    changes: Vec<ChangePattern>,
    config: ContextualConfig,
}

impl ContextualClassifier {
    pub fn new(rules: Arc<RuleSet>, config: &ContextualConfig) -> Result<Self, RuleError> {
        Ok(Self {
            rules,
            changes: compile_change_patterns()?,
            config: config.clone(),
        })
    }

    /// Both passes: lexicon candidates followed by change candidates
    pub fn classify(
        &self,
        utterance: &str,
        context: Option<&ConversationContext>,
        memory: &[StoredFact],
    ) -> Vec<CandidateFact> {
        let mut out = self.classify_by_lexicon(utterance, context);
        out.extend(self.detect_changes(utterance, context, memory));
        out
    }

    /// Best lexicon category for a text, `général` when nothing matches
    pub fn categorize(&self, text: &str) -> Category {
        self.rules
            .lexicon
            .best_category(text)
            .unwrap_or(Category::General)
    }

    pub fn classify_by_lexicon(
        &self,
        utterance: &str,
        context: Option<&ConversationContext>,
    ) -> Vec<CandidateFact> {
        let Some(text) = text::normalize(utterance) else {
            return Vec::new();
        };
        let lower = text.to_lowercase();
        let topic = context
            .and_then(|c| c.current_topic.as_deref())
            .map(str::to_lowercase);

        let mut out = Vec::new();
        for category in self.rules.lexicon.categories() {
            let hits = self.rules.lexicon.matches(category, &lower);
            if hits.is_empty() {
                continue;
            }

            let mut confidence = (self.config.lexicon_base
                + self.config.lexicon_step * hits.len() as f32)
                .min(self.config.lexicon_cap);
            let on_topic = topic
                .as_deref()
                .is_some_and(|t| t.contains(category.label()));
            if on_topic {
                confidence = (confidence + self.config.topic_boost)
                    .min(self.config.topic_cap)
                    .max(confidence);
            }

            let mut reasoning = format!(
                "{} mot(s)-clé(s) de la catégorie « {} » : {}",
                hits.len(),
                category,
                hits.join(", ")
            );
            if on_topic {
                reasoning.push_str(" (sujet en cours)");
            }

            out.push(
                CandidateFact::new(text, category, confidence, FactSource::Contextual)
                    .with_reasoning(reasoning),
            );
        }
        out
    }

    /// Change pass only: at most one candidate per matched pattern, in
    /// priority order
    pub fn detect_changes(
        &self,
        utterance: &str,
        context: Option<&ConversationContext>,
        memory: &[StoredFact],
    ) -> Vec<CandidateFact> {
        let Some(text) = text::normalize(utterance) else {
            return Vec::new();
        };
        let category = self.categorize(text);

        let mut out = Vec::new();
        for pattern in &self.changes {
            let Some(caps) = pattern.regex.captures(text) else {
                continue;
            };
            let trigger = caps.name("trigger").map_or("", |m| m.as_str()).trim();
            let reasoning = format!("Déclencheur « {} » : {}", trigger, pattern.description);

            let candidate = if pattern.kind == ChangeKind::Correction {
                match self.correction(text, category, context, memory, reasoning) {
                    Some(candidate) => candidate,
                    None => continue,
                }
            } else {
                CandidateFact::new(text, category, pattern.confidence, pattern.source)
                    .with_reasoning(reasoning)
            };

            tracing::debug!(
                "Change pattern {:?} matched on \"{}\" (trigger \"{}\")",
                pattern.kind,
                text,
                trigger
            );
            out.push(candidate);
        }
        out
    }

    /// Which change kinds an utterance signals, in priority order
    pub fn change_kinds(&self, utterance: &str) -> Vec<ChangeKind> {
        self.changes
            .iter()
            .filter(|p| p.regex.is_match(utterance))
            .map(|p| p.kind)
            .collect()
    }

    fn correction(
        &self,
        text: &str,
        category: Category,
        context: Option<&ConversationContext>,
        memory: &[StoredFact],
        reasoning: String,
    ) -> Option<CandidateFact> {
        if !memory.iter().any(|f| f.category == category) {
            tracing::warn!(
                "Correction on \"{}\" dropped: nothing stored in category {}",
                text,
                category
            );
            return None;
        }

        let old_content = context.and_then(|ctx| {
            ctx.window(self.config.correction_window)
                .iter()
                .rev()
                .find(|prior| {
                    text::normalize(prior).is_some()
                        && self.rules.lexicon.best_category(prior) == Some(category)
                })
                .map(|prior| prior.trim().to_string())
        });

        let (source, confidence) = match (&old_content, self.config.degrade_unanchored_corrections) {
            (None, true) => (FactSource::Addition, addition_confidence()),
            _ => (FactSource::Correction, correction_confidence()),
        };
        if old_content.is_none() {
            tracing::debug!(
                "Correction on \"{}\" has no prior {} assertion in the last {} turns",
                text,
                category,
                self.config.correction_window
            );
        }

        Some(
            CandidateFact::new(text, category, confidence, source)
                .with_reasoning(reasoning)
                .with_old_content(old_content),
        )
    }
}

fn confidence_of(kind: ChangeKind) -> f32 {
    CHANGE_PATTERNS
        .iter()
        .find(|p| p.kind == kind)
        .map_or(0.0, |p| p.confidence)
}

fn correction_confidence() -> f32 {
    confidence_of(ChangeKind::Correction)
}

fn addition_confidence() -> f32 {
    confidence_of(ChangeKind::Addition)
}
