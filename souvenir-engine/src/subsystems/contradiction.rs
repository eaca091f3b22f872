//! Contradiction Detector — like-with-like conflicts against stored memory
//!
//! Subject families (severity, category compared):
//! - age            `j'ai N ans`                 (0.9, identité)
//! - location       `j'habite à|au|en X`         (0.8, localisation)
//! - self-identity  `je suis (un |une )?X`       (0.7, profession)
//!
//! Each family recognises the first-person form a user types and the
//! third-person form the extractor stores ("L'utilisateur a 29 ans"), so a new
//! utterance can be compared with stored facts. Only stored facts of the
//! family's category are scanned, and only values of that category are
//! compared: "je suis marié" is a relations value and never meets a stored
//! profession. For self-identity the category of a value is the category of the
//! extraction rule that recognises `je suis <value>`.
//!
//! Every clause of the new fact counts. A stored value repeated anywhere in the
//! utterance is confirmed, not contradicted. Values are compared after
//! lowercasing and whitespace normalisation only: "Paris" and "la capitale"
//! are different values. A missed conflict is preferred over a false one that
//! would overwrite correct memory.

use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use souvenir_core::error::RuleError;
use souvenir_core::models::{Category, Contradiction, StoredFact, Subject};
use souvenir_core::rules::RuleSet;
use souvenir_core::text;

/// Value tail: stops at punctuation or a coordinating word
const VALUE_TAIL: &str = r"[^,.;!?]+?)(?:\s+(?:et|mais|car|donc|depuis|parce|puis|pour|avec)\b|[,.;!?]|$)";

struct FamilySpec {
    subject: Subject,
    severity: f32,
    category: Category,
    first_person: &'static str,
    stored: &'static str,
    /// Values that are states or other families' business, not identities
    skip_value: Option<&'static str>,
    /// First-person sentence used to ask the pattern rules which category a
    /// value belongs to. `None` when the regex already pins the category.
    kind_probe: Option<&'static str>,
}

const FAMILIES: &[FamilySpec] = &[
    FamilySpec {
        subject: Subject::Age,
        severity: 0.9,
        category: Category::Identity,
        first_person: r"\bj['’]ai\s+(?P<value>\d{1,3})\s+ans\b",
        stored: r"^l['’]utilisateur\s+a\s+(?P<value>\d{1,3})\s+ans\b",
        skip_value: None,
        kind_probe: None,
    },
    FamilySpec {
        subject: Subject::Location,
        severity: 0.8,
        category: Category::Location,
        first_person: r"\bj['’]habite\s+(?P<value>(?:à|au|aux|en)\s+{TAIL}",
        stored: r"^l['’]utilisateur\s+habite\s+(?P<value>(?:à|au|aux|en)\s+{TAIL}",
        skip_value: None,
        kind_probe: None,
    },
    FamilySpec {
        subject: Subject::SelfIdentity,
        severity: 0.7,
        category: Category::Profession,
        first_person: r"\bje\s+suis\s+(?:un\s+|une\s+)?(?P<value>{TAIL}",
        stored: r"^l['’]utilisateur\s+est\s+(?:un\s+|une\s+)?(?P<value>{TAIL}",
        skip_value: Some(
            r"^(?:née?|originaire|allergique|allée?|partie?|venue?|arrivée?|rentrée?|en\s+train|en\s+couple|d['’]accord|sûre?|désolée?|contente?|ravie?|fatiguée?|malade|là|ici|à|au|en|chez|plutôt|très|assez|un\s+peu|pas)\b",
        ),
        kind_probe: Some("je suis {value}"),
    },
];

struct SubjectFamily {
    subject: Subject,
    severity: f32,
    category: Category,
    first_person: Regex,
    stored: Regex,
    skip_value: Option<Regex>,
    kind_probe: Option<&'static str>,
}

impl SubjectFamily {
    fn normalize_value(&self, value: &str) -> Option<String> {
        let normalized = value
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        if normalized.is_empty() {
            return None;
        }
        if self.skip_value.as_ref().is_some_and(|re| re.is_match(&normalized)) {
            return None;
        }
        Some(normalized)
    }

    /// Every value this family's subject takes in a first-person utterance,
    /// one per clause, in order
    fn first_person_values(&self, text: &str) -> Vec<String> {
        self.first_person
            .captures_iter(text)
            .filter_map(|caps| caps.name("value"))
            .filter_map(|m| self.normalize_value(m.as_str()))
            .collect()
    }

    /// Value asserted by a stored third-person fact
    fn stored_value(&self, content: &str) -> Option<String> {
        let caps = self.stored.captures(content.trim())?;
        self.normalize_value(caps.name("value")?.as_str())
    }

    /// All values of a text in either voice
    fn values(&self, text: &str) -> Vec<String> {
        let values = self.first_person_values(text);
        if !values.is_empty() {
            return values;
        }
        self.stored_value(text).into_iter().collect()
    }
}

fn compile(subject: Subject, pattern: &str) -> Result<Regex, RuleError> {
    RegexBuilder::new(&pattern.replace("{TAIL}", VALUE_TAIL))
        .case_insensitive(true)
        .build()
        .map_err(|source| RuleError::InvalidRegex {
            rule: format!("contradiction:{:?}", subject),
            source,
        })
}

pub struct ContradictionDetector {
    rules: Arc<RuleSet>,
    families: Vec<SubjectFamily>,
}

impl ContradictionDetector {
    pub fn new(rules: Arc<RuleSet>) -> Result<Self, RuleError> {
        let families = FAMILIES
            .iter()
            .map(|spec| {
                Ok(SubjectFamily {
                    subject: spec.subject,
                    severity: spec.severity,
                    category: spec.category,
                    first_person: compile(spec.subject, spec.first_person)?,
                    stored: compile(spec.subject, spec.stored)?,
                    skip_value: spec
                        .skip_value
                        .map(|p| compile(spec.subject, p))
                        .transpose()?,
                    kind_probe: spec.kind_probe,
                })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        Ok(Self { rules, families })
    }

    pub fn detect_contradictions(
        &self,
        new_fact: &str,
        memory: &[StoredFact],
    ) -> Vec<Contradiction> {
        let Some(new_fact) = text::normalize(new_fact) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for family in &self.families {
            let new_values: Vec<String> = family
                .values(new_fact)
                .into_iter()
                .filter(|v| self.is_of_family_kind(family, v))
                .collect();
            let Some(new_value) = new_values.first() else {
                continue;
            };

            for stored in memory.iter().filter(|f| f.category == family.category) {
                let Some(old_value) = family.stored_value(&stored.content) else {
                    continue;
                };
                if !self.is_of_family_kind(family, &old_value) || new_values.contains(&old_value) {
                    continue;
                }
                tracing::debug!(
                    "Contradiction on {:?}: \"{}\" vs stored \"{}\"",
                    family.subject,
                    new_value,
                    old_value
                );
                out.push(Contradiction {
                    subject: family.subject,
                    existing: stored.content.clone(),
                    conflict: format!(
                        "{} : « {} » contredit « {} » déjà enregistré",
                        family.subject.label(),
                        new_value,
                        old_value
                    ),
                    severity: family.severity,
                });
            }
        }
        out
    }

    /// Whether a value belongs to the family's category. Values no pattern
    /// rule recognises are never compared.
    fn is_of_family_kind(&self, family: &SubjectFamily, value: &str) -> bool {
        let Some(probe) = family.kind_probe else {
            return true;
        };
        let sentence = probe.replace("{value}", value);
        self.rules
            .patterns
            .iter()
            .find(|rule| {
                rule.regex.is_match(&sentence)
                    && !rule.exclude.as_ref().is_some_and(|ex| ex.is_match(&sentence))
            })
            .is_some_and(|rule| rule.category == family.category)
    }
}
