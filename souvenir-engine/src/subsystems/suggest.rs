//! Gap/Suggestion Engine — proactive follow-up questions
//!
//! `generate_suggestions`: rules whose trigger words appear in recent turns
//! propose their questions. confidence = min(0.9, 0.5 + 0.2 × triggers hit);
//! +2 priority when the rule's category has nothing in memory. Questions
//! already used in this session, or already answered by stored memory, are
//! skipped. Ranked by priority × confidence.
//!
//! `analyze_memory_gaps`: one question per category missing from memory,
//! +3 priority.
//!
//! The engine itself is stateless and shared. The used-question set lives in a
//! `SuggestionSession`, one per conversation.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use souvenir_core::config::SuggestionConfig;
use souvenir_core::models::{Category, MemoryGaps, StoredFact, Suggestion};
use souvenir_core::rules::RuleSet;
use souvenir_core::text;

// ============================================================================
// SESSION STATE
// ============================================================================

/// Per-conversation record of surfaced or dismissed suggestions.
///
/// Ids move from unused to used and never back. Only the most recent
/// `capacity` ids are kept; the oldest are forgotten first.
#[derive(Debug, Clone)]
pub struct SuggestionSession {
    used: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SuggestionSession {
    pub fn new(capacity: usize) -> Self {
        Self {
            used: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Mark a suggestion as used. Idempotent: marking an id twice does not
    /// refresh its position. Returns whether the id was newly recorded.
    pub fn mark_used(&mut self, id: &str) -> bool {
        if self.used.contains(id) {
            return false;
        }
        self.used.insert(id.to_string());
        self.order.push_back(id.to_string());
        self.trim_to(self.capacity);
        true
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    /// Keep only the `keep` most recently marked ids
    pub fn trim_to(&mut self, keep: usize) {
        while self.order.len() > keep {
            if let Some(oldest) = self.order.pop_front() {
                self.used.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct SuggestionEngine {
    rules: Arc<RuleSet>,
    config: SuggestionConfig,
}

impl SuggestionEngine {
    pub fn new(rules: Arc<RuleSet>, config: &SuggestionConfig) -> Self {
        Self {
            rules,
            config: config.clone(),
        }
    }

    pub fn new_session(&self) -> SuggestionSession {
        SuggestionSession::new(self.config.used_capacity)
    }

    pub fn default_max(&self) -> usize {
        self.config.default_max
    }

    pub fn generate_suggestions(
        &self,
        session: &SuggestionSession,
        recent_utterances: &[String],
        memory: &[StoredFact],
        max: usize,
    ) -> Vec<Suggestion> {
        let conversation = recent_utterances
            .iter()
            .map(|u| u.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        if max == 0 || text::normalize(&conversation).is_none() {
            return Vec::new();
        }

        let present = present_categories(memory);
        let answered: BTreeSet<String> = memory
            .iter()
            .flat_map(|f| text::keyword_stems(&f.content))
            .collect();

        let mut out = Vec::new();
        for rule in &self.rules.suggestions {
            let hits: Vec<&str> = rule
                .triggers
                .iter()
                .filter(|t| text::contains_term(&conversation, t))
                .map(String::as_str)
                .collect();
            if hits.is_empty() {
                continue;
            }

            let confidence = (self.config.base_confidence
                + self.config.trigger_step * hits.len() as f32)
                .min(self.config.confidence_cap);
            let absent = !present.contains(&rule.category);
            let priority = rule.priority
                + if absent {
                    self.config.absent_category_bonus
                } else {
                    0
                };

            let mut context = format!("Mots déclencheurs : {}", hits.join(", "));
            if absent {
                context.push_str(&format!(
                    " (aucune information « {} » en mémoire)",
                    rule.category
                ));
            }

            for (index, question) in rule.questions.iter().enumerate() {
                let id = rule.question_id(index);
                if session.is_used(&id) {
                    continue;
                }
                if is_answered(question, &answered) {
                    tracing::debug!("Suggestion {} skipped: already answered in memory", id);
                    continue;
                }
                out.push(Suggestion {
                    id,
                    question: question.clone(),
                    category: rule.category,
                    priority,
                    confidence,
                    context: context.clone(),
                });
            }
        }

        out.sort_by(|a, b| b.score().total_cmp(&a.score()));
        out.truncate(max);
        out
    }

    pub fn analyze_memory_gaps(&self, memory: &[StoredFact]) -> MemoryGaps {
        let present = present_categories(memory);
        let missing_categories: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| !present.contains(c))
            .collect();

        let mut suggestions: Vec<Suggestion> = missing_categories
            .iter()
            .filter_map(|category| {
                let rule = self.rules.first_suggestion_rule(*category)?;
                let question = rule.questions.first()?;
                Some(Suggestion {
                    id: rule.question_id(0),
                    question: question.clone(),
                    category: *category,
                    priority: rule.priority + self.config.gap_bonus,
                    confidence: self.config.gap_confidence,
                    context: format!("Aucune information enregistrée pour « {} »", category),
                })
            })
            .collect();
        suggestions.sort_by(|a, b| b.priority.cmp(&a.priority));

        MemoryGaps {
            missing_categories,
            suggestions,
        }
    }

    /// Stored facts per category, in taxonomy order
    pub fn category_coverage(&self, memory: &[StoredFact]) -> Vec<(Category, usize)> {
        Category::ALL
            .into_iter()
            .map(|c| (c, memory.iter().filter(|f| f.category == c).count()))
            .collect()
    }
}

fn present_categories(memory: &[StoredFact]) -> BTreeSet<Category> {
    memory.iter().map(|f| f.category).collect()
}

fn is_answered(question: &str, answered: &BTreeSet<String>) -> bool {
    text::keyword_stems(question)
        .iter()
        .any(|stem| answered.contains(stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SuggestionEngine {
        let rules = Arc::new(RuleSet::builtin().expect("built-in rules"));
        SuggestionEngine::new(rules, &SuggestionConfig::default())
    }

    fn utterances(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // ========================================================================
    // TEST: session marking
    // ========================================================================
    #[test]
    fn test_mark_used_is_idempotent() {
        let mut once = SuggestionSession::new(8);
        let mut twice = SuggestionSession::new(8);
        assert!(once.mark_used("loisirs.base:0"));
        assert!(twice.mark_used("loisirs.base:0"));
        assert!(!twice.mark_used("loisirs.base:0"));

        assert_eq!(once.len(), twice.len());
        assert!(once.is_used("loisirs.base:0") && twice.is_used("loisirs.base:0"));
    }

    #[test]
    fn test_session_trims_oldest() {
        let mut session = SuggestionSession::new(2);
        session.mark_used("a");
        session.mark_used("b");
        session.mark_used("a");
        session.mark_used("c");
        assert!(!session.is_used("a"));
        assert!(session.is_used("b") && session.is_used("c"));
        assert_eq!(session.len(), 2);

        session.trim_to(1);
        assert!(session.is_used("c"));
        assert!(!session.is_used("b"));
        assert_eq!(SuggestionSession::new(0).capacity(), 1);
    }

    // ========================================================================
    // TEST: trigger scoring and absent-category bonus
    // ========================================================================
    #[test]
    fn test_generate_scores_and_bonus() {
        let engine = engine();
        let session = engine.new_session();
        let suggestions = engine.generate_suggestions(
            &session,
            &utterances(&["Ce week-end j'ai fait du sport"]),
            &[],
            10,
        );

        let hobbies: Vec<&Suggestion> = suggestions
            .iter()
            .filter(|s| s.category == Category::Hobbies)
            .collect();
        assert_eq!(hobbies.len(), 3);
        for s in &hobbies {
            // two triggers: 0.5 + 0.4
            assert!((s.confidence - 0.9).abs() < 1e-6);
            // base 3 + 2 for an empty category
            assert_eq!(s.priority, 5);
            assert!(s.context.contains("week-end"));
        }
        assert!(suggestions.windows(2).all(|w| w[0].score() >= w[1].score()));
    }

    #[test]
    fn test_no_bonus_when_category_present() {
        let engine = engine();
        let memory = vec![StoredFact::new("L'utilisateur joue au tennis", Category::Hobbies)];
        let suggestions = engine.generate_suggestions(
            &engine.new_session(),
            &utterances(&["J'adore la musique"]),
            &memory,
            10,
        );
        let hobby = suggestions
            .iter()
            .find(|s| s.category == Category::Hobbies)
            .expect("loisirs suggestion");
        assert_eq!(hobby.priority, 3);
        assert!((hobby.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_truncates_to_max() {
        let engine = engine();
        let recent = utterances(&["Ma famille, mon travail, le sport et les vacances"]);
        let all = engine.generate_suggestions(&engine.new_session(), &recent, &[], 50);
        assert!(all.len() > 2);
        let top = engine.generate_suggestions(&engine.new_session(), &recent, &[], 2);
        assert_eq!(top, all[..2].to_vec());
        assert!(engine
            .generate_suggestions(&engine.new_session(), &recent, &[], 0)
            .is_empty());
    }

    // ========================================================================
    // TEST: used and answered suppression
    // ========================================================================
    #[test]
    fn test_used_questions_skipped() {
        let engine = engine();
        let mut session = engine.new_session();
        let recent = utterances(&["Je pars en vacances"]);

        let before = engine.generate_suggestions(&session, &recent, &[], 10);
        let first = before[0].id.clone();
        session.mark_used(&first);

        let after = engine.generate_suggestions(&session, &recent, &[], 10);
        assert_eq!(after.len(), before.len() - 1);
        assert!(after.iter().all(|s| s.id != first));
    }

    #[test]
    fn test_answered_questions_skipped() {
        let engine = engine();
        let memory = vec![StoredFact::new(
            "Le plat préféré de l'utilisateur est la pizza",
            Category::Preferences,
        )];
        let suggestions = engine.generate_suggestions(
            &engine.new_session(),
            &utterances(&["J'adore la pizza"]),
            &memory,
            10,
        );
        assert!(suggestions.iter().all(|s| !s.question.contains("plat")));
        let answered: BTreeSet<String> = memory
            .iter()
            .flat_map(|f| text::keyword_stems(&f.content))
            .collect();
        assert!(suggestions.iter().all(|s| !is_answered(&s.question, &answered)));
    }

    #[test]
    fn test_empty_conversation() {
        let engine = engine();
        assert!(engine
            .generate_suggestions(&engine.new_session(), &[], &[], 3)
            .is_empty());
        assert!(engine
            .generate_suggestions(&engine.new_session(), &utterances(&["  "]), &[], 3)
            .is_empty());
    }

    // ========================================================================
    // TEST: gap analysis
    // ========================================================================
    #[test]
    fn test_gaps_on_empty_memory() {
        let gaps = engine().analyze_memory_gaps(&[]);
        assert_eq!(gaps.missing_categories, Category::ALL.to_vec());
        assert_eq!(gaps.suggestions.len(), Category::ALL.len());
        assert!(gaps.suggestions.windows(2).all(|w| w[0].priority >= w[1].priority));
        // identité has the highest base priority (5 + 3)
        assert_eq!(gaps.suggestions[0].category, Category::Identity);
        assert_eq!(gaps.suggestions[0].priority, 8);
        assert_eq!(gaps.suggestions[0].question, "Comment vous appelez-vous ?");
    }

    #[test]
    fn test_gaps_skip_present_categories() {
        let memory = vec![
            StoredFact::new("L'utilisateur a 29 ans", Category::Identity),
            StoredFact::new("L'utilisateur habite à Lyon", Category::Location),
        ];
        let gaps = engine().analyze_memory_gaps(&memory);
        assert_eq!(gaps.missing_categories.len(), 9);
        assert!(!gaps.missing_categories.contains(&Category::Identity));
        assert!(gaps.suggestions.iter().all(|s| s.category != Category::Location));

        let health: Vec<&Suggestion> = gaps
            .suggestions
            .iter()
            .filter(|s| s.category == Category::Health)
            .collect();
        assert_eq!(health.len(), 1);
        assert_eq!(health[0].priority, 3 + 3);
    }

    #[test]
    fn test_category_coverage() {
        let memory = vec![
            StoredFact::new("a", Category::Health),
            StoredFact::new("b", Category::Health),
            StoredFact::new("c", Category::General),
        ];
        let coverage = engine().category_coverage(&memory);
        assert_eq!(coverage.len(), 11);
        assert_eq!(coverage[6], (Category::Health, 2));
        assert_eq!(coverage[10], (Category::General, 1));
        assert_eq!(coverage[0], (Category::Identity, 0));
    }
}
