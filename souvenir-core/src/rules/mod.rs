//! Versioned rule set: extraction patterns, category lexicon, suggestion rules
//!
//! The rule set is static data. It ships embedded (`rules/default.toml`) and
//! can be replaced by a file named in `[rules] path`. Loading compiles every
//! regex and validates every template up front; a rule set that loads is a
//! rule set that cannot fail at runtime.

pub mod template;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::config::RulesConfig;
use crate::error::RuleError;
use crate::models::Category;
use crate::text;

pub use template::Template;

/// Rule set compiled into the binary
pub const BUILTIN_RULES: &str = include_str!("../../rules/default.toml");

// ============================================================================
// FILE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
struct RuleFile {
    version: String,
    #[serde(default)]
    patterns: Vec<PatternSpec>,
    #[serde(default)]
    lexicon: Vec<LexiconSpec>,
    #[serde(default)]
    suggestions: Vec<SuggestionSpec>,
}

#[derive(Debug, Deserialize)]
struct PatternSpec {
    id: String,
    category: Category,
    regex: String,
    template: String,
    confidence: f32,
    exclude: Option<String>,
    #[serde(default)]
    context_words: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LexiconSpec {
    category: Category,
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SuggestionSpec {
    id: String,
    category: Category,
    priority: u32,
    triggers: Vec<String>,
    questions: Vec<String>,
}

// ============================================================================
// COMPILED RULES
// ============================================================================

/// One extraction rule. Regexes are compiled case-insensitive.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub id: String,
    pub category: Category,
    pub regex: Regex,
    pub template: Template,
    pub base_confidence: f32,
    pub exclude: Option<Regex>,
    /// Lowercased
    pub context_words: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SuggestionRule {
    pub id: String,
    pub category: Category,
    pub priority: u32,
    /// Lowercased
    pub triggers: Vec<String>,
    pub questions: Vec<String>,
}

impl SuggestionRule {
    pub fn question_id(&self, index: usize) -> String {
        format!("{}:{}", self.id, index)
    }
}

/// Category → representative keywords, in taxonomy order
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: Vec<(Category, Vec<String>)>,
}

impl Lexicon {
    pub fn keywords(&self, category: Category) -> &[String] {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, k)| k.as_slice())
            .unwrap_or(&[])
    }

    /// Keywords of `category` present in `lowercase_text`, in lexicon order
    pub fn matches<'a>(&'a self, category: Category, lowercase_text: &str) -> Vec<&'a str> {
        self.keywords(category)
            .iter()
            .filter(|k| text::contains_term(lowercase_text, k))
            .map(String::as_str)
            .collect()
    }

    /// Category with the most keyword hits; ties go to the earlier category.
    /// `None` when nothing matches.
    pub fn best_category(&self, text: &str) -> Option<Category> {
        let lower = text.to_lowercase();
        let mut best: Option<(Category, usize)> = None;
        for (category, _) in &self.entries {
            let count = self.matches(*category, &lower).len();
            if count > 0 && best.map_or(true, |(_, n)| count > n) {
                best = Some((*category, count));
            }
        }
        best.map(|(c, _)| c)
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    pub version: String,
    pub patterns: Vec<PatternRule>,
    pub lexicon: Lexicon,
    pub suggestions: Vec<SuggestionRule>,
}

/// Counts reported by `rules_info`
#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleSetSummary {
    pub version: String,
    pub patterns: usize,
    pub lexicon_keywords: usize,
    pub suggestion_rules: usize,
    pub questions: usize,
}

impl RuleSet {
    pub fn builtin() -> Result<Self, RuleError> {
        Self::from_toml_str(BUILTIN_RULES)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RuleError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// The configured rule file, or the built-in set when none is configured
    pub fn from_config(config: &RulesConfig) -> Result<Self, RuleError> {
        match &config.path {
            Some(path) => {
                let expanded = shellexpand::tilde(path).to_string();
                tracing::info!("Loading rule set from {}", expanded);
                Self::from_path(expanded)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(raw)?;

        let patterns = compile_patterns(file.patterns)?;
        let lexicon = compile_lexicon(file.lexicon)?;
        let suggestions = compile_suggestions(file.suggestions)?;

        tracing::debug!(
            "Rule set {} loaded: {} patterns, {} suggestion rules",
            file.version,
            patterns.len(),
            suggestions.len()
        );

        Ok(Self {
            version: file.version,
            patterns,
            lexicon,
            suggestions,
        })
    }

    /// First suggestion rule for a category, in table order
    pub fn first_suggestion_rule(&self, category: Category) -> Option<&SuggestionRule> {
        self.suggestions.iter().find(|r| r.category == category)
    }

    pub fn summary(&self) -> RuleSetSummary {
        RuleSetSummary {
            version: self.version.clone(),
            patterns: self.patterns.len(),
            lexicon_keywords: Category::ALL
                .iter()
                .map(|c| self.lexicon.keywords(*c).len())
                .sum(),
            suggestion_rules: self.suggestions.len(),
            questions: self.suggestions.iter().map(|r| r.questions.len()).sum(),
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

fn compile_regex(rule: &str, pattern: &str) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| RuleError::InvalidRegex {
            rule: rule.to_string(),
            source,
        })
}

fn check_confidence(rule: &str, value: f32) -> Result<(), RuleError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RuleError::InvalidConfidence {
            rule: rule.to_string(),
            value,
        })
    }
}

fn lowercase_all(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn compile_patterns(specs: Vec<PatternSpec>) -> Result<Vec<PatternRule>, RuleError> {
    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(specs.len());

    for spec in specs {
        if !seen.insert(spec.id.clone()) {
            return Err(RuleError::DuplicateRule(spec.id));
        }
        check_confidence(&spec.id, spec.confidence)?;

        let regex = compile_regex(&spec.id, &spec.regex)?;
        let exclude = spec
            .exclude
            .as_deref()
            .map(|p| compile_regex(&spec.id, p))
            .transpose()?;

        let template = Template::parse(&spec.template).map_err(|e| {
            RuleError::MalformedPlaceholder {
                rule: spec.id.clone(),
                template: spec.template.clone(),
                position: e.0,
            }
        })?;
        // captures_len() counts group 0
        let available = regex.captures_len() - 1;
        if let Some(group) = template.max_group() {
            if group > available {
                return Err(RuleError::MissingGroup {
                    rule: spec.id,
                    group,
                    available,
                });
            }
        }

        rules.push(PatternRule {
            id: spec.id,
            category: spec.category,
            regex,
            template,
            base_confidence: spec.confidence,
            exclude,
            context_words: lowercase_all(spec.context_words),
        });
    }

    Ok(rules)
}

fn compile_lexicon(specs: Vec<LexiconSpec>) -> Result<Lexicon, RuleError> {
    let mut entries: Vec<(Category, Vec<String>)> = Vec::with_capacity(Category::ALL.len());

    for spec in specs {
        if entries.iter().any(|(c, _)| *c == spec.category) {
            return Err(RuleError::DuplicateCategory(spec.category));
        }
        let keywords = lowercase_all(spec.keywords);
        if keywords.is_empty() {
            return Err(RuleError::UncoveredCategory(spec.category, "lexicon keywords"));
        }
        entries.push((spec.category, keywords));
    }

    for category in Category::ALL {
        if !entries.iter().any(|(c, _)| *c == category) {
            return Err(RuleError::UncoveredCategory(category, "lexicon entry"));
        }
    }
    entries.sort_by_key(|(c, _)| *c);

    Ok(Lexicon { entries })
}

fn compile_suggestions(specs: Vec<SuggestionSpec>) -> Result<Vec<SuggestionRule>, RuleError> {
    let mut seen = HashSet::new();
    let mut rules = Vec::with_capacity(specs.len());

    for spec in specs {
        if !seen.insert(spec.id.clone()) {
            return Err(RuleError::DuplicateRule(spec.id));
        }
        let triggers = lowercase_all(spec.triggers);
        if triggers.is_empty() {
            return Err(RuleError::EmptyField(spec.id, "triggers"));
        }
        let questions: Vec<String> = spec
            .questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        if questions.is_empty() {
            return Err(RuleError::EmptyField(spec.id, "questions"));
        }
        rules.push(SuggestionRule {
            id: spec.id,
            category: spec.category,
            priority: spec.priority,
            triggers,
            questions,
        });
    }

    // Gap analysis needs a question for every category
    for category in Category::ALL {
        if !rules.iter().any(|r| r.category == category) {
            return Err(RuleError::UncoveredCategory(category, "suggestion rule"));
        }
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal valid lexicon + suggestion tables covering all categories
    fn coverage_tables() -> String {
        let mut out = String::new();
        for category in Category::ALL {
            out.push_str(&format!(
                "[[lexicon]]\ncategory = \"{0}\"\nkeywords = [\"mot-{0}\"]\n\n",
                category.label()
            ));
        }
        for category in Category::ALL {
            out.push_str(&format!(
                "[[suggestions]]\nid = \"s-{0}\"\ncategory = \"{0}\"\npriority = 1\ntriggers = [\"t\"]\nquestions = [\"Question {0} ?\"]\n\n",
                category.label()
            ));
        }
        out
    }

    fn with_pattern(pattern_toml: &str) -> String {
        format!("version = \"test\"\n\n{}\n{}", pattern_toml, coverage_tables())
    }

    // ========================================================================
    // TEST: built-in rule set loads and covers the taxonomy
    // ========================================================================
    #[test]
    fn test_builtin_rules_load() {
        let rules = RuleSet::builtin().expect("built-in rules must load");
        assert!(!rules.version.is_empty());
        assert!(rules.patterns.len() >= 20);
        for category in Category::ALL {
            assert!(!rules.lexicon.keywords(category).is_empty(), "{category}");
            assert!(rules.first_suggestion_rule(category).is_some(), "{category}");
        }
        let summary = rules.summary();
        assert_eq!(summary.patterns, rules.patterns.len());
        assert!(summary.questions >= summary.suggestion_rules);
    }

    // ========================================================================
    // TEST: invalid regex fails at load time
    // ========================================================================
    #[test]
    fn test_invalid_regex_fails_fast() {
        let raw = with_pattern(
            "[[patterns]]\nid = \"broken\"\ncategory = \"identité\"\nregex = '''j'ai (\\d+ ans'''\ntemplate = \"x\"\nconfidence = 0.9\n",
        );
        let err = RuleSet::from_toml_str(&raw).unwrap_err();
        assert!(matches!(err, RuleError::InvalidRegex { ref rule, .. } if rule == "broken"));
    }

    // ========================================================================
    // TEST: template referencing a missing group fails at load time
    // ========================================================================
    #[test]
    fn test_missing_template_group_fails_fast() {
        let raw = with_pattern(
            "[[patterns]]\nid = \"age\"\ncategory = \"identité\"\nregex = '''j'ai (\\d+) ans'''\ntemplate = \"L'utilisateur a {2} ans\"\nconfidence = 0.9\n",
        );
        let err = RuleSet::from_toml_str(&raw).unwrap_err();
        assert!(matches!(
            err,
            RuleError::MissingGroup { group: 2, available: 1, .. }
        ));
    }

    #[test]
    fn test_malformed_template_fails_fast() {
        let raw = with_pattern(
            "[[patterns]]\nid = \"age\"\ncategory = \"identité\"\nregex = '''j'ai (\\d+) ans'''\ntemplate = \"a {un} ans\"\nconfidence = 0.9\n",
        );
        let err = RuleSet::from_toml_str(&raw).unwrap_err();
        assert!(matches!(err, RuleError::MalformedPlaceholder { position: 2, .. }));
    }

    #[test]
    fn test_invalid_exclusion_regex_fails_fast() {
        let raw = with_pattern(
            "[[patterns]]\nid = \"age\"\ncategory = \"identité\"\nregex = '''j'ai (\\d+) ans'''\ntemplate = \"{1}\"\nconfidence = 0.9\nexclude = \"(\"\n",
        );
        assert!(matches!(
            RuleSet::from_toml_str(&raw).unwrap_err(),
            RuleError::InvalidRegex { .. }
        ));
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let raw = with_pattern(
            "[[patterns]]\nid = \"age\"\ncategory = \"identité\"\nregex = '''ans'''\ntemplate = \"x\"\nconfidence = 1.5\n",
        );
        assert!(matches!(
            RuleSet::from_toml_str(&raw).unwrap_err(),
            RuleError::InvalidConfidence { .. }
        ));
    }

    #[test]
    fn test_duplicate_pattern_ids_rejected() {
        let rule = "[[patterns]]\nid = \"dup\"\ncategory = \"identité\"\nregex = '''ans'''\ntemplate = \"x\"\nconfidence = 0.5\n\n";
        let raw = with_pattern(&format!("{rule}{rule}"));
        assert!(matches!(
            RuleSet::from_toml_str(&raw).unwrap_err(),
            RuleError::DuplicateRule(ref id) if id == "dup"
        ));
    }

    #[test]
    fn test_missing_category_coverage_rejected() {
        let raw = "version = \"test\"\n[[lexicon]]\ncategory = \"santé\"\nkeywords = [\"médecin\"]\n";
        assert!(matches!(
            RuleSet::from_toml_str(raw).unwrap_err(),
            RuleError::UncoveredCategory(Category::Identity, _)
        ));
    }

    #[test]
    fn test_unknown_category_is_parse_error() {
        let raw = with_pattern(
            "[[patterns]]\nid = \"x\"\ncategory = \"cuisine\"\nregex = '''ans'''\ntemplate = \"x\"\nconfidence = 0.5\n",
        );
        assert!(matches!(RuleSet::from_toml_str(&raw).unwrap_err(), RuleError::Parse(_)));
    }

    #[test]
    fn test_patterns_are_case_insensitive() {
        let raw = with_pattern(
            "[[patterns]]\nid = \"age\"\ncategory = \"identité\"\nregex = '''j'ai (\\d+) ans'''\ntemplate = \"{1}\"\nconfidence = 0.9\ncontext_words = [\"  ÂGE \"]\n",
        );
        let rules = RuleSet::from_toml_str(&raw).unwrap();
        assert!(rules.patterns[0].regex.is_match("J'AI 40 ANS"));
        assert_eq!(rules.patterns[0].context_words, vec!["âge".to_string()]);
    }

    #[test]
    fn test_from_path_and_config() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", with_pattern("")).unwrap();

        let config = RulesConfig {
            path: Some(file.path().display().to_string()),
        };
        let rules = RuleSet::from_config(&config).unwrap();
        assert_eq!(rules.version, "test");
        assert!(rules.patterns.is_empty());

        let missing = RulesConfig {
            path: Some("/nonexistent/rules.toml".to_string()),
        };
        assert!(matches!(
            RuleSet::from_config(&missing).unwrap_err(),
            RuleError::Read { .. }
        ));
    }

    #[test]
    fn test_lexicon_best_category() {
        let rules = RuleSet::builtin().unwrap();
        assert_eq!(
            rules.lexicon.best_category("Je fais du sport tous les week-end, c'est ma passion"),
            Some(Category::Hobbies)
        );
        assert_eq!(rules.lexicon.best_category("Bonjour"), None);
    }
}
