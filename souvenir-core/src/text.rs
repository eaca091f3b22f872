//! Text helpers shared by every pipeline stage
//!
//! Two notions of "word" live here:
//! - `words`: lowercase whitespace-separated tokens, used for Jaccard similarity
//! - `keywords`: lowercase alphanumeric runs minus French stopwords, used to
//!   decide whether a question is already answered by stored memory

use std::collections::BTreeSet;

/// Number of leading characters two keywords must share to count as the same stem
const STEM_LEN: usize = 5;

/// Shortest token kept as a keyword
const MIN_KEYWORD_LEN: usize = 3;

pub const FRENCH_STOPWORDS: &[&str] = &[
    "a", "à", "ai", "au", "aux", "avec", "avez", "avoir", "c", "ça", "ce", "ces", "cet", "cette",
    "comme", "comment", "d", "dans", "de", "des", "du", "elle", "elles", "en", "est", "et", "été",
    "êtes", "être", "il", "ils", "j", "je", "l", "la", "le", "les", "leur", "leurs", "lui", "m",
    "ma", "mais", "me", "mes", "moi", "mon", "n", "ne", "nos", "notre", "nous", "on", "ont", "ou",
    "où", "par", "pas", "pour", "qu", "quand", "que", "quel", "quelle", "quelles", "quels", "qui",
    "quoi", "s", "sa", "sans", "se", "ses", "son", "sont", "sur", "t", "ta", "te", "tes", "toi",
    "ton", "tu", "un", "une", "utilisateur", "vos", "votre", "vous", "y", "plus", "très", "tout",
    "tous", "toute", "toutes", "fait", "faire", "faites", "chose", "quelque", "parlez", "moment",
];

/// Trimmed text, or `None` when nothing meaningful is left
pub fn normalize(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Lowercase whitespace-separated word set
pub fn words(text: &str) -> BTreeSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// |A ∩ B| / |A ∪ B| over word sets. Two empty texts are identical (1.0).
pub fn jaccard(a: &str, b: &str) -> f32 {
    let wa = words(a);
    let wb = words(b);
    let union = wa.union(&wb).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = wa.intersection(&wb).count();
    intersection as f32 / union as f32
}

/// Content keywords: lowercase alphanumeric runs, stopwords and short tokens removed
pub fn keywords(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN && !FRENCH_STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Keyword stems (first five characters), so "habitez" and "habite" meet
pub fn keyword_stems(text: &str) -> BTreeSet<String> {
    keywords(text)
        .into_iter()
        .map(|w| w.chars().take(STEM_LEN).collect())
        .collect()
}

/// Whether `term` occurs in `haystack` on word boundaries.
/// Both sides are expected lowercase; terms may contain spaces or hyphens.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    haystack.match_indices(term).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  bonjour \n"), Some("bonjour"));
        assert_eq!(normalize(" \t\n"), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard("Le chat dort", "le CHAT dort"), 1.0);
        assert_eq!(jaccard("a b", "c d"), 0.0);
        // {a, b, c} vs {a, b, d}: 2 / 4
        assert!((jaccard("a b c", "a b d") - 0.5).abs() < f32::EPSILON);
        assert_eq!(jaccard("", ""), 1.0);
    }

    #[test]
    fn test_keywords_drop_stopwords_and_split_apostrophes() {
        let kw = keywords("Quel est votre plat préféré ?");
        assert_eq!(
            kw.into_iter().collect::<Vec<_>>(),
            vec!["plat".to_string(), "préféré".to_string()]
        );

        let kw = keywords("L'utilisateur habite à Lyon");
        assert!(kw.contains("habite"));
        assert!(kw.contains("lyon"));
        assert!(!kw.contains("utilisateur"));
    }

    #[test]
    fn test_keyword_stems_bridge_conjugations() {
        let question = keyword_stems("Dans quelle ville habitez-vous ?");
        let fact = keyword_stems("L'utilisateur habite à Lyon");
        assert!(question.intersection(&fact).next().is_some());
    }

    #[test]
    fn test_contains_term_respects_word_boundaries() {
        assert!(contains_term("j'adore la pizza", "adore"));
        assert!(contains_term("le week-end je cours", "week-end"));
        assert!(!contains_term("je vais partir", "art"));
        assert!(!contains_term("carte postale", "car"));
        assert!(contains_term("car", "car"));
        assert!(!contains_term("anything", ""));
    }
}
