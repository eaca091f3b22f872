use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed taxonomy used to classify everything the pipeline remembers.
///
/// Serialized with its French label (`"identité"`, `"santé"`, ...), which is
/// also the form used by rule files and by the memory store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "identité")]
    Identity,
    #[serde(rename = "localisation")]
    Location,
    #[serde(rename = "profession")]
    Profession,
    #[serde(rename = "préférences")]
    Preferences,
    #[serde(rename = "relations")]
    Relations,
    #[serde(rename = "habitudes")]
    Habits,
    #[serde(rename = "santé")]
    Health,
    #[serde(rename = "loisirs")]
    Hobbies,
    #[serde(rename = "voyages")]
    Travel,
    #[serde(rename = "personnalité")]
    Personality,
    #[serde(rename = "général")]
    General,
}

impl Category {
    /// Taxonomy order. Gap analysis and coverage reports follow it.
    pub const ALL: [Category; 11] = [
        Category::Identity,
        Category::Location,
        Category::Profession,
        Category::Preferences,
        Category::Relations,
        Category::Habits,
        Category::Health,
        Category::Hobbies,
        Category::Travel,
        Category::Personality,
        Category::General,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Identity => "identité",
            Category::Location => "localisation",
            Category::Profession => "profession",
            Category::Preferences => "préférences",
            Category::Relations => "relations",
            Category::Habits => "habitudes",
            Category::Health => "santé",
            Category::Hobbies => "loisirs",
            Category::Travel => "voyages",
            Category::Personality => "personnalité",
            Category::General => "général",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.label() == wanted)
            .ok_or(UnknownCategory(s.to_string()))
    }
}
