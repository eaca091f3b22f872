//! Fact templates with numbered placeholders
//!
//! `"L'utilisateur a {1} ans"` is parsed once, when the rule set loads, into
//! literal and group segments. The highest group index is checked against the
//! regex's capture groups then, so rendering can never reference a missing group.

use regex::Captures;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Group(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

/// Byte offset of a `{` that does not open a `{<digits>}` placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedPlaceholder(pub usize);

impl Template {
    pub fn parse(source: &str) -> Result<Self, MalformedPlaceholder> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }
            let mut digits = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            match (chars.next(), digits.parse::<usize>()) {
                (Some((_, '}')), Ok(group)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Group(group));
                }
                _ => return Err(MalformedPlaceholder(pos)),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Highest group index referenced, if any
    pub fn max_group(&self) -> Option<usize> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Group(g) => Some(*g),
                Segment::Literal(_) => None,
            })
            .max()
    }

    /// Substitute the captures. Optional groups that did not participate render
    /// as empty; surrounding whitespace is collapsed afterwards.
    pub fn render(&self, caps: &Captures<'_>) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Group(g) => {
                    if let Some(m) = caps.get(*g) {
                        out.push_str(m.as_str().trim());
                    }
                }
            }
        }
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_parse_and_render() {
        let template = Template::parse("L'utilisateur a {1} ans").unwrap();
        assert_eq!(template.max_group(), Some(1));

        let re = Regex::new(r"j'ai (\d+) ans").unwrap();
        let caps = re.captures("j'ai 29 ans").unwrap();
        assert_eq!(template.render(&caps), "L'utilisateur a 29 ans");
    }

    #[test]
    fn test_group_zero_is_full_match() {
        let template = Template::parse("« {0} »").unwrap();
        let re = Regex::new(r"tous les matins").unwrap();
        let caps = re.captures("je cours tous les matins").unwrap();
        assert_eq!(template.render(&caps), "« tous les matins »");
    }

    #[test]
    fn test_unmatched_optional_group_collapses_whitespace() {
        let template = Template::parse("Le {1} {2} préféré").unwrap();
        let re = Regex::new(r"(plat)(?: (favori))?").unwrap();
        let caps = re.captures("plat").unwrap();
        assert_eq!(template.render(&caps), "Le plat préféré");
    }

    #[test]
    fn test_no_placeholders() {
        let template = Template::parse("Fait constant").unwrap();
        assert_eq!(template.max_group(), None);
    }

    #[test]
    fn test_malformed_placeholders() {
        assert_eq!(Template::parse("a {x} b"), Err(MalformedPlaceholder(2)));
        assert_eq!(Template::parse("a {1 b"), Err(MalformedPlaceholder(2)));
        assert_eq!(Template::parse("a {}"), Err(MalformedPlaceholder(2)));
        assert_eq!(Template::parse("trailing {"), Err(MalformedPlaceholder(9)));
    }
}
