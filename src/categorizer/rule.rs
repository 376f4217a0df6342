//! Compiled category rules.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::models::CategoryDefinition;

/// Errors raised while compiling a category rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("Category name must not be empty")]
    EmptyName,

    #[error("Rule '{rule}': invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        message: String,
    },
}

/// Regexes derived from a [`CategoryDefinition`].
#[derive(Debug)]
pub(crate) struct RuleMatchers {
    pub keywords: Vec<Regex>,
    pub patterns: Vec<Regex>,
    pub dates: Vec<Regex>,
}

/// A rule as held by the rule store.
///
/// `seq` is the insertion sequence used to break priority ties. A rule that
/// failed to compile keeps its definition and error so it can be reported,
/// but never matches.
#[derive(Debug)]
pub(crate) struct CompiledRule {
    pub definition: CategoryDefinition,
    pub seq: u64,
    pub matchers: Result<RuleMatchers, RuleError>,
}

impl CompiledRule {
    pub fn compile(definition: CategoryDefinition, seq: u64) -> Self {
        let matchers = compile_matchers(&definition);
        Self {
            definition,
            seq,
            matchers,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn priority(&self) -> i32 {
        self.definition.priority
    }
}

fn compile_matchers(def: &CategoryDefinition) -> Result<RuleMatchers, RuleError> {
    let invalid = |pattern: &str, err: regex::Error| RuleError::InvalidPattern {
        rule: def.name.clone(),
        pattern: pattern.to_string(),
        message: err.to_string(),
    };

    let mut keywords = Vec::with_capacity(def.keywords.len());
    for keyword in &def.keywords {
        if keyword.trim().is_empty() {
            continue;
        }
        keywords.push(keyword_regex(keyword).map_err(|e| invalid(keyword, e))?);
    }

    let mut patterns = Vec::with_capacity(def.patterns.len());
    for pattern in &def.patterns {
        patterns.push(pattern_regex(pattern).map_err(|e| invalid(pattern, e))?);
    }

    let mut dates = Vec::with_capacity(def.date_patterns.len());
    for pattern in &def.date_patterns {
        dates.push(pattern_regex(pattern).map_err(|e| invalid(pattern, e))?);
    }

    Ok(RuleMatchers {
        keywords,
        patterns,
        dates,
    })
}

/// Case-insensitive whole-word matcher for a keyword.
///
/// Word boundaries are only anchored on sides where the keyword itself
/// starts or ends with a word character; inner whitespace matches any run
/// of whitespace.
pub(crate) fn keyword_regex(keyword: &str) -> Result<Regex, regex::Error> {
    let keyword = keyword.trim();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut pattern = String::new();
    if keyword.chars().next().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    let escaped = regex::escape(keyword);
    pattern.push_str(&escaped.split_whitespace().collect::<Vec<_>>().join(r"\s+"));
    if keyword.chars().last().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }

    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

/// Compile a filename pattern, accepting `/body/flags` delimited syntax.
pub(crate) fn pattern_regex(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(strip_delimiters(pattern.trim()))
        .case_insensitive(true)
        .build()
}

/// `"/\bMOU\b/i"` -> `"\bMOU\b"`; anything else is returned unchanged.
fn strip_delimiters(pattern: &str) -> &str {
    if let Some(rest) = pattern.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let flags = &rest[end + 1..];
            if flags.chars().all(|c| "gimsuxyU".contains(c)) {
                return &rest[..end];
            }
        }
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_whole_word() {
        let re = keyword_regex("tor").unwrap();
        assert!(re.is_match("Official TOR of student"));
        assert!(!re.is_match("the director signed"));
    }

    #[test]
    fn test_keyword_multi_word() {
        let re = keyword_regex("Student Record").unwrap();
        assert!(re.is_match("student   record request"));
        assert!(!re.is_match("studentrecord"));
    }

    #[test]
    fn test_keyword_with_punctuation_edges() {
        let re = keyword_regex("(MOA)").unwrap();
        assert!(re.is_match("signed (moa) copy"));
    }

    #[test]
    fn test_strip_delimiters() {
        assert_eq!(strip_delimiters(r"/\bMOU\b/i"), r"\bMOU\b");
        assert_eq!(strip_delimiters("mou|moa"), "mou|moa");
        assert_eq!(strip_delimiters("/usr/share"), "/usr/share");
    }

    #[test]
    fn test_pattern_is_case_insensitive() {
        let re = pattern_regex(r"/\b(MOU|MOA)\b/i").unwrap();
        assert!(re.is_match("partnership mou 2024"));
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let def = CategoryDefinition::new("Broken", 1).with_patterns(["(unclosed"]);
        let rule = CompiledRule::compile(def, 0);
        match rule.matchers {
            Err(RuleError::InvalidPattern { rule, pattern, .. }) => {
                assert_eq!(rule, "Broken");
                assert_eq!(pattern, "(unclosed");
            }
            other => panic!("expected invalid pattern, got {:?}", other),
        }
    }
}
