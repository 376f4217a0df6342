//! Rule-based document categorizer.
//!
//! Rules are evaluated by descending priority, ties broken by insertion
//! order. The first rule that matches wins; no scoring across rules is done,
//! so rule authors control the outcome purely through priorities.
//!
//! For each rule, keywords are tried first (whole-word, case-insensitive)
//! against the extracted content, or against the filename when there is no
//! content. Then the rule's filename patterns are tried against the filename.

mod rule;

use std::cmp::Reverse;
use std::path::Path;
use std::sync::RwLock;

use serde::Serialize;

use crate::models::CategoryDefinition;

pub use rule::RuleError;
use rule::CompiledRule;

/// Confidence reported for a keyword hit.
pub const KEYWORD_CONFIDENCE: f32 = 0.9;
/// Confidence reported for a filename-pattern hit.
pub const PATTERN_CONFIDENCE: f32 = 0.6;

/// How a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Keyword,
    Pattern,
}

/// Result of classifying one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Matched category; `None` means uncategorized.
    pub category: Option<String>,
    pub confidence: f32,
    pub matched_by: Option<MatchKind>,
    /// First date-pattern hit in the filename for the matched rule.
    pub matched_date: Option<String>,
}

impl Classification {
    pub fn unmatched() -> Self {
        Self {
            category: None,
            confidence: 0.0,
            matched_by: None,
            matched_date: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.category.is_some()
    }
}

#[derive(Default)]
struct RuleSet {
    /// Kept sorted in evaluation order.
    rules: Vec<CompiledRule>,
    next_seq: u64,
}

impl RuleSet {
    fn sort(&mut self) {
        self.rules
            .sort_by_key(|r| (Reverse(r.priority()), r.seq));
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.name() == name)
    }
}

/// Process-wide rule store plus the classifier that reads it.
///
/// Writers take the lock only for the duration of a single insert/remove, so
/// concurrent edits are last-write-wins and every `classify` sees a complete
/// snapshot.
pub struct CategorizerService {
    rules: RwLock<RuleSet>,
}

impl Default for CategorizerService {
    fn default() -> Self {
        Self::new()
    }
}

impl CategorizerService {
    /// Create an empty categorizer.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(RuleSet::default()),
        }
    }

    /// Create a categorizer from configured definitions.
    ///
    /// Definitions that fail to compile are kept but inactive.
    pub fn from_definitions(definitions: impl IntoIterator<Item = CategoryDefinition>) -> Self {
        let service = Self::new();
        service.reload(definitions);
        service
    }

    /// Replace every rule with the given definitions.
    pub fn reload(&self, definitions: impl IntoIterator<Item = CategoryDefinition>) {
        let mut set = RuleSet::default();
        for def in definitions {
            if def.name.trim().is_empty() {
                tracing::warn!("Ignoring category definition without a name");
                continue;
            }
            let rule = CompiledRule::compile(def, set.next_seq);
            set.next_seq += 1;
            log_invalid(&rule);
            match set.position(rule.name()) {
                Some(idx) => set.rules[idx] = rule,
                None => set.rules.push(rule),
            }
        }
        set.sort();

        let count = set.rules.len();
        *self.write() = set;
        tracing::debug!("Categorizer loaded {} rules", count);
    }

    /// Insert a rule, or replace the rule with the same name.
    ///
    /// A replaced rule keeps its original insertion slot for tie-breaking.
    /// When a pattern fails to compile the rule is still stored (inactive)
    /// and the compile error is returned.
    pub fn add_rule(&self, definition: CategoryDefinition) -> Result<(), RuleError> {
        if definition.name.trim().is_empty() {
            return Err(RuleError::EmptyName);
        }

        let mut set = self.write();
        let existing = set.position(&definition.name);
        let seq = match existing {
            Some(idx) => set.rules[idx].seq,
            None => {
                let seq = set.next_seq;
                set.next_seq += 1;
                seq
            }
        };

        let rule = CompiledRule::compile(definition, seq);
        log_invalid(&rule);
        let error = rule.matchers.as_ref().err().cloned();
        tracing::info!(
            "{} category rule '{}' (priority {})",
            if existing.is_some() { "Replaced" } else { "Added" },
            rule.name(),
            rule.priority()
        );

        match existing {
            Some(idx) => set.rules[idx] = rule,
            None => set.rules.push(rule),
        }
        set.sort();

        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Remove a rule by category name. Returns whether it existed.
    pub fn remove_rule(&self, name: &str) -> bool {
        let mut set = self.write();
        match set.position(name) {
            Some(idx) => {
                set.rules.remove(idx);
                tracing::info!("Removed category rule '{}'", name);
                true
            }
            None => false,
        }
    }

    /// Category names in evaluation order.
    pub fn categories(&self) -> Vec<String> {
        self.read()
            .rules
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    /// Definitions in evaluation order.
    pub fn rules(&self) -> Vec<CategoryDefinition> {
        self.read()
            .rules
            .iter()
            .map(|r| r.definition.clone())
            .collect()
    }

    /// Definition of a single category.
    pub fn rule(&self, name: &str) -> Option<CategoryDefinition> {
        let set = self.read();
        set.position(name).map(|idx| set.rules[idx].definition.clone())
    }

    /// Rules currently skipped because they failed to compile.
    pub fn invalid_rules(&self) -> Vec<RuleError> {
        self.read()
            .rules
            .iter()
            .filter_map(|r| r.matchers.as_ref().err().cloned())
            .collect()
    }

    /// Classify a file by its name and optional extracted content.
    ///
    /// `content` may be empty, in which case keywords are matched against
    /// the filename instead.
    pub fn classify(&self, filename: &str, content: &str) -> Classification {
        let content = content.trim();
        let filename = filename.trim();
        if filename.is_empty() && content.is_empty() {
            return Classification::unmatched();
        }

        let keyword_text = if content.is_empty() {
            filename_words(filename)
        } else {
            content.to_string()
        };

        let set = self.read();
        for rule in &set.rules {
            let matchers = match rule.matchers {
                Ok(ref m) => m,
                Err(ref e) => {
                    tracing::debug!("Skipping invalid rule: {}", e);
                    continue;
                }
            };

            let matched_by = if matchers.keywords.iter().any(|re| re.is_match(&keyword_text)) {
                Some(MatchKind::Keyword)
            } else if !filename.is_empty() && matchers.patterns.iter().any(|re| re.is_match(filename)) {
                Some(MatchKind::Pattern)
            } else {
                None
            };

            if let Some(kind) = matched_by {
                let matched_date = matchers
                    .dates
                    .iter()
                    .find_map(|re| re.find(filename))
                    .map(|m| m.as_str().to_string());
                return Classification {
                    category: Some(rule.name().to_string()),
                    confidence: match kind {
                        MatchKind::Keyword => KEYWORD_CONFIDENCE,
                        MatchKind::Pattern => PATTERN_CONFIDENCE,
                    },
                    matched_by: Some(kind),
                    matched_date,
                };
            }
        }

        Classification::unmatched()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RuleSet> {
        // A panic while holding the lock cannot leave a half-written rule set.
        self.rules.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RuleSet> {
        self.rules.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn log_invalid(rule: &CompiledRule) {
    if let Err(ref e) = rule.matchers {
        tracing::warn!("{}; rule will be skipped", e);
    }
}

/// Filename as words: extension dropped, `_`, `-` and `.` read as spaces.
fn filename_words(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.chars()
        .map(|c| if matches!(c, '_' | '-' | '.') { ' ' } else { c })
        .collect()
}
