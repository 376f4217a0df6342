//! Category definitions as they appear in configuration.

use serde::{Deserialize, Serialize};

/// Default priority for rules that don't set one.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Category assigned when an award type is selected without a category.
pub const AWARDS_CATEGORY: &str = "Awards";

/// A category rule before its patterns are compiled.
///
/// Patterns may be bare regexes or delimited ones (`/\bMOU\b/i`); both are
/// matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, alias = "file_patterns")]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub date_patterns: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl CategoryDefinition {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            keywords: Vec::new(),
            patterns: Vec::new(),
            date_patterns: Vec::new(),
            priority,
            description: None,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_date_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Institutional categories used when configuration supplies none.
pub fn default_categories() -> Vec<CategoryDefinition> {
    vec![
        CategoryDefinition::new("MOUs & MOAs", 5)
            .with_keywords([
                "MOU",
                "MOA",
                "Memorandum of Understanding",
                "Memorandum of Agreement",
                "Agreement",
                "Partnership",
                "Renewal",
                "KUMA-MOU",
            ])
            .with_patterns([r"/\b(MOU|MOA|Memorandum|Agreement|Partnership|KUMA-MOU)\b/i"])
            .with_description("Memorandums of Understanding and Agreements"),
        CategoryDefinition::new("Registrar Files", 4)
            .with_keywords([
                "Registrar",
                "Enrollment",
                "Transcript",
                "TOR",
                "COR",
                "Student Record",
                "GWA",
                "Grades",
            ])
            .with_patterns([
                r"/\b(Registrar|Enrollment|Transcript|TOR|COR|Student\s*Record|GWA|Grades)\b/i",
            ])
            .with_description("Student records and academic documents"),
        CategoryDefinition::new("Templates", 3)
            .with_keywords([
                "Template",
                "Form",
                "Admission",
                "Application",
                "Registration",
                "Checklist",
                "Request",
            ])
            .with_patterns([
                r"/\b(Template|Form|Admission|Application|Registration|Checklist|Request)\b/i",
            ])
            .with_description("Forms, templates, and application documents"),
        CategoryDefinition::new("Events & Activities", 2)
            .with_keywords([
                "Conference",
                "Seminar",
                "Workshop",
                "Meeting",
                "Minutes",
                "Agenda",
                "Symposium",
                "Training",
            ])
            .with_patterns([
                r"/\b(Conference|Seminar|Workshop|Meeting|Minutes|Agenda|Symposium|Training)\b/i",
            ])
            .with_date_patterns([r"\d{4}-\d{1,2}-\d{1,2}", r"\d{1,2}-\d{1,2}-\d{2,4}"])
            .with_description("Event documentation and activity records"),
        CategoryDefinition::new(AWARDS_CATEGORY, 1)
            .with_keywords([
                "Award",
                "Recognition",
                "Certificate",
                "Certification",
                "Accreditation",
                "Achievement",
                "Honor",
                "Distinction",
            ])
            .with_patterns([
                r"/\b(Award|Recognition|Certificate|Certification|Accreditation|Achievement)\b/i",
            ])
            .with_description("Awards, recognitions, and certifications"),
    ]
}
