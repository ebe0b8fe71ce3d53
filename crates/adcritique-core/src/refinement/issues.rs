//! Simple versus complex issue classification.
//!
//! A simple issue is one an in-place media correction can fix: blur,
//! sharpness, noise, artifacts, contrast or brightness. Anything naming the
//! brand, the product, the message or safety is complex, as is anything
//! unrecognised.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{CritiqueResult, Dimension};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueClass {
    Simple,
    Complex,
}

const SIMPLE_PATTERN: &str = r"(?i)\b(blur\w*|sharp\w*|unsharp|soft|nois\w*|grain\w*|artifact\w*|contrast|bright\w*|dark\w*|exposure|dull|flat)\b";

const COMPLEX_PATTERN: &str = r"(?i)\b(brand\w*|logo\w*|colou?rs?|palette|product\w*|message\w*|text|tone|safety|harm\w*|stereotyp\w*|mislead\w*|claim\w*|resolution|aspect)\b";

fn simple_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(SIMPLE_PATTERN).ok()).as_ref()
}

fn complex_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(COMPLEX_PATTERN).ok()).as_ref()
}

/// Classify one issue tag. Unrecognised issues are complex.
pub fn classify_issue(issue: &str) -> IssueClass {
    let matches = |pattern: Option<&Regex>| pattern.is_some_and(|re| re.is_match(issue));
    if !matches(complex_pattern()) && matches(simple_pattern()) {
        IssueClass::Simple
    } else {
        IssueClass::Complex
    }
}

/// Issues of one result, split by class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueProfile {
    pub simple: Vec<String>,
    pub complex: Vec<String>,
}

impl IssueProfile {
    /// Collect every issue tag of `result`.
    ///
    /// An unscored dimension counts as a complex issue since nothing is known
    /// about it.
    pub fn of(result: &CritiqueResult) -> Self {
        let mut profile = Self::default();
        for (_, issue) in result.scorecard.issues() {
            let bucket = match classify_issue(issue) {
                IssueClass::Simple => &mut profile.simple,
                IssueClass::Complex => &mut profile.complex,
            };
            if !bucket.iter().any(|i| i == issue) {
                bucket.push(issue.to_string());
            }
        }
        for dimension in result.scorecard.failed_dimensions() {
            profile.complex.push(unscored_issue(dimension));
        }
        profile
    }

    /// At least one issue and every issue simple.
    pub fn is_simple_only(&self) -> bool {
        !self.simple.is_empty() && self.complex.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.simple.is_empty() && self.complex.is_empty()
    }

    /// Complex issues first, then simple ones.
    pub fn all(&self) -> Vec<String> {
        self.complex.iter().chain(&self.simple).cloned().collect()
    }
}

fn unscored_issue(dimension: Dimension) -> String {
    format!("{} could not be evaluated", dimension.label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visual_defects_are_simple() {
        for issue in [
            "Image is blurry",
            "Image is slightly blurry",
            "Visual artifacts present",
            "Low contrast",
            "Too dark",
            "Grainy background",
        ] {
            assert_eq!(classify_issue(issue), IssueClass::Simple, "{issue}");
        }
    }

    #[test]
    fn test_semantic_issues_are_complex() {
        for issue in [
            "Logo missing or not clearly visible",
            "Brand colors not well represented",
            "Tone mismatch with brand",
            "Message unclear",
            "Product not visible",
            "Resolution too low",
            "Misleading claim (medium confidence): cures colds",
        ] {
            assert_eq!(classify_issue(issue), IssueClass::Complex, "{issue}");
        }
    }

    #[test]
    fn test_complex_keyword_wins_over_simple() {
        assert_eq!(classify_issue("Logo is blurry"), IssueClass::Complex);
    }

    #[test]
    fn test_unknown_issue_is_complex() {
        assert_eq!(classify_issue("Something feels off"), IssueClass::Complex);
    }
}
