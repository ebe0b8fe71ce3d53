//! Map simple issues onto in-place enhancement operations.

use crate::domain::EnhancementPlan;

const SHARPEN: &[&str] = &["blur", "unsharp", "soft", "sharp"];
const DENOISE: &[&str] = &["nois", "artifact", "grain"];
const CONTRAST: &[&str] = &["contrast", "flat", "dull"];
const BRIGHTNESS: &[&str] = &["bright", "dark", "exposure"];

fn mentions(issues: &[String], keywords: &[&str]) -> bool {
    issues.iter().any(|issue| {
        let issue = issue.to_lowercase();
        keywords.iter().any(|k| issue.contains(k))
    })
}

/// Enhancement operations addressing `issues`.
///
/// Expects issues already classified as simple; the plan is empty when none
/// of them names a correctable defect.
pub fn plan_enhancements(issues: &[String]) -> EnhancementPlan {
    EnhancementPlan {
        sharpen: mentions(issues, SHARPEN),
        denoise: mentions(issues, DENOISE),
        contrast: mentions(issues, CONTRAST),
        brightness: mentions(issues, BRIGHTNESS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issues(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blur_and_artifacts() {
        let plan = plan_enhancements(&issues(&["Image is blurry", "Visual artifacts present"]));
        assert!(plan.sharpen);
        assert!(plan.denoise);
        assert!(!plan.contrast);
        assert!(!plan.brightness);
    }

    #[test]
    fn test_contrast_only() {
        let plan = plan_enhancements(&issues(&["Low contrast"]));
        assert_eq!(plan.operations(), vec!["contrast"]);
    }

    #[test]
    fn test_no_issues_means_empty_plan() {
        assert!(plan_enhancements(&[]).is_empty());
    }
}
