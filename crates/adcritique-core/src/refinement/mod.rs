//! What to do after a critique: approve, enhance, regenerate or reject.

pub mod decision;
pub mod enhance;
pub mod issues;
pub mod prompt;

pub use decision::{approval_blockers, decide, DecisionInput};
pub use enhance::plan_enhancements;
pub use issues::{classify_issue, IssueClass, IssueProfile};
pub use prompt::{PromptRefiner, RefinedPrompt};
