//! Repair Loop
//!
//! One "fix these specific problems" call seeded with the code and its
//! blocking issues, followed by exactly one re-validation. The caller runs
//! this at most once per request.

use super::extract_code;
use super::progress::{ProgressListener, Stage};
use crate::error::InvocationError;
use crate::llm::{Invoker, Prompt, SystemSegment, UsageStats};
use crate::validate::{validate, ValidationIssue};
use tokio_util::sync::CancellationToken;

const REPAIR_INSTRUCTIONS: &str = "You fix specific problems in React Native (Expo) component code. \
Fix exactly the listed errors and keep everything else unchanged. \
Return ONLY the complete corrected code with no explanations, no markdown, no backticks.";

/// Revised code and the issues found when re-validating it.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub code: String,
    pub issues: Vec<ValidationIssue>,
    pub usage: UsageStats,
}

impl RepairOutcome {
    pub fn has_blocking(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_blocking)
    }
}

/// Build the fix prompt. Only blocking issues are rendered.
pub fn compose_repair_prompt(code: &str, issues: &[ValidationIssue]) -> Prompt {
    let errors = issues
        .iter()
        .filter(|issue| issue.is_blocking())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    Prompt::new(
        SystemSegment::uncached(REPAIR_INSTRUCTIONS),
        format!(
            "Fix these errors in the React Native code.\n\nERRORS TO FIX:\n{}\n\nORIGINAL CODE:\n{}\n\nReturn the complete fixed code:",
            errors, code
        ),
    )
}

/// Ask the model to fix `issues` in `code`, then validate the answer once.
pub async fn repair(
    invoker: &Invoker,
    code: &str,
    issues: &[ValidationIssue],
    progress: &dyn ProgressListener,
    cancel: &CancellationToken,
) -> Result<RepairOutcome, InvocationError> {
    let prompt = compose_repair_prompt(code, issues);
    let completion = invoker.invoke(Stage::Repair, &prompt, progress, cancel).await?;

    let code = extract_code(&completion.text);
    let issues = validate(&code);

    Ok(RepairOutcome {
        code,
        issues,
        usage: completion.usage,
    })
}
