//! Syntax Finalizer
//!
//! Last model pass, run for every request. It only asks for syntax fixes
//! (balanced delimiters, semicolons, commas). The pipeline treats a failure
//! here as recoverable and keeps the code it already has.

use super::extract_code;
use super::progress::{ProgressListener, Stage};
use crate::error::InvocationError;
use crate::llm::{Invoker, Prompt, SystemSegment, UsageStats};
use tokio_util::sync::CancellationToken;

const SYNTAX_INSTRUCTIONS: &str = "You review React Native code for syntax errors only. \
Do not change behaviour, layout or styling. \
Return ONLY the corrected code with perfect syntax: no explanations, no markdown, no backticks.";

#[derive(Debug, Clone)]
pub struct Finalized {
    pub code: String,
    pub usage: UsageStats,
}

pub fn compose_syntax_prompt(code: &str) -> Prompt {
    Prompt::new(
        SystemSegment::uncached(SYNTAX_INSTRUCTIONS),
        format!(
            "Fix ANY syntax errors in this code (missing semicolons, commas, brackets).\n\
             Every statement MUST end with a semicolon. Every array and object MUST have proper commas. \
             All brackets must be balanced.\n\nCODE TO FIX:\n{}\n\nReturn the complete code with perfect syntax:",
            code
        ),
    )
}

/// Run the syntax pass. An empty answer counts as a malformed response.
pub async fn finalize(
    invoker: &Invoker,
    code: &str,
    progress: &dyn ProgressListener,
    cancel: &CancellationToken,
) -> Result<Finalized, InvocationError> {
    let prompt = compose_syntax_prompt(code);
    let completion = invoker.invoke(Stage::Finalize, &prompt, progress, cancel).await?;

    let code = extract_code(&completion.text);
    if code.is_empty() {
        return Err(InvocationError::MalformedResponse(
            "syntax pass returned no code".to_string(),
        ));
    }

    Ok(Finalized {
        code,
        usage: completion.usage,
    })
}
