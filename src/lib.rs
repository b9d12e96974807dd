//! Sprout: turns a plain-language app idea into a single-file Expo React Native app
//!
//! Architecture:
//! - `prompt`: Prompt Composer (fresh and follow-up requests)
//! - `llm`: Completion Invoker over a live or stub provider
//! - `validate`: rule-based Code Validator
//! - `pipeline`: generate → validate → repair → finalize orchestration
//! - `cost`: token-to-dollar Cost Accountant
//! - `session`: conversation history for iterative edits

pub mod config;
pub mod cost;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod repl;
pub mod session;
pub mod validate;

pub use config::Config;
pub use cost::{CostBreakdown, Pricing};
pub use error::{CompositionError, GenerationError, InvocationError};
pub use llm::{ConversationMessage, Invoker, ProviderMode, UsageStats};
pub use pipeline::progress::{
    LatestProgress, NoProgress, ProgressEvent, ProgressListener, ProgressTracker, Stage,
};
pub use pipeline::{extract_code, GenerationResult, Generator};
pub use prompt::{GenerationRequest, RequestKind};
pub use session::Session;
pub use validate::{validate, Severity, ValidationIssue};
