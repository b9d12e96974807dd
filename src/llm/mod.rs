//! LLM Layer: the Completion Invoker and its providers
//!
//! This module handles all interactions with the code-generating model:
//! - Provider abstraction (live Anthropic API, offline stub)
//! - Prompt and usage types shared with the pipeline
//! - The invoker that the pipeline stages call through

pub mod anthropic;
pub mod invoker;
pub mod provider;
pub mod stub;
pub mod types;

// Re-export key types
pub use invoker::Invoker;
pub use provider::{CompletionProvider, ModelMetadata, ProviderMode};
pub use types::{Completion, ConversationMessage, Prompt, Role, SystemSegment, UsageStats};
