//! The Provider Abstraction.
//!
//! This trait defines the standard interface for any completion backend,
//! whether it's the live API or the offline stub.

use super::types::{Completion, Prompt};
use crate::error::InvocationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Which provider implementation backs the invoker.
///
/// Chosen once at startup and never changed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    #[default]
    Live,
    Stub,
}

impl ProviderMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Stub => "stub",
        }
    }
}

/// Metadata about the backing model.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    pub id: String,
    pub mode: ProviderMode,
}

/// The core trait for completion calls.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Get the model's metadata.
    fn metadata(&self) -> ModelMetadata;

    /// Send one prompt and wait for the full response.
    ///
    /// Implementations must return `InvocationError::Cancelled` promptly once
    /// `cancel` fires.
    async fn complete(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<Completion, InvocationError>;
}
