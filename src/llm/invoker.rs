//! Completion Invoker.
//!
//! Wraps whichever provider was selected at startup and brackets every call
//! with "thinking" / "received" progress events. There is no retry here: a
//! failed call is reported to the pipeline, which decides whether it is fatal.

use super::anthropic::AnthropicProvider;
use super::provider::{CompletionProvider, ModelMetadata, ProviderMode};
use super::stub::StubProvider;
use super::types::{Completion, Prompt};
use crate::config::Config;
use crate::error::InvocationError;
use crate::pipeline::progress::{ProgressEvent, ProgressListener, Stage};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Invoker {
    provider: Arc<dyn CompletionProvider>,
}

impl Invoker {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Build the invoker for `mode`. The credential is only required in live mode.
    pub fn from_config(
        config: &Config,
        mode: ProviderMode,
        api_key: Option<String>,
    ) -> Result<Self, InvocationError> {
        let provider: Arc<dyn CompletionProvider> = match mode {
            ProviderMode::Stub => Arc::new(StubProvider::new(config.stub_delay())),
            ProviderMode::Live => {
                let api_key = api_key.ok_or(InvocationError::MissingCredential)?;
                let provider = AnthropicProvider::new(
                    api_key,
                    config.model.clone(),
                    config.max_tokens,
                    config.timeout(),
                )?
                .with_api_url(config.api_url.clone());
                Arc::new(provider)
            }
        };

        debug!(mode = mode.name(), model = %provider.metadata().id, "invoker ready");
        Ok(Self::new(provider))
    }

    pub fn metadata(&self) -> ModelMetadata {
        self.provider.metadata()
    }

    /// Run one completion call for `stage`.
    pub async fn invoke(
        &self,
        stage: Stage,
        prompt: &Prompt,
        progress: &dyn ProgressListener,
        cancel: &CancellationToken,
    ) -> Result<Completion, InvocationError> {
        progress.notify(&ProgressEvent::thinking(stage));
        debug!(
            stage = %stage,
            cacheable = prompt.system.cacheable,
            user_chars = prompt.user.len(),
            "calling model"
        );

        let completion = match self.provider.complete(prompt, cancel).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(stage = %stage, error = %e, "model call failed");
                return Err(e);
            }
        };

        progress.notify(&ProgressEvent::received(stage));
        debug!(
            stage = %stage,
            input = completion.usage.input_tokens(),
            output = completion.usage.output_tokens(),
            cache_write = completion.usage.cache_creation_tokens(),
            cache_read = completion.usage.cache_read_tokens(),
            "model call finished"
        );

        Ok(completion)
    }
}
