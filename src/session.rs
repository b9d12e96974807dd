//! Conversation session
//!
//! Owns the history for one app being built. The first submission is a fresh
//! generation; every later one modifies the most recent code. `submit` takes
//! `&mut self`, so a session can never have two requests in flight.

use crate::error::GenerationError;
use crate::llm::ConversationMessage;
use crate::pipeline::progress::ProgressListener;
use crate::pipeline::{GenerationResult, Generator};
use crate::prompt::{previous_code, GenerationRequest};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Session {
    history: Vec<ConversationMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Completed user/assistant rounds
    pub fn iterations(&self) -> usize {
        self.history.len() / 2
    }

    /// Code produced by the last successful request
    pub fn latest_code(&self) -> Option<&str> {
        previous_code(&self.history)
    }

    /// Forget the current app and start over
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Request the next submission of `text` would send
    pub fn next_request(&self, text: &str) -> GenerationRequest {
        if self.history.is_empty() {
            GenerationRequest::fresh(text)
        } else {
            let mut history = self.history.clone();
            history.push(ConversationMessage::user(text));
            GenerationRequest::follow_up(text, history)
        }
    }

    /// Run one request. History only changes when it succeeds.
    pub async fn submit(
        &mut self,
        generator: &Generator,
        text: &str,
        progress: Option<&dyn ProgressListener>,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        let request = self.next_request(text);
        let mut history = request.history.clone();

        let result = generator.generate_with_cancel(request, progress, cancel).await?;

        history.push(ConversationMessage::assistant(result.code.clone()));
        self.history = history;
        Ok(result)
    }
}
