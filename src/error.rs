//! Error taxonomy for the generation pipeline.
//!
//! - [`CompositionError`]: caller misuse, raised before any model call
//! - [`InvocationError`]: provider or transport failure for a single call
//! - [`GenerationError`]: what `Generator::generate` returns to the caller
//!
//! Validation issues are not errors; they travel as data on the result.

use crate::pipeline::progress::Stage;
use thiserror::Error;

/// The request could not be turned into a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    /// A follow-up needs an earlier assistant message to use as base code
    #[error("follow-up request has no prior assistant message to modify")]
    MissingPriorCode,
}

/// A single completion call failed.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// Live mode was selected but no credential was supplied
    #[error("no API credential configured (set ANTHROPIC_API_KEY)")]
    MissingCredential,

    /// Connection, TLS or body transfer failure
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    /// Provider answered with a non-success status
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The caller abandoned the request
    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for InvocationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

/// Failure of a whole generation request.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Composition(#[from] CompositionError),

    /// A fatal model call failed; the cause is kept for diagnostics
    #[error("generation failed, try again")]
    Failed {
        stage: Stage,
        #[source]
        source: InvocationError,
    },

    #[error("generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Wrap an invocation failure from a fatal stage.
    pub fn from_stage(stage: Stage, source: InvocationError) -> Self {
        match source {
            InvocationError::Cancelled => Self::Cancelled,
            source => Self::Failed { stage, source },
        }
    }
}
