//! Progress notifications for a generation request
//!
//! The pipeline calls a [`ProgressListener`] synchronously at each checkpoint.
//! Listeners must not block; [`LatestProgress`] keeps only the newest event.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

/// Model-calling stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Generate,
    Repair,
    Finalize,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Repair => "repair",
            Self::Finalize => "finalize",
        }
    }

    fn thinking_message(&self) -> &'static str {
        match self {
            Self::Generate => "Connecting to AI...",
            Self::Repair => "Asking AI to fix the issues...",
            Self::Finalize => "Double-checking syntax...",
        }
    }

    fn received_message(&self) -> &'static str {
        match self {
            Self::Generate => "Got it! Building your app...",
            Self::Repair => "Fixes received",
            Self::Finalize => "Syntax check received",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub message: String,
    /// True while the pipeline is waiting on work
    pub is_working: bool,
}

impl ProgressEvent {
    pub fn working(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_working: true,
        }
    }

    pub fn idle(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_working: false,
        }
    }

    /// Emitted right before a model call.
    pub fn thinking(stage: Stage) -> Self {
        Self::working(stage.thinking_message())
    }

    /// Emitted right after a model call returns.
    pub fn received(stage: Stage) -> Self {
        Self::idle(stage.received_message())
    }
}

pub const ANALYZING: &str = "Analyzing your idea...";
pub const CHECKING: &str = "Checking for issues...";
pub const FIXING: &str = "Fixing issues...";
pub const FINISHING: &str = "Adding the finishing touches...";
pub const READY: &str = "Your app is ready!";

/// Observer for pipeline checkpoints.
pub trait ProgressListener: Send + Sync {
    fn notify(&self, event: &ProgressEvent);
}

impl<F> ProgressListener for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn notify(&self, event: &ProgressEvent) {
        (self)(event)
    }
}

/// Listener that drops everything.
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn notify(&self, _event: &ProgressEvent) {}
}

/// Single-slot listener: holds the most recent event for a slow consumer.
pub struct LatestProgress {
    tx: watch::Sender<Option<ProgressEvent>>,
}

impl LatestProgress {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Receiver that observes only the newest event.
    pub fn subscribe(&self) -> watch::Receiver<Option<ProgressEvent>> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<ProgressEvent> {
        self.tx.borrow().clone()
    }
}

impl Default for LatestProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressListener for LatestProgress {
    fn notify(&self, event: &ProgressEvent) {
        // Replaces the slot even with no receivers attached
        self.tx.send_replace(Some(event.clone()));
    }
}

/// Terminal spinner that mirrors progress events
pub struct ProgressTracker {
    /// Spinner, absent in quiet mode
    spinner: Option<ProgressBar>,
    /// Number of events seen
    events: AtomicUsize,
    /// Most recent message
    last_message: Mutex<Option<String>>,
}

impl ProgressTracker {
    /// Create a tracker that draws a spinner on stderr
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            spinner: Some(spinner),
            events: AtomicUsize::new(0),
            last_message: Mutex::new(None),
        }
    }

    /// Create a quiet tracker (no output)
    pub fn quiet() -> Self {
        Self {
            spinner: None,
            events: AtomicUsize::new(0),
            last_message: Mutex::new(None),
        }
    }

    /// Number of events received so far
    pub fn events_seen(&self) -> usize {
        self.events.load(Ordering::Relaxed)
    }

    /// Message of the most recent event
    pub fn last_message(&self) -> Option<String> {
        self.last_message
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Remove the spinner from the terminal
    pub fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressListener for ProgressTracker {
    fn notify(&self, event: &ProgressEvent) {
        self.events.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_message.lock() {
            *last = Some(event.message.clone());
        }
        if let Some(spinner) = &self.spinner {
            spinner.set_message(event.message.clone());
        }
    }
}
