//! Universal types for model interactions.
//!
//! These types isolate the generation pipeline from the provider's wire format.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn of a generation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Static instruction block sent as the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSegment {
    pub text: String,
    /// Whether the provider may cache and replay this segment
    pub cacheable: bool,
}

impl SystemSegment {
    pub fn cached(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cacheable: true,
        }
    }

    pub fn uncached(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cacheable: false,
        }
    }
}

/// A composed prompt: static instructions plus the per-request user block.
///
/// The user block is never cacheable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: SystemSegment,
    pub user: String,
}

impl Prompt {
    pub fn new(system: SystemSegment, user: impl Into<String>) -> Self {
        Self {
            system,
            user: user.into(),
        }
    }
}

/// Standardized response from a completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Raw generated text, before any code extraction
    pub text: String,
    /// Token usage exactly as reported by the provider
    pub usage: UsageStats,
}

/// Token usage statistics, split by billing tier.
///
/// `total_tokens` is always the sum of the four tier counts. The fields are
/// private so the total cannot drift from its components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    input_tokens: u64,
    output_tokens: u64,
    cache_creation_tokens: u64,
    cache_read_tokens: u64,
    total_tokens: u64,
}

impl UsageStats {
    pub fn new(
        input_tokens: u64,
        output_tokens: u64,
        cache_creation_tokens: u64,
        cache_read_tokens: u64,
    ) -> Self {
        let usage = Self {
            input_tokens,
            output_tokens,
            cache_creation_tokens,
            cache_read_tokens,
            total_tokens: input_tokens
                .saturating_add(output_tokens)
                .saturating_add(cache_creation_tokens)
                .saturating_add(cache_read_tokens),
        };
        debug_assert!(usage.is_consistent());
        usage
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn cache_creation_tokens(&self) -> u64 {
        self.cache_creation_tokens
    }

    pub fn cache_read_tokens(&self) -> u64 {
        self.cache_read_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    /// Check the total against the field-wise sum.
    pub fn is_consistent(&self) -> bool {
        self.input_tokens
            .checked_add(self.output_tokens)
            .and_then(|n| n.checked_add(self.cache_creation_tokens))
            .and_then(|n| n.checked_add(self.cache_read_tokens))
            .map_or(self.total_tokens == u64::MAX, |sum| sum == self.total_tokens)
    }
}

impl Add for UsageStats {
    type Output = UsageStats;

    fn add(self, other: UsageStats) -> UsageStats {
        UsageStats::new(
            self.input_tokens.saturating_add(other.input_tokens),
            self.output_tokens.saturating_add(other.output_tokens),
            self.cache_creation_tokens
                .saturating_add(other.cache_creation_tokens),
            self.cache_read_tokens.saturating_add(other.cache_read_tokens),
        )
    }
}

impl AddAssign for UsageStats {
    fn add_assign(&mut self, other: UsageStats) {
        *self = *self + other;
    }
}

impl Sum for UsageStats {
    fn sum<I: Iterator<Item = UsageStats>>(iter: I) -> Self {
        iter.fold(UsageStats::default(), Add::add)
    }
}
