use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: Self) -> Self::Output {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
        }
    }
}

/// Cumulative token counts for the current session. The loop is the only writer.
#[derive(Debug, Default)]
pub struct TokenUsageTracker {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl TokenUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens.fetch_add(prompt_tokens, Ordering::SeqCst);
        self.completion_tokens
            .fetch_add(completion_tokens, Ordering::SeqCst);
    }

    pub fn record_usage(&self, usage: TokenUsage) {
        self.record(usage.prompt_tokens, usage.completion_tokens);
    }

    pub fn snapshot(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::SeqCst),
            completion_tokens: self.completion_tokens.load(Ordering::SeqCst),
        }
    }

    pub fn reset(&self) {
        self.prompt_tokens.store(0, Ordering::SeqCst);
        self.completion_tokens.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_accumulates_and_resets() {
        let tracker = TokenUsageTracker::new();
        tracker.record(800, 0);
        tracker.record_usage(TokenUsage::new(0, 300));
        assert_eq!(tracker.snapshot(), TokenUsage::new(800, 300));
        assert_eq!(tracker.snapshot().total(), 1100);

        tracker.reset();
        assert_eq!(tracker.snapshot(), TokenUsage::default());
    }

    #[test]
    fn usage_addition_sums_both_counters() {
        let total = TokenUsage::new(1, 2) + TokenUsage::new(10, 20);
        assert_eq!(total, TokenUsage::new(11, 22));
    }
}
