//! The cancellation contract — spec.md §5.
//!
//! The core only ever *accepts* a cancellation capability; it never
//! constructs one. Implementations (wall-clock budgets, UI-driven tokens,
//! `tokio::select!` bridges) are an external collaborator's concern (spec.md
//! §1 "Out of scope"). `TimedCancellation` is provided here only because
//! spec.md §8 requires `TimedCancellation(0)` to be test-observable as an
//! immediate-fire case.

use std::time::{Duration, Instant};

use crate::pq::error::CancellationError;

/// Checked at stable granularities only (start of every line lexed, start
/// of every token consumed, start of every ancestor visited) — never inside
/// inner loops, where the check itself would dominate the cost it's meant
/// to bound (spec.md §9 Design Notes).
pub trait CancellationToken {
    fn throw_if_cancelled(&self) -> Result<(), CancellationError>;
}

/// A token that never fires — the default for callers with no cancellation
/// need.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl CancellationToken for NeverCancelled {
    fn throw_if_cancelled(&self) -> Result<(), CancellationError> {
        Ok(())
    }
}

/// Fires once wall-clock elapsed since construction exceeds `budget_ms`,
/// including `budget_ms == 0` for immediate fire (spec.md §5).
#[derive(Debug, Clone)]
pub struct TimedCancellation {
    started_at: Instant,
    budget: Duration,
}

impl TimedCancellation {
    pub fn new(budget_ms: u64) -> Self {
        Self {
            started_at: Instant::now(),
            budget: Duration::from_millis(budget_ms),
        }
    }
}

impl CancellationToken for TimedCancellation {
    fn throw_if_cancelled(&self) -> Result<(), CancellationError> {
        let elapsed = self.started_at.elapsed();
        if elapsed >= self.budget {
            Err(CancellationError::TimedOut {
                elapsed_ms: elapsed.as_millis() as u64,
                budget_ms: self.budget.as_millis() as u64,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_budget_fires_immediately() {
        let token = TimedCancellation::new(0);
        assert!(token.throw_if_cancelled().is_err());
    }

    #[test]
    fn never_cancelled_always_succeeds() {
        assert!(NeverCancelled.throw_if_cancelled().is_ok());
    }

    #[test]
    fn generous_budget_does_not_fire() {
        let token = TimedCancellation::new(60_000);
        assert!(token.throw_if_cancelled().is_ok());
    }
}
