//! Per-session vote budget.
//!
//! The budget starts full and only ever goes down. A vote is consumed after the
//! collector confirms the upload, never before and never on failure.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, info};

use crate::error::{VoteError, VoteResult};

/// Finite, non-replenishing count of votes for one session.
#[derive(Debug)]
pub struct VoteBudget {
    remaining: AtomicU32,
    max: u32,
}

impl VoteBudget {
    /// Full budget of `max` votes.
    pub fn new(max: u32) -> Self {
        Self {
            remaining: AtomicU32::new(max),
            max,
        }
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Acquire)
    }

    /// `true` while at least one vote is left.
    pub fn can_capture(&self) -> bool {
        self.remaining() > 0
    }

    /// Gate for a capture request.
    pub fn check(&self) -> VoteResult<()> {
        if self.can_capture() {
            Ok(())
        } else {
            debug!(max = self.max, "vote budget exhausted");
            Err(VoteError::budget_exhausted(self.max).with_operation("request_capture"))
        }
    }

    /// Spend one vote. Returns `false` if the budget was already empty.
    pub fn consume(&self) -> bool {
        let consumed = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();

        if consumed {
            info!(remaining = self.remaining(), max = self.max, "vote consumed");
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_budget_is_full() {
        let budget = VoteBudget::new(20);
        assert_eq!(budget.remaining(), 20);
        assert_eq!(budget.max(), 20);
        assert!(budget.can_capture());
        assert!(budget.check().is_ok());
    }

    #[test]
    fn test_consume_until_empty() {
        let budget = VoteBudget::new(3);
        assert!(budget.consume());
        assert!(budget.consume());
        assert!(budget.consume());
        assert_eq!(budget.remaining(), 0);
        assert!(!budget.can_capture());

        // Never goes below zero
        assert!(!budget.consume());
        assert_eq!(budget.remaining(), 0);

        let err = budget.check().unwrap_err();
        assert_eq!(err.category(), "budget_exhausted");
    }
}
