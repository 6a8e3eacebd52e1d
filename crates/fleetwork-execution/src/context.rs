//! Per-reconcile deadline

use crate::error::{ExecutionError, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Carries the deadline of one reconcile pass
///
/// Checked before every remote call so that an expired pass stops issuing
/// work instead of racing the outer timeout.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileContext {
    deadline: Option<Instant>,
}

impl ReconcileContext {
    /// No deadline
    pub fn background() -> Self {
        Self { deadline: None }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with [`ExecutionError::DeadlineExceeded`] once expired
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            return Err(ExecutionError::DeadlineExceeded);
        }
        Ok(())
    }
}

impl Default for ReconcileContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_never_expires() {
        assert!(ReconcileContext::background().check().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_timeout() {
        let ctx = ReconcileContext::with_timeout(Duration::from_millis(50));
        assert!(ctx.check().is_ok());
        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(matches!(ctx.check(), Err(ExecutionError::DeadlineExceeded)));
    }
}
