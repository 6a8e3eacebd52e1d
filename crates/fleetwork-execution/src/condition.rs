//! Applied condition updates with optimistic-concurrency retry

use crate::error::{ExecutionError, Result};
use crate::retry::RetryPolicy;
use crate::store::{StoreError, WorkStore};
use fleetwork_types::{set_status_condition, Condition, ConditionStatus, Work, WORK_APPLIED};
use std::sync::Arc;
use tracing::{debug, error};

/// Writes the Applied condition back to the Work store
#[derive(Clone)]
pub struct ConditionAggregator {
    store: Arc<dyn WorkStore>,
    retry: RetryPolicy,
}

impl ConditionAggregator {
    pub fn new(store: Arc<dyn WorkStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Merge the Applied condition into `work` and persist it
    ///
    /// Each failed write re-reads the Work so the next attempt, and the
    /// caller, see the latest revision. Only conflicts are retried; when the
    /// budget runs out the last conflict is returned. On success `work`
    /// holds what the store wrote.
    pub async fn set_applied_condition(
        &self,
        work: &mut Work,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) -> Result<()> {
        let condition = Condition::new(WORK_APPLIED, status, reason, message);
        let mut backoff = self.retry.backoff();

        loop {
            set_status_condition(&mut work.status.conditions, condition.clone());
            let err = match self.store.update_work_status(work).await {
                Ok(stored) => {
                    *work = stored;
                    return Ok(());
                }
                Err(err) => err,
            };

            let key = work.key();
            match self.store.get_work(&key).await {
                Ok(latest) => *work = latest,
                Err(get_err) => {
                    error!(work = %key, error = %get_err, "Failed to get updated work");
                }
            }

            if !matches!(err, StoreError::Conflict(_)) {
                return Err(ExecutionError::from_work_store(err));
            }
            let Some(delay) = backoff.next() else {
                return Err(ExecutionError::from_work_store(err));
            };
            debug!(work = %key, delay_ms = delay.as_millis() as u64, "Applied condition conflicted, retrying");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
