//! Sync latency metrics

use crate::error::ExecutionError;
use prometheus::{HistogramOpts, HistogramVec, Registry};
use std::time::Instant;

/// Receives the outcome and duration of every manifest sync pass
pub trait SyncMetrics: Send + Sync {
    fn observe_sync_workload_latency(&self, err: Option<&ExecutionError>, start: Instant);
}

/// Label value for an outcome
fn result_label(err: Option<&ExecutionError>) -> &'static str {
    match err {
        None => "success",
        Some(_) => "error",
    }
}

/// Prometheus-backed sync metrics
#[derive(Clone)]
pub struct PrometheusSyncMetrics {
    /// Duration of syncing one Work's manifests
    pub sync_workload_duration_seconds: HistogramVec,
}

impl PrometheusSyncMetrics {
    /// Create and register sync metrics
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let sync_workload_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "work_sync_workload_duration_seconds",
                "Duration of syncing a Work's manifests to its member cluster",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["result"],
        )?;
        registry.register(Box::new(sync_workload_duration_seconds.clone()))?;

        Ok(Self {
            sync_workload_duration_seconds,
        })
    }
}

impl SyncMetrics for PrometheusSyncMetrics {
    fn observe_sync_workload_latency(&self, err: Option<&ExecutionError>, start: Instant) {
        self.sync_workload_duration_seconds
            .with_label_values(&[result_label(err)])
            .observe(start.elapsed().as_secs_f64());
    }
}

/// Discards every observation
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSyncMetrics;

impl SyncMetrics for NoopSyncMetrics {
    fn observe_sync_workload_latency(&self, _err: Option<&ExecutionError>, _start: Instant) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwork_types::ClusterName;

    #[test]
    fn test_observations_split_by_result() {
        let registry = Registry::new();
        let metrics = PrometheusSyncMetrics::new(&registry).unwrap();

        let start = Instant::now();
        metrics.observe_sync_workload_latency(None, start);
        metrics.observe_sync_workload_latency(None, start);
        let err = ExecutionError::ClusterNotReady(ClusterName::new("m1"));
        metrics.observe_sync_workload_latency(Some(&err), start);

        let ok = metrics
            .sync_workload_duration_seconds
            .with_label_values(&["success"])
            .get_sample_count();
        let failed = metrics
            .sync_workload_duration_seconds
            .with_label_values(&["error"])
            .get_sample_count();
        assert_eq!((ok, failed), (2, 1));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        PrometheusSyncMetrics::new(&registry).unwrap();
        assert!(PrometheusSyncMetrics::new(&registry).is_err());
    }
}
