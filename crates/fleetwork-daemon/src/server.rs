//! Server setup and lifecycle management

use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::seed::Seed;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use fleetwork_execution::{
    BroadcastEventRecorder, ExecutionController, InMemoryClusterStore, InMemoryMemberClusters,
    InMemoryWorkStore, PrometheusSyncMetrics, CONTROLLER_NAME,
};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// fleetwork daemon: an in-memory control plane driven by the execution
/// controller
pub struct Server {
    config: DaemonConfig,
    works: Arc<InMemoryWorkStore>,
    registry: Arc<Registry>,
    recorder: Arc<BroadcastEventRecorder>,
    controller: Arc<ExecutionController>,
}

impl Server {
    /// Create a server, loading `seed` into the control plane first
    pub async fn new(config: DaemonConfig, seed: Option<Seed>) -> DaemonResult<Self> {
        let works = Arc::new(InMemoryWorkStore::new());
        let clusters = Arc::new(InMemoryClusterStore::new());
        let members = Arc::new(InMemoryMemberClusters::new());
        if let Some(seed) = seed {
            seed.apply(&works, &clusters, &members).await?;
        }

        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(PrometheusSyncMetrics::new(&registry)?);
        let recorder = Arc::new(BroadcastEventRecorder::new(CONTROLLER_NAME));

        let controller = ExecutionController::builder()
            .with_config(config.execution.clone())
            .with_work_store(works.clone())
            .with_cluster_store(clusters)
            .with_object_watcher(members.clone())
            .with_object_cache(members)
            .with_event_recorder(recorder.clone())
            .with_metrics(metrics)
            .build()?;

        Ok(Self {
            config,
            works,
            registry,
            recorder,
            controller: Arc::new(controller),
        })
    }

    /// Serve until a shutdown signal arrives, then stop the controller
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "fleetwork daemon listening");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let controller = tokio::spawn(self.controller.clone().run(
            self.works.list_works().await,
            self.works.watch(),
            shutdown_rx,
        ));
        let event_log = tokio::spawn(log_events(self.recorder.subscribe()));

        let app = router(self.registry.clone());
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()));

        info!("fleetwork daemon shutting down");
        let _ = shutdown_tx.send(true);
        if let Err(e) = controller.await {
            warn!(error = %e, "Execution controller task failed");
        }
        event_log.abort();

        served
    }
}

/// Routes for health and metrics
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Handler for GET /metrics
async fn metrics_handler(State(registry): State<Arc<Registry>>) -> Response {
    match export_metrics(&registry) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Export metrics in Prometheus text format
pub fn export_metrics(registry: &Registry) -> DaemonResult<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| DaemonError::Server(e.to_string()))
}

async fn log_events(mut rx: broadcast::Receiver<fleetwork_types::WorkEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => info!(
                object = %event.involved_object,
                event_type = %event.event_type,
                reason = %event.reason,
                "{}",
                event.message
            ),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(lagged = n, "Event log lagged behind recorder");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Event stream closed");
                break;
            }
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
