//! Active health probing.
//!
//! # Responsibilities
//! - Periodically probe every registered backend
//! - Fold probe outcomes into registry health state
//!
//! Each tick spawns one task per backend, so a hung or unreachable backend
//! cannot delay probing of the others. Probe failures are logged and
//! absorbed; they are never fatal to the process.

use std::time::Duration;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use futures_util::future::join_all;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use rand::Rng;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::error::GatewayError;
use crate::load_balancer::{Backend, BackendRegistry};
use crate::observability::metrics;

/// Long-lived background prober.
pub struct HealthProber {
    registry: Arc<BackendRegistry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthProber {
    pub fn new(registry: Arc<BackendRegistry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            config,
            client,
        }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("active health probes disabled");
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            path = %self.config.path,
            "health prober starting"
        );

        // Stagger the first tick so a fleet of gateways does not probe in
        // lockstep.
        let max_jitter = (self.config.interval_ms / 4).max(1);
        let stagger = Duration::from_millis(rand::thread_rng().gen_range(0..max_jitter));
        tokio::select! {
            _ = time::sleep(stagger) => {}
            _ = shutdown.recv() => return,
        }

        let mut ticker = time::interval(Duration::from_millis(self.config.interval_ms));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("health prober received shutdown signal, exiting");
                    break;
                }
            }
        }
    }

    /// Probe every backend concurrently, one task each.
    async fn probe_all(&self) {
        let backends = self.registry.snapshot();
        let timeout = Duration::from_millis(self.config.timeout_ms);

        let mut probes = Vec::with_capacity(backends.len());
        for backend in backends.iter().cloned() {
            let client = self.client.clone();
            let registry = Arc::clone(&self.registry);
            let path = self.config.path.clone();

            probes.push(tokio::spawn(async move {
                match probe_backend(&client, &backend, &path, timeout).await {
                    Ok(()) => registry.mark_success(&backend),
                    Err(err) => {
                        tracing::warn!(backend = %backend.id, error = %err, "health probe failed");
                        registry.mark_failure(&backend);
                    }
                }
                metrics::record_backend_health(&backend.id, backend.is_healthy());
            }));
        }

        // A panicking probe task only fails its own join handle.
        let _ = join_all(probes).await;
    }
}

/// Probe a single backend once.
async fn probe_backend(
    client: &Client<HttpConnector, Body>,
    backend: &Backend,
    path: &str,
    timeout: Duration,
) -> Result<(), GatewayError> {
    let uri = Uri::builder()
        .scheme(backend.scheme.clone())
        .authority(backend.authority.clone())
        .path_and_query(path)
        .build()
        .map_err(|e| GatewayError::ProbeFailure(e.to_string()))?;

    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::USER_AGENT, "edge-gateway-health-probe")
        .body(Body::empty())
        .map_err(|e| GatewayError::ProbeFailure(e.to_string()))?;

    match time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) if response.status().is_success() => Ok(()),
        Ok(Ok(response)) => Err(GatewayError::ProbeFailure(format!(
            "non-success status {}",
            response.status()
        ))),
        Ok(Err(e)) => Err(GatewayError::ProbeFailure(e.to_string())),
        Err(_) => Err(GatewayError::ProbeFailure("probe timed out".to_string())),
    }
}
