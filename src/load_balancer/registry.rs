//! Backend registry.
//!
//! # Responsibilities
//! - Own the ordered set of backends built from configuration
//! - Expose wait-free snapshots to selection and health probing
//! - Fold request/probe outcomes into per-backend health state
//! - Swap the set on reconfiguration, preserving surviving health state
//!
//! Backends are only ever added or removed here; nothing else mutates the
//! set at runtime.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use url::Url;

use crate::config::BackendConfig;
use crate::load_balancer::backend::Backend;

/// Thread-safe owner of the backend set and its health state.
#[derive(Debug)]
pub struct BackendRegistry {
    backends: ArcSwap<Vec<Arc<Backend>>>,
    failure_threshold: AtomicU32,
}

impl BackendRegistry {
    /// Build a registry from configuration.
    ///
    /// Backends with unusable URLs are skipped with a warning; config
    /// validation normally rejects them before this point.
    pub fn from_config(configs: &[BackendConfig], failure_threshold: u32) -> Self {
        let backends = build_backends(configs, &[]);
        Self {
            backends: ArcSwap::from_pointee(backends),
            failure_threshold: AtomicU32::new(failure_threshold.max(1)),
        }
    }

    /// Snapshot of the backend set, in configuration order.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Backend>>> {
        self.backends.load_full()
    }

    /// The backends currently eligible for traffic, in configuration order.
    pub fn list_healthy(&self) -> Vec<Arc<Backend>> {
        self.backends
            .load()
            .iter()
            .filter(|b| b.is_healthy())
            .cloned()
            .collect()
    }

    /// Look up a backend by id.
    pub fn get(&self, id: &str) -> Option<Arc<Backend>> {
        self.backends
            .load()
            .iter()
            .find(|b| b.id == id)
            .cloned()
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.load().len()
    }

    /// True when no backends are registered.
    pub fn is_empty(&self) -> bool {
        self.backends.load().is_empty()
    }

    /// Record a successful probe or forwarded request.
    pub fn mark_success(&self, backend: &Backend) {
        if backend.mark_success() {
            tracing::info!(backend = %backend.id, "backend healthy");
        }
    }

    /// Record a failed probe or forwarded request.
    pub fn mark_failure(&self, backend: &Backend) {
        let threshold = self.failure_threshold.load(Ordering::Acquire);
        if backend.mark_failure(threshold) {
            tracing::warn!(
                backend = %backend.id,
                failures = backend.failure_count(),
                "backend unhealthy"
            );
        }
    }

    /// Replace the backend set from new configuration.
    ///
    /// Backends whose id survives keep their live health state; new ids
    /// start Unknown.
    pub fn reconfigure(&self, configs: &[BackendConfig], failure_threshold: u32) {
        let previous = self.snapshot();
        let next = build_backends(configs, &previous);
        let added = next
            .iter()
            .filter(|b| !previous.iter().any(|p| p.id == b.id))
            .count();
        let removed = previous
            .iter()
            .filter(|p| !next.iter().any(|b| b.id == p.id))
            .count();

        self.failure_threshold
            .store(failure_threshold.max(1), Ordering::Release);
        self.backends.store(Arc::new(next));

        tracing::info!(
            backends = self.len(),
            added,
            removed,
            "backend registry reconfigured"
        );
    }
}

fn build_backends(configs: &[BackendConfig], previous: &[Arc<Backend>]) -> Vec<Arc<Backend>> {
    let mut backends = Vec::with_capacity(configs.len());
    for config in configs {
        let url = match Url::parse(&config.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(backend = %config.id, error = %e, "skipping backend with invalid URL");
                continue;
            }
        };
        match Backend::new(config.id.clone(), url, config.weight) {
            Ok(backend) => {
                if let Some(prev) = previous.iter().find(|p| p.id == backend.id) {
                    backend.inherit_health_from(prev);
                }
                backends.push(Arc::new(backend));
            }
            Err(e) => {
                tracing::warn!(backend = %config.id, error = %e, "skipping unroutable backend");
            }
        }
    }
    backends
}
