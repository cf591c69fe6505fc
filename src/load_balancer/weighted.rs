//! Weighted round-robin selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::GatewayError;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::LoadBalancer;

/// Weighted round-robin selector.
///
/// A single atomic tick is mapped onto the cumulative weight line of the
/// healthy subset, so a backend with weight 3 receives three consecutive
/// slots per rotation. Selection is O(backends) and safe under concurrent
/// calls.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin {
    counter: AtomicUsize,
}

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for WeightedRoundRobin {
    fn select(
        &self,
        backends: &[Arc<Backend>],
        fail_closed: bool,
    ) -> Result<Arc<Backend>, GatewayError> {
        if backends.is_empty() {
            return Err(GatewayError::NoBackendAvailable);
        }

        let healthy: Vec<&Arc<Backend>> = backends.iter().filter(|b| b.is_healthy()).collect();

        if healthy.is_empty() {
            if fail_closed {
                return Err(GatewayError::NoHealthyBackend);
            }
            // Degraded mode: best-effort routing to the least-failed backend.
            return backends
                .iter()
                .min_by_key(|b| b.failure_count())
                .cloned()
                .ok_or(GatewayError::NoBackendAvailable);
        }

        let total: u64 = healthy.iter().map(|b| u64::from(b.weight)).sum();
        let tick = self.counter.fetch_add(1, Ordering::Relaxed) as u64 % total;

        let mut cursor = tick;
        for backend in &healthy {
            let weight = u64::from(backend.weight);
            if cursor < weight {
                return Ok(Arc::clone(backend));
            }
            cursor -= weight;
        }

        // The healthy set can shrink between the modulo and the walk.
        Ok(Arc::clone(healthy[0]))
    }
}
