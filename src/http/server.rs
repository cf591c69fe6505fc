//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router and middleware stack
//! - Own the backend registry, balancer, and swappable runtime state
//! - Spawn the health prober and the config-reload task
//! - Serve with graceful, grace-period-bounded shutdown
//!
//! Reloads swap the compiled policy/header/routing state atomically and
//! reconfigure the registry in place, so in-flight requests keep the state
//! they started with.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::health::HealthProber;
use crate::http::proxy::proxy_handler;
use crate::http::request::MakeRequestUuid;
use crate::http::response::{cache_control_value, FallbackState};
use crate::load_balancer::{BackendRegistry, LoadBalancer, WeightedRoundRobin};
use crate::policy::rules::PathPrefix;
use crate::policy::PolicyEngine;
use crate::security::SecurityHeaderSet;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
    pub balancer: Arc<dyn LoadBalancer>,
    pub client: Client<HttpConnector, Body>,
    pub shared: Arc<ArcSwap<SharedState>>,
}

/// Runtime state compiled from configuration, swapped atomically on reload.
#[derive(Debug)]
pub struct SharedState {
    pub policy: PolicyEngine,
    pub security_headers: SecurityHeaderSet,
    pub proxied_prefix: PathPrefix,
    pub fallback: FallbackState,
    pub static_extensions: Vec<String>,
    pub cache_header: HeaderValue,
    pub forwarded_for_header: String,
    pub forwarded_proto_header: String,
    pub retry_on_failure: bool,
    pub fail_closed: bool,
    pub upstream_timeout: Duration,
}

impl SharedState {
    /// Compile the request-path view of a validated configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            policy: PolicyEngine::from_config(&config.policy),
            security_headers: SecurityHeaderSet::from_config(&config.security_headers),
            proxied_prefix: PathPrefix::new(config.proxy.path_prefix.clone()),
            fallback: FallbackState::from_config(&config.fallback),
            static_extensions: config
                .cache
                .static_asset_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            cache_header: cache_control_value(config.cache.max_age_secs),
            forwarded_for_header: config.policy.forwarded_for_header.clone(),
            forwarded_proto_header: config.policy.forwarded_proto_header.clone(),
            retry_on_failure: config.proxy.retry_on_failure,
            fail_closed: config.proxy.fail_closed,
            upstream_timeout: Duration::from_millis(config.proxy.upstream_timeout_ms),
        }
    }

    /// Cache-Control value for this path, when it is a static asset.
    pub fn cache_header_for(&self, path: &str) -> Option<HeaderValue> {
        if crate::http::response::is_static_asset(path, &self.static_extensions) {
            Some(self.cache_header.clone())
        } else {
            None
        }
    }
}

/// Stamp the security header set onto every outbound response.
async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    state
        .shared
        .load()
        .security_headers
        .apply(response.headers_mut());
    response
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<BackendRegistry>,
    shared: Arc<ArcSwap<SharedState>>,
}

impl HttpServer {
    /// Create a new server from a validated configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let registry = Arc::new(BackendRegistry::from_config(
            &config.backends,
            config.health_check.failure_threshold,
        ));
        let balancer: Arc<dyn LoadBalancer> = Arc::new(WeightedRoundRobin::new());
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let shared = Arc::new(ArcSwap::from_pointee(SharedState::from_config(&config)));

        let state = AppState {
            registry: Arc::clone(&registry),
            balancer,
            client,
            shared: Arc::clone(&shared),
        };

        let router = Self::build_router(&config, state);

        Self {
            router,
            config,
            registry,
            shared,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(middleware::from_fn_with_state(
                        state.clone(),
                        security_headers_middleware,
                    ))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(GlobalConcurrencyLimitLayer::new(
                        config.listener.max_connections,
                    ))
                    .layer(TimeoutLayer::new(Duration::from_millis(
                        config.proxy.request_timeout_ms,
                    ))),
            )
            .with_state(state)
    }

    /// Run the server until shutdown.
    ///
    /// `config_updates` delivers validated reloads from the watcher;
    /// `shutdown` is the broadcast every long-running task listens on.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, backends = self.registry.len(), "HTTP server starting");

        if self.config.health_check.enabled {
            let prober = HealthProber::new(
                Arc::clone(&self.registry),
                self.config.health_check.clone(),
            );
            let prober_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                prober.run(prober_shutdown).await;
            });
        }

        {
            let registry = Arc::clone(&self.registry);
            let shared = Arc::clone(&self.shared);
            let mut reload_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        update = config_updates.recv() => match update {
                            Some(config) => {
                                registry.reconfigure(
                                    &config.backends,
                                    config.health_check.failure_threshold,
                                );
                                shared.store(Arc::new(SharedState::from_config(&config)));
                                tracing::info!("configuration reloaded");
                            }
                            None => break,
                        },
                        _ = reload_shutdown.recv() => break,
                    }
                }
            });
        }

        let grace = Duration::from_millis(self.config.shutdown.grace_period_ms);
        let mut drain_deadline = shutdown.resubscribe();

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .into_future();

        tokio::select! {
            result = serve => result?,
            _ = async {
                let _ = drain_deadline.recv().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(
                    grace_ms = grace.as_millis() as u64,
                    "drain grace period elapsed, aborting in-flight requests"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The active configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handle to the backend registry (health state inspection).
    pub fn registry(&self) -> Arc<BackendRegistry> {
        Arc::clone(&self.registry)
    }
}
