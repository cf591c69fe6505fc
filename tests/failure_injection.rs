//! Failure injection: dead backends, probe-driven eviction, bounded retry,
//! fail-closed mode, reload, and shutdown.

use std::time::Duration;

use axum::http::StatusCode;
use edge_gateway::load_balancer::HealthState;

mod common;

#[tokio::test]
async fn prober_evicts_dead_backend_and_readmits_it() {
    let b1_addr = common::spawn_backend("b1").await;
    let b2_addr = common::spawn_backend("b2").await;
    let b3_addr = common::unused_port().await;

    let mut config = common::gateway_config(vec![
        common::backend("b1", b1_addr),
        common::backend("b2", b2_addr),
        common::backend("b3", b3_addr),
    ]);
    config.health_check.enabled = true;
    config.health_check.interval_ms = 100;
    config.health_check.timeout_ms = 500;
    config.health_check.failure_threshold = 2;
    let gateway = common::start_gateway(config).await;

    // Let the prober cross the failure threshold for the dead backend.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let b3 = gateway.registry.get("b3").unwrap();
    assert_eq!(b3.health_state(), HealthState::Unhealthy);
    assert!(gateway.registry.list_healthy().iter().all(|b| b.id != "b3"));

    // 100 trials: the unhealthy backend is never routed to.
    let client = common::client();
    for _ in 0..100 {
        let response = client.get(gateway.url("/api/data")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.text().await.unwrap();
        assert!(body == "b1" || body == "b2", "unexpected body {body}");
    }

    // Bring the backend online; one successful probe readmits it.
    common::spawn_backend_at(b3_addr, |_path| (200, "b3".to_string(), Vec::new())).await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    let b3 = gateway.registry.get("b3").unwrap();
    assert_eq!(b3.health_state(), HealthState::Healthy);

    let mut saw_b3 = false;
    for _ in 0..20 {
        let body = client
            .get(gateway.url("/api/data"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        if body == "b3" {
            saw_b3 = true;
            break;
        }
    }
    assert!(saw_b3, "recovered backend should rejoin the rotation");
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn upstream_failure_retries_once_against_a_different_backend() {
    let b1_addr = common::unused_port().await;
    let b2_addr = common::spawn_backend("b2").await;

    let mut config = common::gateway_config(vec![
        common::backend("b1", b1_addr),
        common::backend("b2", b2_addr),
    ]);
    config.proxy.retry_on_failure = true;
    let gateway = common::start_gateway(config).await;

    // First selection lands on the dead backend; the bounded retry must
    // serve the response from the healthy one.
    let response = common::client()
        .get(gateway.url("/api/data"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "b2");

    let b1 = gateway.registry.get("b1").unwrap();
    assert_eq!(b1.failure_count(), 1, "exactly one failure recorded");
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn upstream_failure_without_retry_is_a_502() {
    let b1_addr = common::unused_port().await;
    let config = common::gateway_config(vec![common::backend("b1", b1_addr)]);
    let gateway = common::start_gateway(config).await;

    let response = common::client()
        .get(gateway.url("/api/data"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.text().await.unwrap(), "Backend Unavailable");

    let b1 = gateway.registry.get("b1").unwrap();
    assert_eq!(b1.failure_count(), 1);
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn no_backends_configured_is_a_502() {
    let config = common::gateway_config(Vec::new());
    let gateway = common::start_gateway(config).await;

    let response = common::client()
        .get(gateway.url("/api/data"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn degraded_mode_keeps_routing_but_fail_closed_refuses() {
    // The backend answers its health path with 500 but serves traffic fine,
    // so probes mark it unhealthy while requests would still succeed.
    let sick_backend = |path: &str| {
        if path == "/health" {
            (500, "unwell".to_string(), Vec::new())
        } else {
            (200, "alive".to_string(), Vec::new())
        }
    };

    for (fail_closed, expected_status) in
        [(false, StatusCode::OK), (true, StatusCode::BAD_GATEWAY)]
    {
        let addr = common::spawn_backend_with(sick_backend).await;
        let mut config = common::gateway_config(vec![common::backend("b1", addr)]);
        config.health_check.enabled = true;
        config.health_check.interval_ms = 100;
        config.health_check.timeout_ms = 500;
        config.health_check.failure_threshold = 1;
        config.proxy.fail_closed = fail_closed;
        let gateway = common::start_gateway(config).await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        let b1 = gateway.registry.get("b1").unwrap();
        assert_eq!(b1.health_state(), HealthState::Unhealthy);

        let response = common::client()
            .get(gateway.url("/api/data"))
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            expected_status,
            "fail_closed={fail_closed}"
        );
        gateway.shutdown.trigger();
    }
}

#[tokio::test]
async fn reload_applies_new_policy_without_restart() {
    let backend_addr = common::spawn_backend("ok").await;
    let config = common::gateway_config(vec![common::backend("b1", backend_addr)]);
    let gateway = common::start_gateway(config.clone()).await;

    let client = common::client();
    let response = client
        .get(gateway.url("/api/data"))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Push a reload that blocks the client.
    let mut updated = config;
    updated.policy.blocked_ips = vec!["203.0.113.7".parse().unwrap()];
    gateway.config_tx.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let response = client
        .get(gateway.url("/api/data"))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Other clients are unaffected.
    let response = client
        .get(gateway.url("/api/data"))
        .header("x-forwarded-for", "198.51.100.1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    gateway.shutdown.trigger();
}

#[tokio::test]
async fn shutdown_stops_accepting_connections() {
    let backend_addr = common::spawn_backend("ok").await;
    let config = common::gateway_config(vec![common::backend("b1", backend_addr)]);
    let gateway = common::start_gateway(config).await;

    let client = common::client();
    let response = client.get(gateway.url("/api/data")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    gateway.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let result = client.get(gateway.url("/api/data")).send().await;
    assert!(result.is_err(), "listener should be closed after shutdown");
}
