mod common;

use std::time::{Duration, Instant};

use common::{refused_addr, spawn_black_hole, spawn_receiver, subscription, SECRET};
use courier_delivery::{verify, DeliveryExecutor};
use serde_json::{json, Value};

fn executor(timeout: Duration) -> DeliveryExecutor {
    DeliveryExecutor::new(timeout, "courier/test").unwrap()
}

#[tokio::test]
async fn delivers_signed_envelope() {
    let (addr, inbox) = spawn_receiver().await;
    let sub = subscription(format!("http://{addr}/hook"), &["document.anchored"]);

    let record = executor(Duration::from_secs(5))
        .deliver(&sub, "document.anchored", &json!({"id": "doc-1"}))
        .await;

    assert!(record.success);
    assert_eq!(record.response_status, Some(200));
    assert_eq!(record.error_message, None);
    assert_eq!(record.subscription_id, sub.id);
    assert_eq!(record.payload["id"], "doc-1");
    assert!(record.delivered_at >= record.created_at);

    let hits = inbox.hits();
    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert_eq!(hit.path, "/hook");

    let header = |name: &str| hit.headers.get(name).unwrap().to_str().unwrap().to_string();
    assert_eq!(header("content-type"), "application/json");
    assert_eq!(header("user-agent"), "courier/test");
    assert_eq!(header("x-courier-event"), "document.anchored");
    assert_eq!(header("x-courier-delivery"), record.id.to_string());

    let signature = header("x-courier-signature");
    assert!(signature.starts_with("sha256="));
    assert!(verify(SECRET, &hit.body, &signature));

    let body: Value = serde_json::from_slice(&hit.body).unwrap();
    assert_eq!(body, json!({"event": "document.anchored", "data": {"id": "doc-1"}}));
}

#[tokio::test]
async fn server_error_is_recorded_with_status() {
    let (addr, _inbox) = spawn_receiver().await;
    let sub = subscription(format!("http://{addr}/fail"), &["e"]);

    let record = executor(Duration::from_secs(5)).deliver(&sub, "e", &json!({})).await;

    assert!(!record.success);
    assert_eq!(record.response_status, Some(500));
    assert_eq!(
        record.error_message.as_deref(),
        Some("HTTP 500 Internal Server Error")
    );
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let (addr, inbox) = spawn_receiver().await;
    let sub = subscription(format!("http://{addr}/moved"), &["e"]);

    let record = executor(Duration::from_secs(5)).deliver(&sub, "e", &json!({})).await;

    assert!(!record.success);
    assert_eq!(record.response_status, Some(302));
    let paths: Vec<String> = inbox.hits().into_iter().map(|h| h.path).collect();
    assert_eq!(paths, vec!["/moved".to_string()]);
}

#[tokio::test]
async fn unresponsive_endpoint_times_out() {
    let addr = spawn_black_hole().await;
    let sub = subscription(format!("http://{addr}/hook"), &["e"]);

    let started = Instant::now();
    let record = executor(Duration::from_millis(300))
        .deliver(&sub, "e", &json!({"id": "doc-1"}))
        .await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!record.success);
    assert_eq!(record.response_status, None);
    let message = record.error_message.unwrap();
    assert!(message.contains("timed out"), "{message}");
    assert!(record.duration_ms >= 250, "{}", record.duration_ms);
}

#[tokio::test]
async fn refused_connection_is_a_failure() {
    let addr = refused_addr();
    let sub = subscription(format!("http://{addr}/hook"), &["e"]);

    let record = executor(Duration::from_secs(5)).deliver(&sub, "e", &json!({})).await;

    assert!(!record.success);
    assert_eq!(record.response_status, None);
    assert!(record
        .error_message
        .unwrap()
        .starts_with("connection failed"));
}
