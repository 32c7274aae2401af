#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use courier_db::DbRuntimeSettings;
use courier_delivery::DeliveryExecutor;
use courier_server::{app, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

/// An app over a fresh file-backed database. Keep the `TempDir` alive for
/// the duration of the test.
pub fn setup() -> (Router, AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("courier.db");
    let (pool, _) = courier_db::open(path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
    let executor = DeliveryExecutor::new(Duration::from_secs(2), "courier/test").unwrap();
    let state = AppState::new(pool, executor, 8);
    (app(state.clone()), state, dir)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Requests received by a webhook endpoint.
pub type Received = Arc<Mutex<Vec<(HeaderMap, Bytes)>>>;

async fn receive(State(received): State<Received>, headers: HeaderMap, body: Bytes) -> StatusCode {
    received.lock().unwrap().push((headers, body));
    StatusCode::OK
}

/// Starts a webhook endpoint that answers 200 to everything.
pub async fn spawn_endpoint() -> (SocketAddr, Received) {
    let received = Received::default();
    let router = Router::new().fallback(receive).with_state(received.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, received)
}
