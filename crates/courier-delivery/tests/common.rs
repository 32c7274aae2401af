#![allow(dead_code)]

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use courier_types::{
    now, DeliveryFilter, DeliveryLedger, DeliveryRecord, Subscription, SubscriptionId,
    SubscriptionRegistry, SubscriptionSecret,
};
use tokio::net::TcpListener;

pub const SECRET: &str = "9c8b7a6f5e4d3c2b1a0f9e8d7c6b5a4f3e2d1c0b9a8f7e6d5c4b3a2f1e0d9c8b";

/// One request seen by the receiver.
#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Shared view of what the receiver has seen.
#[derive(Clone, Default)]
pub struct Inbox {
    hits: Arc<Mutex<Vec<Hit>>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Inbox {
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Answers by path: `/fail` is a 500, `/moved` a 302 to `/ok`, `/slow`
/// waits 200ms before a 200, everything else is a 200.
async fn receive(State(inbox): State<Inbox>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path().to_string();
    inbox.hits.lock().unwrap().push(Hit {
        path: path.clone(),
        headers,
        body,
    });

    match path.as_str() {
        "/fail" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "/moved" => (StatusCode::FOUND, [(header::LOCATION, "/ok")]).into_response(),
        "/slow" => {
            let now_in_flight = inbox.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            inbox.peak.fetch_max(now_in_flight, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            inbox.in_flight.fetch_sub(1, Ordering::SeqCst);
            StatusCode::OK.into_response()
        }
        _ => StatusCode::OK.into_response(),
    }
}

/// Starts a webhook receiver on a random local port.
pub async fn spawn_receiver() -> (SocketAddr, Inbox) {
    let inbox = Inbox::default();
    let app = Router::new().fallback(receive).with_state(inbox.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, inbox)
}

/// Accepts connections and never answers them.
pub async fn spawn_black_hole() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    addr
}

/// An address nothing is listening on.
pub fn refused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn subscription(url: impl Into<String>, events: &[&str]) -> Subscription {
    Subscription {
        id: SubscriptionId::new(),
        url: url.into(),
        events: events.iter().map(|e| e.to_string()).collect::<BTreeSet<_>>(),
        secret: SubscriptionSecret::new(SECRET),
        active: true,
        created_at: now(),
    }
}

/// Registry fake holding subscriptions in memory.
#[derive(Default)]
pub struct MemoryRegistry {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl MemoryRegistry {
    pub fn with(subscriptions: Vec<Subscription>) -> Self {
        Self {
            subscriptions: Mutex::new(subscriptions),
        }
    }
}

impl SubscriptionRegistry for MemoryRegistry {
    type Error = Infallible;

    fn create(&self, url: &str, events: &[String]) -> Result<Subscription, Infallible> {
        let events: Vec<&str> = events.iter().map(String::as_str).collect();
        let sub = subscription(url, &events);
        self.subscriptions.lock().unwrap().push(sub.clone());
        Ok(sub)
    }

    fn deactivate(&self, id: SubscriptionId) -> Result<bool, Infallible> {
        let mut subs = self.subscriptions.lock().unwrap();
        let mut changed = false;
        for sub in subs.iter_mut().filter(|s| s.id == id && s.active) {
            sub.active = false;
            changed = true;
        }
        Ok(changed)
    }

    fn find_active(&self, event: &str) -> Result<Vec<Subscription>, Infallible> {
        let subs = self.subscriptions.lock().unwrap();
        Ok(subs.iter().filter(|s| s.wants(event)).cloned().collect())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
pub struct Unavailable;

/// Registry whose lookups always fail.
pub struct BrokenRegistry;

impl SubscriptionRegistry for BrokenRegistry {
    type Error = Unavailable;

    fn create(&self, _url: &str, _events: &[String]) -> Result<Subscription, Unavailable> {
        Err(Unavailable)
    }

    fn deactivate(&self, _id: SubscriptionId) -> Result<bool, Unavailable> {
        Err(Unavailable)
    }

    fn find_active(&self, _event: &str) -> Result<Vec<Subscription>, Unavailable> {
        Err(Unavailable)
    }
}

/// Ledger fake; rejects every write when `failing` is set.
#[derive(Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<DeliveryRecord>>,
    failing: bool,
}

impl MemoryLedger {
    pub fn failing() -> Self {
        Self {
            records: Mutex::default(),
            failing: true,
        }
    }

    pub fn records(&self) -> Vec<DeliveryRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl DeliveryLedger for MemoryLedger {
    type Error = Unavailable;

    fn record(&self, record: &DeliveryRecord) -> Result<(), Unavailable> {
        if self.failing {
            return Err(Unavailable);
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn query(&self, filter: &DeliveryFilter) -> Result<Vec<DeliveryRecord>, Unavailable> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| filter.subscription_id.map_or(true, |id| r.subscription_id == id))
            .filter(|r| filter.event.as_ref().map_or(true, |e| &r.event == e))
            .filter(|r| filter.success.map_or(true, |s| r.success == s))
            .cloned()
            .collect())
    }
}
