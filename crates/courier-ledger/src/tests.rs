//! Unit tests for the delivery ledger.

use chrono::Duration;
use courier_db::DbRuntimeSettings;
use courier_types::{
    now, DeliveryFilter, DeliveryId, DeliveryLedger, DeliveryOutcome, DeliveryRecord,
    SubscriptionId,
};
use rusqlite::Connection;
use serde_json::json;

use crate::error::LedgerError;
use crate::sqlite::SqliteLedger;
use crate::store::{delivery_summary, get_delivery, query_deliveries, record_delivery};

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    courier_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn record_for(
    subscription_id: SubscriptionId,
    event: &str,
    offset_ms: i64,
    outcome: DeliveryOutcome,
) -> DeliveryRecord {
    let opened = now() + Duration::milliseconds(offset_ms);
    DeliveryRecord::finish(
        DeliveryId::new(),
        subscription_id,
        event,
        json!({"id": "doc-1", "offset": offset_ms}),
        opened,
        opened + Duration::milliseconds(7),
        outcome,
    )
}

fn ok() -> DeliveryOutcome {
    DeliveryOutcome::Delivered { status: 200 }
}

fn server_error() -> DeliveryOutcome {
    DeliveryOutcome::Rejected {
        status: 500,
        message: "HTTP 500 Internal Server Error".to_string(),
    }
}

// ── record / get ─────────────────────────────────────────────────────

#[test]
fn record_then_get_returns_identical_record() {
    let conn = test_db();
    let record = record_for(SubscriptionId::new(), "document.anchored", 0, ok());

    record_delivery(&conn, &record).expect("record should succeed");

    let stored = get_delivery(&conn, record.id)
        .expect("get should succeed")
        .expect("record should exist");
    assert_eq!(stored, record);
    assert_eq!(stored.payload["id"], "doc-1");
}

#[test]
fn failed_outcomes_keep_status_and_reason() {
    let conn = test_db();
    let rejected = record_for(SubscriptionId::new(), "e", 0, server_error());
    let timed_out = record_for(
        SubscriptionId::new(),
        "e",
        1,
        DeliveryOutcome::Failed {
            message: "request timed out after 5000ms".to_string(),
        },
    );
    record_delivery(&conn, &rejected).unwrap();
    record_delivery(&conn, &timed_out).unwrap();

    let rejected = get_delivery(&conn, rejected.id).unwrap().unwrap();
    assert!(!rejected.success);
    assert_eq!(rejected.response_status, Some(500));

    let timed_out = get_delivery(&conn, timed_out.id).unwrap().unwrap();
    assert_eq!(timed_out.response_status, None);
    assert!(timed_out.error_message.unwrap().contains("timed out"));
}

#[test]
fn duplicate_ids_are_rejected() {
    let conn = test_db();
    let record = record_for(SubscriptionId::new(), "e", 0, ok());
    record_delivery(&conn, &record).unwrap();

    let err = record_delivery(&conn, &record).unwrap_err();
    assert!(matches!(err, LedgerError::Database(_)));
}

#[test]
fn get_unknown_id_returns_none() {
    let conn = test_db();
    assert!(get_delivery(&conn, DeliveryId::new()).unwrap().is_none());
}

#[test]
fn records_cannot_be_rewritten() {
    let conn = test_db();
    let record = record_for(SubscriptionId::new(), "e", 0, ok());
    record_delivery(&conn, &record).unwrap();

    let result = conn.execute(
        "UPDATE delivery_records SET event = 'other' WHERE id = ?1",
        [record.id.to_string()],
    );
    assert!(result.is_err());
    assert_eq!(get_delivery(&conn, record.id).unwrap().unwrap().event, "e");
}

// ── query ────────────────────────────────────────────────────────────

#[test]
fn query_returns_newest_first() {
    let conn = test_db();
    let sub = SubscriptionId::new();
    let first = record_for(sub, "e", 0, ok());
    let second = record_for(sub, "e", 10, ok());
    let third = record_for(sub, "e", 20, ok());
    for r in [&second, &first, &third] {
        record_delivery(&conn, r).unwrap();
    }

    let all = query_deliveries(&conn, &DeliveryFilter::default()).unwrap();
    let ids: Vec<DeliveryId> = all.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
}

#[test]
fn query_filters_combine() {
    let conn = test_db();
    let a = SubscriptionId::new();
    let b = SubscriptionId::new();
    record_delivery(&conn, &record_for(a, "document.anchored", 0, ok())).unwrap();
    record_delivery(&conn, &record_for(a, "document.anchored", 1, server_error())).unwrap();
    record_delivery(&conn, &record_for(a, "case.closed", 2, ok())).unwrap();
    record_delivery(&conn, &record_for(b, "document.anchored", 3, ok())).unwrap();

    let for_a = query_deliveries(
        &conn,
        &DeliveryFilter {
            subscription_id: Some(a),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(for_a.len(), 3);

    let a_anchored_failures = query_deliveries(
        &conn,
        &DeliveryFilter {
            subscription_id: Some(a),
            event: Some("document.anchored".to_string()),
            success: Some(false),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(a_anchored_failures.len(), 1);
    assert_eq!(a_anchored_failures[0].response_status, Some(500));

    let anchored = query_deliveries(
        &conn,
        &DeliveryFilter {
            event: Some("document.anchored".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(anchored.len(), 3);
}

#[test]
fn query_since_and_limit() {
    let conn = test_db();
    let sub = SubscriptionId::new();
    let old = record_for(sub, "e", -60_000, ok());
    let recent = record_for(sub, "e", 0, ok());
    let newest = record_for(sub, "e", 5, ok());
    for r in [&old, &recent, &newest] {
        record_delivery(&conn, r).unwrap();
    }

    let since = query_deliveries(
        &conn,
        &DeliveryFilter {
            since: Some(recent.created_at),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(since.len(), 2);
    assert!(since.iter().all(|r| r.id != old.id));

    let limited = query_deliveries(
        &conn,
        &DeliveryFilter {
            limit: Some(1),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, newest.id);
}

// ── summary ──────────────────────────────────────────────────────────

#[test]
fn summary_counts_outcomes() {
    let conn = test_db();
    let sub = SubscriptionId::new();
    record_delivery(&conn, &record_for(sub, "e", 0, ok())).unwrap();
    record_delivery(&conn, &record_for(sub, "e", 1, ok())).unwrap();
    let last = record_for(sub, "e", 2, server_error());
    record_delivery(&conn, &last).unwrap();
    record_delivery(&conn, &record_for(SubscriptionId::new(), "e", 3, ok())).unwrap();

    let summary = delivery_summary(&conn, sub).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.last_attempt_at, Some(last.delivered_at));
}

#[test]
fn summary_for_unknown_subscription_is_empty() {
    let conn = test_db();
    let summary = delivery_summary(&conn, SubscriptionId::new()).unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.last_attempt_at, None);
}

// ── pooled ledger ────────────────────────────────────────────────────

#[test]
fn concurrent_appends_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let (pool, _) = courier_db::open(path.to_str().unwrap(), DbRuntimeSettings::default())
        .expect("db should open");
    let ledger = SqliteLedger::new(pool);
    let sub = SubscriptionId::new();

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let ledger = &ledger;
            scope.spawn(move || {
                for i in 0..10 {
                    let record = record_for(sub, "e", worker * 100 + i, ok());
                    ledger.record(&record).expect("append should succeed");
                }
            });
        }
    });

    let all = ledger
        .query(&DeliveryFilter {
            subscription_id: Some(sub),
            limit: Some(1000),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(all.len(), 80);
    assert_eq!(ledger.summary(sub).unwrap().total, 80);
}
