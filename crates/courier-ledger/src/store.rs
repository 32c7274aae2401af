//! Persistence operations for the delivery ledger.
//!
//! All writes go through [`record_delivery`], a single `INSERT`. Reads go
//! through [`query_deliveries`], which supports filtering by subscription,
//! event, outcome and time, newest first.

use chrono::{DateTime, Utc};
use courier_types::{
    format_timestamp, parse_timestamp, DeliveryFilter, DeliveryId, DeliveryRecord, SubscriptionId,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::LedgerError;

const RECORD_COLUMNS: &str = "id, subscription_id, event, payload_json, response_status, success,
    error_message, duration_ms, created_at, delivered_at";

/// Appends one finished delivery record.
///
/// # Errors
///
/// Returns `LedgerError::Serialization` if the payload cannot be encoded or
/// `LedgerError::Database` if the insert fails (including a duplicate id).
pub fn record_delivery(conn: &Connection, record: &DeliveryRecord) -> Result<(), LedgerError> {
    let payload_json = serde_json::to_string(&record.payload)?;

    conn.execute(
        &format!(
            "INSERT INTO delivery_records ({RECORD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            record.id.to_string(),
            record.subscription_id.to_string(),
            record.event,
            payload_json,
            record.response_status,
            record.success,
            record.error_message,
            i64::try_from(record.duration_ms).unwrap_or(i64::MAX),
            format_timestamp(&record.created_at),
            format_timestamp(&record.delivered_at),
        ],
    )?;

    tracing::debug!(
        delivery_id = %record.id,
        subscription_id = %record.subscription_id,
        event = %record.event,
        success = record.success,
        "delivery recorded"
    );

    Ok(())
}

/// Retrieves a single record by id.
///
/// # Errors
///
/// Returns `LedgerError::Database` on SQL failure or
/// `LedgerError::Corrupt` if the row cannot be decoded.
pub fn get_delivery(conn: &Connection, id: DeliveryId) -> Result<Option<DeliveryRecord>, LedgerError> {
    let raw = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM delivery_records WHERE id = ?1"),
            params![id.to_string()],
            RawRecord::from_row,
        )
        .optional()?;
    raw.map(RawRecord::decode).transpose()
}

/// Queries the ledger with optional filters.
///
/// Results are newest first, bounded by `filter.limit` (default 100).
///
/// # Errors
///
/// Returns `LedgerError::Database` on SQL failure or
/// `LedgerError::Corrupt` if a row cannot be decoded.
pub fn query_deliveries(
    conn: &Connection,
    filter: &DeliveryFilter,
) -> Result<Vec<DeliveryRecord>, LedgerError> {
    // Clauses and bind parameters are collected separately so nothing is
    // interpolated into the SQL text.
    let mut clauses: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(subscription_id) = filter.subscription_id {
        param_values.push(Box::new(subscription_id.to_string()));
        clauses.push(format!("subscription_id = ?{}", param_values.len()));
    }

    if let Some(ref event) = filter.event {
        param_values.push(Box::new(event.clone()));
        clauses.push(format!("event = ?{}", param_values.len()));
    }

    if let Some(success) = filter.success {
        param_values.push(Box::new(success));
        clauses.push(format!("success = ?{}", param_values.len()));
    }

    if let Some(ref since) = filter.since {
        param_values.push(Box::new(format_timestamp(since)));
        clauses.push(format!("created_at >= ?{}", param_values.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    param_values.push(Box::new(filter.limit.unwrap_or(100)));
    let sql = format!(
        "SELECT {RECORD_COLUMNS}
         FROM delivery_records
         {where_clause}
         ORDER BY created_at DESC, id DESC
         LIMIT ?{}",
        param_values.len()
    );

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = param_values.iter().map(|p| &**p).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), RawRecord::from_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?.decode()?);
    }

    Ok(records)
}

/// Aggregate delivery counts for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummary {
    /// The subscription summarised.
    pub subscription_id: SubscriptionId,
    /// Number of recorded attempts.
    pub total: u64,
    /// Attempts that received a 2xx response.
    pub succeeded: u64,
    /// Attempts that did not.
    pub failed: u64,
    /// Completion time of the most recent attempt.
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// Summarises the ledger for a subscription.
///
/// # Errors
///
/// Returns `LedgerError::Database` on SQL failure or
/// `LedgerError::Corrupt` if the stored timestamp cannot be parsed.
pub fn delivery_summary(
    conn: &Connection,
    subscription_id: SubscriptionId,
) -> Result<DeliverySummary, LedgerError> {
    let (total, succeeded, last): (i64, i64, Option<String>) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(success), 0), MAX(delivered_at)
         FROM delivery_records
         WHERE subscription_id = ?1",
        params![subscription_id.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let last_attempt_at = last
        .map(|ts| parse_timestamp(&ts).map_err(|e| LedgerError::Corrupt(format!("{ts}: {e}"))))
        .transpose()?;

    let total = total.max(0) as u64;
    let succeeded = succeeded.max(0) as u64;

    Ok(DeliverySummary {
        subscription_id,
        total,
        succeeded,
        failed: total - succeeded,
        last_attempt_at,
    })
}

/// A ledger row before text columns are parsed.
struct RawRecord {
    id: String,
    subscription_id: String,
    event: String,
    payload_json: String,
    response_status: Option<i64>,
    success: bool,
    error_message: Option<String>,
    duration_ms: i64,
    created_at: String,
    delivered_at: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            subscription_id: row.get(1)?,
            event: row.get(2)?,
            payload_json: row.get(3)?,
            response_status: row.get(4)?,
            success: row.get(5)?,
            error_message: row.get(6)?,
            duration_ms: row.get(7)?,
            created_at: row.get(8)?,
            delivered_at: row.get(9)?,
        })
    }

    fn decode(self) -> Result<DeliveryRecord, LedgerError> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            LedgerError::Corrupt(format!("record {}: {what}: {e}", self.id))
        };

        let id = self
            .id
            .parse::<DeliveryId>()
            .map_err(|e| corrupt("id", &e))?;
        let subscription_id = self
            .subscription_id
            .parse::<SubscriptionId>()
            .map_err(|e| corrupt("subscription_id", &e))?;
        let response_status = self
            .response_status
            .map(u16::try_from)
            .transpose()
            .map_err(|e| corrupt("response_status", &e))?;
        let created_at = parse_timestamp(&self.created_at).map_err(|e| corrupt("created_at", &e))?;
        let delivered_at =
            parse_timestamp(&self.delivered_at).map_err(|e| corrupt("delivered_at", &e))?;
        let payload = serde_json::from_str(&self.payload_json)?;

        Ok(DeliveryRecord {
            id,
            subscription_id,
            event: self.event,
            payload,
            response_status,
            success: self.success,
            error_message: self.error_message,
            delivered_at,
            created_at,
            duration_ms: self.duration_ms.max(0) as u64,
        })
    }
}
