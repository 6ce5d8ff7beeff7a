//! Stock aggregation over a key's version history.
//!
//! Every function here is a pure reduction over the raw values of the
//! `transaction:<sku>` versions, in the order the ledger returned them (most
//! recent first by default). Nothing is reordered and nothing is cached.
//!
//! A single version that fails to decode, or that lacks a numeric
//! `quantity_change`, is logged and skipped: one corrupt version must never
//! abort the whole computation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::transaction::parse_timestamp;

/// Balance restricted to one UTC calendar day, with the matching records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatedBalance {
    pub inventory: i64,
    pub transactions: Vec<Value>,
}

/// One record annotated with the cumulative sum up to and including it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunningEntry {
    #[serde(flatten)]
    pub transaction: Map<String, Value>,
    pub running_balance: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunningBalance {
    pub transactions: Vec<RunningEntry>,
    pub total: i64,
}

/// Sum of `quantity_change` across every decodable version.
pub fn current_balance<'a, I>(history: I) -> i64
where
    I: IntoIterator<Item = &'a [u8]>,
{
    history
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| decode(idx, raw))
        .filter_map(|record| quantity_change(&record))
        .fold(0i64, i64::saturating_add)
}

/// Stock level of a product: the replayed balance when any history exists,
/// otherwise the product's recorded initial quantity.
pub fn stock_level<'a, I>(history: I, fallback: i64) -> i64
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut history = history.into_iter().peekable();
    if history.peek().is_none() {
        return fallback;
    }
    current_balance(history)
}

/// Sum of the deltas recorded on the same UTC calendar day as `target`.
///
/// Only the date component is compared, not the full instant. Versions with a
/// missing or unparseable `timestamp` are skipped.
pub fn balance_as_of<'a, I>(history: I, target: DateTime<Utc>) -> DatedBalance
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let day: NaiveDate = target.date_naive();
    let mut out = DatedBalance::default();

    for (idx, raw) in history.into_iter().enumerate() {
        let Some(record) = decode(idx, raw) else {
            continue;
        };
        let Some(at) = timestamp(&record) else {
            continue;
        };
        if at.date_naive() != day {
            continue;
        }
        let Some(delta) = quantity_change(&record) else {
            continue;
        };
        out.inventory = out.inventory.saturating_add(delta);
        out.transactions.push(Value::Object(record));
    }

    out
}

/// Annotate each record with a cumulative sum, in the order supplied.
pub fn running_balance<'a, I>(history: I) -> RunningBalance
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut out = RunningBalance::default();

    for (idx, raw) in history.into_iter().enumerate() {
        let Some(record) = decode(idx, raw) else {
            continue;
        };
        let Some(delta) = quantity_change(&record) else {
            continue;
        };
        out.total = out.total.saturating_add(delta);
        out.transactions.push(RunningEntry {
            transaction: record,
            running_balance: out.total,
        });
    }

    out
}

/// Timestamp text of the most recent decodable record, if any.
pub fn last_transaction_timestamp<'a, I>(history: I) -> Option<String>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    history
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| decode(idx, raw))
        .filter_map(|record| {
            let at = timestamp(&record)?;
            let text = record.get("timestamp")?.as_str()?.to_string();
            Some((at, text))
        })
        .max_by_key(|(at, _)| *at)
        .map(|(_, text)| text)
}

fn decode(idx: usize, raw: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            tracing::warn!(version = idx, kind = %json_kind(&other), "skipping non-object history entry");
            None
        }
        Err(e) => {
            tracing::warn!(version = idx, error = %e, "skipping malformed history entry");
            None
        }
    }
}

fn quantity_change(record: &Map<String, Value>) -> Option<i64> {
    let value = record.get("quantity_change")?;
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn timestamp(record: &Map<String, Value>) -> Option<DateTime<Utc>> {
    record
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
