// Latest glucose reading from the graph endpoint.
//
// The graph payload nests the most recent point at
// `data.connection.glucoseMeasurement`:
//
// ```json
// {"Value": 123, "ValueInMgPerDl": 123, "TrendArrow": 4,
//  "FactoryTimestamp": "1/31/2026 9:42:00 AM", "Timestamp": "1/31/2026 10:42:00 AM",
//  "isHigh": false, "isLow": false}
// ```
//
// `FactoryTimestamp` is UTC; `Timestamp` is the sender's local clock.

use crate::api::Transport;
use crate::error::{LluError, LluResult};
use crate::session::{authed_get, SessionContext};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Upstream timestamp layout, e.g. `1/31/2026 10:42:00 AM`.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

pub fn graph_path(patient_id: &str) -> String {
    format!("/llu/connections/{}/graph", patient_id)
}

/// Trend arrow: raw upstream code and the label it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub code: i64,
    pub label: String,
}

/// Code to label mapping for trend arrows. Extend with `with_label` when the
/// upstream starts sending new codes.
#[derive(Debug, Clone)]
pub struct TrendTable {
    labels: BTreeMap<i64, String>,
}

impl Default for TrendTable {
    fn default() -> Self {
        Self::empty()
            .with_label(1, "falling_quickly")
            .with_label(2, "falling")
            .with_label(3, "stable")
            .with_label(4, "rising")
            .with_label(5, "rising_quickly")
    }
}

impl TrendTable {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn empty() -> Self {
        Self {
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, code: i64, label: &str) -> Self {
        self.labels.insert(code, label.to_string());
        self
    }

    pub fn trend(&self, code: i64) -> Trend {
        let label = self
            .labels
            .get(&code)
            .map(String::as_str)
            .unwrap_or(Self::UNKNOWN);
        Trend {
            code,
            label: label.to_string(),
        }
    }
}

/// The latest measurement for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Value in the sender's display unit, as reported.
    pub value: f64,
    pub value_mg_dl: Option<f64>,
    pub trend: Trend,
    pub timestamp: DateTime<Utc>,
    /// Sender-local wall clock, when the upstream provides it.
    pub local_timestamp: Option<NaiveDateTime>,
    pub is_high: bool,
    pub is_low: bool,
}

/// Fetch the graph for `patient_id` and extract its latest measurement.
pub fn fetch_latest<T: Transport>(
    transport: &T,
    session: &SessionContext,
    patient_id: &str,
    trends: &TrendTable,
) -> LluResult<Reading> {
    let payload = authed_get(transport, session, &graph_path(patient_id))?;
    let connection = payload
        .get("data")
        .and_then(|d| d.get("connection"))
        .and_then(Value::as_object)
        .ok_or_else(|| LluError::Extraction("graph response has no data.connection object".into()))?;

    let measurement = match connection.get("glucoseMeasurement") {
        Some(Value::Null) => return Err(LluError::NoData(patient_id.to_string())),
        Some(Value::Object(m)) => m,
        Some(_) => {
            return Err(LluError::Extraction(
                "data.connection.glucoseMeasurement is not an object".into(),
            ))
        }
        None => {
            let keys: Vec<&str> = connection.keys().map(String::as_str).collect();
            return Err(LluError::Extraction(format!(
                "data.connection.glucoseMeasurement missing; available keys: {}",
                keys.join(", ")
            )));
        }
    };

    let reading = parse_measurement(measurement, trends)?;
    debug!(value = reading.value, trend = %reading.trend.label, at = %reading.timestamp, "Extracted latest reading");
    Ok(reading)
}

/// Convert a raw `glucoseMeasurement` object into a [`Reading`].
pub fn parse_measurement(raw: &Map<String, Value>, trends: &TrendTable) -> LluResult<Reading> {
    let value = raw
        .get("Value")
        .and_then(Value::as_f64)
        .ok_or_else(|| LluError::Extraction("glucoseMeasurement.Value missing or not numeric".into()))?;
    let code = raw
        .get("TrendArrow")
        .and_then(Value::as_i64)
        .ok_or_else(|| LluError::Extraction("glucoseMeasurement.TrendArrow missing or not numeric".into()))?;

    let local_timestamp = raw
        .get("Timestamp")
        .and_then(Value::as_str)
        .map(parse_timestamp)
        .transpose()?;
    let factory = raw
        .get("FactoryTimestamp")
        .and_then(Value::as_str)
        .map(parse_timestamp)
        .transpose()?;
    let instant = factory
        .or(local_timestamp)
        .ok_or_else(|| LluError::Extraction("glucoseMeasurement has no timestamp".into()))?;

    let flag = |key: &str| raw.get(key).and_then(Value::as_bool).unwrap_or(false);

    Ok(Reading {
        value,
        value_mg_dl: raw.get("ValueInMgPerDl").and_then(Value::as_f64),
        trend: trends.trend(code),
        timestamp: instant.and_utc(),
        local_timestamp,
        is_high: flag("isHigh"),
        is_low: flag("isLow"),
    })
}

/// Parse an upstream `M/D/YYYY h:mm:ss AM` timestamp.
pub fn parse_timestamp(raw: &str) -> LluResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| LluError::Extraction(format!("unparseable timestamp {:?}: {}", raw, e)))
}
