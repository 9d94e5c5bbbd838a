//! Metric identifiers, queries and the sample windows they return.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::property::EntityHandle;

/// A concrete series of one entity: a counter plus an instance qualifier.
///
/// An empty `instance` names the aggregate across all instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricId {
    pub counter_id: i32,
    #[serde(default)]
    pub instance: String,
}

impl MetricId {
    pub fn new(counter_id: i32, instance: impl Into<String>) -> Self {
        Self {
            counter_id,
            instance: instance.into(),
        }
    }

    /// Aggregate series of a counter.
    pub fn aggregate(counter_id: i32) -> Self {
        Self::new(counter_id, "")
    }
}

/// Parameters of one sample query. Built once per polling session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub entity: EntityHandle,
    pub metric_ids: Vec<MetricId>,
    pub interval_id: i32,
    pub max_samples: u32,
}

/// Timestamp and length of one sample slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInfo {
    pub timestamp: DateTime<Utc>,
    /// Sample length in seconds.
    pub interval: i32,
}

/// Values of one series. Only integer series are decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesPayload {
    Integer(Vec<i64>),
    /// Series of a kind this client cannot decode, e.g. CSV-encoded series.
    Unsupported {
        kind: String,
        raw: serde_json::Value,
    },
}

impl SeriesPayload {
    pub fn kind(&self) -> &str {
        match self {
            SeriesPayload::Integer(_) => INTEGER_KIND,
            SeriesPayload::Unsupported { kind, .. } => kind,
        }
    }
}

const INTEGER_KIND: &str = "integer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireSeries", into = "WireSeries")]
pub struct MetricSeries {
    pub id: MetricId,
    pub payload: SeriesPayload,
}

/// Wire form of a series: a `kind` tag plus either `values` or an opaque `raw` body.
#[derive(Serialize, Deserialize)]
struct WireSeries {
    id: MetricId,
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    raw: serde_json::Value,
}

impl From<WireSeries> for MetricSeries {
    fn from(w: WireSeries) -> Self {
        let payload = match w.values {
            values if w.kind == INTEGER_KIND => {
                SeriesPayload::Integer(values.unwrap_or_default())
            }
            values => SeriesPayload::Unsupported {
                raw: values.map(serde_json::Value::from).unwrap_or(w.raw),
                kind: w.kind,
            },
        };
        Self { id: w.id, payload }
    }
}

impl From<MetricSeries> for WireSeries {
    fn from(s: MetricSeries) -> Self {
        match s.payload {
            SeriesPayload::Integer(values) => WireSeries {
                id: s.id,
                kind: INTEGER_KIND.to_string(),
                values: Some(values),
                raw: serde_json::Value::Null,
            },
            SeriesPayload::Unsupported { kind, raw } => WireSeries {
                id: s.id,
                kind,
                values: None,
                raw,
            },
        }
    }
}

/// Result of a query for one entity: the sample slots and one series per metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleWindow {
    pub entity: EntityHandle,
    #[serde(default)]
    pub sample_info: Vec<SampleInfo>,
    #[serde(default)]
    pub series: Vec<MetricSeries>,
}

impl SampleWindow {
    /// First and last sample timestamps, if the window has any samples.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.sample_info.first()?;
        let last = self.sample_info.last()?;
        Some((first.timestamp, last.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ManagedObjectRef;
    use chrono::TimeZone;

    fn vm() -> EntityHandle {
        EntityHandle(ManagedObjectRef::new("VirtualMachine", "vm-42"))
    }

    #[test]
    fn time_range_spans_first_and_last() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 20).unwrap();
        let window = SampleWindow {
            entity: vm(),
            sample_info: vec![
                SampleInfo {
                    timestamp: t0,
                    interval: 20,
                },
                SampleInfo {
                    timestamp: t1,
                    interval: 20,
                },
            ],
            series: Vec::new(),
        };
        assert_eq!(window.time_range(), Some((t0, t1)));
    }

    #[test]
    fn time_range_empty_window() {
        let window = SampleWindow {
            entity: vm(),
            sample_info: Vec::new(),
            series: Vec::new(),
        };
        assert_eq!(window.time_range(), None);
    }

    #[test]
    fn series_payload_decodes_both_kinds() {
        let json = r#"[
            {"id": {"counter_id": 2, "instance": ""}, "kind": "integer", "values": [10, 12, 9]},
            {"id": {"counter_id": 3}, "kind": "csv", "raw": "10,12,9"}
        ]"#;
        let series: Vec<MetricSeries> = serde_json::from_str(json).unwrap();
        assert_eq!(series[0].payload, SeriesPayload::Integer(vec![10, 12, 9]));
        assert_eq!(series[1].payload.kind(), "csv");
        assert_eq!(series[1].id, MetricId::aggregate(3));
    }

    #[test]
    fn integer_series_without_values_is_empty() {
        let json = r#"{"id": {"counter_id": 2}, "kind": "integer"}"#;
        let series: MetricSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.payload, SeriesPayload::Integer(Vec::new()));
    }
}
