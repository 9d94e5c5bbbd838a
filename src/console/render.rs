//! Line-oriented rendering of sample windows.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::collector::CounterCatalog;
use crate::model::{MetricSeries, SampleWindow, SeriesPayload};

/// Writes each window as a time range line followed by one block per metric:
///
/// ```text
/// Sample time range: 2024-01-01T10:00:00Z - 2024-01-01T10:03:00Z
/// CPU usage as a percentage during the interval
/// 10 12 9
/// ```
pub fn render_windows(
    out: &mut impl Write,
    windows: &[SampleWindow],
    catalog: &CounterCatalog,
) -> io::Result<()> {
    for window in windows {
        render_window(out, window, catalog)?;
    }
    out.flush()
}

pub fn render_window(
    out: &mut impl Write,
    window: &SampleWindow,
    catalog: &CounterCatalog,
) -> io::Result<()> {
    match window.time_range() {
        Some((first, last)) => writeln!(
            out,
            "Sample time range: {} - {}",
            format_timestamp(first),
            format_timestamp(last)
        )?,
        None => debug!(entity = %window.entity, "window has no sample info"),
    }

    for series in &window.series {
        render_series(out, series, catalog)?;
    }
    Ok(())
}

fn render_series(
    out: &mut impl Write,
    series: &MetricSeries,
    catalog: &CounterCatalog,
) -> io::Result<()> {
    if let Some(counter) = catalog.get(series.id.counter_id) {
        writeln!(out, "{}", counter.summary)?;
    }

    match &series.payload {
        SeriesPayload::Integer(values) => {
            let line: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", line.join(" "))?;
        }
        SeriesPayload::Unsupported { kind, .. } => {
            warn!(
                counter_id = series.id.counter_id,
                instance = %series.id.instance,
                kind = %kind,
                "skipping series of unsupported kind"
            );
        }
    }
    Ok(())
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::counter;
    use crate::model::{EntityHandle, ManagedObjectRef, MetricId, SampleInfo};
    use chrono::TimeZone;

    fn catalog() -> CounterCatalog {
        let mut catalog = CounterCatalog::new();
        catalog.insert(counter(2, "cpu", "ready", "CPU ready time"));
        catalog
    }

    fn window(series: Vec<MetricSeries>, samples: usize) -> SampleWindow {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        SampleWindow {
            entity: EntityHandle(ManagedObjectRef::new("VirtualMachine", "vm-1")),
            sample_info: (0..samples)
                .map(|i| SampleInfo {
                    timestamp: t0 + chrono::Duration::seconds(20 * i as i64),
                    interval: 20,
                })
                .collect(),
            series,
        }
    }

    fn render(w: &SampleWindow) -> String {
        let mut out = Vec::new();
        render_windows(&mut out, std::slice::from_ref(w), &catalog()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn integer_series_with_summary() {
        let w = window(
            vec![MetricSeries {
                id: MetricId::aggregate(2),
                payload: SeriesPayload::Integer(vec![10, 12, 9]),
            }],
            3,
        );
        assert_eq!(
            render(&w),
            "Sample time range: 2024-03-01T08:00:00Z - 2024-03-01T08:00:40Z\n\
             CPU ready time\n\
             10 12 9\n"
        );
    }

    #[test]
    fn unknown_counter_prints_values_only() {
        let w = window(
            vec![MetricSeries {
                id: MetricId::aggregate(99),
                payload: SeriesPayload::Integer(vec![1]),
            }],
            1,
        );
        assert_eq!(
            render(&w),
            "Sample time range: 2024-03-01T08:00:00Z - 2024-03-01T08:00:00Z\n1\n"
        );
    }

    #[test]
    fn unsupported_series_prints_summary_only() {
        let w = window(
            vec![MetricSeries {
                id: MetricId::aggregate(2),
                payload: SeriesPayload::Unsupported {
                    kind: "csv".to_string(),
                    raw: serde_json::Value::from("1,2,3"),
                },
            }],
            1,
        );
        let out = render(&w);
        assert!(out.ends_with("CPU ready time\n"));
        assert!(!out.contains("1,2,3"));
    }

    #[test]
    fn empty_sample_info_omits_time_range() {
        let w = window(Vec::new(), 0);
        assert_eq!(render(&w), "");
    }
}
