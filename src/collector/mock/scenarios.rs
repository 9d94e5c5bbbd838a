//! Pre-built backends and fixture files.
//!
//! `typical_host()` is the built-in demo backend. Other setups can be recorded
//! as JSON scenario files and loaded with [`MockService::from_json_file`].

use std::fmt;
use std::io;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::service::{MockService, SampleGenerator};
use crate::model::{
    CounterDescriptor, EntityHandle, ManagedObjectRef, MetricId, MetricSeries, RollupType,
    SampleInfo, SampleWindow, SeriesPayload,
};

/// Counter descriptor with an `average` rollup.
pub fn counter(id: i32, group: &str, name: &str, summary: &str) -> CounterDescriptor {
    CounterDescriptor {
        id,
        group_key: group.to_string(),
        name_key: name.to_string(),
        summary: summary.to_string(),
        unit_key: String::new(),
        rollup_type: RollupType::Average,
    }
}

/// Window with one integer series, one sample slot per value, 20 s apart.
pub fn integer_window(entity: &EntityHandle, counter_id: i32, values: &[i64]) -> SampleWindow {
    // 2024-01-01T12:00:00Z
    let t0 = DateTime::<Utc>::from_timestamp(1_704_110_400, 0).unwrap_or_default();
    SampleWindow {
        entity: entity.clone(),
        sample_info: (0..values.len())
            .map(|i| SampleInfo {
                timestamp: t0 + Duration::seconds(20 * i as i64),
                interval: 20,
            })
            .collect(),
        series: vec![MetricSeries {
            id: MetricId::aggregate(counter_id),
            payload: SeriesPayload::Integer(values.to_vec()),
        }],
    }
}

/// `(id, group, name, rollup, unit, summary)` of the demo host's counters.
const TYPICAL_COUNTERS: &[(i32, &str, &str, &str, &str, &str)] = &[
    (2, "cpu", "usage", "average", "percent", "CPU usage as a percentage during the interval"),
    (6, "cpu", "usagemhz", "average", "megaHertz", "CPU usage in megahertz during the interval"),
    (
        12,
        "cpu",
        "ready",
        "summation",
        "millisecond",
        "Time that the virtual machine was ready, but could not get scheduled to run on the physical CPU",
    ),
    (14, "cpu", "wait", "summation", "millisecond", "Total CPU time spent in wait state"),
    (
        24,
        "mem",
        "usage",
        "average",
        "percent",
        "Memory usage as percentage of total configured or available memory",
    ),
    (33, "mem", "active", "average", "kiloBytes", "Amount of memory that is actively used"),
    (125, "disk", "usage", "average", "kiloBytesPerSecond", "Aggregated disk I/O rate"),
    (
        143,
        "net",
        "usage",
        "average",
        "kiloBytesPerSecond",
        "Network utilization (combined transmit-rates and receive-rates) during the interval",
    ),
];

fn typical_counters() -> Vec<CounterDescriptor> {
    TYPICAL_COUNTERS
        .iter()
        .map(|&(id, group, name, rollup, unit, summary)| CounterDescriptor {
            id,
            group_key: group.to_string(),
            name_key: name.to_string(),
            summary: summary.to_string(),
            unit_key: unit.to_string(),
            rollup_type: RollupType::from(rollup.to_string()),
        })
        .collect()
}

fn typical_metrics(counters: &[CounterDescriptor]) -> Vec<MetricId> {
    let mut metrics = Vec::new();
    for c in counters {
        metrics.push(MetricId::aggregate(c.id));
        if c.group_key == "cpu" {
            metrics.push(MetricId::new(c.id, "0"));
            metrics.push(MetricId::new(c.id, "1"));
        }
    }
    metrics
}

impl MockService {
    /// Host with two virtual machines, `web-01` and `db-01`, and a handful of
    /// cpu, mem, disk and net counters. Samples are generated from the current time.
    pub fn typical_host() -> Self {
        let counters = typical_counters();
        let metrics = typical_metrics(&counters);
        let web = EntityHandle(ManagedObjectRef::new("VirtualMachine", "vm-101"));
        let db = EntityHandle(ManagedObjectRef::new("VirtualMachine", "vm-102"));

        Self::new()
            .with_counters(counters, 3)
            .with_entity("web-01", web.clone())
            .with_entity("db-01", db.clone())
            .with_available_metrics(&web, metrics.clone())
            .with_available_metrics(&db, metrics)
            .with_generator(SampleGenerator::new(Utc::now()))
    }

    /// Loads a recorded scenario from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        let scenario: Scenario = serde_json::from_str(&content)?;
        Ok(Self::from_scenario(scenario))
    }

    pub fn from_scenario(scenario: Scenario) -> Self {
        let mut service = Self::new().with_counters(scenario.counters, scenario.page_size);
        for vm in scenario.entities {
            let entity = EntityHandle(vm.entity);
            service = service
                .with_available_metrics(&entity, vm.available_metrics)
                .with_entity(vm.name, entity);
        }
        for windows in scenario.windows {
            service.push_windows(Ok(windows));
        }
        if scenario.generate {
            service = service.with_generator(SampleGenerator::new(Utc::now()));
        }
        service
    }
}

/// Recorded backend state.
///
/// ```json
/// {
///   "counters": [{"id": 2, "group_key": "cpu", "summary": "CPU usage", "rollup_type": "average"}],
///   "entities": [{"name": "web-01", "entity": {"type": "VirtualMachine", "value": "vm-101"},
///                 "available_metrics": [{"counter_id": 2}]}],
///   "generate": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub counters: Vec<CounterDescriptor>,
    /// Counters per property page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub entities: Vec<ScenarioEntity>,
    /// Scripted answers to successive sample queries.
    #[serde(default)]
    pub windows: Vec<Vec<SampleWindow>>,
    /// Generate samples once the scripted windows run out.
    #[serde(default)]
    pub generate: bool,
}

fn default_page_size() -> usize {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioEntity {
    pub name: String,
    pub entity: ManagedObjectRef,
    #[serde(default)]
    pub available_metrics: Vec<MetricId>,
}

#[derive(Debug)]
pub enum ScenarioError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Io(e) => write!(f, "cannot read scenario: {}", e),
            ScenarioError::Parse(e) => write!(f, "invalid scenario: {}", e),
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<io::Error> for ScenarioError {
    fn from(e: io::Error) -> Self {
        ScenarioError::Io(e)
    }
}

impl From<serde_json::Error> for ScenarioError {
    fn from(e: serde_json::Error) -> Self {
        ScenarioError::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::{PerfService, Session};
    use crate::collector::{CounterCatalog, PropertyFetcher};
    use std::io::Write;

    #[test]
    fn typical_host_has_cpu_counters_and_vms() {
        let mut session = Session::with_defaults(MockService::typical_host());
        let catalog = CounterCatalog::build(&PropertyFetcher::new(), &mut session).unwrap();

        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.filter_by_group("cpu").len(), 4);

        let root = session.content.root_folder.clone();
        let web = session
            .service
            .find_entity(&root, "VirtualMachine", "web-01")
            .unwrap();
        assert!(web.is_some());
    }

    #[test]
    fn scenario_loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "counters": [
                    {{"id": 2, "group_key": "cpu", "summary": "CPU usage", "rollup_type": "average"}},
                    {{"id": 24, "group_key": "mem", "summary": "Memory usage", "rollup_type": "average"}}
                ],
                "page_size": 1,
                "entities": [
                    {{"name": "web-01", "entity": {{"type": "VirtualMachine", "value": "vm-101"}},
                      "available_metrics": [{{"counter_id": 2}}, {{"counter_id": 24}}]}}
                ],
                "windows": [[
                    {{"entity": {{"type": "VirtualMachine", "value": "vm-101"}},
                      "sample_info": [{{"timestamp": "2024-01-01T00:00:00Z", "interval": 20}}],
                      "series": [{{"id": {{"counter_id": 2}}, "kind": "integer", "values": [42]}}]}}
                ]]
            }}"#
        )
        .unwrap();

        let service = MockService::from_json_file(file.path()).unwrap();
        let mut session = Session::with_defaults(service);
        let catalog = CounterCatalog::build(&PropertyFetcher::new(), &mut session).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(session.service.continuation_tokens(), vec!["page-1"]);

        let pm = session.content.perf_manager.clone();
        let windows = session.service.query_perf(&pm, &[]).unwrap();
        assert_eq!(windows[0].series[0].payload, SeriesPayload::Integer(vec![42]));
    }

    #[test]
    fn malformed_scenario_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"counters\": 5}}").unwrap();

        let err = MockService::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }

    #[test]
    fn missing_scenario_is_io_error() {
        let err = MockService::from_json_file(Path::new("/nonexistent/scenario.json")).unwrap_err();
        assert!(matches!(err, ScenarioError::Io(_)));
    }
}
