//! Scripted in-memory `PerfService` for tests and demos.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::collector::catalog::PERF_COUNTER_PROPERTY;
use crate::collector::traits::{PerfService, RemoteFault};
use crate::config::MAX_SAMPLES_LIMIT;
use crate::model::{
    CounterDescriptor, DynamicProperty, EntityHandle, ManagedObjectRef, MetricId, MetricSeries,
    ObjectContent, PropertyFilterSpec, PropertyValue, QuerySpec, RetrieveOptions, RetrieveResult,
    SampleInfo, SampleWindow, SeriesPayload,
};

/// A call received by the mock, recorded in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RetrieveProperties {
        specs: Vec<PropertyFilterSpec>,
        options: RetrieveOptions,
    },
    ContinueRetrieve {
        token: String,
    },
    QueryAvailableMetrics {
        entity: EntityHandle,
        interval_id: i32,
    },
    QueryPerf {
        specs: Vec<QuerySpec>,
    },
    FindEntity {
        type_name: String,
        name: String,
    },
}

/// Generates integer samples for any queried metric when no scripted answer is left.
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    start: DateTime<Utc>,
    round: i64,
}

impl SampleGenerator {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { start, round: 0 }
    }

    fn windows(&mut self, specs: &[QuerySpec]) -> Vec<SampleWindow> {
        self.round += 1;
        specs
            .iter()
            .map(|spec| {
                let count = i64::from(spec.max_samples.clamp(1, MAX_SAMPLES_LIMIT));
                let step = i64::from(spec.interval_id.max(1));
                let first = shifted(
                    self.start,
                    step.saturating_mul(self.round - 1).saturating_mul(count),
                );
                let sample_info = (0..count)
                    .map(|i| SampleInfo {
                        timestamp: shifted(first, step * i),
                        interval: spec.interval_id,
                    })
                    .collect();
                let series = spec
                    .metric_ids
                    .iter()
                    .map(|id| MetricSeries {
                        id: id.clone(),
                        payload: SeriesPayload::Integer(
                            (0..count)
                                .map(|i| wave(id.counter_id, self.round.wrapping_mul(count) + i))
                                .collect(),
                        ),
                    })
                    .collect();
                SampleWindow {
                    entity: spec.entity.clone(),
                    sample_info,
                    series,
                }
            })
            .collect()
    }
}

/// `base` moved by `secs` seconds, staying at `base` past the representable range.
fn shifted(base: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    Duration::try_seconds(secs)
        .and_then(|d| base.checked_add_signed(d))
        .unwrap_or(base)
}

/// Deterministic value in 0..10000 that drifts with `t`.
fn wave(counter_id: i32, t: i64) -> i64 {
    let seed = i64::from(counter_id).wrapping_mul(7919);
    let base = 1000 + seed.rem_euclid(4000);
    let swing = (t.wrapping_mul(37) + seed).rem_euclid(500);
    base + swing
}

/// In-memory backend with scripted responses.
///
/// Property pages and sample windows are served from FIFO queues. When the
/// window queue is empty, an optional [`SampleGenerator`] answers instead;
/// otherwise queries return no windows.
#[derive(Debug, Default)]
pub struct MockService {
    pages: VecDeque<Result<RetrieveResult, RemoteFault>>,
    entities: HashMap<String, EntityHandle>,
    lookup_fault: Option<RemoteFault>,
    available: HashMap<EntityHandle, Vec<MetricId>>,
    available_fault: Option<RemoteFault>,
    windows: VecDeque<Result<Vec<SampleWindow>, RemoteFault>>,
    generator: Option<SampleGenerator>,
    calls: Vec<Call>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one property page, served to the next retrieve or continue call.
    pub fn push_page(&mut self, page: Result<RetrieveResult, RemoteFault>) {
        self.pages.push_back(page);
    }

    /// Queues the perf manager's counters, split into pages of `per_page` counters.
    pub fn with_counters(mut self, counters: Vec<CounterDescriptor>, per_page: usize) -> Self {
        let chunks: Vec<&[CounterDescriptor]> = counters.chunks(per_page.max(1)).collect();
        let total = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            let token = (i + 1 < total).then(|| format!("page-{}", i + 1));
            self.push_page(Ok(RetrieveResult {
                objects: vec![perf_counter_record(chunk.to_vec())],
                token,
            }));
        }
        self
    }

    pub fn with_entity(mut self, name: impl Into<String>, entity: EntityHandle) -> Self {
        self.entities.insert(name.into(), entity);
        self
    }

    pub fn with_lookup_fault(mut self, fault: RemoteFault) -> Self {
        self.lookup_fault = Some(fault);
        self
    }

    pub fn with_available_metrics(mut self, entity: &EntityHandle, metrics: Vec<MetricId>) -> Self {
        self.available.insert(entity.clone(), metrics);
        self
    }

    pub fn with_available_metrics_fault(mut self, fault: RemoteFault) -> Self {
        self.available_fault = Some(fault);
        self
    }

    pub fn with_generator(mut self, generator: SampleGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Queues the answer to one `query_perf` call.
    pub fn push_windows(&mut self, windows: Result<Vec<SampleWindow>, RemoteFault>) {
        self.windows.push_back(windows);
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn continuation_tokens(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::ContinueRetrieve { token } => Some(token.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn retrieve_options(&self) -> Vec<RetrieveOptions> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::RetrieveProperties { options, .. } => Some(options.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn available_metric_queries(&self) -> Vec<(EntityHandle, i32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::QueryAvailableMetrics {
                    entity,
                    interval_id,
                } => Some((entity.clone(), *interval_id)),
                _ => None,
            })
            .collect()
    }

    pub fn perf_queries(&self) -> Vec<Vec<QuerySpec>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::QueryPerf { specs } => Some(specs.clone()),
                _ => None,
            })
            .collect()
    }

    fn next_page(&mut self) -> Result<RetrieveResult, RemoteFault> {
        self.pages.pop_front().unwrap_or_else(|| Ok(RetrieveResult::default()))
    }
}

impl PerfService for MockService {
    fn retrieve_properties(
        &mut self,
        _collector: &ManagedObjectRef,
        specs: &[PropertyFilterSpec],
        options: &RetrieveOptions,
    ) -> Result<RetrieveResult, RemoteFault> {
        self.calls.push(Call::RetrieveProperties {
            specs: specs.to_vec(),
            options: options.clone(),
        });
        self.next_page()
    }

    fn continue_retrieve(
        &mut self,
        _collector: &ManagedObjectRef,
        token: &str,
    ) -> Result<RetrieveResult, RemoteFault> {
        self.calls.push(Call::ContinueRetrieve {
            token: token.to_string(),
        });
        self.next_page()
    }

    fn query_available_metrics(
        &mut self,
        _perf_manager: &ManagedObjectRef,
        entity: &EntityHandle,
        _begin: Option<DateTime<Utc>>,
        _end: Option<DateTime<Utc>>,
        interval_id: i32,
    ) -> Result<Vec<MetricId>, RemoteFault> {
        self.calls.push(Call::QueryAvailableMetrics {
            entity: entity.clone(),
            interval_id,
        });
        if let Some(fault) = &self.available_fault {
            return Err(fault.clone());
        }
        Ok(self.available.get(entity).cloned().unwrap_or_default())
    }

    fn query_perf(
        &mut self,
        _perf_manager: &ManagedObjectRef,
        specs: &[QuerySpec],
    ) -> Result<Vec<SampleWindow>, RemoteFault> {
        self.calls.push(Call::QueryPerf {
            specs: specs.to_vec(),
        });
        if let Some(scripted) = self.windows.pop_front() {
            return scripted;
        }
        Ok(match &mut self.generator {
            Some(generator) => generator.windows(specs),
            None => Vec::new(),
        })
    }

    fn find_entity(
        &mut self,
        _root: &ManagedObjectRef,
        type_name: &str,
        name: &str,
    ) -> Result<Option<EntityHandle>, RemoteFault> {
        self.calls.push(Call::FindEntity {
            type_name: type_name.to_string(),
            name: name.to_string(),
        });
        if let Some(fault) = &self.lookup_fault {
            return Err(fault.clone());
        }
        Ok(self
            .entities
            .get(name)
            .filter(|e| e.mo_ref().type_name == type_name)
            .cloned())
    }
}

/// Perf manager record carrying `counters` as its `perfCounter` property.
pub fn perf_counter_record(counters: Vec<CounterDescriptor>) -> ObjectContent {
    ObjectContent {
        obj: ManagedObjectRef::new("PerformanceManager", "PerfMgr"),
        prop_set: vec![DynamicProperty {
            name: PERF_COUNTER_PROPERTY.to_string(),
            val: PropertyValue::PerfCounterInfoList(counters),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::counter;
    use chrono::TimeZone;

    fn vm() -> EntityHandle {
        EntityHandle(ManagedObjectRef::new("VirtualMachine", "vm-1"))
    }

    #[test]
    fn counters_are_split_into_linked_pages() {
        let counters: Vec<_> = (1..=5).map(|i| counter(i, "cpu", "c", "c")).collect();
        let mut mock = MockService::new().with_counters(counters, 2);
        let root = ManagedObjectRef::new("PropertyCollector", "pc");

        let first = mock
            .retrieve_properties(&root, &[], &RetrieveOptions::default())
            .unwrap();
        assert_eq!(first.token.as_deref(), Some("page-1"));
        let second = mock.continue_retrieve(&root, "page-1").unwrap();
        assert_eq!(second.token.as_deref(), Some("page-2"));
        let last = mock.continue_retrieve(&root, "page-2").unwrap();
        assert_eq!(last.token, None);
    }

    #[test]
    fn find_entity_checks_type() {
        let mut mock = MockService::new().with_entity("web-01", vm());
        let root = ManagedObjectRef::new("Folder", "group-d1");

        assert_eq!(
            mock.find_entity(&root, "VirtualMachine", "web-01").unwrap(),
            Some(vm())
        );
        assert_eq!(mock.find_entity(&root, "HostSystem", "web-01").unwrap(), None);
        assert_eq!(mock.find_entity(&root, "VirtualMachine", "db").unwrap(), None);
    }

    #[test]
    fn generator_caps_sample_count() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut mock = MockService::new().with_generator(SampleGenerator::new(start));
        let spec = QuerySpec {
            entity: vm(),
            metric_ids: vec![MetricId::aggregate(2)],
            interval_id: 20,
            max_samples: u32::MAX,
        };
        let pm = ManagedObjectRef::new("PerformanceManager", "PerfMgr");

        let windows = mock.query_perf(&pm, &[spec]).unwrap();
        assert_eq!(windows[0].sample_info.len(), MAX_SAMPLES_LIMIT as usize);
    }

    #[test]
    fn generator_survives_end_of_time_range() {
        let start = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        let mut mock = MockService::new().with_generator(SampleGenerator::new(start));
        let spec = QuerySpec {
            entity: vm(),
            metric_ids: vec![MetricId::aggregate(2)],
            interval_id: 20,
            max_samples: MAX_SAMPLES_LIMIT,
        };
        let pm = ManagedObjectRef::new("PerformanceManager", "PerfMgr");

        for _ in 0..3 {
            let windows = mock.query_perf(&pm, std::slice::from_ref(&spec)).unwrap();
            assert_eq!(windows[0].sample_info.len(), MAX_SAMPLES_LIMIT as usize);
        }
    }

    #[test]
    fn generator_answers_every_metric() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut mock = MockService::new().with_generator(SampleGenerator::new(start));
        let spec = QuerySpec {
            entity: vm(),
            metric_ids: vec![MetricId::aggregate(2), MetricId::aggregate(6)],
            interval_id: 20,
            max_samples: 3,
        };
        let pm = ManagedObjectRef::new("PerformanceManager", "PerfMgr");

        let first = mock.query_perf(&pm, std::slice::from_ref(&spec)).unwrap();
        let second = mock.query_perf(&pm, std::slice::from_ref(&spec)).unwrap();

        assert_eq!(first[0].series.len(), 2);
        assert_eq!(first[0].sample_info.len(), 3);
        let (_, end) = first[0].time_range().unwrap();
        let (begin, _) = second[0].time_range().unwrap();
        assert!(begin > end);
    }
}
