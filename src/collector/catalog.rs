//! Index of the performance counters known to the perf manager.

use std::collections::HashMap;

use tracing::{debug, info};

use super::fetcher::{PropertyFetcher, ProtocolError};
use super::traits::{PerfService, Session};
use crate::model::{CounterDescriptor, ObjectContent, PropertyFilterSpec, PropertyValue};

/// Property of the perf manager holding the counter definitions.
pub const PERF_COUNTER_PROPERTY: &str = "perfCounter";

/// Counter descriptors indexed by id, iterated in the order the server returned them.
///
/// An empty catalog is a valid result of a fetch that returned nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterCatalog {
    counters: Vec<CounterDescriptor>,
    by_id: HashMap<i32, usize>,
}

impl CounterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches `perfCounter` from the session's perf manager and indexes it.
    ///
    /// Remote faults are already absorbed by the fetcher and leave the
    /// catalog empty; only protocol violations fail the build.
    pub fn build<S: PerfService>(
        fetcher: &PropertyFetcher,
        session: &mut Session<S>,
    ) -> Result<Self, ProtocolError> {
        let spec =
            PropertyFilterSpec::for_object(&session.content.perf_manager, &[PERF_COUNTER_PROPERTY]);
        let records = fetcher.fetch_all(session, &[spec])?;
        let catalog = Self::from_records(&records);

        if catalog.is_empty() {
            info!("no performance counters retrieved");
        } else {
            info!(counters = catalog.len(), "performance counter catalog built");
        }
        Ok(catalog)
    }

    /// Flattens every counter list found in `records`.
    pub fn from_records(records: &[ObjectContent]) -> Self {
        let mut catalog = Self::new();
        for record in records {
            for prop in &record.prop_set {
                match &prop.val {
                    PropertyValue::PerfCounterInfoList(list) => {
                        for counter in list {
                            catalog.insert(counter.clone());
                        }
                    }
                    other => {
                        debug!(
                            object = %record.obj,
                            property = %prop.name,
                            value = ?other,
                            "skipping non-counter property"
                        );
                    }
                }
            }
        }
        catalog
    }

    /// Inserts a descriptor. A repeated id replaces the earlier entry in place.
    pub fn insert(&mut self, counter: CounterDescriptor) {
        match self.by_id.get(&counter.id) {
            Some(&pos) => self.counters[pos] = counter,
            None => {
                self.by_id.insert(counter.id, self.counters.len());
                self.counters.push(counter);
            }
        }
    }

    pub fn get(&self, id: i32) -> Option<&CounterDescriptor> {
        self.by_id.get(&id).map(|&pos| &self.counters[pos])
    }

    pub fn contains(&self, id: i32) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CounterDescriptor> {
        self.counters.iter()
    }

    /// Counters whose group key equals `group_key`, ignoring case, in catalog order.
    pub fn filter_by_group(&self, group_key: &str) -> Vec<CounterDescriptor> {
        self.counters
            .iter()
            .filter(|c| c.group_key.eq_ignore_ascii_case(group_key))
            .cloned()
            .collect()
    }

    /// Distinct group keys in first-seen order.
    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for counter in &self.counters {
            if !groups
                .iter()
                .any(|g| g.eq_ignore_ascii_case(&counter.group_key))
            {
                groups.push(&counter.group_key);
            }
        }
        groups
    }
}
