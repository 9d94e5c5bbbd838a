//! Abstraction over the remote management service.
//!
//! The `PerfService` trait is the only way the collector talks to the backend,
//! so the engine runs unchanged against a real client or the scripted `MockService`.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::model::{
    EntityHandle, ManagedObjectRef, MetricId, PropertyFilterSpec, QuerySpec, RetrieveOptions,
    RetrieveResult, SampleWindow,
};

/// Service-side failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFault {
    /// Name of the fault detail, e.g. `InvalidProperty`, when the server sent one.
    pub detail: Option<String>,
    /// Fault string reported by the server.
    pub message: String,
}

impl RemoteFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            detail: None,
            message: message.into(),
        }
    }

    pub fn with_detail(detail: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "remote fault {}: {}", detail, self.message),
            None => write!(f, "remote fault: {}", self.message),
        }
    }
}

impl std::error::Error for RemoteFault {}

/// Remote operations consumed by the collector.
///
/// Implementations are expected to be already authenticated; session
/// negotiation and transport encoding live outside this crate.
pub trait PerfService {
    /// Starts a bulk property retrieval. Returns the first page.
    fn retrieve_properties(
        &mut self,
        collector: &ManagedObjectRef,
        specs: &[PropertyFilterSpec],
        options: &RetrieveOptions,
    ) -> Result<RetrieveResult, RemoteFault>;

    /// Fetches the page following `token`.
    fn continue_retrieve(
        &mut self,
        collector: &ManagedObjectRef,
        token: &str,
    ) -> Result<RetrieveResult, RemoteFault>;

    /// Lists the metric ids the entity currently exposes at `interval_id`.
    fn query_available_metrics(
        &mut self,
        perf_manager: &ManagedObjectRef,
        entity: &EntityHandle,
        begin: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        interval_id: i32,
    ) -> Result<Vec<MetricId>, RemoteFault>;

    /// Queries samples. Returns one window per queried entity.
    fn query_perf(
        &mut self,
        perf_manager: &ManagedObjectRef,
        specs: &[QuerySpec],
    ) -> Result<Vec<SampleWindow>, RemoteFault>;

    /// Inventory lookup of an object of `type_name` named `name` below `root`.
    ///
    /// Returns `Ok(None)` when no such object exists.
    fn find_entity(
        &mut self,
        root: &ManagedObjectRef,
        type_name: &str,
        name: &str,
    ) -> Result<Option<EntityHandle>, RemoteFault>;
}

impl<S: PerfService + ?Sized> PerfService for Box<S> {
    fn retrieve_properties(
        &mut self,
        collector: &ManagedObjectRef,
        specs: &[PropertyFilterSpec],
        options: &RetrieveOptions,
    ) -> Result<RetrieveResult, RemoteFault> {
        (**self).retrieve_properties(collector, specs, options)
    }

    fn continue_retrieve(
        &mut self,
        collector: &ManagedObjectRef,
        token: &str,
    ) -> Result<RetrieveResult, RemoteFault> {
        (**self).continue_retrieve(collector, token)
    }

    fn query_available_metrics(
        &mut self,
        perf_manager: &ManagedObjectRef,
        entity: &EntityHandle,
        begin: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        interval_id: i32,
    ) -> Result<Vec<MetricId>, RemoteFault> {
        (**self).query_available_metrics(perf_manager, entity, begin, end, interval_id)
    }

    fn query_perf(
        &mut self,
        perf_manager: &ManagedObjectRef,
        specs: &[QuerySpec],
    ) -> Result<Vec<SampleWindow>, RemoteFault> {
        (**self).query_perf(perf_manager, specs)
    }

    fn find_entity(
        &mut self,
        root: &ManagedObjectRef,
        type_name: &str,
        name: &str,
    ) -> Result<Option<EntityHandle>, RemoteFault> {
        (**self).find_entity(root, type_name, name)
    }
}

/// Well-known object references of a connected service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContent {
    pub property_collector: ManagedObjectRef,
    pub perf_manager: ManagedObjectRef,
    pub root_folder: ManagedObjectRef,
}

impl Default for ServiceContent {
    fn default() -> Self {
        Self {
            property_collector: ManagedObjectRef::new("PropertyCollector", "propertyCollector"),
            perf_manager: ManagedObjectRef::new("PerformanceManager", "PerfMgr"),
            root_folder: ManagedObjectRef::new("Folder", "group-d1"),
        }
    }
}

/// Connected service plus its object references.
///
/// Passed explicitly to every collector step instead of living in shared fields.
pub struct Session<S: PerfService> {
    pub service: S,
    pub content: ServiceContent,
}

impl<S: PerfService> Session<S> {
    pub fn new(service: S, content: ServiceContent) -> Self {
        Self { service, content }
    }

    /// Session using the default object references.
    pub fn with_defaults(service: S) -> Self {
        Self::new(service, ServiceContent::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_fault_display_includes_detail() {
        let fault = RemoteFault::with_detail("InvalidProperty", "perfCounter");
        assert_eq!(fault.to_string(), "remote fault InvalidProperty: perfCounter");
        assert_eq!(
            RemoteFault::new("timeout").to_string(),
            "remote fault: timeout"
        );
    }
}
