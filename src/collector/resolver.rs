//! Maps selected counters to the metric ids an entity actually exposes.

use std::collections::BTreeSet;

use tracing::debug;

use super::traits::{PerfService, RemoteFault, Session};
use crate::model::{EntityHandle, MetricId};

/// Resolves the queryable metric ids of `entity` for the selected counters.
///
/// Asks the service for every available metric at `interval_id`, without a
/// time window, and keeps those whose counter was selected, in service order.
pub fn resolve<S: PerfService>(
    session: &mut Session<S>,
    entity: &EntityHandle,
    selected: &BTreeSet<i32>,
    interval_id: i32,
) -> Result<Vec<MetricId>, RemoteFault> {
    let available = session.service.query_available_metrics(
        &session.content.perf_manager,
        entity,
        None,
        None,
        interval_id,
    )?;
    let total = available.len();

    let metrics: Vec<MetricId> = available
        .into_iter()
        .filter(|m| selected.contains(&m.counter_id))
        .collect();

    debug!(
        entity = %entity,
        available = total,
        resolved = metrics.len(),
        "metric ids resolved"
    );
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockService;
    use crate::model::ManagedObjectRef;

    fn vm() -> EntityHandle {
        EntityHandle(ManagedObjectRef::new("VirtualMachine", "vm-7"))
    }

    #[test]
    fn keeps_only_selected_counters_in_service_order() {
        let available = vec![
            MetricId::aggregate(1),
            MetricId::new(2, "0"),
            MetricId::aggregate(4),
            MetricId::new(2, "1"),
            MetricId::aggregate(2),
        ];
        let service = MockService::new().with_available_metrics(&vm(), available);
        let mut session = Session::with_defaults(service);

        let metrics = resolve(&mut session, &vm(), &BTreeSet::from([2]), 20).unwrap();

        assert_eq!(
            metrics,
            vec![
                MetricId::new(2, "0"),
                MetricId::new(2, "1"),
                MetricId::aggregate(2)
            ]
        );
        assert_eq!(session.service.available_metric_queries(), vec![(vm(), 20)]);
    }

    #[test]
    fn no_available_metrics_is_empty_not_error() {
        let mut session = Session::with_defaults(MockService::new());

        let metrics = resolve(&mut session, &vm(), &BTreeSet::from([2]), 20).unwrap();
        assert!(metrics.is_empty());
    }

    #[test]
    fn service_fault_propagates() {
        let service = MockService::new().with_available_metrics_fault(RemoteFault::new("gone"));
        let mut session = Session::with_defaults(service);

        let err = resolve(&mut session, &vm(), &BTreeSet::from([2]), 20).unwrap_err();
        assert_eq!(err.message, "gone");
    }
}
