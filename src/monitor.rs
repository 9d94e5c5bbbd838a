//! End-to-end real-time monitoring of one virtual machine.
//!
//! Looks the machine up, builds the counter catalog, lets the user choose a
//! counter from the configured group, resolves it to concrete metric ids and
//! hands them to the sampler.

use std::fmt;
use std::io::{self, BufRead, Write};

use tracing::{error, info};

use crate::collector::{
    CounterCatalog, PerfService, PropertyFetcher, ProtocolError, RemoteFault, SampleError,
    Sampler, SamplerExit, Session, resolve,
};
use crate::config::MonitorConfig;
use crate::console::{CounterSelector, SelectError, Selection};
use crate::util::Shutdown;

/// Inventory type of monitored entities.
pub const VIRTUAL_MACHINE_TYPE: &str = "VirtualMachine";

/// How a run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The named virtual machine does not exist.
    EntityNotFound,
    /// The configured group has no counters.
    NoCounters,
    /// The user ended the run at the selection prompt.
    Aborted,
    Finished(SamplerExit),
}

#[derive(Debug)]
pub enum MonitorError {
    /// Entity lookup failed.
    Remote(RemoteFault),
    Protocol(ProtocolError),
    Select(SelectError),
    Sample(SampleError),
    Io(io::Error),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Remote(e) => write!(f, "entity lookup failed: {}", e),
            MonitorError::Protocol(e) => write!(f, "counter retrieval failed: {}", e),
            MonitorError::Select(e) => write!(f, "counter selection failed: {}", e),
            MonitorError::Sample(e) => write!(f, "{}", e),
            MonitorError::Io(e) => write!(f, "console I/O error: {}", e),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Remote(e) => Some(e),
            MonitorError::Protocol(e) => Some(e),
            MonitorError::Select(e) => Some(e),
            MonitorError::Sample(e) => Some(e),
            MonitorError::Io(e) => Some(e),
        }
    }
}

impl From<RemoteFault> for MonitorError {
    fn from(e: RemoteFault) -> Self {
        MonitorError::Remote(e)
    }
}

impl From<ProtocolError> for MonitorError {
    fn from(e: ProtocolError) -> Self {
        MonitorError::Protocol(e)
    }
}

impl From<SelectError> for MonitorError {
    fn from(e: SelectError) -> Self {
        MonitorError::Select(e)
    }
}

impl From<SampleError> for MonitorError {
    fn from(e: SampleError) -> Self {
        MonitorError::Sample(e)
    }
}

impl From<io::Error> for MonitorError {
    fn from(e: io::Error) -> Self {
        MonitorError::Io(e)
    }
}

pub struct Monitor {
    config: MonitorConfig,
    shutdown: Shutdown,
}

impl Monitor {
    pub fn new(config: MonitorConfig, shutdown: Shutdown) -> Self {
        Self { config, shutdown }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn fetcher(&self) -> PropertyFetcher {
        PropertyFetcher::new()
            .with_page_size(self.config.page_size)
            .with_max_continuations(self.config.max_continuations)
    }

    fn cancelled(&self) -> bool {
        let requested = self.shutdown.is_requested();
        if requested {
            info!("shutdown requested before sampling");
        }
        requested
    }

    /// Runs the whole workflow, reading selections from `input`.
    ///
    /// Setup faults while building the catalog or resolving metrics are
    /// logged and leave the respective set empty; a fault of the entity
    /// lookup or of steady-state sampling ends the run with an error. A
    /// shutdown requested before sampling starts ends the run as aborted.
    pub fn run<S: PerfService>(
        &self,
        session: &mut Session<S>,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<RunOutcome, MonitorError> {
        let name = &self.config.vm_name;
        let root = session.content.root_folder.clone();
        let Some(entity) = session
            .service
            .find_entity(&root, VIRTUAL_MACHINE_TYPE, name)?
        else {
            info!(vm = %name, "virtual machine not found");
            writeln!(output, "Virtual Machine {} not found", name)?;
            return Ok(RunOutcome::EntityNotFound);
        };
        info!(vm = %name, entity = %entity, "monitoring virtual machine");

        let catalog = CounterCatalog::build(&self.fetcher(), session)?;
        let candidates = catalog.filter_by_group(&self.config.group);
        if candidates.is_empty() {
            info!(group = %self.config.group, "no counters in group");
            writeln!(output, "No counters found in group {}", self.config.group)?;
            return Ok(RunOutcome::NoCounters);
        }

        if self.cancelled() {
            return Ok(RunOutcome::Aborted);
        }
        let selection = CounterSelector::new(&candidates)
            .with_invalid_input(self.config.invalid_input)
            .run(input, output)?;
        let selected = match selection {
            Selection::Selected(ids) => ids,
            Selection::Aborted => {
                info!("selection aborted");
                return Ok(RunOutcome::Aborted);
            }
        };
        if self.cancelled() {
            return Ok(RunOutcome::Aborted);
        }
        for counter in selected.iter().filter_map(|id| catalog.get(*id)) {
            info!(id = counter.id, counter = %counter.full_name(), "counter selected");
        }

        let metrics = match resolve(session, &entity, &selected, self.config.interval_id) {
            Ok(metrics) => metrics,
            Err(fault) => {
                error!(error = %fault, "failed to query available metrics");
                Vec::new()
            }
        };
        debug_assert!(metrics.iter().all(|m| catalog.contains(m.counter_id)));

        let exit = Sampler::from_config(&catalog, &self.config, self.shutdown.clone())
            .run(session, &entity, metrics, output)?;
        Ok(RunOutcome::Finished(exit))
    }

    /// Prints the counter groups known to the perf manager, one per line.
    pub fn list_groups<S: PerfService>(
        &self,
        session: &mut Session<S>,
        output: &mut impl Write,
    ) -> Result<usize, MonitorError> {
        let catalog = CounterCatalog::build(&self.fetcher(), session)?;
        let groups = catalog.groups();
        for group in &groups {
            let count = catalog.filter_by_group(group).len();
            writeln!(output, "{} ({} counters)", group, count)?;
        }
        output.flush()?;
        Ok(groups.len())
    }
}
