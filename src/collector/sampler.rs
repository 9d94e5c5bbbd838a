//! Polling loop that queries, decodes and renders samples.
//!
//! One iteration is query → render → sleep, all on the calling thread. The
//! loop has no natural end. It stops on cancellation or the optional
//! iteration limit, and fails once a query fault outlasts the retry policy.

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::catalog::CounterCatalog;
use super::traits::{PerfService, RemoteFault, Session};
use crate::config::{
    DEFAULT_MAX_SAMPLES, DEFAULT_PERIOD, MonitorConfig, REALTIME_INTERVAL_ID, RetryPolicy,
};
use crate::console::render_windows;
use crate::model::{EntityHandle, MetricId, QuerySpec, SampleWindow};
use crate::util::{Backoff, Shutdown};

/// How a sampling run ended without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerExit {
    /// Shutdown was requested after `iterations` completed iterations.
    Cancelled { iterations: u64 },
    /// The iteration limit was reached.
    Completed(u64),
}

#[derive(Debug)]
pub enum SampleError {
    /// The query kept failing after all retries.
    Remote { fault: RemoteFault, attempts: u32 },
    Io(io::Error),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Remote { fault, attempts } => {
                write!(f, "sample query failed after {} attempts: {}", attempts, fault)
            }
            SampleError::Io(e) => write!(f, "failed to write samples: {}", e),
        }
    }
}

impl std::error::Error for SampleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SampleError::Remote { fault, .. } => Some(fault),
            SampleError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for SampleError {
    fn from(e: io::Error) -> Self {
        SampleError::Io(e)
    }
}

pub struct Sampler<'a> {
    catalog: &'a CounterCatalog,
    shutdown: Shutdown,
    interval_id: i32,
    max_samples: u32,
    period: Duration,
    iterations: Option<u64>,
    retry: RetryPolicy,
}

impl<'a> Sampler<'a> {
    pub fn new(catalog: &'a CounterCatalog, shutdown: Shutdown) -> Self {
        Self {
            catalog,
            shutdown,
            interval_id: REALTIME_INTERVAL_ID,
            max_samples: DEFAULT_MAX_SAMPLES,
            period: DEFAULT_PERIOD,
            iterations: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(
        catalog: &'a CounterCatalog,
        config: &MonitorConfig,
        shutdown: Shutdown,
    ) -> Self {
        Self::new(catalog, shutdown)
            .with_interval_id(config.interval_id)
            .with_max_samples(config.max_samples)
            .with_period(config.period)
            .with_iterations(config.iterations)
            .with_retry(config.retry.clone())
    }

    pub fn with_interval_id(mut self, interval_id: i32) -> Self {
        self.interval_id = interval_id;
        self
    }

    pub fn with_max_samples(mut self, max_samples: u32) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_iterations(mut self, iterations: Option<u64>) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Query for the latest `max_samples` samples of `metric_ids`.
    pub fn query_spec(&self, entity: &EntityHandle, metric_ids: Vec<MetricId>) -> QuerySpec {
        QuerySpec {
            entity: entity.clone(),
            metric_ids,
            interval_id: self.interval_id,
            max_samples: self.max_samples,
        }
    }

    /// Polls `entity` until cancelled, the iteration limit is hit, or a fault
    /// outlasts the retry policy.
    pub fn run<S: PerfService>(
        &self,
        session: &mut Session<S>,
        entity: &EntityHandle,
        metric_ids: Vec<MetricId>,
        out: &mut impl Write,
    ) -> Result<SamplerExit, SampleError> {
        if metric_ids.is_empty() {
            warn!(entity = %entity, "no metrics to sample, windows will be empty");
        }
        self.shutdown.begin_graceful();
        let specs = [self.query_spec(entity, metric_ids)];
        let mut backoff = Backoff::new(self.retry.initial_backoff, self.retry.max_backoff);
        let mut completed: u64 = 0;

        info!(
            entity = %entity,
            metrics = specs[0].metric_ids.len(),
            interval_id = self.interval_id,
            max_samples = self.max_samples,
            period = ?self.period,
            "starting sampling loop"
        );

        loop {
            if self.shutdown.is_requested() {
                return Ok(SamplerExit::Cancelled {
                    iterations: completed,
                });
            }

            let Some(windows) = self.query(session, &specs, &mut backoff)? else {
                return Ok(SamplerExit::Cancelled {
                    iterations: completed,
                });
            };
            debug!(windows = windows.len(), "samples received");
            render_windows(out, &windows, self.catalog)?;

            completed += 1;
            if let Some(limit) = self.iterations
                && completed >= limit
            {
                return Ok(SamplerExit::Completed(completed));
            }

            writeln!(out, "Sleeping {} seconds...", whole_seconds(self.period))?;
            out.flush()?;
            if !self.shutdown.sleep(self.period) {
                return Ok(SamplerExit::Cancelled {
                    iterations: completed,
                });
            }
        }
    }

    /// Issues the query, retrying faults with backoff.
    ///
    /// Returns `Ok(None)` if shutdown was requested while backing off.
    fn query<S: PerfService>(
        &self,
        session: &mut Session<S>,
        specs: &[QuerySpec],
        backoff: &mut Backoff,
    ) -> Result<Option<Vec<SampleWindow>>, SampleError> {
        let mut failures: u32 = 0;
        loop {
            match session
                .service
                .query_perf(&session.content.perf_manager, specs)
            {
                Ok(windows) => {
                    if failures > 0 {
                        info!(failures, "sample query recovered");
                    }
                    backoff.reset();
                    return Ok(Some(windows));
                }
                Err(fault) => {
                    failures += 1;
                    if failures > self.retry.max_retries {
                        error!(error = %fault, attempts = failures, "sample query failed");
                        return Err(SampleError::Remote {
                            fault,
                            attempts: failures,
                        });
                    }
                    let delay = backoff.next_delay();
                    warn!(
                        error = %fault,
                        attempt = failures,
                        retry_in = ?delay,
                        "sample query failed, retrying"
                    );
                    if !self.shutdown.sleep(delay) {
                        return Ok(None);
                    }
                }
            }
        }
    }
}

/// Seconds in `period`, rounding a partial second up.
fn whole_seconds(period: Duration) -> u64 {
    period.as_secs() + u64::from(period.subsec_nanos() > 0)
}
