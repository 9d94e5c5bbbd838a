//! Bulk property retrieval over the continuation-token protocol.

use std::fmt;

use tracing::{debug, error, warn};

use super::traits::{PerfService, RemoteFault, Session};
use crate::model::{ObjectContent, PropertyFilterSpec, RetrieveOptions};

/// Default cap on continuation calls per retrieval.
pub const DEFAULT_MAX_CONTINUATIONS: usize = 1000;

/// The server violated the pagination protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A continuation returned the token it was called with.
    CursorStalled { token: String, page: usize },
    /// More continuation pages than the configured cap.
    TooManyPages { limit: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::CursorStalled { token, page } => write!(
                f,
                "continuation token '{}' did not advance at page {}",
                token, page
            ),
            ProtocolError::TooManyPages { limit } => {
                write!(f, "retrieval exceeded {} continuation pages", limit)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Error from a strict retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Remote(RemoteFault),
    Protocol(ProtocolError),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Remote(e) => write!(f, "property retrieval failed: {}", e),
            FetchError::Protocol(e) => write!(f, "property retrieval protocol error: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<RemoteFault> for FetchError {
    fn from(e: RemoteFault) -> Self {
        FetchError::Remote(e)
    }
}

impl From<ProtocolError> for FetchError {
    fn from(e: ProtocolError) -> Self {
        FetchError::Protocol(e)
    }
}

/// Drives `retrieve_properties` / `continue_retrieve` until the token runs out.
#[derive(Debug, Clone)]
pub struct PropertyFetcher {
    options: RetrieveOptions,
    max_continuations: usize,
}

impl Default for PropertyFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyFetcher {
    pub fn new() -> Self {
        Self {
            options: RetrieveOptions::default(),
            max_continuations: DEFAULT_MAX_CONTINUATIONS,
        }
    }

    /// Sets the page size hint sent with the initial call.
    pub fn with_page_size(mut self, max_objects: Option<u32>) -> Self {
        self.options.max_objects = max_objects;
        self
    }

    pub fn with_max_continuations(mut self, limit: usize) -> Self {
        self.max_continuations = limit;
        self
    }

    /// Retrieves every page, failing open on remote faults.
    ///
    /// A fault on the initial call is logged and yields no records; a fault on
    /// a later page is logged and yields the records gathered so far. Only
    /// protocol violations are returned as errors.
    pub fn fetch_all<S: PerfService>(
        &self,
        session: &mut Session<S>,
        specs: &[PropertyFilterSpec],
    ) -> Result<Vec<ObjectContent>, ProtocolError> {
        let mut records = Vec::new();
        match self.fetch_into(session, specs, &mut records) {
            Ok(()) => Ok(records),
            Err(FetchError::Protocol(e)) => Err(e),
            Err(FetchError::Remote(fault)) => {
                if records.is_empty() {
                    error!(error = %fault, "failed getting contents");
                } else {
                    warn!(
                        error = %fault,
                        records = records.len(),
                        "continuation failed, keeping partial contents"
                    );
                }
                Ok(records)
            }
        }
    }

    /// Retrieves every page, propagating any fault.
    pub fn try_fetch_all<S: PerfService>(
        &self,
        session: &mut Session<S>,
        specs: &[PropertyFilterSpec],
    ) -> Result<Vec<ObjectContent>, FetchError> {
        let mut records = Vec::new();
        self.fetch_into(session, specs, &mut records)?;
        Ok(records)
    }

    fn fetch_into<S: PerfService>(
        &self,
        session: &mut Session<S>,
        specs: &[PropertyFilterSpec],
        records: &mut Vec<ObjectContent>,
    ) -> Result<(), FetchError> {
        let collector = &session.content.property_collector;

        let page = session
            .service
            .retrieve_properties(collector, specs, &self.options)?;
        let mut token = page.continuation().map(str::to_owned);
        records.extend(page.objects);
        debug!(records = records.len(), more = token.is_some(), "initial page");

        let mut continuations = 0;
        while let Some(current) = token.take() {
            if continuations >= self.max_continuations {
                return Err(ProtocolError::TooManyPages {
                    limit: self.max_continuations,
                }
                .into());
            }
            continuations += 1;

            let page = session.service.continue_retrieve(collector, &current)?;
            let next = page.continuation();
            if next == Some(current.as_str()) {
                return Err(ProtocolError::CursorStalled {
                    token: current,
                    page: continuations,
                }
                .into());
            }
            token = next.map(str::to_owned);
            records.extend(page.objects);
            debug!(
                page = continuations,
                records = records.len(),
                more = token.is_some(),
                "continuation page"
            );
        }

        Ok(())
    }
}
