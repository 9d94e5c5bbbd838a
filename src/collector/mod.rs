//! Performance metric collection from a remote management service.
//!
//! # Architecture
//!
//! ```text
//! Monitor
//!   ├── CounterCatalog ──── PropertyFetcher ──┐
//!   ├── CounterSelector (console)             │
//!   ├── resolve ──────────────────────────────┤
//!   └── Sampler ──────────────────────────────┤
//!                                             ▼
//!                                   PerfService (trait)
//!                                     ├── real client (external)
//!                                     └── MockService (scenarios)
//! ```
//!
//! # Usage
//!
//! ```
//! use perfwatch::collector::mock::MockService;
//! use perfwatch::collector::{CounterCatalog, PropertyFetcher, Session};
//!
//! let mut session = Session::with_defaults(MockService::typical_host());
//! let catalog = CounterCatalog::build(&PropertyFetcher::new(), &mut session).unwrap();
//! assert!(!catalog.filter_by_group("cpu").is_empty());
//! ```

pub mod catalog;
pub mod fetcher;
pub mod mock;
pub mod resolver;
pub mod sampler;
pub mod traits;

pub use catalog::CounterCatalog;
pub use fetcher::{FetchError, PropertyFetcher, ProtocolError};
pub use resolver::resolve;
pub use sampler::{SampleError, Sampler, SamplerExit};
pub use traits::{PerfService, RemoteFault, ServiceContent, Session};
