//! Utility modules for perfwatch.

mod backoff;
mod shutdown;

pub use backoff::Backoff;
pub use shutdown::Shutdown;
