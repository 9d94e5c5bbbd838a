//! Scripted backend used by tests and the demo mode of the binary.

mod scenarios;
mod service;

pub use scenarios::{Scenario, ScenarioEntity, ScenarioError, counter, integer_window};
pub use service::{Call, MockService, SampleGenerator, perf_counter_record};
