//! Data model shared by the collector and the console.
//!
//! - `counter` - performance counter metadata
//! - `property` - property collector requests, responses and object references
//! - `sample` - metric ids, query specs and sample windows

pub mod counter;
pub mod property;
pub mod sample;

pub use counter::{CounterDescriptor, RollupType};
pub use property::{
    DynamicProperty, EntityHandle, ManagedObjectRef, ObjectContent, ObjectSpec,
    PropertyFilterSpec, PropertySpec, PropertyValue, RetrieveOptions, RetrieveResult,
};
pub use sample::{MetricId, MetricSeries, QuerySpec, SampleInfo, SampleWindow, SeriesPayload};
