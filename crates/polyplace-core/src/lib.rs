//! polyplace-core — shared types, canonical resource model, and config.
//!
//! Everything the provider contract, the placement scorer, and the
//! scheduler need to agree on lives here so those crates do not depend
//! on each other more than necessary.

pub mod config;
pub mod resources;
pub mod types;

pub use config::{
    ConfigError, PolyplaceConfig, ProviderConfig, SchedulerConfig, SchedulingPolicy, Strategy,
};
pub use resources::{
    GpuRequirement, ResourceRequirement, ResourceSpec, canonical_cpu, canonical_gpu,
    canonical_memory,
};
pub use types::*;
