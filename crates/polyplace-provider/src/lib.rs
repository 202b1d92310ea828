//! polyplace-provider — the provider capability contract and registry.
//!
//! # Components
//!
//! - **`provider`** — the [`Provider`] trait and the capacity, pricing,
//!   status, and workload shapes it returns
//! - **`registry`** — name → provider map, type-tag factories, batch
//!   registration from config
//! - **`static_provider`** — config-declared in-memory adapter

pub mod error;
pub mod provider;
pub mod registry;
pub mod static_provider;

pub use error::{ProviderError, ProviderResult};
pub use provider::{
    AvailableResources, CapacityPool, GpuPool, PricingInfo, Provider, ProviderStatus,
    ProviderWorkload, RegionInfo, WorkloadStatus,
};
pub use registry::{ProviderFactory, ProviderRegistry, RegistrationReport};
pub use static_provider::{STATIC_PROVIDER_TYPE, StaticProvider, gpu_inventory};
