//! The provider capability contract.
//!
//! Every backend (Kubernetes cluster, GPU marketplace, serverless machine
//! platform) is driven through [`Provider`]. The scheduler only ever sees
//! `Arc<dyn Provider>` and never branches on the concrete backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use polyplace_core::{PlacementDecision, WorkloadSpec};

use crate::error::ProviderResult;

// ── Capacity ───────────────────────────────────────────────────────

/// A scalar capacity pool (cores or GB).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CapacityPool {
    pub total: f64,
    pub available: f64,
}

impl CapacityPool {
    pub fn new(total: f64, available: f64) -> Self {
        Self { total, available }
    }

    /// Whether the provider reported this pool at all. Marketplaces that
    /// do not expose capacity report a zero total.
    pub fn is_reported(&self) -> bool {
        self.total > 0.0
    }

    /// Whether `amount` fits. Unreported pools always fit.
    pub fn fits(&self, amount: f64) -> bool {
        !self.is_reported() || self.available >= amount
    }
}

/// Inventory of one GPU model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GpuPool {
    pub total: u32,
    pub available: u32,
    /// Memory per device in GB.
    pub memory_gb: f64,
    /// Price per device-hour quoted with the inventory.
    pub price_per_hour: f64,
}

/// A region a provider can place into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionInfo {
    pub name: String,
    pub available: bool,
}

impl RegionInfo {
    pub fn new(name: impl Into<String>, available: bool) -> Self {
        Self {
            name: name.into(),
            available,
        }
    }
}

/// Capacity snapshot. Queried fresh on every sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AvailableResources {
    pub cpu: CapacityPool,
    pub memory: CapacityPool,
    /// GPU model name → inventory.
    pub gpus: BTreeMap<String, GpuPool>,
    pub regions: Vec<RegionInfo>,
}

impl AvailableResources {
    /// Whether `name` is listed and marked available.
    pub fn region_available(&self, name: &str) -> bool {
        self.regions.iter().any(|r| r.available && r.name == name)
    }

    /// First region marked available, in reported order.
    pub fn first_available_region(&self) -> Option<&str> {
        self.regions
            .iter()
            .find(|r| r.available)
            .map(|r| r.name.as_str())
    }

    /// Devices available across every GPU model.
    pub fn total_gpus_available(&self) -> u32 {
        self.gpus.values().map(|g| g.available).sum()
    }
}

// ── Pricing ────────────────────────────────────────────────────────

/// Unit prices quoted by a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingInfo {
    pub currency: String,
    pub cpu_per_core_hour: f64,
    pub memory_per_gb_hour: f64,
    /// GPU model name → price per device-hour.
    pub gpu_per_hour: BTreeMap<String, f64>,
    pub storage_per_gb_month: f64,
    pub network_per_gb: f64,
}

impl Default for PricingInfo {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            cpu_per_core_hour: 0.0,
            memory_per_gb_hour: 0.0,
            gpu_per_hour: BTreeMap::new(),
            storage_per_gb_month: 0.0,
            network_per_gb: 0.0,
        }
    }
}

// ── Status ─────────────────────────────────────────────────────────

/// Rich health payload. Not used by scoring yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderStatus {
    pub name: String,
    pub healthy: bool,
    /// 0.0..=1.0 fraction of capacity in use.
    pub load: f64,
    pub latency_ms: u64,
    /// 0.0..=1.0
    pub success_rate: f64,
    pub active_workloads: usize,
    /// Unix timestamp (seconds) of this status.
    pub last_check: u64,
    #[serde(default)]
    pub message: Option<String>,
}

// ── Workloads ──────────────────────────────────────────────────────

/// Lifecycle state of a workload on a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    Pending,
    Running,
    Stopped,
    Failed,
}

/// A workload as the provider knows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderWorkload {
    pub id: String,
    pub name: String,
    pub provider: String,
    /// The backend's own identifier (pod name, machine id, ...).
    pub native_id: String,
    pub region: String,
    pub machine_type: String,
    pub status: WorkloadStatus,
    pub created_at: u64,
    pub updated_at: u64,
}

// ── Contract ───────────────────────────────────────────────────────

/// Operations every backend adapter implements.
///
/// All methods must be safe to call concurrently from independent
/// scheduling requests. Dropping a returned future cancels the call, so
/// adapters must not rely on running to completion.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, used as the registry key and in stats.
    fn name(&self) -> &str;

    /// Factory tag this provider was built from.
    fn provider_type(&self) -> &str;

    /// Cheap liveness probe. An error excludes the provider from the
    /// current sweep only.
    async fn health_check(&self) -> ProviderResult<()>;

    async fn get_available_resources(&self) -> ProviderResult<AvailableResources>;

    async fn get_pricing(&self) -> ProviderResult<PricingInfo>;

    async fn create_workload(
        &self,
        spec: &WorkloadSpec,
        placement: &PlacementDecision,
    ) -> ProviderResult<ProviderWorkload>;

    async fn get_workload(&self, id: &str) -> ProviderResult<ProviderWorkload>;

    async fn update_workload(&self, id: &str, spec: &WorkloadSpec)
    -> ProviderResult<ProviderWorkload>;

    async fn delete_workload(&self, id: &str) -> ProviderResult<()>;

    async fn list_workloads(&self) -> ProviderResult<Vec<ProviderWorkload>>;

    async fn get_status(&self) -> ProviderStatus;
}
