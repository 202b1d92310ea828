//! `static` provider — capacity and prices declared in config.
//!
//! Useful for dry runs, tests, and fixed on-prem pools whose inventory
//! does not change. Workloads are tracked in memory and their CPU and
//! memory are subtracted from the advertised capacity. GPU inventory is
//! reported as declared.
//!
//! Config keys (all values are strings):
//!
//! | key | meaning | default |
//! |---|---|---|
//! | `regions` | comma-separated region names | required |
//! | `unavailable_regions` | regions listed but not accepting work | none |
//! | `cpu_cores` | total cores | `0` (unreported) |
//! | `memory_gb` | total GB | `0` (unreported) |
//! | `price_per_core_hour` | | `0` |
//! | `price_per_gb_hour` | | `0` |
//! | `price_storage_gb_month` | | `0` |
//! | `price_network_gb` | | `0` |
//! | `currency` | | `USD` |
//! | `gpus` | `type:count:memory_gb:price_per_hour`, comma-separated | none |
//! | `healthy` | `true`/`false` | `true` |
//! | `latency_ms` | reported in status | `0` |

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use polyplace_core::{PlacementDecision, ResourceRequirement, WorkloadSpec};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{
    AvailableResources, CapacityPool, GpuPool, PricingInfo, Provider, ProviderStatus,
    ProviderWorkload, RegionInfo, WorkloadStatus,
};

/// Factory tag for [`StaticProvider`].
pub const STATIC_PROVIDER_TYPE: &str = "static";

/// A workload held by the static provider, with its canonical ask.
#[derive(Debug, Clone)]
struct Allocation {
    workload: ProviderWorkload,
    requirement: ResourceRequirement,
}

/// In-memory provider with declared capacity and prices.
pub struct StaticProvider {
    name: String,
    declared: AvailableResources,
    pricing: PricingInfo,
    healthy: AtomicBool,
    latency_ms: u64,
    workloads: RwLock<HashMap<String, Allocation>>,
}

impl StaticProvider {
    /// A healthy provider with no regions, capacity, or prices.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared: AvailableResources::default(),
            pricing: PricingInfo::default(),
            healthy: AtomicBool::new(true),
            latency_ms: 0,
            workloads: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_region(mut self, name: impl Into<String>) -> Self {
        self.declared.regions.push(RegionInfo::new(name, true));
        self
    }

    pub fn with_unavailable_region(mut self, name: impl Into<String>) -> Self {
        self.declared.regions.push(RegionInfo::new(name, false));
        self
    }

    pub fn with_capacity(mut self, cpu_cores: f64, memory_gb: f64) -> Self {
        self.declared.cpu = CapacityPool::new(cpu_cores, cpu_cores);
        self.declared.memory = CapacityPool::new(memory_gb, memory_gb);
        self
    }

    pub fn with_pricing(mut self, per_core_hour: f64, per_gb_hour: f64) -> Self {
        self.pricing.cpu_per_core_hour = per_core_hour;
        self.pricing.memory_per_gb_hour = per_gb_hour;
        self
    }

    /// Add a GPU model. The price is quoted both in inventory and pricing.
    pub fn with_gpu(
        mut self,
        gpu_type: impl Into<String>,
        count: u32,
        memory_gb: f64,
        price_per_hour: f64,
    ) -> Self {
        let gpu_type = gpu_type.into();
        self.declared.gpus.insert(
            gpu_type.clone(),
            GpuPool {
                total: count,
                available: count,
                memory_gb,
                price_per_hour,
            },
        );
        self.pricing.gpu_per_hour.insert(gpu_type, price_per_hour);
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Flip health at runtime.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Build from a provider config map. See the module docs for keys.
    pub fn from_config(name: &str, config: &HashMap<String, String>) -> ProviderResult<Self> {
        let regions = config
            .get("regions")
            .map(|s| split_list(s))
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ProviderError::invalid_config(name, "missing required key `regions`"))?;

        let mut provider = StaticProvider::new(name);
        for region in regions {
            provider = provider.with_region(region);
        }
        if let Some(raw) = config.get("unavailable_regions") {
            for region in split_list(raw) {
                provider = provider.with_unavailable_region(region);
            }
        }

        let cpu = parse_number(name, config, "cpu_cores")?.unwrap_or(0.0);
        let memory = parse_number(name, config, "memory_gb")?.unwrap_or(0.0);
        provider = provider.with_capacity(cpu, memory);

        provider.pricing.cpu_per_core_hour =
            parse_number(name, config, "price_per_core_hour")?.unwrap_or(0.0);
        provider.pricing.memory_per_gb_hour =
            parse_number(name, config, "price_per_gb_hour")?.unwrap_or(0.0);
        provider.pricing.storage_per_gb_month =
            parse_number(name, config, "price_storage_gb_month")?.unwrap_or(0.0);
        provider.pricing.network_per_gb =
            parse_number(name, config, "price_network_gb")?.unwrap_or(0.0);
        if let Some(currency) = config.get("currency") {
            provider.pricing.currency = currency.trim().to_string();
        }

        if let Some(raw) = config.get("gpus") {
            for entry in split_list(raw) {
                let (gpu_type, count, memory_gb, price) = parse_gpu_entry(name, &entry)?;
                provider = provider.with_gpu(gpu_type, count, memory_gb, price);
            }
        }

        if let Some(raw) = config.get("healthy") {
            let healthy = raw.trim().parse::<bool>().map_err(|_| {
                ProviderError::invalid_config(name, format!("`healthy` must be true/false, got {raw:?}"))
            })?;
            provider.set_healthy(healthy);
        }

        if let Some(latency) = parse_number(name, config, "latency_ms")? {
            provider.latency_ms = latency as u64;
        }

        info!(
            provider = %name,
            regions = provider.declared.regions.len(),
            gpu_models = provider.declared.gpus.len(),
            "static provider configured"
        );
        Ok(provider)
    }

    fn ensure_healthy(&self) -> ProviderResult<()> {
        if self.is_healthy() {
            Ok(())
        } else {
            Err(ProviderError::Unavailable(self.name.clone()))
        }
    }

    /// Declared capacity minus what running workloads hold.
    async fn current_resources(&self) -> AvailableResources {
        let workloads = self.workloads.read().await;
        let (cpu_used, mem_used) = workloads
            .values()
            .filter(|a| a.workload.status == WorkloadStatus::Running)
            .fold((0.0, 0.0), |(cpu, mem), a| {
                (cpu + a.requirement.cpu_cores, mem + a.requirement.memory_gb)
            });

        let mut snapshot = self.declared.clone();
        snapshot.cpu.available = (snapshot.cpu.total - cpu_used).max(0.0);
        snapshot.memory.available = (snapshot.memory.total - mem_used).max(0.0);
        snapshot
    }
}

#[async_trait]
impl Provider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> &str {
        STATIC_PROVIDER_TYPE
    }

    async fn health_check(&self) -> ProviderResult<()> {
        self.ensure_healthy()
    }

    async fn get_available_resources(&self) -> ProviderResult<AvailableResources> {
        self.ensure_healthy()?;
        Ok(self.current_resources().await)
    }

    async fn get_pricing(&self) -> ProviderResult<PricingInfo> {
        self.ensure_healthy()?;
        Ok(self.pricing.clone())
    }

    async fn create_workload(
        &self,
        spec: &WorkloadSpec,
        placement: &PlacementDecision,
    ) -> ProviderResult<ProviderWorkload> {
        self.ensure_healthy()?;

        if placement.provider != self.name {
            return Err(ProviderError::api(
                &self.name,
                format!("placement targets provider {}", placement.provider),
            ));
        }
        if !self.declared.region_available(&placement.region) {
            return Err(ProviderError::api(
                &self.name,
                format!("region {} is not available", placement.region),
            ));
        }

        let mut workloads = self.workloads.write().await;
        if workloads.contains_key(&spec.id) {
            return Err(ProviderError::api(
                &self.name,
                format!("workload {} already exists", spec.id),
            ));
        }

        let now = epoch_secs();
        let workload = ProviderWorkload {
            id: spec.id.clone(),
            name: spec.name.clone(),
            provider: self.name.clone(),
            native_id: format!("{}-{}", self.name, spec.id),
            region: placement.region.clone(),
            machine_type: placement.machine_type.clone(),
            status: WorkloadStatus::Running,
            created_at: now,
            updated_at: now,
        };
        workloads.insert(
            spec.id.clone(),
            Allocation {
                workload: workload.clone(),
                requirement: spec.requirement(),
            },
        );

        info!(provider = %self.name, workload = %spec.id, region = %placement.region, "workload created");
        Ok(workload)
    }

    async fn get_workload(&self, id: &str) -> ProviderResult<ProviderWorkload> {
        self.workloads
            .read()
            .await
            .get(id)
            .map(|a| a.workload.clone())
            .ok_or_else(|| ProviderError::WorkloadNotFound(id.to_string()))
    }

    async fn update_workload(
        &self,
        id: &str,
        spec: &WorkloadSpec,
    ) -> ProviderResult<ProviderWorkload> {
        self.ensure_healthy()?;
        let mut workloads = self.workloads.write().await;
        let allocation = workloads
            .get_mut(id)
            .ok_or_else(|| ProviderError::WorkloadNotFound(id.to_string()))?;

        allocation.workload.name = spec.name.clone();
        allocation.workload.updated_at = epoch_secs();
        allocation.requirement = spec.requirement();

        debug!(provider = %self.name, workload = %id, "workload updated");
        Ok(allocation.workload.clone())
    }

    async fn delete_workload(&self, id: &str) -> ProviderResult<()> {
        self.ensure_healthy()?;
        self.workloads
            .write()
            .await
            .remove(id)
            .ok_or_else(|| ProviderError::WorkloadNotFound(id.to_string()))?;
        info!(provider = %self.name, workload = %id, "workload deleted");
        Ok(())
    }

    async fn list_workloads(&self) -> ProviderResult<Vec<ProviderWorkload>> {
        let mut list: Vec<ProviderWorkload> = self
            .workloads
            .read()
            .await
            .values()
            .map(|a| a.workload.clone())
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }

    async fn get_status(&self) -> ProviderStatus {
        let resources = self.current_resources().await;
        let load = if resources.cpu.is_reported() {
            1.0 - resources.cpu.available / resources.cpu.total
        } else {
            0.0
        };
        let healthy = self.is_healthy();

        ProviderStatus {
            name: self.name.clone(),
            healthy,
            load,
            latency_ms: self.latency_ms,
            success_rate: if healthy { 1.0 } else { 0.0 },
            active_workloads: self.workloads.read().await.len(),
            last_check: epoch_secs(),
            message: (!healthy).then(|| "marked unhealthy".to_string()),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number(
    provider: &str,
    config: &HashMap<String, String>,
    key: &str,
) -> ProviderResult<Option<f64>> {
    let Some(raw) = config.get(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
        _ => Err(ProviderError::invalid_config(
            provider,
            format!("`{key}` must be a non-negative number, got {raw:?}"),
        )),
    }
}

/// Parse `type:count:memory_gb:price_per_hour`.
fn parse_gpu_entry(provider: &str, entry: &str) -> ProviderResult<(String, u32, f64, f64)> {
    let invalid = || {
        ProviderError::invalid_config(
            provider,
            format!("gpu entry {entry:?} must be type:count:memory_gb:price_per_hour"),
        )
    };

    let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
    let [gpu_type, count, memory_gb, price] = parts.as_slice() else {
        return Err(invalid());
    };
    if gpu_type.is_empty() {
        return Err(invalid());
    }
    let count = count.parse::<u32>().map_err(|_| invalid())?;
    let memory_gb = memory_gb.parse::<f64>().map_err(|_| invalid())?;
    let price = price.parse::<f64>().map_err(|_| invalid())?;
    Ok((gpu_type.to_string(), count, memory_gb, price))
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Convenience for tests and callers that want a GPU map without a provider.
pub fn gpu_inventory(entries: &[(&str, u32, f64, f64)]) -> BTreeMap<String, GpuPool> {
    entries
        .iter()
        .map(|(name, count, memory_gb, price)| {
            (
                name.to_string(),
                GpuPool {
                    total: *count,
                    available: *count,
                    memory_gb: *memory_gb,
                    price_per_hour: *price,
                },
            )
        })
        .collect()
}
