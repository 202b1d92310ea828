//! Machine-size selection.
//!
//! Turns a canonical requirement into a machine-type label that provider
//! adapters map onto their own instance types or flavors.

use serde::{Deserialize, Serialize};

use polyplace_core::ResourceRequirement;
use polyplace_provider::AvailableResources;

/// Label used when a GPU is requested but the provider has none free.
pub const GENERIC_GPU_MACHINE: &str = "gpu-standard";

/// A named CPU/memory bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachineTier {
    pub name: &'static str,
    pub cpu_cores: f64,
    pub memory_gb: f64,
}

impl MachineTier {
    const fn new(name: &'static str, cpu_cores: f64, memory_gb: f64) -> Self {
        Self {
            name,
            cpu_cores,
            memory_gb,
        }
    }

    pub fn fits(&self, cpu_cores: f64, memory_gb: f64) -> bool {
        self.cpu_cores >= cpu_cores && self.memory_gb >= memory_gb
    }
}

/// Ascending tier ladder.
pub const MACHINE_TIERS: [MachineTier; 9] = [
    MachineTier::new("micro", 0.5, 1.0),
    MachineTier::new("small", 1.0, 2.0),
    MachineTier::new("medium", 2.0, 4.0),
    MachineTier::new("large", 4.0, 8.0),
    MachineTier::new("xlarge", 8.0, 16.0),
    MachineTier::new("2xlarge", 16.0, 32.0),
    MachineTier::new("4xlarge", 32.0, 64.0),
    MachineTier::new("8xlarge", 64.0, 128.0),
    MachineTier::new("16xlarge", 128.0, 256.0),
];

/// Result of machine selection for one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MachineSelection {
    pub machine_type: String,
    /// GPU model the label was built from, if any.
    pub gpu_type: Option<String>,
    /// A specific GPU model was requested and a different one was chosen.
    pub gpu_substituted: bool,
}

impl MachineSelection {
    fn cpu(machine_type: String) -> Self {
        Self {
            machine_type,
            gpu_type: None,
            gpu_substituted: false,
        }
    }
}

/// Pick a machine type for `req` on a provider reporting `resources`.
///
/// GPU asks match the requested model first, then the free model with the
/// most memory, then [`GENERIC_GPU_MACHINE`]. CPU asks walk
/// [`MACHINE_TIERS`].
pub fn select_machine_type(
    req: &ResourceRequirement,
    resources: &AvailableResources,
) -> MachineSelection {
    let Some(gpu) = req.gpu.as_ref().filter(|g| g.count > 0) else {
        return MachineSelection::cpu(cpu_tier(req.cpu_cores, req.memory_gb));
    };

    let exact = gpu.has_type().then(|| {
        resources
            .gpus
            .get_key_value(&gpu.gpu_type)
            .filter(|(_, pool)| pool.available > 0)
    });
    if let Some(Some((name, _))) = exact {
        return MachineSelection {
            machine_type: gpu_label(name, gpu.count),
            gpu_type: Some(name.clone()),
            gpu_substituted: false,
        };
    }

    // Largest memory wins; the first model in name order wins ties.
    let mut best: Option<(&String, f64)> = None;
    for (name, pool) in resources.gpus.iter().filter(|(_, p)| p.available > 0) {
        if best.is_none_or(|(_, mem)| pool.memory_gb > mem) {
            best = Some((name, pool.memory_gb));
        }
    }

    match best {
        Some((name, _)) => MachineSelection {
            machine_type: gpu_label(name, gpu.count),
            gpu_type: Some(name.clone()),
            gpu_substituted: gpu.has_type(),
        },
        None => MachineSelection::cpu(GENERIC_GPU_MACHINE.to_string()),
    }
}

/// Smallest ladder tier covering both dimensions, or a `custom-<cores>-<gb>`
/// label beyond the top tier.
pub fn cpu_tier(cpu_cores: f64, memory_gb: f64) -> String {
    MACHINE_TIERS
        .iter()
        .find(|t| t.fits(cpu_cores, memory_gb))
        .map(|t| t.name.to_string())
        .unwrap_or_else(|| format!("custom-{:.0}-{:.0}", cpu_cores.ceil(), memory_gb.ceil()))
}

fn gpu_label(gpu_type: &str, count: u32) -> String {
    format!("gpu-{gpu_type}-{count}x")
}
