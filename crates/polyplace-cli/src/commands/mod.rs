pub mod init;
pub mod providers;
pub mod recommend;
pub mod schedule;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, ValueEnum};
use tracing::{info, warn};

use polyplace_core::{PolyplaceConfig, ResourceSpec, WorkloadSpec};
use polyplace_provider::ProviderRegistry;
use polyplace_scheduler::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Resource ask shared by `recommend` and `schedule`.
#[derive(Debug, Clone, Args)]
pub struct WorkloadArgs {
    /// CPU cores or millicores (e.g. 2, 500m)
    #[arg(long, default_value = "1")]
    pub cpu: String,
    /// Memory (e.g. 4Gi, 512Mi, 8G)
    #[arg(long, default_value = "4Gi")]
    pub memory: String,
    /// GPU ask: type=count, a bare count, or a bare type
    #[arg(long)]
    pub gpu: Option<String>,
    /// Preferred region
    #[arg(long)]
    pub region: Option<String>,
}

impl WorkloadArgs {
    pub fn to_spec(&self, id: &str) -> WorkloadSpec {
        let mut resources = ResourceSpec::new(&self.cpu, &self.memory);
        if let Some(gpu) = &self.gpu {
            resources = resources.with_gpu(gpu);
        }
        let mut spec = WorkloadSpec::new(id, resources);
        spec.region = self.region.clone();
        spec
    }
}

/// Load the config file and build a scheduler over every provider that
/// registers cleanly. Broken provider entries are logged and skipped.
pub async fn load_scheduler(config_path: &Path) -> anyhow::Result<Scheduler> {
    let config = PolyplaceConfig::from_file(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let registry = ProviderRegistry::with_builtin_factories().await;
    let report = registry.register_from_configs(&config.providers).await;
    for (name, error) in &report.failed {
        warn!(provider = %name, %error, "provider not registered");
    }
    info!(
        path = %config_path.display(),
        providers = report.registered.len(),
        "config loaded"
    );

    Ok(Scheduler::new(Arc::new(registry), config.scheduler))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
