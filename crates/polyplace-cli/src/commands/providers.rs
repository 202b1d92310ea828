use std::path::Path;

use serde::Serialize;

use polyplace_provider::ProviderStatus;

use super::{OutputFormat, load_scheduler, print_json};

#[derive(Serialize)]
struct ProviderRow {
    name: String,
    provider_type: String,
    healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    health_error: Option<String>,
    status: ProviderStatus,
}

pub async fn list(config: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let scheduler = load_scheduler(config).await?;

    let mut rows = Vec::new();
    for provider in scheduler.registry().list_providers().await {
        let health = provider.health_check().await;
        rows.push(ProviderRow {
            name: provider.name().to_string(),
            provider_type: provider.provider_type().to_string(),
            healthy: health.is_ok(),
            health_error: health.err().map(|e| e.to_string()),
            status: provider.get_status().await,
        });
    }

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No providers registered.");
            }
            for row in &rows {
                let mark = if row.healthy { "✓" } else { "✗" };
                println!(
                    "{mark} {:<20} {:<10} load {:>5.1}%  latency {:>4}ms  workloads {}",
                    row.name,
                    row.provider_type,
                    row.status.load * 100.0,
                    row.status.latency_ms,
                    row.status.active_workloads,
                );
                if let Some(error) = &row.health_error {
                    println!("    {error}");
                }
            }
        }
    }

    Ok(())
}
