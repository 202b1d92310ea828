use std::path::Path;

use polyplace_core::Recommendation;

use super::{OutputFormat, WorkloadArgs, load_scheduler, print_json};

pub async fn recommend(
    config: &Path,
    workload: &WorkloadArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let scheduler = load_scheduler(config).await?;
    let spec = workload.to_spec("recommendation");
    let recs = scheduler.get_recommendations(&spec).await?;

    match format {
        OutputFormat::Json => print_json(&recs)?,
        OutputFormat::Text => {
            if recs.is_empty() {
                println!("No provider can run this workload.");
            }
            for (i, rec) in recs.iter().enumerate() {
                println!("{}", format_recommendation(i + 1, rec));
            }
        }
    }

    Ok(())
}

fn format_recommendation(rank: usize, rec: &Recommendation) -> String {
    let mut out = format!(
        "#{rank} {} / {} / {}  score {:.1}  {:.4} {}/h ({:.2}/mo)",
        rec.provider,
        rec.region,
        rec.machine_type,
        rec.score,
        rec.estimated_cost.hourly,
        rec.estimated_cost.currency,
        rec.estimated_cost.monthly,
    );
    for pro in &rec.pros {
        out.push_str(&format!("\n    + {pro}"));
    }
    for con in &rec.cons {
        out.push_str(&format!("\n    - {con}"));
    }
    out
}
