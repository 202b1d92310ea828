use std::path::Path;

use anyhow::Context;

use polyplace_scheduler::ScheduleResult;

use super::{OutputFormat, WorkloadArgs, load_scheduler, print_json};

pub async fn schedule(
    config: &Path,
    id: &str,
    workload: &WorkloadArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let scheduler = load_scheduler(config).await?;
    let spec = workload.to_spec(id);

    let result = scheduler
        .schedule(&spec)
        .await
        .with_context(|| format!("scheduling workload {id}"))?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => println!("{}", format_result(&result)),
    }

    Ok(())
}

fn format_result(result: &ScheduleResult) -> String {
    let cost = &result.estimated_cost;
    let mut out = format!(
        "✓ Scheduled {} on {}\n  Region:  {}\n  Machine: {}\n  Score:   {:.1}\n  Cost:    {:.4} {}/h, {:.2}/day, {:.2}/mo",
        result.workload_id,
        result.provider,
        result.region,
        result.machine_type,
        result.placement.score,
        cost.hourly,
        cost.currency,
        cost.daily,
        cost.monthly,
    );
    if !result.alternatives.is_empty() {
        out.push_str("\n  Alternatives:");
        for alt in &result.alternatives {
            out.push_str(&format!(
                "\n    #{} {} / {} / {}  score {:.1}  {:.4}/h",
                alt.rank, alt.provider, alt.region, alt.machine_type, alt.score, alt.estimated_cost.hourly
            ));
        }
    }
    out
}
