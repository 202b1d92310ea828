//! Per-provider candidate evaluation.
//!
//! Given one provider's capacity and pricing snapshot, decide whether it
//! is a candidate for a requirement and, if so, build its
//! [`Recommendation`]. Pure: all provider I/O happens in the scheduler.

use thiserror::Error;

use polyplace_core::{EstimatedCost, Recommendation, ResourceRequirement, SchedulingPolicy};
use polyplace_provider::{AvailableResources, PricingInfo};

use crate::machine::select_machine_type;
use crate::scorer::{SignalSource, estimate_hourly_cost, score_candidate};

/// Confidence attached to every recommendation.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Why a provider was not a candidate.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Rejection {
    #[error("insufficient {resource}: need {needed}, {available} available")]
    InsufficientCapacity {
        resource: &'static str,
        needed: f64,
        available: f64,
    },

    #[error("no GPUs available")]
    NoGpus,

    #[error("hourly cost {hourly:.4} exceeds ceiling {ceiling:.4}")]
    OverBudget { hourly: f64, ceiling: f64 },

    #[error("no available region")]
    NoRegion,
}

/// Inputs shared by every provider in one sweep.
pub struct CandidateContext<'a> {
    pub requirement: &'a ResourceRequirement,
    /// Region named on the workload.
    pub requested_region: Option<&'a str>,
    /// Regions to try before the requested one (reschedule constraints).
    pub preferred_regions: &'a [String],
    pub policy: &'a SchedulingPolicy,
    /// Extra per-call cost ceiling, combined with the policy's own.
    pub cost_ceiling: Option<f64>,
    pub signals: &'a dyn SignalSource,
}

impl CandidateContext<'_> {
    /// The tighter of the policy ceiling and the per-call ceiling.
    pub fn effective_ceiling(&self) -> Option<f64> {
        match (self.policy.max_cost_per_hour, self.cost_ceiling) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Evaluate one provider snapshot.
///
/// Policy exclusion is not checked here: the scheduler drops excluded
/// providers before querying them.
pub fn evaluate_candidate(
    provider: &str,
    resources: &AvailableResources,
    pricing: &PricingInfo,
    ctx: &CandidateContext<'_>,
) -> Result<Recommendation, Rejection> {
    let req = ctx.requirement;
    check_capacity(req, resources)?;

    let machine = select_machine_type(req, resources);
    let gpu_type = machine
        .gpu_type
        .as_deref()
        .or_else(|| req.gpu.as_ref().map(|g| g.gpu_type.as_str()).filter(|t| !t.is_empty()));
    let hourly = estimate_hourly_cost(req, pricing, resources, gpu_type);

    if let Some(ceiling) = ctx.effective_ceiling() {
        if hourly > ceiling {
            return Err(Rejection::OverBudget { hourly, ceiling });
        }
    }

    let region = select_region(resources, ctx.requested_region, ctx.preferred_regions)
        .ok_or(Rejection::NoRegion)?;

    let score = score_candidate(provider, hourly, ctx.policy, ctx.signals);

    let mut pros = vec!["Available".to_string(), "Healthy".to_string()];
    if ctx.policy.is_preferred(provider) {
        pros.push("Preferred provider".to_string());
    }
    let mut cons = Vec::new();
    if machine.gpu_substituted {
        cons.push("GPU type substituted".to_string());
    }

    Ok(Recommendation {
        provider: provider.to_string(),
        region,
        machine_type: machine.machine_type,
        score: score.total,
        estimated_cost: EstimatedCost::from_hourly(hourly, pricing.currency.clone()),
        pros,
        cons,
        confidence: DEFAULT_CONFIDENCE,
        gpu_substituted: machine.gpu_substituted,
    })
}

/// Pick a region: the first preferred region that is available, else the
/// requested region if available, else the first available region.
pub fn select_region(
    resources: &AvailableResources,
    requested: Option<&str>,
    preferred: &[String],
) -> Option<String> {
    preferred
        .iter()
        .map(String::as_str)
        .chain(requested)
        .find(|r| resources.region_available(r))
        .or_else(|| resources.first_available_region())
        .map(str::to_string)
}

fn check_capacity(req: &ResourceRequirement, resources: &AvailableResources) -> Result<(), Rejection> {
    if !resources.cpu.fits(req.cpu_cores) {
        return Err(Rejection::InsufficientCapacity {
            resource: "cpu",
            needed: req.cpu_cores,
            available: resources.cpu.available,
        });
    }
    if !resources.memory.fits(req.memory_gb) {
        return Err(Rejection::InsufficientCapacity {
            resource: "memory",
            needed: req.memory_gb,
            available: resources.memory.available,
        });
    }
    if req.wants_gpu() && resources.total_gpus_available() == 0 {
        return Err(Rejection::NoGpus);
    }
    Ok(())
}
