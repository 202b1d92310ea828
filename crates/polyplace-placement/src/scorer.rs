//! Candidate scoring.
//!
//! A candidate's score is
//!
//! ```text
//! 50 + cost_weight·cost + performance_weight·perf
//!    + reliability_weight·reliability + latency_weight·latency
//! ```
//!
//! where `cost = max(0, (1 - hourly)·50)` for a positive hourly cost and
//! 50 for a free one. The other three signals come from a
//! [`SignalSource`]; [`StaticSignals`] supplies fixed values (40, 45, 40)
//! because no provider telemetry feeds scoring yet.
//!
//! Scores are not clamped. With every weight in `0.0..=1.0` a score lies in
//! `50.0..=`[`max_score`]`(policy)`, which is at most 225 and at most 100
//! when the weights sum to 1.0 or less.

use serde::{Deserialize, Serialize};

use polyplace_core::{Recommendation, ResourceRequirement, SchedulingPolicy};
use polyplace_provider::{AvailableResources, PricingInfo};

/// Score every candidate starts from.
pub const BASE_SCORE: f64 = 50.0;

/// Cost sub-score of a free candidate, and the cap for paid ones.
pub const MAX_COST_SUBSCORE: f64 = 50.0;

/// Source of the non-cost scoring signals for a provider.
///
/// Each value is a sub-score on the same scale as the cost sub-score.
pub trait SignalSource: Send + Sync {
    fn performance(&self, provider: &str) -> f64;
    fn reliability(&self, provider: &str) -> f64;
    fn latency(&self, provider: &str) -> f64;
}

/// Fixed placeholder signals, identical for every provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSignals;

impl StaticSignals {
    pub const PERFORMANCE: f64 = 40.0;
    pub const RELIABILITY: f64 = 45.0;
    pub const LATENCY: f64 = 40.0;
}

impl SignalSource for StaticSignals {
    fn performance(&self, _provider: &str) -> f64 {
        Self::PERFORMANCE
    }

    fn reliability(&self, _provider: &str) -> f64 {
        Self::RELIABILITY
    }

    fn latency(&self, _provider: &str) -> f64 {
        Self::LATENCY
    }
}

/// Individual score components for debugging.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub cost: f64,
    pub performance: f64,
    pub reliability: f64,
    pub latency: f64,
    /// Weighted total including [`BASE_SCORE`].
    pub total: f64,
}

/// Hourly cost of `req` at `pricing`.
///
/// GPU devices are priced at the pricing sheet's rate for `gpu_type`,
/// falling back to the rate quoted with the inventory, then to zero.
pub fn estimate_hourly_cost(
    req: &ResourceRequirement,
    pricing: &PricingInfo,
    resources: &AvailableResources,
    gpu_type: Option<&str>,
) -> f64 {
    let mut hourly =
        req.cpu_cores * pricing.cpu_per_core_hour + req.memory_gb * pricing.memory_per_gb_hour;

    let count = req.gpu_count();
    if count > 0 {
        let rate = gpu_type
            .and_then(|t| {
                pricing
                    .gpu_per_hour
                    .get(t)
                    .copied()
                    .or_else(|| resources.gpus.get(t).map(|g| g.price_per_hour))
            })
            .unwrap_or(0.0);
        hourly += rate * f64::from(count);
    }

    hourly
}

/// Cost sub-score: 50 when free, falling linearly to 0 at 1.0/hour.
pub fn cost_subscore(hourly: f64) -> f64 {
    if hourly > 0.0 {
        ((1.0 - hourly) * MAX_COST_SUBSCORE).max(0.0)
    } else {
        MAX_COST_SUBSCORE
    }
}

/// Score one candidate.
pub fn score_candidate(
    provider: &str,
    hourly: f64,
    policy: &SchedulingPolicy,
    signals: &dyn SignalSource,
) -> ScoreBreakdown {
    let cost = cost_subscore(hourly);
    let performance = signals.performance(provider);
    let reliability = signals.reliability(provider);
    let latency = signals.latency(provider);

    let total = BASE_SCORE
        + policy.cost_weight * cost
        + policy.performance_weight * performance
        + policy.reliability_weight * reliability
        + policy.latency_weight * latency;

    ScoreBreakdown {
        cost,
        performance,
        reliability,
        latency,
        total,
    }
}

/// Highest score [`StaticSignals`] can produce under `policy`.
pub fn max_score(policy: &SchedulingPolicy) -> f64 {
    BASE_SCORE
        + policy.cost_weight * MAX_COST_SUBSCORE
        + policy.performance_weight * StaticSignals::PERFORMANCE
        + policy.reliability_weight * StaticSignals::RELIABILITY
        + policy.latency_weight * StaticSignals::LATENCY
}

/// Sort best first.
///
/// Candidates offering the requested GPU model rank ahead of ones that
/// substitute another model, whatever their scores. Within each group the
/// higher score wins; ties go to providers on the policy's preferred list,
/// then to the provider name in ascending order, so equal inputs always
/// rank the same way.
pub fn rank_recommendations(recs: &mut [Recommendation], policy: &SchedulingPolicy) {
    recs.sort_by(|a, b| {
        a.gpu_substituted
            .cmp(&b.gpu_substituted)
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| preference(policy, b).cmp(&preference(policy, a)))
            .then_with(|| a.provider.cmp(&b.provider))
            .then_with(|| a.region.cmp(&b.region))
    });
}

fn preference(policy: &SchedulingPolicy, rec: &Recommendation) -> bool {
    policy.is_preferred(&rec.provider)
}
