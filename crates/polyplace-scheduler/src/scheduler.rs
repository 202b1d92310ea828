//! Scheduler — places one workload onto the best provider.
//!
//! Every call sweeps the registered providers, asks each for health,
//! pricing, and capacity, scores the survivors, and ranks them. A provider
//! that fails any query is dropped from that sweep only. The sweep runs
//! the provider queries concurrently and is bounded by
//! `SchedulerConfig::schedule_timeout`; on expiry every in-flight query is
//! aborted and the call fails with [`SchedulerError::Timeout`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use polyplace_core::{
    Alternative, EstimatedCost, PlacementDecision, Recommendation, ResourceRequirement,
    SchedulerConfig, SchedulingPolicy, WorkloadSpec,
};
use polyplace_placement::{
    CandidateContext, SignalSource, StaticSignals, evaluate_candidate, rank_recommendations,
};
use polyplace_provider::{Provider, ProviderRegistry};

use crate::error::{SchedulerError, SchedulerResult};
use crate::stats::{ScheduleRecord, SchedulerStats, epoch_secs};

/// Hourly cost assumed as the reschedule baseline when the caller does not
/// supply the workload's current cost.
pub const ASSUMED_BASELINE_HOURLY_COST: f64 = 1.0;

/// Extra filters for [`Scheduler::reschedule`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RescheduleConstraints {
    /// When non-empty, only these providers are considered.
    #[serde(default)]
    pub required_providers: Vec<String>,
    #[serde(default)]
    pub excluded_providers: Vec<String>,
    /// Maximum allowed increase over the baseline hourly cost, in percent.
    #[serde(default)]
    pub max_cost_increase: Option<f64>,
    /// Regions tried, in order, before the default region rule.
    #[serde(default)]
    pub preferred_regions: Vec<String>,
    /// The workload's current hourly cost. Falls back to
    /// [`ASSUMED_BASELINE_HOURLY_COST`].
    #[serde(default)]
    pub baseline_hourly_cost: Option<f64>,
    /// Replaces the scheduler's default policy for this call.
    #[serde(default)]
    pub policy: Option<SchedulingPolicy>,
}

impl RescheduleConstraints {
    /// Whether `provider` passes the allow/deny lists.
    pub fn admits(&self, provider: &str) -> bool {
        let required =
            self.required_providers.is_empty() || self.required_providers.iter().any(|p| p == provider);
        let excluded = self.excluded_providers.iter().any(|p| p == provider);
        required && !excluded
    }

    /// Hourly ceiling implied by `max_cost_increase`.
    pub fn cost_ceiling(&self) -> Option<f64> {
        let increase = self.max_cost_increase?;
        let baseline = self.baseline_hourly_cost.unwrap_or(ASSUMED_BASELINE_HOURLY_COST);
        Some(baseline * (1.0 + increase / 100.0))
    }

    /// Human-readable summary for error messages.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.required_providers.is_empty() {
            parts.push(format!("required providers: [{}]", self.required_providers.join(", ")));
        }
        if !self.excluded_providers.is_empty() {
            parts.push(format!("excluded providers: [{}]", self.excluded_providers.join(", ")));
        }
        if let (Some(increase), Some(ceiling)) = (self.max_cost_increase, self.cost_ceiling()) {
            parts.push(format!("max cost increase: {increase}% (ceiling {ceiling:.4}/h)"));
        }
        if !self.preferred_regions.is_empty() {
            parts.push(format!("preferred regions: [{}]", self.preferred_regions.join(", ")));
        }
        if parts.is_empty() {
            "no constraints".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Outcome of a successful schedule or reschedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleResult {
    pub workload_id: String,
    pub provider: String,
    pub region: String,
    pub machine_type: String,
    pub estimated_cost: EstimatedCost,
    pub placement: PlacementDecision,
    pub alternatives: Vec<Alternative>,
    /// Unix timestamp (seconds).
    pub scheduled_at: u64,
    pub rescheduled: bool,
}

/// Kind of [`SchedulingEvent`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingEventKind {
    Scheduled,
    Rescheduled,
}

/// Notification shape for an external event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulingEvent {
    pub kind: SchedulingEventKind,
    pub workload_id: String,
    pub provider: String,
    pub region: String,
    pub machine_type: String,
    pub hourly_cost: f64,
    pub timestamp: u64,
}

impl ScheduleResult {
    pub fn event(&self) -> SchedulingEvent {
        SchedulingEvent {
            kind: if self.rescheduled {
                SchedulingEventKind::Rescheduled
            } else {
                SchedulingEventKind::Scheduled
            },
            workload_id: self.workload_id.clone(),
            provider: self.provider.clone(),
            region: self.region.clone(),
            machine_type: self.machine_type.clone(),
            hourly_cost: self.estimated_cost.hourly,
            timestamp: self.scheduled_at,
        }
    }
}

/// Per-sweep inputs shared with every provider task.
struct SweepInputs {
    requirement: ResourceRequirement,
    requested_region: Option<String>,
    preferred_regions: Vec<String>,
    policy: SchedulingPolicy,
    cost_ceiling: Option<f64>,
    signals: Arc<dyn SignalSource>,
}

impl SweepInputs {
    fn context(&self) -> CandidateContext<'_> {
        CandidateContext {
            requirement: &self.requirement,
            requested_region: self.requested_region.as_deref(),
            preferred_regions: &self.preferred_regions,
            policy: &self.policy,
            cost_ceiling: self.cost_ceiling,
            signals: self.signals.as_ref(),
        }
    }
}

/// Ranked candidates from one sweep.
struct Sweep {
    recommendations: Vec<Recommendation>,
    attempted: usize,
}

/// The multi-provider scheduling engine.
pub struct Scheduler {
    registry: Arc<ProviderRegistry>,
    config: SchedulerConfig,
    signals: Arc<dyn SignalSource>,
    stats: Mutex<SchedulerStats>,
}

impl Scheduler {
    /// Create a scheduler over `registry` using placeholder scoring signals.
    pub fn new(registry: Arc<ProviderRegistry>, config: SchedulerConfig) -> Self {
        Self {
            registry,
            config,
            signals: Arc::new(StaticSignals),
            stats: Mutex::new(SchedulerStats::default()),
        }
    }

    /// Replace the source of performance/reliability/latency signals.
    pub fn with_signals(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = signals;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Place a workload on the best provider.
    pub async fn schedule(&self, workload: &WorkloadSpec) -> SchedulerResult<ScheduleResult> {
        let result = self
            .sweep(workload, &self.config.default_policy, None)
            .await
            .and_then(|sweep| {
                if sweep.recommendations.is_empty() {
                    Err(SchedulerError::NoCandidates {
                        workload_id: workload.id.clone(),
                        attempted: sweep.attempted,
                    })
                } else {
                    Ok(self.build_result(workload, &sweep.recommendations, false))
                }
            });

        self.record(workload, &result, false).await;
        result
    }

    /// Score every provider for a workload, best first. Does not touch stats.
    pub async fn get_recommendations(
        &self,
        workload: &WorkloadSpec,
    ) -> SchedulerResult<Vec<Recommendation>> {
        let sweep = self.sweep(workload, &self.config.default_policy, None).await?;
        Ok(sweep.recommendations)
    }

    /// Re-run placement for an already-placed workload under constraints.
    ///
    /// No retry is attempted; an empty candidate set is reported as
    /// [`SchedulerError::ConstraintViolation`]. A policy override with
    /// out-of-range weights fails with [`SchedulerError::InvalidPolicy`]
    /// before any provider is queried.
    pub async fn reschedule(
        &self,
        workload: &WorkloadSpec,
        constraints: &RescheduleConstraints,
    ) -> SchedulerResult<ScheduleResult> {
        let result = match self.reschedule_policy(constraints) {
            Ok(policy) => self.sweep(workload, policy, Some(constraints)).await,
            Err(e) => Err(e),
        }
        .and_then(|sweep| {
            if sweep.recommendations.is_empty() {
                Err(SchedulerError::ConstraintViolation {
                    workload_id: workload.id.clone(),
                    attempted: sweep.attempted,
                    constraints: constraints.summary(),
                })
            } else {
                Ok(self.build_result(workload, &sweep.recommendations, true))
            }
        });

        self.record(workload, &result, true).await;
        result
    }

    /// Snapshot of the rolling stats.
    pub async fn stats(&self) -> SchedulerStats {
        let mut stats = self.stats.lock().await;
        stats.last_updated = epoch_secs();
        stats.clone()
    }

    /// Report a later outcome for a placement, e.g. the provider failed to
    /// start the workload. Only the provider's running averages change.
    pub async fn record_provider_outcome(&self, provider: &str, success: bool) {
        self.stats
            .lock()
            .await
            .record_provider_outcome(provider, success);
        debug!(%provider, success, "provider outcome recorded");
    }

    /// Fails only when no providers are registered. Provider health is not
    /// checked here.
    pub async fn health_check(&self) -> SchedulerResult<()> {
        if self.registry.is_empty().await {
            return Err(SchedulerError::NoProviders);
        }
        Ok(())
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn reschedule_policy<'a>(
        &'a self,
        constraints: &'a RescheduleConstraints,
    ) -> SchedulerResult<&'a SchedulingPolicy> {
        match &constraints.policy {
            Some(policy) => {
                policy.validate().map_err(SchedulerError::InvalidPolicy)?;
                Ok(policy)
            }
            None => Ok(&self.config.default_policy),
        }
    }

    async fn sweep(
        &self,
        workload: &WorkloadSpec,
        policy: &SchedulingPolicy,
        constraints: Option<&RescheduleConstraints>,
    ) -> SchedulerResult<Sweep> {
        let providers = self.registry.list_providers().await;
        let attempted = providers.len();

        let inputs = Arc::new(SweepInputs {
            requirement: workload.requirement(),
            requested_region: workload.region.clone(),
            preferred_regions: constraints
                .map(|c| c.preferred_regions.clone())
                .unwrap_or_default(),
            policy: policy.clone(),
            cost_ceiling: constraints.and_then(RescheduleConstraints::cost_ceiling),
            signals: self.signals.clone(),
        });

        // Dropping the set aborts every task still running.
        let mut tasks = JoinSet::new();
        for provider in providers {
            if constraints.is_some_and(|c| !c.admits(provider.name())) {
                debug!(provider = provider.name(), workload = %workload.id, "excluded by reschedule constraints");
                continue;
            }
            if policy.is_excluded(provider.name()) {
                debug!(provider = provider.name(), workload = %workload.id, "excluded by policy");
                continue;
            }
            tasks.spawn(probe_provider(provider, inputs.clone()));
        }

        let collect = async {
            let mut recommendations = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Some(rec)) => recommendations.push(rec),
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "provider probe task failed"),
                }
            }
            recommendations
        };

        let timeout = self.config.schedule_timeout;
        let mut recommendations = tokio::time::timeout(timeout, collect).await.map_err(|_| {
            warn!(workload = %workload.id, ?timeout, "provider sweep timed out");
            SchedulerError::Timeout(timeout)
        })?;

        rank_recommendations(&mut recommendations, policy);
        debug!(
            workload = %workload.id,
            attempted,
            candidates = recommendations.len(),
            "provider sweep complete"
        );

        Ok(Sweep {
            recommendations,
            attempted,
        })
    }

    fn build_result(
        &self,
        workload: &WorkloadSpec,
        ranked: &[Recommendation],
        rescheduled: bool,
    ) -> ScheduleResult {
        let best = &ranked[0];

        let alternatives = ranked
            .iter()
            .skip(1)
            .take(self.config.max_alternatives)
            .enumerate()
            .map(|(i, rec)| Alternative {
                rank: i + 2,
                provider: rec.provider.clone(),
                region: rec.region.clone(),
                machine_type: rec.machine_type.clone(),
                score: rec.score,
                estimated_cost: rec.estimated_cost.clone(),
                reason: format!("Alternative {}", i + 2),
            })
            .collect();

        ScheduleResult {
            workload_id: workload.id.clone(),
            provider: best.provider.clone(),
            region: best.region.clone(),
            machine_type: best.machine_type.clone(),
            estimated_cost: best.estimated_cost.clone(),
            placement: PlacementDecision::from(best),
            alternatives,
            scheduled_at: epoch_secs(),
            rescheduled,
        }
    }

    async fn record(
        &self,
        workload: &WorkloadSpec,
        result: &SchedulerResult<ScheduleResult>,
        rescheduled: bool,
    ) {
        let record = match result {
            Ok(r) => {
                info!(
                    workload = %r.workload_id,
                    provider = %r.provider,
                    region = %r.region,
                    machine_type = %r.machine_type,
                    score = r.placement.score,
                    hourly_cost = r.estimated_cost.hourly,
                    rescheduled,
                    "workload placed"
                );
                ScheduleRecord {
                    workload_id: r.workload_id.clone(),
                    provider: Some(r.provider.clone()),
                    region: Some(r.region.clone()),
                    machine_type: Some(r.machine_type.clone()),
                    score: Some(r.placement.score),
                    hourly_cost: Some(r.estimated_cost.hourly),
                    success: true,
                    rescheduled,
                    error: None,
                    timestamp: r.scheduled_at,
                }
            }
            Err(e) => {
                warn!(workload = %workload.id, error = %e, rescheduled, "scheduling failed");
                ScheduleRecord::failure(&workload.id, e.to_string(), rescheduled)
            }
        };

        self.stats.lock().await.record(record);
    }
}

/// Query one provider and evaluate it. `None` drops it from the sweep.
async fn probe_provider(
    provider: Arc<dyn Provider>,
    inputs: Arc<SweepInputs>,
) -> Option<Recommendation> {
    let name = provider.name();

    if let Err(e) = provider.health_check().await {
        debug!(provider = name, error = %e, "health check failed, skipping provider");
        return None;
    }

    let pricing = match provider.get_pricing().await {
        Ok(p) => p,
        Err(e) => {
            warn!(provider = name, error = %e, "pricing unavailable, skipping provider");
            return None;
        }
    };

    let resources = match provider.get_available_resources().await {
        Ok(r) => r,
        Err(e) => {
            warn!(provider = name, error = %e, "resources unavailable, skipping provider");
            return None;
        }
    };

    match evaluate_candidate(name, &resources, &pricing, &inputs.context()) {
        Ok(rec) => Some(rec),
        Err(rejection) => {
            debug!(provider = name, reason = %rejection, "provider rejected");
            None
        }
    }
}
