//! End-to-end scheduling scenarios against in-memory providers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use polyplace_core::{
    PlacementDecision, ResourceSpec, SchedulerConfig, SchedulingPolicy, Strategy, WorkloadSpec,
};
use polyplace_provider::{
    AvailableResources, PricingInfo, Provider, ProviderError, ProviderRegistry, ProviderResult,
    ProviderStatus, ProviderWorkload, StaticProvider,
};
use polyplace_scheduler::{
    MAX_RECENT_SCHEDULES, RescheduleConstraints, Scheduler, SchedulerError,
};

// ── Fixtures ───────────────────────────────────────────────────────

fn cpu_provider(name: &str, per_core_hour: f64) -> StaticProvider {
    StaticProvider::new(name)
        .with_region("us-east-1")
        .with_region("us-west-2")
        .with_capacity(64.0, 256.0)
        .with_pricing(per_core_hour, 0.001)
}

fn workload(id: &str) -> WorkloadSpec {
    WorkloadSpec::new(id, ResourceSpec::new("1", "2Gi"))
}

async fn registry(providers: Vec<Arc<dyn Provider>>) -> Arc<ProviderRegistry> {
    let registry = Arc::new(ProviderRegistry::new());
    for p in providers {
        registry.register_provider(p).await;
    }
    registry
}

/// How a [`Scripted`] provider misbehaves.
#[derive(Clone, Copy)]
enum Fault {
    /// Health check never returns.
    Hang,
    PricingError,
    ResourcesError,
}

/// Wraps a [`StaticProvider`] and injects one fault.
struct Scripted {
    inner: StaticProvider,
    fault: Fault,
}

impl Scripted {
    fn new(inner: StaticProvider, fault: Fault) -> Arc<dyn Provider> {
        Arc::new(Self { inner, fault })
    }
}

#[async_trait]
impl Provider for Scripted {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn provider_type(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> ProviderResult<()> {
        if let Fault::Hang = self.fault {
            std::future::pending::<()>().await;
        }
        self.inner.health_check().await
    }

    async fn get_available_resources(&self) -> ProviderResult<AvailableResources> {
        if let Fault::ResourcesError = self.fault {
            return Err(ProviderError::api(self.name(), "capacity endpoint returned 500"));
        }
        self.inner.get_available_resources().await
    }

    async fn get_pricing(&self) -> ProviderResult<PricingInfo> {
        if let Fault::PricingError = self.fault {
            return Err(ProviderError::Timeout("pricing".into()));
        }
        self.inner.get_pricing().await
    }

    async fn create_workload(
        &self,
        spec: &WorkloadSpec,
        placement: &PlacementDecision,
    ) -> ProviderResult<ProviderWorkload> {
        self.inner.create_workload(spec, placement).await
    }

    async fn get_workload(&self, id: &str) -> ProviderResult<ProviderWorkload> {
        self.inner.get_workload(id).await
    }

    async fn update_workload(
        &self,
        id: &str,
        spec: &WorkloadSpec,
    ) -> ProviderResult<ProviderWorkload> {
        self.inner.update_workload(id, spec).await
    }

    async fn delete_workload(&self, id: &str) -> ProviderResult<()> {
        self.inner.delete_workload(id).await
    }

    async fn list_workloads(&self) -> ProviderResult<Vec<ProviderWorkload>> {
        self.inner.list_workloads().await
    }

    async fn get_status(&self) -> ProviderStatus {
        self.inner.get_status().await
    }
}

// ── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn unhealthy_provider_is_skipped() {
    let down = Arc::new(cpu_provider("b", 0.01));
    down.set_healthy(false);
    let reg = registry(vec![
        Arc::new(cpu_provider("a", 0.05)),
        down.clone(),
        Arc::new(cpu_provider("c", 0.10)),
    ])
    .await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    let recs = scheduler.get_recommendations(&workload("w1")).await.unwrap();
    let names: Vec<&str> = recs.iter().map(|r| r.provider.as_str()).collect();
    assert_eq!(names, vec!["a", "c"]);
    assert!(recs[0].score >= recs[1].score);

    // Recovery is picked up on the next sweep.
    down.set_healthy(true);
    let result = scheduler.schedule(&workload("w2")).await.unwrap();
    assert_eq!(result.provider, "b");
}

#[tokio::test]
async fn gpu_workload_lands_on_gpu_provider() {
    let reg = registry(vec![
        Arc::new(cpu_provider("k8s", 0.01)),
        Arc::new(
            StaticProvider::new("x")
                .with_region("us-central")
                .with_capacity(64.0, 256.0)
                .with_pricing(0.05, 0.005)
                .with_gpu("a100", 4, 80.0, 1.9)
                .with_gpu("t4", 8, 16.0, 0.35),
        ),
        Arc::new(cpu_provider("z", 0.02)),
    ])
    .await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    let spec = WorkloadSpec::new("train", ResourceSpec::new("8", "32Gi").with_gpu("a100=2"));
    let result = scheduler.schedule(&spec).await.unwrap();

    assert_eq!(result.provider, "x");
    assert_eq!(result.region, "us-central");
    assert!(result.machine_type.contains("a100"), "{}", result.machine_type);
    assert!(result.alternatives.is_empty());
    // 8*0.05 + 32*0.005 + 2*1.9
    assert!((result.estimated_cost.hourly - 4.36).abs() < 1e-9);
}

#[tokio::test]
async fn exact_gpu_model_beats_cheaper_substitute() {
    let gpu_provider = |name: &str, gpu: &str, memory_gb: f64, price: f64| {
        StaticProvider::new(name)
            .with_region("us-central")
            .with_capacity(64.0, 256.0)
            .with_pricing(0.05, 0.005)
            .with_gpu(gpu, 8, memory_gb, price)
    };
    let reg = registry(vec![
        Arc::new(gpu_provider("t4-cloud", "t4", 16.0, 0.10)),
        Arc::new(gpu_provider("x", "a100", 80.0, 1.9)),
    ])
    .await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    let spec = WorkloadSpec::new("train", ResourceSpec::new("8", "32Gi").with_gpu("a100=2"));
    let result = scheduler.schedule(&spec).await.unwrap();

    assert_eq!(result.provider, "x");
    assert_eq!(result.machine_type, "gpu-a100-2x");

    // The substitute stays available as a runner-up.
    assert_eq!(result.alternatives.len(), 1);
    assert_eq!(result.alternatives[0].provider, "t4-cloud");
    assert_eq!(result.alternatives[0].machine_type, "gpu-t4-2x");
    assert!(result.alternatives[0].score > result.placement.score);

    // With no exact match anywhere, the substitute is placed.
    let spec = WorkloadSpec::new("infer", ResourceSpec::new("8", "32Gi").with_gpu("h100=1"));
    let result = scheduler.schedule(&spec).await.unwrap();
    assert_eq!(result.provider, "t4-cloud");
}

#[tokio::test]
async fn reschedule_restricted_to_required_provider() {
    let reg = registry(vec![
        Arc::new(cpu_provider("k8s", 0.20)),
        Arc::new(cpu_provider("flymachines", 0.01)),
    ])
    .await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    let constraints = RescheduleConstraints {
        required_providers: vec!["k8s".to_string()],
        ..Default::default()
    };
    let result = scheduler.reschedule(&workload("w1"), &constraints).await.unwrap();
    assert_eq!(result.provider, "k8s");
    assert!(result.rescheduled);
    assert!(result.alternatives.iter().all(|a| a.provider == "k8s"));

    let stats = scheduler.stats().await;
    assert!(stats.recent_schedules[0].rescheduled);
}

#[tokio::test]
async fn empty_registry() {
    let scheduler = Scheduler::new(Arc::new(ProviderRegistry::new()), SchedulerConfig::default());

    assert!(matches!(scheduler.health_check().await, Err(SchedulerError::NoProviders)));
    match scheduler.schedule(&workload("w1")).await {
        Err(SchedulerError::NoCandidates { workload_id, attempted }) => {
            assert_eq!(workload_id, "w1");
            assert_eq!(attempted, 0);
        }
        other => panic!("expected NoCandidates, got {other:?}"),
    }
    assert!(scheduler.get_recommendations(&workload("w1")).await.unwrap().is_empty());
}

#[tokio::test]
async fn health_check_ignores_provider_health() {
    let down = StaticProvider::new("down");
    down.set_healthy(false);
    let scheduler = Scheduler::new(registry(vec![Arc::new(down)]).await, SchedulerConfig::default());
    assert!(scheduler.health_check().await.is_ok());
}

#[tokio::test]
async fn policy_exclusion_removes_provider() {
    let reg = registry(vec![
        Arc::new(cpu_provider("cheap", 0.01)),
        Arc::new(cpu_provider("steady", 0.10)),
    ])
    .await;
    let config = SchedulerConfig {
        default_policy: SchedulingPolicy {
            excluded_providers: vec!["cheap".to_string()],
            ..SchedulingPolicy::default()
        },
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(reg, config);

    let recs = scheduler.get_recommendations(&workload("w1")).await.unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].provider, "steady");
}

#[tokio::test]
async fn failing_queries_drop_only_that_provider() {
    let reg = registry(vec![
        Scripted::new(cpu_provider("no-prices", 0.01), Fault::PricingError),
        Scripted::new(cpu_provider("no-capacity", 0.01), Fault::ResourcesError),
        Arc::new(cpu_provider("ok", 0.30)),
    ])
    .await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    let result = scheduler.schedule(&workload("w1")).await.unwrap();
    assert_eq!(result.provider, "ok");
    assert!(result.alternatives.is_empty());
}

#[tokio::test]
async fn hung_provider_times_out_the_sweep() {
    let reg = registry(vec![
        Scripted::new(cpu_provider("stuck", 0.01), Fault::Hang),
        Arc::new(cpu_provider("ok", 0.10)),
    ])
    .await;
    let config = SchedulerConfig {
        schedule_timeout: Duration::from_millis(100),
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(reg, config);

    let err = scheduler.schedule(&workload("w1")).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Timeout(d) if d == Duration::from_millis(100)));
    assert!(!err.is_no_candidates());

    let stats = scheduler.stats().await;
    assert_eq!(stats.failed_schedules, 1);
    assert!(stats.recent_schedules[0].error.as_deref().unwrap_or("").contains("timed out"));
}

#[tokio::test]
async fn identical_providers_rank_deterministically() {
    let reg = registry(vec![
        Arc::new(cpu_provider("delta", 0.05)),
        Arc::new(cpu_provider("alpha", 0.05)),
        Arc::new(cpu_provider("charlie", 0.05)),
    ])
    .await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    for i in 0..10 {
        let result = scheduler.schedule(&workload(&format!("w{i}"))).await.unwrap();
        assert_eq!(result.provider, "alpha");
        let alts: Vec<&str> = result.alternatives.iter().map(|a| a.provider.as_str()).collect();
        assert_eq!(alts, vec!["charlie", "delta"]);
    }
}

#[tokio::test]
async fn cost_increase_limit_filters_expensive_targets() {
    let reg = registry(vec![
        Arc::new(cpu_provider("budget", 0.50)),
        Arc::new(cpu_provider("premium", 3.00)),
    ])
    .await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    // Baseline 1.0/h, +20% allowed.
    let constraints = RescheduleConstraints {
        excluded_providers: vec!["budget".to_string()],
        max_cost_increase: Some(20.0),
        ..Default::default()
    };
    let err = scheduler.reschedule(&workload("w1"), &constraints).await.unwrap_err();
    assert!(matches!(err, SchedulerError::ConstraintViolation { .. }));
    assert!(err.is_no_candidates());

    let open = RescheduleConstraints {
        max_cost_increase: Some(20.0),
        ..Default::default()
    };
    let result = scheduler.reschedule(&workload("w1"), &open).await.unwrap();
    assert_eq!(result.provider, "budget");
}

#[tokio::test]
async fn preferred_regions_steer_region_choice() {
    let reg = registry(vec![Arc::new(cpu_provider("k8s", 0.05))]).await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    let spec = workload("w1").with_region("us-east-1");
    assert_eq!(scheduler.schedule(&spec).await.unwrap().region, "us-east-1");

    let constraints = RescheduleConstraints {
        preferred_regions: vec!["eu-west-1".to_string(), "us-west-2".to_string()],
        ..Default::default()
    };
    let result = scheduler.reschedule(&spec, &constraints).await.unwrap();
    assert_eq!(result.region, "us-west-2");
}

#[tokio::test]
async fn preference_only_breaks_ties() {
    let reg = registry(vec![
        Arc::new(cpu_provider("cheap", 0.05)),
        Arc::new(cpu_provider("pricey", 0.60)),
    ])
    .await;
    let config = SchedulerConfig {
        default_policy: SchedulingPolicy {
            preferred_providers: vec!["pricey".to_string()],
            ..SchedulingPolicy::for_strategy(Strategy::PerformanceOptimized)
        },
        ..SchedulerConfig::default()
    };
    let scheduler = Scheduler::new(reg, config);

    // Preference is a tie-break, not a score bonus.
    let recs = scheduler.get_recommendations(&workload("w1")).await.unwrap();
    assert_eq!(recs[0].provider, "cheap");
    assert!(recs[1].pros.contains(&"Preferred provider".to_string()));
}

#[tokio::test]
async fn stats_track_many_schedules() {
    let reg = registry(vec![
        Arc::new(cpu_provider("a", 0.05)),
        Arc::new(cpu_provider("b", 0.10)),
    ])
    .await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    let total = MAX_RECENT_SCHEDULES + 20;
    for i in 0..total {
        scheduler.schedule(&workload(&format!("w{i}"))).await.unwrap();
    }

    let stats = scheduler.stats().await;
    assert_eq!(stats.total_schedules, total as u64);
    assert_eq!(stats.successful_schedules, total as u64);
    assert_eq!(stats.recent_schedules.len(), MAX_RECENT_SCHEDULES);
    assert_eq!(stats.recent_schedules.back().unwrap().workload_id, format!("w{}", total - 1));
    assert_eq!(stats.provider_stats["a"].total_scheduled, total as u64);
    assert!(!stats.provider_stats.contains_key("b"));
    assert_eq!(stats.success_ratio(), 1.0);
}

#[tokio::test]
async fn concurrent_schedules_are_all_counted() {
    let reg = registry(vec![
        Arc::new(cpu_provider("a", 0.05)),
        Arc::new(cpu_provider("b", 0.10)),
    ])
    .await;
    let scheduler = Arc::new(Scheduler::new(reg, SchedulerConfig::default()));

    let mut handles = Vec::new();
    for i in 0..32 {
        let scheduler = scheduler.clone();
        handles.push(tokio::spawn(async move {
            scheduler.schedule(&workload(&format!("w{i}"))).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().provider, "a");
    }

    let stats = scheduler.stats().await;
    assert_eq!(stats.total_schedules, 32);
    assert_eq!(stats.recent_schedules.len(), 32);
}

#[tokio::test]
async fn schedule_result_serializes_as_event() {
    let reg = registry(vec![Arc::new(cpu_provider("k8s", 0.05))]).await;
    let scheduler = Scheduler::new(reg, SchedulerConfig::default());

    let result = scheduler.schedule(&workload("w1")).await.unwrap();
    let event = serde_json::to_value(result.event()).unwrap();
    assert_eq!(event["kind"], "scheduled");
    assert_eq!(event["workload_id"], "w1");
    assert_eq!(event["provider"], "k8s");
}
