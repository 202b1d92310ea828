//! polyplace-scheduler — the multi-provider scheduling engine.
//!
//! Given a workload and a registry of providers, the [`Scheduler`] asks
//! every provider for health, pricing, and capacity, scores the candidates
//! with `polyplace-placement`, and returns the best placement plus ranked
//! alternatives.
//!
//! # Components
//!
//! - **`scheduler`** — schedule, recommend, reschedule, health check
//! - **`stats`** — counters, per-provider running averages, recent ring
//! - **`error`** — scheduling failures

pub mod error;
pub mod scheduler;
pub mod stats;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{
    ASSUMED_BASELINE_HOURLY_COST, RescheduleConstraints, ScheduleResult, Scheduler,
    SchedulingEvent, SchedulingEventKind,
};
pub use stats::{MAX_RECENT_SCHEDULES, ProviderStats, ScheduleRecord, SchedulerStats};
