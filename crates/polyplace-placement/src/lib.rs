//! polyplace placement — machine sizing, cost estimation, and scoring.
//!
//! This crate decides how good one provider is for one workload. It does
//! no I/O: the scheduler gathers provider snapshots and hands them here.
//!
//! # Components
//!
//! - **`machine`** — requirement → machine-type label (CPU ladder or GPU tier)
//! - **`scorer`** — cost estimate, weighted score, deterministic ranking
//! - **`evaluate`** — capacity/policy filters, region choice, recommendation

pub mod evaluate;
pub mod machine;
pub mod scorer;

pub use evaluate::{CandidateContext, DEFAULT_CONFIDENCE, Rejection, evaluate_candidate, select_region};
pub use machine::{GENERIC_GPU_MACHINE, MACHINE_TIERS, MachineSelection, MachineTier, cpu_tier, select_machine_type};
pub use scorer::{
    BASE_SCORE, ScoreBreakdown, SignalSource, StaticSignals, cost_subscore, estimate_hourly_cost,
    max_score, rank_recommendations, score_candidate,
};
