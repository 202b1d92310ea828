//! Data shapes shared by the provider contract, the placement scorer,
//! and the scheduler.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::resources::{ResourceRequirement, ResourceSpec};

/// Unique identifier for a workload.
pub type WorkloadId = String;

/// Name a provider is registered under.
pub type ProviderName = String;

// ── Workload ───────────────────────────────────────────────────────

/// A workload as submitted for placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkloadSpec {
    pub id: WorkloadId,
    pub name: String,
    /// Container image or artifact reference handed to the provider.
    #[serde(default)]
    pub image: String,
    /// Raw resource ask, canonicalized at scheduling time.
    pub resources: ResourceSpec,
    /// Region the workload would like to run in, if it cares.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl WorkloadSpec {
    pub fn new(id: impl Into<String>, resources: ResourceSpec) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            image: String::new(),
            resources,
            region: None,
            labels: HashMap::new(),
            env: HashMap::new(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Canonical requirement derived from the raw resource spec.
    pub fn requirement(&self) -> ResourceRequirement {
        ResourceRequirement::from_spec(&self.resources)
    }
}

// ── Cost ───────────────────────────────────────────────────────────

/// Hours in an average month, used to project monthly cost.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Projected spend for one placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimatedCost {
    pub hourly: f64,
    pub daily: f64,
    pub monthly: f64,
    pub currency: String,
}

impl EstimatedCost {
    pub fn from_hourly(hourly: f64, currency: impl Into<String>) -> Self {
        Self {
            hourly,
            daily: hourly * 24.0,
            monthly: hourly * HOURS_PER_MONTH,
            currency: currency.into(),
        }
    }
}

// ── Scoring output ─────────────────────────────────────────────────

/// One scored, non-committed candidate placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub provider: ProviderName,
    pub region: String,
    pub machine_type: String,
    /// Composite score, higher is better. See `polyplace_placement::scorer`
    /// for the range.
    pub score: f64,
    pub estimated_cost: EstimatedCost,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    /// 0.0..=1.0
    pub confidence: f64,
    /// A specific GPU model was asked for and this candidate offers another.
    #[serde(default)]
    pub gpu_substituted: bool,
}

/// The committed outcome of a schedule call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacementDecision {
    pub provider: ProviderName,
    pub region: String,
    #[serde(default)]
    pub zone: Option<String>,
    pub machine_type: String,
    #[serde(default)]
    pub node_id: Option<String>,
    pub score: f64,
    pub reasons: Vec<String>,
}

impl From<&Recommendation> for PlacementDecision {
    fn from(rec: &Recommendation) -> Self {
        Self {
            provider: rec.provider.clone(),
            region: rec.region.clone(),
            zone: None,
            machine_type: rec.machine_type.clone(),
            node_id: None,
            score: rec.score,
            reasons: rec.pros.clone(),
        }
    }
}

/// A runner-up placement returned alongside the decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alternative {
    /// 1 is the chosen placement, so alternatives start at 2.
    pub rank: usize,
    pub provider: ProviderName,
    pub region: String,
    pub machine_type: String,
    pub score: f64,
    pub estimated_cost: EstimatedCost,
    pub reason: String,
}
