//! Rolling scheduler statistics.
//!
//! [`SchedulerStats`] is a plain accumulator. The scheduler owns one behind
//! a mutex and hands out clones, so readers always see a whole update.

use std::collections::{BTreeMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Capacity of the recent-schedule ring.
pub const MAX_RECENT_SCHEDULES: usize = 100;

/// One schedule or reschedule attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleRecord {
    pub workload_id: String,
    /// Chosen provider; `None` when the attempt failed before choosing one.
    pub provider: Option<String>,
    pub region: Option<String>,
    pub machine_type: Option<String>,
    pub score: Option<f64>,
    pub hourly_cost: Option<f64>,
    pub success: bool,
    pub rescheduled: bool,
    /// Failure message for unsuccessful attempts.
    pub error: Option<String>,
    /// Unix timestamp (seconds).
    pub timestamp: u64,
}

impl ScheduleRecord {
    /// A failed attempt that never reached a provider.
    pub fn failure(workload_id: &str, error: impl Into<String>, rescheduled: bool) -> Self {
        Self {
            workload_id: workload_id.to_string(),
            provider: None,
            region: None,
            machine_type: None,
            score: None,
            hourly_cost: None,
            success: false,
            rescheduled,
            error: Some(error.into()),
            timestamp: epoch_secs(),
        }
    }
}

/// Rolling telemetry for one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderStats {
    pub total_scheduled: u64,
    /// Running average of outcomes, always within 0.0..=1.0.
    pub success_rate: f64,
    /// Running average of hourly cost over attempts that quoted one.
    pub average_cost: f64,
    cost_samples: u64,
    /// Unix timestamp (seconds) of the latest attempt.
    pub last_scheduled: u64,
}

impl ProviderStats {
    /// Fold one outcome into the running averages.
    pub fn record(&mut self, success: bool, hourly_cost: Option<f64>, timestamp: u64) {
        self.total_scheduled += 1;
        let n = self.total_scheduled as f64;
        let outcome = if success { 1.0 } else { 0.0 };
        // Clamp absorbs float rounding only; the average itself stays in range.
        self.success_rate = (self.success_rate * (n - 1.0) / n + outcome / n).clamp(0.0, 1.0);

        if let Some(cost) = hourly_cost {
            self.cost_samples += 1;
            self.average_cost += (cost - self.average_cost) / self.cost_samples as f64;
        }
        self.last_scheduled = timestamp;
    }
}

/// Engine-wide telemetry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchedulerStats {
    pub total_schedules: u64,
    pub successful_schedules: u64,
    pub failed_schedules: u64,
    pub provider_stats: BTreeMap<String, ProviderStats>,
    /// Most recent attempts, oldest first, at most [`MAX_RECENT_SCHEDULES`].
    pub recent_schedules: VecDeque<ScheduleRecord>,
    /// Unix timestamp (seconds).
    pub last_updated: u64,
}

impl SchedulerStats {
    /// Record one attempt.
    pub fn record(&mut self, record: ScheduleRecord) {
        self.total_schedules += 1;
        if record.success {
            self.successful_schedules += 1;
        } else {
            self.failed_schedules += 1;
        }

        if let Some(provider) = &record.provider {
            self.provider_stats
                .entry(provider.clone())
                .or_default()
                .record(record.success, record.hourly_cost, record.timestamp);
        }

        self.last_updated = record.timestamp;
        self.push_recent(record);
    }

    /// Fold a later outcome for an existing placement into the provider's
    /// stats without counting a new scheduling attempt.
    pub fn record_provider_outcome(&mut self, provider: &str, success: bool) {
        let now = epoch_secs();
        self.provider_stats
            .entry(provider.to_string())
            .or_default()
            .record(success, None, now);
        self.last_updated = now;
    }

    /// Success ratio across all attempts, 0.0 before the first one.
    pub fn success_ratio(&self) -> f64 {
        if self.total_schedules == 0 {
            0.0
        } else {
            self.successful_schedules as f64 / self.total_schedules as f64
        }
    }

    fn push_recent(&mut self, record: ScheduleRecord) {
        if self.recent_schedules.len() == MAX_RECENT_SCHEDULES {
            self.recent_schedules.pop_front();
        }
        self.recent_schedules.push_back(record);
    }
}

/// Current Unix epoch in seconds.
pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
