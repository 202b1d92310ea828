//! polyplace.toml configuration parser.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on alternatives returned with a placement.
pub const MAX_ALTERNATIVES_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolyplaceConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub default_policy: SchedulingPolicy,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
    /// Bound on one whole provider sweep.
    #[serde(default = "default_schedule_timeout", with = "duration_str")]
    pub schedule_timeout: Duration,
    /// How often integrators should refresh pricing. The engine queries
    /// pricing on every sweep and does not read this itself.
    #[serde(default = "default_cost_update_interval", with = "duration_str")]
    pub cost_update_interval: Duration,
}

fn default_max_alternatives() -> usize {
    3
}

fn default_schedule_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_cost_update_interval() -> Duration {
    Duration::from_secs(300)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_policy: SchedulingPolicy::default(),
            max_alternatives: default_max_alternatives(),
            schedule_timeout: default_schedule_timeout(),
            cost_update_interval: default_cost_update_interval(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_policy.validate()?;
        if self.max_alternatives > MAX_ALTERNATIVES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_alternatives {} exceeds limit {MAX_ALTERNATIVES_LIMIT}",
                self.max_alternatives
            )));
        }
        if self.schedule_timeout.is_zero() {
            return Err(ConfigError::Invalid("schedule_timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Named weighting presets.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Balanced,
    CostOptimized,
    PerformanceOptimized,
    HighAvailability,
    LowLatency,
}

/// Weights and hard filters applied while scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulingPolicy {
    #[serde(default)]
    pub strategy: Strategy,
    pub cost_weight: f64,
    pub performance_weight: f64,
    pub reliability_weight: f64,
    pub latency_weight: f64,
    /// Candidates quoting more than this per hour are dropped.
    #[serde(default)]
    pub max_cost_per_hour: Option<f64>,
    /// Providers that win ties and are called out in recommendation pros.
    #[serde(default)]
    pub preferred_providers: Vec<String>,
    /// Providers never considered.
    #[serde(default)]
    pub excluded_providers: Vec<String>,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self::for_strategy(Strategy::Balanced)
    }
}

impl SchedulingPolicy {
    /// Preset weights for a strategy. Every preset sums to 1.0.
    pub fn for_strategy(strategy: Strategy) -> Self {
        let (cost, performance, reliability, latency) = match strategy {
            Strategy::Balanced => (0.4, 0.3, 0.2, 0.1),
            Strategy::CostOptimized => (0.7, 0.1, 0.1, 0.1),
            Strategy::PerformanceOptimized => (0.1, 0.6, 0.2, 0.1),
            Strategy::HighAvailability => (0.1, 0.2, 0.6, 0.1),
            Strategy::LowLatency => (0.1, 0.2, 0.1, 0.6),
        };
        Self {
            strategy,
            cost_weight: cost,
            performance_weight: performance,
            reliability_weight: reliability,
            latency_weight: latency,
            max_cost_per_hour: None,
            preferred_providers: Vec::new(),
            excluded_providers: Vec::new(),
        }
    }

    pub fn is_excluded(&self, provider: &str) -> bool {
        self.excluded_providers.iter().any(|p| p == provider)
    }

    pub fn is_preferred(&self, provider: &str) -> bool {
        self.preferred_providers.iter().any(|p| p == provider)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("cost_weight", self.cost_weight),
            ("performance_weight", self.performance_weight),
            ("reliability_weight", self.reliability_weight),
            ("latency_weight", self.latency_weight),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }
        if let Some(max) = self.max_cost_per_hour {
            if !max.is_finite() || max < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "max_cost_per_hour must be a non-negative number, got {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Declarative provider entry, consumed by the provider registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub name: String,
    /// Factory tag, e.g. `"static"`.
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Adapter-specific settings.
    #[serde(default)]
    pub config: HashMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, provider_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider_type: provider_type.into(),
            enabled: true,
            config: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }
}

impl PolyplaceConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PolyplaceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(ConfigError::Invalid("provider name must not be empty".into()));
            }
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate provider name: {}",
                    provider.name
                )));
            }
        }
        Ok(())
    }

    /// A starter config with two static providers.
    pub fn scaffold() -> Self {
        PolyplaceConfig {
            scheduler: SchedulerConfig::default(),
            providers: vec![
                ProviderConfig::new("k8s", "static")
                    .with("regions", "us-east-1,us-west-2")
                    .with("cpu_cores", "256")
                    .with("memory_gb", "1024")
                    .with("price_per_core_hour", "0.04")
                    .with("price_per_gb_hour", "0.005"),
                ProviderConfig::new("gpu-market", "static")
                    .with("regions", "us-central")
                    .with("cpu_cores", "128")
                    .with("memory_gb", "512")
                    .with("price_per_core_hour", "0.03")
                    .with("price_per_gb_hour", "0.004")
                    .with("gpus", "a100:8:80:1.80,t4:16:16:0.35"),
            ],
        }
    }
}

/// Parse a duration string like `"500ms"`, `"30s"`, `"5m"`, `"1h"`.
/// A bare number is seconds. Values that overflow are rejected.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok()?.checked_mul(60).map(Duration::from_secs)
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.parse::<u64>().ok()?.checked_mul(3600).map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Render a duration in the largest whole unit [`parse_duration`] accepts.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 != 0 {
        return format!("{millis}ms");
    }
    let secs = d.as_secs();
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration: {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold_roundtrip() {
        let config = PolyplaceConfig::scaffold();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("gpu-market"));
        assert!(toml_str.contains("schedule_timeout = \"30s\""));

        let parsed = PolyplaceConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_parse_minimal() {
        let config = PolyplaceConfig::from_toml_str("").unwrap();
        assert_eq!(config.scheduler.max_alternatives, 3);
        assert_eq!(config.scheduler.schedule_timeout, Duration::from_secs(30));
        assert_eq!(config.scheduler.default_policy.strategy, Strategy::Balanced);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[scheduler]
max_alternatives = 2
schedule_timeout = "500ms"
cost_update_interval = "1h"

[scheduler.default_policy]
strategy = "cost_optimized"
cost_weight = 0.7
performance_weight = 0.1
reliability_weight = 0.1
latency_weight = 0.1
max_cost_per_hour = 5.0
excluded_providers = ["legacy"]

[[providers]]
name = "k8s"
type = "static"
[providers.config]
regions = "us-east-1"

[[providers]]
name = "legacy"
type = "static"
enabled = false
"#;
        let config = PolyplaceConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.scheduler.max_alternatives, 2);
        assert_eq!(config.scheduler.schedule_timeout, Duration::from_millis(500));
        assert_eq!(config.scheduler.cost_update_interval, Duration::from_secs(3600));
        let policy = &config.scheduler.default_policy;
        assert_eq!(policy.strategy, Strategy::CostOptimized);
        assert_eq!(policy.max_cost_per_hour, Some(5.0));
        assert!(policy.is_excluded("legacy"));
        assert_eq!(config.providers.len(), 2);
        assert!(config.providers[0].enabled);
        assert!(!config.providers[1].enabled);
        assert_eq!(config.providers[0].config["regions"], "us-east-1");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("polyplace.toml");
        std::fs::write(&path, PolyplaceConfig::scaffold().to_toml_string().unwrap()).unwrap();

        let config = PolyplaceConfig::from_file(&path).unwrap();
        assert_eq!(config.providers.len(), 2);

        let missing = PolyplaceConfig::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_rejects_out_of_range_weight() {
        let mut config = PolyplaceConfig::default();
        config.scheduler.default_policy.cost_weight = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_duplicate_providers() {
        let config = PolyplaceConfig {
            scheduler: SchedulerConfig::default(),
            providers: vec![
                ProviderConfig::new("a", "static"),
                ProviderConfig::new("a", "static"),
            ],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate provider name"));
    }

    #[test]
    fn test_rejects_zero_timeout_and_bad_duration() {
        let mut config = SchedulerConfig::default();
        config.schedule_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let bad = "[scheduler]\nschedule_timeout = \"soon\"\n";
        assert!(matches!(
            PolyplaceConfig::from_toml_str(bad),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_strategy_presets_sum_to_one() {
        for strategy in [
            Strategy::Balanced,
            Strategy::CostOptimized,
            Strategy::PerformanceOptimized,
            Strategy::HighAvailability,
            Strategy::LowLatency,
        ] {
            let p = SchedulingPolicy::for_strategy(strategy);
            let sum = p.cost_weight + p.performance_weight + p.reliability_weight + p.latency_weight;
            assert!((sum - 1.0).abs() < 1e-9, "{strategy:?} sums to {sum}");
            assert!(p.validate().is_ok());
        }
    }

    #[test]
    fn test_duration_helpers() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("7"), Some(Duration::from_secs(7)));
        assert_eq!(parse_duration("x"), None);
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::from_secs(300)), "5m");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn test_duration_overflow_is_a_config_error() {
        assert_eq!(parse_duration("18446744073709551615m"), None);
        assert_eq!(parse_duration("5124095576030432h"), None);
        assert_eq!(parse_duration("5124095576030431h"), Some(Duration::from_secs(5124095576030431 * 3600)));

        let huge = "[scheduler]\nschedule_timeout = \"18446744073709551615h\"\n";
        assert!(matches!(
            PolyplaceConfig::from_toml_str(huge),
            Err(ConfigError::Parse(_))
        ));
    }
}
