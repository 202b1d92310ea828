//! Canonical resource model.
//!
//! Providers quote capacity in their own syntax (`"2000m"` millicores,
//! `"4Gi"` memory, `"a100=2"` GPUs). Everything here converts that syntax
//! into plain numbers so candidates from different backends can be compared.
//!
//! All parsers are total: malformed input falls back to a default instead
//! of failing, so a sloppy workload spec still gets scheduled.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cores assumed when the CPU spec is empty or unparseable.
pub const DEFAULT_CPU_CORES: f64 = 1.0;

/// Gigabytes assumed when the memory spec is empty or unparseable.
pub const DEFAULT_MEMORY_GB: f64 = 4.0;

/// Raw, provider-style resource ask as it arrives on a workload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceSpec {
    /// CPU quantity: `"2"`, `"0.5"`, `"2000m"`.
    #[serde(default)]
    pub cpu: String,
    /// Memory quantity: `"4Gi"`, `"512Mi"`, `"8G"`, `"16"` (GB).
    #[serde(default)]
    pub memory: String,
    /// GPU ask: `"a100=2"`, `"1"`, or empty for none.
    #[serde(default)]
    pub gpu: String,
}

impl ResourceSpec {
    pub fn new(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            cpu: cpu.into(),
            memory: memory.into(),
            gpu: String::new(),
        }
    }

    pub fn with_gpu(mut self, gpu: impl Into<String>) -> Self {
        self.gpu = gpu.into();
        self
    }
}

/// A GPU ask after canonicalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GpuRequirement {
    /// GPU model name (`"a100"`). Empty when any model will do.
    pub gpu_type: String,
    pub count: u32,
}

impl GpuRequirement {
    /// Whether a specific GPU model was asked for.
    pub fn has_type(&self) -> bool {
        !self.gpu_type.is_empty()
    }
}

impl fmt::Display for GpuRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gpu_type.is_empty() {
            write!(f, "{}", self.count)
        } else {
            write!(f, "{}={}", self.gpu_type, self.count)
        }
    }
}

/// A canonicalized compute ask.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRequirement {
    pub cpu_cores: f64,
    pub memory_gb: f64,
    pub gpu: Option<GpuRequirement>,
}

impl ResourceRequirement {
    /// Canonicalize a raw [`ResourceSpec`].
    pub fn from_spec(spec: &ResourceSpec) -> Self {
        Self {
            cpu_cores: canonical_cpu(&spec.cpu),
            memory_gb: canonical_memory(&spec.memory),
            gpu: canonical_gpu(&spec.gpu),
        }
    }

    /// Number of GPUs requested (0 when none).
    pub fn gpu_count(&self) -> u32 {
        self.gpu.as_ref().map_or(0, |g| g.count)
    }

    /// Whether at least one GPU is requested.
    pub fn wants_gpu(&self) -> bool {
        self.gpu_count() > 0
    }
}

/// Parse a CPU quantity into cores.
///
/// `"2000m"` → 2.0, `"1.5"` → 1.5. Empty or malformed → [`DEFAULT_CPU_CORES`].
pub fn canonical_cpu(spec: &str) -> f64 {
    let s = spec.trim();
    if s.is_empty() {
        return DEFAULT_CPU_CORES;
    }

    let parsed = match s.strip_suffix('m') {
        Some(millis) => parse_quantity(millis).map(|v| v / 1000.0),
        None => parse_quantity(s),
    };

    parsed.unwrap_or_else(|| {
        debug!(spec, default = DEFAULT_CPU_CORES, "unrecognized cpu spec, using default");
        DEFAULT_CPU_CORES
    })
}

/// Parse a memory quantity into gigabytes.
///
/// Binary suffixes (`Gi`, `Mi`, `Ki`) divide by 1024, decimal suffixes
/// (`G`, `M`, `K`) by 1000. Bare numbers are already GB. Empty or
/// malformed → [`DEFAULT_MEMORY_GB`].
pub fn canonical_memory(spec: &str) -> f64 {
    let s = spec.trim();
    if s.is_empty() {
        return DEFAULT_MEMORY_GB;
    }

    const UNITS: [(&str, f64); 6] = [
        ("Gi", 1.0),
        ("Mi", 1024.0),
        ("Ki", 1024.0 * 1024.0),
        ("G", 1.0),
        ("M", 1000.0),
        ("K", 1000.0 * 1000.0),
    ];

    let parsed = UNITS
        .iter()
        .find_map(|(suffix, divisor)| {
            s.strip_suffix(suffix)
                .map(|num| parse_quantity(num).map(|v| v / divisor))
        })
        .unwrap_or_else(|| parse_quantity(s));

    parsed.unwrap_or_else(|| {
        debug!(spec, default = DEFAULT_MEMORY_GB, "unrecognized memory spec, using default");
        DEFAULT_MEMORY_GB
    })
}

/// Parse a GPU ask.
///
/// - `""` → `None` (no GPU requested)
/// - `"a100=2"` → `a100` × 2
/// - `"2"` → any model × 2
/// - `"a100"` → `a100` × 1
///
/// An unparseable count after `=` is treated as 1.
pub fn canonical_gpu(spec: &str) -> Option<GpuRequirement> {
    let s = spec.trim();
    if s.is_empty() {
        return None;
    }

    if let Some((gpu_type, count)) = s.split_once('=') {
        let count = count.trim().parse::<u32>().unwrap_or_else(|_| {
            debug!(spec, "unrecognized gpu count, assuming 1");
            1
        });
        return Some(GpuRequirement {
            gpu_type: gpu_type.trim().to_string(),
            count,
        });
    }

    match s.parse::<u32>() {
        Ok(count) => Some(GpuRequirement {
            gpu_type: String::new(),
            count,
        }),
        Err(_) => Some(GpuRequirement {
            gpu_type: s.to_string(),
            count: 1,
        }),
    }
}

/// Parse a non-negative, finite decimal.
fn parse_quantity(s: &str) -> Option<f64> {
    let v = s.trim().parse::<f64>().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v)
}
