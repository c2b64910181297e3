//! Report payload (typed schema consumed by external renderers)

use crate::error::Result;
use crate::querylog::DatabaseStats;
use crate::sampler::Sample;
use crate::stats::{self, Trend};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MemoryLeak,
    HighMemoryUsage,
    IncreasingMemoryTrend,
    ExcessiveQueries,
    HighQueryCount,
    SlowQueries,
    RepetitiveQueries,
    LargeQueryLog,
}

/// One detected problem, surfaced in the report's analysis block.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
    pub severity: Severity,
}

/// The complete report payload for one profiling session.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub command: CommandInfo,
    pub execution: ExecutionInfo,
    pub memory: MemoryReport,
    pub samples: Vec<Sample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseStats>,
    pub analysis: Analysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<SampleStatistics>,
    pub performance_metrics: PerformanceMetrics,
    pub efficiency_score: EfficiencyScore,
    pub generated_at: String,
}

impl ProfileReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandInfo {
    pub name: String,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionInfo {
    /// Unix timestamp (seconds) when the session started.
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryReport {
    pub initial_usage: u64,
    pub final_usage: u64,
    pub peak_usage: u64,
    pub difference: i64,
    pub threshold_exceeded: bool,
    pub trend: Trend,
    pub leak_detected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub memory_leak_detected: bool,
    pub memory_trend: Trend,
    pub query_count: u64,
    pub potential_issues: Vec<Issue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Percentiles {
    #[serde(rename = "25th")]
    pub p25: f64,
    #[serde(rename = "75th")]
    pub p75: f64,
    #[serde(rename = "90th")]
    pub p90: f64,
    #[serde(rename = "95th")]
    pub p95: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub mean: f64,
    pub median: f64,
    pub std_deviation: f64,
    pub min: u64,
    pub max: u64,
    pub range: u64,
    pub percentiles: Percentiles,
}

#[derive(Debug, Clone, Serialize)]
pub struct DifferenceStats {
    pub mean: f64,
    pub median: f64,
    pub positive_count: usize,
    pub negative_count: usize,
    pub zero_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplingStats {
    pub total_samples: usize,
    pub duration: f64,
    pub average_interval: f64,
}

/// Statistical breakdown of the sample series.
#[derive(Debug, Clone, Serialize)]
pub struct SampleStatistics {
    pub memory_usage: UsageStats,
    pub memory_differences: DifferenceStats,
    pub sampling: SamplingStats,
}

impl SampleStatistics {
    /// `None` for an empty sample set.
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let usages: Vec<u64> = samples.iter().map(|s| s.memory_usage).collect();
        let usage_values: Vec<f64> = usages.iter().map(|v| *v as f64).collect();
        let differences: Vec<i64> = samples.iter().map(|s| s.memory_difference).collect();
        let difference_values: Vec<f64> = differences.iter().map(|v| *v as f64).collect();
        let elapsed: Vec<f64> = samples.iter().map(|s| s.elapsed_time).collect();

        let min = usages.iter().copied().min().unwrap_or(0);
        let max = usages.iter().copied().max().unwrap_or(0);

        let first_elapsed = elapsed.iter().copied().fold(f64::INFINITY, f64::min);
        let last_elapsed = elapsed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = last_elapsed - first_elapsed;

        Some(Self {
            memory_usage: UsageStats {
                mean: stats::mean(&usage_values),
                median: stats::median(&usage_values),
                std_deviation: stats::std_deviation(&usage_values),
                min,
                max,
                range: max - min,
                percentiles: Percentiles {
                    p25: stats::percentile(&usage_values, 25.0),
                    p75: stats::percentile(&usage_values, 75.0),
                    p90: stats::percentile(&usage_values, 90.0),
                    p95: stats::percentile(&usage_values, 95.0),
                },
            },
            memory_differences: DifferenceStats {
                mean: stats::mean(&difference_values),
                median: stats::median(&difference_values),
                positive_count: differences.iter().filter(|d| **d > 0).count(),
                negative_count: differences.iter().filter(|d| **d < 0).count(),
                zero_count: differences.iter().filter(|d| **d == 0).count(),
            },
            sampling: SamplingStats {
                total_samples: samples.len(),
                duration: span,
                average_interval: if samples.len() > 1 {
                    span / (samples.len() - 1) as f64
                } else {
                    0.0
                },
            },
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceMetrics {
    pub memory_efficiency: f64,
    pub stability_score: f64,
    pub leak_probability: f64,
    pub performance_grade: String,
}

/// Composite efficiency scores, rounded to two decimals.
#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyScore {
    pub overall: f64,
    pub memory_efficiency: f64,
    pub stability: f64,
    pub leak_resistance: f64,
    pub database_efficiency: f64,
    pub grade: String,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Human-readable byte count; negative inputs clamp to zero.
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let bytes = bytes.max(0) as u64;
    if bytes < 1024 {
        return format!("{} {}", bytes, UNITS[0]);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
