//! Statistical analysis over memory samples
//!
//! Pure functions over fixed value sequences. Every function degrades to
//! a zero or neutral result on empty input instead of returning an error.

use crate::querylog::DatabaseStats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of memory change over a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of a value set; the average of the two middle elements for
/// even cardinality.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Population standard deviation (divides by n).
pub fn std_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percentile by linear interpolation at position `p/100 * (n-1)`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let index = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Classify the memory trend from first vs last usage, with a 5%
/// relative-change threshold.
pub fn trend(usages: &[u64]) -> Trend {
    if usages.len() < 2 {
        return Trend::InsufficientData;
    }
    let first = usages[0] as f64;
    let last = usages[usages.len() - 1] as f64;
    if first == 0.0 {
        return if last > 0.0 {
            Trend::Increasing
        } else {
            Trend::Stable
        };
    }

    let change = (last - first) / first;
    if change > 0.05 {
        Trend::Increasing
    } else if change < -0.05 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// A leak is flagged when the final sample still sits above the
/// session's starting memory.
pub fn leak_detected(differences: &[i64]) -> bool {
    differences.last().map_or(false, |d| *d > 0)
}

/// Memory efficiency score in [0,100]: average usage relative to peak,
/// penalized once the peak exceeds the configured threshold.
pub fn memory_efficiency(usages: &[u64], threshold_bytes: u64) -> f64 {
    if usages.is_empty() {
        return 0.0;
    }
    let peak = usages.iter().copied().max().unwrap_or(0) as f64;
    if peak == 0.0 {
        return 100.0;
    }
    let values: Vec<f64> = usages.iter().map(|v| *v as f64).collect();
    let mut efficiency = mean(&values) / peak * 100.0;

    let threshold = threshold_bytes as f64;
    if threshold > 0.0 && peak > threshold {
        let penalty = ((peak - threshold) / threshold * 50.0).min(50.0);
        efficiency -= penalty;
    }

    efficiency.clamp(0.0, 100.0)
}

/// Stability score in [0,100]: 100 minus the coefficient of variation
/// expressed as a percentage. A non-positive mean counts as maximally
/// unstable.
pub fn stability_score(usages: &[u64]) -> f64 {
    if usages.is_empty() {
        return 0.0;
    }
    let values: Vec<f64> = usages.iter().map(|v| *v as f64).collect();
    let avg = mean(&values);
    let cov = if avg > 0.0 {
        std_deviation(&values) / avg
    } else {
        1.0
    };
    (100.0 - cov * 100.0).clamp(0.0, 100.0)
}

/// Leak probability in [0,100]: half-weight for the fraction of samples
/// above the starting memory, plus 50 when the final sample is above it,
/// plus 30 on an increasing trend, capped at 100.
pub fn leak_probability(differences: &[i64], trend: Trend) -> f64 {
    if differences.is_empty() {
        return 0.0;
    }
    let positive = differences.iter().filter(|d| **d > 0).count() as f64;
    let ratio = positive / differences.len() as f64;
    let final_increase = if differences.last().copied().unwrap_or(0) > 0 {
        50.0
    } else {
        0.0
    };
    let trend_penalty = if trend == Trend::Increasing { 30.0 } else { 0.0 };

    (ratio * 50.0 + final_increase + trend_penalty).min(100.0)
}

/// Database efficiency score in [0,100]: starts at 100, penalized for
/// high query counts and slow average query time. Absent statistics
/// score a neutral 100.
pub fn database_efficiency(database: Option<&DatabaseStats>) -> f64 {
    let Some(db) = database else {
        return 100.0;
    };
    let mut score = 100.0;
    if db.total_queries > 1000 {
        score -= ((db.total_queries - 1000) as f64 / 100.0).min(50.0);
    }
    if db.average_time > 100.0 {
        score -= ((db.average_time - 100.0) / 10.0).min(30.0);
    }
    score.clamp(0.0, 100.0)
}

/// Coarse grade over the three memory metrics.
pub fn performance_grade(efficiency: f64, stability: f64, leak_probability: f64) -> &'static str {
    let overall = (efficiency + stability + (100.0 - leak_probability)) / 3.0;
    if overall >= 90.0 {
        "A+"
    } else if overall >= 80.0 {
        "A"
    } else if overall >= 70.0 {
        "B"
    } else if overall >= 60.0 {
        "C"
    } else if overall >= 50.0 {
        "D"
    } else {
        "F"
    }
}

/// Fine-grained grade for the composite efficiency score, in 5-point
/// bands from 95 down to 50.
pub fn score_to_grade(score: f64) -> &'static str {
    if score >= 95.0 {
        "A+"
    } else if score >= 90.0 {
        "A"
    } else if score >= 85.0 {
        "A-"
    } else if score >= 80.0 {
        "B+"
    } else if score >= 75.0 {
        "B"
    } else if score >= 70.0 {
        "B-"
    } else if score >= 65.0 {
        "C+"
    } else if score >= 60.0 {
        "C"
    } else if score >= 55.0 {
        "C-"
    } else if score >= 50.0 {
        "D"
    } else {
        "F"
    }
}
