//! Profiling session controller
//!
//! Orchestrates the memory tracker and the query tracker over one
//! start/stop session and assembles the report payload when it ends.

use crate::collector::MemoryReader;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::querylog::{DatabaseStats, QueryTracker};
use crate::report::{
    round2, Analysis, CommandInfo, EfficiencyScore, ExecutionInfo, Issue, IssueKind, MemoryReport,
    PerformanceMetrics, ProfileReport, SampleStatistics, Severity,
};
use crate::sampler::{unix_now, MemoryTracker, Sample};
use crate::stats::{self, Trend};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Compact numbers for console display.
#[derive(Debug, Clone)]
pub struct ProfileSummary {
    pub peak_memory: u64,
    pub final_memory: u64,
    pub memory_difference: i64,
    pub execution_time: f64,
    pub sample_count: usize,
}

/// One profiling session at a time: `start` fails while running, `stop`
/// fails while idle.
pub struct MemoryProfiler {
    config: Config,
    tracker: MemoryTracker,
    queries: QueryTracker,
    running: bool,
    command: String,
    arguments: Vec<String>,
    start_time: f64,
}

impl MemoryProfiler {
    pub fn new(config: Config, reader: Arc<dyn MemoryReader>) -> Self {
        let tracker = MemoryTracker::new(reader, Duration::from_millis(config.sampling.interval_ms))
            .with_background(config.sampling.background);
        Self {
            config,
            tracker,
            queries: QueryTracker::new(),
            running: false,
            command: String::new(),
            arguments: Vec::new(),
            start_time: 0.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin profiling the named command. Delegates to the memory
    /// tracker and, when enabled, the query tracker.
    pub fn start(&mut self, command: &str, arguments: &[String]) -> Result<()> {
        if self.running {
            return Err(Error::AlreadyTracking);
        }

        self.command = command.to_string();
        self.arguments = arguments.to_vec();
        self.start_time = unix_now();

        self.tracker.start()?;
        if self.config.database.track_queries {
            self.queries.start();
        }
        self.running = true;
        info!("profiling started for {}", self.command);
        Ok(())
    }

    /// Stop profiling and assemble the report payload.
    pub fn stop(&mut self) -> Result<ProfileReport> {
        if !self.running {
            return Err(Error::NotTracking);
        }
        self.running = false;

        let samples = self.tracker.stop()?;
        let database = if self.config.database.track_queries {
            Some(self.queries.stop())
        } else {
            None
        };

        info!(
            "profiling stopped for {} ({} samples)",
            self.command,
            samples.len()
        );
        Ok(self.build_report(samples, database))
    }

    /// Tag the most recent sample with a phase label.
    pub fn checkpoint(&self, label: &str) -> Option<Sample> {
        self.tracker.checkpoint(label)
    }

    /// Feed one executed query into the session's query telemetry.
    pub fn record_query(&mut self, sql: &str, time_ms: f64) {
        self.queries.record(sql, time_ms);
    }

    pub fn tracker(&self) -> &MemoryTracker {
        &self.tracker
    }

    /// `None` before the first session ever produced a sample.
    pub fn summary(&self) -> Option<ProfileSummary> {
        let stats = self.tracker.statistics()?;
        Some(ProfileSummary {
            peak_memory: stats.memory.peak,
            final_memory: stats.memory.current,
            memory_difference: stats.memory.difference,
            execution_time: stats.duration,
            sample_count: stats.sample_count,
        })
    }

    fn build_report(&self, samples: Vec<Sample>, database: Option<DatabaseStats>) -> ProfileReport {
        let usages: Vec<u64> = samples.iter().map(|s| s.memory_usage).collect();
        let differences: Vec<i64> = samples.iter().map(|s| s.memory_difference).collect();

        let initial = self
            .tracker
            .start_memory()
            .unwrap_or_else(|| samples.first().map_or(0, |s| s.memory_usage));
        let final_usage = usages.last().copied().unwrap_or(0);
        let peak = samples.iter().map(|s| s.peak_memory).max().unwrap_or(0);
        let difference = differences.last().copied().unwrap_or(0);
        let duration = samples.last().map_or(0.0, |s| s.elapsed_time);

        let threshold = self.config.memory.threshold_bytes;
        let trend = stats::trend(&usages);
        let leak_detected = stats::leak_detected(&differences);
        let threshold_exceeded = peak > threshold;

        let memory_efficiency = stats::memory_efficiency(&usages, threshold);
        let stability = stats::stability_score(&usages);
        let leak_probability = stats::leak_probability(&differences, trend);
        let database_efficiency = stats::database_efficiency(database.as_ref());
        let leak_resistance = 100.0 - leak_probability;
        let overall =
            (memory_efficiency + stability + leak_resistance + database_efficiency) / 4.0;

        let mut potential_issues =
            self.memory_issues(leak_detected, threshold_exceeded, trend);
        if let Some(db) = &database {
            potential_issues.extend(db.potential_issues.iter().cloned());
        }

        ProfileReport {
            command: CommandInfo {
                name: self.command.clone(),
                arguments: self.arguments.clone(),
            },
            execution: ExecutionInfo {
                start_time: self.start_time,
                end_time: unix_now(),
                duration,
            },
            memory: MemoryReport {
                initial_usage: initial,
                final_usage,
                peak_usage: peak,
                difference,
                threshold_exceeded,
                trend,
                leak_detected,
            },
            analysis: Analysis {
                memory_leak_detected: leak_detected,
                memory_trend: trend,
                query_count: database.as_ref().map_or(0, |db| db.total_queries),
                potential_issues,
            },
            statistics: SampleStatistics::from_samples(&samples),
            performance_metrics: PerformanceMetrics {
                memory_efficiency,
                stability_score: stability,
                leak_probability,
                performance_grade: stats::performance_grade(
                    memory_efficiency,
                    stability,
                    leak_probability,
                )
                .to_string(),
            },
            efficiency_score: EfficiencyScore {
                overall: round2(overall),
                memory_efficiency: round2(memory_efficiency),
                stability: round2(stability),
                leak_resistance: round2(leak_resistance),
                database_efficiency: round2(database_efficiency),
                grade: stats::score_to_grade(overall).to_string(),
            },
            samples,
            database,
            generated_at: Utc::now().to_rfc3339(),
        }
    }

    fn memory_issues(
        &self,
        leak_detected: bool,
        threshold_exceeded: bool,
        trend: Trend,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();
        if leak_detected {
            issues.push(Issue {
                kind: IssueKind::MemoryLeak,
                message: "Memory leak detected - final memory usage is higher than initial"
                    .to_string(),
                severity: Severity::High,
            });
        }
        if threshold_exceeded {
            issues.push(Issue {
                kind: IssueKind::HighMemoryUsage,
                message: "High memory usage detected - exceeded configured threshold".to_string(),
                severity: Severity::High,
            });
        }
        if trend == Trend::Increasing {
            issues.push(Issue {
                kind: IssueKind::IncreasingMemoryTrend,
                message: "Memory usage is consistently increasing over time".to_string(),
                severity: Severity::Medium,
            });
        }
        issues
    }
}
