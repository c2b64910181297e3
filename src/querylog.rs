//! Database query telemetry
//!
//! The tracker does not hook a database driver itself; the wrapping
//! application feeds it one event per executed query and reads the
//! aggregated statistics back when profiling stops.

use crate::report::{Issue, IssueKind, Severity};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct QueryRecord {
    pub sql: String,
    pub time_ms: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryTypeStats {
    pub count: u64,
    pub total_time: f64,
    pub average_time: f64,
}

/// Aggregated query statistics for one profiling session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseStats {
    pub total_queries: u64,
    pub total_time: f64,
    pub average_time: f64,
    pub query_types: HashMap<String, QueryTypeStats>,
    pub potential_issues: Vec<Issue>,
}

/// Records query executions reported by the profiled workload.
#[derive(Debug, Default)]
pub struct QueryTracker {
    tracking: bool,
    queries: Vec<QueryRecord>,
    by_type: HashMap<String, QueryTypeStats>,
    total_time: f64,
}

impl QueryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: starting an active tracker is a no-op.
    pub fn start(&mut self) {
        if self.tracking {
            return;
        }
        self.tracking = true;
        self.queries.clear();
        self.by_type.clear();
        self.total_time = 0.0;
    }

    /// Idempotent: stopping an inactive tracker returns empty statistics.
    pub fn stop(&mut self) -> DatabaseStats {
        if !self.tracking {
            return DatabaseStats::default();
        }
        self.tracking = false;
        self.statistics()
    }

    /// Record one executed query. Ignored while not tracking.
    pub fn record(&mut self, sql: &str, time_ms: f64) {
        if !self.tracking {
            return;
        }
        self.total_time += time_ms;

        let kind = query_type(sql).to_string();
        let entry = self.by_type.entry(kind).or_default();
        entry.count += 1;
        entry.total_time += time_ms;
        entry.average_time = entry.total_time / entry.count as f64;

        self.queries.push(QueryRecord {
            sql: sql.to_string(),
            time_ms,
        });
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn query_count(&self) -> u64 {
        self.queries.len() as u64
    }

    pub fn statistics(&self) -> DatabaseStats {
        let total_queries = self.queries.len() as u64;
        DatabaseStats {
            total_queries,
            total_time: self.total_time,
            average_time: if total_queries > 0 {
                self.total_time / total_queries as f64
            } else {
                0.0
            },
            query_types: self.by_type.clone(),
            potential_issues: self.potential_issues(),
        }
    }

    fn potential_issues(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        let count = self.queries.len();

        if count > 1000 {
            issues.push(Issue {
                kind: IssueKind::ExcessiveQueries,
                message: format!("High number of queries ({}). Potential N+1 problem.", count),
                severity: Severity::High,
            });
        } else if count > 500 {
            issues.push(Issue {
                kind: IssueKind::HighQueryCount,
                message: format!("Moderate number of queries ({}). Consider optimization.", count),
                severity: Severity::Medium,
            });
        }

        let slow = self.queries.iter().filter(|q| q.time_ms > 1000.0).count();
        if slow > 0 {
            issues.push(Issue {
                kind: IssueKind::SlowQueries,
                message: format!("{} slow queries detected (>1s).", slow),
                severity: Severity::High,
            });
        }

        let mut occurrences: HashMap<&str, u64> = HashMap::new();
        for query in &self.queries {
            *occurrences.entry(query.sql.as_str()).or_insert(0) += 1;
        }
        let repetitive = occurrences.values().filter(|n| **n > 50).count();
        if repetitive > 0 {
            issues.push(Issue {
                kind: IssueKind::RepetitiveQueries,
                message: format!(
                    "{} repetitive queries detected. Consider caching or optimization.",
                    repetitive
                ),
                severity: Severity::Medium,
            });
        }

        if count > 10000 {
            issues.push(Issue {
                kind: IssueKind::LargeQueryLog,
                message: format!("Large query log ({} queries) may cause memory issues.", count),
                severity: Severity::High,
            });
        }

        issues
    }
}

/// Classify a statement by its leading SQL keyword.
pub fn query_type(sql: &str) -> &'static str {
    let sql = sql.trim_start().to_uppercase();
    for keyword in ["SELECT", "INSERT", "UPDATE", "DELETE", "CREATE", "ALTER", "DROP"] {
        if sql.starts_with(keyword) {
            return keyword;
        }
    }
    "OTHER"
}
