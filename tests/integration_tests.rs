//! End-to-end tests for the profiling session controller

use memprobe::collector::{MemoryReader, MemorySnapshot, ProcMemoryReader};
use memprobe::config::Config;
use memprobe::error::Error;
use memprobe::executor::Workload;
use memprobe::profiler::MemoryProfiler;
use memprobe::report::IssueKind;
use memprobe::stats::Trend;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const MIB: u64 = 1024 * 1024;

struct FakeReader {
    rss: AtomicU64,
    peak: AtomicU64,
}

impl FakeReader {
    fn new(rss: u64) -> Self {
        Self {
            rss: AtomicU64::new(rss),
            peak: AtomicU64::new(rss),
        }
    }

    fn set(&self, rss: u64) {
        self.rss.store(rss, Ordering::SeqCst);
        self.peak.fetch_max(rss, Ordering::SeqCst);
    }
}

impl MemoryReader for FakeReader {
    fn snapshot(&self) -> io::Result<MemorySnapshot> {
        Ok(MemorySnapshot {
            rss_bytes: self.rss.load(Ordering::SeqCst),
            peak_rss_bytes: self.peak.load(Ordering::SeqCst),
        })
    }
}

fn manual_config() -> Config {
    let mut config = Config::default();
    config.sampling.background = false;
    config
}

#[test]
fn test_profiler_lifecycle_errors() {
    let reader = Arc::new(FakeReader::new(10 * MIB));
    let mut profiler = MemoryProfiler::new(manual_config(), reader);

    assert!(matches!(profiler.stop(), Err(Error::NotTracking)));

    profiler.start("demo", &[]).unwrap();
    assert!(profiler.is_running());
    assert!(matches!(profiler.start("demo", &[]), Err(Error::AlreadyTracking)));

    profiler.stop().unwrap();
    assert!(!profiler.is_running());
    assert!(matches!(profiler.stop(), Err(Error::NotTracking)));

    // the controller can run a second session after the first closed
    profiler.start("demo", &[]).unwrap();
    profiler.stop().unwrap();
}

#[test]
fn test_report_payload_fields() {
    let reader = Arc::new(FakeReader::new(10 * MIB));
    let mut profiler = MemoryProfiler::new(manual_config(), Arc::clone(&reader) as Arc<dyn MemoryReader>);

    let args = vec!["--batch".to_string(), "50".to_string()];
    profiler.start("import-orders", &args).unwrap();

    reader.set(12 * MIB);
    profiler.checkpoint("after-load").unwrap();
    reader.set(11 * MIB);
    profiler.record_query("SELECT * FROM orders", 12.5);
    profiler.record_query("UPDATE orders SET state = 'done'", 3.0);

    let report = profiler.stop().unwrap();

    assert_eq!(report.command.name, "import-orders");
    assert_eq!(report.command.arguments, args);
    assert!(report.execution.end_time >= report.execution.start_time);

    assert_eq!(report.memory.initial_usage, 10 * MIB);
    assert_eq!(report.memory.final_usage, 11 * MIB);
    assert_eq!(report.memory.peak_usage, 12 * MIB);
    assert_eq!(report.memory.difference, MIB as i64);
    assert!(!report.memory.threshold_exceeded);
    assert_eq!(report.memory.trend, Trend::Increasing);
    assert!(report.memory.leak_detected);

    // initial, checkpoint, final
    assert_eq!(report.samples.len(), 3);
    assert_eq!(report.samples[1].label.as_deref(), Some("after-load"));

    let database = report.database.as_ref().unwrap();
    assert_eq!(database.total_queries, 2);
    assert_eq!(database.query_types["SELECT"].count, 1);
    assert_eq!(database.query_types["UPDATE"].count, 1);
    assert_eq!(report.analysis.query_count, 2);

    assert!(report.analysis.memory_leak_detected);
    assert_eq!(report.analysis.memory_trend, Trend::Increasing);
    let kinds: Vec<IssueKind> = report
        .analysis
        .potential_issues
        .iter()
        .map(|i| i.kind)
        .collect();
    assert!(kinds.contains(&IssueKind::MemoryLeak));
    assert!(kinds.contains(&IssueKind::IncreasingMemoryTrend));
    assert!(!kinds.contains(&IssueKind::HighMemoryUsage));

    let statistics = report.statistics.as_ref().unwrap();
    assert_eq!(statistics.sampling.total_samples, 3);
    assert_eq!(statistics.memory_usage.min, 10 * MIB);
    assert_eq!(statistics.memory_usage.max, 12 * MIB);
    assert_eq!(statistics.memory_usage.range, 2 * MIB);
    assert!(statistics.memory_usage.percentiles.p25 <= statistics.memory_usage.percentiles.p75);
    assert_eq!(statistics.memory_differences.positive_count, 2);
    assert_eq!(statistics.memory_differences.zero_count, 1);

    for score in [
        report.performance_metrics.memory_efficiency,
        report.performance_metrics.stability_score,
        report.performance_metrics.leak_probability,
        report.efficiency_score.overall,
        report.efficiency_score.database_efficiency,
    ] {
        assert!((0.0..=100.0).contains(&score), "score {} out of range", score);
    }
    assert_eq!(report.efficiency_score.database_efficiency, 100.0);
    assert!(!report.performance_metrics.performance_grade.is_empty());
    assert!(!report.efficiency_score.grade.is_empty());
    assert!(!report.generated_at.is_empty());

    let summary = profiler.summary().unwrap();
    assert_eq!(summary.sample_count, 3);
    assert_eq!(summary.peak_memory, 12 * MIB);
    assert_eq!(summary.final_memory, 11 * MIB);
    assert_eq!(summary.memory_difference, MIB as i64);
}

#[test]
fn test_threshold_exceeded_issue() {
    let reader = Arc::new(FakeReader::new(10 * MIB));
    let mut config = manual_config();
    config.memory.threshold_bytes = 64 * MIB;
    let mut profiler = MemoryProfiler::new(config, Arc::clone(&reader) as Arc<dyn MemoryReader>);

    profiler.start("heavy", &[]).unwrap();
    reader.set(100 * MIB);
    profiler.tracker().collect_sample().unwrap();
    let report = profiler.stop().unwrap();

    assert!(report.memory.threshold_exceeded);
    assert!(report
        .analysis
        .potential_issues
        .iter()
        .any(|i| i.kind == IssueKind::HighMemoryUsage));
}

#[test]
fn test_database_block_absent_when_disabled() {
    let reader = Arc::new(FakeReader::new(10 * MIB));
    let mut config = manual_config();
    config.database.track_queries = false;
    let mut profiler = MemoryProfiler::new(config, Arc::clone(&reader) as Arc<dyn MemoryReader>);

    profiler.start("no-db", &[]).unwrap();
    profiler.record_query("SELECT 1", 1.0);
    let report = profiler.stop().unwrap();

    assert!(report.database.is_none());
    assert_eq!(report.analysis.query_count, 0);

    let json = report.to_json().unwrap();
    assert!(!json.contains("\"database\""));
}

#[test]
fn test_report_serializes_renderer_fields() {
    let reader = Arc::new(FakeReader::new(10 * MIB));
    let mut profiler = MemoryProfiler::new(manual_config(), reader);
    profiler.start("demo", &[]).unwrap();
    let report = profiler.stop().unwrap();

    let json = report.to_json().unwrap();
    for field in [
        "\"command\"",
        "\"execution\"",
        "\"memory\"",
        "\"samples\"",
        "\"analysis\"",
        "\"statistics\"",
        "\"25th\"",
        "\"95th\"",
        "\"performance_metrics\"",
        "\"efficiency_score\"",
        "\"leak_resistance\"",
        "\"generated_at\"",
    ] {
        assert!(json.contains(field), "missing {} in payload", field);
    }
}

#[tokio::test]
async fn test_profile_spawned_child_process() {
    let args = vec!["0.3".to_string()];
    let mut workload = Workload::spawn("sleep", &args, None).unwrap();

    let reader = Arc::new(ProcMemoryReader::for_pid(workload.pid()));
    let mut config = Config::default();
    config.sampling.interval_ms = 50;
    let mut profiler = MemoryProfiler::new(config, reader);
    profiler.start("sleep", &args).unwrap();

    let status = workload.wait().await.unwrap();
    assert!(status.success());

    let report = profiler.stop().unwrap();
    assert!(report.samples.len() >= 2);
    assert!(report.memory.peak_usage > 0);
    assert!(report.execution.duration > 0.0);
}

#[test]
fn test_current_process_reader() {
    let reader = ProcMemoryReader::current();
    let snapshot = reader.snapshot().unwrap();
    assert!(snapshot.rss_bytes > 0);
    assert!(snapshot.peak_rss_bytes >= snapshot.rss_bytes);

    let by_pid = ProcMemoryReader::for_pid(std::process::id());
    assert!(by_pid.snapshot().unwrap().rss_bytes > 0);
}

#[test]
fn test_reader_fails_for_missing_pid() {
    let reader = ProcMemoryReader::for_pid(u32::MAX - 1);
    assert!(reader.snapshot().is_err());
}
