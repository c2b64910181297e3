use memprobe::collector::{MemoryReader, MemorySnapshot};
use memprobe::config::Config;
use memprobe::history::History;
use memprobe::profiler::MemoryProfiler;
use memprobe::report::ProfileReport;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

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

fn sample_report(command: &str) -> ProfileReport {
    let reader = Arc::new(FakeReader::new(10 * 1024 * 1024));
    let mut config = Config::default();
    config.sampling.background = false;
    let mut profiler = MemoryProfiler::new(config, Arc::clone(&reader) as Arc<dyn MemoryReader>);
    profiler.start(command, &[]).unwrap();
    reader.set(12 * 1024 * 1024);
    profiler.stop().unwrap()
}

#[test]
fn test_create_database() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("history.db");
    let history = History::open(&db_path).unwrap();
    history.init_schema().unwrap();
    assert!(db_path.exists());
}

#[test]
fn test_insert_and_query_sessions() {
    let dir = tempdir().unwrap();
    let history = History::open(&dir.path().join("history.db")).unwrap();
    history.init_schema().unwrap();

    let report = sample_report("demo-task");
    let id = history.insert_session(&report).unwrap();
    assert!(id > 0);

    let sessions = history.recent_sessions(10).unwrap();
    assert_eq!(sessions.len(), 1);
    let record = &sessions[0];
    assert_eq!(record.command, "demo-task");
    assert_eq!(record.peak_memory, 12 * 1024 * 1024);
    assert_eq!(record.final_memory, 12 * 1024 * 1024);
    assert_eq!(record.memory_difference, 2 * 1024 * 1024);
    assert_eq!(record.sample_count, 2);
    assert!(record.leak_detected);
    assert_eq!(record.trend, "increasing");
    assert!(!record.grade.is_empty());
}

#[test]
fn test_recent_sessions_limit() {
    let dir = tempdir().unwrap();
    let history = History::open(&dir.path().join("history.db")).unwrap();
    history.init_schema().unwrap();

    for i in 0..5 {
        let report = sample_report(&format!("task-{}", i));
        history.insert_session(&report).unwrap();
    }

    let sessions = history.recent_sessions(3).unwrap();
    assert_eq!(sessions.len(), 3);
}

#[test]
fn test_cleanup_keeps_recent_sessions() {
    let dir = tempdir().unwrap();
    let history = History::open(&dir.path().join("history.db")).unwrap();
    history.init_schema().unwrap();

    let report = sample_report("fresh");
    history.insert_session(&report).unwrap();

    let removed = history.cleanup_old_data(30).unwrap();
    assert_eq!(removed, 0);
    assert_eq!(history.recent_sessions(10).unwrap().len(), 1);
}
