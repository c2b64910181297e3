//! Memory sampling over a tracked interval
//!
//! A `MemoryTracker` owns the sample buffer for one session. With
//! background sampling enabled it spawns a tokio task that appends a
//! sample on every interval tick, so a CPU-bound workload is still
//! observed without cooperating. Tick spacing is approximate, not
//! real-time.

use crate::collector::MemoryReader;
use crate::error::{Error, Result};
use crate::stats::{self, Trend};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::warn;

/// One point-in-time memory measurement. Immutable once recorded, apart
/// from the label a checkpoint attaches to the most recent sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    /// Unix timestamp in seconds.
    pub timestamp: f64,
    /// Seconds since the session started.
    pub elapsed_time: f64,
    /// Resident memory in bytes.
    pub memory_usage: u64,
    /// Peak resident memory in bytes.
    pub peak_memory: u64,
    /// Signed difference from the session's starting memory.
    pub memory_difference: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Tracker-level summary, recomputed on demand from the samples.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStats {
    pub sample_count: usize,
    pub duration: f64,
    pub memory: MemorySummary,
    pub trend: Trend,
    pub leak_detected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySummary {
    pub initial: u64,
    pub current: u64,
    pub peak: u64,
    pub min: u64,
    pub max: u64,
    pub average: f64,
    pub difference: i64,
}

/// State shared between the tracker and its background sampling task.
struct SessionState {
    reader: Arc<dyn MemoryReader>,
    tracking: AtomicBool,
    start_instant: Instant,
    start_memory: u64,
    samples: Mutex<Vec<Sample>>,
}

impl SessionState {
    fn collect(&self, label: Option<&str>) -> Option<Sample> {
        if !self.tracking.load(Ordering::SeqCst) {
            return None;
        }
        let snapshot = match self.reader.snapshot() {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to read memory counters: {}", e);
                return None;
            }
        };

        let sample = Sample {
            timestamp: unix_now(),
            elapsed_time: self.start_instant.elapsed().as_secs_f64(),
            memory_usage: snapshot.rss_bytes,
            peak_memory: snapshot.peak_rss_bytes,
            memory_difference: snapshot.rss_bytes as i64 - self.start_memory as i64,
            label: label.map(|l| l.to_string()),
        };
        self.samples.lock().unwrap().push(sample.clone());
        Some(sample)
    }
}

/// Samples one process's memory over a start/stop interval.
pub struct MemoryTracker {
    reader: Arc<dyn MemoryReader>,
    interval: Duration,
    background: bool,
    session: Option<Arc<SessionState>>,
    task: Option<JoinHandle<()>>,
}

impl MemoryTracker {
    pub fn new(reader: Arc<dyn MemoryReader>, interval: Duration) -> Self {
        Self {
            reader,
            // tokio::time::interval rejects a zero period
            interval: interval.max(Duration::from_millis(1)),
            background: true,
            session: None,
            task: None,
        }
    }

    /// Disable the periodic task; samples are then only taken by
    /// explicit `collect_sample`/`checkpoint` calls inserted into the
    /// workload. Precise but intrusive, where background sampling is
    /// automatic but approximate.
    pub fn with_background(mut self, enabled: bool) -> Self {
        self.background = enabled;
        self
    }

    pub fn is_tracking(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, |s| s.tracking.load(Ordering::SeqCst))
    }

    pub fn sampling_interval(&self) -> Duration {
        self.interval
    }

    /// Begin a session: record starting memory, take the first sample,
    /// and arm the periodic sampling task.
    ///
    /// Must run inside a tokio runtime when background sampling is
    /// enabled. Fails with `Error::AlreadyTracking` on an active
    /// session.
    pub fn start(&mut self) -> Result<()> {
        if self.is_tracking() {
            return Err(Error::AlreadyTracking);
        }

        let snapshot = self.reader.snapshot()?;
        let state = Arc::new(SessionState {
            reader: Arc::clone(&self.reader),
            tracking: AtomicBool::new(true),
            start_instant: Instant::now(),
            start_memory: snapshot.rss_bytes,
            samples: Mutex::new(vec![Sample {
                timestamp: unix_now(),
                elapsed_time: 0.0,
                memory_usage: snapshot.rss_bytes,
                peak_memory: snapshot.peak_rss_bytes,
                memory_difference: 0,
                label: None,
            }]),
        });

        if self.background {
            let tick_state = Arc::clone(&state);
            let interval = self.interval;
            self.task = Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                // the first tick completes immediately and would
                // duplicate the initial sample
                ticker.tick().await;
                while tick_state.tracking.load(Ordering::SeqCst) {
                    ticker.tick().await;
                    tick_state.collect(None);
                }
            }));
        }

        self.session = Some(state);
        Ok(())
    }

    /// End the session: take one final sample, disarm the periodic
    /// task, and return the full ordered sample sequence.
    ///
    /// Fails with `Error::NotTracking` when no session is active.
    pub fn stop(&mut self) -> Result<Vec<Sample>> {
        let state = self.session.as_ref().ok_or(Error::NotTracking)?;
        if !state.tracking.load(Ordering::SeqCst) {
            return Err(Error::NotTracking);
        }

        // closing data point reflects post-workload state even if the
        // last tick was missed
        state.collect(None);
        state.tracking.store(false, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            task.abort();
        }

        Ok(state.samples.lock().unwrap().clone())
    }

    /// Take a sample now. `None` when not tracking or when the memory
    /// counters could not be read.
    pub fn collect_sample(&self) -> Option<Sample> {
        self.session.as_ref()?.collect(None)
    }

    /// Force an out-of-band sample tagged with a label, marking a
    /// logical phase inside the profiled workload.
    pub fn checkpoint(&self, label: &str) -> Option<Sample> {
        self.session.as_ref()?.collect(Some(label))
    }

    /// Samples collected so far (also available after `stop`).
    pub fn samples(&self) -> Vec<Sample> {
        self.session
            .as_ref()
            .map(|s| s.samples.lock().unwrap().clone())
            .unwrap_or_default()
    }

    pub fn latest_sample(&self) -> Option<Sample> {
        self.session
            .as_ref()
            .and_then(|s| s.samples.lock().unwrap().last().cloned())
    }

    pub fn start_memory(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.start_memory)
    }

    /// Summary statistics for the current sample set; `None` before the
    /// first session.
    pub fn statistics(&self) -> Option<TrackerStats> {
        let state = self.session.as_ref()?;
        let samples = state.samples.lock().unwrap().clone();
        if samples.is_empty() {
            return None;
        }

        let usages: Vec<u64> = samples.iter().map(|s| s.memory_usage).collect();
        let usage_values: Vec<f64> = usages.iter().map(|v| *v as f64).collect();
        let differences: Vec<i64> = samples.iter().map(|s| s.memory_difference).collect();

        let duration = if state.tracking.load(Ordering::SeqCst) {
            state.start_instant.elapsed().as_secs_f64()
        } else {
            samples.last().map_or(0.0, |s| s.elapsed_time)
        };

        Some(TrackerStats {
            sample_count: samples.len(),
            duration,
            memory: MemorySummary {
                initial: state.start_memory,
                current: usages.last().copied().unwrap_or(0),
                peak: samples.iter().map(|s| s.peak_memory).max().unwrap_or(0),
                min: usages.iter().copied().min().unwrap_or(0),
                max: usages.iter().copied().max().unwrap_or(0),
                average: stats::mean(&usage_values),
                difference: differences.last().copied().unwrap_or(0),
            },
            trend: stats::trend(&usages),
            leak_detected: stats::leak_detected(&differences),
        })
    }
}

impl Drop for MemoryTracker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
