use super::{MemoryReader, MemorySnapshot};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Reads `VmRSS`/`VmHWM` from `/proc/<pid>/status`.
pub struct ProcMemoryReader {
    status_path: PathBuf,
}

impl ProcMemoryReader {
    pub fn for_pid(pid: u32) -> Self {
        Self {
            status_path: PathBuf::from(format!("/proc/{}/status", pid)),
        }
    }

    pub fn current() -> Self {
        Self {
            status_path: PathBuf::from("/proc/self/status"),
        }
    }

    /// Parse the value of a "Field:   12345 kB" line.
    fn parse_kb(line: &str) -> Option<u64> {
        line.split_whitespace().nth(1)?.parse().ok()
    }
}

impl MemoryReader for ProcMemoryReader {
    fn snapshot(&self) -> io::Result<MemorySnapshot> {
        let status = fs::read_to_string(&self.status_path)?;

        let mut rss_kb = None;
        let mut peak_kb = None;
        for line in status.lines() {
            if line.starts_with("VmRSS:") {
                rss_kb = Self::parse_kb(line);
            } else if line.starts_with("VmHWM:") {
                peak_kb = Self::parse_kb(line);
            }
            if rss_kb.is_some() && peak_kb.is_some() {
                break;
            }
        }

        let rss_kb = rss_kb.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("VmRSS not found in {}", self.status_path.display()),
            )
        })?;
        // VmHWM is missing on some older kernels
        let peak_kb = peak_kb.unwrap_or(rss_kb).max(rss_kb);

        Ok(MemorySnapshot {
            rss_bytes: rss_kb * 1024,
            peak_rss_bytes: peak_kb * 1024,
        })
    }
}
