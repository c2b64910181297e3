//! SQLite session history

use crate::report::ProfileReport;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct History {
    conn: Connection,
}

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: i64,
    pub timestamp: i64,
    pub command: String,
    pub duration: f64,
    pub peak_memory: u64,
    pub final_memory: u64,
    pub memory_difference: i64,
    pub sample_count: u32,
    pub trend: String,
    pub leak_detected: bool,
    pub grade: String,
}

impl History {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_default() -> rusqlite::Result<Self> {
        Self::open(&Self::default_path())
    }

    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "memprobe")
            .map(|dirs| dirs.data_dir().join("history.db"))
            .unwrap_or_else(|| PathBuf::from("memprobe-history.db"))
    }

    pub fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(include_str!("../schema.sql"))
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    pub fn insert_session(&self, report: &ProfileReport) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO sessions (timestamp, command, duration, peak_memory, final_memory,
                                   memory_difference, sample_count, trend, leak_detected, grade)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                Self::now(),
                report.command.name,
                report.execution.duration,
                report.memory.peak_usage as i64,
                report.memory.final_usage as i64,
                report.memory.difference,
                report.samples.len() as i64,
                report.memory.trend.as_str(),
                report.memory.leak_detected,
                report.efficiency_score.grade,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn recent_sessions(&self, limit: u32) -> rusqlite::Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, command, duration, peak_memory, final_memory,
                    memory_difference, sample_count, trend, leak_detected, grade
             FROM sessions ORDER BY timestamp DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(SessionRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                command: row.get(2)?,
                duration: row.get(3)?,
                peak_memory: row.get::<_, i64>(4)? as u64,
                final_memory: row.get::<_, i64>(5)? as u64,
                memory_difference: row.get(6)?,
                sample_count: row.get(7)?,
                trend: row.get(8)?,
                leak_detected: row.get::<_, i32>(9)? != 0,
                grade: row.get(10)?,
            })
        })?;
        rows.collect()
    }

    /// Drop sessions older than the retention window.
    pub fn cleanup_old_data(&self, retention_days: u32) -> rusqlite::Result<usize> {
        let cutoff = Self::now() - (retention_days as i64 * 86400);
        self.conn
            .execute("DELETE FROM sessions WHERE timestamp < ?1", params![cutoff])
    }
}
