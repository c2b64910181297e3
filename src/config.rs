//! Configuration management (TOML)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub sampling: SamplingConfig,
    pub memory: MemoryConfig,
    pub database: DatabaseConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub output_directory: PathBuf,
    /// "json" writes a report file per run, "none" skips it.
    pub report_format: String,
    pub notify_on_issues: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub interval_ms: u64,
    /// Periodic background sampling; disable to sample only at explicit
    /// checkpoints.
    pub background: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub threshold_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub track_queries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub retention_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            general: GeneralConfig {
                output_directory: PathBuf::from("memory-profiles"),
                report_format: "json".to_string(),
                notify_on_issues: false,
            },
            sampling: SamplingConfig {
                interval_ms: 100,
                background: true,
            },
            memory: MemoryConfig {
                threshold_bytes: 128 * 1024 * 1024,
            },
            database: DatabaseConfig {
                track_queries: true,
            },
            history: HistoryConfig {
                enabled: true,
                retention_days: 30,
            },
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "memprobe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
