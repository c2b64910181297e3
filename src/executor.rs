//! Workload execution (spawns the profiled command)

use crate::error::{Error, Result};
use std::path::Path;
use std::process::ExitStatus;
use tokio::process::{Child, Command};

/// A spawned child command under profiling.
pub struct Workload {
    child: Child,
    pid: u32,
}

impl Workload {
    pub fn spawn(command: &str, args: &[String], working_dir: Option<&Path>) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| Error::Spawn(format!("{}: {}", command, e)))?;
        let pid = child
            .id()
            .ok_or_else(|| Error::Spawn(format!("{}: exited before a pid was known", command)))?;

        Ok(Self { child, pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_running(&mut self) -> Result<bool> {
        match self.child.try_wait() {
            Ok(None) => Ok(true),
            Ok(Some(_)) => Ok(false),
            Err(e) => Err(Error::Workload(e.to_string())),
        }
    }

    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child
            .wait()
            .await
            .map_err(|e| Error::Workload(e.to_string()))
    }

    pub async fn kill(&mut self) -> Result<()> {
        self.child
            .kill()
            .await
            .map_err(|e| Error::Workload(e.to_string()))
    }
}
