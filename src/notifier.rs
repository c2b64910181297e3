//! Desktop notification for completed runs

use crate::report::{Issue, Severity};
use notify_rust::Notification;
use tracing::warn;

/// Raise a desktop notification when a run produced high-severity
/// issues. Quiet otherwise.
pub fn notify_issues(command: &str, issues: &[Issue]) {
    let high: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.severity == Severity::High)
        .collect();
    if high.is_empty() {
        return;
    }

    let summary = format!("memprobe: {} issue(s) in {}", high.len(), command);
    let body = high
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if let Err(e) = Notification::new()
        .summary(&summary)
        .body(&body)
        .appname("memprobe")
        .show()
    {
        warn!("failed to send notification: {}", e);
    }
}
