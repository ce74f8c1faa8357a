//! Run aggregation and the text report sent to operators

use super::pipeline::BackupResult;
use super::backup::RunError;
use chrono::{DateTime, FixedOffset, SecondsFormat};

/// Collects per-target results in processing order
pub struct RunAggregator {
    started_at: DateTime<FixedOffset>,
    results: Vec<BackupResult>,
}

impl RunAggregator {
    pub fn new(started_at: DateTime<FixedOffset>) -> Self {
        Self {
            started_at,
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, result: BackupResult) {
        self.results.push(result);
    }

    pub fn finish(self) -> RunSummary {
        RunSummary {
            started_at: self.started_at,
            results: self.results,
        }
    }
}

/// Ordered results of one run
#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<FixedOffset>,
    pub results: Vec<BackupResult>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn fail_count(&self) -> usize {
        self.total() - self.success_count()
    }

    /// `Ok` only when no target failed
    pub fn ensure_success(&self) -> Result<(), RunError> {
        match self.fail_count() {
            0 => Ok(()),
            failed => Err(RunError::TargetsFailed {
                failed,
                total: self.total(),
            }),
        }
    }

    pub fn render(&self) -> String {
        let mut text = format!(
            "{}\nTotal: {}, Success: {}, Fail: {}\n",
            report_header(&self.started_at),
            self.total(),
            self.success_count(),
            self.fail_count()
        );

        if !self.results.is_empty() {
            text.push('\n');
        }
        for result in &self.results {
            match (result.artifact(), result.error()) {
                (Some(info), _) => text.push_str(&format!(
                    "✅ {}: {} (SHA256: {}...)\n",
                    result.target,
                    humanize_size(info.size),
                    short_hash(&info.sha256)
                )),
                (None, Some(err)) => {
                    text.push_str(&format!("❌ {}: Error: {}\n", result.target, err))
                }
                (None, None) => {}
            }
        }

        text
    }
}

/// Report for a run that stopped before any target was processed
pub fn render_discovery_failure(started_at: &DateTime<FixedOffset>, error: &RunError) -> String {
    format!("{}\n❌ {}\n", report_header(started_at), error)
}

fn report_header(started_at: &DateTime<FixedOffset>) -> String {
    format!(
        "Backup Report [{}]",
        started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

fn short_hash(digest: &str) -> &str {
    digest.get(..8).unwrap_or(digest)
}

/// Binary-scaled size: bytes as-is, larger units with one decimal
pub fn humanize_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
