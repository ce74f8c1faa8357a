//! Age-based deletion of published artifacts

use crate::utils::storage::ArtifactStore;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Objects found under the store prefix
    pub examined: usize,
    /// Keys removed by this pass
    pub deleted: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RetentionError {
    #[error("failed to list artifacts: {0:#}")]
    List(anyhow::Error),

    #[error("{failed} expired artifacts could not be deleted ({} deleted)", .deleted.len())]
    PartialFailure { failed: usize, deleted: Vec<String> },
}

/// Delete every artifact older than `max_age_hours`, measured from `now`.
///
/// A non-positive age disables enforcement. Deletion failures do not stop the
/// pass; they are logged and reported together at the end.
pub async fn enforce(
    store: &dyn ArtifactStore,
    max_age_hours: i64,
    now: DateTime<Utc>,
) -> Result<RetentionReport, RetentionError> {
    if max_age_hours <= 0 {
        debug!("Retention disabled (hours = {})", max_age_hours);
        return Ok(RetentionReport::default());
    }

    let prefix = match store.prefix() {
        "" => String::new(),
        p => format!("{}/", p),
    };
    // A cutoff before the representable range means nothing can be that old
    let Some(cutoff) = Duration::try_hours(max_age_hours).and_then(|age| now.checked_sub_signed(age))
    else {
        warn!(
            "Retention of {} hours reaches past the earliest representable time; nothing to delete",
            max_age_hours
        );
        return Ok(RetentionReport::default());
    };
    info!(
        "Applying retention: deleting artifacts under '{}' older than {}",
        prefix,
        cutoff.to_rfc3339()
    );

    let objects = store.list(&prefix).await.map_err(RetentionError::List)?;
    let mut report = RetentionReport {
        examined: objects.len(),
        deleted: Vec::new(),
    };
    let mut failed = 0;

    for object in objects.iter().filter(|o| o.last_modified < cutoff) {
        match store.delete(&object.key).await {
            Ok(()) => {
                info!("Deleted expired artifact: {}", object.key);
                report.deleted.push(object.key.clone());
            }
            Err(e) => {
                error!("Failed to delete {}: {:#}", object.key, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(RetentionError::PartialFailure {
            failed,
            deleted: report.deleted,
        });
    }

    info!(
        "Retention complete: {} of {} artifacts deleted",
        report.deleted.len(),
        report.examined
    );
    Ok(report)
}
