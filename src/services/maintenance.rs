//! Upload temp-directory cleanup.
//!
//! Uploaded files are spooled to a local directory; this pass deletes copies
//! older than the configured age. It runs from the cleanup endpoint, the CLI
//! and optionally on a cron schedule, and is not synchronized with requests
//! still reading a spooled file.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupStats {
    pub removed: usize,
    pub kept: usize,
}

pub async fn cleanup_temp_uploads(
    dir: &Path,
    max_age: Duration,
) -> anyhow::Result<CleanupStats> {
    let mut stats = CleanupStats::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        // A missing directory just means nothing has been uploaded yet.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
        Err(e) => return Err(e.into()),
    };

    let cutoff = SystemTime::now() - max_age;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let modified = entry.metadata().await.and_then(|m| m.modified());
        let stale = match modified {
            Ok(modified) => modified < cutoff,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Could not read mtime, skipping");
                false
            }
        };

        if stale {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => stats.removed += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to remove stale upload");
                    stats.kept += 1;
                }
            }
        } else {
            stats.kept += 1;
        }
    }

    info!(removed = stats.removed, kept = stats.kept, "Temp upload cleanup finished");
    Ok(stats)
}
