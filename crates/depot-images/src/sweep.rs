//! Time-based sweep of generated variants
//!
//! Variants are never cascade-deleted with their source; orphans (and cold
//! cache entries alike) are reaped here once older than the configured TTL.
//! The sweep runs unsynchronized with request-time generation.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

/// Outcome of one sweep pass
#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, std::io::Error)>,
}

/// Remove variant files under `{static_root}/image/resize` whose modification
/// time is older than `ttl`.
pub fn sweep(static_root: &Path, ttl: Duration) -> SweepReport {
    let root = static_root.join("image").join("resize");
    let mut report = SweepReport::default();

    if !root.exists() {
        return report;
    }

    let cutoff = SystemTime::now() - ttl;
    visit(&root, cutoff, &mut report);

    for path in &report.removed {
        debug!(path = %path.display(), "obsolete variant removed");
    }
    for (path, err) in &report.failed {
        warn!(path = %path.display(), error = %err, "failed to remove obsolete variant");
    }

    report
}

fn visit(dir: &Path, cutoff: SystemTime, report: &mut SweepReport) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            report.failed.push((dir.to_path_buf(), err));
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            visit(&path, cutoff, report);
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| modified < cutoff)
            .unwrap_or(false);
        if !expired {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => report.removed.push(path),
            Err(err) => report.failed.push((path, err)),
        }
    }
}
