use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::config::ShowConfig;
use crate::error::IngestError;
use crate::store::{EntryStat, Store};

/// Outcome of one two-phase sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcSummary {
    pub scanned: usize,
    pub reclaimed: usize,
    pub reclaimed_bytes: u64,
}

/// Run the two-phase sweep: age out expired entries, then shrink the store
/// oldest-first if the survivors still exceed the size cap.
///
/// # Errors
///
/// Fails with [`IngestError::DirectoryUnreadable`] if the store cannot be
/// listed; a GC failure aborts the whole ingestion request.
pub fn collect<S: Store>(store: &S, config: &ShowConfig) -> Result<GcSummary, IngestError> {
    collect_at(store, config, SystemTime::now())
}

pub(crate) fn collect_at<S: Store>(
    store: &S,
    config: &ShowConfig,
    now: SystemTime,
) -> Result<GcSummary, IngestError> {
    let mut summary = GcSummary::default();

    let names = store
        .entries(config.age_scan_cap)
        .map_err(IngestError::DirectoryUnreadable)?;

    let mut survivors_total: u64 = 0;
    for name in names {
        summary.scanned += 1;
        match store.stat(&name) {
            Ok(stat) => {
                let age = now
                    .duration_since(stat.mtime)
                    .unwrap_or(Duration::ZERO);
                if age > config.ttl {
                    reap(store, &name, stat.size, &mut summary);
                } else {
                    survivors_total += stat.size;
                }
            }
            Err(err) => {
                // Unreadable mtime is treated as expired, matching observed
                // behavior. A transient stat error therefore costs the entry.
                warn!(%name, %err, "stat failed during age sweep, deleting entry");
                reap(store, &name, 0, &mut summary);
            }
        }
    }

    if survivors_total >= config.max_storage_size {
        shrink(store, config, &mut summary)?;
    }

    debug!(
        scanned = summary.scanned,
        reclaimed = summary.reclaimed,
        reclaimed_bytes = summary.reclaimed_bytes,
        "gc sweep complete"
    );
    Ok(summary)
}

/// Delete oldest-first until the total is at or below the shrink target.
/// Ties on mtime break by name so the victim set is deterministic.
fn shrink<S: Store>(
    store: &S,
    config: &ShowConfig,
    summary: &mut GcSummary,
) -> Result<(), IngestError> {
    let names = store
        .entries(config.size_scan_cap)
        .map_err(IngestError::DirectoryUnreadable)?;

    let mut entries: Vec<(String, EntryStat)> = names
        .into_iter()
        .filter_map(|name| store.stat(&name).ok().map(|stat| (name, stat)))
        .collect();
    let mut total: u64 = entries.iter().map(|(_, stat)| stat.size).sum();
    entries.sort_by(|a, b| a.1.mtime.cmp(&b.1.mtime).then_with(|| a.0.cmp(&b.0)));

    let target = config.shrink_target();
    let mut deletions = 0usize;
    for (name, stat) in entries {
        if total <= target || deletions >= config.delete_cap {
            break;
        }
        reap(store, &name, stat.size, summary);
        total = total.saturating_sub(stat.size);
        deletions += 1;
    }
    Ok(())
}

fn reap<S: Store>(store: &S, name: &str, size: u64, summary: &mut GcSummary) {
    match store.delete(name) {
        Ok(()) => {
            summary.reclaimed += 1;
            summary.reclaimed_bytes += size;
        }
        Err(err) => warn!(%name, %err, "failed to delete store entry"),
    }
}
