//! Per-path write debouncing
//!
//! Editors and downloads produce bursts of writes. A change is only
//! forwarded once its path has been quiet for the configured interval,
//! checked on a fine poll timer. Everything that is not a change passes
//! straight through, and an unlink cancels any change still pending for
//! the same path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, Instant};

use crate::{ChangeKind, RawChange};

/// Debounce timing
#[derive(Debug, Clone, Copy)]
pub struct DebounceConfig {
    /// How long a path must stay quiet before its change is emitted
    pub quiet: Duration,
    /// How often pending paths are checked
    pub poll: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet: Duration::from_millis(2000),
            poll: Duration::from_millis(100),
        }
    }
}

/// Run the debounce loop until the input closes or the output is dropped.
///
/// Pending changes are discarded on shutdown rather than flushed.
pub async fn run(
    mut raw: mpsc::UnboundedReceiver<RawChange>,
    out: mpsc::Sender<RawChange>,
    config: DebounceConfig,
) {
    let mut pending: HashMap<PathBuf, Instant> = HashMap::new();
    let mut tick = interval(config.poll);

    loop {
        tokio::select! {
            maybe = raw.recv() => match maybe {
                Some(change) => match change.kind {
                    ChangeKind::Change => {
                        pending.insert(change.path, Instant::now());
                    }
                    ChangeKind::Unlink => {
                        // The file is gone; a write notification for it
                        // would be stale.
                        pending.remove(&change.path);
                        if out.send(change).await.is_err() {
                            return;
                        }
                    }
                    _ => {
                        if out.send(change).await.is_err() {
                            return;
                        }
                    }
                },
                None => return,
            },
            _ = tick.tick() => {
                if pending.is_empty() {
                    continue;
                }
                let mut ready: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, last_write)| last_write.elapsed() >= config.quiet)
                    .map(|(path, _)| path.clone())
                    .collect();
                ready.sort();
                for path in ready {
                    pending.remove(&path);
                    if out.send(RawChange::new(ChangeKind::Change, path)).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}
