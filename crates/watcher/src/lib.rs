//! Filesystem watching for Vigil
//!
//! Each watch root gets its own notify subscription and its own debounce
//! task, so a root failing to attach or erroring at runtime never takes
//! the others down. The output is a single stream of [`RawChange`]s that
//! has already been noise-filtered and write-coalesced.

pub mod classify;
pub mod debounce;
pub mod ignore;
pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use classify::classify;
pub use debounce::DebounceConfig;
pub use paths::{default_watch_roots, resolve_watch_roots};
pub use self::ignore::NoiseFilter;

/// Change kind as reported by the watch layer, before classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File appeared
    Add,
    /// File contents or attributes changed
    Change,
    /// File disappeared
    Unlink,
    /// Directory appeared
    AddDir,
    /// Directory disappeared
    UnlinkDir,
    /// Backend reported something we do not recognize
    Other,
}

/// A raw, debounced filesystem change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl RawChange {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Errors from setting up the watch layer
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create filesystem watcher: {0}")]
    Init(#[from] notify::Error),

    #[error("invalid ignore pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: ignore::PatternError,
    },

    #[error("none of the {checked} configured roots could be watched")]
    NoRoots { checked: usize },
}

/// Tuning for the watch layer
#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    /// How long a file must stay quiet before a change is emitted
    pub quiet: Duration,
    /// How often pending changes are checked for quietness
    pub poll: Duration,
    /// Capacity of the outgoing change channel
    pub channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            quiet: Duration::from_millis(2000),
            poll: Duration::from_millis(100),
            channel_capacity: 256,
        }
    }
}

/// Running watch layer: one notify subscription and debounce task per root
#[derive(Debug)]
pub struct Watcher {
    // Held so the subscriptions stay alive; dropped on stop.
    watchers: Vec<RecommendedWatcher>,
    tasks: Vec<JoinHandle<()>>,
    roots: Vec<PathBuf>,
}

impl Watcher {
    /// Attach to every root that can be watched and return the merged
    /// change stream.
    ///
    /// Roots that fail to attach are logged and skipped; only a total
    /// failure is an error. Must be called from within a tokio runtime.
    pub fn spawn(
        roots: Vec<PathBuf>,
        filter: NoiseFilter,
        config: WatcherConfig,
    ) -> Result<(Self, mpsc::Receiver<RawChange>), WatchError> {
        let checked = roots.len();
        let filter = Arc::new(filter);
        let (out_tx, out_rx) = mpsc::channel(config.channel_capacity);

        let mut watchers = Vec::new();
        let mut tasks = Vec::new();
        let mut active = Vec::new();

        for root in roots {
            match watch_root(&root, Arc::clone(&filter), out_tx.clone(), config) {
                Ok((watcher, task)) => {
                    info!(root = %root.display(), "watching");
                    watchers.push(watcher);
                    tasks.push(task);
                    active.push(root);
                }
                Err(err) => {
                    error!(root = %root.display(), error = %err, "cannot watch root, skipping");
                }
            }
        }

        if active.is_empty() {
            return Err(WatchError::NoRoots { checked });
        }

        Ok((
            Self {
                watchers,
                tasks,
                roots: active,
            },
            out_rx,
        ))
    }

    /// Roots that were successfully attached
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Tear the watch layer down. Changes still sitting in a debounce
    /// window are discarded.
    pub fn stop(self) {
        drop(self.watchers);
        for task in &self.tasks {
            task.abort();
        }
        info!("watcher stopped");
    }
}

fn watch_root(
    root: &Path,
    filter: Arc<NoiseFilter>,
    out_tx: mpsc::Sender<RawChange>,
    config: WatcherConfig,
) -> Result<(RecommendedWatcher, JoinHandle<()>), notify::Error> {
    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let callback_root = root.to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |result: Result<notify::Event, notify::Error>| match result {
            Ok(event) => {
                for change in map_notify_event(&event) {
                    if filter.should_ignore(&change.path) {
                        continue;
                    }
                    // Receiver gone means we are shutting down.
                    let _ = raw_tx.send(change);
                }
            }
            Err(err) => {
                warn!(root = %callback_root.display(), error = %err, "watch stream error");
            }
        },
        notify::Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::Recursive)?;

    let task = tokio::spawn(debounce::run(
        raw_rx,
        out_tx,
        DebounceConfig {
            quiet: config.quiet,
            poll: config.poll,
        },
    ));

    Ok((watcher, task))
}

/// Map a notify event to zero or more raw changes.
///
/// Pure read events are dropped. Renames become an unlink of the old
/// path plus an add of the new one, which is how the rest of the
/// pipeline reasons about them.
pub fn map_notify_event(event: &notify::Event) -> Vec<RawChange> {
    let kind = match &event.kind {
        EventKind::Create(CreateKind::Folder) => ChangeKind::AddDir,
        EventKind::Create(_) => ChangeKind::Add,
        EventKind::Modify(ModifyKind::Name(mode)) => return map_rename(event, mode),
        EventKind::Modify(_) => ChangeKind::Change,
        EventKind::Remove(RemoveKind::Folder) => ChangeKind::UnlinkDir,
        EventKind::Remove(_) => ChangeKind::Unlink,
        EventKind::Access(_) => return Vec::new(),
        EventKind::Any | EventKind::Other => ChangeKind::Other,
    };

    event
        .paths
        .iter()
        .map(|path| RawChange::new(kind, path.clone()))
        .collect()
}

fn map_rename(event: &notify::Event, mode: &RenameMode) -> Vec<RawChange> {
    match mode {
        RenameMode::From => event
            .paths
            .iter()
            .map(|p| RawChange::new(ChangeKind::Unlink, p.clone()))
            .collect(),
        RenameMode::To => event.paths.iter().map(|p| added(p)).collect(),
        RenameMode::Both => {
            let mut changes = Vec::new();
            if let Some(from) = event.paths.first() {
                changes.push(RawChange::new(ChangeKind::Unlink, from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                changes.push(added(to));
            }
            changes
        }
        // Backend could not say which side of the rename this is.
        _ => event
            .paths
            .iter()
            .map(|p| RawChange::new(ChangeKind::Change, p.clone()))
            .collect(),
    }
}

/// Rename destinations can be files or directories; the event does not
/// say which, so check the live path.
fn added(path: &Path) -> RawChange {
    if path.is_dir() {
        RawChange::new(ChangeKind::AddDir, path.to_path_buf())
    } else {
        RawChange::new(ChangeKind::Add, path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, MetadataKind};

    fn notify_event(kind: EventKind, paths: Vec<&str>) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.into_iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_map_create_file() {
        let event = notify_event(
            EventKind::Create(CreateKind::File),
            vec!["/watch/new.txt"],
        );
        let changes = map_notify_event(&event);
        assert_eq!(changes, vec![RawChange::new(ChangeKind::Add, "/watch/new.txt")]);
    }

    #[test]
    fn test_map_create_folder() {
        let event = notify_event(
            EventKind::Create(CreateKind::Folder),
            vec!["/watch/subdir"],
        );
        let changes = map_notify_event(&event);
        assert_eq!(changes[0].kind, ChangeKind::AddDir);
    }

    #[test]
    fn test_map_data_and_metadata_modify() {
        let data = notify_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            vec!["/watch/a.txt"],
        );
        assert_eq!(map_notify_event(&data)[0].kind, ChangeKind::Change);

        let meta = notify_event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            vec!["/watch/a.txt"],
        );
        assert_eq!(map_notify_event(&meta)[0].kind, ChangeKind::Change);
    }

    #[test]
    fn test_map_remove_file_and_folder() {
        let file = notify_event(
            EventKind::Remove(RemoveKind::File),
            vec!["/watch/gone.txt"],
        );
        assert_eq!(map_notify_event(&file)[0].kind, ChangeKind::Unlink);

        let folder = notify_event(
            EventKind::Remove(RemoveKind::Folder),
            vec!["/watch/gone"],
        );
        assert_eq!(map_notify_event(&folder)[0].kind, ChangeKind::UnlinkDir);
    }

    #[test]
    fn test_map_rename_from_is_unlink() {
        let event = notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            vec!["/watch/old.txt"],
        );
        let changes = map_notify_event(&event);
        assert_eq!(
            changes,
            vec![RawChange::new(ChangeKind::Unlink, "/watch/old.txt")]
        );
    }

    #[test]
    fn test_map_rename_both_is_unlink_plus_add() {
        let event = notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            vec!["/watch/old.txt", "/watch/new.txt"],
        );
        let changes = map_notify_event(&event);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], RawChange::new(ChangeKind::Unlink, "/watch/old.txt"));
        // The destination does not exist in the test environment, so it
        // maps to a plain file add.
        assert_eq!(changes[1], RawChange::new(ChangeKind::Add, "/watch/new.txt"));
    }

    #[test]
    fn test_map_access_is_dropped() {
        let event = notify_event(
            EventKind::Access(AccessKind::Read),
            vec!["/watch/read.txt"],
        );
        assert!(map_notify_event(&event).is_empty());
    }

    #[test]
    fn test_map_unknown_kind_is_other() {
        let event = notify_event(EventKind::Any, vec!["/watch/what.bin"]);
        assert_eq!(map_notify_event(&event)[0].kind, ChangeKind::Other);
    }
}
