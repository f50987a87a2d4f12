//! Watch root resolution

use std::collections::HashSet;
use std::path::PathBuf;
use tracing::warn;

/// The user directories monitored when no roots are configured
pub fn default_watch_roots() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        warn!("no home directory found, no default watch roots");
        return Vec::new();
    };
    vec![
        home.join("Documents"),
        home.join("Downloads"),
        home.join("Desktop"),
    ]
}

/// Resolve the final list of watch roots.
///
/// An empty configured list means "use the defaults". Duplicates are
/// removed with the first occurrence winning, so explicit ordering in
/// the config is preserved. Roots that do not exist yet are kept: the
/// watch layer reports them and carries on with the rest.
pub fn resolve_watch_roots(configured: &[PathBuf]) -> Vec<PathBuf> {
    let candidates = if configured.is_empty() {
        default_watch_roots()
    } else {
        configured.to_vec()
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|root| seen.insert(root.clone()))
        .collect()
}
