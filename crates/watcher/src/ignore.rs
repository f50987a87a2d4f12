//! Noise filtering for watch notifications
//!
//! Two layers, both applied before debouncing:
//! 1. Built-in rules (hidden files and node_modules - always active)
//! 2. Config-provided gitignore-style patterns

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path};

use crate::WatchError;

pub use ignore::Error as PatternError;

/// Filters watch notifications that are noise rather than activity
#[derive(Debug)]
pub struct NoiseFilter {
    /// Patterns from the monitor config, matched against absolute paths
    extra: Option<Gitignore>,
}

impl NoiseFilter {
    /// Build a filter from config patterns. An empty list leaves only
    /// the built-in rules active.
    pub fn new(patterns: &[String]) -> Result<Self, WatchError> {
        if patterns.is_empty() {
            return Ok(Self { extra: None });
        }

        // Root at "/" so patterns apply to the absolute paths notify
        // hands us, wherever the watch roots live.
        let mut builder = GitignoreBuilder::new("/");
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|source| WatchError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })?;
        }
        let extra = builder.build().map_err(|source| WatchError::Pattern {
            pattern: patterns.join(", "),
            source,
        })?;

        Ok(Self { extra: Some(extra) })
    }

    /// Check if a notification for this path should be dropped
    pub fn should_ignore(&self, path: &Path) -> bool {
        if is_builtin_ignored(path) {
            return true;
        }

        if let Some(ref extra) = self.extra {
            // Deleted paths cannot be stat'd, so treat the leaf as a
            // file; ancestors are still matched as directories.
            if extra.matched_path_or_any_parents(path, false).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Number of active filter layers
    pub fn active_layers(&self) -> usize {
        if self.extra.is_some() {
            2
        } else {
            1
        }
    }
}

/// Hidden files and dependency directories are never activity worth
/// scoring, no matter what the config says.
fn is_builtin_ignored(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(part) => {
            let part = part.to_string_lossy();
            part.starts_with('.') || part == "node_modules"
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_hidden_files_always_ignored() {
        let filter = NoiseFilter::new(&[]).unwrap();

        assert!(filter.should_ignore(Path::new("/home/a/.bashrc")));
        assert!(filter.should_ignore(Path::new("/home/a/.git/objects/ab")));
        assert!(filter.should_ignore(Path::new("/home/a/project/.env.local")));
        assert!(filter.should_ignore(Path::new("/home/a/.cache/thing.bin")));
    }

    #[test]
    fn test_node_modules_always_ignored() {
        let filter = NoiseFilter::new(&[]).unwrap();

        assert!(filter.should_ignore(Path::new(
            "/home/a/project/node_modules/lodash/index.js"
        )));
        // Only the exact component counts.
        assert!(!filter.should_ignore(Path::new("/home/a/node_modules_backup.txt")));
    }

    #[test]
    fn test_normal_paths_pass() {
        let filter = NoiseFilter::new(&[]).unwrap();

        assert!(!filter.should_ignore(Path::new("/home/a/Documents/report.pdf")));
        assert!(!filter.should_ignore(Path::new("/media/usb0/tool.exe")));
    }

    #[test]
    fn test_config_glob_patterns() {
        let patterns = vec!["*.log".to_string(), "*.iso".to_string()];
        let filter = NoiseFilter::new(&patterns).unwrap();

        assert!(filter.should_ignore(Path::new("/home/a/Documents/debug.log")));
        assert!(filter.should_ignore(Path::new("/home/a/Downloads/distro.iso")));
        assert!(!filter.should_ignore(Path::new("/home/a/Documents/report.pdf")));
    }

    #[test]
    fn test_config_directory_pattern_covers_contents() {
        let patterns = vec!["Steam/".to_string()];
        let filter = NoiseFilter::new(&patterns).unwrap();

        assert!(filter.should_ignore(Path::new(
            "/home/a/Downloads/Steam/appcache/stuff.vdf"
        )));
        assert!(!filter.should_ignore(Path::new("/home/a/Downloads/steam_notes.txt")));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let patterns = vec!["ok.txt".to_string(), "broken[".to_string()];
        let err = NoiseFilter::new(&patterns).unwrap_err();
        assert!(matches!(err, WatchError::Pattern { .. }));
    }

    #[test]
    fn test_active_layers() {
        assert_eq!(NoiseFilter::new(&[]).unwrap().active_layers(), 1);
        let patterns = vec!["*.log".to_string()];
        assert_eq!(NoiseFilter::new(&patterns).unwrap().active_layers(), 2);
    }
}
