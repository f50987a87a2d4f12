//! Raw change to file event classification
//!
//! Pure transform, no I/O: every field of the resulting event is derived
//! from the change, the acting user, and the supplied timestamp. The
//! risk score is left at zero for the scorer to fill in.

use chrono::{DateTime, Utc};
use std::path::Path;

use vigil_core::event::{EventType, FileEvent};

use crate::{ChangeKind, RawChange};

/// Build a file event from a debounced change.
pub fn classify(change: &RawChange, actor: &str, observed_at: DateTime<Utc>) -> FileEvent {
    FileEvent {
        event_type: event_type_for(change.kind),
        name: file_name(&change.path),
        extension: file_extension(&change.path),
        is_external_drive: is_external_drive(&change.path),
        path: change.path.clone(),
        risk_score: 0,
        actor: actor.to_string(),
        created_at: observed_at,
    }
}

fn event_type_for(kind: ChangeKind) -> EventType {
    match kind {
        ChangeKind::Add => EventType::Create,
        ChangeKind::Change => EventType::Modify,
        ChangeKind::Unlink => EventType::Delete,
        ChangeKind::AddDir => EventType::CreateDir,
        ChangeKind::UnlinkDir => EventType::DeleteDir,
        ChangeKind::Other => EventType::Other,
    }
}

/// Last path segment, empty when the path has none
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lower-cased extension without the dot, empty when there is none
fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Best-effort removable-media check.
///
/// Linux removable mounts land under /media or /run/media; on Windows
/// anything that is not the C: system drive counts. Network mounts can
/// slip through either way, which is a documented limitation of the
/// heuristic.
pub fn is_external_drive(path: &Path) -> bool {
    let text = path.to_string_lossy();

    if text.starts_with("/media/") || text.starts_with("/run/media/") {
        return true;
    }

    let bytes = text.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
    {
        return !bytes[0].eq_ignore_ascii_case(&b'C');
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_path(kind: ChangeKind, path: &str) -> FileEvent {
        classify(&RawChange::new(kind, path), "alice", Utc::now())
    }

    #[test]
    fn test_change_kinds_map_to_event_types() {
        let cases = [
            (ChangeKind::Add, EventType::Create),
            (ChangeKind::Change, EventType::Modify),
            (ChangeKind::Unlink, EventType::Delete),
            (ChangeKind::AddDir, EventType::CreateDir),
            (ChangeKind::UnlinkDir, EventType::DeleteDir),
            (ChangeKind::Other, EventType::Other),
        ];
        for (kind, expected) in cases {
            assert_eq!(classify_path(kind, "/home/a/x").event_type, expected);
        }
    }

    #[test]
    fn test_name_and_extension_derivation() {
        let event = classify_path(ChangeKind::Add, "/home/a/Documents/REPORT.PDF");
        assert_eq!(event.name, "REPORT.PDF");
        assert_eq!(event.extension, "pdf");

        let event = classify_path(ChangeKind::Add, "/home/a/archive.tar.gz");
        assert_eq!(event.extension, "gz");
    }

    #[test]
    fn test_extensionless_names_get_empty_extension() {
        assert_eq!(classify_path(ChangeKind::Add, "/home/a/README").extension, "");
        // Dotfiles have no extension in the classic basename sense.
        assert_eq!(classify_path(ChangeKind::Add, "/home/a/.env").extension, "");
        assert_eq!(classify_path(ChangeKind::AddDir, "/home/a/newdir").extension, "");
    }

    #[test]
    fn test_degenerate_paths_do_not_panic() {
        let event = classify_path(ChangeKind::Unlink, "/");
        assert_eq!(event.name, "");
        assert_eq!(event.extension, "");
    }

    #[test]
    fn test_external_drive_unix_prefixes() {
        assert!(is_external_drive(Path::new("/media/usb0/file.txt")));
        assert!(is_external_drive(Path::new("/run/media/alice/stick/file.txt")));
        assert!(!is_external_drive(Path::new("/home/alice/file.txt")));
        assert!(!is_external_drive(Path::new("/mnt/backup/file.txt")));
    }

    #[test]
    fn test_external_drive_windows_letters() {
        assert!(is_external_drive(Path::new("D:\\data\\file.txt")));
        assert!(is_external_drive(Path::new("e:/stuff/file.txt")));
        assert!(!is_external_drive(Path::new("C:\\Users\\alice\\file.txt")));
        assert!(!is_external_drive(Path::new("c:/temp/file.txt")));
    }

    #[test]
    fn test_classifier_is_deterministic() {
        let at = Utc::now();
        let change = RawChange::new(ChangeKind::Change, "/media/usb0/ledger.xlsx");
        assert_eq!(classify(&change, "alice", at), classify(&change, "alice", at));
    }

    #[test]
    fn test_actor_and_timestamp_carried_through() {
        let at = Utc::now();
        let change = RawChange::new(ChangeKind::Add, "/home/a/new.txt");
        let event = classify(&change, "mallory", at);
        assert_eq!(event.actor, "mallory");
        assert_eq!(event.created_at, at);
        assert_eq!(event.risk_score, 0);
    }
}
