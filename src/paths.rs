use std::path::PathBuf;

/// Returns the root ticketdesk directory path.
///
/// Resolution order:
/// 1. `TICKETDESK_ROOT` environment variable (if set)
/// 2. Current working directory + `.ticketdesk`
pub fn desk_root() -> PathBuf {
    if let Ok(root) = std::env::var("TICKETDESK_ROOT")
        && !root.is_empty()
    {
        PathBuf::from(root)
    } else {
        PathBuf::from(".ticketdesk")
    }
}

/// Returns the path of the persisted hosted-backend session.
pub fn session_path() -> PathBuf {
    desk_root().join("session.json")
}

/// Returns the path of the log file used while the TUI owns the terminal.
pub fn log_path() -> PathBuf {
    desk_root().join("ticketdesk.log")
}
