use std::fs;

use crate::error::InstallerError;

/// Fails unless the process runs as root (UID 0).
pub fn check_root() -> Result<(), InstallerError> {
    let uid = fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|s| parse_uid(&s))
        .unwrap_or(1); // unreadable counts as unprivileged

    if uid != 0 {
        return Err(InstallerError::NotRoot);
    }

    Ok(())
}

/// Real UID from the `Uid:` line of `/proc/<pid>/status`.
fn parse_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find(|l| l.starts_with("Uid:"))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}
