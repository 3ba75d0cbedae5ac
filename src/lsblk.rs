use std::collections::HashMap;

use crate::cmd;

// ── Data types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    pub path: String,  // /dev/sda
    pub size: String,  // 20G
    pub model: String, // SAMSUNG SSD 870
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Looks up size and model of `path` for the confirmation box.
/// Returns `None` if lsblk is unavailable or does not know the device.
pub fn describe(path: &str) -> Option<Disk> {
    let output = cmd::run_capture(
        "lsblk",
        &["--pairs", "--output", "NAME,SIZE,TYPE,MODEL", "--nodeps", path],
    )
    .ok()?;

    parse_disk(&output, path)
}

fn parse_disk(output: &str, path: &str) -> Option<Disk> {
    output.lines().find_map(|line| {
        let m = parse_pairs(line);
        if m.get("TYPE").map(String::as_str) != Some("disk") {
            return None;
        }
        Some(Disk {
            path: path.to_string(),
            size: m.get("SIZE").cloned().unwrap_or_default(),
            model: match m.get("MODEL") {
                Some(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => "—".to_string(),
            },
        })
    })
}

// ── lsblk --pairs parser ──────────────────────────────────────────────────────
//
// Each line looks like:   NAME="sda" SIZE="20G" TYPE="disk" MODEL="QEMU HARDDISK"

fn parse_pairs(line: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut rest = line.trim();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].split_whitespace().last().unwrap_or("").to_string();
        rest = &rest[eq + 1..];

        let Some(quoted) = rest.strip_prefix('"') else { break };
        let Some(close) = quoted.find('"') else { break };
        let value = quoted[..close].to_string();
        rest = &quoted[close + 1..];

        if !key.is_empty() {
            map.insert(key, value);
        }
    }

    map
}
