use std::fs;

use crate::error::InstallerError;

/// Largest swap partition ever created, in GiB.
pub const MAX_SWAP_GIB: u64 = 8;

/// Swap size for a machine with `total_memory_gib` of RAM.
///
/// Small machines get enough swap to hibernate, big ones stop at
/// [`MAX_SWAP_GIB`].
pub fn swap_size_gib(total_memory_gib: u64) -> u64 {
    match total_memory_gib {
        0..=4 => 2,
        5..=8 => 4,
        _ => MAX_SWAP_GIB,
    }
}

/// Total memory in whole GiB (rounded down), read from `/proc/meminfo`.
pub fn total_memory_gib() -> Result<u64, InstallerError> {
    let meminfo = fs::read_to_string("/proc/meminfo")?;
    parse_mem_total_gib(&meminfo).ok_or_else(|| {
        InstallerError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "MemTotal missing from /proc/meminfo",
        ))
    })
}

fn parse_mem_total_gib(meminfo: &str) -> Option<u64> {
    let kib: u64 = meminfo
        .lines()
        .find(|l| l.starts_with("MemTotal:"))?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()?;
    Some(kib / (1024 * 1024))
}
