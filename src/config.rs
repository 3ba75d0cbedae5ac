use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::steps::choices::{Locale, Timezone};

/// Packages pacstrapped into the new root.
pub const BASE_PACKAGES: &[&str] = &[
    "base",
    "linux",
    "linux-firmware",
    "sof-firmware",
    "base-devel",
    "grub",
    "efibootmgr",
    "nano",
    "networkmanager",
];

/// Where the installation happens. Built once from the command line and
/// passed by reference to every step.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Block device that gets wiped, e.g. `/dev/sda`.
    pub disk: String,
    /// Mount point of the new root filesystem.
    pub mount_root: PathBuf,
    /// EFI mount point, relative to `mount_root`.
    pub efi_dir: PathBuf,
    /// Host pinged before anything else happens.
    pub ping_host: String,
    pub packages: Vec<String>,
    pub dry_run: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        InstallConfig {
            disk: "/dev/sda".to_string(),
            mount_root: PathBuf::from("/mnt"),
            efi_dir: PathBuf::from("boot/efi"),
            ping_host: "archlinux.org".to_string(),
            packages: BASE_PACKAGES.iter().map(|p| p.to_string()).collect(),
            dry_run: false,
        }
    }
}

impl InstallConfig {
    /// Absolute EFI mount point inside the live system.
    pub fn efi_mount(&self) -> PathBuf {
        self.mount_root.join(&self.efi_dir)
    }

    /// Maps a path of the target system (`/etc/fstab`) to its location
    /// under the mount root (`/mnt/etc/fstab`).
    pub fn in_target(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        self.mount_root.join(path.strip_prefix("/").unwrap_or(path))
    }
}

/// A password. Never printed, never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

/// Everything the user answered, frozen after the confirmation prompt.
#[derive(Debug, Clone)]
pub struct InstallChoices {
    pub timezone: Timezone,
    pub locale: Locale,
    pub hostname: String,
    pub username: String,
    pub user_password: Secret,
    pub root_password: Secret,
}
