use std::path::Path;

/// Size of the EFI system partition.
pub const EFI_SIZE_MIB: u64 = 512;

/// GPT type codes as understood by sgdisk.
pub const TYPE_EFI: &str = "ef00";
pub const TYPE_SWAP: &str = "8200";
pub const TYPE_LINUX: &str = "8300";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionSize {
    Mib(u64),
    /// Whatever is left on the disk.
    Remainder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filesystem {
    Fat32,
    Swap,
    Ext4,
}

impl Filesystem {
    /// Formatting command for `device`.
    pub fn mkfs(self, device: &str) -> (&'static str, Vec<String>) {
        match self {
            Filesystem::Fat32 => ("mkfs.fat", vec!["-F".into(), "32".into(), device.into()]),
            Filesystem::Swap => ("mkswap", vec![device.into()]),
            Filesystem::Ext4 => ("mkfs.ext4", vec!["-F".into(), device.into()]),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Filesystem::Fat32 => "FAT32",
            Filesystem::Swap => "swap",
            Filesystem::Ext4 => "ext4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    /// 1-based; sgdisk hands out numbers in creation order.
    pub index: u32,
    pub size: PartitionSize,
    pub type_code: &'static str,
    pub filesystem: Filesystem,
}

impl PartitionSpec {
    /// `sgdisk` arguments creating this partition on `disk`.
    fn sgdisk_args(&self, disk: &str) -> Vec<String> {
        let end = match self.size {
            PartitionSize::Mib(mib) => format!("+{}M", mib),
            PartitionSize::Remainder => "0".to_string(),
        };
        vec![
            format!("-n{}:0:{}", self.index, end),
            format!("-t{}:{}", self.index, self.type_code),
            disk.to_string(),
        ]
    }
}

/// The fixed three-partition GPT layout: EFI, swap, root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskLayout {
    partitions: [PartitionSpec; 3],
}

impl DiskLayout {
    pub fn partitions(&self) -> &[PartitionSpec] {
        &self.partitions
    }

    pub fn efi(&self) -> &PartitionSpec {
        &self.partitions[0]
    }

    pub fn swap(&self) -> &PartitionSpec {
        &self.partitions[1]
    }

    pub fn root(&self) -> &PartitionSpec {
        &self.partitions[2]
    }

    /// One `sgdisk` argument list per partition, in creation order.
    pub fn sgdisk_commands(&self, disk: &str) -> Vec<Vec<String>> {
        self.partitions.iter().map(|p| p.sgdisk_args(disk)).collect()
    }
}

/// Lays out EFI (512 MiB), swap (`swap_gib`) and root (rest of the disk).
///
/// Disk capacity is not checked here; a disk too small for the first two
/// partitions makes sgdisk fail on the third.
pub fn plan(swap_gib: u64) -> DiskLayout {
    DiskLayout {
        partitions: [
            PartitionSpec {
                index: 1,
                size: PartitionSize::Mib(EFI_SIZE_MIB),
                type_code: TYPE_EFI,
                filesystem: Filesystem::Fat32,
            },
            PartitionSpec {
                index: 2,
                size: PartitionSize::Mib(swap_gib * 1024),
                type_code: TYPE_SWAP,
                filesystem: Filesystem::Swap,
            },
            PartitionSpec {
                index: 3,
                size: PartitionSize::Remainder,
                type_code: TYPE_LINUX,
                filesystem: Filesystem::Ext4,
            },
        ],
    }
}

/// Device node of partition `index` on `disk`.
///
/// `/dev/sda` → `/dev/sda1`, `/dev/nvme0n1` → `/dev/nvme0n1p1`.
pub fn part_path(disk: &str, index: u32) -> String {
    let name = Path::new(disk)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if name.starts_with("nvme") || name.starts_with("mmcblk") || name.starts_with("loop") {
        format!("{}p{}", disk, index)
    } else {
        format!("{}{}", disk, index)
    }
}
