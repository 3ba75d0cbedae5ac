use std::path::Path;

use crate::{
    cmd::{Host, Invocation},
    config::{InstallChoices, InstallConfig},
    error::InstallerError,
    steps::{
        executor::{Action, Executor, Phase, Stage},
        layout::{part_path, DiskLayout},
        script,
    },
};

pub const TOTAL_PHASES: usize = 9;

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

// ── Phase 1 ───────────────────────────────────────────────────────────────────

pub fn connectivity_phase(config: &InstallConfig) -> Phase {
    Phase {
        number: 1,
        title: "Network Check",
        stages: vec![Stage::exec(Invocation::new("ping", ["-c", "1", config.ping_host.as_str()]))
            .describe(format!("Pinging {}", config.ping_host))],
    }
}

/// Runs phase 1. Happens before any question is asked or anything touched.
pub fn check_connectivity<H: Host>(
    executor: &mut Executor<H>,
    config: &InstallConfig,
) -> Result<(), InstallerError> {
    executor
        .run_phases(&[connectivity_phase(config)])
        .map_err(|why| match why {
            InstallerError::CommandFailed { .. } => InstallerError::NoNetwork(config.ping_host.clone()),
            other => other,
        })
}

// ── Phases 2‒9 ────────────────────────────────────────────────────────────────

fn partition_stages(config: &InstallConfig, layout: &DiskLayout) -> Vec<Stage> {
    let mut stages = vec![Stage::exec(Invocation::new("sgdisk", ["-Z", config.disk.as_str()]))
        .describe(format!("Wiping the partition table of {}", config.disk))];

    for (spec, args) in layout.partitions().iter().zip(layout.sgdisk_commands(&config.disk)) {
        stages.push(
            Stage::exec(Invocation::new("sgdisk", args)).describe(format!(
                "Creating partition {} ({})",
                spec.index,
                spec.filesystem.label()
            )),
        );
    }
    stages
}

fn format_stages(config: &InstallConfig, layout: &DiskLayout) -> Vec<Stage> {
    layout
        .partitions()
        .iter()
        .map(|spec| {
            let device = part_path(&config.disk, spec.index);
            let (program, args) = spec.filesystem.mkfs(&device);
            Stage::exec(Invocation::new(program, args))
                .describe(format!("Formatting {} as {}", device, spec.filesystem.label()))
        })
        .collect()
}

/// Root first, then the EFI mount point inside it, then swap.
fn mount_stages(config: &InstallConfig, layout: &DiskLayout) -> Vec<Stage> {
    let root = part_path(&config.disk, layout.root().index);
    let efi = part_path(&config.disk, layout.efi().index);
    let swap = part_path(&config.disk, layout.swap().index);
    let mount_root = path_arg(&config.mount_root);
    let efi_mount = path_arg(&config.efi_mount());

    vec![
        Stage::exec(Invocation::new("mount", [root.clone(), mount_root.clone()]))
            .describe(format!("Mounting {} at {}", root, mount_root)),
        Stage::exec(Invocation::new("mkdir", ["-p".to_string(), efi_mount.clone()])),
        Stage::exec(Invocation::new("mount", [efi.clone(), efi_mount.clone()]))
            .describe(format!("Mounting {} at {}", efi, efi_mount)),
        Stage::exec(Invocation::new("swapon", [swap.clone()]))
            .describe(format!("Activating swap on {}", swap)),
    ]
}

fn bootstrap_stages(config: &InstallConfig) -> Vec<Stage> {
    let mut args = vec![path_arg(&config.mount_root), "--needed".into(), "--noconfirm".into()];
    args.extend(config.packages.iter().cloned());

    vec![Stage::exec(Invocation::new("pacstrap", args).inherit())
        .describe("Installing the base system with pacstrap")]
}

fn fstab_stages(config: &InstallConfig) -> Vec<Stage> {
    let fstab = config.in_target("/etc/fstab");
    vec![
        Stage::exec(
            Invocation::new("genfstab", ["-U".to_string(), path_arg(&config.mount_root)])
                .to_file(&fstab),
        )
        .describe("Generating fstab (UUID-based)"),
        Stage::exec(Invocation::new("cat", [path_arg(&fstab)]).inherit())
            .describe("Generated fstab")
            .non_fatal(),
    ]
}

fn script_stages(
    config: &InstallConfig,
    choices: &InstallChoices,
) -> Result<Vec<Stage>, InstallerError> {
    Ok(vec![Stage::new(Action::WriteFile {
        path: config.in_target(script::SCRIPT_PATH),
        contents: script::render(choices, config)?,
        mode: 0o700,
    })
    .describe("Writing the configuration script")])
}

/// The script runs and is deleted, then passwords are piped to chpasswd.
fn configure_stages(config: &InstallConfig, choices: &InstallChoices) -> Vec<Stage> {
    let mount_root = path_arg(&config.mount_root);
    vec![
        Stage::exec(
            Invocation::new("arch-chroot", [mount_root.clone(), script::SCRIPT_PATH.to_string()])
                .inherit(),
        )
        .describe("Configuring the new system inside the chroot"),
        Stage::new(Action::RemoveFile(config.in_target(script::SCRIPT_PATH))).non_fatal(),
        Stage::exec(
            Invocation::new("arch-chroot", [mount_root, "chpasswd".to_string()])
                .with_stdin(script::password_feed(choices)),
        )
        .describe("Setting passwords"),
    ]
}

fn unmount_stages(config: &InstallConfig) -> Vec<Stage> {
    vec![Stage::exec(Invocation::new("umount", ["-R".to_string(), path_arg(&config.mount_root)]))
        .describe("Unmounting partitions")]
}

/// Everything after the confirmation: partitioning through unmounting.
/// Built in full before the first stage runs, so a script that cannot be
/// rendered fails with the disk untouched.
pub fn install_phases(
    config: &InstallConfig,
    layout: &DiskLayout,
    choices: &InstallChoices,
) -> Result<Vec<Phase>, InstallerError> {
    Ok(vec![
        Phase { number: 2, title: "Disk Partitioning", stages: partition_stages(config, layout) },
        Phase { number: 3, title: "Partition Formatting", stages: format_stages(config, layout) },
        Phase { number: 4, title: "Mounting Partitions", stages: mount_stages(config, layout) },
        Phase { number: 5, title: "Base System Installation", stages: bootstrap_stages(config) },
        Phase { number: 6, title: "Filesystem Table", stages: fstab_stages(config) },
        Phase { number: 7, title: "Configuration Script", stages: script_stages(config, choices)? },
        Phase { number: 8, title: "System Configuration", stages: configure_stages(config, choices) },
        Phase { number: 9, title: "Unmounting", stages: unmount_stages(config) },
    ])
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::steps::{
        executor::tests::RecordingHost, layout, script::tests::sample_choices, sizing,
    };

    fn install(host: RecordingHost, memory_gib: u64) -> (Executor<RecordingHost>, Result<(), InstallerError>) {
        let config = InstallConfig::default();
        let choices = sample_choices();
        let layout = layout::plan(sizing::swap_size_gib(memory_gib));

        let mut ex = Executor::new(host, TOTAL_PHASES);
        let result = check_connectivity(&mut ex, &config)
            .and_then(|()| install_phases(&config, &layout, &choices))
            .and_then(|phases| ex.run_phases(&phases));
        (ex, result)
    }

    #[test]
    fn full_run_with_8_gib_of_memory() {
        let (ex, result) = install(RecordingHost::default(), 8);
        result.unwrap();
        let host = ex.host();

        assert_eq!(
            host.log,
            [
                "ping -c 1 archlinux.org",
                "sgdisk -Z /dev/sda",
                "sgdisk -n1:0:+512M -t1:ef00 /dev/sda",
                "sgdisk -n2:0:+4096M -t2:8200 /dev/sda",
                "sgdisk -n3:0:0 -t3:8300 /dev/sda",
                "mkfs.fat -F 32 /dev/sda1",
                "mkswap /dev/sda2",
                "mkfs.ext4 -F /dev/sda3",
                "mount /dev/sda3 /mnt",
                "mkdir -p /mnt/boot/efi",
                "mount /dev/sda1 /mnt/boot/efi",
                "swapon /dev/sda2",
                "pacstrap /mnt --needed --noconfirm base linux linux-firmware sof-firmware \
                 base-devel grub efibootmgr nano networkmanager",
                "genfstab -U /mnt > /mnt/etc/fstab",
                "cat /mnt/etc/fstab",
                "write /mnt/post_install.sh",
                "arch-chroot /mnt /post_install.sh",
                "rm /mnt/post_install.sh",
                "arch-chroot /mnt chpasswd",
                "umount -R /mnt",
            ]
        );

        let (path, contents, mode) = &host.written[0];
        assert_eq!(path, &PathBuf::from("/mnt/post_install.sh"));
        assert_eq!(*mode, 0o700);
        for needle in ["America/Sao_Paulo", "en_US.UTF-8", "arch-box", "useradd -m -G wheel -s /bin/bash alice"] {
            assert!(contents.contains(needle), "script lacks {}", needle);
        }

        // removed after running, and passwords only ever went through stdin
        assert!(host.files.is_empty());
        assert_eq!(host.stdin_seen, ["root:root-pw\nalice:alice-pw\n"]);
        assert!(host.log.iter().all(|l| !l.contains("-pw")));
    }

    #[test]
    fn format_failure_stops_before_mounting() {
        let (ex, result) = install(RecordingHost::failing("mkfs.fat"), 8);

        match result {
            Err(InstallerError::CommandFailed { command, .. }) => {
                assert_eq!(command, "mkfs.fat -F 32 /dev/sda1")
            }
            other => panic!("expected a command failure, got {:?}", other),
        }

        let host = ex.host();
        assert_eq!(host.log.last().map(String::as_str), Some("mkfs.fat -F 32 /dev/sda1"));
        for later in ["mkswap", "mount", "swapon", "pacstrap", "genfstab", "arch-chroot", "umount"] {
            assert!(!host.ran(later), "{} ran after the failure", later);
        }
        assert!(host.written.is_empty());
    }

    #[test]
    fn unreachable_network_is_reported_as_such() {
        let (ex, result) = install(RecordingHost::failing("ping"), 8);
        assert!(matches!(result, Err(InstallerError::NoNetwork(ref h)) if h == "archlinux.org"));
        assert_eq!(ex.host().log.len(), 1);
    }

    #[test]
    fn swap_follows_memory() {
        let (ex, _) = install(RecordingHost::default(), 3);
        assert!(ex.host().log.contains(&"sgdisk -n2:0:+2048M -t2:8200 /dev/sda".to_string()));

        let (ex, _) = install(RecordingHost::default(), 64);
        assert!(ex.host().log.contains(&"sgdisk -n2:0:+8192M -t2:8200 /dev/sda".to_string()));
    }

    #[test]
    fn other_disks_and_mount_roots() {
        let config = InstallConfig {
            disk: "/dev/nvme0n1".to_string(),
            mount_root: PathBuf::from("/target"),
            ..InstallConfig::default()
        };
        let layout = layout::plan(4);
        let phases = install_phases(&config, &layout, &sample_choices()).unwrap();

        let mut ex = Executor::new(RecordingHost::default(), TOTAL_PHASES);
        ex.run_phases(&phases).unwrap();
        let log = &ex.host().log;
        assert!(log.contains(&"mount /dev/nvme0n1p3 /target".to_string()));
        assert!(log.contains(&"mount /dev/nvme0n1p1 /target/boot/efi".to_string()));
        assert!(log.contains(&"umount -R /target".to_string()));
    }

    #[test]
    fn unquotable_hostname_fails_before_partitioning() {
        let mut choices = sample_choices();
        choices.hostname = "arch\0box".to_string();
        let config = InstallConfig::default();

        let mut ex = Executor::new(RecordingHost::default(), TOTAL_PHASES);
        let result = check_connectivity(&mut ex, &config)
            .and_then(|()| install_phases(&config, &layout::plan(4), &choices))
            .and_then(|phases| ex.run_phases(&phases));

        assert!(matches!(result, Err(InstallerError::Unquotable("hostname"))));
        assert_eq!(ex.host().log, ["ping -c 1 archlinux.org"]);
    }
}
