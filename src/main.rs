mod cmd;
mod config;
mod error;
mod logging;
mod lsblk;
mod steps;
mod ui;

use std::path::PathBuf;

use clap::Parser;
use console::style;
use dialoguer::Confirm;
use log::info;

use cmd::{DryRunHost, Host, SystemHost};
use config::InstallConfig;
use error::InstallerError;
use steps::{
    choices,
    executor::Executor,
    layout::{self, part_path, DiskLayout, EFI_SIZE_MIB},
    pipeline, preflight, sizing,
};

/// Installs Arch Linux on a single disk: EFI + swap + ext4 root.
#[derive(Debug, Parser)]
#[command(name = "arch-autoinstall", version)]
struct Args {
    /// Disk to wipe and install onto.
    #[arg(long, default_value = "/dev/sda")]
    disk: String,

    /// Where the new root filesystem gets mounted.
    #[arg(long, default_value = "/mnt")]
    mount_root: PathBuf,

    /// Host that must answer a ping before anything starts.
    #[arg(long, default_value = "archlinux.org")]
    ping_host: String,

    /// File receiving the debug log, including every command line run.
    #[arg(long, default_value = "/tmp/arch-autoinstall.log")]
    log_file: PathBuf,

    /// Print every action instead of running it. No root needed.
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn config(&self) -> InstallConfig {
        InstallConfig {
            disk: self.disk.clone(),
            mount_root: self.mount_root.clone(),
            ping_host: self.ping_host.clone(),
            dry_run: self.dry_run,
            ..InstallConfig::default()
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let args = Args::parse();
    std::process::exit(exit_code(run(&args)));
}

const SUCCESS_MESSAGE: &str = "Installation complete. Reboot when ready (shutdown -r now).";

/// Reports the outcome of a run and turns it into the process exit code.
fn exit_code(result: Result<(), InstallerError>) -> i32 {
    println!();
    match result {
        Ok(()) => {
            ui::print_success(SUCCESS_MESSAGE);
            0
        }
        Err(e) => {
            log::error!("{}", e);
            ui::print_error(&e.to_string());
            1
        }
    }
}

fn run(args: &Args) -> Result<(), InstallerError> {
    logging::init(&args.log_file)?;
    let config = args.config();
    info!("starting with {:?}", config);

    // ── Guard ─────────────────────────────────────────────────────────────────
    if !config.dry_run {
        preflight::check_root()?;
    }

    // ── Welcome ───────────────────────────────────────────────────────────────
    ui::print_banner();

    if config.dry_run {
        ui::print_warning("DRY-RUN MODE — no disk will be touched, no command will run.");
    }

    ui::print_info(&format!(
        "This wizard installs Arch Linux on {} after a few questions.",
        config.disk
    ));
    ui::print_info("Nothing is written before you confirm.");

    if config.dry_run {
        install(DryRunHost, &config)
    } else {
        install(SystemHost, &config)
    }
}

fn install<H: Host>(host: H, config: &InstallConfig) -> Result<(), InstallerError> {
    let mut executor = Executor::new(host, pipeline::TOTAL_PHASES);

    // ── Step 1: network ───────────────────────────────────────────────────────
    pipeline::check_connectivity(&mut executor, config)?;

    // ── Questions ─────────────────────────────────────────────────────────────
    println!();
    ui::print_info("Answer a few questions about the new system.");
    let mut chooser = choices::detect_chooser();
    let choices = choices::collect(chooser.as_mut())?;

    // ── Layout ────────────────────────────────────────────────────────────────
    let memory_gib = sizing::total_memory_gib()?;
    let swap_gib = sizing::swap_size_gib(memory_gib);
    info!("{} GiB of memory, {} GiB of swap", memory_gib, swap_gib);

    let layout = layout::plan(swap_gib);
    confirm_layout(config, &layout, swap_gib)?;

    // ── Steps 2‒9 ─────────────────────────────────────────────────────────────
    let phases = pipeline::install_phases(config, &layout, &choices)?;
    executor.run_phases(&phases)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Shows what is about to be erased and created, and asks one last time.
fn confirm_layout(
    config: &InstallConfig,
    layout: &DiskLayout,
    swap_gib: u64,
) -> Result<(), InstallerError> {
    let disk = lsblk::describe(&config.disk);
    let disk_line = match disk {
        Some(ref d) => format!("{}  {}  {}", d.path, d.size, d.model),
        None => config.disk.clone(),
    };
    let efi = format!(
        "{}  {} MiB  {}",
        part_path(&config.disk, layout.efi().index),
        EFI_SIZE_MIB,
        layout.efi().filesystem.label()
    );
    let swap = format!(
        "{}  {} GiB",
        part_path(&config.disk, layout.swap().index),
        swap_gib
    );
    let root = format!(
        "{}  rest of disk  {}",
        part_path(&config.disk, layout.root().index),
        layout.root().filesystem.label()
    );

    println!();
    ui::print_kv_box(
        "Partition Layout",
        &[
            ("Disk", disk_line.as_str()),
            ("EFI", efi.as_str()),
            ("Swap", swap.as_str()),
            ("Root", root.as_str()),
        ],
    );
    println!();
    println!(
        "  {}",
        style(format!("⚠  ALL DATA ON {} WILL BE PERMANENTLY ERASED.", config.disk))
            .red()
            .bold()
    );
    println!();

    if !Confirm::new()
        .with_prompt("Erase the disk and install?")
        .default(false)
        .interact()?
    {
        return Err(InstallerError::Cancelled);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_exits_with_zero() {
        assert_eq!(exit_code(Ok(())), 0);
    }

    #[test]
    fn failures_exit_with_one() {
        assert_eq!(exit_code(Err(InstallerError::Cancelled)), 1);

        let failed = InstallerError::CommandFailed {
            command: "mkfs.fat -F 32 /dev/sda1".to_string(),
            code: 1,
        };
        assert!(failed.to_string().contains("mkfs.fat -F 32 /dev/sda1"));
        assert_eq!(exit_code(Err(failed)), 1);
    }

    #[test]
    fn a_failed_format_exits_with_one() {
        use steps::{executor::tests::RecordingHost, script::tests::sample_choices};

        let config = InstallConfig::default();
        let mut executor = Executor::new(RecordingHost::failing("mkfs.ext4"), pipeline::TOTAL_PHASES);
        let result = pipeline::install_phases(&config, &layout::plan(4), &sample_choices())
            .and_then(|phases| executor.run_phases(&phases));

        assert!(matches!(result, Err(InstallerError::CommandFailed { .. })));
        assert_eq!(exit_code(result), 1);
    }

    #[test]
    fn args_map_onto_the_config() {
        let args = Args::parse_from([
            "arch-autoinstall",
            "--disk",
            "/dev/nvme0n1",
            "--log-file",
            "/var/log/install.log",
            "--dry-run",
        ]);
        assert_eq!(args.log_file, PathBuf::from("/var/log/install.log"));

        let config = args.config();
        assert_eq!(config.disk, "/dev/nvme0n1");
        assert_eq!(config.mount_root, PathBuf::from("/mnt"));
        assert!(config.dry_run);
    }
}
