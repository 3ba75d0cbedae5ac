use std::{
    fmt,
    fs::{self, OpenOptions},
    io::{self, Write},
    os::unix::fs::{OpenOptionsExt, PermissionsExt},
    path::{Path, PathBuf},
    process::{self, Command, Stdio},
    thread,
    time::Duration,
};

use dialoguer::Confirm;
use log::{info, warn};

use crate::{config::Secret, error::InstallerError, ui};

// ── Invocation ────────────────────────────────────────────────────────────────

/// Where a command's stdout goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// The command owns the terminal (pacstrap, arch-chroot).
    Inherit,
    /// Output is swallowed behind a spinner and dumped only on failure.
    Captured,
    /// stdout truncates and fills the given file (`genfstab > fstab`).
    ToFile(PathBuf),
}

/// One external program call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub output: Output,
    /// Fed through a pipe, never through argv.
    pub stdin: Option<Secret>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            output: Output::Captured,
            stdin: None,
        }
    }

    pub fn inherit(mut self) -> Self {
        self.output = Output::Inherit;
        self
    }

    pub fn to_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Output::ToFile(path.into());
        self
    }

    pub fn with_stdin(mut self, secret: Secret) -> Self {
        self.stdin = Some(secret);
        self
    }
}

/// Renders the command line. Stdin is not part of it.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        if let Output::ToFile(ref path) = self.output {
            write!(f, " > {}", path.display())?;
        }
        Ok(())
    }
}

// ── Host capability ───────────────────────────────────────────────────────────

/// Everything the installer does to the machine goes through this trait:
/// disk tools, filesystem tools, chroot runs and the few files it writes.
pub trait Host {
    fn exec(&mut self, invocation: &Invocation) -> Result<(), InstallerError>;

    fn write_file(&mut self, path: &Path, contents: &str, mode: u32) -> Result<(), InstallerError>;

    fn remove_file(&mut self, path: &Path) -> Result<(), InstallerError>;
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn not_found_or_io(program: &str, err: io::Error) -> InstallerError {
    if err.kind() == io::ErrorKind::NotFound {
        InstallerError::CommandNotFound(program.to_string())
    } else {
        InstallerError::Io(err)
    }
}

fn print_captured_output(stdout: &[u8], stderr: &[u8]) {
    let out = String::from_utf8_lossy(stdout);
    let err = String::from_utf8_lossy(stderr);
    if !out.trim().is_empty() {
        eprintln!("{}", out.trim());
    }
    if !err.trim().is_empty() {
        eprintln!("{}", err.trim());
    }
}

/// Maps a binary name to the Arch package that ships it.
fn package_for(program: &str) -> &str {
    match program {
        "sgdisk" | "gdisk" => "gptfdisk",
        "mkfs.fat" | "mkfs.vfat" => "dosfstools",
        "mkfs.ext4" => "e2fsprogs",
        "mkswap" | "swapon" | "swapoff" | "mount" | "umount" | "lsblk" => "util-linux",
        "pacstrap" | "genfstab" | "arch-chroot" => "arch-install-scripts",
        "ping" => "iputils",
        other => other,
    }
}

/// Offers to install the package providing `program` with pacman.
/// Declining yields `CommandNotFound`.
fn offer_install(program: &str) -> Result<(), InstallerError> {
    let pkg = package_for(program);

    ui::print_warning(&format!("Command '{}' not found.", program));
    println!();

    if !Confirm::new()
        .with_prompt(format!("Install '{}' with pacman?", pkg))
        .default(true)
        .interact()?
    {
        return Err(InstallerError::CommandNotFound(program.to_string()));
    }

    println!();
    let status = Command::new("pacman")
        .args(["-Sy", "--noconfirm", pkg])
        .status()
        .map_err(|e| not_found_or_io("pacman", e))?;

    if !status.success() {
        return Err(InstallerError::CommandFailed {
            command: format!("pacman -Sy --noconfirm {}", pkg),
            code: status.code().unwrap_or(-1),
        });
    }

    Ok(())
}

fn spawn(invocation: &Invocation) -> Result<(), InstallerError> {
    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args);

    if invocation.stdin.is_some() {
        command.stdin(Stdio::piped());
    }

    match invocation.output {
        Output::Inherit => {}
        Output::Captured => {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        Output::ToFile(ref path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = fs::File::create(path)?;
            command.stdout(file).stderr(Stdio::piped());
        }
    }

    let pb = (invocation.output == Output::Captured)
        .then(|| ui::spinner(format!("Running {}…", invocation.program)));

    let result = command
        .spawn()
        .map_err(|e| not_found_or_io(&invocation.program, e))
        .and_then(|mut child| -> Result<process::Output, InstallerError> {
            if let (Some(secret), Some(mut pipe)) = (&invocation.stdin, child.stdin.take()) {
                pipe.write_all(secret.expose().as_bytes())?;
                // dropping the pipe sends EOF
            }
            Ok(child.wait_with_output()?)
        });

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let output = result?;
    if !output.status.success() {
        print_captured_output(&output.stdout, &output.stderr);
        return Err(InstallerError::CommandFailed {
            command: invocation.to_string(),
            code: output.status.code().unwrap_or(-1),
        });
    }

    Ok(())
}

// ── Real host ─────────────────────────────────────────────────────────────────

/// Runs the real system utilities.
#[derive(Debug, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn exec(&mut self, invocation: &Invocation) -> Result<(), InstallerError> {
        info!(
            "executing {}{}",
            invocation,
            if invocation.stdin.is_some() { " (stdin piped)" } else { "" }
        );

        match spawn(invocation) {
            Err(InstallerError::CommandNotFound(program)) => {
                warn!("{} is missing", program);
                offer_install(&program)?;
                spawn(invocation)
            }
            other => other,
        }
    }

    fn write_file(&mut self, path: &Path, contents: &str, mode: u32) -> Result<(), InstallerError> {
        info!("writing {} (mode {:o})", path.display(), mode);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(path)?;
        // `mode` only applies on creation
        file.set_permissions(fs::Permissions::from_mode(mode))?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> Result<(), InstallerError> {
        info!("removing {}", path.display());
        fs::remove_file(path)?;
        Ok(())
    }
}

// ── Dry-run host ──────────────────────────────────────────────────────────────

/// Prints what would happen and simulates each command with a short delay.
#[derive(Debug, Default)]
pub struct DryRunHost;

impl DryRunHost {
    fn simulate(msg: String) {
        let pb = ui::spinner(msg);
        thread::sleep(Duration::from_millis(300));
        pb.finish_and_clear();
    }
}

impl Host for DryRunHost {
    fn exec(&mut self, invocation: &Invocation) -> Result<(), InstallerError> {
        info!("dry-run: {}", invocation);
        Self::simulate(format!("[dry-run] {}", invocation));
        ui::print_info(&format!("[dry-run] {}", invocation));
        Ok(())
    }

    fn write_file(&mut self, path: &Path, contents: &str, mode: u32) -> Result<(), InstallerError> {
        info!("dry-run: write {}", path.display());
        ui::print_info(&format!(
            "[dry-run] write {} ({} bytes, mode {:o})",
            path.display(),
            contents.len(),
            mode
        ));
        Ok(())
    }

    fn remove_file(&mut self, path: &Path) -> Result<(), InstallerError> {
        info!("dry-run: remove {}", path.display());
        ui::print_info(&format!("[dry-run] rm {}", path.display()));
        Ok(())
    }
}

// ── Capture ───────────────────────────────────────────────────────────────────

/// Runs a read-only command and returns its stdout.
pub fn run_capture(program: &str, args: &[&str]) -> Result<String, InstallerError> {
    let output = Command::new(program)
        .args(args)
        .stderr(Stdio::null())
        .output()
        .map_err(|e| not_found_or_io(program, e))?;

    if !output.status.success() {
        return Err(InstallerError::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            code: output.status.code().unwrap_or(-1),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_shows_args_and_redirect_but_not_stdin() {
        let inv = Invocation::new("genfstab", ["-U", "/mnt"]).to_file("/mnt/etc/fstab");
        assert_eq!(inv.to_string(), "genfstab -U /mnt > /mnt/etc/fstab");

        let inv = Invocation::new("arch-chroot", ["/mnt", "chpasswd"])
            .with_stdin(Secret::new("root:hunter2\n"));
        assert_eq!(inv.to_string(), "arch-chroot /mnt chpasswd");
        assert!(!format!("{:?}", inv).contains("hunter2"));
    }

    #[test]
    fn system_host_writes_owner_only_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post_install.sh");

        let mut host = SystemHost;
        host.write_file(&path, "#!/bin/bash\n", 0o700).unwrap();

        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o700);
        assert_eq!(fs::read_to_string(&path).unwrap(), "#!/bin/bash\n");

        host.remove_file(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn system_host_reports_the_failing_command_line() {
        let mut host = SystemHost;
        let err = host.exec(&Invocation::new("false", ["--flag"])).unwrap_err();
        match err {
            InstallerError::CommandFailed { command, code } => {
                assert_eq!(command, "false --flag");
                assert_ne!(code, 0);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn to_file_output_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/fstab");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale contents that must disappear\n").unwrap();

        SystemHost
            .exec(&Invocation::new("echo", ["fresh"]).to_file(&path))
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }
}
