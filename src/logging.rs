use std::{io, path::Path};

use log::LevelFilter;

use crate::error::InstallerError;

/// Initialise logging with fern.
///
/// Everything from debug up lands in `log_file`; warnings and errors are
/// also echoed to stderr. A log file that cannot be created is reported
/// and skipped, the installer keeps going.
pub fn init(log_file: &Path) -> Result<(), InstallerError> {
    let mut file_log = fern::Dispatch::new()
        .level(LevelFilter::Debug)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        });

    match fern::log_file(log_file) {
        Ok(file) => file_log = file_log.chain(file),
        Err(why) => {
            eprintln!("failed to create log file at {}: {}", log_file.display(), why);
        }
    }

    fern::Dispatch::new()
        .level(LevelFilter::Debug)
        // dialoguer and friends stay quiet
        .level_for("console", LevelFilter::Off)
        .chain(file_log)
        .chain(
            fern::Dispatch::new()
                .level(LevelFilter::Warn)
                .format(|out, message, record| {
                    out.finish(format_args!("[{} arch-autoinstall] {}", record.level(), message))
                })
                .chain(io::stderr()),
        )
        .apply()?;

    Ok(())
}
