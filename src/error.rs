use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command '{command}' failed with exit code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("Command '{0}' not found — is it installed?")]
    CommandNotFound(String),

    #[error("Installation cancelled by user")]
    Cancelled,

    #[error("This installer must be run as root (sudo)")]
    NotRoot,

    #[error("No network connection ({0} is unreachable)")]
    NoNetwork(String),

    #[error("Nothing to choose from: no {0} available on this system")]
    NoChoices(&'static str),

    #[error("Selection {0} is not one of the offered options")]
    InvalidSelection(usize),

    #[error("The {0} contains a NUL byte and cannot go into the configuration script")]
    Unquotable(&'static str),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Could not set up logging: {0}")]
    Logging(#[from] log::SetLoggerError),
}
