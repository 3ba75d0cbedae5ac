use std::{fmt, path::PathBuf};

use log::{error, info, warn};

use crate::{
    cmd::{Host, Invocation},
    error::InstallerError,
    ui,
};

// ── Stages ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Action {
    Exec(Invocation),
    WriteFile {
        path: PathBuf,
        contents: String,
        mode: u32,
    },
    RemoveFile(PathBuf),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Exec(inv) => write!(f, "{}", inv),
            Action::WriteFile { path, mode, .. } => {
                write!(f, "write {} (mode {:o})", path.display(), mode)
            }
            Action::RemoveFile(path) => write!(f, "rm {}", path.display()),
        }
    }
}

/// One operation of the installation.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Printed before the action runs.
    pub description: Option<String>,
    pub action: Action,
    /// A failing stage stops everything unless this is `false`.
    pub abort_on_failure: bool,
}

impl Stage {
    pub fn new(action: Action) -> Self {
        Stage { description: None, action, abort_on_failure: true }
    }

    pub fn exec(invocation: Invocation) -> Self {
        Stage::new(Action::Exec(invocation))
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn non_fatal(mut self) -> Self {
        self.abort_on_failure = false;
        self
    }
}

/// A numbered group of stages shown under one step header.
#[derive(Debug, Clone)]
pub struct Phase {
    pub number: usize,
    pub title: &'static str,
    pub stages: Vec<Stage>,
}

// ── Executor ──────────────────────────────────────────────────────────────────

/// Runs stages one after the other on a [`Host`].
///
/// The first failing stage that is not marked non-fatal ends the run.
/// Nothing is rolled back: a failed run is recovered by starting over,
/// which wipes the partition table again.
pub struct Executor<H: Host> {
    host: H,
    total_phases: usize,
}

impl<H: Host> Executor<H> {
    pub fn new(host: H, total_phases: usize) -> Self {
        Executor { host, total_phases }
    }

    #[cfg(test)]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn run_stage(&mut self, stage: &Stage) -> Result<(), InstallerError> {
        if let Some(ref description) = stage.description {
            ui::print_action(description);
        }

        let result = match stage.action {
            Action::Exec(ref inv) => self.host.exec(inv),
            Action::WriteFile { ref path, ref contents, mode } => {
                self.host.write_file(path, contents, mode)
            }
            Action::RemoveFile(ref path) => self.host.remove_file(path),
        };

        match result {
            Ok(()) => Ok(()),
            Err(why) if !stage.abort_on_failure => {
                warn!("ignoring failure of '{}': {}", stage.action, why);
                ui::print_warning(&format!("'{}' failed, continuing: {}", stage.action, why));
                Ok(())
            }
            Err(why) => {
                error!("'{}' failed: {}", stage.action, why);
                ui::print_error(&format!("Failed: {}", stage.action));
                Err(why)
            }
        }
    }

    pub fn run_stages(&mut self, stages: &[Stage]) -> Result<(), InstallerError> {
        stages.iter().try_for_each(|stage| self.run_stage(stage))
    }

    /// Runs each phase under its step header.
    pub fn run_phases(&mut self, phases: &[Phase]) -> Result<(), InstallerError> {
        for phase in phases {
            ui::print_step(phase.number, self.total_phases, phase.title);
            info!("phase {}: {}", phase.number, phase.title);
            self.run_stages(&phase.stages)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{collections::HashMap, path::Path};

    use super::*;

    /// Records every action and keeps written files in memory.
    /// Any invocation of `fail_program` exits with status 1.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingHost {
        pub log: Vec<String>,
        pub files: HashMap<PathBuf, String>,
        pub written: Vec<(PathBuf, String, u32)>,
        pub stdin_seen: Vec<String>,
        pub fail_program: Option<String>,
    }

    impl RecordingHost {
        pub fn failing(program: &str) -> Self {
            RecordingHost { fail_program: Some(program.to_string()), ..Default::default() }
        }

        pub fn ran(&self, program: &str) -> bool {
            self.log.iter().any(|l| l.split_whitespace().next() == Some(program))
        }
    }

    impl Host for RecordingHost {
        fn exec(&mut self, invocation: &Invocation) -> Result<(), InstallerError> {
            self.log.push(invocation.to_string());
            if let Some(ref secret) = invocation.stdin {
                self.stdin_seen.push(secret.expose().to_string());
            }
            if self.fail_program.as_deref() == Some(invocation.program.as_str()) {
                return Err(InstallerError::CommandFailed {
                    command: invocation.to_string(),
                    code: 1,
                });
            }
            Ok(())
        }

        fn write_file(&mut self, path: &Path, contents: &str, mode: u32) -> Result<(), InstallerError> {
            self.log.push(format!("write {}", path.display()));
            self.files.insert(path.to_path_buf(), contents.to_string());
            self.written.push((path.to_path_buf(), contents.to_string(), mode));
            Ok(())
        }

        fn remove_file(&mut self, path: &Path) -> Result<(), InstallerError> {
            self.log.push(format!("rm {}", path.display()));
            match self.files.remove(path) {
                Some(_) => Ok(()),
                None => Err(std::io::Error::from(std::io::ErrorKind::NotFound).into()),
            }
        }
    }

    fn stages() -> Vec<Stage> {
        vec![
            Stage::exec(Invocation::new("first", ["a"])).describe("first"),
            Stage::exec(Invocation::new("second", ["b"])),
            Stage::exec(Invocation::new("third", ["c"])),
        ]
    }

    #[test]
    fn runs_everything_in_order() {
        let mut ex = Executor::new(RecordingHost::default(), 1);
        ex.run_stages(&stages()).unwrap();
        assert_eq!(ex.host().log, ["first a", "second b", "third c"]);
    }

    #[test]
    fn fatal_failure_stops_the_run() {
        let mut ex = Executor::new(RecordingHost::failing("second"), 1);
        let err = ex.run_stages(&stages()).unwrap_err();

        assert!(matches!(err, InstallerError::CommandFailed { ref command, .. } if command == "second b"));
        assert_eq!(ex.host().log, ["first a", "second b"]);
        assert!(!ex.host().ran("third"));
    }

    #[test]
    fn non_fatal_failure_continues() {
        let mut list = stages();
        list[1] = list[1].clone().non_fatal();

        let mut ex = Executor::new(RecordingHost::failing("second"), 1);
        ex.run_stages(&list).unwrap();
        assert_eq!(ex.host().log, ["first a", "second b", "third c"]);
    }

    #[test]
    fn later_phases_never_start_after_a_failure() {
        let phases = vec![
            Phase { number: 1, title: "one", stages: stages() },
            Phase {
                number: 2,
                title: "two",
                stages: vec![Stage::exec(Invocation::new("fourth", ["d"]))],
            },
        ];

        let mut ex = Executor::new(RecordingHost::failing("third"), 2);
        assert!(ex.run_phases(&phases).is_err());
        assert!(!ex.host().ran("fourth"));
    }

    #[test]
    fn missing_file_removal_can_be_tolerated() {
        let stage = Stage::new(Action::RemoveFile(PathBuf::from("/nope"))).non_fatal();
        let mut ex = Executor::new(RecordingHost::default(), 1);
        ex.run_stage(&stage).unwrap();

        let fatal = Stage::new(Action::RemoveFile(PathBuf::from("/nope")));
        assert!(ex.run_stage(&fatal).is_err());
    }
}
