//! Concrete checks and repairs that run against the local machine.

use std::path::PathBuf;

use anyhow::Context;
use hostcheck_core::{Checker, Fixer, Host, VerifyError};
use serde::{Deserialize, Serialize};

use crate::runner::CommandRunner;

/// Default timeout for external commands.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Passes when an external command exits with status 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandProbe {
    /// Name used in logs and error messages.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Timeout in seconds; zero waits indefinitely.
    pub timeout_secs: u64,

    /// Overrides the generated description.
    pub description: Option<String>,
}

impl CommandProbe {
    pub fn new(name: impl Into<String>, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name: name.into(),
            command,
            timeout_secs,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or("")
    }
}

impl Checker for CommandProbe {
    fn description(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => format!("`{}` succeeds", self.command.join(" ")),
        }
    }

    fn verify(&self, _host: &dyn Host) -> Result<(), VerifyError> {
        let output = CommandRunner::run(&self.name, &self.command, self.timeout_secs)
            .map_err(|e| VerifyError::new(e.to_string()))?;
        if output.passed() {
            Ok(())
        } else {
            Err(VerifyError::new(output.failure_message(self.program())))
        }
    }
}

/// Passes when a filesystem path exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathProbe {
    pub path: PathBuf,
    pub description: Option<String>,
}

impl PathProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Checker for PathProbe {
    fn description(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => format!("{} exists", self.path.display()),
        }
    }

    fn verify(&self, _host: &dyn Host) -> Result<(), VerifyError> {
        match self.path.try_exists() {
            Ok(true) => Ok(()),
            Ok(false) => Err(VerifyError::new(format!(
                "{} does not exist",
                self.path.display()
            ))),
            Err(e) => Err(VerifyError::new(format!(
                "cannot stat {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// Any probe a strategy file can declare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Command(CommandProbe),
    Path(PathProbe),
}

impl Checker for Probe {
    fn description(&self) -> String {
        match self {
            Probe::Command(probe) => probe.description(),
            Probe::Path(probe) => probe.description(),
        }
    }

    fn verify(&self, host: &dyn Host) -> Result<(), VerifyError> {
        match self {
            Probe::Command(probe) => probe.verify(host),
            Probe::Path(probe) => probe.verify(host),
        }
    }
}

/// Repairs by running an external command; non-zero exit is a fix error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandFix {
    pub name: String,
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub description: Option<String>,
}

impl CommandFix {
    pub fn new(name: impl Into<String>, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name: name.into(),
            command,
            timeout_secs,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Fixer for CommandFix {
    fn description(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => format!("run `{}`", self.command.join(" ")),
        }
    }

    fn repair(&self, _host: &dyn Host) -> anyhow::Result<()> {
        let output = CommandRunner::run(&self.name, &self.command, self.timeout_secs)
            .with_context(|| format!("repair {} could not run", self.name))?;
        if !output.passed() {
            let program = self.command.first().map(String::as_str).unwrap_or("");
            anyhow::bail!(output.failure_message(program));
        }
        Ok(())
    }
}
