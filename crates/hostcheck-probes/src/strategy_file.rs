//! Declarative strategy files.
//!
//! A strategy file is JSON describing verifiers (dependency-first) and
//! repair actions. It compiles into a [`RepairStrategy`] whose checks and
//! repairs are the probes of this crate.
//!
//! ```json
//! {
//!   "verifiers": [
//!     { "tag": "net", "probe": { "kind": "command", "command": ["ping", "-c1", "gw"] } },
//!     { "tag": "sshd", "depends_on": ["net"],
//!       "probe": { "kind": "command", "command": ["systemctl", "is-active", "sshd"] } }
//!   ],
//!   "repairs": [
//!     { "tag": "restart_sshd", "depends_on": ["net"], "triggers": ["sshd"],
//!       "fix": { "kind": "command", "command": ["systemctl", "restart", "sshd"] } }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use hostcheck_core::{RepairSpec, RepairStrategy, VerifierSpec};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ProbeError, Result};
use crate::probe::{CommandFix, CommandProbe, PathProbe, Probe, DEFAULT_TIMEOUT_SECS};

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Probe configuration, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    Command {
        command: Vec<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
    Path {
        path: PathBuf,
    },
}

/// Fix configuration, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixConfig {
    Command {
        command: Vec<String>,
        #[serde(default = "default_timeout")]
        timeout_secs: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifierDecl {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairDecl {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    pub fix: FixConfig,
}

/// Parsed strategy file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrategyFile {
    #[serde(default)]
    pub verifiers: Vec<VerifierDecl>,
    #[serde(default)]
    pub repairs: Vec<RepairDecl>,
}

impl StrategyFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ProbeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            verifiers = file.verifiers.len(),
            repairs = file.repairs.len(),
            "loaded strategy file"
        );
        Ok(file)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the verify/repair graph.
    ///
    /// Tag references are resolved in declaration order, so every
    /// dependency must be declared before the verifier that uses it.
    pub fn compile(&self) -> Result<RepairStrategy> {
        let verifiers = self
            .verifiers
            .iter()
            .map(|decl| {
                let probe = build_probe(decl)?;
                Ok(VerifierSpec::new(decl.tag.as_str(), probe)
                    .depends_on(decl.depends_on.iter().cloned()))
            })
            .collect::<Result<Vec<_>>>()?;

        let repairs = self
            .repairs
            .iter()
            .map(|decl| {
                let fix = build_fix(decl)?;
                Ok(RepairSpec::new(decl.tag.as_str(), fix)
                    .depends_on(decl.depends_on.iter().cloned())
                    .triggered_by(decl.triggers.iter().cloned()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RepairStrategy::new(verifiers, repairs)?)
    }

    /// SHA-256 over the declared tags and their edges, in order.
    ///
    /// Two files with the same graph shape share a digest regardless of
    /// probe details or formatting.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for decl in &self.verifiers {
            hasher.update(b"verifier\0");
            hasher.update(decl.tag.as_bytes());
            hasher.update(b"\0");
            update_tags(&mut hasher, b"depends_on\0", &decl.depends_on);
        }
        for decl in &self.repairs {
            hasher.update(b"repair\0");
            hasher.update(decl.tag.as_bytes());
            hasher.update(b"\0");
            update_tags(&mut hasher, b"depends_on\0", &decl.depends_on);
            update_tags(&mut hasher, b"triggers\0", &decl.triggers);
        }
        hex::encode(hasher.finalize())
    }
}

fn update_tags(hasher: &mut Sha256, label: &[u8], tags: &[String]) {
    hasher.update(label);
    for tag in tags {
        hasher.update(tag.as_bytes());
        hasher.update(b"\0");
    }
}

fn build_probe(decl: &VerifierDecl) -> Result<Probe> {
    let probe = match &decl.probe {
        ProbeConfig::Command {
            command,
            timeout_secs,
        } => {
            ensure_command(&decl.tag, command)?;
            let mut probe = CommandProbe::new(decl.tag.as_str(), command.clone(), *timeout_secs);
            probe.description = decl.description.clone();
            Probe::Command(probe)
        }
        ProbeConfig::Path { path } => {
            let mut probe = PathProbe::new(path.clone());
            probe.description = decl.description.clone();
            Probe::Path(probe)
        }
    };
    Ok(probe)
}

fn build_fix(decl: &RepairDecl) -> Result<CommandFix> {
    match &decl.fix {
        FixConfig::Command {
            command,
            timeout_secs,
        } => {
            ensure_command(&decl.tag, command)?;
            let mut fix = CommandFix::new(decl.tag.as_str(), command.clone(), *timeout_secs);
            fix.description = decl.description.clone();
            Ok(fix)
        }
    }
}

fn ensure_command(tag: &str, command: &[String]) -> Result<()> {
    if command.is_empty() {
        return Err(ProbeError::EmptyCommand {
            name: tag.to_string(),
        });
    }
    Ok(())
}
