//! hostcheck - host verify/repair CLI
//!
//! Runs a JSON strategy file against the local machine.
//!
//! ## Commands
//!
//! - `verify`: Evaluate every check and report failures
//! - `repair`: Run every repair action, then re-verify
//! - `graph`: Print the check DAG and repair wiring
//! - `digest`: Print the strategy digest

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use hostcheck_core::{
    CheckError, Host, RecordStatus, RepairStatus, RepairStrategy, SessionSpan, VerifierId, ROOT_TAG,
};
use hostcheck_probes::StrategyFile;
use serde::Serialize;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "hostcheck")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify and repair host preconditions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and reports
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every check from scratch
    Verify {
        /// Path to strategy file (JSON)
        #[arg(short, long, env = "HOSTCHECK_STRATEGY")]
        strategy: PathBuf,

        /// Do not write audit records
        #[arg(long)]
        silent: bool,
    },

    /// Run every repair action in order, then re-verify
    Repair {
        /// Path to strategy file (JSON)
        #[arg(short, long, env = "HOSTCHECK_STRATEGY")]
        strategy: PathBuf,

        /// Do not write audit records
        #[arg(long)]
        silent: bool,
    },

    /// Print the check DAG and repair wiring
    Graph {
        /// Path to strategy file (JSON)
        #[arg(short, long, env = "HOSTCHECK_STRATEGY")]
        strategy: PathBuf,
    },

    /// Print the strategy digest
    Digest {
        /// Path to strategy file (JSON)
        #[arg(short, long, env = "HOSTCHECK_STRATEGY")]
        strategy: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    hostcheck_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Verify { strategy, silent } => cmd_verify(&strategy, silent),
        Commands::Repair { strategy, silent } => cmd_repair(&strategy, silent, cli.json),
        Commands::Graph { strategy } => cmd_graph(&strategy),
        Commands::Digest { strategy } => cmd_digest(&strategy),
    }
}

// ---------------------------------------------------------------------------
// LocalHost
// ---------------------------------------------------------------------------

/// One timestamped audit line.
#[derive(Debug, Clone, Serialize)]
struct AuditLine {
    at: DateTime<Utc>,
    status: RecordStatus,
    operation: String,
    message: String,
}

/// The machine this process runs on.
struct LocalHost {
    hostname: String,
    audit: Mutex<Vec<AuditLine>>,
}

impl LocalHost {
    fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            audit: Mutex::new(Vec::new()),
        }
    }

    fn detect() -> Self {
        let hostname = std::env::var("HOSTNAME")
            .ok()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                std::fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| "localhost".to_string());
        Self::new(hostname)
    }

    fn audit(&self) -> Vec<AuditLine> {
        self.audit
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl Host for LocalHost {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn record(&self, status: RecordStatus, operation: &str, message: &str) {
        let line = AuditLine {
            at: Utc::now(),
            status,
            operation: operation.to_string(),
            message: message.to_string(),
        };
        info!(
            target: "hostcheck::audit",
            status = %line.status,
            operation = %line.operation,
            message = %line.message,
            "audit"
        );
        if let Ok(mut lines) = self.audit.lock() {
            lines.push(line);
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn load(path: &Path) -> Result<(StrategyFile, RepairStrategy)> {
    let file = StrategyFile::load(path)
        .with_context(|| format!("Failed to load strategy {}", path.display()))?;
    let strategy = file.compile().context("Failed to build strategy")?;
    Ok((file, strategy))
}

fn cmd_verify(path: &Path, silent: bool) -> Result<()> {
    let (_, strategy) = load(path)?;
    let host = LocalHost::detect();

    match strategy.verify(&host, silent) {
        Ok(()) => {
            println!("✓ {}: all checks passed", host.hostname());
            Ok(())
        }
        Err(err) => {
            println!("✗ {}: verification failed", host.hostname());
            for failure in failures_of(&err) {
                println!("  - {}", failure);
            }
            anyhow::bail!("Host verification failed")
        }
    }
}

/// Leaf failures of a verify error, one line each.
fn failures_of(err: &CheckError) -> Vec<String> {
    match err {
        CheckError::Failed(e) => vec![e.to_string()],
        CheckError::Dependency(e) => {
            e.failures().iter().map(ToString::to_string).collect()
        }
    }
}

#[derive(Debug, Serialize)]
struct ActionReport {
    tag: String,
    status: Option<RepairStatus>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RepairReport {
    host: String,
    digest: String,
    actions: Vec<ActionReport>,
    verified: bool,
    failures: Vec<String>,
    audit: Vec<AuditLine>,
}

fn run_repair(
    file: &StrategyFile,
    strategy: &RepairStrategy,
    host: &LocalHost,
    silent: bool,
) -> RepairReport {
    let mut session = strategy.session();
    let _span = SessionSpan::enter(session.id(), host.hostname());
    let errors = match session.repair_all(host, silent) {
        Ok(()) => Vec::new(),
        Err(failures) => failures.into_failures(),
    };

    let actions = strategy
        .actions()
        .into_iter()
        .map(|id| {
            let tag = strategy.action(id).tag().to_string();
            let error = errors
                .iter()
                .find(|failure| failure.tag == tag)
                .map(|failure| failure.error.to_string());
            ActionReport {
                status: session.status(id),
                tag,
                error,
            }
        })
        .collect();

    let verified = strategy.verify(host, silent);
    RepairReport {
        host: host.hostname().to_string(),
        digest: file.digest(),
        actions,
        verified: verified.is_ok(),
        failures: verified.as_ref().err().map(failures_of).unwrap_or_default(),
        audit: host.audit(),
    }
}

fn cmd_repair(path: &Path, silent: bool, json: bool) -> Result<()> {
    let (file, strategy) = load(path)?;
    let host = LocalHost::detect();
    let report = run_repair(&file, &strategy, &host, silent);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Repair pass on {} ({})", report.host, &report.digest[..12]);
        for action in &report.actions {
            let status = action
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "not run".to_string());
            match &action.error {
                Some(error) => println!("  {:<24} {:<16} {}", action.tag, status, error),
                None => println!("  {:<24} {}", action.tag, status),
            }
        }
        println!();
        if report.verified {
            println!("✓ All checks pass after repair");
        } else {
            println!("✗ Checks still failing:");
            for failure in &report.failures {
                println!("  - {}", failure);
            }
        }
    }

    if report.verified {
        Ok(())
    } else {
        anyhow::bail!("Host still fails verification after repair")
    }
}

/// Text rendering of the verifier DAG and repair wiring.
fn render_graph(strategy: &RepairStrategy) -> String {
    let graph = strategy.graph();
    let tags = |ids: &[VerifierId]| -> String {
        ids.iter()
            .map(|id| strategy.verifier(*id).tag())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = String::from("Verifiers:\n");
    for id in graph.verifier_ids() {
        let node = strategy.verifier(id);
        let marker = if node.tag() == ROOT_TAG { "*" } else { "-" };
        out.push_str(&format!(
            "  {} {}: {}\n",
            marker,
            node.tag(),
            graph.verifier_description(id)
        ));
        if !node.dependencies().is_empty() {
            out.push_str(&format!("      depends on: {}\n", tags(node.dependencies())));
        }
    }

    out.push_str("Repairs:\n");
    for id in strategy.actions() {
        out.push_str(&format!(
            "  - {}: {}\n",
            strategy.action(id).tag(),
            graph.action_description(id)
        ));
        let deps = strategy.action_dependencies(id);
        if !deps.is_empty() {
            out.push_str(&format!("      depends on: {}\n", tags(deps)));
        }
        out.push_str(&format!(
            "      triggered by: {}\n",
            tags(strategy.action_triggers(id))
        ));
    }
    out
}

fn cmd_graph(path: &Path) -> Result<()> {
    let (_, strategy) = load(path)?;
    print!("{}", render_graph(&strategy));
    Ok(())
}

fn cmd_digest(path: &Path) -> Result<()> {
    let file = StrategyFile::load(path)
        .with_context(|| format!("Failed to load strategy {}", path.display()))?;
    println!("{}", file.digest());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_strategy(dir: &tempfile::TempDir) -> PathBuf {
        let workdir = dir.path().join("work");
        let text = serde_json::json!({
            "verifiers": [
                { "tag": "tmp", "description": "scratch space", "probe": { "kind": "path", "path": "/" } },
                { "tag": "workdir", "depends_on": ["tmp"], "probe": { "kind": "path", "path": workdir } }
            ],
            "repairs": [
                { "tag": "mkdir", "depends_on": ["tmp"], "triggers": ["workdir"],
                  "fix": { "kind": "command", "command": ["mkdir", "-p", workdir] } }
            ]
        })
        .to_string();
        let path = dir.path().join("strategy.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_local_host_keeps_audit_lines() {
        let host = LocalHost::new("dut");
        host.record(RecordStatus::Start, "repair.mkdir", "");
        host.record(RecordStatus::EndGood, "repair.mkdir", "");
        let audit = host.audit();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[1].status, RecordStatus::EndGood);
        assert!(audit[0].at <= audit[1].at);
    }

    #[test]
    fn test_render_graph() {
        let dir = tempfile::tempdir().unwrap();
        let (_, strategy) = load(&write_strategy(&dir)).unwrap();
        let text = render_graph(&strategy);
        assert!(text.contains("- tmp: scratch space"));
        assert!(text.contains("* PASS: All host verification checks pass"));
        assert!(text.contains("      depends on: workdir"));
        assert!(text.contains("      triggered by: workdir"));
    }

    #[test]
    fn test_repair_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_strategy(&dir);
        let (file, strategy) = load(&path).unwrap();
        let host = LocalHost::new("dut");

        let report = run_repair(&file, &strategy, &host, false);
        assert!(report.verified);
        assert_eq!(report.actions.len(), 1);
        assert_eq!(report.actions[0].status, Some(RepairStatus::Repaired));
        assert!(report.actions[0].error.is_none());
        assert!(dir.path().join("work").exists());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["actions"][0]["status"], "repaired");
        let audit = json["audit"].as_array().unwrap();
        assert!(audit.iter().any(|line| line["status"] == "START"));
        assert!(audit.iter().any(|line| line["status"] == "END GOOD"));
    }

    #[test]
    fn test_verify_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_strategy(&dir);
        assert!(cmd_verify(&path, true).is_err());
        assert!(cmd_digest(&path).is_ok());
    }
}
