//! hostcheck probes
//!
//! Concrete checks and repairs for the local machine, and the JSON strategy
//! file format that wires them into a [`hostcheck_core::RepairStrategy`]:
//! - Command probes and fixes with timeouts
//! - Path existence probes
//! - Strategy file loading, compilation and digest

pub mod error;
pub mod probe;
pub mod runner;
pub mod strategy_file;

// Re-export key types
pub use error::{ProbeError, Result};
pub use probe::{CommandFix, CommandProbe, PathProbe, Probe, DEFAULT_TIMEOUT_SECS};
pub use runner::{CommandOutput, CommandRunner};
pub use strategy_file::{FixConfig, ProbeConfig, RepairDecl, StrategyFile, VerifierDecl};
