//! hostcheck core library
//!
//! Models the preconditions for running work on a host as a DAG of cached
//! health checks (verifiers) and wires recovery actions to the checks whose
//! failure triggers them.
//!
//! - [`DependencyGraph`]: arena of verifier and repair-action nodes
//! - [`CheckSession`]: per-evaluation cache, counters and repair status
//! - [`RepairStrategy`]: declarative builder with a synthetic root and the
//!   `verify` / `repair` entry points

pub mod error;
pub mod fakes;
pub mod graph;
pub mod host;
pub mod metrics;
pub mod node;
pub mod obs;
pub mod repair;
pub mod session;
pub mod strategy;
pub mod telemetry;

pub use error::{
    ActionError, ActionFailure, BuildError, CheckError, DependencyFailure, RepairError,
    RepairFailures, VerifyDependencyError, VerifyError,
};
pub use graph::DependencyGraph;
pub use host::{Host, RecordStatus};
pub use metrics::METRICS;
pub use node::{ActionId, Checker, DependencyNode, Fixer, VerifierId};
pub use obs::SessionSpan;
pub use session::{CheckSession, Outcome, RepairStatus};
pub use strategy::{RepairSpec, RepairStrategy, VerifierSpec, ROOT_TAG};
pub use telemetry::init_tracing;

/// hostcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
