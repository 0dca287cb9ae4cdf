//! Graph nodes and the capabilities they wrap.
//!
//! A node is a tag plus an ordered dependency list. What a node actually
//! does is supplied by the caller through [`Checker`] (verifiers) or
//! [`Fixer`] (repair actions); the engine never sees concrete types.

use serde::{Deserialize, Serialize};

use crate::error::VerifyError;
use crate::host::Host;

/// Handle to a verifier inside a [`DependencyGraph`](crate::graph::DependencyGraph).
///
/// Carries the identity of the graph that issued it, so a handle from one
/// graph is never mistaken for a node of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerifierId {
    pub(crate) graph: u64,
    pub(crate) index: usize,
}

/// Handle to a repair action inside a [`DependencyGraph`](crate::graph::DependencyGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId {
    pub(crate) graph: u64,
    pub(crate) index: usize,
}

/// A health check.
pub trait Checker: Send + Sync {
    /// Human-readable statement of the condition being checked.
    fn description(&self) -> String;

    /// Probe the host. Called at most once per check session unless the
    /// verifier is invalidated.
    fn verify(&self, host: &dyn Host) -> Result<(), VerifyError>;

    /// Whether this check means anything for `host`. Inapplicable checks
    /// pass without being probed or recorded.
    fn is_applicable(&self, _host: &dyn Host) -> bool {
        true
    }
}

/// A recovery operation.
pub trait Fixer: Send + Sync {
    /// Human-readable statement of what the repair does.
    fn description(&self) -> String;

    /// Attempt the repair. May change arbitrary host state.
    fn repair(&self, host: &dyn Host) -> anyhow::Result<()>;

    /// Whether this repair can be attempted on `host` at all.
    fn is_applicable(&self, _host: &dyn Host) -> bool {
        true
    }
}

/// Identity shared by verifiers and repair actions: a tag and the
/// verifiers that must pass before the node may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    tag: String,
    dependencies: Vec<VerifierId>,
}

impl DependencyNode {
    pub(crate) fn new(tag: String, dependencies: Vec<VerifierId>) -> Self {
        Self { tag, dependencies }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Dependencies in declaration order.
    pub fn dependencies(&self) -> &[VerifierId] {
        &self.dependencies
    }

    /// Operation name used for audit records, e.g. `verify.ssh`.
    pub(crate) fn record_tag(&self, kind: &str) -> String {
        format!("{}.{}", kind, self.tag)
    }
}

pub(crate) struct VerifierNode {
    pub(crate) node: DependencyNode,
    pub(crate) checker: Box<dyn Checker>,
}

impl VerifierNode {
    pub(crate) fn record_tag(&self) -> String {
        self.node.record_tag("verify")
    }
}

pub(crate) struct ActionNode {
    pub(crate) node: DependencyNode,
    pub(crate) triggers: Vec<VerifierId>,
    pub(crate) fixer: Box<dyn Fixer>,
}

impl ActionNode {
    pub(crate) fn record_tag(&self) -> String {
        self.node.record_tag("repair")
    }
}
