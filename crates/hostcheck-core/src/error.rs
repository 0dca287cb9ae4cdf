//! Error taxonomy for the verify/repair engine.
//!
//! Three kinds of failure are distinguished:
//! - [`VerifyError`]: a check's own probe failed.
//! - [`VerifyDependencyError`]: one or more prerequisite checks failed, so the
//!   check itself was never probed.
//! - [`RepairError`]: a repair action ran cleanly but its triggers still fail.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::node::VerifierId;

/// A check's own probe failed. Display is the probe message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct VerifyError {
    message: String,
}

impl VerifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for VerifyError {
    fn from(err: std::io::Error) -> Self {
        VerifyError::new(err.to_string())
    }
}

/// One leaf-level failed check: the check's description and its failure message.
///
/// Compared by value, so the same leaf reached through several paths of a
/// DAG collapses into a single entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DependencyFailure {
    pub description: String,
    pub message: String,
}

impl DependencyFailure {
    pub fn new(description: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DependencyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description, self.message)
    }
}

/// Render a failure set as `desc; desc; ...` in set order.
fn summarize(failures: &BTreeSet<DependencyFailure>) -> String {
    failures
        .iter()
        .map(|f| f.description.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// One or more prerequisite checks failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} prerequisite check(s) failed: {}", .failures.len(), summarize(.failures))]
pub struct VerifyDependencyError {
    failures: BTreeSet<DependencyFailure>,
}

impl VerifyDependencyError {
    pub fn new(failures: BTreeSet<DependencyFailure>) -> Self {
        Self { failures }
    }

    /// The distinct leaf failures responsible for this error.
    pub fn failures(&self) -> &BTreeSet<DependencyFailure> {
        &self.failures
    }

    /// Descriptions of the failing checks, joined with `"; "`.
    pub fn summary(&self) -> String {
        summarize(&self.failures)
    }
}

/// Result of checking one verifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// The verifier's own probe failed.
    #[error(transparent)]
    Failed(#[from] VerifyError),

    /// A prerequisite failed; the verifier was not probed.
    #[error(transparent)]
    Dependency(#[from] VerifyDependencyError),
}

impl CheckError {
    /// Whether the failure came from a prerequisite rather than the check itself.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, CheckError::Dependency(_))
    }
}

/// A repair action's fix completed, but its triggering checks still fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("repair action '{tag}' completed but its triggers still fail: {}", summarize(.failures))]
pub struct RepairError {
    tag: String,
    failures: BTreeSet<DependencyFailure>,
}

impl RepairError {
    pub fn new(tag: impl Into<String>, failures: BTreeSet<DependencyFailure>) -> Self {
        Self {
            tag: tag.into(),
            failures,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Trigger failures observed on the post-fix re-check.
    pub fn failures(&self) -> &BTreeSet<DependencyFailure> {
        &self.failures
    }
}

/// Failure of a single repair action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A pure dependency failed; neither triggers nor fix were run.
    #[error(transparent)]
    Blocked(VerifyDependencyError),

    /// The fix itself returned an error. Carried unchanged.
    #[error(transparent)]
    Fix(anyhow::Error),

    /// The fix ran but did not clear the triggers.
    #[error(transparent)]
    Unrepaired(#[from] RepairError),
}

/// One failing action inside [`RepairFailures`].
#[derive(Debug)]
pub struct ActionFailure {
    pub tag: String,
    pub error: ActionError,
}

fn tag_list(failures: &[ActionFailure]) -> String {
    failures
        .iter()
        .map(|f| f.tag.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Aggregated failure of a strategy-wide repair pass.
///
/// Lists every failing action, in declaration order.
#[derive(Debug, Error)]
#[error("{} repair action(s) failed: {}", .failures.len(), tag_list(.failures))]
pub struct RepairFailures {
    failures: Vec<ActionFailure>,
}

impl RepairFailures {
    pub fn new(failures: Vec<ActionFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[ActionFailure] {
        &self.failures
    }

    pub fn tags(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.tag.as_str()).collect()
    }

    pub fn into_failures(self) -> Vec<ActionFailure> {
        self.failures
    }
}

/// Errors raised while building a dependency graph or repair strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("duplicate tag: {tag}")]
    DuplicateTag { tag: String },

    #[error("tag {tag} is reserved for the root verifier")]
    ReservedTag { tag: String },

    #[error("{referenced_by} references unknown tag {tag}")]
    UnknownTag { tag: String, referenced_by: String },

    #[error("{referenced_by} references {tag}, which is not a verifier")]
    NotAVerifier { tag: String, referenced_by: String },

    #[error("verifier id {0:?} does not belong to this graph")]
    ForeignVerifier(VerifierId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure_set(items: &[(&str, &str)]) -> BTreeSet<DependencyFailure> {
        items
            .iter()
            .map(|(d, m)| DependencyFailure::new(*d, *m))
            .collect()
    }

    #[test]
    fn test_verify_error_display_is_verbatim() {
        let err = VerifyError::new("Failing \"fail\" by request");
        assert_eq!(err.to_string(), "Failing \"fail\" by request");
    }

    #[test]
    fn test_dependency_failures_dedupe_by_value() {
        let set = failure_set(&[("bottom", "boom"), ("bottom", "boom"), ("left", "x")]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_dependency_error_summary() {
        let err = VerifyDependencyError::new(failure_set(&[("ssh up", "refused"), ("disk ok", "full")]));
        assert_eq!(err.summary(), "disk ok; ssh up");
        let msg = err.to_string();
        assert!(msg.contains("2 prerequisite check(s) failed"));
        assert!(msg.contains("ssh up"));
    }

    #[test]
    fn test_check_error_kind() {
        let direct: CheckError = VerifyError::new("nope").into();
        assert!(!direct.is_dependency_failure());
        assert_eq!(direct.to_string(), "nope");

        let dep: CheckError = VerifyDependencyError::new(failure_set(&[("a", "b")])).into();
        assert!(dep.is_dependency_failure());
    }

    #[test]
    fn test_fix_error_is_not_rewrapped() {
        let err = ActionError::Fix(anyhow::anyhow!("Failed repair for \"nofix\""));
        assert_eq!(err.to_string(), "Failed repair for \"nofix\"");
    }

    #[test]
    fn test_repair_failures_lists_every_tag() {
        let failures = RepairFailures::new(vec![
            ActionFailure {
                tag: "afix".to_string(),
                error: RepairError::new("afix", failure_set(&[("a", "still bad")])).into(),
            },
            ActionFailure {
                tag: "bfix".to_string(),
                error: ActionError::Fix(anyhow::anyhow!("boom")),
            },
        ]);
        assert_eq!(failures.tags(), vec!["afix", "bfix"]);
        let msg = failures.to_string();
        assert!(msg.contains("2 repair action(s) failed"));
        assert!(msg.contains("afix, bfix"));
    }

    #[test]
    fn test_build_error_display() {
        let err = BuildError::UnknownTag {
            tag: "child".to_string(),
            referenced_by: "parent".to_string(),
        };
        assert_eq!(err.to_string(), "parent references unknown tag child");
    }
}
