//! Check sessions: the mutable side of a [`DependencyGraph`].
//!
//! A session caches one outcome per verifier and one status per repair
//! action. Results are reused until explicitly invalidated, so within a
//! session a verifier is probed at most once per invalidation. Separate
//! sessions never share state, which is what lets one graph serve several
//! hosts at once.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CheckError, DependencyFailure, VerifyDependencyError};
use crate::graph::DependencyGraph;
use crate::host::{Host, RecordStatus};
use crate::metrics::METRICS;
use crate::node::{ActionId, VerifierId};
use crate::obs;

/// Cached result of one verifier.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Unchecked,
    Passed,
    Failed(CheckError),
}

/// Status of a repair action after its most recent attempt in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    /// Every trigger passed; the fix was not needed.
    Untriggered,
    /// The fix ran and the triggers now pass.
    Repaired,
    /// The fix returned an error.
    FailedAction,
    /// The fix ran cleanly but the triggers still fail.
    FailedTrigger,
    /// A pure dependency failed.
    Blocked,
}

impl RepairStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairStatus::Untriggered => "untriggered",
            RepairStatus::Repaired => "repaired",
            RepairStatus::FailedAction => "failed_action",
            RepairStatus::FailedTrigger => "failed_trigger",
            RepairStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluation context over a graph.
pub struct CheckSession<'g> {
    pub(crate) graph: &'g DependencyGraph,
    id: Uuid,
    outcomes: Vec<Outcome>,
    check_counts: Vec<u64>,
    pub(crate) statuses: Vec<Option<RepairStatus>>,
}

impl<'g> CheckSession<'g> {
    pub(crate) fn new(graph: &'g DependencyGraph) -> Self {
        Self {
            graph,
            id: Uuid::new_v4(),
            outcomes: vec![Outcome::Unchecked; graph.verifier_count()],
            check_counts: vec![0; graph.verifier_count()],
            statuses: vec![None; graph.action_count()],
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn graph(&self) -> &'g DependencyGraph {
        self.graph
    }

    /// Cached outcome of a verifier.
    ///
    /// # Panics
    ///
    /// Like every session method taking an id, panics if `id` was issued by
    /// a graph other than [`graph`](Self::graph).
    pub fn outcome(&self, id: VerifierId) -> &Outcome {
        &self.outcomes[self.graph.verifier_slot(id)]
    }

    /// How many times the verifier's checker has been probed in this session.
    pub fn check_count(&self, id: VerifierId) -> u64 {
        self.check_counts[self.graph.verifier_slot(id)]
    }

    /// Status from the action's latest attempt, if it has run.
    pub fn status(&self, id: ActionId) -> Option<RepairStatus> {
        self.statuses[self.graph.action_slot(id)]
    }

    /// Check a verifier after its dependencies.
    ///
    /// A cached outcome is replayed with no side effects. Otherwise every
    /// dependency is checked in order, without short-circuiting. If any
    /// failed, the verifier fails with the union of their leaf failures and
    /// is never probed. If all passed, the checker is probed exactly once
    /// and the result recorded on the host unless `silent`.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to another graph.
    pub fn check(
        &mut self,
        id: VerifierId,
        host: &dyn Host,
        silent: bool,
    ) -> Result<(), CheckError> {
        let slot = self.graph.verifier_slot(id);
        match &self.outcomes[slot] {
            Outcome::Passed => return Ok(()),
            Outcome::Failed(err) => return Err(err.clone()),
            Outcome::Unchecked => {}
        }

        let graph = self.graph;
        let node = graph.verifier_node(id);
        if !node.checker.is_applicable(host) {
            obs::emit_not_applicable(node.node.tag());
            self.outcomes[slot] = Outcome::Passed;
            return Ok(());
        }

        let failures = self.check_list(node.node.dependencies(), host, silent);
        if !failures.is_empty() {
            obs::emit_check_blocked(node.node.tag(), failures.len());
            let err = CheckError::Dependency(VerifyDependencyError::new(failures));
            self.outcomes[slot] = Outcome::Failed(err.clone());
            return Err(err);
        }

        self.probe(id, host, silent)
    }

    fn probe(&mut self, id: VerifierId, host: &dyn Host, silent: bool) -> Result<(), CheckError> {
        let graph = self.graph;
        let slot = graph.verifier_slot(id);
        let node = graph.verifier_node(id);
        let tag = node.node.tag();
        obs::emit_check_started(tag, &node.checker.description());

        self.check_counts[slot] += 1;
        METRICS.inc_checks_run();

        match node.checker.verify(host) {
            Ok(()) => {
                obs::emit_check_passed(tag);
                record(host, silent, RecordStatus::Good, &node.record_tag(), "");
                self.outcomes[slot] = Outcome::Passed;
                Ok(())
            }
            Err(err) => {
                obs::emit_check_failed(tag, &err);
                METRICS.inc_checks_failed();
                record(host, silent, RecordStatus::Fail, &node.record_tag(), err.message());
                let err = CheckError::Failed(err);
                self.outcomes[slot] = Outcome::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Check every verifier in `ids` and collect the leaf failures.
    ///
    /// A direct failure contributes `(description, message)` for that
    /// verifier; a dependency failure contributes its whole failure set.
    pub(crate) fn check_list(
        &mut self,
        ids: &[VerifierId],
        host: &dyn Host,
        silent: bool,
    ) -> BTreeSet<DependencyFailure> {
        let mut failures = BTreeSet::new();
        for &dep in ids {
            match self.check(dep, host, silent) {
                Ok(()) => {}
                Err(CheckError::Failed(err)) => {
                    failures.insert(DependencyFailure::new(
                        self.graph.verifier_description(dep),
                        err.message(),
                    ));
                }
                Err(CheckError::Dependency(err)) => {
                    failures.extend(err.failures().iter().cloned());
                }
            }
        }
        failures
    }

    /// Clear the cached outcome of a verifier and, recursively, of
    /// everything it depends on.
    pub fn invalidate(&mut self, id: VerifierId) {
        let slot = self.graph.verifier_slot(id);
        self.outcomes[slot] = Outcome::Unchecked;
        let graph = self.graph;
        for &dep in graph.verifier(id).dependencies() {
            self.invalidate(dep);
        }
    }

    /// Invalidate then check: always a fresh evaluation of `id`.
    pub fn reverify(
        &mut self,
        id: VerifierId,
        host: &dyn Host,
        silent: bool,
    ) -> Result<(), CheckError> {
        self.invalidate(id);
        self.check(id, host, silent)
    }
}

/// Write an audit record unless silenced.
pub(crate) fn record(
    host: &dyn Host,
    silent: bool,
    status: RecordStatus,
    operation: &str,
    message: &str,
) {
    if !silent {
        host.record(status, operation, message);
    }
}
