//! Repair actions: the attempt-fix-then-re-verify protocol.

use std::collections::BTreeSet;

use crate::error::{
    ActionError, ActionFailure, DependencyFailure, RepairError, RepairFailures,
    VerifyDependencyError,
};
use crate::host::{Host, RecordStatus};
use crate::metrics::METRICS;
use crate::node::{ActionId, VerifierId};
use crate::obs;
use crate::session::{record, CheckSession, RepairStatus};

impl<'g> CheckSession<'g> {
    /// Run one repair action.
    ///
    /// 1. Pure dependencies are checked (cached results allowed). Any
    ///    failure blocks the action: triggers are not examined and the fix
    ///    is not run.
    /// 2. Triggers are invalidated and re-checked. If all pass there is
    ///    nothing to repair.
    /// 3. Otherwise the fix runs between `START` and `END` records, and the
    ///    triggers are re-checked from scratch to decide the outcome.
    ///
    /// The action's [`RepairStatus`] is recomputed on every call.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to another graph.
    pub fn repair_action(
        &mut self,
        id: ActionId,
        host: &dyn Host,
        silent: bool,
    ) -> Result<(), ActionError> {
        let graph = self.graph;
        let action = graph.action_node(id);
        let tag = action.node.tag();

        if !action.fixer.is_applicable(host) {
            obs::emit_not_applicable(tag);
            return self.settle(id, RepairStatus::Untriggered, Ok(()));
        }

        let blockers = self.check_list(action.node.dependencies(), host, silent);
        if !blockers.is_empty() {
            let err = ActionError::Blocked(VerifyDependencyError::new(blockers));
            return self.settle(id, RepairStatus::Blocked, Err(err));
        }

        if self.recheck(&action.triggers, host, silent).is_empty() {
            return self.settle(id, RepairStatus::Untriggered, Ok(()));
        }

        let operation = action.record_tag();
        obs::emit_repair_started(tag, &action.fixer.description());
        record(host, silent, RecordStatus::Start, &operation, "");
        METRICS.inc_repairs_attempted();

        if let Err(err) = action.fixer.repair(host) {
            obs::emit_fix_error(tag, &err);
            record(host, silent, RecordStatus::Fail, &operation, &err.to_string());
            record(host, silent, RecordStatus::EndFail, &operation, "");
            return self.settle(id, RepairStatus::FailedAction, Err(ActionError::Fix(err)));
        }

        let remaining = self.recheck(&action.triggers, host, silent);
        if remaining.is_empty() {
            METRICS.inc_repairs_succeeded();
            record(host, silent, RecordStatus::EndGood, &operation, "");
            self.settle(id, RepairStatus::Repaired, Ok(()))
        } else {
            record(host, silent, RecordStatus::EndFail, &operation, "");
            let err = RepairError::new(tag, remaining);
            self.settle(id, RepairStatus::FailedTrigger, Err(err.into()))
        }
    }

    /// Run every action in declaration order, regardless of earlier
    /// failures, and report all failures together.
    pub fn repair_all(&mut self, host: &dyn Host, silent: bool) -> Result<(), RepairFailures> {
        let graph = self.graph;
        let mut failures = Vec::new();
        for id in graph.action_ids() {
            if let Err(error) = self.repair_action(id, host, silent) {
                failures.push(ActionFailure {
                    tag: graph.action(id).tag().to_string(),
                    error,
                });
            }
        }

        obs::emit_repair_pass_finished(host.hostname(), graph.action_count(), failures.len());
        METRICS.flush();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RepairFailures::new(failures))
        }
    }

    /// Invalidate all of `triggers` first, then check them in order.
    fn recheck(
        &mut self,
        triggers: &[VerifierId],
        host: &dyn Host,
        silent: bool,
    ) -> BTreeSet<DependencyFailure> {
        for &trigger in triggers {
            self.invalidate(trigger);
        }
        self.check_list(triggers, host, silent)
    }

    fn settle(
        &mut self,
        id: ActionId,
        status: RepairStatus,
        result: Result<(), ActionError>,
    ) -> Result<(), ActionError> {
        let slot = self.graph.action_slot(id);
        self.statuses[slot] = Some(status);
        obs::emit_repair_finished(self.graph.action(id).tag(), status);
        result
    }
}
