//! Structured observability hooks for check and repair activity.
//!
//! These events go to `tracing` regardless of the `silent` flag; `silent`
//! only governs the host's audit log.

use tracing::{info, warn};

use crate::session::RepairStatus;

/// RAII guard that enters a session-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = SessionSpan::enter(session.id(), host.hostname());
/// // every check/repair event now carries session_id and host
/// ```
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    pub fn enter(session_id: &uuid::Uuid, hostname: &str) -> Self {
        let span = tracing::info_span!("hostcheck.session", session_id = %session_id, host = %hostname);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_check_started(tag: &str, description: &str) {
    info!(event = "check.started", tag = %tag, description = %description, "Verifying this condition");
}

pub fn emit_check_passed(tag: &str) {
    info!(event = "check.passed", tag = %tag);
}

pub fn emit_check_failed(tag: &str, error: &dyn std::fmt::Display) {
    warn!(event = "check.failed", tag = %tag, error = %error);
}

/// Emit event: check not probed because prerequisites failed.
pub fn emit_check_blocked(tag: &str, failed_prerequisites: usize) {
    info!(event = "check.blocked", tag = %tag, failed_prerequisites = failed_prerequisites);
}

pub fn emit_not_applicable(tag: &str) {
    info!(event = "node.not_applicable", tag = %tag);
}

pub fn emit_repair_started(tag: &str, description: &str) {
    info!(event = "repair.started", tag = %tag, description = %description, "Attempting this repair action");
}

/// Emit event: repair action settled with its final status.
pub fn emit_repair_finished(tag: &str, status: RepairStatus) {
    match status {
        RepairStatus::Untriggered | RepairStatus::Repaired => {
            info!(event = "repair.finished", tag = %tag, status = %status);
        }
        _ => {
            warn!(event = "repair.finished", tag = %tag, status = %status);
        }
    }
}

/// Emit event: fix returned an error (warning level).
pub fn emit_fix_error(tag: &str, error: &dyn std::fmt::Display) {
    warn!(event = "repair.fix_error", tag = %tag, error = %error);
}

pub fn emit_verify_finished(hostname: &str, passed: bool) {
    info!(event = "strategy.verified", host = %hostname, passed = passed);
}

pub fn emit_repair_pass_finished(hostname: &str, actions: usize, failed: usize) {
    info!(
        event = "strategy.repaired",
        host = %hostname,
        actions = actions,
        failed = failed,
    );
}
