//! In-memory fakes for the engine's collaborators (testing only)
//!
//! Provides `RecordingHost`, `StubVerifier` and `StubRepairAction`, which
//! satisfy the `Host`, `Checker` and `Fixer` contracts and expose counters
//! for assertions.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::VerifyError;
use crate::host::{Host, RecordStatus};
use crate::node::{Checker, Fixer};

// ---------------------------------------------------------------------------
// RecordingHost
// ---------------------------------------------------------------------------

/// One captured audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub status: RecordStatus,
    pub operation: String,
    pub message: String,
}

impl Record {
    pub fn new(status: RecordStatus, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Host that remembers every record written to it, in order.
#[derive(Debug, Default)]
pub struct RecordingHost {
    hostname: String,
    records: Mutex<Vec<Record>>,
}

impl RecordingHost {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    /// Forget captured records so a test can start a fresh expectation.
    pub fn reset(&self) {
        self.records.lock().unwrap().clear();
    }
}

impl Host for RecordingHost {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn record(&self, status: RecordStatus, operation: &str, message: &str) {
        self.records
            .lock()
            .unwrap()
            .push(Record::new(status, operation, message));
    }
}

// ---------------------------------------------------------------------------
// StubVerifier
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StubVerifierState {
    tag: String,
    fail_count: AtomicU32,
    verify_count: AtomicUsize,
    applicable: bool,
}

/// Checker that fails while its fail count is non-zero.
///
/// Clones share state: keep one clone for assertions and hand another to
/// the graph. Each `try_repair` lowers the fail count by one.
#[derive(Debug, Clone)]
pub struct StubVerifier {
    state: Arc<StubVerifierState>,
}

impl StubVerifier {
    pub fn new(tag: impl Into<String>, fail_count: u32) -> Self {
        Self::build(tag.into(), fail_count, true)
    }

    /// A stub that reports itself as not applicable to any host.
    pub fn inapplicable(tag: impl Into<String>, fail_count: u32) -> Self {
        Self::build(tag.into(), fail_count, false)
    }

    fn build(tag: String, fail_count: u32, applicable: bool) -> Self {
        Self {
            state: Arc::new(StubVerifierState {
                tag,
                fail_count: AtomicU32::new(fail_count),
                verify_count: AtomicUsize::new(0),
                applicable,
            }),
        }
    }

    pub fn tag(&self) -> &str {
        &self.state.tag
    }

    /// Number of times `verify` has been called.
    pub fn verify_count(&self) -> usize {
        self.state.verify_count.load(Ordering::SeqCst)
    }

    /// Message carried by this stub's failures.
    pub fn message(&self) -> String {
        format!("Failing \"{}\" by request", self.state.tag)
    }

    /// Bring the stub one step closer to passing.
    pub fn try_repair(&self) {
        let _ = self
            .state
            .fail_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Make the stub one step more broken.
    pub fn unrepair(&self) {
        self.state.fail_count.fetch_add(1, Ordering::SeqCst);
    }

    /// The audit record this stub produces for `status`.
    pub fn record(&self, status: RecordStatus) -> Record {
        let message = match status {
            RecordStatus::Fail => self.message(),
            _ => String::new(),
        };
        Record::new(status, format!("verify.{}", self.state.tag), message)
    }
}

impl Checker for StubVerifier {
    fn description(&self) -> String {
        format!("Testing verify() for \"{}\"", self.state.tag)
    }

    fn verify(&self, _host: &dyn Host) -> Result<(), VerifyError> {
        self.state.verify_count.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_count.load(Ordering::SeqCst) > 0 {
            return Err(VerifyError::new(self.message()));
        }
        Ok(())
    }

    fn is_applicable(&self, _host: &dyn Host) -> bool {
        self.state.applicable
    }
}

// ---------------------------------------------------------------------------
// StubRepairAction
// ---------------------------------------------------------------------------

/// Error returned by a failing `StubRepairAction`.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StubRepairFailure(pub String);

#[derive(Debug)]
struct StubRepairState {
    tag: String,
    success: bool,
    repair_count: AtomicUsize,
    targets: Vec<StubVerifier>,
    applicable: bool,
}

/// Fixer that either fails outright or calls `try_repair` on its targets.
#[derive(Debug, Clone)]
pub struct StubRepairAction {
    state: Arc<StubRepairState>,
}

impl StubRepairAction {
    /// `targets` are the stubs a successful repair nudges toward passing,
    /// normally the same stubs wired in as triggers.
    pub fn new(tag: impl Into<String>, success: bool, targets: Vec<StubVerifier>) -> Self {
        Self::build(tag.into(), success, targets, true)
    }

    /// A successful stub that reports itself as not applicable to any host.
    pub fn inapplicable(tag: impl Into<String>, targets: Vec<StubVerifier>) -> Self {
        Self::build(tag.into(), true, targets, false)
    }

    fn build(tag: String, success: bool, targets: Vec<StubVerifier>, applicable: bool) -> Self {
        Self {
            state: Arc::new(StubRepairState {
                tag,
                success,
                repair_count: AtomicUsize::new(0),
                targets,
                applicable,
            }),
        }
    }

    pub fn tag(&self) -> &str {
        &self.state.tag
    }

    /// Number of times `repair` has been called.
    pub fn repair_count(&self) -> usize {
        self.state.repair_count.load(Ordering::SeqCst)
    }

    pub fn message(&self) -> String {
        format!("Failed repair for \"{}\"", self.state.tag)
    }

    /// The audit record this stub produces for `status`.
    pub fn record(&self, status: RecordStatus) -> Record {
        let message = match status {
            RecordStatus::Fail => self.message(),
            _ => String::new(),
        };
        Record::new(status, format!("repair.{}", self.state.tag), message)
    }
}

impl Fixer for StubRepairAction {
    fn description(&self) -> String {
        format!("Testing repair for \"{}\"", self.state.tag)
    }

    fn repair(&self, _host: &dyn Host) -> anyhow::Result<()> {
        self.state.repair_count.fetch_add(1, Ordering::SeqCst);
        if !self.state.success {
            return Err(StubRepairFailure(self.message()).into());
        }
        for target in &self.state.targets {
            target.try_repair();
        }
        Ok(())
    }

    fn is_applicable(&self, _host: &dyn Host) -> bool {
        self.state.applicable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_verifier_counts_down() {
        let host = RecordingHost::new("fake");
        let stub = StubVerifier::new("flaky", 2);
        assert!(stub.verify(&host).is_err());
        stub.try_repair();
        assert!(stub.verify(&host).is_err());
        stub.try_repair();
        stub.try_repair();
        assert!(stub.verify(&host).is_ok());
        assert_eq!(stub.verify_count(), 3);
    }

    #[test]
    fn test_recording_host_reset() {
        let host = RecordingHost::new("fake");
        host.record(RecordStatus::Start, "repair.x", "");
        assert_eq!(host.records().len(), 1);
        host.reset();
        assert!(host.records().is_empty());
    }

    #[test]
    fn test_stub_repair_failure_message() {
        let host = RecordingHost::new("fake");
        let stub = StubRepairAction::new("nofix", false, vec![]);
        let err = stub.repair(&host).unwrap_err();
        assert_eq!(err.to_string(), "Failed repair for \"nofix\"");
        assert!(err.downcast_ref::<StubRepairFailure>().is_some());
    }
}
