//! The host collaborator: the machine under check and its audit log.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status codes written to a host's audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "START")]
    Start,
    #[serde(rename = "END GOOD")]
    EndGood,
    #[serde(rename = "END FAIL")]
    EndFail,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Good => "GOOD",
            RecordStatus::Fail => "FAIL",
            RecordStatus::Start => "START",
            RecordStatus::EndGood => "END GOOD",
            RecordStatus::EndFail => "END FAIL",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A machine that checks and repairs run against.
///
/// Owned by the caller. The engine only ever writes audit records to it.
pub trait Host {
    /// Name used in tracing spans.
    fn hostname(&self) -> &str;

    /// Append one audit record.
    ///
    /// `operation` is `verify.<tag>` or `repair.<tag>`; `message` is empty
    /// except for `FAIL` records.
    fn record(&self, status: RecordStatus, operation: &str, message: &str);
}
