use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution state of a kernel as reported through `status` broadcasts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelStatus {
    /// No status has been observed yet.
    #[default]
    Unknown,
    /// The kernel is coming up.
    Starting,
    /// Ready for requests.
    Idle,
    /// Processing a request.
    Busy,
    /// A restart was requested and is in progress.
    Restarting,
    /// The kernel restarted on its own after dying.
    Autorestarting,
    /// The client is re-establishing its connection.
    Reconnecting,
    /// A shutdown is in progress.
    Terminating,
    /// The kernel is gone; no further requests are processed.
    Dead,
}

impl KernelStatus {
    /// Returns the wire spelling of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            KernelStatus::Unknown => "unknown",
            KernelStatus::Starting => "starting",
            KernelStatus::Idle => "idle",
            KernelStatus::Busy => "busy",
            KernelStatus::Restarting => "restarting",
            KernelStatus::Autorestarting => "autorestarting",
            KernelStatus::Reconnecting => "reconnecting",
            KernelStatus::Terminating => "terminating",
            KernelStatus::Dead => "dead",
        }
    }
}

impl fmt::Display for KernelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
