use serde::{Serialize, Serializer};

/// Lifecycle position of the most recent rescan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState {
    /// No scan has run since the supervisor was created.
    Idle,
    /// Reporter process still alive.
    Running,
    /// Exited with status 0.
    Success,
    /// Failed to launch, exited non-zero, was stopped or timed out.
    Error,
}

impl ScanState {
    /// `Success` or `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanState::Success | ScanState::Error)
    }

    /// Wire name; `Idle` has none and is reported as `null`.
    pub fn as_wire(self) -> Option<&'static str> {
        match self {
            ScanState::Idle => None,
            ScanState::Running => Some("running"),
            ScanState::Success => Some("success"),
            ScanState::Error => Some("error"),
        }
    }
}

impl Serialize for ScanState {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        self.as_wire().serialize(serializer)
    }
}

/// Point-in-time view of the supervised run.
///
/// Empty captured output is reported as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanStatus {
    /// Lifecycle position.
    pub status: ScanState,
    /// Captured standard output so far.
    pub stdout: Option<String>,
    /// Captured standard error so far.
    pub stderr: Option<String>,
}

impl ScanStatus {
    /// Status before any run was started.
    pub fn idle() -> Self {
        Self {
            status: ScanState::Idle,
            stdout: None,
            stderr: None,
        }
    }

    pub(crate) fn from_buffers(
        status: ScanState,
        stdout: &[u8],
        stderr: &[u8],
    ) -> Self {
        Self {
            status,
            stdout: non_empty(stdout),
            stderr: non_empty(stderr),
        }
    }
}

fn non_empty(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn idle_serializes_with_null_fields() {
        let value = serde_json::to_value(ScanStatus::idle()).expect("json");
        assert_eq!(
            value,
            json!({"status": null, "stdout": null, "stderr": null})
        );
    }

    #[test]
    fn empty_buffers_are_reported_absent() {
        let status =
            ScanStatus::from_buffers(ScanState::Success, b"done\n", b"");
        let value = serde_json::to_value(status).expect("json");
        assert_eq!(
            value,
            json!({"status": "success", "stdout": "done\n", "stderr": null})
        );
    }

    #[test]
    fn only_success_and_error_are_terminal() {
        assert!(!ScanState::Idle.is_terminal());
        assert!(!ScanState::Running.is_terminal());
        assert!(ScanState::Success.is_terminal());
        assert!(ScanState::Error.is_terminal());
    }
}
