//! Task lifecycle status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
///
/// State transitions:
/// - Pending -> SentRemote (dispatch accepted)
/// - Pending -> ProcessingLocal -> CompletedLocal
/// - Pending | ProcessingLocal -> Failed (attempt budget exhausted)
///
/// Transitions are forward-only. A task never returns to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the pending collection.
    Pending,

    /// Accepted by the remote endpoint.
    #[serde(alias = "sent_to_n8n")]
    SentRemote,

    /// Picked for local processing (may remain here between passes while
    /// attempts are left).
    ProcessingLocal,

    /// Local handler succeeded.
    CompletedLocal,

    /// Attempt budget exhausted.
    Failed,
}

impl TaskStatus {
    /// Is this a terminal status (task belongs in the processed collection)?
    ///
    /// `SentRemote` is terminal from this process's point of view: the remote
    /// side owns the work from then on.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::SentRemote | TaskStatus::CompletedLocal | TaskStatus::Failed
        )
    }

    /// Can a task move from `self` to `next`?
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, SentRemote)
                | (Pending, ProcessingLocal)
                | (Pending, Failed)
                | (ProcessingLocal, ProcessingLocal)
                | (ProcessingLocal, SentRemote)
                | (ProcessingLocal, CompletedLocal)
                | (ProcessingLocal, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::SentRemote => "sent_remote",
            TaskStatus::ProcessingLocal => "processing_local",
            TaskStatus::CompletedLocal => "completed_local",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TaskStatus::Pending, "pending")]
    #[case(TaskStatus::SentRemote, "sent_remote")]
    #[case(TaskStatus::ProcessingLocal, "processing_local")]
    #[case(TaskStatus::CompletedLocal, "completed_local")]
    #[case(TaskStatus::Failed, "failed")]
    fn serializes_as_snake_case(#[case] status: TaskStatus, #[case] name: &str) {
        let s = serde_json::to_string(&status).unwrap();
        assert_eq!(s, format!("\"{name}\""));
        assert_eq!(status.to_string(), name);
    }

    #[test]
    fn legacy_remote_status_is_accepted() {
        let status: TaskStatus = serde_json::from_str("\"sent_to_n8n\"").unwrap();
        assert_eq!(status, TaskStatus::SentRemote);
    }

    #[test]
    fn transitions_are_forward_only() {
        for status in [
            TaskStatus::SentRemote,
            TaskStatus::ProcessingLocal,
            TaskStatus::CompletedLocal,
            TaskStatus::Failed,
        ] {
            assert!(!status.can_transition_to(TaskStatus::Pending));
        }
        assert!(!TaskStatus::CompletedLocal.can_transition_to(TaskStatus::Failed));
        assert!(TaskStatus::ProcessingLocal.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::ProcessingLocal.is_terminal());
        assert!(TaskStatus::SentRemote.is_terminal());
        assert!(TaskStatus::CompletedLocal.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
