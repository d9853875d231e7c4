//! Errors - error types shared by the queue, its stores and its handlers.

use std::path::PathBuf;

use thiserror::Error;

use super::task::TaskKind;

pub type SpoolResult<T> = Result<T, SpoolError>;

/// Domain error for queue operations.
///
/// Classification:
/// - `Storage` / `Serialization`: persistence failures, surfaced to the caller.
/// - `HandlerNotFound` / `Handler`: local processing failures, counted against
///   the task's attempt budget.
/// - `Transport`: network failures outside the dispatch retry loop (intake).
#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("handler not found for kind={0}")]
    HandlerNotFound(TaskKind),

    #[error("duplicate handler for kind={0}")]
    DuplicateHandler(TaskKind),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SpoolError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_name_the_path() {
        let err = SpoolError::storage(
            "queue/pending/abc.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, SpoolError::Storage { .. }));
        assert!(err.to_string().contains("queue/pending/abc.json"));

        let err = SpoolError::handler("render exited with 1");
        assert_eq!(err.to_string(), "handler failed: render exited with 1");
    }
}
