//! CommandHandler - local processing by running an external program.
//!
//! This is how the render pipeline is plugged in: the program receives the
//! task parameters as a JSON string (last argument) plus `SPOOL_TASK_ID` and
//! `SPOOL_TASK_KIND` in its environment. Exit status 0 is success and the
//! last non-empty stdout line is taken as the produced file path.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::{Artifact, Outcome, SpoolError, TaskEnvelope};
use crate::runtime::TaskHandler;

/// How much trailing stderr to keep in the failure message.
const STDERR_TAIL: usize = 512;

#[derive(Debug, Clone)]
pub struct CommandHandler {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandHandler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Build from a whitespace-separated command line (`"render.sh --fast"`).
    pub fn from_command_line(line: &str) -> Result<Self, SpoolError> {
        let mut parts = line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| SpoolError::Config("empty render command".to_string()))?;
        Ok(Self::new(program).with_args(parts.map(str::to_string)))
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    /// Unbounded unless set.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl TaskHandler for CommandHandler {
    async fn handle(&self, envelope: &TaskEnvelope) -> Result<Outcome, SpoolError> {
        let params = serde_json::to_string(envelope.params())?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(params)
            .env("SPOOL_TASK_ID", envelope.task_id().as_str())
            .env("SPOOL_TASK_KIND", envelope.kind().as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            task_id = %envelope.task_id(),
            program = %self.program,
            "spawning local handler"
        );

        let run = cmd.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                SpoolError::handler(format!("{} timed out after {limit:?}", self.program))
            })?,
            None => run.await,
        }
        .map_err(|e| SpoolError::handler(format!("failed to spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = tail_chars(stderr.trim(), STDERR_TAIL);
            return Err(SpoolError::handler(format!(
                "{} exited with {}: {tail}",
                self.program, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut outcome = Outcome::success();
        if let Some(path) = stdout.lines().map(str::trim).rev().find(|l| !l.is_empty()) {
            info!(
                task_id = %envelope.task_id(),
                artifact = %path,
                "local handler produced artifact"
            );
            outcome = outcome.with_artifact(Artifact::FilePath(path.to_string()));
        }
        Ok(outcome)
    }
}

fn tail_chars(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n.saturating_sub(1)) {
        Some((idx, _)) if s.chars().count() > n => &s[idx..],
        _ => s,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::{Fingerprint, TaskKind};
    use serde_json::json;

    fn envelope() -> TaskEnvelope {
        let params = json!({"topic": "space"});
        TaskEnvelope::new(Fingerprint::of("render", &params), TaskKind::new("render"), params)
    }

    #[tokio::test]
    async fn last_stdout_line_is_the_artifact() {
        let handler = CommandHandler::new("sh").with_args([
            "-c".to_string(),
            "echo rendering; echo \"output/$SPOOL_TASK_KIND.mp4\"; echo".to_string(),
        ]);
        let outcome = handler.handle(&envelope()).await.unwrap();
        assert_eq!(outcome.file_path(), Some("output/render.mp4"));
    }

    #[tokio::test]
    async fn params_are_passed_as_json_argument() {
        // with `sh -c`, the argument after the script becomes $0
        let handler = CommandHandler::new("sh")
            .with_args(["-c".to_string(), "echo \"$0\"".to_string()]);
        let outcome = handler.handle(&envelope()).await.unwrap();
        assert_eq!(outcome.file_path(), Some(r#"{"topic":"space"}"#));
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let handler = CommandHandler::new("sh")
            .with_args(["-c".to_string(), "echo boom >&2; exit 3".to_string()]);
        let err = handler.handle(&envelope()).await.unwrap_err();
        assert!(matches!(err, SpoolError::Handler(ref m) if m.contains("boom")));
    }

    #[tokio::test]
    async fn missing_program_is_a_failure() {
        let handler = CommandHandler::new("/nonexistent/render-video");
        let err = handler.handle(&envelope()).await.unwrap_err();
        assert!(matches!(err, SpoolError::Handler(ref m) if m.contains("spawn")));
    }

    #[tokio::test]
    async fn timeout_is_enforced_when_set() {
        let handler = CommandHandler::new("sh")
            .with_args(["-c".to_string(), "sleep 5".to_string()])
            .with_timeout(Duration::from_millis(100));
        let started = std::time::Instant::now();
        let err = handler.handle(&envelope()).await.unwrap_err();
        assert!(matches!(err, SpoolError::Handler(ref m) if m.contains("timed out")));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn command_line_is_split_on_whitespace() {
        let h = CommandHandler::from_command_line("python3 render.py --fast").unwrap();
        assert_eq!(h.program, "python3");
        assert_eq!(h.args, vec!["render.py", "--fast"]);
        assert!(CommandHandler::from_command_line("   ").is_err());
    }

    #[test]
    fn tail_keeps_the_end() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 3), "ab");
    }
}
