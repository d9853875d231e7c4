use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Fingerprint, TaskStatus};

/// Free-form task tag (e.g. "render", "notify").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskKind(String);

impl TaskKind {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind + parameters (+ fingerprint): what a handler gets to see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    task_id: Fingerprint,
    kind: TaskKind,
    params: Value,
}

impl TaskEnvelope {
    pub fn new(task_id: Fingerprint, kind: TaskKind, params: Value) -> Self {
        Self {
            task_id,
            kind,
            params,
        }
    }

    pub fn task_id(&self) -> &Fingerprint {
        &self.task_id
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn params(&self) -> &Value {
        &self.params
    }
}

/// Persisted task record.
///
/// This is the on-disk shape as well as the remote dispatch payload:
/// `task_id`, `type`, `data`, `priority`, `created_at`, `status`, `attempts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: Fingerprint,

    #[serde(rename = "type")]
    pub kind: TaskKind,

    #[serde(default)]
    pub data: Value,

    #[serde(default)]
    pub priority: i64,

    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "default_status")]
    pub status: TaskStatus,

    #[serde(default)]
    pub attempts: u32,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

/// Accept RFC 3339 as well as naive ISO-8601 (no offset, read as UTC).
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid created_at {raw:?}: {e}")))
}

impl TaskRecord {
    /// New pending record. The fingerprint is derived from kind + data.
    pub fn new(kind: TaskKind, data: Value, priority: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            task_id: Fingerprint::of(kind.as_str(), &data),
            kind,
            data,
            priority,
            created_at,
            status: TaskStatus::Pending,
            attempts: 0,
        }
    }

    pub fn envelope(&self) -> TaskEnvelope {
        TaskEnvelope::new(self.task_id.clone(), self.kind.clone(), self.data.clone())
    }

    /// Mark as picked for local processing (consumes one attempt).
    pub fn start_local_attempt(&mut self) {
        self.transition(TaskStatus::ProcessingLocal);
        self.attempts += 1;
    }

    /// Mark as accepted by the remote endpoint.
    pub fn mark_sent_remote(&mut self) {
        self.transition(TaskStatus::SentRemote);
    }

    /// Mark as completed by the local handler.
    pub fn mark_completed_local(&mut self) {
        self.transition(TaskStatus::CompletedLocal);
    }

    /// Mark as failed permanently.
    pub fn mark_failed(&mut self) {
        self.transition(TaskStatus::Failed);
    }

    fn transition(&mut self, next: TaskStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal transition {} -> {next} for task {}",
            self.status,
            self.task_id
        );
        self.status = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn record_uses_wire_field_names() {
        let record = TaskRecord::new(
            TaskKind::new("render"),
            json!({"topic": "space"}),
            2,
            at_noon(),
        );
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["task_id"], record.task_id.as_str());
        assert_eq!(v["type"], "render");
        assert_eq!(v["data"]["topic"], "space");
        assert_eq!(v["priority"], 2);
        assert_eq!(v["created_at"], "2024-01-01T12:00:00Z");
        assert_eq!(v["status"], "pending");
        assert_eq!(v["attempts"], 0);
    }

    #[test]
    fn reads_naive_timestamps_and_missing_fields() {
        let raw = r#"{
            "task_id": "a1b2c3d4e5f6",
            "type": "script",
            "data": {"topic": "AI", "duration": 60},
            "created_at": "2024-01-01T12:00:00.123456"
        }"#;
        let record: TaskRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.task_id.as_str(), "a1b2c3d4e5f6");
        assert_eq!(record.priority, 0);
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.attempts, 0);
        assert_eq!(record.created_at.date_naive(), at_noon().date_naive());
    }

    #[test]
    fn rejects_garbage_timestamp() {
        let raw = r#"{"task_id":"x","type":"t","data":{},"created_at":"yesterday"}"#;
        assert!(serde_json::from_str::<TaskRecord>(raw).is_err());
    }

    #[test]
    fn local_attempts_increment() {
        let mut record = TaskRecord::new(TaskKind::new("render"), json!({}), 0, at_noon());
        record.start_local_attempt();
        record.start_local_attempt();
        assert_eq!(record.attempts, 2);
        assert_eq!(record.status, TaskStatus::ProcessingLocal);
        record.mark_failed();
        assert_eq!(record.status, TaskStatus::Failed);
    }

    #[test]
    fn envelope_carries_identity() {
        let record = TaskRecord::new(TaskKind::new("tts"), json!({"voice": "en-US"}), 0, at_noon());
        let env = record.envelope();
        assert_eq!(env.task_id(), &record.task_id);
        assert_eq!(env.kind().as_str(), "tts");
        assert_eq!(env.params()["voice"], "en-US");
    }
}
