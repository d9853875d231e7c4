//! Task trait - binds a parameter type to a task kind.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A typed task: its serialized form is the record's `data` object.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Notify { channel: String }
///
/// impl Task for Notify {
///     const KIND: &'static str = "notify";
/// }
/// ```
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;
}

/// Render a short vertical video for a topic.
///
/// `job_id` is set when the task came from the backend intake; completion is
/// then reported back to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTask {
    pub topic: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl Task for RenderTask {
    const KIND: &'static str = "render";
}

impl RenderTask {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            script: None,
            theme: None,
            job_id: None,
        }
    }
}
