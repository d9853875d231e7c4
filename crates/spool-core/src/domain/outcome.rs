//! Outcome model: what a local handler reports back on success.
//!
//! Failures travel as `SpoolError`; an `Outcome` only describes what a
//! successful run produced so callers (e.g. completion reporting) can use it.

use serde::{Deserialize, Serialize};

/// Something a handler produced. Only files so far: the rendered video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Artifact {
    FilePath(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
}

impl Outcome {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// First produced file path, if any.
    pub fn file_path(&self) -> Option<&str> {
        self.artifacts.first().map(|a| match a {
            Artifact::FilePath(p) => p.as_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_is_tagged_enum() {
        let a = Artifact::FilePath("output/video.mp4".to_string());
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["kind"], "FilePath");
        assert_eq!(v["value"], "output/video.mp4");
    }

    #[test]
    fn file_path_is_the_first_produced_file() {
        let o = Outcome::success()
            .with_artifact(Artifact::FilePath("out.mp4".to_string()))
            .with_artifact(Artifact::FilePath("thumb.png".to_string()));
        assert_eq!(o.file_path(), Some("out.mp4"));
        assert_eq!(Outcome::success().file_path(), None);
    }
}
