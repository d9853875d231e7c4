//! Backend intake: pull render jobs from a project backend and report
//! finished videos back to it.
//!
//! Endpoints (relative to the backend base URL):
//! - `GET  /api/project/pending`       -> a job object, or `null` when idle
//! - `POST /api/project/{id}/complete` -> completion report

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::domain::{Outcome, SpoolError, SpoolResult, TaskEnvelope};
use crate::runtime::TaskHandler;
use crate::typed::RenderTask;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// A job as the backend hands it out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendJob {
    /// Backends send either a string or a number here.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "job id must be a string or number, got {other}"
        ))),
    }
}

impl BackendJob {
    /// A job without a script cannot be rendered.
    pub fn into_render_task(self) -> SpoolResult<RenderTask> {
        let script = match self.script {
            Some(s) if !s.trim().is_empty() => s,
            _ => {
                return Err(SpoolError::handler(format!(
                    "backend job {} has no script",
                    self.id
                )));
            }
        };
        Ok(RenderTask {
            topic: self.topic,
            script: Some(script),
            theme: self.theme,
            job_id: Some(self.id),
        })
    }
}

#[derive(Debug, Serialize)]
struct CompletionReport<'a> {
    id: &'a str,
    video_path: &'a str,
    status: &'static str,
    /// Unix seconds.
    timestamp: f64,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: impl AsRef<str>) -> SpoolResult<Self> {
        let raw = base_url.as_ref();
        let base_url = Url::parse(raw)
            .map_err(|e| SpoolError::Config(format!("invalid backend url {raw:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SpoolError::Config(format!("invalid backend url {raw:?}")));
        }
        Ok(Self {
            client: Client::builder().build()?,
            base_url,
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Ask the backend for the next job. Every failure is logged and reads
    /// as "no job".
    pub async fn fetch_pending(&self) -> Option<BackendJob> {
        let url = self.endpoint(&["api", "project", "pending"]);
        let resp = match self.client.get(url.clone()).timeout(FETCH_TIMEOUT).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                warn!(url = %url, error = %e, "backend offline");
                return None;
            }
            Err(e) => {
                error!(url = %url, error = %e, "error fetching job");
                return None;
            }
        };

        if resp.status() != StatusCode::OK {
            debug!(url = %url, status = resp.status().as_u16(), "no job available");
            return None;
        }

        match resp.json::<Option<BackendJob>>().await {
            Ok(Some(job)) => {
                info!(job_id = %job.id, topic = %job.topic, "received backend job");
                Some(job)
            }
            Ok(None) => None,
            Err(e) => {
                error!(url = %url, error = %e, "malformed job from backend");
                None
            }
        }
    }

    /// Tell the backend a job finished. Failures are logged only.
    pub async fn report_completion(&self, job_id: &str, video_path: &str) {
        let url = self.endpoint(&["api", "project", job_id, "complete"]);
        let report = CompletionReport {
            id: job_id,
            video_path,
            status: "completed",
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        };

        let result = self
            .client
            .post(url)
            .timeout(REPORT_TIMEOUT)
            .json(&report)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(_) => info!(job_id, video_path, "job completion reported"),
            Err(e) => error!(job_id, error = %e, "failed to report job completion"),
        }
    }
}

/// Wraps a handler and reports successful `job_id`-carrying tasks to the
/// backend.
pub struct ReportingHandler<H> {
    inner: H,
    backend: BackendClient,
}

impl<H: TaskHandler> ReportingHandler<H> {
    pub fn new(inner: H, backend: BackendClient) -> Self {
        Self { inner, backend }
    }
}

#[async_trait]
impl<H: TaskHandler> TaskHandler for ReportingHandler<H> {
    async fn handle(&self, envelope: &TaskEnvelope) -> Result<Outcome, SpoolError> {
        let outcome = self.inner.handle(envelope).await?;

        if let Some(job_id) = envelope.params().get("job_id").and_then(Value::as_str) {
            match outcome.file_path() {
                Some(path) => self.backend.report_completion(job_id, path).await,
                None => warn!(
                    task_id = %envelope.task_id(),
                    job_id,
                    "task produced no file, nothing to report"
                ),
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Artifact, Fingerprint, TaskKind};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn job_ids_may_be_numeric() {
        let job: BackendJob =
            serde_json::from_value(json!({"id": 1700000000, "topic": "space"})).unwrap();
        assert_eq!(job.id, "1700000000");
        assert_eq!(job.script, None);
    }

    #[test]
    fn job_maps_to_render_task() {
        let job = BackendJob {
            id: "42".into(),
            topic: "space".into(),
            script: Some("In space nobody hears you scream.".into()),
            theme: Some("cyan_future".into()),
        };
        let task = job.into_render_task().unwrap();
        assert_eq!(task.job_id.as_deref(), Some("42"));
        assert_eq!(task.theme.as_deref(), Some("cyan_future"));
    }

    #[test]
    fn job_without_script_is_rejected() {
        let job = BackendJob {
            id: "7".into(),
            topic: "space".into(),
            script: Some("   ".into()),
            theme: None,
        };
        assert!(matches!(job.into_render_task(), Err(SpoolError::Handler(_))));
    }

    #[tokio::test]
    async fn fetch_pending_returns_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/project/pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "99", "topic": "space", "script": "hello", "theme": "yellow_punch"
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(format!("{}/", server.uri())).unwrap();
        let job = client.fetch_pending().await.unwrap();
        assert_eq!(job.id, "99");
        assert_eq!(job.script.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn fetch_pending_null_body_means_idle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/project/pending"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Null))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri()).unwrap();
        assert!(client.fetch_pending().await.is_none());
    }

    #[tokio::test]
    async fn fetch_pending_tolerates_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        assert!(BackendClient::new(server.uri()).unwrap().fetch_pending().await.is_none());

        let offline = BackendClient::new("http://127.0.0.1:9").unwrap();
        assert!(offline.fetch_pending().await.is_none());
    }

    struct Renders {
        called: AtomicBool,
    }

    #[async_trait]
    impl TaskHandler for Renders {
        async fn handle(&self, _envelope: &TaskEnvelope) -> Result<Outcome, SpoolError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(Outcome::success().with_artifact(Artifact::FilePath("out/job_42.mp4".into())))
        }
    }

    fn envelope(params: Value) -> TaskEnvelope {
        TaskEnvelope::new(Fingerprint::of("render", &params), TaskKind::new("render"), params)
    }

    #[tokio::test]
    async fn reporting_handler_reports_job_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/project/42/complete"))
            .and(body_partial_json(json!({
                "id": "42",
                "video_path": "out/job_42.mp4",
                "status": "completed"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let handler = ReportingHandler::new(
            Renders { called: AtomicBool::new(false) },
            BackendClient::new(server.uri()).unwrap(),
        );
        let outcome = handler
            .handle(&envelope(json!({"topic": "space", "job_id": "42"})))
            .await
            .unwrap();

        assert_eq!(outcome.file_path(), Some("out/job_42.mp4"));
        assert!(handler.inner.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn job_id_is_escaped_in_the_completion_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/project/a%2Fb%3Fx/complete"))
            .and(body_partial_json(json!({"id": "a/b?x"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri()).unwrap();
        client.report_completion("a/b?x", "out/video.mp4").await;
    }

    #[test]
    fn backend_url_must_be_absolute() {
        for bad in ["localhost:3000/x y", "not a url"] {
            assert!(matches!(BackendClient::new(bad), Err(SpoolError::Config(_))), "{bad}");
        }
    }

    #[tokio::test]
    async fn reporting_handler_skips_tasks_without_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let handler = ReportingHandler::new(
            Renders { called: AtomicBool::new(false) },
            BackendClient::new(server.uri()).unwrap(),
        );
        handler.handle(&envelope(json!({"topic": "space"}))).await.unwrap();
    }

    #[tokio::test]
    async fn failed_report_does_not_fail_the_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let handler = ReportingHandler::new(
            Renders { called: AtomicBool::new(false) },
            BackendClient::new(server.uri()).unwrap(),
        );
        assert!(handler.handle(&envelope(json!({"job_id": "42"}))).await.is_ok());
    }
}
