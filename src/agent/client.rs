//! HTTP client for the payload agent.
//!
//! One `reqwest::Client` (connection pool, no cookie store) is shared by every
//! call. Each operation is independent: no ordering between concurrent
//! calls, no cancellation, no retries. A call that cannot reach the agent
//! still resolves to text.

use std::sync::Arc;

use reqwest::header::{ACCEPT, SERVER};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::wire::{JobHandle, PayloadRequest};
use super::{ConnectionState, endpoint_url, host_port};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::normalize::{self, PayloadResponse, ResponseBody};

/// Job states that mean "poll again later".
const PENDING_STATES: [&str; 3] = ["queued", "pending", "running"];

/// Result of a liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionReport {
    pub state: ConnectionState,
    pub message: String,
    /// `None` when no HTTP response was received at all.
    pub http_status: Option<u16>,
}

impl ConnectionReport {
    pub fn reachable(&self) -> bool {
        self.state == ConnectionState::Reachable
    }
}

/// How an execute / status call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Agent answered with a 2xx status.
    Completed { http_status: u16 },
    /// Agent answered outside the 2xx band.
    Failed { http_status: u16 },
    /// No usable response (connect / timeout / body read failure).
    TransportFailure,
    /// Rejected before dispatch.
    InvalidInput,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }
}

/// Rendered execute / status result plus the bits the shell acts on.
#[derive(Debug, Clone)]
pub struct Execution {
    pub text: String,
    pub outcome: Outcome,
    /// Present only for async executions whose response carried a `job_id`
    /// (and for status polls, which always key on one).
    pub job: Option<JobHandle>,
    /// Value of the response's `status` field, if any.
    pub job_status: Option<String>,
}

impl Execution {
    fn from_response(response: &PayloadResponse, track_job: bool) -> Self {
        let outcome = if response.is_success() {
            Outcome::Completed {
                http_status: response.http_status,
            }
        } else {
            Outcome::Failed {
                http_status: response.http_status,
            }
        };
        Self {
            text: response.render(),
            outcome,
            job: track_job.then(|| response.job_handle()).flatten(),
            job_status: response.status_field().map(str::to_string),
        }
    }

    fn rejected(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            outcome: Outcome::InvalidInput,
            job: None,
            job_status: None,
        }
    }

    fn transport_failure(text: String) -> Self {
        Self {
            text,
            outcome: Outcome::TransportFailure,
            job: None,
            job_status: None,
        }
    }

    /// Agent reported the job as still queued / running.
    pub fn is_pending(&self) -> bool {
        self.outcome.is_completed()
            && self
                .job_status
                .as_deref()
                .is_some_and(|s| PENDING_STATES.iter().any(|p| s.eq_ignore_ascii_case(p)))
    }
}

/// Fully-read HTTP response.
#[derive(Debug)]
struct RawResponse {
    status: u16,
    server: Option<String>,
    body: Vec<u8>,
}

/// Payload agent client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PayloadClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl PayloadClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("payload-debug/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .timeout(config.request_deadline())
            // Agent is co-located; never route it through an env proxy.
            .no_proxy()
            .build()?;
        debug!(
            base_url = %config.base_url,
            connect_timeout = ?config.connect_timeout,
            read_timeout = ?config.read_timeout,
            write_timeout = ?config.write_timeout,
            "Payload client ready"
        );
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /* ---- Transport ---- */

    async fn get(&self, segments: &[&str]) -> Result<RawResponse, ClientError> {
        let url = endpoint_url(&self.config.base_url, segments)?;
        debug!(method = "GET", %url, "Sending request");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Self::read(response).await
    }

    async fn post_json(&self, segments: &[&str], body: &Value) -> Result<RawResponse, ClientError> {
        let url = endpoint_url(&self.config.base_url, segments)?;
        debug!(method = "POST", %url, "Sending request");
        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse, ClientError> {
        let status = response.status().as_u16();
        let server = response
            .headers()
            .get(SERVER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        debug!(status, bytes = body.len(), "Received response");
        Ok(RawResponse {
            status,
            server,
            body,
        })
    }

    fn probe_segments(&self) -> Vec<&str> {
        self.config
            .probe_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    }

    /* ---- Operations ---- */

    /// Probe the agent. Reachability follows the HTTP success band; whether
    /// the responder looks like the payload agent only changes the message.
    pub async fn test_connection(&self) -> ConnectionReport {
        let segments = self.probe_segments();
        match self.get(&segments).await {
            Err(e) => {
                warn!(error = %e, "Connection probe failed");
                ConnectionReport {
                    state: ConnectionState::Unreachable,
                    message: format!(
                        "❌ Payload agent not reachable at {}: {e}",
                        host_port(&self.config.base_url)
                    ),
                    http_status: None,
                }
            }
            Ok(resp) => {
                let headline = if looks_like_agent(&resp) {
                    "✅ Payload agent is running"
                } else {
                    "⚠️ Server responded but might not be the payload agent"
                };
                let state = if normalize::is_success(resp.status) {
                    ConnectionState::Reachable
                } else {
                    ConnectionState::Unreachable
                };
                info!(status = resp.status, %state, "Connection probe finished");
                ConnectionReport {
                    state,
                    message: format!("{headline} (HTTP {})", resp.status),
                    http_status: Some(resp.status),
                }
            }
        }
    }

    /// Fetch and render the payload catalog.
    pub async fn list_payloads(&self) -> String {
        match self.get(&["payloads"]).await {
            Ok(resp) => normalize::render_catalog(&resp.body, resp.status),
            Err(e) => {
                warn!(error = %e, "Listing payloads failed");
                format!("❌ Failed to list payloads: {e}")
            }
        }
    }

    /// Execute a payload and render the agent's answer.
    pub async fn execute_payload(&self, request: &PayloadRequest) -> String {
        self.execute(request).await.text
    }

    /// [`Self::execute_payload`] with the outcome and job handle kept.
    pub async fn execute(&self, request: &PayloadRequest) -> Execution {
        let body = request.to_body(self.config.wire_schema);
        info!(
            payload = request.name(),
            mode = ?request.mode,
            arg_count = request.arguments.len(),
            "Executing payload"
        );
        match self.post_json(&["payloads", "execute"], &body).await {
            Ok(resp) => {
                let response = PayloadResponse::new(&resp.body, resp.status);
                debug!(status = resp.status, kind = response.body.kind(), "Execution answered");
                Execution::from_response(&response, request.mode.is_async())
            }
            Err(e) => {
                warn!(payload = request.name(), error = %e, "Payload execution failed");
                Execution::transport_failure(self.remediation(&e))
            }
        }
    }

    /// Payload names from the catalog, in catalog order. `None` when the
    /// catalog cannot be fetched or is not a 2xx answer.
    pub async fn payload_names(&self) -> Option<Vec<String>> {
        match self.get(&["payloads"]).await {
            Ok(resp) if normalize::is_success(resp.status) => {
                Some(normalize::catalog_names(&resp.body))
            }
            Ok(resp) => {
                debug!(status = resp.status, "Catalog unavailable for name hints");
                None
            }
            Err(e) => {
                debug!(error = %e, "Catalog unavailable for name hints");
                None
            }
        }
    }

    /// Poll an async job and render its state.
    pub async fn check_status(&self, job_id: &str) -> String {
        self.poll_status(job_id).await.text
    }

    /// [`Self::check_status`] with the outcome kept.
    pub async fn poll_status(&self, job_id: &str) -> Execution {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Execution::rejected("⚠️ Enter a job id");
        }
        match self.get(&["payloads", "status", job_id]).await {
            Ok(resp) => {
                let response = PayloadResponse::new(&resp.body, resp.status);
                debug!(status = resp.status, kind = response.body.kind(), "Status answered");
                let mut execution = Execution::from_response(&response, true);
                execution.job.get_or_insert_with(|| JobHandle::new(job_id));
                execution
            }
            Err(e) => {
                warn!(job_id, error = %e, "Status check failed");
                Execution::transport_failure(format!("❌ Error checking status: {e}"))
            }
        }
    }

    /// Poll `job` until it leaves the pending states or `max_polls` is hit.
    /// `on_update` sees every poll result (1-based poll count).
    pub async fn wait_for_job(
        &self,
        job: &JobHandle,
        mut on_update: impl FnMut(u32, &Execution),
    ) -> Execution {
        let max_polls = self.config.max_polls.max(1);
        let mut polls = 1;
        let mut last = self.poll_status(job.id()).await;
        loop {
            on_update(polls, &last);
            if !last.is_pending() || polls >= max_polls {
                return last;
            }
            tokio::time::sleep(self.config.poll_interval).await;
            polls += 1;
            last = self.poll_status(job.id()).await;
        }
    }

    /// Fetch and render documentation for one payload.
    pub async fn get_payload_info(&self, name: &str) -> String {
        let name = name.trim();
        if name.is_empty() {
            return "⚠️ Enter a payload name".to_string();
        }
        match self.get(&["payloads", "info", name]).await {
            Ok(resp) => normalize::render_info(&resp.body, resp.status),
            Err(e) => {
                warn!(payload = name, error = %e, "Payload info failed");
                format!("❌ Failed to fetch payload info: {e}")
            }
        }
    }

    /// Actionable message for an execute call that never reached the agent.
    fn remediation(&self, err: &ClientError) -> String {
        let base = &self.config.base_url;
        let port = base.port_or_known_default().unwrap_or(8000);
        format!(
            "❌ Connection Failed\n\
             Error: {err}\n\
             \n\
             Make sure:\n\
             1. The device session hosting the agent is running\n\
             2. The agent server is started, e.g.:\n   \
             uvicorn server:app --host 0.0.0.0 --port {port}\n\
             3. {} is reachable from this device\n\
             4. Re-run `payload-debug ping` to confirm, then retry",
            host_port(base)
        )
    }
}

/// `Server: uvicorn` header, or a `{"status":"ok"}` body.
fn looks_like_agent(resp: &RawResponse) -> bool {
    let uvicorn = resp
        .server
        .as_deref()
        .is_some_and(|s| s.to_ascii_lowercase().contains("uvicorn"));
    uvicorn
        || matches!(
            ResponseBody::classify(&resp.body),
            ResponseBody::Object(map) if map.get("status").and_then(Value::as_str) == Some("ok")
        )
}
