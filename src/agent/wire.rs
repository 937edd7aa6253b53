//! Request model + wire bodies for `POST /payloads/execute`.
//!
//! Two body schemas exist in the wild:
//!
//! ```text
//! canonical: {"name":"ping","args":{...},"async":false,"timestamp":1767225600000}
//! legacy:    {"payload":"ping","args":{...}}
//! ```
//!
//! The canonical one is the default; `legacy` is selected explicitly via
//! configuration for older agents. There is no negotiation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::WireSchema;
use crate::error::ClientError;

/// Synchronous (wait for the result) or asynchronous (agent returns a job id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    #[default]
    Sync,
    Async,
}

impl ExecMode {
    pub fn is_async(self) -> bool {
        matches!(self, ExecMode::Async)
    }
}

/// A validated execution request.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadRequest {
    name: String,
    pub arguments: Map<String, Value>,
    pub mode: ExecMode,
    pub issued_at: DateTime<Utc>,
}

impl PayloadRequest {
    /// Trims the name; a blank name is rejected before any network call.
    pub fn new(name: &str, arguments: Map<String, Value>) -> Result<Self, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::invalid_input("payload name cannot be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            arguments,
            mode: ExecMode::Sync,
            issued_at: Utc::now(),
        })
    }

    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serialize using the requested schema.
    pub fn to_body(&self, schema: WireSchema) -> Value {
        let body = match schema {
            WireSchema::Canonical => serde_json::to_value(CanonicalBody {
                name: &self.name,
                args: &self.arguments,
                is_async: self.mode.is_async(),
                timestamp: self.issued_at.timestamp_millis(),
            }),
            WireSchema::Legacy => serde_json::to_value(LegacyBody {
                payload: &self.name,
                args: &self.arguments,
            }),
        };
        // Plain structs of strings / maps / ints always serialize.
        body.unwrap_or(Value::Null)
    }
}

#[derive(Serialize)]
struct CanonicalBody<'a> {
    name: &'a str,
    args: &'a Map<String, Value>,
    #[serde(rename = "async")]
    is_async: bool,
    timestamp: i64,
}

#[derive(Serialize)]
struct LegacyBody<'a> {
    payload: &'a str,
    args: &'a Map<String, Value>,
}

/// Identifier of an asynchronous job, as returned by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle {
    job_id: String,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.job_id
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn request() -> PayloadRequest {
        let mut args = Map::new();
        args.insert("msg".into(), json!("hi"));
        let mut req = PayloadRequest::new("  echo ", args).unwrap();
        req.issued_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        req
    }

    #[test]
    fn name_is_trimmed_and_required() {
        assert_eq!(request().name(), "echo");
        let err = PayloadRequest::new(" \t", Map::new()).unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[test]
    fn canonical_body() {
        let body = request().with_mode(ExecMode::Async).to_body(WireSchema::Canonical);
        assert_eq!(
            body,
            json!({
                "name":"echo",
                "args":{"msg":"hi"},
                "async":true,
                "timestamp":1767225600000i64
            })
        );
    }

    #[test]
    fn legacy_body() {
        let body = request().to_body(WireSchema::Legacy);
        assert_eq!(body, json!({"payload":"echo","args":{"msg":"hi"}}));
    }

    #[test]
    fn job_handle_is_transparent() {
        let handle = JobHandle::new("job-42");
        assert_eq!(serde_json::to_value(&handle).unwrap(), json!("job-42"));
        assert_eq!(handle.to_string(), "job-42");
    }
}
