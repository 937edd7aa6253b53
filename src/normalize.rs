/*!
normalize.rs - agent response rendering.

Agents answer in whatever shape they like: a JSON object with some subset of
well-known keys, a bare JSON array, FastAPI error objects, plain text, or
nothing at all. Everything here turns `(body bytes, HTTP status)` into one
human-readable block and never fails.

Body classification is decided purely by parse attempts, in order:

  object -> array -> raw text   (whitespace-only bodies are `Empty`)

Object rendering order is fixed:

  status, job_id, message, result, error, output

Layout (execute / status):

  ✅ Success                    <- or "❌ Error (HTTP 500)"

  Status: running
  Job ID: job-42
  Message: ...

  📊 Result:
  ...

Catalog and info endpoints have their own renderers on top of the same
classification; any shape they do not recognize degrades to a raw dump.
*/

use serde_json::{Map, Value};

use crate::agent::JobHandle;

/* ---- Body Classification ---- */

/// Shape of a response body, decided by parse attempts (never by wire tags).
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    RawText(String),
    Empty,
}

impl ResponseBody {
    pub fn classify(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        if let Ok(map) = serde_json::from_slice::<Map<String, Value>>(body) {
            return Self::Object(map);
        }
        if let Ok(items) = serde_json::from_slice::<Vec<Value>>(body) {
            return Self::Array(items);
        }
        Self::RawText(String::from_utf8_lossy(body).into_owned())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::RawText(_) => "raw",
            Self::Empty => "empty",
        }
    }
}

/// How a recognized field is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// `Label: value` on one line
    Inline,
    /// blank line, `Label:`, then the value on its own lines
    Block,
}

/// Recognized response keys, in rendering order.
const RECOGNIZED_FIELDS: [(&str, &str, Placement); 6] = [
    ("status", "Status", Placement::Inline),
    ("job_id", "Job ID", Placement::Inline),
    ("message", "Message", Placement::Inline),
    ("result", "📊 Result", Placement::Block),
    ("error", "🔥 Error", Placement::Block),
    ("output", "📋 Output", Placement::Block),
];

/// A classified agent response.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadResponse {
    pub http_status: u16,
    pub body: ResponseBody,
}

impl PayloadResponse {
    pub fn new(body: &[u8], http_status: u16) -> Self {
        Self {
            http_status,
            body: ResponseBody::classify(body),
        }
    }

    pub fn is_success(&self) -> bool {
        is_success(self.http_status)
    }

    /// Recognized fields present in the body, in rendering order.
    pub fn fields(&self) -> Vec<(&'static str, &Value)> {
        let ResponseBody::Object(map) = &self.body else {
            return Vec::new();
        };
        RECOGNIZED_FIELDS
            .iter()
            .filter_map(|(key, _, _)| map.get(*key).map(|v| (*key, v)))
            .collect()
    }

    /// `job_id` as a poll handle (string or numeric ids accepted).
    pub fn job_handle(&self) -> Option<JobHandle> {
        let ResponseBody::Object(map) = &self.body else {
            return None;
        };
        let id = match map.get("job_id")? {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(JobHandle::new(id))
    }

    /// Value of the `status` field, if it is a string.
    pub fn status_field(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Object(map) => map.get("status").and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        let mut out = verdict(self.http_status);
        out.push_str("\n\n");
        out.push_str(&render_body(&self.body));
        out
    }
}

/* ---- Execute / Status ---- */

/// Render an execute / status response. Never fails.
pub fn normalize(body: &[u8], http_status: u16) -> String {
    PayloadResponse::new(body, http_status).render()
}

pub fn is_success(http_status: u16) -> bool {
    (200..300).contains(&http_status)
}

/// One-line verdict for an HTTP status.
pub fn verdict(http_status: u16) -> String {
    if is_success(http_status) {
        "✅ Success".to_string()
    } else {
        format!("❌ Error (HTTP {http_status})")
    }
}

fn render_body(body: &ResponseBody) -> String {
    match body {
        ResponseBody::Object(map) => {
            let fields = render_fields(map);
            if fields.is_empty() {
                raw_dump("📄 Raw:", &Value::Object(map.clone()))
            } else {
                fields
            }
        }
        ResponseBody::Array(items) => raw_dump("📄 Raw:", &Value::Array(items.clone())),
        ResponseBody::RawText(text) => format!("📄 Raw response:\n{text}"),
        ResponseBody::Empty => "(empty response)".to_string(),
    }
}

fn render_fields(map: &Map<String, Value>) -> String {
    let mut out = String::new();
    for (key, label, placement) in RECOGNIZED_FIELDS {
        let Some(value) = map.get(key) else {
            continue;
        };
        match placement {
            Placement::Inline => {
                out.push_str(&format!("{label}: {}\n", display_value(value)));
            }
            Placement::Block => {
                out.push_str(&format!("\n{label}:\n{}\n", display_value(value)));
            }
        }
    }
    out
}

/// Strings verbatim, everything else as (pretty) JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => pretty(value),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn raw_dump(label: &str, value: &Value) -> String {
    format!("{label}\n{}", pretty(value))
}

/* ---- Catalog ---- */

/// Render the payload catalog.
///
/// Accepted: `["a","b"]`, `[{"name":..,"description":..,"author":..}]`, or
/// either wrapped as `{"payloads": [...]}`. Anything else is dumped raw.
pub fn render_catalog(body: &[u8], http_status: u16) -> String {
    let response = PayloadResponse::new(body, http_status);
    if !response.is_success() {
        return response.render();
    }

    let items = match &response.body {
        ResponseBody::Array(items) => Some(items),
        ResponseBody::Object(map) => map.get("payloads").and_then(Value::as_array),
        _ => None,
    };

    match items.and_then(|items| render_catalog_items(items)) {
        Some(list) => list,
        None => match &response.body {
            ResponseBody::Object(map) if !render_fields(map).is_empty() => response.render(),
            ResponseBody::Object(map) => raw_dump("📄 Response:", &Value::Object(map.clone())),
            ResponseBody::Array(items) => raw_dump("📄 Response:", &Value::Array(items.clone())),
            other => render_body(other),
        },
    }
}

fn render_catalog_items(items: &[Value]) -> Option<String> {
    let mut out = format!("📦 Available Payloads ({}):\n\n", items.len());
    if items.is_empty() {
        out.push_str("(none)\n");
        return Some(out);
    }
    for item in items {
        match item {
            Value::String(name) => out.push_str(&format!("• {name}\n")),
            Value::Object(obj) => {
                let name = obj.get("name").and_then(Value::as_str)?;
                out.push_str(&format!("• {name}\n"));
                if let Some(desc) = obj.get("description").and_then(Value::as_str) {
                    out.push_str(&format!("  📝 {desc}\n"));
                }
                if let Some(author) = obj.get("author").and_then(Value::as_str) {
                    out.push_str(&format!("  👤 {author}\n"));
                }
            }
            _ => return None,
        }
    }
    Some(out)
}

/// Payload names in catalog order. Unrecognized shapes yield none.
pub fn catalog_names(body: &[u8]) -> Vec<String> {
    let items = match ResponseBody::classify(body) {
        ResponseBody::Array(items) => items,
        ResponseBody::Object(mut map) => match map.remove("payloads") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

/* ---- Payload Info ---- */

/// Render payload documentation (name, description, author, version,
/// typed parameters). Unrecognized shapes are dumped raw.
pub fn render_info(body: &[u8], http_status: u16) -> String {
    let response = PayloadResponse::new(body, http_status);
    if !response.is_success() {
        return response.render();
    }

    let ResponseBody::Object(map) = &response.body else {
        return render_body(&response.body);
    };
    let Some(name) = map.get("name").and_then(Value::as_str) else {
        return raw_dump("📄 Raw:", &Value::Object(map.clone()));
    };

    let mut out = String::from("📄 Payload Information\n\n");
    out.push_str(&format!("Name: {name}\n"));
    for (key, label) in [
        ("description", "Description"),
        ("author", "Author"),
        ("version", "Version"),
    ] {
        if let Some(v) = map.get(key).filter(|v| !v.is_null()) {
            out.push_str(&format!("{label}: {}\n", display_value(v)));
        }
    }

    let params = match map.get("parameters") {
        Some(Value::Object(params)) => params
            .iter()
            .map(|(name, spec)| param_line(name, spec))
            .collect::<Vec<_>>(),
        Some(Value::Array(params)) => params
            .iter()
            .filter_map(|spec| {
                let name = spec.get("name").and_then(Value::as_str)?;
                Some(param_line(name, spec))
            })
            .collect(),
        _ => Vec::new(),
    };
    if !params.is_empty() {
        out.push_str("\n⚙️ Parameters:\n");
        for line in params {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// `  • name: type (default: x) - description`
fn param_line(name: &str, spec: &Value) -> String {
    let (ty, default, desc) = match spec {
        // Shorthand: {"msg": "string"}
        Value::String(ty) => (ty.as_str(), None, None),
        Value::Object(obj) => (
            obj.get("type").and_then(Value::as_str).unwrap_or("any"),
            obj.get("default"),
            obj.get("description").and_then(Value::as_str),
        ),
        _ => ("any", None, None),
    };
    let mut line = format!("  • {name}: {ty}");
    if let Some(default) = default {
        line.push_str(&format!(" (default: {})", display_value(default)));
    }
    if let Some(desc) = desc {
        line.push_str(&format!(" - {desc}"));
    }
    line
}
