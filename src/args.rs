/*!
args.rs - argument text parsing + coercion.

Turns whatever the operator typed into the `args` object sent to the agent.

Accepted forms:
  - ""                          -> {}
  - {"msg":"hi","n":3}          -> JSON object, taken as-is
  - msg=hi,n=3,loud=true        -> comma separated KEY=VALUE pairs

Pair values are coerced in a fixed precedence: integer, float, boolean
literal, string. Nothing in here returns an error; the worst case is an
empty mapping (plus a warning for broken JSON).

Shell helpers (`--param`, `--param-file`) live here too so the same
coercion applies to every argument source.
*/

use serde_json::{Map, Value};

/// Result of parsing free-form argument text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    /// Typed key/value mapping (possibly empty).
    pub values: Map<String, Value>,
    /// Non-fatal note for the caller (e.g. JSON that failed to parse).
    pub warning: Option<String>,
}

impl ParsedArgs {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/* ---- Free-form Text ---- */

/// Parse user-entered argument text. Never fails.
pub fn parse(text: &str) -> ParsedArgs {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedArgs::default();
    }

    if trimmed.starts_with('{') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(values)) => ParsedArgs {
                values,
                warning: None,
            },
            Ok(_) => ParsedArgs {
                values: Map::new(),
                warning: Some("arguments JSON is not an object; sending no arguments".into()),
            },
            Err(e) => ParsedArgs {
                values: Map::new(),
                warning: Some(format!("invalid arguments JSON ({e}); sending no arguments")),
            },
        };
    }

    let mut values = Map::new();
    for pair in trimmed.split(',') {
        if let Some((key, raw)) = split_pair(pair) {
            values.insert(key.to_string(), coerce_value(raw));
        }
    }
    ParsedArgs {
        values,
        warning: None,
    }
}

/// Split `key=value` (exactly one `=`, non-empty key). Anything else is skipped.
fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (k, v) = pair.split_once('=')?;
    if v.contains('=') {
        return None;
    }
    let key = k.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, v.trim()))
}

/// Coerce a raw string: integer, then float, then `true`/`false`, else string.
pub fn coerce_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = raw
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(n);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/* ---- Shell Parameter Sources ---- */

/// Merge repeatable `--param KEY=VALUE` entries on top of `values`.
///
/// Unlike free-form text, a malformed `--param` is reported back: the
/// operator typed it as a discrete flag, so silently dropping it would hide
/// a typo.
pub fn merge_params(values: &mut Map<String, Value>, params: &[String]) -> anyhow::Result<()> {
    for kv in params {
        let Some((key, raw)) = split_pair(kv) else {
            anyhow::bail!("invalid --param (expected KEY=VALUE): {kv}");
        };
        values.insert(key.to_string(), coerce_value(raw));
    }
    Ok(())
}

/// Load a JSON / YAML parameter file. Existing keys win over file entries.
pub fn merge_param_file(values: &mut Map<String, Value>, path: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read param file: {path}"))?;
    let lower = path.to_ascii_lowercase();

    let value: Value = if lower.ends_with(".yaml") || lower.ends_with(".yml") {
        let yaml_v: serde_yaml::Value =
            serde_yaml::from_str(&raw).context("failed to parse YAML param file")?;
        serde_json::to_value(yaml_v).context("failed to convert YAML to JSON")?
    } else {
        serde_json::from_str(&raw).context("failed to parse JSON param file")?
    };

    let Value::Object(obj) = value else {
        anyhow::bail!("param file root must be an object");
    };

    for (k, v) in obj {
        values.entry(k).or_insert(v);
    }
    Ok(())
}
