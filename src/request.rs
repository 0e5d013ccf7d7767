//! Run requests and the normalization applied to inbound parameters

use action_flow::StepParams;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_RTO_VALUE: &str = "53";
pub const DEFAULT_TIMEOUT_SEC: u64 = 180;

/// One run's parameters; immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub reg_no: String,
    pub chassis_no: String,
    pub rto_value: String,
    pub headless: bool,
    pub timeout_sec: u64,
}

impl RunRequest {
    pub fn new(reg_no: impl Into<String>, chassis_no: impl Into<String>) -> Self {
        Self {
            reg_no: reg_no.into(),
            chassis_no: chassis_no.into(),
            rto_value: DEFAULT_RTO_VALUE.to_string(),
            headless: true,
            timeout_sec: DEFAULT_TIMEOUT_SEC,
        }
    }

    pub fn with_rto_value(mut self, rto_value: impl Into<String>) -> Self {
        self.rto_value = rto_value.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_timeout_sec(mut self, timeout_sec: u64) -> Self {
        self.timeout_sec = timeout_sec;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    /// Template parameters handed to step scripts
    pub fn params(&self) -> StepParams {
        StepParams::new(&self.reg_no, &self.chassis_no, &self.rto_value)
    }

    /// Arguments of the `child` subcommand that reproduce this request
    ///
    /// Values are attached with `=` so identifiers starting with `-` stay values.
    pub fn child_args(&self, handoff: &Path, workspace_root: &Path) -> Vec<String> {
        vec![
            format!("--handoff={}", handoff.display()),
            format!("--workspace-root={}", workspace_root.display()),
            format!("--reg-no={}", self.reg_no),
            format!("--chassis-no={}", self.chassis_no),
            format!("--rto-value={}", self.rto_value),
            format!("--headless={}", self.headless),
            format!("--timeout-sec={}", self.timeout_sec),
        ]
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("reg_no and chassis_no are required")]
    MissingIdentifiers,
}

/// Values used for anything a request leaves out or gets wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDefaults {
    pub rto_value: String,
    pub headless: bool,
    pub timeout_sec: u64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            rto_value: DEFAULT_RTO_VALUE.to_string(),
            headless: true,
            timeout_sec: DEFAULT_TIMEOUT_SEC,
        }
    }
}

/// Loosely-typed request parameters as they arrive from a query, form or JSON body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRunRequest {
    pub reg_no: Option<Value>,
    pub chassis_no: Option<Value>,
    pub rto_value: Option<Value>,
    pub headless: Option<Value>,
    pub timeout_sec: Option<Value>,
}

impl RawRunRequest {
    /// From `key=value` pairs; the first occurrence of a key wins
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "reg_no" => &mut raw.reg_no,
                "chassis_no" => &mut raw.chassis_no,
                "rto_value" => &mut raw.rto_value,
                "headless" => &mut raw.headless,
                "timeout_sec" => &mut raw.timeout_sec,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(Value::String(value.into()));
            }
        }
        raw
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let field = |name: &str| object.get(name).filter(|v| !v.is_null()).cloned();
        Self {
            reg_no: field("reg_no"),
            chassis_no: field("chassis_no"),
            rto_value: field("rto_value"),
            headless: field("headless"),
            timeout_sec: field("timeout_sec"),
        }
    }

    /// Parse a body as a JSON object, falling back to an urlencoded form
    ///
    /// Anything else (including an empty body) yields no parameters.
    pub fn parse_body(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::default();
        }
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(object)) => Self::from_object(&object),
            Ok(_) => Self::default(),
            Err(_) => serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
                .map(Self::from_pairs)
                .unwrap_or_default(),
        }
    }

    pub fn has_identifiers(&self) -> bool {
        present(&self.reg_no) && present(&self.chassis_no)
    }

    /// Layer a body over query parameters
    ///
    /// Identifiers keep the query's value when it has one; options take the body's.
    pub fn merge(self, body: RawRunRequest) -> Self {
        let keep = |query: Option<Value>, body: Option<Value>| {
            if present(&query) {
                query
            } else {
                body.or(query)
            }
        };
        Self {
            reg_no: keep(self.reg_no, body.reg_no),
            chassis_no: keep(self.chassis_no, body.chassis_no),
            rto_value: body.rto_value.or(self.rto_value),
            headless: body.headless.or(self.headless),
            timeout_sec: body.timeout_sec.or(self.timeout_sec),
        }
    }

    /// Validate identifiers and coerce everything else into a [`RunRequest`]
    pub fn normalize(self, defaults: &RequestDefaults) -> Result<RunRequest, RequestError> {
        let reg_no = text(self.reg_no.as_ref()).filter(|s| !s.is_empty());
        let chassis_no = text(self.chassis_no.as_ref()).filter(|s| !s.is_empty());
        let (Some(reg_no), Some(chassis_no)) = (reg_no, chassis_no) else {
            return Err(RequestError::MissingIdentifiers);
        };

        let rto_value = text(self.rto_value.as_ref())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| defaults.rto_value.clone());
        let headless = self
            .headless
            .as_ref()
            .map_or(defaults.headless, coerce_bool);
        let timeout_sec = self
            .timeout_sec
            .as_ref()
            .and_then(coerce_int)
            .filter(|n| *n > 0)
            .map_or(defaults.timeout_sec, |n| n as u64);

        Ok(RunRequest {
            reg_no,
            chassis_no,
            rto_value,
            headless,
            timeout_sec,
        })
    }
}

fn present(value: &Option<Value>) -> bool {
    text(value.as_ref()).is_some_and(|s| !s.is_empty())
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// `1/true/yes/y/on` are true; numbers are true when non-zero
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        _ => false,
    }
}

/// Integers, floats (truncated) and integer strings
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_options() {
        let req = RawRunRequest::from_pairs([("reg_no", "DL1ABC1234"), ("chassis_no", "MA3ER")])
            .normalize(&RequestDefaults::default())
            .unwrap();
        assert_eq!(req, RunRequest::new("DL1ABC1234", "MA3ER"));
    }

    #[test]
    fn missing_identifiers_are_rejected() {
        let err = RawRunRequest::from_pairs([("reg_no", "DL1"), ("chassis_no", "  ")])
            .normalize(&RequestDefaults::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "reg_no and chassis_no are required");
    }

    #[test]
    fn coerces_booleans_and_timeouts() {
        for (value, expected) in [
            (json!("YES"), true),
            (json!("on"), true),
            (json!("0"), false),
            (json!("nope"), false),
            (json!(2), true),
            (json!(0), false),
            (json!(false), false),
        ] {
            assert_eq!(coerce_bool(&value), expected, "{value}");
        }

        let defaults = RequestDefaults::default();
        let timeout = |v: Value| {
            RawRunRequest {
                reg_no: Some(json!("a")),
                chassis_no: Some(json!("b")),
                timeout_sec: Some(v),
                ..RawRunRequest::default()
            }
            .normalize(&defaults)
            .unwrap()
            .timeout_sec
        };
        assert_eq!(timeout(json!("120")), 120);
        assert_eq!(timeout(json!(90.7)), 90);
        assert_eq!(timeout(json!("soon")), 180);
        assert_eq!(timeout(json!(-5)), 180);
    }

    #[test]
    fn body_parses_json_then_form() {
        let json_body = RawRunRequest::parse_body(br#"{"reg_no":"R","chassis_no":"C","headless":false}"#);
        assert_eq!(json_body.reg_no, Some(json!("R")));
        assert_eq!(json_body.headless, Some(json!(false)));

        let form = RawRunRequest::parse_body(b"reg_no=R+1&chassis_no=C&rto_value=");
        assert_eq!(form.reg_no, Some(json!("R 1")));
        let req = form.normalize(&RequestDefaults::default()).unwrap();
        assert_eq!(req.rto_value, "53");

        assert_eq!(RawRunRequest::parse_body(b"[1,2]"), RawRunRequest::default());
        assert_eq!(RawRunRequest::parse_body(b""), RawRunRequest::default());
    }

    #[test]
    fn query_identifiers_win_over_body() {
        let query = RawRunRequest::from_pairs([("reg_no", "Q"), ("timeout_sec", "30")]);
        let body = RawRunRequest::parse_body(br#"{"reg_no":"B","chassis_no":"C","timeout_sec":60}"#);
        let req = query.merge(body).normalize(&RequestDefaults::default()).unwrap();
        assert_eq!(req.reg_no, "Q");
        assert_eq!(req.chassis_no, "C");
        assert_eq!(req.timeout_sec, 60);
    }

    #[test]
    fn child_args_carry_every_field() {
        let req = RunRequest::new("R", "C").with_headless(false).with_timeout_sec(5);
        let args = req.child_args(Path::new("/tmp/h.json"), Path::new("/tmp/rto_run_1"));
        assert_eq!(
            args,
            [
                "--handoff=/tmp/h.json",
                "--workspace-root=/tmp/rto_run_1",
                "--reg-no=R",
                "--chassis-no=C",
                "--rto-value=53",
                "--headless=false",
                "--timeout-sec=5"
            ]
        );
    }

    #[test]
    fn child_args_keep_hyphen_leading_identifiers_attached() {
        let req = RunRequest::new("-DL1ABC1234", "--help").with_rto_value("-1");
        let args = req.child_args(Path::new("/tmp/h.json"), Path::new("/tmp/w"));
        assert!(args.contains(&"--reg-no=-DL1ABC1234".to_string()));
        assert!(args.contains(&"--chassis-no=--help".to_string()));
        assert!(args.contains(&"--rto-value=-1".to_string()));
        assert!(args.iter().all(|arg| arg.starts_with("--") && arg.contains('=')));
    }
}
