//! Wire types shared by the dispatcher and the remote transport.
//!
//! A request is a [`CallEnvelope`] POSTed to a path derived from the target:
//!
//! ```text
//! POST {distant_url}storage/Connection/      body: codec(envelope)
//! ```
//!
//! Failures come back as a [`RemoteErrorEnvelope`] encoded with a structured
//! codec, signalled by the response content type.

use crate::config::RemoteConfig;
use crate::{ImporterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dynamic value passed to and returned from calls.
pub type Value = serde_json::Value;

/// Keyword arguments.
pub type Kwargs = serde_json::Map<String, Value>;

/// Operation kind carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Call,
    Get,
    Instantiate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Call => "call",
            Operation::Get => "get",
            Operation::Instantiate => "instantiate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    #[serde(rename = "type")]
    pub operation: Operation,
    /// Dot-separated `namespace.symbol`. Travels in the URL, not the body.
    #[serde(skip)]
    pub target_path: String,
    #[serde(rename = "args", default)]
    pub positional_args: Vec<Value>,
    #[serde(rename = "kw", default)]
    pub keyword_args: Kwargs,
    #[serde(rename = "variable", default, skip_serializing_if = "Option::is_none")]
    pub variable_name: Option<String>,
}

impl CallEnvelope {
    /// Build an envelope for `namespace.symbol`.
    pub fn new(
        operation: Operation,
        namespace: &str,
        symbol: &str,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> Self {
        Self {
            operation,
            target_path: format!("{}.{}", namespace, symbol),
            positional_args: args,
            keyword_args: kwargs,
            variable_name: None,
        }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable_name = Some(variable.into());
        self
    }

    /// Split `target_path` on its final dot into namespace and symbol.
    pub fn split_target(&self) -> Result<(&str, &str)> {
        split_target(&self.target_path)
    }

    /// URL path for this envelope: dots become slashes, plus a trailing slash.
    pub fn wire_path(&self) -> Result<String> {
        self.split_target()?;
        Ok(wire_path(&self.target_path))
    }

    /// Envelope as a codec-neutral value.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self)
            .map_err(|e| ImporterError::serialize(format!("Failed to build envelope: {}", e), ""))
    }
}

/// Split a dotted target into `(namespace, symbol)` on the final dot. Both
/// halves must be non-empty.
pub fn split_target(target: &str) -> Result<(&str, &str)> {
    match target.rsplit_once('.') {
        Some((namespace, symbol)) if !namespace.is_empty() && !symbol.is_empty() => {
            Ok((namespace, symbol))
        }
        _ => Err(ImporterError::application(
            format!("Invalid target path: {:?}", target),
            "expected <namespace>.<symbol>",
        )),
    }
}

/// Replace every `.` with the wire separator and append a trailing one.
pub fn wire_path(target: &str) -> String {
    let mut path: String = target
        .chars()
        .map(|c| if c == '.' { RemoteConfig::PATH_SEPARATOR } else { c })
        .collect();
    path.push(RemoteConfig::PATH_SEPARATOR);
    path
}

/// First segment of a namespace path, used by the sandbox.
pub fn first_segment(namespace: &str) -> &str {
    namespace.split('.').next().unwrap_or(namespace)
}

/// Failure record produced by the remote exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteErrorEnvelope {
    #[serde(alias = "msg")]
    pub message: String,
    #[serde(default)]
    pub traceback: String,
}

impl From<RemoteErrorEnvelope> for ImporterError {
    fn from(envelope: RemoteErrorEnvelope) -> Self {
        ImporterError::remote(envelope.message, envelope.traceback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_path() {
        assert_eq!(wire_path("storage.Connection"), "storage/Connection/");
        assert_eq!(wire_path("os.path.join"), "os/path/join/");
    }

    #[test]
    fn test_split_target_on_final_dot() {
        assert_eq!(split_target("os.path.join").unwrap(), ("os.path", "join"));
        assert!(split_target("nodot").is_err());
        assert!(split_target(".leading").is_err());
        assert!(split_target("trailing.").is_err());
    }

    #[test]
    fn test_envelope_uses_legacy_wire_keys() {
        let mut kw = Kwargs::new();
        kw.insert("host".into(), json!("x"));
        let envelope = CallEnvelope::new(
            Operation::Instantiate,
            "storage",
            "Connection",
            vec![json!(1)],
            kw,
        )
        .with_variable("db");

        assert_eq!(
            envelope.to_value().unwrap(),
            json!({"type": "instantiate", "args": [1], "kw": {"host": "x"}, "variable": "db"})
        );
        assert_eq!(envelope.wire_path().unwrap(), "storage/Connection/");
    }

    #[test]
    fn test_variable_is_omitted_for_calls() {
        let envelope = CallEnvelope::new(Operation::Get, "os", "sep", vec![], Kwargs::new());
        assert_eq!(
            envelope.to_value().unwrap(),
            json!({"type": "get", "args": [], "kw": {}})
        );
    }

    #[test]
    fn test_first_segment() {
        assert_eq!(first_segment("alpha.sub"), "alpha");
        assert_eq!(first_segment("alpha"), "alpha");
    }

    #[test]
    fn test_remote_error_accepts_msg_alias() {
        let envelope: RemoteErrorEnvelope =
            serde_json::from_value(json!({"msg": "boom", "traceback": "tb"})).unwrap();
        let err = ImporterError::from(envelope);
        assert!(!err.is_local());
        assert_eq!(err.message(), "boom");
        assert_eq!(err.trace(), "tb");
    }
}
