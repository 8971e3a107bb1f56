//! Error types for the importer.
//!
//! Every failure, whether it happened in this process or on the remote
//! exporter, surfaces as one [`ImporterError`]. Application errors carry an
//! origin flag so callers can tell a remote exception apart from a local one.

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for importer operations.
#[derive(Debug, Error)]
pub enum ImporterError {
    /// A resolved symbol failed, or the remote exporter reported an exception.
    #[error("{message}")]
    Application {
        message: String,
        /// `false` only when decoded from a well-formed remote error envelope.
        local: bool,
        /// Diagnostic trace, verbatim from the remote side when `local` is false.
        trace: String,
    },

    /// Encoding a value failed before anything was transmitted.
    #[error("Serialization failed: {message}")]
    Serialize { message: String, trace: String },

    /// Decoding a received payload failed.
    #[error("Deserialization failed: {message}")]
    Deserialize {
        message: String,
        /// The raw bytes that could not be decoded.
        payload: Vec<u8>,
        trace: String,
    },

    /// The remote exporter was unreachable (DNS, refused connection, timeout).
    #[error("Connection to remote exporter failed: {message}")]
    Connect { message: String, trace: String },

    /// The first namespace segment is not on the allow-list.
    #[error("Module {namespace} out of bounds")]
    OutOfBounds { namespace: String },

    /// An option value is invalid or the option key is unknown.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for importer operations.
pub type Result<T> = std::result::Result<T, ImporterError>;

impl ImporterError {
    /// Local application error with a diagnostic trace.
    pub fn application(message: impl AsRef<str>, trace: impl AsRef<str>) -> Self {
        ImporterError::Application {
            message: message.as_ref().trim().to_string(),
            local: true,
            trace: trace.as_ref().trim().to_string(),
        }
    }

    /// Application error decoded from a remote error envelope.
    pub fn remote(message: impl AsRef<str>, trace: impl AsRef<str>) -> Self {
        ImporterError::Application {
            message: message.as_ref().trim().to_string(),
            local: false,
            trace: trace.as_ref().trim().to_string(),
        }
    }

    /// Encoding failed before anything was sent.
    pub fn serialize(message: impl AsRef<str>, trace: impl AsRef<str>) -> Self {
        ImporterError::Serialize {
            message: message.as_ref().trim().to_string(),
            trace: trace.as_ref().trim().to_string(),
        }
    }

    /// A received payload could not be decoded. Keeps the raw bytes.
    pub fn deserialize(
        message: impl AsRef<str>,
        payload: impl Into<Vec<u8>>,
        trace: impl AsRef<str>,
    ) -> Self {
        ImporterError::Deserialize {
            message: message.as_ref().trim().to_string(),
            payload: payload.into(),
            trace: trace.as_ref().trim().to_string(),
        }
    }

    /// The exporter could not be reached or did not answer in time.
    pub fn connect(message: impl AsRef<str>, trace: impl AsRef<str>) -> Self {
        ImporterError::Connect {
            message: message.as_ref().trim().to_string(),
            trace: trace.as_ref().trim().to_string(),
        }
    }

    /// Invalid option value, unknown option key, or unusable TLS material.
    pub fn config(message: impl Into<String>) -> Self {
        ImporterError::Config {
            message: message.into(),
        }
    }

    /// The failure message. Always set.
    pub fn message(&self) -> Cow<'_, str> {
        match self {
            ImporterError::Application { message, .. }
            | ImporterError::Serialize { message, .. }
            | ImporterError::Deserialize { message, .. }
            | ImporterError::Connect { message, .. }
            | ImporterError::Config { message } => Cow::Borrowed(message.as_str()),
            ImporterError::OutOfBounds { .. } => Cow::Owned(self.to_string()),
        }
    }

    /// Whether the failure originated in this process.
    pub fn is_local(&self) -> bool {
        match self {
            ImporterError::Application { local, .. } => *local,
            _ => true,
        }
    }

    /// Free-form diagnostic text; may be empty.
    pub fn trace(&self) -> &str {
        match self {
            ImporterError::Application { trace, .. }
            | ImporterError::Serialize { trace, .. }
            | ImporterError::Deserialize { trace, .. }
            | ImporterError::Connect { trace, .. } => trace,
            ImporterError::OutOfBounds { .. } | ImporterError::Config { .. } => "",
        }
    }

    /// Raw undecodable bytes of a deserialize failure.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            ImporterError::Deserialize { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Human-readable report: the trace when present, otherwise the message.
    pub fn report(&self) -> Cow<'_, str> {
        if self.trace().is_empty() {
            self.message()
        } else {
            Cow::Borrowed(self.trace())
        }
    }
}

impl From<reqwest::Error> for ImporterError {
    fn from(err: reqwest::Error) -> Self {
        let trace = source_chain(&err);
        if err.is_builder() {
            return ImporterError::config(format!("Failed to build HTTP request: {}", err));
        }
        if err.is_timeout() {
            return ImporterError::connect(format!("Request timed out: {}", err), trace);
        }
        ImporterError::connect(err.to_string(), trace)
    }
}

/// Format an error and its `source()` chain, one cause per line.
pub(crate) fn source_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        current = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ImporterError::OutOfBounds {
            namespace: "beta".into(),
        };
        assert_eq!(err.to_string(), "Module beta out of bounds");
        assert_eq!(err.message(), "Module beta out of bounds");
    }

    #[test]
    fn test_remote_errors_are_not_local() {
        let err = ImporterError::remote("boom", "Traceback: line 1");
        assert!(!err.is_local());
        assert_eq!(err.message(), "boom");
        assert_eq!(err.trace(), "Traceback: line 1");

        assert!(ImporterError::application("boom", "").is_local());
        assert!(ImporterError::connect("refused", "").is_local());
    }

    #[test]
    fn test_message_and_trace_are_trimmed() {
        let err = ImporterError::application("  spaced out \n", "\n trace \n");
        assert_eq!(err.message(), "spaced out");
        assert_eq!(err.trace(), "trace");
    }

    #[test]
    fn test_deserialize_keeps_payload() {
        let err = ImporterError::deserialize("bad", b"\x00\x01".to_vec(), "");
        assert_eq!(err.payload(), Some(&b"\x00\x01"[..]));
        assert!(ImporterError::serialize("bad", "").payload().is_none());
    }

    #[test]
    fn test_report_prefers_trace() {
        assert_eq!(ImporterError::application("msg", "").report(), "msg");
        assert_eq!(ImporterError::application("msg", "tb").report(), "tb");
    }
}
