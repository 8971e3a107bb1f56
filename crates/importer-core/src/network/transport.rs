//! Forwarding one envelope to the remote exporter.
//!
//! ```text
//! POST {endpoint}/{ns segments}/{symbol}/
//!   Content-Type: <codec>   Accept: <codec>   Accept-Encoding: gzip
//!   body: codec(envelope)
//!
//! 2xx      -> empty body: Null, otherwise codec.decode(body)
//! non-2xx  -> structured content type: remote error envelope
//!             anything else: local error from the status line
//! ```

use super::session::{endpoint_url, RemoteSession};
use crate::codec::{CodecEntry, CodecRegistry};
use crate::config::ImporterConfig;
use crate::error::source_chain;
use crate::protocol::{CallEnvelope, RemoteErrorEnvelope, Value};
use crate::{ImporterError, Result};
use flate2::read::GzDecoder;
use reqwest::header::{HeaderName, ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use std::io::Read;
use tracing::{debug, info, warn};

/// Longest slice of an unstructured error body kept in the trace.
const MAX_ERROR_TEXT: usize = 4096;

/// Remote execution backend.
///
/// The HTTP session is opened on the first request and kept until
/// [`reset`](Self::reset) so cookies persist across calls.
#[derive(Default)]
pub struct RemoteTransport {
    session: Option<RemoteSession>,
}

/// A response read to completion. The connection is released before this is
/// built.
struct RawResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl RemoteTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an HTTP session is currently open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Drop the session and its cookies. The next request opens a new one.
    pub fn reset(&mut self) {
        if self.session.take().is_some() {
            info!("Remote session closed");
        }
    }

    /// Send `envelope` and interpret the reply.
    pub fn perform(
        &mut self,
        config: &ImporterConfig,
        codecs: &CodecRegistry,
        envelope: &CallEnvelope,
    ) -> Result<Value> {
        let endpoint = config
            .remote_endpoint()
            .ok_or_else(|| ImporterError::config("No remote endpoint configured"))?;
        let url = endpoint_url(endpoint, &envelope.wire_path()?);

        let codec = codecs.resolve(&config.codec);
        if codec.name() != config.codec {
            warn!(
                "Codec {:?} is not registered, sending with {}",
                config.codec,
                codec.name()
            );
        }

        let body = codec.encode(&envelope.to_value()?).map_err(|e| {
            ImporterError::serialize(
                format!("Failed to encode {} request for {}", codec.name(), envelope.target_path),
                source_chain(&e),
            )
        })?;

        debug!(
            "POST {} ({} {}, {} bytes)",
            url,
            envelope.operation,
            codec.name(),
            body.len()
        );

        let session = self.session(config)?;
        let response = send(session, &url, codec, body)?;
        debug!("{} -> {}", url, response.status);

        interpret(codecs, codec, response)
    }

    fn session(&mut self, config: &ImporterConfig) -> Result<&RemoteSession> {
        let session = match self.session.take() {
            Some(session) => session,
            None => RemoteSession::open(config)?,
        };
        Ok(self.session.insert(session))
    }
}

/// POST the body and read the whole response, inflating gzip bodies.
fn send(session: &RemoteSession, url: &str, codec: &CodecEntry, body: Vec<u8>) -> Result<RawResponse> {
    let response = session
        .client()
        .post(url)
        .header(CONTENT_TYPE, codec.content_type())
        .header(ACCEPT, codec.content_type())
        .header(ACCEPT_ENCODING, "gzip")
        .body(body)
        .send()?;

    let status = response.status();
    let header = |name: HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let content_type = header(CONTENT_TYPE);
    let gzipped = header(CONTENT_ENCODING)
        .map(|encoding| encoding.eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);

    let raw = response.bytes()?.to_vec();
    let body = if gzipped && !raw.is_empty() {
        gunzip(&raw).map_err(|e| {
            ImporterError::deserialize("Failed to decompress gzip response", raw.clone(), e.to_string())
        })?
    } else {
        raw
    };

    Ok(RawResponse {
        status,
        content_type,
        body,
    })
}

fn gunzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}

fn interpret(codecs: &CodecRegistry, codec: &CodecEntry, response: RawResponse) -> Result<Value> {
    if response.status.is_success() {
        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        return codec.decode(&response.body).map_err(|e| {
            ImporterError::deserialize(
                format!("Failed to decode {} response", codec.name()),
                response.body,
                source_chain(&e),
            )
        });
    }

    let structured = response
        .content_type
        .as_deref()
        .and_then(|ct| codecs.resolve_content_type(ct))
        .filter(|entry| entry.is_structured());

    match structured {
        Some(entry) => {
            let envelope = entry
                .decode(&response.body)
                .map_err(|e| source_chain(&e))
                .and_then(|value| {
                    serde_json::from_value::<RemoteErrorEnvelope>(value).map_err(|e| e.to_string())
                });
            match envelope {
                Ok(envelope) => {
                    warn!("Remote error ({}): {}", response.status, envelope.message);
                    Err(envelope.into())
                }
                Err(cause) => Err(ImporterError::deserialize(
                    format!(
                        "Failed to decode {} error response ({})",
                        entry.name(),
                        response.status
                    ),
                    response.body,
                    cause,
                )),
            }
        }
        None => {
            warn!("HTTP error {} without a structured body", response.status);
            let text = String::from_utf8_lossy(&response.body);
            let text: String = text.chars().take(MAX_ERROR_TEXT).collect();
            Err(ImporterError::application(
                format!("HTTP {}", response.status),
                text,
            ))
        }
    }
}
