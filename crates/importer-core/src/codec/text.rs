//! Text codecs: the display-string fallback and JSON.

use super::{Codec, CodecError, DEFAULT_CODEC};
use crate::protocol::Value;

/// Renders any value as its display string. Strings are emitted bare, every
/// other value as its JSON text. Decoding is not supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl DefaultCodec {
    pub fn render(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Codec for DefaultCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(Self::render(value).into_bytes())
    }

    fn decode(&self, _bytes: &[u8]) -> Result<Value, CodecError> {
        Err(CodecError::Unsupported {
            codec: DEFAULT_CODEC.to_string(),
            operation: "decode",
        })
    }

    fn is_structured(&self) -> bool {
        false
    }
}

/// `application/json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
