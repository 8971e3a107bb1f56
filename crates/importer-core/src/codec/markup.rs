//! Markup codecs. Registered so their names and content types resolve, but
//! neither format has an encoder or decoder yet.

use super::{Codec, CodecError};
use crate::protocol::Value;

fn unsupported(codec: &str, operation: &'static str) -> CodecError {
    CodecError::Unsupported {
        codec: codec.to_string(),
        operation,
    }
}

/// `text/xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn encode(&self, _value: &Value) -> Result<Vec<u8>, CodecError> {
        Err(unsupported("xml", "encode"))
    }

    fn decode(&self, _bytes: &[u8]) -> Result<Value, CodecError> {
        Err(unsupported("xml", "decode"))
    }

    fn is_structured(&self) -> bool {
        false
    }
}

/// `application/soap+xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoapCodec;

impl Codec for SoapCodec {
    fn encode(&self, _value: &Value) -> Result<Vec<u8>, CodecError> {
        Err(unsupported("soap", "encode"))
    }

    fn decode(&self, _bytes: &[u8]) -> Result<Value, CodecError> {
        Err(unsupported("soap", "decode"))
    }

    fn is_structured(&self) -> bool {
        false
    }
}
