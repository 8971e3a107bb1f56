//! Binary codecs: MessagePack and the Rust-native bincode format.
//!
//! `native` is tied to this implementation's own value layout and should only
//! be used between peers built from the same code. It is never the default.

use super::{Codec, CodecError};
use crate::protocol::Value;
use serde::{Deserialize, Serialize};

/// `application/x-msgpack`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackCodec;

impl Codec for MsgpackCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// `application/x-bincode`.
///
/// bincode is not self-describing, so values travel as a tagged mirror of
/// [`Value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

#[derive(Debug, Serialize, Deserialize)]
enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    List(Vec<NativeValue>),
    Map(Vec<(String, NativeValue)>),
}

impl From<&Value> for NativeValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => NativeValue::Null,
            Value::Bool(b) => NativeValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    NativeValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    NativeValue::UInt(u)
                } else {
                    NativeValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => NativeValue::Str(s.clone()),
            Value::Array(items) => NativeValue::List(items.iter().map(NativeValue::from).collect()),
            Value::Object(map) => NativeValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), NativeValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<NativeValue> for Value {
    type Error = CodecError;

    fn try_from(native: NativeValue) -> Result<Self, Self::Error> {
        Ok(match native {
            NativeValue::Null => Value::Null,
            NativeValue::Bool(b) => Value::Bool(b),
            NativeValue::Int(i) => Value::from(i),
            NativeValue::UInt(u) => Value::from(u),
            NativeValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| CodecError::Decode(format!("non-finite float {}", f)))?,
            NativeValue::Str(s) => Value::String(s),
            NativeValue::List(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            NativeValue::Map(entries) => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (key, item) in entries {
                    map.insert(key, Value::try_from(item)?);
                }
                Value::Object(map)
            }
        })
    }
}

impl Codec for NativeCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(&NativeValue::from(value)).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let native: NativeValue =
            bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
        Value::try_from(native)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "args": [1, -2, 18446744073709551615u64, 2.5, "text", true, null],
            "kw": {"nested": {"list": [[], {}]}},
        })
    }

    #[test]
    fn test_msgpack_round_trip() {
        let bytes = MsgpackCodec.encode(&sample()).unwrap();
        assert_eq!(MsgpackCodec.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_native_round_trip() {
        let bytes = NativeCodec.encode(&sample()).unwrap();
        assert_eq!(NativeCodec.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_binary_decode_errors() {
        assert!(matches!(
            NativeCodec.decode(b"\xff\xff\xff\xff"),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(
            MsgpackCodec.decode(b"\xc1"),
            Err(CodecError::Decode(_))
        ));
    }
}
