//! Wire codecs and the registry that looks them up.
//!
//! A codec is an encode/decode pair over [`Value`] plus the content type it
//! declares on the wire. The content type doubles as the HTTP negotiation value
//! and as a lookup key, so the transport can pick a decoder from a response
//! header alone.
//!
//! Lookup by name never fails: unknown names fall back to the `default` codec,
//! which renders values as text and cannot decode anything.

mod binary;
mod markup;
mod text;

pub use binary::{MsgpackCodec, NativeCodec};
pub use markup::{SoapCodec, XmlCodec};
pub use text::{DefaultCodec, JsonCodec};

use crate::protocol::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Name of the fallback codec.
pub const DEFAULT_CODEC: &str = "default";

/// Older name for the native binary codec, still accepted in option files.
/// Encodes with bincode under its own content type; it is not wire compatible
/// with other runtimes' object serializers.
pub const LEGACY_NATIVE_CODEC: &str = "pickle";

/// Failure inside a codec body.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("codec {codec} does not support {operation}")]
    Unsupported {
        codec: String,
        operation: &'static str,
    },

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// An encode/decode pair.
pub trait Codec: Send + Sync {
    /// Serialize a value into a request or response body.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    /// Parse a body back into a value.
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;

    /// Whether payloads in this format carry structured data that `decode`
    /// understands. Text renderings and unimplemented formats do not.
    fn is_structured(&self) -> bool {
        true
    }
}

type EncodeFn = dyn Fn(&Value) -> Result<Vec<u8>, CodecError> + Send + Sync;
type DecodeFn = dyn Fn(&[u8]) -> Result<Value, CodecError> + Send + Sync;

/// Codec assembled from a pair of closures.
struct FnCodec {
    encode: Box<EncodeFn>,
    decode: Box<DecodeFn>,
}

impl Codec for FnCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        (self.encode)(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        (self.decode)(bytes)
    }
}

/// A registered codec with its name and content type.
#[derive(Clone)]
pub struct CodecEntry {
    name: String,
    content_type: String,
    codec: Arc<dyn Codec>,
}

impl CodecEntry {
    /// Pair a codec with its registry name and wire content type.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            codec,
        }
    }

    /// Registry name, e.g. `json`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value sent as `Content-Type` and `Accept`.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// See [`Codec::is_structured`].
    pub fn is_structured(&self) -> bool {
        self.codec.is_structured()
    }

    /// Encode a value for the wire.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        self.codec.encode(value)
    }

    /// Decode a wire payload.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        self.codec.decode(bytes)
    }
}

impl fmt::Debug for CodecEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecEntry")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Named codec lookup table.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, CodecEntry>,
    fallback: CodecEntry,
}

impl CodecRegistry {
    /// A registry holding only the `default` text codec.
    pub fn empty() -> Self {
        let fallback = CodecEntry::new(DEFAULT_CODEC, "text/plain", Arc::new(DefaultCodec));
        let mut codecs = HashMap::new();
        codecs.insert(DEFAULT_CODEC.to_string(), fallback.clone());
        Self { codecs, fallback }
    }

    /// A registry with every shipped codec.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register_codec(CodecEntry::new("xml", "text/xml", Arc::new(XmlCodec)));
        registry.register_codec(CodecEntry::new(
            "soap",
            "application/soap+xml",
            Arc::new(SoapCodec),
        ));
        registry.register_codec(CodecEntry::new(
            "json",
            "application/json",
            Arc::new(JsonCodec),
        ));
        registry.register_codec(CodecEntry::new(
            "native",
            "application/x-bincode",
            Arc::new(NativeCodec),
        ));
        registry.register_codec(CodecEntry::new(
            LEGACY_NATIVE_CODEC,
            "application/pickle",
            Arc::new(NativeCodec),
        ));
        registry.register_codec(CodecEntry::new(
            "msgpack",
            "application/x-msgpack",
            Arc::new(MsgpackCodec),
        ));
        registry
    }

    /// Register a codec from an encode/decode closure pair.
    ///
    /// Registering an existing name replaces it. Replacing `default` also
    /// replaces the fallback.
    pub fn register<E, D>(
        &mut self,
        name: impl Into<String>,
        content_type: impl Into<String>,
        encode: E,
        decode: D,
    ) where
        E: Fn(&Value) -> Result<Vec<u8>, CodecError> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Result<Value, CodecError> + Send + Sync + 'static,
    {
        let codec = FnCodec {
            encode: Box::new(encode),
            decode: Box::new(decode),
        };
        self.register_codec(CodecEntry::new(name, content_type, Arc::new(codec)));
    }

    /// Register a prepared entry, with the same replacement rules as
    /// [`register`](Self::register).
    pub fn register_codec(&mut self, entry: CodecEntry) {
        debug!("Registering codec {} ({})", entry.name, entry.content_type);
        if entry.name == DEFAULT_CODEC {
            self.fallback = entry.clone();
        }
        self.codecs.insert(entry.name.clone(), entry);
    }

    /// Look up a codec by name, falling back to `default`.
    pub fn resolve(&self, name: &str) -> &CodecEntry {
        match self.codecs.get(name) {
            Some(entry) => entry,
            None => {
                debug!("Unknown codec {:?}, using {}", name, DEFAULT_CODEC);
                &self.fallback
            }
        }
    }

    /// Look up a codec by a `Content-Type` header value. Parameters such as
    /// `charset` are ignored.
    pub fn resolve_content_type(&self, content_type: &str) -> Option<&CodecEntry> {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        self.codecs
            .values()
            .find(|entry| entry.content_type.eq_ignore_ascii_case(essence))
    }

    /// Whether `name` is registered (without falling back).
    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
