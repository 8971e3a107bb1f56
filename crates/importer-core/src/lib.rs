//! Importer Core - transparent remote invocation of namespaced symbols.
//!
//! An [`Importer`] lets a caller invoke a function, read an attribute or
//! construct an object identified by a dotted namespace path, without caring
//! whether the symbol lives in this process or behind a remote exporter
//! reached over HTTP.
//!
//! Internally an `Importer` runs in one of two modes, chosen by configuration:
//! - **Local**: namespaces are resolved through the application's
//!   [`Resolver`], constructed objects are kept in a [`ScopeRegistry`], and
//!   the optional `bound` allow-list sandboxes which namespaces may be touched.
//! - **Remote**: every operation is encoded as a [`CallEnvelope`] and POSTed to
//!   the configured `distant_url`; the reply is decoded with the same codec.
//!
//! The public API is identical in both modes.
//!
//! # Example
//!
//! ```rust,ignore
//! use importer_core::{FnNamespace, Importer, Kwargs, NamespaceRegistry};
//! use serde_json::json;
//!
//! let namespaces = NamespaceRegistry::new().with(
//!     FnNamespace::new("math").function("add", |args, _| {
//!         let sum: i64 = args.iter().filter_map(|v| v.as_i64()).sum();
//!         Ok(json!(sum))
//!     }),
//! );
//!
//! let mut importer = Importer::builder().namespaces(namespaces).build()?;
//! assert_eq!(importer.call("math", "add", &[json!(2), json!(3)], &Kwargs::new())?, json!(5));
//!
//! // Same call, executed by a remote exporter.
//! importer.config_set("distant_url", json!("http://exporter.local/"))?;
//! let five = importer.call("math", "add", &[json!(2), json!(3)], &Kwargs::new())?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod scope;
pub mod symbols;

mod api;

pub use codec::{Codec, CodecEntry, CodecError, CodecRegistry};
pub use config::{ImporterConfig, RemoteConfig};
pub use error::{ImporterError, Result};
pub use protocol::{CallEnvelope, Kwargs, Operation, RemoteErrorEnvelope, Value};
pub use scope::{Owner, ScopeEntry, ScopeRegistry};
pub use symbols::{FnNamespace, Namespace, NamespaceRegistry, Object, Resolver, SymbolResolver};

pub use api::ImporterBuilder;

use network::RemoteTransport;
use std::sync::Arc;

/// Dispatcher for call, get and instantiate.
///
/// Not safe for concurrent use: the scope map and the HTTP session are
/// mutated in place, hence `&mut self` on every operation. Independent
/// instances share nothing.
pub struct Importer {
    config: ImporterConfig,
    codecs: CodecRegistry,
    /// Local mode state.
    scope: ScopeRegistry,
    /// Remote mode state. The session inside is opened lazily.
    transport: RemoteTransport,
}

/// Execution mode, derived from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Local,
    Remote,
}

impl Importer {
    /// Local importer with default options over `resolver`.
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self::from_parts(ImporterConfig::default(), CodecRegistry::with_defaults(), resolver)
    }

    /// Create a builder for Importer.
    pub fn builder() -> ImporterBuilder {
        ImporterBuilder::new()
    }

    pub(crate) fn from_parts(
        config: ImporterConfig,
        codecs: CodecRegistry,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            config,
            codecs,
            scope: ScopeRegistry::new(SymbolResolver::new(resolver)),
            transport: RemoteTransport::new(),
        }
    }

    fn mode(&self) -> Mode {
        if self.config.is_remote() {
            Mode::Remote
        } else {
            Mode::Local
        }
    }

    /// Returns true if operations are forwarded to a remote exporter.
    pub fn is_remote(&self) -> bool {
        self.mode() == Mode::Remote
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Mutable codec table, for registering application codecs.
    pub fn codecs_mut(&mut self) -> &mut CodecRegistry {
        &mut self.codecs
    }

    /// Objects constructed by local `instantiate` calls.
    pub fn scope(&self) -> &ScopeRegistry {
        &self.scope
    }

    /// Whether a remote HTTP session is currently open.
    pub fn has_session(&self) -> bool {
        self.transport.is_open()
    }
}

impl std::fmt::Debug for Importer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Importer")
            .field("mode", &self.mode())
            .field("config", &self.config)
            .field("scope", &self.scope)
            .finish()
    }
}
