//! Builder for configuring Importer initialization.

use crate::codec::CodecRegistry;
use crate::config::ImporterConfig;
use crate::symbols::{NamespaceRegistry, Resolver};
use crate::{Importer, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Builder for configuring Importer initialization.
///
/// # Example
///
/// ```rust,ignore
/// use importer_core::Importer;
///
/// let importer = Importer::builder()
///     .remote_endpoint("https://exporter.internal/rpc/")
///     .client_identity("client.key", "client.pem")
///     .codec("msgpack")
///     .build()?;
/// ```
pub struct ImporterBuilder {
    config: ImporterConfig,
    resolver: Option<Arc<dyn Resolver>>,
    codecs: CodecRegistry,
}

impl ImporterBuilder {
    /// Create a builder with default options and every shipped codec.
    pub fn new() -> Self {
        Self {
            config: ImporterConfig::default(),
            resolver: None,
            codecs: CodecRegistry::with_defaults(),
        }
    }

    /// Start from a JSON options file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new().config(ImporterConfig::from_path(path)?))
    }

    /// Replace all options.
    pub fn config(mut self, config: ImporterConfig) -> Self {
        self.config = config;
        self
    }

    /// Forward every operation to this exporter URL.
    pub fn remote_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.distant_url = Some(url.into());
        self
    }

    /// Keep cookies across remote calls.
    ///
    /// Default: `true`
    pub fn session(mut self, enable: bool) -> Self {
        self.config.session = enable;
        self
    }

    /// PEM key and certificate presented for mutual TLS.
    pub fn client_identity(mut self, key: impl Into<PathBuf>, cert: impl Into<PathBuf>) -> Self {
        self.config.ssl_key = Some(key.into());
        self.config.ssl_cert = Some(cert.into());
        self
    }

    /// Network timeout for one remote exchange, in seconds.
    ///
    /// Default: 30
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout = seconds;
        self
    }

    /// Wire codec for remote calls.
    ///
    /// Default: `json`
    pub fn codec(mut self, name: impl Into<String>) -> Self {
        self.config.codec = name.into();
        self
    }

    /// Top-level namespace allow-list for local resolution.
    pub fn bound<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bound: BTreeSet<String> = namespaces.into_iter().map(Into::into).collect();
        self.config.bound = if bound.is_empty() { None } else { Some(bound) };
        self
    }

    /// Resolver used for local namespaces.
    pub fn resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Shortcut for [`resolver`](Self::resolver) with an in-process table.
    pub fn namespaces(self, namespaces: NamespaceRegistry) -> Self {
        self.resolver(Arc::new(namespaces))
    }

    /// Replace the codec table.
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Build the Importer instance.
    pub fn build(self) -> Result<Importer> {
        self.config.validate()?;
        self.config.client_identity()?;

        let resolver: Arc<dyn Resolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(NamespaceRegistry::new()),
        };

        info!(
            "Importer ready ({} mode, codec {})",
            if self.config.is_remote() { "remote" } else { "local" },
            self.config.codec
        );
        Ok(Importer::from_parts(self.config, self.codecs, resolver))
    }
}

impl Default for ImporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
