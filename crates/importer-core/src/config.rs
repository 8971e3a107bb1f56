//! Configuration for an importer instance.
//!
//! This module provides the default constants for the remote transport and the
//! option set read by the dispatcher. Options are typed, but can also be read
//! and written by key, which is how callers toggle remote mode or the sandbox.

use crate::{ImporterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Remote transport defaults.
pub struct RemoteConfig;

impl RemoteConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_CODEC: &'static str = "json";
    pub const USER_AGENT: &'static str = concat!("importer/", env!("CARGO_PKG_VERSION"));
    /// Separator used on the wire in place of `.` in target paths.
    pub const PATH_SEPARATOR: char = '/';
}

/// Options recognized by the dispatcher.
///
/// Field names are the wire/accessor keys; the long descriptive names are
/// accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImporterConfig {
    /// Remote exporter base URL. When set, every operation is forwarded.
    #[serde(alias = "remote_endpoint")]
    pub distant_url: Option<String>,
    /// Keep a cookie jar across remote calls.
    #[serde(alias = "session_enabled")]
    pub session: bool,
    /// PEM private key for mutual TLS.
    #[serde(alias = "tls_client_key")]
    pub ssl_key: Option<PathBuf>,
    /// PEM certificate chain for mutual TLS.
    #[serde(alias = "tls_client_cert")]
    pub ssl_cert: Option<PathBuf>,
    /// Network timeout for one remote exchange, in seconds.
    #[serde(alias = "timeout_seconds")]
    pub timeout: u64,
    /// Allow-list of top-level namespace segments. Empty or absent allows all.
    #[serde(alias = "allowed_namespaces")]
    pub bound: Option<BTreeSet<String>>,
    /// Name of the wire codec used for remote calls.
    pub codec: String,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            distant_url: None,
            session: true,
            ssl_key: None,
            ssl_cert: None,
            timeout: RemoteConfig::DEFAULT_TIMEOUT_SECS,
            bound: None,
            codec: RemoteConfig::DEFAULT_CODEC.to_string(),
        }
    }
}

impl ImporterConfig {
    /// Accessor keys, canonical spelling.
    pub const KEYS: [&'static str; 7] = [
        "distant_url",
        "session",
        "ssl_key",
        "ssl_cert",
        "timeout",
        "bound",
        "codec",
    ];

    /// Load options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ImporterError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            ImporterError::config(format!("Invalid config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.distant_url {
            let url = url::Url::parse(endpoint).map_err(|e| {
                ImporterError::config(format!("Invalid distant_url {:?}: {}", endpoint, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ImporterError::config(format!(
                    "Unsupported distant_url scheme: {}",
                    url.scheme()
                )));
            }
        }
        if self.timeout == 0 {
            return Err(ImporterError::config("timeout must be at least one second"));
        }
        Ok(())
    }

    /// Remote endpoint, if remote mode is configured.
    pub fn remote_endpoint(&self) -> Option<&str> {
        self.distant_url.as_deref()
    }

    pub fn is_remote(&self) -> bool {
        self.distant_url.is_some()
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Key and certificate paths, when mutual TLS is configured.
    /// Fails when only one half of the pair is set.
    pub fn client_identity(&self) -> Result<Option<(&Path, &Path)>> {
        match (&self.ssl_key, &self.ssl_cert) {
            (Some(key), Some(cert)) => Ok(Some((key.as_path(), cert.as_path()))),
            (None, None) => Ok(None),
            _ => Err(ImporterError::config(
                "ssl_key and ssl_cert must be configured together",
            )),
        }
    }

    /// Whether a top-level namespace segment passes the allow-list.
    pub fn allows(&self, segment: &str) -> bool {
        match &self.bound {
            Some(bound) if !bound.is_empty() => bound.contains(segment),
            _ => true,
        }
    }

    /// Read an option by key. Unset options read as `None`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let key = canonical_key(key)?;
        let doc = serde_json::to_value(self).ok()?;
        doc.get(key).filter(|v| !v.is_null()).cloned()
    }

    /// Write an option by key. The whole config is re-validated; on error it is
    /// left untouched.
    pub fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        let canonical = canonical_key(key)
            .ok_or_else(|| ImporterError::config(format!("Unknown option: {}", key)))?;

        let mut doc = serde_json::to_value(&*self)
            .map_err(|e| ImporterError::config(format!("Failed to encode options: {}", e)))?;
        if let Some(map) = doc.as_object_mut() {
            map.insert(canonical.to_string(), value);
        }

        let updated: Self = serde_json::from_value(doc).map_err(|e| {
            ImporterError::config(format!("Invalid value for {}: {}", canonical, e))
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reset an option to its default.
    pub fn remove(&mut self, key: &str) -> Result<()> {
        let canonical = canonical_key(key)
            .ok_or_else(|| ImporterError::config(format!("Unknown option: {}", key)))?;
        let default = serde_json::to_value(Self::default())
            .map_err(|e| ImporterError::config(format!("Failed to encode options: {}", e)))?;
        let value = default
            .get(canonical)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        self.set(canonical, value)
    }
}

/// Map an accessor key or one of its aliases to the canonical key.
fn canonical_key(key: &str) -> Option<&'static str> {
    let canonical = match key {
        "remote_endpoint" => "distant_url",
        "session_enabled" => "session",
        "tls_client_key" => "ssl_key",
        "tls_client_cert" => "ssl_cert",
        "timeout_seconds" => "timeout",
        "allowed_namespaces" => "bound",
        other => other,
    };
    ImporterConfig::KEYS.iter().copied().find(|k| *k == canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ImporterConfig::default();
        assert!(!config.is_remote());
        assert!(config.session);
        assert_eq!(config.timeout_duration(), Duration::from_secs(30));
        assert_eq!(config.codec, "json");
        assert!(config.allows("anything"));
    }

    #[test]
    fn test_set_get_remove_by_key() {
        let mut config = ImporterConfig::default();
        assert_eq!(config.get("distant_url"), None);

        config
            .set("distant_url", json!("http://localhost:8000/exporter/"))
            .unwrap();
        assert!(config.is_remote());
        assert_eq!(
            config.get("remote_endpoint"),
            Some(json!("http://localhost:8000/exporter/"))
        );

        config.remove("distant_url").unwrap();
        assert!(!config.is_remote());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut config = ImporterConfig::default();
        assert!(matches!(
            config.set("distant", json!("http://x/")),
            Err(ImporterError::Config { .. })
        ));
        assert_eq!(config.get("distant"), None);
    }

    #[test]
    fn test_invalid_value_leaves_config_untouched() {
        let mut config = ImporterConfig::default();
        assert!(config.set("distant_url", json!("not a url")).is_err());
        assert!(config.set("distant_url", json!("ftp://host/")).is_err());
        assert!(config.set("timeout", json!("soon")).is_err());
        assert!(config.set("timeout", json!(0)).is_err());
        assert_eq!(config, ImporterConfig::default());
    }

    #[test]
    fn test_tls_pair_must_be_complete() {
        let mut config = ImporterConfig::default();
        assert!(matches!(config.client_identity(), Ok(None)));

        config.set("ssl_key", json!("/tmp/key.pem")).unwrap();
        assert!(config.client_identity().is_err());

        config.set("ssl_cert", json!("/tmp/cert.pem")).unwrap();
        let (key, cert) = config.client_identity().unwrap().unwrap();
        assert_eq!(key, Path::new("/tmp/key.pem"));
        assert_eq!(cert, Path::new("/tmp/cert.pem"));
    }

    #[test]
    fn test_bound_allow_list() {
        let mut config = ImporterConfig::default();
        config.set("bound", json!(["alpha"])).unwrap();
        assert!(config.allows("alpha"));
        assert!(!config.allows("beta"));

        config.set("bound", json!([])).unwrap();
        assert!(config.allows("beta"));
    }

    #[test]
    fn test_from_path_accepts_aliases() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"remote_endpoint": "https://example.org/rpc/", "timeout_seconds": 5,
                "allowed_namespaces": ["os"], "codec": "msgpack"}}"#
        )
        .unwrap();

        let config = ImporterConfig::from_path(file.path()).unwrap();
        assert_eq!(config.remote_endpoint(), Some("https://example.org/rpc/"));
        assert_eq!(config.timeout, 5);
        assert_eq!(config.codec, "msgpack");
        assert!(!config.allows("sys"));
    }

    #[test]
    fn test_from_path_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"distant": "https://example.org/"}}"#).unwrap();
        assert!(ImporterConfig::from_path(file.path()).is_err());
    }
}
