//! HTTP session owned by one dispatcher.
//!
//! Wraps a blocking reqwest client with:
//! - The configured timeout applied to the whole exchange
//! - An optional cookie jar scoped to this session
//! - An optional client certificate for mutual TLS

use crate::config::{ImporterConfig, RemoteConfig};
use crate::{ImporterError, Result};
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// An open HTTP session to the remote exporter.
pub struct RemoteSession {
    client: Client,
    /// Present when sessions are enabled.
    jar: Option<Arc<Jar>>,
    /// Certificate presented for mutual TLS, if any.
    client_certificate: Option<PathBuf>,
    timeout: Duration,
}

impl RemoteSession {
    /// Build a client from the current options.
    pub fn open(config: &ImporterConfig) -> Result<Self> {
        let timeout = config.timeout_duration();
        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(RemoteConfig::USER_AGENT)
            .use_rustls_tls();

        let jar = if config.session {
            let jar = Arc::new(Jar::default());
            builder = builder.cookie_provider(jar.clone());
            Some(jar)
        } else {
            None
        };

        let client_certificate = match config.client_identity()? {
            Some((key, cert)) => {
                debug!("Using client certificate {}", cert.display());
                builder = builder.identity(load_identity(key, cert)?);
                Some(cert.to_path_buf())
            }
            None => None,
        };

        let client = builder.build().map_err(|e| {
            ImporterError::config(format!("Failed to create HTTP client: {}", e))
        })?;

        info!(
            "Opened remote session to {} (timeout {:?}, cookies {})",
            config.remote_endpoint().unwrap_or("<unset>"),
            timeout,
            if jar.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            client,
            jar,
            client_certificate,
            timeout,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn has_cookie_jar(&self) -> bool {
        self.jar.is_some()
    }

    /// Certificate chain attached to every connection, when mutual TLS is on.
    pub fn client_certificate(&self) -> Option<&Path> {
        self.client_certificate.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Read a PEM key and certificate chain into one client identity.
fn load_identity(key: &Path, cert: &Path) -> Result<reqwest::Identity> {
    let read = |path: &Path| {
        std::fs::read(path).map_err(|e| {
            ImporterError::config(format!("Failed to read {}: {}", path.display(), e))
        })
    };

    let mut pem = read(cert)?;
    pem.push(b'\n');
    pem.extend(read(key)?);

    reqwest::Identity::from_pem(&pem).map_err(|e| {
        ImporterError::config(format!(
            "Invalid client certificate {} / key {}: {}",
            cert.display(),
            key.display(),
            e
        ))
    })
}

/// Join the endpoint and a wire path with exactly one separator.
pub fn endpoint_url(endpoint: &str, wire_path: &str) -> String {
    format!(
        "{}{}{}",
        endpoint.trim_end_matches(RemoteConfig::PATH_SEPARATOR),
        RemoteConfig::PATH_SEPARATOR,
        wire_path.trim_start_matches(RemoteConfig::PATH_SEPARATOR)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("http://host/exporter/", "storage/Connection/"),
            "http://host/exporter/storage/Connection/"
        );
        assert_eq!(
            endpoint_url("http://host/exporter", "storage/Connection/"),
            "http://host/exporter/storage/Connection/"
        );
    }

    #[test]
    fn test_open_respects_session_flag() {
        let mut config = ImporterConfig::default();
        config.set("distant_url", json!("http://127.0.0.1:9/")).unwrap();
        config.set("timeout", json!(3)).unwrap();

        let session = RemoteSession::open(&config).unwrap();
        assert!(session.has_cookie_jar());
        assert_eq!(session.timeout(), Duration::from_secs(3));

        config.set("session", json!(false)).unwrap();
        assert!(!RemoteSession::open(&config).unwrap().has_cookie_jar());
    }

    fn tls_fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures/tls")
            .join(name)
    }

    fn open_with_identity(key: &str, cert: &str) -> Result<RemoteSession> {
        let mut config = ImporterConfig::default();
        config.set("distant_url", json!("https://127.0.0.1:9/")).unwrap();
        config.set("ssl_key", json!(tls_fixture(key))).unwrap();
        config.set("ssl_cert", json!(tls_fixture(cert))).unwrap();
        RemoteSession::open(&config)
    }

    #[test]
    fn test_pkcs8_client_identity_loads() {
        let session = open_with_identity("client-rsa.key", "client-rsa.pem").unwrap();
        assert_eq!(
            session.client_certificate(),
            Some(tls_fixture("client-rsa.pem").as_path())
        );
    }

    #[test]
    fn test_sec1_client_identity_loads() {
        let session = open_with_identity("client-ec.key", "client-ec.pem").unwrap();
        assert_eq!(
            session.client_certificate(),
            Some(tls_fixture("client-ec.pem").as_path())
        );
    }

    #[test]
    fn test_mismatched_fixture_order_is_rejected() {
        // Certificate where the key belongs.
        assert!(matches!(
            open_with_identity("client-rsa.pem", "client-rsa.pem"),
            Err(ImporterError::Config { .. })
        ));
    }

    #[test]
    fn test_plain_session_has_no_client_certificate() {
        let mut config = ImporterConfig::default();
        config.set("distant_url", json!("http://127.0.0.1:9/")).unwrap();
        assert!(RemoteSession::open(&config)
            .unwrap()
            .client_certificate()
            .is_none());
    }

    #[test]
    fn test_missing_tls_files_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ImporterConfig::default();
        config.set("distant_url", json!("https://127.0.0.1:9/")).unwrap();
        config
            .set("ssl_key", json!(dir.path().join("missing.key")))
            .unwrap();
        config
            .set("ssl_cert", json!(dir.path().join("missing.pem")))
            .unwrap();

        assert!(matches!(
            RemoteSession::open(&config),
            Err(ImporterError::Config { .. })
        ));
    }

    #[test]
    fn test_garbage_pem_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("client.key");
        let cert = dir.path().join("client.pem");
        std::fs::write(&key, "not a key").unwrap();
        std::fs::write(&cert, "not a cert").unwrap();

        let mut config = ImporterConfig::default();
        config.set("distant_url", json!("https://127.0.0.1:9/")).unwrap();
        config.set("ssl_key", json!(key)).unwrap();
        config.set("ssl_cert", json!(cert)).unwrap();

        assert!(matches!(
            RemoteSession::open(&config),
            Err(ImporterError::Config { .. })
        ));
    }
}
