//! Key-based option access on the importer.
//!
//! Changing any option the HTTP session was built from (endpoint, cookies,
//! TLS material, timeout) closes the session; the next remote call opens a new
//! one with the new values.

use crate::config::ImporterConfig;
use crate::{Importer, Result, Value};
use std::collections::BTreeSet;
use tracing::debug;

impl Importer {
    /// Read an option by key or alias.
    pub fn config_get(&self, key: &str) -> Option<Value> {
        self.config.get(key)
    }

    /// Set an option by key or alias.
    pub fn config_set(&mut self, key: &str, value: Value) -> Result<()> {
        let before = self.config.clone();
        self.config.set(key, value)?;
        self.after_change(&before);
        Ok(())
    }

    /// Reset an option to its default.
    pub fn config_remove(&mut self, key: &str) -> Result<()> {
        let before = self.config.clone();
        self.config.remove(key)?;
        self.after_change(&before);
        Ok(())
    }

    /// Restrict local namespace resolution to the given top-level segments.
    /// An empty list lifts the restriction.
    pub fn bound<I, S>(&mut self, namespaces: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bound: BTreeSet<String> = namespaces.into_iter().map(Into::into).collect();
        debug!("Namespace allow-list: {:?}", bound);
        self.config.bound = if bound.is_empty() { None } else { Some(bound) };
    }

    fn after_change(&mut self, before: &ImporterConfig) {
        if session_changed(before, &self.config) {
            self.transport.reset();
        }
    }
}

fn session_changed(before: &ImporterConfig, after: &ImporterConfig) -> bool {
    before.distant_url != after.distant_url
        || before.session != after.session
        || before.ssl_key != after.ssl_key
        || before.ssl_cert != after.ssl_cert
        || before.timeout != after.timeout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::NamespaceRegistry;
    use crate::ImporterError;
    use serde_json::json;
    use std::sync::Arc;

    fn importer() -> Importer {
        Importer::new(Arc::new(NamespaceRegistry::new()))
    }

    #[test]
    fn test_config_set_switches_mode() {
        let mut importer = importer();
        assert!(!importer.is_remote());

        importer
            .config_set("remote_endpoint", json!("http://127.0.0.1:9/exporter/"))
            .unwrap();
        assert!(importer.is_remote());
        assert_eq!(
            importer.config_get("distant_url"),
            Some(json!("http://127.0.0.1:9/exporter/"))
        );

        importer.config_remove("distant_url").unwrap();
        assert!(!importer.is_remote());
        assert_eq!(importer.config_get("distant_url"), None);
    }

    #[test]
    fn test_invalid_values_leave_config_untouched() {
        let mut importer = importer();
        let err = importer.config_set("distant_url", json!("ftp://x")).unwrap_err();
        assert!(matches!(err, ImporterError::Config { .. }));
        assert!(!importer.is_remote());

        assert!(importer.config_set("no_such_option", json!(1)).is_err());
        assert!(importer.config_set("timeout", json!("soon")).is_err());
        assert_eq!(importer.config_get("timeout"), Some(json!(30)));
    }

    #[test]
    fn test_bound_round_trips_through_accessor() {
        let mut importer = importer();
        importer.bound(["beta", "alpha"]);
        assert_eq!(importer.config_get("bound"), Some(json!(["alpha", "beta"])));

        importer.bound(Vec::<&str>::new());
        assert_eq!(importer.config_get("bound"), None);
    }

    #[test]
    fn test_session_changed() {
        let before = ImporterConfig::default();
        let mut after = before.clone();
        after.codec = "msgpack".into();
        assert!(!session_changed(&before, &after));

        after.timeout = 5;
        assert!(session_changed(&before, &after));
    }
}
