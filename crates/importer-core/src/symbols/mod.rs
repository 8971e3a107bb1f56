//! Local symbol resolution.
//!
//! Rust has no runtime module import, so the embedding application registers
//! its namespaces with a [`Resolver`]. Everything else in the crate sees only
//! [`Namespace`] and [`Object`] handles:
//!
//! - a **namespace** is a shared, stateless table of functions, attributes and
//!   constructors, addressed by a dotted path;
//! - an **object** is a value constructed from a namespace (or from another
//!   object), exclusively owned by the scope registry.

mod registry;

pub use registry::{FnNamespace, NamespaceRegistry};

use crate::protocol::{Kwargs, Value};
use crate::{ImporterError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Error for a missing method, attribute or class.
pub fn no_attribute(owner: &str, name: &str) -> ImporterError {
    ImporterError::application(
        format!("'{}' has no attribute '{}'", owner, name),
        "",
    )
}

/// A resolved namespace.
pub trait Namespace: Send + Sync {
    /// Path the namespace was registered under, for diagnostics.
    fn name(&self) -> &str;

    fn call(&self, method: &str, _args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Err(no_attribute(self.name(), method))
    }

    fn get(&self, attr: &str) -> Result<Value> {
        Err(no_attribute(self.name(), attr))
    }

    fn construct(&self, class: &str, _args: &[Value], _kwargs: &Kwargs) -> Result<Box<dyn Object>> {
        Err(no_attribute(self.name(), class))
    }
}

/// An object handle held in scope.
pub trait Object: Send {
    /// Type name, for diagnostics.
    fn type_name(&self) -> &str;

    fn call(&mut self, method: &str, _args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Err(no_attribute(self.type_name(), method))
    }

    fn get(&self, attr: &str) -> Result<Value> {
        Err(no_attribute(self.type_name(), attr))
    }

    /// Construct a member object from this one (chained instantiation).
    fn construct(
        &mut self,
        class: &str,
        _args: &[Value],
        _kwargs: &Kwargs,
    ) -> Result<Box<dyn Object>> {
        Err(no_attribute(self.type_name(), class))
    }
}

/// Maps a dotted namespace path to a namespace handle.
pub trait Resolver: Send + Sync {
    fn resolve(&self, path: &str) -> Result<Arc<dyn Namespace>>;
}

/// Caching front of a [`Resolver`], with invocation helpers that attach the
/// failing target to local error traces.
///
/// Cached handles are process-local; they are never part of any encoded state.
pub struct SymbolResolver {
    resolver: Arc<dyn Resolver>,
    cache: HashMap<String, Arc<dyn Namespace>>,
}

impl SymbolResolver {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
        }
    }

    /// Look up and cache a namespace.
    pub fn resolve(&mut self, path: &str) -> Result<Arc<dyn Namespace>> {
        if let Some(namespace) = self.cache.get(path) {
            return Ok(namespace.clone());
        }
        debug!("Resolving namespace {}", path);
        let namespace = self
            .resolver
            .resolve(path)
            .map_err(|e| with_context(e, format!("resolving namespace {}", path)))?;
        self.cache.insert(path.to_string(), namespace.clone());
        Ok(namespace)
    }

    pub fn invoke(
        table: &dyn Namespace,
        method: &str,
        args: &[Value],
        kwargs: &Kwargs,
    ) -> Result<Value> {
        table
            .call(method, args, kwargs)
            .map_err(|e| with_context(e, format!("calling {}.{}", table.name(), method)))
    }

    pub fn read(table: &dyn Namespace, attr: &str) -> Result<Value> {
        table
            .get(attr)
            .map_err(|e| with_context(e, format!("reading {}.{}", table.name(), attr)))
    }

    pub fn is_cached(&self, path: &str) -> bool {
        self.cache.contains_key(path)
    }
}

/// Append a context line to the trace of a local application error. Other
/// error kinds pass through unchanged.
pub(crate) fn with_context(err: ImporterError, context: String) -> ImporterError {
    match err {
        ImporterError::Application {
            message,
            local: true,
            trace,
        } => {
            let trace = if trace.is_empty() {
                format!("while {}", context)
            } else {
                format!("{}\nwhile {}", trace, context)
            };
            ImporterError::Application {
                message,
                local: true,
                trace,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingResolver {
        lookups: AtomicUsize,
    }

    impl Resolver for CountingResolver {
        fn resolve(&self, path: &str) -> Result<Arc<dyn Namespace>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            match path {
                "math" => Ok(Arc::new(
                    FnNamespace::new("math")
                        .function("double", |args, _| {
                            Ok(json!(args.first().and_then(Value::as_i64).unwrap_or(0) * 2))
                        })
                        .attribute("ratio", json!(2.5)),
                )),
                other => Err(ImporterError::application(
                    format!("No module named '{}'", other),
                    "",
                )),
            }
        }
    }

    #[test]
    fn test_resolve_caches_namespaces() {
        let resolver = Arc::new(CountingResolver {
            lookups: AtomicUsize::new(0),
        });
        let mut symbols = SymbolResolver::new(resolver.clone());

        symbols.resolve("math").unwrap();
        symbols.resolve("math").unwrap();
        assert_eq!(resolver.lookups.load(Ordering::SeqCst), 1);
        assert!(symbols.is_cached("math"));
    }

    #[test]
    fn test_invoke_and_read() {
        let mut symbols = SymbolResolver::new(Arc::new(CountingResolver {
            lookups: AtomicUsize::new(0),
        }));
        let math = symbols.resolve("math").unwrap();

        let doubled = SymbolResolver::invoke(math.as_ref(), "double", &[json!(21)], &Kwargs::new());
        assert_eq!(doubled.unwrap(), json!(42));
        assert_eq!(SymbolResolver::read(math.as_ref(), "ratio").unwrap(), json!(2.5));
    }

    #[test]
    fn test_failures_carry_context() {
        let mut symbols = SymbolResolver::new(Arc::new(CountingResolver {
            lookups: AtomicUsize::new(0),
        }));

        let err = symbols.resolve("nope").err().unwrap();
        assert_eq!(err.message(), "No module named 'nope'");
        assert_eq!(err.trace(), "while resolving namespace nope");
        assert!(!symbols.is_cached("nope"));

        let math = symbols.resolve("math").unwrap();
        let err = SymbolResolver::read(math.as_ref(), "tau").unwrap_err();
        assert_eq!(err.message(), "'math' has no attribute 'tau'");
        assert_eq!(err.trace(), "while reading math.tau");
    }

    #[test]
    fn test_context_leaves_remote_errors_alone() {
        let err = with_context(ImporterError::remote("boom", "remote tb"), "x".into());
        assert_eq!(err.trace(), "remote tb");
    }
}
