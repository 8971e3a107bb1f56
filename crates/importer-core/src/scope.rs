//! Scope registry: named object handles created by `instantiate`.
//!
//! Lookups always try scope first, so `call("db", "ping")` reaches the object
//! stored as `db` rather than a namespace called `db`. Only when the name is
//! not in scope is a fresh namespace resolved, and only if its first segment
//! passes the sandbox allow-list.

use crate::config::ImporterConfig;
use crate::protocol::{first_segment, Kwargs, Value};
use crate::symbols::{with_context, Namespace, Object, SymbolResolver};
use crate::{ImporterError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a scope entry was constructed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Namespace(String),
    /// Chained instantiation: member of another scope entry.
    Variable(String),
}

/// A named object handle.
pub struct ScopeEntry {
    variable_name: String,
    owner: Owner,
    class_name: String,
    handle: Box<dyn Object>,
}

impl ScopeEntry {
    pub fn variable_name(&self) -> &str {
        &self.variable_name
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

impl fmt::Debug for ScopeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeEntry")
            .field("variable_name", &self.variable_name)
            .field("owner", &self.owner)
            .field("class_name", &self.class_name)
            .field("type_name", &self.handle.type_name())
            .finish()
    }
}

/// Named handles plus the resolver used for names not in scope.
pub struct ScopeRegistry {
    entries: HashMap<String, ScopeEntry>,
    symbols: SymbolResolver,
}

impl ScopeRegistry {
    pub fn new(symbols: SymbolResolver) -> Self {
        Self {
            entries: HashMap::new(),
            symbols,
        }
    }

    /// Construct `owner.class(args, kwargs)` and store it as `variable`.
    ///
    /// Idempotent: an existing `variable` is left as is and the constructor is
    /// not run again. When `owner` is itself a scope variable the new object is
    /// built from that handle instead of from a namespace.
    pub fn instantiate(
        &mut self,
        config: &ImporterConfig,
        variable: &str,
        owner: &str,
        class: &str,
        args: &[Value],
        kwargs: &Kwargs,
    ) -> Result<()> {
        if self.entries.contains_key(variable) {
            debug!("{} already in scope, skipping instantiate", variable);
            return Ok(());
        }

        let (handle, owner_ref) = match self.entries.get_mut(owner) {
            Some(parent) => {
                debug!("Instantiating {} as {}.{}", variable, owner, class);
                let handle = parent.handle.construct(class, args, kwargs).map_err(|e| {
                    with_context(e, format!("instantiating {}.{}", owner, class))
                })?;
                (handle, Owner::Variable(owner.to_string()))
            }
            None => {
                let namespace = self.fresh_namespace(config, owner)?;
                debug!("Instantiating {} from {}.{}", variable, owner, class);
                let handle = namespace.construct(class, args, kwargs).map_err(|e| {
                    with_context(e, format!("instantiating {}.{}", owner, class))
                })?;
                (handle, Owner::Namespace(owner.to_string()))
            }
        };

        self.entries.insert(
            variable.to_string(),
            ScopeEntry {
                variable_name: variable.to_string(),
                owner: owner_ref,
                class_name: class.to_string(),
                handle,
            },
        );
        Ok(())
    }

    /// Call `method` on a scope variable, or on a freshly resolved namespace.
    pub fn call(
        &mut self,
        config: &ImporterConfig,
        target: &str,
        method: &str,
        args: &[Value],
        kwargs: &Kwargs,
    ) -> Result<Value> {
        if let Some(entry) = self.entries.get_mut(target) {
            return entry
                .handle
                .call(method, args, kwargs)
                .map_err(|e| with_context(e, format!("calling {}.{}", target, method)));
        }
        let namespace = self.fresh_namespace(config, target)?;
        SymbolResolver::invoke(namespace.as_ref(), method, args, kwargs)
    }

    /// Read `attr` from a scope variable, or from a freshly resolved namespace.
    pub fn get(&mut self, config: &ImporterConfig, target: &str, attr: &str) -> Result<Value> {
        if let Some(entry) = self.entries.get(target) {
            return entry
                .handle
                .get(attr)
                .map_err(|e| with_context(e, format!("reading {}.{}", target, attr)));
        }
        let namespace = self.fresh_namespace(config, target)?;
        SymbolResolver::read(namespace.as_ref(), attr)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.entries.contains_key(variable)
    }

    pub fn entry(&self, variable: &str) -> Option<&ScopeEntry> {
        self.entries.get(variable)
    }

    /// Variable names in scope, sorted.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sandbox check, then resolve.
    fn fresh_namespace(
        &mut self,
        config: &ImporterConfig,
        path: &str,
    ) -> Result<Arc<dyn Namespace>> {
        let first = first_segment(path);
        if !config.allows(first) {
            warn!("Refusing namespace {}: {} is out of bounds", path, first);
            return Err(ImporterError::OutOfBounds {
                namespace: first.to_string(),
            });
        }
        self.symbols.resolve(path)
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("variables", &self.variables())
            .finish()
    }
}
