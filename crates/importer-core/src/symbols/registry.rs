//! In-process namespace table and a closure-backed namespace.

use super::{no_attribute, Namespace, Object, Resolver};
use crate::protocol::{Kwargs, Value};
use crate::{ImporterError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolver over namespaces registered by the embedding application.
#[derive(Clone, Default)]
pub struct NamespaceRegistry {
    namespaces: HashMap<String, Arc<dyn Namespace>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace under its own name.
    pub fn register(&mut self, namespace: impl Namespace + 'static) {
        let path = namespace.name().to_string();
        self.namespaces.insert(path, Arc::new(namespace));
    }

    /// Register a shared namespace under an explicit path.
    pub fn register_shared(&mut self, path: impl Into<String>, namespace: Arc<dyn Namespace>) {
        self.namespaces.insert(path.into(), namespace);
    }

    pub fn with(mut self, namespace: impl Namespace + 'static) -> Self {
        self.register(namespace);
        self
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.namespaces.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl Resolver for NamespaceRegistry {
    fn resolve(&self, path: &str) -> Result<Arc<dyn Namespace>> {
        self.namespaces.get(path).cloned().ok_or_else(|| {
            ImporterError::application(format!("No module named '{}'", path), "")
        })
    }
}

impl fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceRegistry")
            .field("paths", &self.paths())
            .finish()
    }
}

type Function = dyn Fn(&[Value], &Kwargs) -> Result<Value> + Send + Sync;
type Constructor = dyn Fn(&[Value], &Kwargs) -> Result<Box<dyn Object>> + Send + Sync;

/// Namespace assembled from closures and constant attributes.
pub struct FnNamespace {
    name: String,
    functions: HashMap<String, Box<Function>>,
    attributes: HashMap<String, Value>,
    classes: HashMap<String, Box<Constructor>>,
}

impl FnNamespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: HashMap::new(),
            attributes: HashMap::new(),
            classes: HashMap::new(),
        }
    }

    pub fn function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value], &Kwargs) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Box::new(function));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn class<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&[Value], &Kwargs) -> Result<Box<dyn Object>> + Send + Sync + 'static,
    {
        self.classes.insert(name.into(), Box::new(constructor));
        self
    }
}

impl Namespace for FnNamespace {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, method: &str, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
        match self.functions.get(method) {
            Some(function) => function(args, kwargs),
            None => Err(no_attribute(&self.name, method)),
        }
    }

    fn get(&self, attr: &str) -> Result<Value> {
        self.attributes
            .get(attr)
            .cloned()
            .ok_or_else(|| no_attribute(&self.name, attr))
    }

    fn construct(&self, class: &str, args: &[Value], kwargs: &Kwargs) -> Result<Box<dyn Object>> {
        match self.classes.get(class) {
            Some(constructor) => constructor(args, kwargs),
            None => Err(no_attribute(&self.name, class)),
        }
    }
}
