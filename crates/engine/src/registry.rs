//! Test registry
//!
//! Maps dotted namespace paths to the test variants they contain. This is the
//! only place where tests are looked up by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::RegistryError;
use crate::plugin::{Test, TestVariant};

/// Separator between namespace path segments
pub const NAMESPACE_SEPARATOR: char = '.';

/// A group of test variants registered under one path
pub struct Namespace {
    path: String,
    location: Option<String>,
    tests: BTreeMap<&'static str, Arc<dyn TestVariant>>,
}

impl Namespace {
    fn new(path: String) -> Self {
        Self {
            path,
            location: None,
            tests: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Where the namespace was defined, for error messages
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn get(&self, test: &str) -> Option<&Arc<dyn TestVariant>> {
        self.tests.get(test)
    }

    pub fn tests(&self) -> impl Iterator<Item = &Arc<dyn TestVariant>> {
        self.tests.values()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("path", &self.path)
            .field("location", &self.location)
            .field("tests", &self.tests.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Registry of loadable test namespaces
#[derive(Debug, Default)]
pub struct TestRegistry {
    namespaces: BTreeMap<String, Namespace>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a test under `namespace`
    pub fn register<T: Test>(&mut self, namespace: &str, test: T) -> Result<(), RegistryError> {
        self.register_variant(namespace, Arc::new(test))
    }

    /// Register an already type-erased variant under `namespace`
    pub fn register_variant(
        &mut self,
        namespace: &str,
        variant: Arc<dyn TestVariant>,
    ) -> Result<(), RegistryError> {
        let ns = self.namespace_entry(namespace)?;
        let name = variant.name();
        if ns.tests.contains_key(name) {
            return Err(RegistryError::DuplicateTest {
                namespace: namespace.to_string(),
                test: name.to_string(),
            });
        }
        debug!("Registered test {} in {}", name, namespace);
        ns.tests.insert(name, variant);
        Ok(())
    }

    /// Record where a namespace comes from, creating it if needed
    pub fn set_location(
        &mut self,
        namespace: &str,
        location: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.namespace_entry(namespace)?.location = Some(location.into());
        Ok(())
    }

    fn namespace_entry(&mut self, namespace: &str) -> Result<&mut Namespace, RegistryError> {
        if !is_valid_path(namespace) {
            return Err(RegistryError::InvalidNamespace(namespace.to_string()));
        }
        Ok(self
            .namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| Namespace::new(namespace.to_string())))
    }

    /// Registered namespace at exactly `path`
    pub fn get(&self, path: &str) -> Option<&Namespace> {
        self.namespaces.get(path)
    }

    /// Whether `path` names a registered namespace or a parent of one
    pub fn contains_namespace(&self, path: &str) -> bool {
        if !is_valid_path(path) {
            return false;
        }
        if self.namespaces.contains_key(path) {
            return true;
        }
        let prefix = format!("{}{}", path, NAMESPACE_SEPARATOR);
        self.namespaces
            .range(prefix.clone()..)
            .next()
            .map_or(false, |(key, _)| key.starts_with(&prefix))
    }

    pub fn location(&self, path: &str) -> Option<&str> {
        self.namespaces.get(path).and_then(Namespace::location)
    }

    /// Look up a test by namespace and name
    pub fn resolve_test(&self, namespace: &str, test: &str) -> Option<Arc<dyn TestVariant>> {
        self.namespaces.get(namespace)?.get(test).cloned()
    }

    /// Look up a test by its fully qualified name, e.g. `a.b.VerifyThing`
    pub fn find(&self, qualified: &str) -> Option<Arc<dyn TestVariant>> {
        let (namespace, test) = qualified.rsplit_once(NAMESPACE_SEPARATOR)?;
        self.resolve_test(namespace, test)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// Total number of registered tests
    pub fn len(&self) -> usize {
        self.namespaces.values().map(Namespace::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dotted path made of non-empty segments without whitespace
pub fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path.split(NAMESPACE_SEPARATOR).all(|segment| {
            !segment.is_empty() && !segment.chars().any(char::is_whitespace)
        })
}

/// Join a parent namespace and a relative segment
pub fn join_path(parent: &str, child: &str) -> String {
    format!("{}{}{}", parent, NAMESPACE_SEPARATOR, child)
}
