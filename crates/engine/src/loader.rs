//! Catalog loader
//!
//! Parses a declarative catalog document into a [`Catalog`]:
//!
//! ```yaml
//! netverify.tests:
//!   configuration:
//!     - VerifyZeroTouch:
//!   connectivity:
//!     - VerifyReachability:
//!         hosts:
//!           - source: Management0
//!             destination: 1.1.1.1
//! ```
//!
//! Top-level keys are absolute namespace paths. Nested keys starting with
//! `.` are relative to their parent; other nested keys are tried relative to
//! the parent first, then as absolute paths. Any error aborts the whole load.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, TestDefinition};
use crate::error::{CatalogError, CatalogResult};
use crate::input::{self, RawInput};
use crate::registry::{join_path, TestRegistry, NAMESPACE_SEPARATOR};

/// Loads catalogs, resolving names against a [`TestRegistry`]
pub struct CatalogLoader<'r> {
    registry: &'r TestRegistry,
}

impl<'r> CatalogLoader<'r> {
    pub fn new(registry: &'r TestRegistry) -> Self {
        Self { registry }
    }

    /// Read and load a catalog file
    pub fn parse(&self, path: impl AsRef<Path>) -> CatalogResult<Catalog> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            error!("Unable to read test catalog file '{}': {}", path.display(), source);
            CatalogError::DocumentRead {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.from_yaml(&content, Some(path.to_path_buf()))
    }

    /// Load a catalog from YAML (or JSON) text
    pub fn from_yaml(&self, content: &str, filename: Option<PathBuf>) -> CatalogResult<Catalog> {
        let document = if content.trim().is_empty() {
            Value::Null
        } else {
            serde_yaml::from_str::<Value>(content).map_err(|source| {
                let path = filename.clone().unwrap_or_else(|| PathBuf::from("<string>"));
                error!("Unable to parse test catalog '{}': {}", path.display(), source);
                CatalogError::DocumentDecode { path, source }
            })?
        };
        self.from_document(document, filename)
    }

    /// Load a catalog from an in-memory document
    pub fn from_document(&self, document: Value, filename: Option<PathBuf>) -> CatalogResult<Catalog> {
        let root = match document {
            Value::Null => {
                warn!("Catalog input data is empty");
                return Ok(Catalog::new(Vec::new(), filename));
            }
            Value::Object(root) => root,
            other => {
                return Err(CatalogError::InvalidDocument {
                    found: input::value_kind(&other),
                    filename,
                })
            }
        };

        match self.load(&root) {
            Ok(tests) => {
                info!(
                    "Loaded {} test definition(s){}",
                    tests.len(),
                    filename
                        .as_ref()
                        .map(|f| format!(" from {}", f.display()))
                        .unwrap_or_default()
                );
                Ok(Catalog::new(tests, filename))
            }
            Err(e) => {
                error!(
                    "Test catalog is invalid!{}: {}",
                    filename
                        .as_ref()
                        .map(|f| format!(" (from {})", f.display()))
                        .unwrap_or_default(),
                    e
                );
                Err(e)
            }
        }
    }

    fn load(&self, root: &Map<String, Value>) -> CatalogResult<Vec<TestDefinition>> {
        let mut leaves = Vec::new();
        self.flatten(root, None, &mut leaves)?;

        let mut tests = Vec::new();
        for (namespace, entries) in leaves {
            for entry in entries {
                tests.push(self.definition(&namespace, entry)?);
            }
        }
        Ok(tests)
    }

    /// Resolve nested namespaces down to their lists of test entries
    fn flatten<'d>(
        &self,
        mapping: &'d Map<String, Value>,
        parent: Option<&str>,
        leaves: &mut Vec<(String, &'d [Value])>,
    ) -> CatalogResult<()> {
        for (key, value) in mapping {
            let namespace = self.resolve_namespace(key, parent)?;
            match value {
                Value::Object(children) => self.flatten(children, Some(namespace.as_str()), leaves)?,
                Value::Array(entries) => {
                    debug!("Namespace {} declares {} test(s)", namespace, entries.len());
                    leaves.push((namespace, entries.as_slice()));
                }
                other => {
                    return Err(CatalogError::Syntax {
                        fragment: fragment(other),
                        reason: "It must be a list of tests".to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    fn resolve_namespace(&self, key: &str, parent: Option<&str>) -> CatalogResult<String> {
        let candidates = match (key.strip_prefix(NAMESPACE_SEPARATOR), parent) {
            (Some(relative), Some(parent)) => vec![join_path(parent, relative)],
            (Some(_), None) => Vec::new(),
            (None, Some(parent)) => vec![join_path(parent, key), key.to_string()],
            (None, None) => vec![key.to_string()],
        };

        candidates
            .into_iter()
            .find(|candidate| self.registry.contains_namespace(candidate))
            .ok_or_else(|| CatalogError::UnknownNamespace {
                name: key.trim_start_matches(NAMESPACE_SEPARATOR).to_string(),
                parent: parent.map(str::to_string),
                parent_location: parent
                    .and_then(|p| self.registry.location(p))
                    .map(str::to_string),
            })
    }

    fn definition(&self, namespace: &str, entry: &Value) -> CatalogResult<TestDefinition> {
        let entry_map = match entry {
            Value::Object(map) => map,
            other => {
                return Err(CatalogError::Syntax {
                    fragment: fragment(other),
                    reason: "It must be a dictionary".to_string(),
                })
            }
        };

        let mut items = entry_map.iter();
        let (test_name, raw_input) = match (items.next(), items.next()) {
            (Some(item), None) => item,
            _ => {
                return Err(CatalogError::Syntax {
                    fragment: fragment(entry),
                    reason: "It must be a dictionary with a single entry. Check the indentation"
                        .to_string(),
                })
            }
        };

        let test = self
            .registry
            .resolve_test(namespace, test_name)
            .ok_or_else(|| CatalogError::UnknownTest {
                test: test_name.clone(),
                namespace: namespace.to_string(),
                location: self.registry.location(namespace).map(str::to_string),
            })?;

        TestDefinition::new(test, RawInput::Data(raw_input.clone())).map_err(|source| {
            CatalogError::InvalidDefinition {
                namespace: namespace.to_string(),
                test: test_name.clone(),
                source,
            }
        })
    }
}

fn fragment(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
