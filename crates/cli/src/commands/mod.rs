//! CLI Commands

pub mod catalog;
pub mod run;

use std::path::Path;

use anyhow::Context;
use netverify_engine::{Catalog, CatalogLoader, TestRegistry};

/// Registry with every built-in check
pub fn load_registry() -> anyhow::Result<TestRegistry> {
    netverify_checks::builtin_registry().context("failed to register built-in tests")
}

/// Load and validate a catalog file
pub fn load_catalog(registry: &TestRegistry, path: &Path) -> anyhow::Result<Catalog> {
    CatalogLoader::new(registry)
        .parse(path)
        .with_context(|| format!("invalid test catalog {}", path.display()))
}
