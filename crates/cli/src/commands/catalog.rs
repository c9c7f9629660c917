//! Catalog Commands

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{load_catalog, load_registry};
use crate::config::Config;
use crate::output::{print_item, print_list, print_success, OutputFormat, TableDisplay};
use netverify_engine::TestDefinition;

#[derive(Args)]
pub struct CheckArgs {
    /// Catalog file, defaults to the configured catalog
    pub catalog: Option<PathBuf>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Catalog file, defaults to the configured catalog
    pub catalog: Option<PathBuf>,

    /// Only list definitions with these tags
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Require every requested tag instead of any
    #[arg(long, requires = "tags")]
    pub strict: bool,
}

/// Outcome of a catalog check
#[derive(Serialize)]
pub struct CheckDisplay {
    pub catalog: String,
    pub definitions: usize,
    pub tests: usize,
}

impl TableDisplay for CheckDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Catalog", "Definitions", "Distinct Tests"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.catalog.clone(),
            self.definitions.to_string(),
            self.tests.to_string(),
        ]
    }
}

/// Definition display wrapper for serialization
#[derive(Serialize)]
pub struct DefinitionDisplay {
    pub test: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub inputs: serde_json::Value,
}

impl From<&TestDefinition> for DefinitionDisplay {
    fn from(definition: &TestDefinition) -> Self {
        Self {
            test: definition.name().to_string(),
            categories: definition
                .test()
                .categories()
                .iter()
                .map(|c| c.to_string())
                .collect(),
            tags: definition
                .tags()
                .map(|tags| tags.iter().cloned().collect())
                .unwrap_or_default(),
            inputs: definition.inputs().arguments().unwrap_or_default(),
        }
    }
}

impl TableDisplay for DefinitionDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Test", "Categories", "Tags", "Inputs"]
    }

    fn row(&self) -> Vec<String> {
        let inputs = match &self.inputs {
            serde_json::Value::Object(map) if map.is_empty() => "-".to_string(),
            other => other.to_string(),
        };
        vec![
            self.test.clone(),
            self.categories.join(", "),
            self.tags.join(", "),
            inputs,
        ]
    }
}

pub fn execute_check(args: CheckArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let path = config.catalog_path(args.catalog)?;
    let registry = load_registry()?;
    let catalog = load_catalog(&registry, &path)?;

    let display = CheckDisplay {
        catalog: path.display().to_string(),
        definitions: catalog.len(),
        tests: catalog.test_names().len(),
    };
    match format {
        OutputFormat::Table => print_success(&format!(
            "{} is valid: {} test definition(s)",
            display.catalog, display.definitions
        )),
        _ => print_item(&display, format),
    }
    Ok(())
}

pub fn execute_list(args: ListArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let path = config.catalog_path(args.catalog)?;
    let registry = load_registry()?;
    let catalog = load_catalog(&registry, &path)?;

    let definitions = if args.tags.is_empty() {
        catalog.tests().to_vec()
    } else {
        catalog.filter_by_tags(&args.tags, args.strict)
    };
    let displays: Vec<DefinitionDisplay> = definitions.iter().map(DefinitionDisplay::from).collect();
    print_list(&displays, format);
    Ok(())
}
