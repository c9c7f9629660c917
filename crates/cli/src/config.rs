//! CLI configuration

use std::path::{Path, PathBuf};

use anyhow::Context;
use netverify_engine::RunnerConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration, read from `~/.netverify/config.toml` by default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution engine settings
    pub runner: RunnerConfig,

    /// Paths used when not given on the command line
    pub defaults: Defaults,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub catalog: Option<PathBuf>,
    pub inventory: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file, or defaults if it does not exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("invalid config {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Catalog to use: the explicit one, else the configured default
    pub fn catalog_path(&self, explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        explicit
            .or_else(|| self.defaults.catalog.clone())
            .context("no catalog given and no default catalog configured")
    }

    /// Inventory to use: the explicit one, else the configured default
    pub fn inventory_path(&self, explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        explicit
            .or_else(|| self.defaults.inventory.clone())
            .context("no inventory given and no default inventory configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netverify_engine::UnitErrorPolicy;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[runner]
max_concurrency = 8
unit_errors = "report"

[defaults]
catalog = "catalogs/fabric.yml"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.runner.max_concurrency, Some(8));
        assert_eq!(config.runner.unit_errors, UnitErrorPolicy::Report);
        assert_eq!(
            config.catalog_path(None).unwrap(),
            PathBuf::from("catalogs/fabric.yml")
        );
        assert_eq!(
            config.catalog_path(Some("other.yml".into())).unwrap(),
            PathBuf::from("other.yml")
        );
        assert!(config.inventory_path(None).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.defaults.inventory = Some(PathBuf::from("inventory.yml"));
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
