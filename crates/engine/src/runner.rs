//! Execution engine
//!
//! A run connects the inventory, then fans out one unit per selected device
//! and catalog definition, and waits for every unit before returning.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use netverify_common::TestResult;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, TestDefinition};
use crate::error::{UnitError, UnitExecutionError};
use crate::inventory::{Device, Inventory};
use crate::plugin::{CollectedCommand, UnitArguments};
use crate::results::ResultManager;

/// What to do with a unit that failed unexpectedly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitErrorPolicy {
    /// Log the error, the unit contributes no result
    #[default]
    Drop,
    /// Log the error and record an `error` result for the unit
    Report,
}

/// Configuration for the runner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Upper bound on units in flight, unbounded when unset or zero
    pub max_concurrency: Option<usize>,
    pub unit_errors: UnitErrorPolicy,
}

/// Per-run selection options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Only run on devices sharing at least one of these tags
    pub tags: Option<Vec<String>>,
    /// Skip devices without an established session
    pub established_only: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tags: None,
            established_only: true,
        }
    }
}

impl RunOptions {
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn all_devices(mut self) -> Self {
        self.established_only = false;
        self
    }
}

/// Runs catalogs against inventories
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `catalog` against `inventory` and return the collected results
    pub async fn run(
        &self,
        inventory: &dyn Inventory,
        catalog: &Catalog,
        options: &RunOptions,
    ) -> Vec<TestResult> {
        let mut manager = ResultManager::new();
        self.run_into(&mut manager, inventory, catalog, options).await;
        manager.into_results()
    }

    /// Run `catalog` against `inventory`, adding results to `manager`
    pub async fn run_into(
        &self,
        manager: &mut ResultManager,
        inventory: &dyn Inventory,
        catalog: &Catalog,
        options: &RunOptions,
    ) {
        let start = Instant::now();
        let before = manager.len();

        let units = self.plan(inventory, catalog, options).await;
        let outcomes = self.execute(&units).await;

        match self.config.unit_errors {
            UnitErrorPolicy::Drop => manager.add_results(outcomes),
            UnitErrorPolicy::Report => {
                for ((device, definition), outcome) in units.iter().zip(outcomes) {
                    match outcome {
                        Ok(result) => manager.add_result(result),
                        Err(e) => {
                            error!("Error when running tests: {}: {}", e.source.kind(), e);
                            let mut result = base_result(device.as_ref(), definition);
                            result.is_error(format!("{}: {}", e.source.kind(), e.source));
                            apply_overwrite(&mut result, definition);
                            manager.add_result(result);
                        }
                    }
                }
            }
        }

        info!(
            "Run finished: {} result(s) from {} unit(s) in {} ms",
            manager.len() - before,
            units.len(),
            start.elapsed().as_millis()
        );
    }

    /// Connect the inventory and build the device x definition product
    async fn plan(
        &self,
        inventory: &dyn Inventory,
        catalog: &Catalog,
        options: &RunOptions,
    ) -> Vec<(Arc<dyn Device>, TestDefinition)> {
        inventory.connect_all().await;

        let devices = inventory.select_devices(options.established_only, options.tags.as_deref());
        if devices.is_empty() {
            warn!("No device in the inventory matches the run options, nothing to test");
        }
        if catalog.is_empty() {
            warn!("The catalog has no test definition, nothing to test");
        }

        let units: Vec<_> = devices
            .iter()
            .flat_map(|device| {
                catalog
                    .iter()
                    .map(move |definition| (device.clone(), definition.clone()))
            })
            .collect();

        info!(
            "Running {} test definition(s) on {} device(s): {} unit(s)",
            catalog.len(),
            devices.len(),
            units.len()
        );
        units
    }

    /// Spawn every unit, then wait for all of them. Outcomes keep the order
    /// of `units`.
    async fn execute(
        &self,
        units: &[(Arc<dyn Device>, TestDefinition)],
    ) -> Vec<Result<TestResult, UnitExecutionError>> {
        let limit = self
            .config
            .max_concurrency
            .filter(|n| *n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));

        let handles: Vec<_> = units
            .iter()
            .map(|(device, definition)| {
                let device = device.clone();
                let definition = definition.clone();
                let limit = limit.clone();
                tokio::spawn(async move {
                    let _permit = match limit {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    run_unit(device, definition).await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(units)
            .map(|(joined, (device, definition))| {
                joined.unwrap_or_else(|e| {
                    let source = if e.is_panic() {
                        UnitError::Panicked(panic_message(e.into_panic()))
                    } else {
                        UnitError::Cancelled
                    };
                    Err(UnitExecutionError {
                        device: device.name().to_string(),
                        test: definition.name().to_string(),
                        source,
                    })
                })
            })
            .collect()
    }
}

/// Execute one device x definition unit
async fn run_unit(
    device: Arc<dyn Device>,
    definition: TestDefinition,
) -> Result<TestResult, UnitExecutionError> {
    let test = definition.test();
    let inputs = definition.inputs().as_ref();
    let fail = |source: UnitError| UnitExecutionError {
        device: device.name().to_string(),
        test: test.name().to_string(),
        source,
    };

    debug!("Running {} on {}", test.name(), device.name());
    let mut result = base_result(device.as_ref(), &definition);

    let args = UnitArguments::from_input(inputs).map_err(|e| fail(e.into()))?;
    let commands = test.instance_commands(inputs, &args).map_err(fail)?;
    let mut collected: Vec<CollectedCommand> =
        commands.into_iter().map(CollectedCommand::new).collect();

    match device.collect(&mut collected).await {
        Err(e) => result.is_error(e.to_string()),
        Ok(()) => match collected.iter().find(|c| !c.is_collected()) {
            Some(missing) => result.is_error(format!(
                "command '{}' returned no output",
                missing.command.command
            )),
            None => {
                let verdict = test.evaluate_input(inputs, &collected).await.map_err(fail)?;
                result.record(verdict.status, verdict.messages);
            }
        },
    }

    apply_overwrite(&mut result, &definition);
    debug!("{} on {}: {}", test.name(), device.name(), result.result);
    Ok(result)
}

fn base_result(device: &dyn Device, definition: &TestDefinition) -> TestResult {
    let test = definition.test();
    TestResult::new(
        device.name(),
        test.name(),
        test.categories().iter().map(|c| c.to_string()).collect(),
        test.description(),
    )
}

fn apply_overwrite(result: &mut TestResult, definition: &TestDefinition) {
    if let Some(overwrite) = definition.inputs().result_overwrite() {
        result.overwrite(overwrite);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_concurrency, None);
        assert_eq!(config.unit_errors, UnitErrorPolicy::Drop);

        let options = RunOptions::default();
        assert!(options.established_only);
        assert!(options.tags.is_none());
    }

    #[test]
    fn test_config_from_json() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{"max_concurrency": 4, "unit_errors": "report"}"#).unwrap();
        assert_eq!(config.max_concurrency, Some(4));
        assert_eq!(config.unit_errors, UnitErrorPolicy::Report);

        let partial: RunnerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(partial, RunnerConfig::default());
    }

    #[test]
    fn test_run_options_builders() {
        let options = RunOptions::default().with_tags(["leaf"]).all_devices();
        assert_eq!(options.tags, Some(vec!["leaf".to_string()]));
        assert!(!options.established_only);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new(String::from("owned"))), "owned");
        assert_eq!(panic_message(Box::new(3_u8)), "unknown panic payload");
    }
}
