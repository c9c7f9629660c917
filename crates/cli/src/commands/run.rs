//! Run Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{load_catalog, load_registry};
use crate::config::Config;
use crate::output::{print_list, print_warning, status_label, OutputFormat, TableDisplay};
use crate::replay::ReplayInventory;
use netverify_common::{TestResult, TestStatus};
use netverify_engine::{ResultManager, RunOptions, Runner, UnitErrorPolicy};

#[derive(Args)]
pub struct RunArgs {
    /// Catalog file, defaults to the configured catalog
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Replay inventory file, defaults to the configured inventory
    #[arg(short, long)]
    pub inventory: Option<PathBuf>,

    /// Only run on devices with one of these tags
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Include devices without an established session
    #[arg(long)]
    pub all_devices: bool,

    /// Record unexpected unit errors as error results instead of dropping them
    #[arg(long)]
    pub report_errors: bool,

    /// Maximum number of units in flight
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Hide results with these statuses
    #[arg(long, value_delimiter = ',')]
    pub hide: Vec<TestStatus>,
}

/// Result display wrapper for serialization
#[derive(Serialize)]
pub struct ResultDisplay {
    pub device: String,
    pub test: String,
    pub categories: Vec<String>,
    pub result: TestStatus,
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_field: Option<String>,
}

impl From<&TestResult> for ResultDisplay {
    fn from(result: &TestResult) -> Self {
        Self {
            device: result.name.clone(),
            test: result.test.clone(),
            categories: result.categories.clone(),
            result: result.result,
            messages: result.messages.clone(),
            custom_field: result.custom_field.clone(),
        }
    }
}

impl TableDisplay for ResultDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Device", "Test", "Categories", "Result", "Messages"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.device.clone(),
            self.test.clone(),
            self.categories.join(", "),
            status_label(self.result),
            self.messages.join("\n"),
        ]
    }
}

/// Run the catalog and print results. Returns `false` when any result
/// failed or errored.
pub async fn execute(args: RunArgs, config: &Config, format: OutputFormat) -> Result<bool> {
    let catalog_path = config.catalog_path(args.catalog)?;
    let inventory_path = config.inventory_path(args.inventory)?;

    let registry = load_registry()?;
    let catalog = load_catalog(&registry, &catalog_path)?;
    let inventory = ReplayInventory::load(&inventory_path)?;

    let mut runner_config = config.runner.clone();
    if args.report_errors {
        runner_config.unit_errors = UnitErrorPolicy::Report;
    }
    if args.max_concurrency.is_some() {
        runner_config.max_concurrency = args.max_concurrency;
    }

    let options = RunOptions {
        tags: (!args.tags.is_empty()).then_some(args.tags),
        established_only: !args.all_devices,
    };

    let mut manager = ResultManager::new();
    Runner::new(runner_config)
        .run_into(&mut manager, &inventory, &catalog, &options)
        .await;

    let visible = manager.filter(&args.hide);
    let displays: Vec<ResultDisplay> = visible.results().iter().map(ResultDisplay::from).collect();
    print_list(&displays, format);

    let summary = manager.summary();
    if let OutputFormat::Table = format {
        println!(
            "{} result(s): {} success, {} failure, {} error, {} skipped",
            summary.total,
            summary.counts.success,
            summary.counts.failure,
            summary.counts.error,
            summary.counts.skipped
        );
        if summary.total == 0 {
            print_warning("no test was run");
        }
    }

    Ok(!summary.status.map_or(false, |status| status.is_problem()))
}
