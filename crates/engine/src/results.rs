//! Result aggregation

use std::collections::BTreeMap;

use netverify_common::{TestResult, TestStatus};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::UnitExecutionError;

/// Collects the results of one or more runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultManager {
    results: Vec<TestResult>,
}

/// Count of results per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub success: usize,
    pub failure: usize,
    pub error: usize,
    pub skipped: usize,
}

impl StatusCounts {
    fn add(&mut self, status: TestStatus) {
        match status {
            TestStatus::Success => self.success += 1,
            TestStatus::Failure => self.failure += 1,
            TestStatus::Error => self.error += 1,
            TestStatus::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failure + self.error + self.skipped
    }
}

/// Aggregated view over a [`ResultManager`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub total: usize,
    pub status: Option<TestStatus>,
    pub counts: StatusCounts,
    pub by_device: BTreeMap<String, StatusCounts>,
    pub by_test: BTreeMap<String, StatusCounts>,
}

impl ResultManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: TestResult) {
        self.results.push(result);
    }

    /// Add unit outcomes. Errors are logged and contribute no result.
    pub fn add_results<I>(&mut self, outcomes: I)
    where
        I: IntoIterator<Item = Result<TestResult, UnitExecutionError>>,
    {
        for outcome in outcomes {
            match outcome {
                Ok(result) => self.add_result(result),
                Err(e) => error!(
                    "Error when running tests: {}: {}",
                    e.source.kind(),
                    e
                ),
            }
        }
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<TestResult> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Most severe status across all results, `None` when empty
    pub fn status(&self) -> Option<TestStatus> {
        self.results.iter().map(|r| r.result).max()
    }

    /// Whether any result is an error
    pub fn error_status(&self) -> bool {
        self.results.iter().any(|r| r.result == TestStatus::Error)
    }

    pub fn summary(&self) -> ResultSummary {
        let mut summary = ResultSummary {
            total: self.results.len(),
            status: self.status(),
            ..Default::default()
        };
        for result in &self.results {
            summary.counts.add(result.result);
            summary
                .by_device
                .entry(result.name.clone())
                .or_default()
                .add(result.result);
            summary
                .by_test
                .entry(result.test.clone())
                .or_default()
                .add(result.result);
        }
        summary
    }

    /// A manager without results in any of the `hide` statuses
    pub fn filter(&self, hide: &[TestStatus]) -> ResultManager {
        ResultManager {
            results: self
                .results
                .iter()
                .filter(|r| !hide.contains(&r.result))
                .cloned()
                .collect(),
        }
    }

    pub fn results_by_device(&self, device: &str) -> Vec<&TestResult> {
        self.results.iter().filter(|r| r.name == device).collect()
    }

    pub fn results_by_test(&self, test: &str) -> Vec<&TestResult> {
        self.results.iter().filter(|r| r.test == test).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.results)
    }
}

impl Extend<TestResult> for ResultManager {
    fn extend<T: IntoIterator<Item = TestResult>>(&mut self, iter: T) {
        self.results.extend(iter);
    }
}
