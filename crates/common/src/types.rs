//! Core result types for NetVerify

use serde::{Deserialize, Serialize};

/// Outcome of one test executed against one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Skipped,
    Success,
    Failure,
    Error,
}

impl TestStatus {
    /// All statuses ordered by increasing severity
    pub const ALL: [TestStatus; 4] = [
        TestStatus::Skipped,
        TestStatus::Success,
        TestStatus::Failure,
        TestStatus::Error,
    ];

    /// Whether this outcome should fail a run
    pub fn is_problem(&self) -> bool {
        matches!(self, TestStatus::Failure | TestStatus::Error)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Skipped => write!(f, "skipped"),
            TestStatus::Success => write!(f, "success"),
            TestStatus::Failure => write!(f, "failure"),
            TestStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skipped" => Ok(TestStatus::Skipped),
            "success" => Ok(TestStatus::Success),
            "failure" => Ok(TestStatus::Failure),
            "error" => Ok(TestStatus::Error),
            other => Err(format!("unknown test status: {}", other)),
        }
    }
}

/// Catalog-level overrides applied to every result produced by a definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultOverwrite {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub custom_field: Option<String>,
}

/// Result of running a single test on a single device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Device name
    pub name: String,
    /// Test name
    pub test: String,
    pub categories: Vec<String>,
    pub description: String,
    pub result: TestStatus,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field: Option<String>,
}

impl TestResult {
    /// Create a result for `test` on `device`. Starts as skipped until a
    /// verdict is recorded.
    pub fn new(
        device: impl Into<String>,
        test: impl Into<String>,
        categories: Vec<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: device.into(),
            test: test.into(),
            categories,
            description: description.into(),
            result: TestStatus::Skipped,
            messages: Vec::new(),
            custom_field: None,
        }
    }

    /// Record the outcome, replacing any previous one
    pub fn record(&mut self, status: TestStatus, messages: impl IntoIterator<Item = String>) {
        self.result = status;
        self.messages = messages.into_iter().collect();
    }

    pub fn is_success(&mut self) {
        self.record(TestStatus::Success, Vec::new());
    }

    pub fn is_failure(&mut self, message: impl Into<String>) {
        self.record(TestStatus::Failure, vec![message.into()]);
    }

    pub fn is_skipped(&mut self, message: impl Into<String>) {
        self.record(TestStatus::Skipped, vec![message.into()]);
    }

    pub fn is_error(&mut self, message: impl Into<String>) {
        self.record(TestStatus::Error, vec![message.into()]);
    }

    /// Apply catalog-level overrides
    pub fn overwrite(&mut self, overwrite: &ResultOverwrite) {
        if let Some(description) = &overwrite.description {
            self.description = description.clone();
        }
        if let Some(categories) = &overwrite.categories {
            self.categories = categories.clone();
        }
        if overwrite.custom_field.is_some() {
            self.custom_field = overwrite.custom_field.clone();
        }
    }
}
