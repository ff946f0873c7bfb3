//! Harness outcomes and the batch result written at the end of a run.

use serde::{Deserialize, Serialize};

use super::api_change::ApiChange;

/// Result of one test case, as reported by the build tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub test_name: String,
    pub class_name: String,
    pub success: bool,
    /// Duration in milliseconds.
    pub duration: u64,
    #[serde(default)]
    pub failure: Option<String>,
}

/// Outcome of one harness invocation.
///
/// `api_change`, `generated_code` and `gradle_build` echo back exactly what
/// the harness was invoked with, so callers can detect an outcome that
/// belongs to a different change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    #[serde(default)]
    pub api_change: Option<ApiChange>,
    #[serde(default)]
    pub generated_code: Option<String>,
    #[serde(default)]
    pub gradle_build: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error_output: Option<String>,
    #[serde(default)]
    pub test_results: Vec<TestCaseResult>,
}

impl TestOutcome {
    /// Failing outcome for `change` with only an error message attached.
    pub fn failure(change: &ApiChange, error_output: impl Into<String>) -> Self {
        Self {
            api_change: Some(change.clone()),
            generated_code: None,
            gradle_build: None,
            model: None,
            success: false,
            output: None,
            error_output: Some(error_output.into()),
            test_results: Vec::new(),
        }
    }

    /// Whether this outcome was reported for exactly `change`.
    pub fn matches(&self, change: &ApiChange) -> bool {
        self.api_change.as_ref() == Some(change)
    }

    /// A passing outcome for exactly `change`.
    pub fn is_accepted_for(&self, change: &ApiChange) -> bool {
        self.success && self.matches(change)
    }

    /// Number of reported test cases that failed.
    pub fn failed_case_count(&self) -> usize {
        self.test_results.iter().filter(|c| !c.success).count()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Final outcomes of a batch, one per evaluation unit, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResult {
    pub outcomes: Vec<TestOutcome>,
}

impl BatchResult {
    pub fn new(outcomes: Vec<TestOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestOutcome> {
        self.outcomes.iter()
    }
}
