//! Scripted doubles for the generator and harness seams (testing only).
//!
//! `ScriptedHarness` and `ScriptedGenerator` satisfy the trait contracts
//! without a build tool or network access, and record how they were called.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ApiChange, ChangeCategory, ChangeKind, TestOutcome};
use crate::generator::{CodeGenerator, GeneratorError, GeneratorResult};
use crate::harness::{HarnessError, TestHarness, BUILD_TOOL_ENV};

/// Error output of every scripted failing run.
pub const SCRIPTED_FAILURE: &str = "scripted failure";

/// A complete change record whose fields all derive from `name`.
pub fn sample_change(name: &str) -> ApiChange {
    ApiChange {
        library: "spring-framework".to_string(),
        name: name.to_string(),
        from_version: "v6.0.0".to_string(),
        to_version: "v6.1.0".to_string(),
        kind: ChangeKind::Signature,
        signature: format!("public int {name}(int a, int b)"),
        documentation: None,
        category: ChangeCategory::Method,
        source_code: format!("public int {name}(int a, int b) {{ return a + b; }}"),
        query: format!("Implement {name}."),
        function_signature: format!("public int {name}(int a, int b);"),
        test_program: format!("public class ExampleSpringServiceTest {{ /* {name} */ }}"),
    }
}

// ---------------------------------------------------------------------------
// ScriptedHarness
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Verdict {
    Pass,
    Fail,
    /// Fail this many runs, then pass.
    PassAfter(usize),
    Unconfigured,
}

/// Harness whose verdict is fixed up front.
#[derive(Debug)]
pub struct ScriptedHarness {
    verdict: Verdict,
    reported_change: Option<ApiChange>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    tested_code: Mutex<Vec<String>>,
}

impl ScriptedHarness {
    fn with_verdict(verdict: Verdict) -> Self {
        Self {
            verdict,
            reported_change: None,
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
            tested_code: Mutex::new(Vec::new()),
        }
    }

    pub fn always_passing() -> Self {
        Self::with_verdict(Verdict::Pass)
    }

    pub fn always_failing() -> Self {
        Self::with_verdict(Verdict::Fail)
    }

    /// Fail the first `failures` runs, pass every later one.
    pub fn passing_after(failures: usize) -> Self {
        Self::with_verdict(Verdict::PassAfter(failures))
    }

    /// Every run reports a missing build tool.
    pub fn unconfigured() -> Self {
        Self::with_verdict(Verdict::Unconfigured)
    }

    /// Echo `change` instead of the change under test.
    pub fn reporting_change(mut self, change: ApiChange) -> Self {
        self.reported_change = Some(change);
        self
    }

    /// Sleep for `delay` before answering runs of the change named `name`.
    pub fn with_delay_for(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    /// Number of `execute` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Source code of every run, in call order.
    pub fn tested_code(&self) -> Vec<String> {
        self.tested_code
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TestHarness for ScriptedHarness {
    async fn execute(
        &self,
        change: &ApiChange,
        source_code: &str,
        build_descriptor: &str,
    ) -> Result<TestOutcome, HarnessError> {
        if let Verdict::Unconfigured = self.verdict {
            return Err(HarnessError::MissingBuildTool {
                var: BUILD_TOOL_ENV.to_string(),
            });
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.tested_code
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(source_code.to_string());

        if let Some(delay) = self.delays.get(&change.name) {
            tokio::time::sleep(*delay).await;
        }

        let success = match self.verdict {
            Verdict::Pass => true,
            Verdict::PassAfter(failures) => call >= failures,
            Verdict::Fail | Verdict::Unconfigured => false,
        };

        let reported = self.reported_change.as_ref().unwrap_or(change);
        let output = if success {
            "BUILD SUCCESSFUL"
        } else {
            "BUILD FAILED"
        };

        Ok(TestOutcome {
            api_change: Some(reported.clone()),
            generated_code: Some(source_code.to_string()),
            gradle_build: Some(build_descriptor.to_string()),
            model: None,
            success,
            output: Some(output.to_string()),
            error_output: (!success).then(|| SCRIPTED_FAILURE.to_string()),
            test_results: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

/// Generator producing numbered artifacts: `code-0`, then `code-1` after the
/// first repair, and so on. Build files are `build for <code>`.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    generate_error: Option<String>,
    repair_error: Option<String>,
    panic_on_generate: bool,
    generate_calls: AtomicUsize,
    repair_calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `generate_code` fails with a transport error carrying `message`.
    pub fn failing_generate(mut self, message: &str) -> Self {
        self.generate_error = Some(message.to_string());
        self
    }

    /// `repair_code` fails with a transport error carrying `message`.
    pub fn failing_repair(mut self, message: &str) -> Self {
        self.repair_error = Some(message.to_string());
        self
    }

    /// `generate_code` panics.
    pub fn panicking(mut self) -> Self {
        self.panic_on_generate = true;
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn repair_calls(&self) -> usize {
        self.repair_calls.load(Ordering::SeqCst)
    }
}

fn next_version(previous_code: &str) -> String {
    let version = previous_code
        .strip_prefix("code-")
        .and_then(|n| n.parse::<usize>().ok())
        .map_or(0, |n| n + 1);
    format!("code-{version}")
}

#[async_trait]
impl CodeGenerator for ScriptedGenerator {
    async fn generate_code(&self, _change: &ApiChange) -> GeneratorResult<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_generate {
            panic!("scripted generator panic");
        }
        match &self.generate_error {
            Some(message) => Err(GeneratorError::Transport(message.clone())),
            None => Ok("code-0".to_string()),
        }
    }

    async fn generate_build_config(
        &self,
        _change: &ApiChange,
        code: &str,
    ) -> GeneratorResult<String> {
        Ok(format!("build for {code}"))
    }

    async fn repair_code(
        &self,
        _change: &ApiChange,
        previous_code: &str,
        _previous_build: &str,
        _previous_outcome: &TestOutcome,
    ) -> GeneratorResult<String> {
        self.repair_calls.fetch_add(1, Ordering::SeqCst);
        match &self.repair_error {
            Some(message) => Err(GeneratorError::Transport(message.clone())),
            None => Ok(next_version(previous_code)),
        }
    }

    async fn repair_build_config(
        &self,
        _change: &ApiChange,
        new_code: &str,
        _previous_code: &str,
        _previous_build: &str,
        _previous_outcome: &TestOutcome,
    ) -> GeneratorResult<String> {
        Ok(format!("build for {new_code}"))
    }
}
