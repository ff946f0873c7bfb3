//! Dispatcher properties: ordering, concurrency bound, mismatch override,
//! counters, and run-wide failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use apidrift_core::fakes::{sample_change, ScriptedGenerator, ScriptedHarness};
use apidrift_core::repair_loop::CHANGE_MISMATCH;
use apidrift_core::{
    ApiChange, CodeGenerator, DispatchConfig, Dispatcher, EvaluationUnit, GeneratorFactory,
    GeneratorResult, HarnessError, Model, TestHarness, TestOutcome,
};
use async_trait::async_trait;

fn shared(generator: ScriptedGenerator) -> Arc<dyn GeneratorFactory> {
    let generator: Arc<dyn CodeGenerator> = Arc::new(generator);
    Arc::new(generator)
}

fn config(workers: usize, max_iterations: u32) -> DispatchConfig {
    DispatchConfig {
        workers,
        max_iterations,
    }
}

fn names(outcomes: &[TestOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .map(|o| o.api_change.as_ref().unwrap().name.clone())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn outcomes_follow_input_order_not_completion_order() {
    let mut harness = ScriptedHarness::always_passing();
    let changes: Vec<ApiChange> = (0..4).map(|i| sample_change(&format!("c{i}"))).collect();
    for (i, change) in changes.iter().enumerate() {
        let delay = Duration::from_millis(400 - 100 * i as u64);
        harness = harness.with_delay_for(&change.name, delay);
    }

    let dispatcher = Dispatcher::new(
        shared(ScriptedGenerator::new()),
        Arc::new(harness),
        config(4, 3),
    );
    let result = dispatcher
        .run(EvaluationUnit::expand(&changes, &[Model::Gpt4o]))
        .await
        .unwrap();

    assert_eq!(names(&result.outcomes), vec!["c0", "c1", "c2", "c3"]);
    assert_eq!(result.succeeded(), 4);
    assert_eq!(dispatcher.counters().completed(), 4);
    assert_eq!(dispatcher.counters().succeeded(), 4);
}

#[tokio::test]
async fn units_are_change_major_with_model_names() {
    let changes = vec![sample_change("a"), sample_change("b")];
    let dispatcher = Dispatcher::new(
        shared(ScriptedGenerator::new()),
        Arc::new(ScriptedHarness::always_passing()),
        config(2, 2),
    );

    let units = EvaluationUnit::expand(&changes, &[Model::Gpt4o, Model::O3]);
    let result = dispatcher.run(units).await.unwrap();

    let pairs: Vec<(String, String)> = result
        .iter()
        .map(|o| {
            (
                o.api_change.as_ref().unwrap().name.clone(),
                o.model.clone().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("a".to_string(), "gpt-4o".to_string()),
            ("a".to_string(), "o3".to_string()),
            ("b".to_string(), "gpt-4o".to_string()),
            ("b".to_string(), "o3".to_string()),
        ]
    );
}

/// Harness that records the highest number of overlapping runs.
#[derive(Default)]
struct ConcurrencyGauge {
    running: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl TestHarness for ConcurrencyGauge {
    async fn execute(
        &self,
        change: &ApiChange,
        source_code: &str,
        build_descriptor: &str,
    ) -> Result<TestOutcome, HarnessError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        let mut outcome = TestOutcome::failure(change, "");
        outcome.error_output = None;
        outcome.generated_code = Some(source_code.to_string());
        outcome.gradle_build = Some(build_descriptor.to_string());
        outcome.success = true;
        Ok(outcome)
    }
}

#[tokio::test(start_paused = true)]
async fn workers_bound_concurrent_units() {
    let gauge = Arc::new(ConcurrencyGauge::default());
    let changes: Vec<ApiChange> = (0..10).map(|i| sample_change(&format!("c{i}"))).collect();

    let dispatcher = Dispatcher::new(
        shared(ScriptedGenerator::new()),
        gauge.clone(),
        config(3, 1),
    );
    let result = dispatcher
        .run(EvaluationUnit::expand(&changes, &[Model::Gpt41]))
        .await
        .unwrap();

    assert_eq!(result.len(), 10);
    let peak = gauge.peak.load(Ordering::SeqCst);
    assert!(peak <= 3);
    assert!(peak >= 2, "units should overlap");
}

#[tokio::test]
async fn mismatched_final_outcome_is_overridden() {
    let other = sample_change("other");
    let harness = ScriptedHarness::always_passing().reporting_change(other);
    let dispatcher = Dispatcher::new(
        shared(ScriptedGenerator::new()),
        Arc::new(harness),
        config(1, 2),
    );

    let units = EvaluationUnit::expand(&[sample_change("add")], &[Model::Gpt4o]);
    let result = dispatcher.run(units).await.unwrap();

    let outcome = &result.outcomes[0];
    assert!(!outcome.success);
    assert_eq!(outcome.output.as_deref(), Some(CHANGE_MISMATCH));
    assert_eq!(dispatcher.counters().succeeded(), 0);
    assert_eq!(dispatcher.counters().completed(), 1);
}

#[tokio::test]
async fn counters_track_mixed_results() {
    let changes = vec![sample_change("a"), sample_change("b"), sample_change("c")];
    let dispatcher = Dispatcher::new(
        shared(ScriptedGenerator::new()),
        Arc::new(ScriptedHarness::passing_after(2)),
        config(1, 1),
    );

    let result = dispatcher
        .run(EvaluationUnit::expand(&changes, &[Model::Gpt4o]))
        .await
        .unwrap();

    // one worker, one iteration each: the first two runs fail
    assert_eq!(
        result.iter().map(|o| o.success).collect::<Vec<_>>(),
        vec![false, false, true]
    );
    assert_eq!(dispatcher.counters().completed(), 3);
    assert_eq!(dispatcher.counters().succeeded(), 1);
}

#[tokio::test]
async fn missing_build_tool_aborts_the_run() {
    let harness = Arc::new(ScriptedHarness::unconfigured());
    let changes: Vec<ApiChange> = (0..5).map(|i| sample_change(&format!("c{i}"))).collect();
    let dispatcher = Dispatcher::new(shared(ScriptedGenerator::new()), harness, config(1, 3));

    let err = dispatcher
        .run(EvaluationUnit::expand(&changes, &[Model::Gpt4o]))
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("GRADLE_HOME"));
    assert_eq!(dispatcher.counters().completed(), 0);
}

/// Panicking generator for one model, scripted one for the rest.
struct PanicsFor(Model);

impl GeneratorFactory for PanicsFor {
    fn for_model(&self, model: Model) -> GeneratorResult<Arc<dyn CodeGenerator>> {
        let generator = if model == self.0 {
            ScriptedGenerator::new().panicking()
        } else {
            ScriptedGenerator::new()
        };
        Ok(Arc::new(generator))
    }
}

#[tokio::test]
async fn panicking_unit_becomes_a_failing_outcome() {
    let dispatcher = Dispatcher::new(
        Arc::new(PanicsFor(Model::O1)),
        Arc::new(ScriptedHarness::always_passing()),
        config(2, 2),
    );

    let models = [Model::Gpt4o, Model::O1, Model::O3];
    let units = EvaluationUnit::expand(&[sample_change("add")], &models);
    let result = dispatcher.run(units).await.unwrap();

    assert_eq!(result.len(), 3);
    assert!(result.outcomes[0].success);
    assert!(!result.outcomes[1].success);
    assert!(result.outcomes[1]
        .error_output
        .as_deref()
        .unwrap()
        .contains("panicked"));
    assert_eq!(result.outcomes[1].model.as_deref(), Some("o1"));
    assert!(result.outcomes[2].success);
    assert_eq!(dispatcher.counters().completed(), 3);
}

#[tokio::test]
async fn empty_batch_yields_empty_result() {
    let dispatcher = Dispatcher::new(
        shared(ScriptedGenerator::new()),
        Arc::new(ScriptedHarness::always_passing()),
        DispatchConfig::default(),
    );
    let result = dispatcher.run(Vec::new()).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(dispatcher.counters().completed(), 0);
}
