// End-to-end tests: configure, run the model, hand the run to a sink

mod common;

use kyle_model::{
    IterationObserver, IterationReport, JsonSink, KyleModel, LogSink, Termination,
    VisualizationSink, MM_PRICE_KEY, INFORMED_PROFIT_KEY,
};
use common::create_test_config;

#[derive(Default)]
struct Recorder {
    reports: Vec<IterationReport>,
    finished: Option<(Termination, usize)>,
}

impl IterationObserver for Recorder {
    fn on_iteration(&mut self, report: &IterationReport) {
        self.reports.push(*report);
    }

    fn on_finish(&mut self, termination: Termination, iterations: usize) {
        self.finished = Some((termination, iterations));
    }
}

#[test]
fn test_complete_run_workflow() {
    // Step 1: configuration
    let config = create_test_config();
    let params = config.model.clone().build().expect("valid parameters");

    // Step 2: run with an observer
    let mut model = KyleModel::with_optional_seed(params, config.solver.seed)
        .expect("Failed to build model")
        .with_root_policy(config.solver.root_policy);
    let mut recorder = Recorder::default();
    let run = model.run_observed(&mut recorder).expect("Run failed");

    // Step 3: the trace matches the result
    assert_eq!(recorder.reports.len(), run.multiperiod.iterations);
    assert_eq!(recorder.finished, Some((Termination::Converged, run.multiperiod.iterations)));
    let last = recorder.reports.last().expect("at least one iteration");
    assert_eq!(last.initial_variance, run.multiperiod.sigma_post[0]);
    assert!(last.gap.abs() <= run.parameters.tolerance());
    for pair in recorder.reports.windows(2) {
        assert!(pair[1].terminal_variance < pair[0].terminal_variance);
    }

    // Step 4: both sinks accept the run
    LogSink::default().consume(&run).expect("Log sink failed");

    let mut sink = JsonSink::new(Vec::new(), true);
    sink.consume(&run).expect("JSON sink failed");
    let json: serde_json::Value =
        serde_json::from_slice(&sink.into_inner()).expect("Sink output is not JSON");

    assert_eq!(json["seed"], 42);
    assert_eq!(json["multiperiod"]["iterations"], 54);
    assert_eq!(json["multiperiod"]["converged"], true);
    assert_eq!(json["multiperiod"]["termination"], "Converged");
    assert!(json["one_period"]["mm_price"].is_number());
}

#[test]
fn test_one_period_map_keys() {
    let config = create_test_config();
    let params = config.model.build().expect("valid parameters");
    let mut model = KyleModel::seeded(params, 7).expect("Failed to build model");

    let map = model.one_period_price().expect("One-period pricing failed").as_map();
    assert_eq!(map.len(), 2);
    assert!(map[MM_PRICE_KEY].is_finite());
    assert!(map[INFORMED_PROFIT_KEY] >= 0.0);
}

#[tokio::test]
async fn test_run_on_blocking_pool() {
    let params = create_test_config().model.build().expect("valid parameters");

    let run = tokio::task::spawn_blocking(move || KyleModel::seeded(params, 5)?.run())
        .await
        .expect("Task panicked")
        .expect("Run failed");

    assert!(run.multiperiod.converged);
}
