// Model command implementations
use tracing::{error, info, warn};
use kyle_model::{
    CancellationFlag, Config, ConvergenceProgress, IterationObserver, IterationReport, JsonSink,
    KyleError, KyleModel, KyleResult, LogSink, ModelRun, PreFlightValidator, RootPolicy, Spinner,
    Termination, VisualizationSink,
};

/// Command-line overrides for `kyle solve`
pub struct SolveOptions {
    pub seed: Option<u64>,
    pub steps: Option<usize>,
    pub max_iterations: Option<usize>,
    pub json: bool,
    pub strict_roots: bool,
    pub require_convergence: bool,
}

/// Forwards the convergence trace to the progress bar and, optionally, the log
struct RunObserver {
    progress: Option<ConvergenceProgress>,
    log_iterations: bool,
}

impl IterationObserver for RunObserver {
    fn on_iteration(&mut self, report: &IterationReport) {
        if self.log_iterations {
            info!(
                "   #{:>3} SIGMA_N={:.4} SIGMA_0={:.6} gap={:+.6}",
                report.iteration, report.terminal_variance, report.initial_variance, report.gap
            );
        }
        if let Some(progress) = self.progress.as_mut() {
            progress.on_iteration(report);
        }
    }

    fn on_finish(&mut self, termination: Termination, iterations: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress.on_finish(termination, iterations);
        }
    }
}

fn apply_overrides(config: &Config, options: &SolveOptions) -> Config {
    let mut config = config.clone();
    if let Some(seed) = options.seed {
        config.solver.seed = Some(seed);
    }
    if let Some(steps) = options.steps {
        config.model.steps = steps;
    }
    if let Some(max_iterations) = options.max_iterations {
        config.model.max_iterations = max_iterations;
    }
    if options.strict_roots {
        config.solver.root_policy = RootPolicy::Strict;
    }
    config
}

fn preflight(config: &Config) -> KyleResult<()> {
    let validation = PreFlightValidator::new(config.clone()).validate_all();
    validation.display();

    if !validation.passed {
        error!("❌ Pre-flight validation failed. Cannot proceed.");
        return Err(KyleError::ConfigValidation(
            "Critical validation checks did not pass".to_string(),
        ));
    }
    Ok(())
}

pub async fn solve(options: SolveOptions, config: &Config) -> KyleResult<()> {
    let config = apply_overrides(config, &options);
    preflight(&config)?;

    let params = config.model.clone().build()?;
    let seed = config.solver.seed;
    let policy = config.solver.root_policy;
    let observer = RunObserver {
        // Keep stdout clean for JSON
        progress: (config.solver.show_progress && !options.json)
            .then(|| ConvergenceProgress::new(params.max_iterations())),
        log_iterations: config.logging.log_iterations,
    };

    let cancel = CancellationFlag::new();
    let ctrl_c_flag = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⚠️  Interrupt received, stopping after the current iteration");
            ctrl_c_flag.cancel();
        }
    });

    info!("🚀 Running Kyle model (seed: {})", seed.map_or("entropy".to_string(), |s| s.to_string()));
    let run = tokio::task::spawn_blocking(move || -> KyleResult<ModelRun> {
        let mut observer = observer;
        let mut model = KyleModel::with_optional_seed(params, seed)?
            .with_root_policy(policy)
            .with_cancellation(cancel);
        model.run_observed(&mut observer)
    })
    .await??;
    watcher.abort();

    if options.require_convergence {
        run.multiperiod.ensure_converged(&run.parameters)?;
    }

    if options.json {
        let stdout = std::io::stdout();
        JsonSink::new(stdout.lock(), true).consume(&run)?;
    } else {
        LogSink::default().consume(&run)?;
    }

    Ok(())
}

pub async fn one_period(seed: Option<u64>, config: &Config) -> KyleResult<()> {
    let params = config.model.clone().build()?;
    let seed = seed.or(config.solver.seed);
    let mut model =
        KyleModel::with_optional_seed(params, seed)?.with_root_policy(config.solver.root_policy);

    info!("📈 One-period Kyle market");
    info!("   V0: {:.4}   V_N: {:.4}", model.params().initial_value(), model.terminal_value());

    let result = model.one_period_price()?;
    for (key, value) in result.as_map() {
        info!("   {}: {:.6}", key, value);
    }

    let spinner = Spinner::new("Running single-step cross-check...");
    match model.one_period_cross_check() {
        Ok(check) => {
            spinner.finish("Cross-check complete");
            info!(
                "   LAMBDA closed form {:.6} | N=1 {:.6} | ratio {:.6} (expected {:.6})",
                check.closed_form_lambda,
                check.discretized_lambda,
                check.depth_ratio(),
                kyle_model::CrossCheck::EXPECTED_DEPTH_RATIO
            );
            info!(
                "   Profit closed form {:.6} | N=1 {:.6}",
                check.closed_form_profit, check.discretized_profit
            );
            if check.is_consistent(1e-9) {
                info!("✅ Single-step solve matches the closed form");
            } else {
                warn!("⚠️  Single-step solve deviates from the closed form");
            }
        }
        Err(e) => {
            spinner.finish_with_error(&e.to_string());
            return Err(e);
        }
    }

    Ok(())
}

pub async fn check(config: &Config) -> KyleResult<()> {
    preflight(config)
}
