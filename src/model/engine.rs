// One model instance: terminal draw, single-period pricing and the multiperiod solve

use chrono::{DateTime, Utc};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::error::{KyleError, KyleResult};
use crate::model::forward::{ForwardPath, ForwardSimulator};
use crate::model::one_period::{cross_check, one_period_price, CrossCheck, OnePeriodResult};
use crate::model::parameters::ModelParameters;
use crate::model::solver::{
    BackwardRecursionSolver, CancellationFlag, CoefficientTable, IterationObserver, NoopObserver,
    RootDiagnostic, RootPolicy, Termination,
};
use crate::model::stochastic::StochasticSource;

/// Everything the multiperiod model produces
#[derive(Debug, Clone, Serialize)]
pub struct MultiperiodResult {
    pub alpha: Array1<f64>,
    pub beta: Array1<f64>,
    pub delta: Array1<f64>,
    pub lambda: Array1<f64>,
    pub sigma_post: Array1<f64>,
    pub noise_orders: Array1<f64>,
    pub informed_orders: Array1<f64>,
    pub price_changes: Array1<f64>,
    pub cumulative_informed: Array1<f64>,
    pub cumulative_noise: Array1<f64>,
    pub price_path: Array1<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub termination: Termination,
    pub root_diagnostics: Vec<RootDiagnostic>,
}

impl MultiperiodResult {
    /// `|SIGMA_post[0] - SIGMA_T|`
    pub fn initial_variance_gap(&self, params: &ModelParameters) -> f64 {
        (self.sigma_post[0] - params.target_initial_variance()).abs()
    }

    /// Turn an unconverged run into `NonConvergence`
    pub fn ensure_converged(&self, params: &ModelParameters) -> KyleResult<&Self> {
        if self.converged {
            Ok(self)
        } else {
            Err(KyleError::NonConvergence {
                iterations: self.iterations,
                gap: self.initial_variance_gap(params),
            })
        }
    }

    fn assemble(
        table: CoefficientTable,
        noise_orders: Array1<f64>,
        path: ForwardPath,
        iterations: usize,
        termination: Termination,
        root_diagnostics: Vec<RootDiagnostic>,
    ) -> Self {
        Self {
            alpha: table.alpha,
            beta: table.beta,
            delta: table.delta,
            lambda: table.lambda,
            sigma_post: table.sigma_post,
            noise_orders,
            informed_orders: path.informed_orders,
            price_changes: path.price_changes,
            cumulative_informed: path.cumulative_informed,
            cumulative_noise: path.cumulative_noise,
            price_path: path.price_path,
            iterations,
            converged: termination == Termination::Converged,
            termination,
            root_diagnostics,
        }
    }
}

/// A complete run, handed to a visualization sink
#[derive(Debug, Clone, Serialize)]
pub struct ModelRun {
    pub generated_at: DateTime<Utc>,
    pub parameters: ModelParameters,
    pub seed: Option<u64>,
    pub terminal_value: f64,
    pub one_period: OnePeriodResult,
    pub multiperiod: MultiperiodResult,
}

pub struct KyleModel<R: Rng = StdRng> {
    params: ModelParameters,
    source: StochasticSource<R>,
    seed: Option<u64>,
    root_policy: RootPolicy,
    cancellation: Option<CancellationFlag>,
}

impl KyleModel<StdRng> {
    pub fn seeded(params: ModelParameters, seed: u64) -> KyleResult<Self> {
        let source = StochasticSource::seeded(&params, seed)?;
        Ok(Self::with_source(params, source).with_seed_label(Some(seed)))
    }

    pub fn with_optional_seed(params: ModelParameters, seed: Option<u64>) -> KyleResult<Self> {
        let source = StochasticSource::with_optional_seed(&params, seed)?;
        Ok(Self::with_source(params, source).with_seed_label(seed))
    }
}

impl<R: Rng> KyleModel<R> {
    /// Draws `V_N` from `rng` immediately
    pub fn new(params: ModelParameters, rng: R) -> KyleResult<Self> {
        let source = StochasticSource::new(&params, rng)?;
        Ok(Self::with_source(params, source))
    }

    pub fn with_source(params: ModelParameters, source: StochasticSource<R>) -> Self {
        Self {
            params,
            source,
            seed: None,
            root_policy: RootPolicy::default(),
            cancellation: None,
        }
    }

    fn with_seed_label(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_root_policy(mut self, policy: RootPolicy) -> Self {
        self.root_policy = policy;
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    pub fn terminal_value(&self) -> f64 {
        self.source.terminal_value()
    }

    /// Closed-form single-period price for a fresh noise draw
    pub fn one_period_price(&mut self) -> KyleResult<OnePeriodResult> {
        let noise = self.source.draw_one_period_noise()?;
        let result = one_period_price(&self.params, self.terminal_value(), noise);
        info!("💰 Market Maker Price: {:.6}", result.mm_price);
        info!("💰 Informed Trader Expected Profit: {:.6}", result.informed_profit);
        Ok(result)
    }

    pub fn multiperiod_price(&mut self) -> KyleResult<MultiperiodResult> {
        self.multiperiod_price_observed(&mut NoopObserver)
    }

    /// Draw noise, solve the backward recursion, then simulate forward
    pub fn multiperiod_price_observed(
        &mut self,
        observer: &mut dyn IterationObserver,
    ) -> KyleResult<MultiperiodResult> {
        let noise_orders = self.source.draw_noise_orders()?;

        let mut solver =
            BackwardRecursionSolver::new(self.params.clone()).with_root_policy(self.root_policy);
        if let Some(flag) = &self.cancellation {
            solver = solver.with_cancellation(flag.clone());
        }
        let solved = solver.solve_observed(&noise_orders, observer)?;

        let simulator = ForwardSimulator::new(self.params.initial_value(), self.terminal_value());
        let path = simulator.simulate(
            &solved.coefficients.beta,
            &solved.coefficients.lambda,
            &noise_orders,
            solved.terminal_price_change,
        )?;

        Ok(MultiperiodResult::assemble(
            solved.coefficients,
            noise_orders,
            path,
            solved.iterations,
            solved.termination,
            solved.root_diagnostics,
        ))
    }

    /// One-period price followed by the multiperiod solve, in that draw order
    pub fn run(&mut self) -> KyleResult<ModelRun> {
        self.run_observed(&mut NoopObserver)
    }

    pub fn run_observed(&mut self, observer: &mut dyn IterationObserver) -> KyleResult<ModelRun> {
        let one_period = self.one_period_price()?;
        let multiperiod = self.multiperiod_price_observed(observer)?;

        Ok(ModelRun {
            generated_at: Utc::now(),
            parameters: self.params.clone(),
            seed: self.seed,
            terminal_value: self.terminal_value(),
            one_period,
            multiperiod,
        })
    }

    /// Compare the closed-form market with a single-step discretization.
    ///
    /// Solves a copy of the model with `N = 1` for exactly one pass and drives
    /// both depths with the same one-period noise order.
    pub fn one_period_cross_check(&mut self) -> KyleResult<CrossCheck> {
        let mut single = self.params.to_config();
        single.steps = 1;
        single.max_iterations = 1;
        let single = single.build()?;

        let order = self.source.draw_one_period_noise()?;
        let noise = Array1::from(vec![0.0, order]);
        let solved = BackwardRecursionSolver::new(single.clone())
            .with_root_policy(self.root_policy)
            .solve(&noise)?;

        let table = &solved.coefficients;
        Ok(cross_check(&single, self.terminal_value(), table.lambda[1], table.beta[0], order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parameters::ModelConfig;

    #[test]
    fn test_run_lengths_and_boundaries() {
        let params = ModelConfig { steps: 10, ..Default::default() }.build().unwrap();
        let mut model = KyleModel::seeded(params, 11).unwrap();
        let run = model.run().unwrap();
        let m = &run.multiperiod;

        for seq in [
            &m.alpha, &m.beta, &m.delta, &m.lambda, &m.sigma_post, &m.noise_orders,
            &m.informed_orders, &m.price_changes, &m.cumulative_informed, &m.cumulative_noise,
            &m.price_path,
        ] {
            assert_eq!(seq.len(), 11);
        }
        assert_eq!(m.beta[10], 0.0);
        assert_eq!(m.delta[10], 0.0);
        assert_eq!(m.price_changes[0], 5.0);
        assert_eq!(m.informed_orders[0], 0.0);
        assert!(m.converged);
        assert_eq!(run.seed, Some(11));
    }

    #[test]
    fn test_unconverged_run_reports_it() {
        let params = ModelConfig {
            steps: 2,
            max_iterations: 1,
            target_initial_variance: 100.0,
            tolerance: 0.01,
            ..Default::default()
        }
        .build()
        .unwrap();
        let mut model = KyleModel::seeded(params.clone(), 1).unwrap();
        let result = model.multiperiod_price().unwrap();

        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.termination, Termination::IterationBudgetExhausted);
        assert!(matches!(
            result.ensure_converged(&params),
            Err(KyleError::NonConvergence { iterations: 1, .. })
        ));
    }

    #[test]
    fn test_cross_check_holds() {
        let mut model = KyleModel::seeded(ModelParameters::default(), 5).unwrap();
        let check = model.one_period_cross_check().unwrap();
        assert!(check.is_consistent(1e-9), "{:?}", check);

        // BETA[0] of the one-pass solve is 1 / (4 LAMBDA[1])
        let gap = model.terminal_value() - 5.0;
        let expected = gap * gap / (4.0 * check.discretized_lambda);
        assert!((check.discretized_profit - expected).abs() < 1e-12);
    }
}
