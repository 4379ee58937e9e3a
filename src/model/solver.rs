//! Backward recursion for the discretized Kyle equilibrium.
//!
//! The terminal posterior variance `SIGMA_post[N]` is unknown. Starting from
//! the guess `SIGMA_G`, each outer iteration sets the terminal boundary, runs
//! the coupled recursion from period `N` down to `1`, and compares the
//! resulting initial variance `SIGMA_post[0]` with its target. The terminal
//! variance is then lowered by a fixed step and the pass repeats until the gap
//! is within tolerance, the iteration budget runs out, or the run is cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{KyleError, KyleResult};
use crate::kyle_error;
use crate::model::parameters::ModelParameters;
use crate::model::roots::{polynomial_roots, select_depth_root, Root};

/// Amount the terminal variance is lowered between outer iterations
pub const TERMINAL_VARIANCE_STEP: f64 = 0.007;

/// What to do when the selected depth root is complex or non-positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootPolicy {
    /// Log, record a diagnostic, and keep the real part
    #[default]
    Warn,
    /// Abort with `ComplexRootAmbiguity`
    Strict,
}

/// How the outer loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    Converged,
    IterationBudgetExhausted,
    Cancelled,
}

/// Cooperative stop signal checked once per outer iteration
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State after one completed outer iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    pub iteration: usize,
    /// Terminal variance that was used for this pass
    pub terminal_variance: f64,
    pub initial_variance: f64,
    /// `SIGMA_post[0] - SIGMA_T`
    pub gap: f64,
}

/// Receives the convergence trace of the outer loop
pub trait IterationObserver {
    fn on_iteration(&mut self, report: &IterationReport);

    fn on_finish(&mut self, _termination: Termination, _iterations: usize) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl IterationObserver for NoopObserver {
    fn on_iteration(&mut self, _report: &IterationReport) {}
}

/// The five time-indexed coefficient sequences, allocated once per solve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientTable {
    pub alpha: Array1<f64>,
    pub beta: Array1<f64>,
    pub delta: Array1<f64>,
    pub lambda: Array1<f64>,
    pub sigma_post: Array1<f64>,
}

impl CoefficientTable {
    pub fn zeros(len: usize) -> Self {
        Self {
            alpha: Array1::zeros(len),
            beta: Array1::zeros(len),
            delta: Array1::zeros(len),
            lambda: Array1::zeros(len),
            sigma_post: Array1::zeros(len),
        }
    }

    pub fn len(&self) -> usize {
        self.lambda.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lambda.is_empty()
    }
}

/// An inadmissible depth root that was kept under `RootPolicy::Warn`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootDiagnostic {
    pub iteration: usize,
    pub index: usize,
    pub re: f64,
    pub im: f64,
}

/// Output of the backward solver
#[derive(Debug, Clone, Serialize)]
pub struct SolvedCoefficients {
    pub coefficients: CoefficientTable,
    /// `price_changes[N]` from the last terminal boundary
    pub terminal_price_change: f64,
    pub iterations: usize,
    pub termination: Termination,
    pub root_diagnostics: Vec<RootDiagnostic>,
}

impl SolvedCoefficients {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Coefficients of the cubic whose root gives `LAMBDA[n-1]`, highest degree first
pub fn depth_polynomial(
    beta: f64,
    posterior_variance: f64,
    noise_variance: f64,
    dt: f64,
) -> [f64; 4] {
    let sigma2 = noise_variance * noise_variance;
    [
        (sigma2 * beta * dt) / posterior_variance,
        -(sigma2 * dt) / posterior_variance,
        -beta,
        0.5,
    ]
}

pub struct BackwardRecursionSolver {
    params: ModelParameters,
    root_policy: RootPolicy,
    cancellation: Option<CancellationFlag>,
}

impl BackwardRecursionSolver {
    pub fn new(params: ModelParameters) -> Self {
        Self {
            params,
            root_policy: RootPolicy::default(),
            cancellation: None,
        }
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

    pub fn solve(&self, noise_orders: &Array1<f64>) -> KyleResult<SolvedCoefficients> {
        self.solve_observed(noise_orders, &mut NoopObserver)
    }

    /// Run the outer search, reporting every completed iteration to `observer`
    pub fn solve_observed(
        &self,
        noise_orders: &Array1<f64>,
        observer: &mut dyn IterationObserver,
    ) -> KyleResult<SolvedCoefficients> {
        let n = self.params.steps();
        if noise_orders.len() != n + 1 {
            return Err(KyleError::InvalidParameter(
                "noise_orders".to_string(),
                format!("expected {} samples, got {}", n + 1, noise_orders.len()),
            ));
        }

        let target = self.params.target_initial_variance();
        let tolerance = self.params.tolerance();
        let max_iterations = self.params.max_iterations();

        info!(
            "🔁 Solving backward recursion: N={}, SIGMA_G={}, target SIGMA_0={} ± {}",
            n,
            self.params.terminal_guess_volatility(),
            target,
            tolerance
        );

        let mut table = CoefficientTable::zeros(n + 1);
        table.sigma_post[n] = self.params.terminal_guess_volatility();

        let mut terminal_price_change = 0.0;
        let mut diagnostics = Vec::new();
        let mut iterations = 0;

        let termination = loop {
            if (table.sigma_post[0] - target).abs() <= tolerance {
                break Termination::Converged;
            }
            if iterations >= max_iterations {
                break Termination::IterationBudgetExhausted;
            }
            if self.cancellation.as_ref().map_or(false, CancellationFlag::is_cancelled) {
                break Termination::Cancelled;
            }

            let terminal_variance = table.sigma_post[n];
            terminal_price_change = self.set_terminal_boundary(&mut table, noise_orders[n])?;
            self.backward_pass(&mut table, iterations, &mut diagnostics)?;

            table.sigma_post[n] -= TERMINAL_VARIANCE_STEP;
            iterations += 1;

            let report = IterationReport {
                iteration: iterations,
                terminal_variance,
                initial_variance: table.sigma_post[0],
                gap: table.sigma_post[0] - target,
            };
            debug!(
                "Iteration {}: SIGMA_N={:.4} SIGMA_0={:.6} gap={:+.6}",
                report.iteration, report.terminal_variance, report.initial_variance, report.gap
            );
            observer.on_iteration(&report);
        };

        observer.on_finish(termination, iterations);

        if termination == Termination::Cancelled && iterations == 0 {
            return Err(KyleError::Cancelled { iterations });
        }

        self.close_initial_period(&mut table)?;

        match termination {
            Termination::Converged => {
                info!(
                    "✅ Converged after {} iterations (SIGMA_0={:.6})",
                    iterations, table.sigma_post[0]
                );
            }
            Termination::IterationBudgetExhausted => {
                warn!(
                    "⚠️  No convergence within {} iterations (SIGMA_0={:.6}, target {})",
                    iterations, table.sigma_post[0], target
                );
            }
            Termination::Cancelled => {
                warn!("⚠️  Cancelled after {} iterations", iterations);
            }
        }

        Ok(SolvedCoefficients {
            coefficients: table,
            terminal_price_change,
            iterations,
            termination,
            root_diagnostics: diagnostics,
        })
    }

    /// `BETA[N] = DELTA[N] = 0` and `LAMBDA[N]` from the current terminal variance
    fn set_terminal_boundary(
        &self,
        table: &mut CoefficientTable,
        terminal_noise: f64,
    ) -> KyleResult<f64> {
        let n = self.params.steps();
        let variance = table.sigma_post[n];
        if !variance.is_finite() {
            return Err(kyle_error!(degenerate, n, NonFinite));
        }
        if variance < 0.0 {
            return Err(kyle_error!(degenerate, n, NegativeTerminalVariance));
        }

        let dt = self.params.time_step();
        table.beta[n] = 0.0;
        table.delta[n] = 0.0;
        table.lambda[n] = variance.sqrt() / (self.params.noise_variance() * (2.0 * dt).sqrt());

        Ok(table.lambda[n] * terminal_noise)
    }

    /// One sweep from period `N` down to `1`, each step writing index `n - 1`
    fn backward_pass(
        &self,
        table: &mut CoefficientTable,
        iteration: usize,
        diagnostics: &mut Vec<RootDiagnostic>,
    ) -> KyleResult<()> {
        let dt = self.params.time_step();
        let sigma = self.params.noise_variance();
        let sigma2 = sigma * sigma;

        for n in (1..=self.params.steps()).rev() {
            let lambda = table.lambda[n];
            let variance = table.sigma_post[n];
            let beta = table.beta[n];

            if !(lambda.is_finite() && variance.is_finite() && beta.is_finite()) {
                return Err(kyle_error!(degenerate, n, NonFinite));
            }
            if lambda == 0.0 {
                return Err(kyle_error!(degenerate, n, ZeroPriceImpact));
            }
            if variance == 0.0 {
                return Err(kyle_error!(degenerate, n, ZeroPosteriorVariance));
            }
            let impact_gap = 1.0 - beta * lambda;
            if impact_gap == 0.0 {
                return Err(kyle_error!(degenerate, n, UnitBetaLambda));
            }

            let alpha = lambda * sigma2 / variance;
            let update = 1.0 - alpha * lambda * dt;
            if update == 0.0 {
                return Err(kyle_error!(degenerate, n, VarianceUpdateDenominator));
            }

            table.alpha[n] = alpha;
            table.sigma_post[n - 1] = variance / update;

            let aggressiveness = 1.0 / (4.0 * lambda * impact_gap);
            table.beta[n - 1] = aggressiveness;
            // DELTA shares the BETA recursion
            table.delta[n - 1] = aggressiveness;

            let root = self.depth_root(n, beta, variance, iteration, diagnostics)?;
            table.lambda[n - 1] = root.re;

            if !(table.sigma_post[n - 1].is_finite() && table.lambda[n - 1].is_finite()) {
                return Err(kyle_error!(degenerate, n - 1, NonFinite));
            }
        }

        Ok(())
    }

    fn depth_root(
        &self,
        n: usize,
        beta: f64,
        variance: f64,
        iteration: usize,
        diagnostics: &mut Vec<RootDiagnostic>,
    ) -> KyleResult<Root> {
        let coefficients =
            depth_polynomial(beta, variance, self.params.noise_variance(), self.params.time_step());
        let roots = polynomial_roots(&coefficients);
        let root = select_depth_root(&roots).ok_or_else(|| kyle_error!(degenerate, n - 1, NoRoot))?;

        if !root.is_admissible_depth() {
            match self.root_policy {
                RootPolicy::Strict => {
                    return Err(KyleError::ComplexRootAmbiguity {
                        index: n - 1,
                        re: root.re,
                        im: root.im,
                    });
                }
                RootPolicy::Warn => {
                    warn!(
                        "⚠️  Depth root for period {} is not real and positive ({} {:+}i), keeping real part",
                        n - 1,
                        root.re,
                        root.im
                    );
                    diagnostics.push(RootDiagnostic {
                        iteration,
                        index: n - 1,
                        re: root.re,
                        im: root.im,
                    });
                }
            }
        }

        Ok(root)
    }

    fn close_initial_period(&self, table: &mut CoefficientTable) -> KyleResult<()> {
        let lambda = table.lambda[0];
        let beta = table.beta[0];
        if lambda == 0.0 {
            return Err(kyle_error!(degenerate, 0, ZeroPriceImpact));
        }
        let impact_gap = 1.0 - beta * lambda;
        if impact_gap == 0.0 {
            return Err(kyle_error!(degenerate, 0, UnitBetaLambda));
        }

        let dt = self.params.time_step();
        table.alpha[0] = (1.0 - 2.0 * beta * lambda) / (dt * (2.0 * lambda) * impact_gap);
        if !table.alpha[0].is_finite() {
            return Err(kyle_error!(degenerate, 0, NonFinite));
        }
        Ok(())
    }
}
