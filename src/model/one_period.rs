//! Closed-form single-period market and its cross-check against the
//! discretized terminal boundary.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::parameters::ModelParameters;

pub const MM_PRICE_KEY: &str = "MM Price";
pub const INFORMED_PROFIT_KEY: &str = "Informed Profit";

/// Single-period equilibrium for one realised noise order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OnePeriodResult {
    pub alpha: f64,
    pub beta: f64,
    pub lambda: f64,
    pub informed_order: f64,
    pub net_order: f64,
    pub mm_price: f64,
    pub informed_profit: f64,
}

impl OnePeriodResult {
    /// `{"MM Price": .., "Informed Profit": ..}`
    pub fn as_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([(MM_PRICE_KEY, self.mm_price), (INFORMED_PROFIT_KEY, self.informed_profit)])
    }
}

/// Closed-form depth `sqrt(SIGMA_G) / (2 SIGMA)`
pub fn closed_form_lambda(params: &ModelParameters) -> f64 {
    params.terminal_guess_volatility().sqrt() / (2.0 * params.noise_variance())
}

pub fn one_period_price(
    params: &ModelParameters,
    terminal_value: f64,
    noise_order: f64,
) -> OnePeriodResult {
    let v0 = params.initial_value();
    let sigma = params.noise_variance();
    let root_g = params.terminal_guess_volatility().sqrt();

    let beta = sigma / root_g;
    let alpha = v0 * beta;
    let lambda = closed_form_lambda(params);

    let informed_order = beta * terminal_value + alpha;
    let net_order = informed_order + noise_order;
    let mm_price = lambda * net_order + v0;
    let informed_profit = (terminal_value - v0).powi(2) * sigma / (2.0 * root_g);

    OnePeriodResult {
        alpha,
        beta,
        lambda,
        informed_order,
        net_order,
        mm_price,
        informed_profit,
    }
}

/// Comparison of the closed-form market with the `N = 1` discretized one.
///
/// The discretized terminal depth is `sqrt(SIGMA_N) / (SIGMA sqrt(2 dT))`, so
/// with `dT = 1` and `SIGMA_N = SIGMA_G` it is exactly `sqrt(2)` times the
/// closed-form depth. Price changes driven by the same order inherit the ratio.
/// The discretized profit comes from the solved trading intensity `BETA[0]`,
/// which the recursion sets to `1 / (4 LAMBDA[1])`, so the closed-form profit
/// is `sqrt(2)` times it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossCheck {
    pub closed_form_lambda: f64,
    pub discretized_lambda: f64,
    pub closed_form_price_change: f64,
    pub discretized_price_change: f64,
    pub closed_form_profit: f64,
    /// `(V_N - V0)^2 * BETA[0]` from the single-step solve
    pub discretized_profit: f64,
}

impl CrossCheck {
    pub const EXPECTED_DEPTH_RATIO: f64 = std::f64::consts::SQRT_2;

    pub fn depth_ratio(&self) -> f64 {
        self.discretized_lambda / self.closed_form_lambda
    }

    pub fn is_consistent(&self, tolerance: f64) -> bool {
        let ratio_ok = (self.depth_ratio() - Self::EXPECTED_DEPTH_RATIO).abs() <= tolerance;
        let price_ok = (self.discretized_price_change
            - Self::EXPECTED_DEPTH_RATIO * self.closed_form_price_change)
            .abs()
            <= tolerance * self.closed_form_price_change.abs().max(1.0);
        let profit_ok = (self.closed_form_profit
            - Self::EXPECTED_DEPTH_RATIO * self.discretized_profit)
            .abs()
            <= tolerance * self.closed_form_profit.abs().max(1.0);
        ratio_ok && price_ok && profit_ok
    }
}

/// Build the cross-check from a one-pass `N = 1` solve and a shared order
pub fn cross_check(
    params: &ModelParameters,
    terminal_value: f64,
    discretized_lambda: f64,
    discretized_beta: f64,
    order: f64,
) -> CrossCheck {
    let lambda = closed_form_lambda(params);
    let closed = one_period_price(params, terminal_value, 0.0);

    CrossCheck {
        closed_form_lambda: lambda,
        discretized_lambda,
        closed_form_price_change: lambda * order,
        discretized_price_change: discretized_lambda * order,
        closed_form_profit: closed.informed_profit,
        discretized_profit: (terminal_value - params.initial_value()).powi(2) * discretized_beta,
    }
}
