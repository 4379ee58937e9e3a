// Forward simulation of order flow and prices from solved coefficients

use ndarray::Array1;
use serde::Serialize;

use crate::error::{KyleError, KyleResult};

/// Informed orders, price changes and cumulative flows, each of length `N + 1`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardPath {
    pub informed_orders: Array1<f64>,
    pub price_changes: Array1<f64>,
    pub cumulative_informed: Array1<f64>,
    pub cumulative_noise: Array1<f64>,
    /// Running sum of `price_changes`, starting at `V0`
    pub price_path: Array1<f64>,
}

pub struct ForwardSimulator {
    initial_value: f64,
    terminal_value: f64,
}

impl ForwardSimulator {
    pub fn new(initial_value: f64, terminal_value: f64) -> Self {
        Self { initial_value, terminal_value }
    }

    /// Walk periods `1..N-1`, each informed order trading on the gap between
    /// `V_N` and the cumulative price so far.
    pub fn simulate(
        &self,
        beta: &Array1<f64>,
        lambda: &Array1<f64>,
        noise_orders: &Array1<f64>,
        terminal_price_change: f64,
    ) -> KyleResult<ForwardPath> {
        let len = noise_orders.len();
        if len < 2 || beta.len() != len || lambda.len() != len {
            return Err(KyleError::InvalidParameter(
                "sequences".to_string(),
                format!(
                    "beta, lambda and noise must share a length of at least 2 (got {}, {}, {})",
                    beta.len(),
                    lambda.len(),
                    len
                ),
            ));
        }
        let n = len - 1;

        let mut informed_orders = Array1::zeros(len);
        let mut price_changes = Array1::zeros(len);
        price_changes[0] = self.initial_value;
        price_changes[n] = terminal_price_change;

        // sum of price_changes[0..i]
        let mut cumulative_price = price_changes[0];
        for i in 1..n {
            informed_orders[i] = beta[i] * (self.terminal_value - cumulative_price) / n as f64;
            price_changes[i + 1] = lambda[i + 1] * (informed_orders[i] + noise_orders[i]);
            cumulative_price += price_changes[i];
        }

        Ok(ForwardPath {
            cumulative_informed: cumulative_sum(&informed_orders),
            cumulative_noise: cumulative_sum(noise_orders),
            price_path: cumulative_sum(&price_changes),
            informed_orders,
            price_changes,
        })
    }
}

pub fn cumulative_sum(values: &Array1<f64>) -> Array1<f64> {
    let mut running = 0.0;
    values.mapv(|x| {
        running += x;
        running
    })
}
