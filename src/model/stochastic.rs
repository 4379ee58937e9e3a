// Random draws for one model instance: the terminal value and noise order flow

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::error::{KyleError, KyleResult};
use crate::model::parameters::ModelParameters;

/// Supplies `V_N` and the noise-trader order flow from an injected generator
pub struct StochasticSource<R: Rng = StdRng> {
    rng: R,
    terminal_value: f64,
    noise_variance: f64,
    steps: usize,
}

impl StochasticSource<StdRng> {
    /// Deterministic source, reproducible for a given seed
    pub fn seeded(params: &ModelParameters, seed: u64) -> KyleResult<Self> {
        Self::new(params, StdRng::seed_from_u64(seed))
    }

    /// Source seeded from OS entropy
    pub fn from_entropy(params: &ModelParameters) -> KyleResult<Self> {
        Self::new(params, StdRng::from_entropy())
    }

    /// Seeded when `seed` is given, entropy otherwise
    pub fn with_optional_seed(params: &ModelParameters, seed: Option<u64>) -> KyleResult<Self> {
        match seed {
            Some(s) => Self::seeded(params, s),
            None => Self::from_entropy(params),
        }
    }
}

impl<R: Rng> StochasticSource<R> {
    /// Draws `V_N ~ Normal(terminal_mean, SIGMA_G)` once; it never changes afterwards.
    pub fn new(params: &ModelParameters, mut rng: R) -> KyleResult<Self> {
        let sigma_g = params.terminal_guess_volatility();
        if sigma_g.is_nan() || sigma_g <= 0.0 {
            return Err(KyleError::InvalidParameter(
                "terminal_guess_volatility".to_string(),
                format!("must be strictly positive, got {}", sigma_g),
            ));
        }
        if params.steps() == 0 {
            return Err(KyleError::InvalidParameter(
                "steps".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let terminal = normal(params.terminal_mean(), sigma_g, "terminal_guess_volatility")?;
        let terminal_value = terminal.sample(&mut rng);
        debug!("Drew terminal value V_N = {:.6}", terminal_value);

        Ok(Self {
            rng,
            terminal_value,
            noise_variance: params.noise_variance(),
            steps: params.steps(),
        })
    }

    pub fn terminal_value(&self) -> f64 {
        self.terminal_value
    }

    /// `N + 1` independent noise orders with standard deviation `SIGMA^2 / N`
    pub fn draw_noise_orders(&mut self) -> KyleResult<Array1<f64>> {
        let scale = self.noise_variance.powi(2) / self.steps as f64;
        let dist = normal(0.0, scale, "noise_variance")?;
        let rng = &mut self.rng;
        Ok(Array1::from_shape_fn(self.steps + 1, |_| dist.sample(&mut *rng)))
    }

    /// Single noise order for the one-period market, standard deviation `SIGMA`
    pub fn draw_one_period_noise(&mut self) -> KyleResult<f64> {
        let dist = normal(0.0, self.noise_variance, "noise_variance")?;
        Ok(dist.sample(&mut self.rng))
    }
}

fn normal(mean: f64, std_dev: f64, name: &str) -> KyleResult<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| {
        KyleError::InvalidParameter(name.to_string(), format!("invalid normal distribution: {}", e))
    })
}
