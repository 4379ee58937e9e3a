// Model inputs: the raw, serde-friendly config and its validated form

use serde::{Deserialize, Serialize};
use crate::error::{KyleError, KyleResult};

/// Raw model inputs as they appear in `[model]` of the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_initial_value")]
    pub initial_value: f64,             // V0
    #[serde(default = "default_terminal_mean")]
    pub terminal_mean: f64,             // mean used when drawing V_N
    #[serde(default = "default_terminal_guess_volatility")]
    pub terminal_guess_volatility: f64, // SIGMA_G
    #[serde(default = "default_target_initial_variance")]
    pub target_initial_variance: f64,   // SIGMA_T
    #[serde(default = "default_noise_variance")]
    pub noise_variance: f64,            // SIGMA
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,                 // ERR
    #[serde(default = "default_steps")]
    pub steps: usize,                   // N
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,          // MAX_ITER
}

fn default_initial_value() -> f64 { 5.0 }
fn default_terminal_mean() -> f64 { 5.0 }
fn default_terminal_guess_volatility() -> f64 { 0.4 }
fn default_target_initial_variance() -> f64 { 0.2 }
fn default_noise_variance() -> f64 { 2.0 }
fn default_tolerance() -> f64 { 0.05 }
fn default_steps() -> usize { 50 }
fn default_max_iterations() -> usize { 100 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            initial_value: default_initial_value(),
            terminal_mean: default_terminal_mean(),
            terminal_guess_volatility: default_terminal_guess_volatility(),
            target_initial_variance: default_target_initial_variance(),
            noise_variance: default_noise_variance(),
            tolerance: default_tolerance(),
            steps: default_steps(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl ModelConfig {
    /// Validate and freeze into `ModelParameters`
    pub fn build(self) -> KyleResult<ModelParameters> {
        ModelParameters::try_from(self)
    }
}

/// Immutable, validated inputs for one model run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelParameters {
    initial_value: f64,
    terminal_mean: f64,
    terminal_guess_volatility: f64,
    target_initial_variance: f64,
    noise_variance: f64,
    tolerance: f64,
    steps: usize,
    max_iterations: usize,
}

impl ModelParameters {
    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    pub fn terminal_mean(&self) -> f64 {
        self.terminal_mean
    }

    pub fn terminal_guess_volatility(&self) -> f64 {
        self.terminal_guess_volatility
    }

    pub fn target_initial_variance(&self) -> f64 {
        self.target_initial_variance
    }

    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Discretization step `dT = 1/N`
    pub fn time_step(&self) -> f64 {
        1.0 / self.steps as f64
    }

    /// Length of every time-indexed sequence (`N + 1`)
    pub fn sequence_len(&self) -> usize {
        self.steps + 1
    }

    /// Back to the editable form
    pub fn to_config(&self) -> ModelConfig {
        ModelConfig {
            initial_value: self.initial_value,
            terminal_mean: self.terminal_mean,
            terminal_guess_volatility: self.terminal_guess_volatility,
            target_initial_variance: self.target_initial_variance,
            noise_variance: self.noise_variance,
            tolerance: self.tolerance,
            steps: self.steps,
            max_iterations: self.max_iterations,
        }
    }
}

impl Default for ModelParameters {
    fn default() -> Self {
        let config = ModelConfig::default();
        Self {
            initial_value: config.initial_value,
            terminal_mean: config.terminal_mean,
            terminal_guess_volatility: config.terminal_guess_volatility,
            target_initial_variance: config.target_initial_variance,
            noise_variance: config.noise_variance,
            tolerance: config.tolerance,
            steps: config.steps,
            max_iterations: config.max_iterations,
        }
    }
}

impl TryFrom<ModelConfig> for ModelParameters {
    type Error = KyleError;

    fn try_from(config: ModelConfig) -> KyleResult<Self> {
        if config.steps == 0 {
            return Err(crate::kyle_error!(invalid_param, "steps", "must be a positive integer"));
        }
        if config.max_iterations == 0 {
            return Err(crate::kyle_error!(
                invalid_param,
                "max_iterations",
                "must be a positive integer"
            ));
        }

        require_positive("terminal_guess_volatility", config.terminal_guess_volatility)?;
        require_positive("noise_variance", config.noise_variance)?;
        require_positive("target_initial_variance", config.target_initial_variance)?;
        require_positive("tolerance", config.tolerance)?;
        require_positive("initial_value", config.initial_value)?;
        require_positive("terminal_mean", config.terminal_mean)?;

        Ok(Self {
            initial_value: config.initial_value,
            terminal_mean: config.terminal_mean,
            terminal_guess_volatility: config.terminal_guess_volatility,
            target_initial_variance: config.target_initial_variance,
            noise_variance: config.noise_variance,
            tolerance: config.tolerance,
            steps: config.steps,
            max_iterations: config.max_iterations,
        })
    }
}

fn require_positive(name: &str, value: f64) -> KyleResult<()> {
    if !value.is_finite() {
        return Err(crate::kyle_error!(
            invalid_param,
            name,
            format!("must be finite, got {}", value)
        ));
    }
    if value <= 0.0 {
        return Err(crate::kyle_error!(
            invalid_param,
            name,
            format!("must be strictly positive, got {}", value)
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_run() {
        let params = ModelParameters::default();
        assert_eq!(params.initial_value(), 5.0);
        assert_eq!(params.terminal_mean(), 5.0);
        assert_eq!(params.terminal_guess_volatility(), 0.4);
        assert_eq!(params.target_initial_variance(), 0.2);
        assert_eq!(params.noise_variance(), 2.0);
        assert_eq!(params.tolerance(), 0.05);
        assert_eq!(params.steps(), 50);
        assert_eq!(params.max_iterations(), 100);
        assert_eq!(params.sequence_len(), 51);
        assert!((params.time_step() - 0.02).abs() < 1e-15);
    }

    #[test]
    fn test_default_config_builds() {
        let params = ModelConfig::default().build().expect("defaults are valid");
        assert_eq!(params, ModelParameters::default());
        assert_eq!(params.to_config(), ModelConfig::default());
    }

    #[test]
    fn test_zero_steps_rejected() {
        let err = ModelConfig { steps: 0, ..Default::default() }.build().unwrap_err();
        assert!(matches!(err, KyleError::InvalidParameter(ref name, _) if name == "steps"));
    }

    #[test]
    fn test_zero_iteration_budget_rejected() {
        let err = ModelConfig { max_iterations: 0, ..Default::default() }.build().unwrap_err();
        assert!(matches!(
            err,
            KyleError::InvalidParameter(ref name, _) if name == "max_iterations"
        ));
    }

    #[test]
    fn test_non_positive_volatilities_rejected() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err =
                ModelConfig { noise_variance: bad, ..Default::default() }.build().unwrap_err();
            assert!(matches!(
                err,
                KyleError::InvalidParameter(ref name, _) if name == "noise_variance"
            ));

            let err = ModelConfig { terminal_guess_volatility: bad, ..Default::default() }
                .build()
                .unwrap_err();
            assert!(matches!(
                err,
                KyleError::InvalidParameter(ref name, _) if name == "terminal_guess_volatility"
            ));
        }
    }
}
