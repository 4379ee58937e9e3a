//! Pre-flight validation for model parameters
//!
//! Hard errors are already rejected when `ModelParameters` is built. These
//! checks look at combinations of valid parameters that are known to end badly
//! (a terminal variance that runs out before the budget, a loop that never
//! starts) and report them before any computation.

use crate::config::Config;
use crate::model::{ModelConfig, TERMINAL_VARIANCE_STEP};
use tracing::{error, info, warn};

/// Validation result with detailed findings
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub passed: bool,
    pub checks: Vec<ValidationCheck>,
}

#[derive(Debug, Clone)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub level: ValidationLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Critical, // Must pass for the run to proceed
    Warning,  // Run proceeds, outcome is suspect
    Info,     // Informational only
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        ValidationResult {
            passed: true,
            checks: Vec::new(),
        }
    }

    pub fn add_check(&mut self, check: ValidationCheck) {
        if !check.passed && check.level == ValidationLevel::Critical {
            self.passed = false;
        }
        self.checks.push(check);
    }

    pub fn critical_failures(&self) -> Vec<&ValidationCheck> {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.level == ValidationLevel::Critical)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationCheck> {
        self.checks
            .iter()
            .filter(|c| !c.passed && c.level == ValidationLevel::Warning)
            .collect()
    }

    pub fn display(&self) {
        info!("🔍 Pre-flight Validation");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        for check in &self.checks {
            let icon = if check.passed {
                "✅"
            } else {
                match check.level {
                    ValidationLevel::Critical => "❌",
                    ValidationLevel::Warning => "⚠️",
                    ValidationLevel::Info => "ℹ️",
                }
            };

            info!("{} {} - {}", icon, check.name, check.message);
        }

        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if !self.passed {
            let failures = self.critical_failures();
            error!("❌ Validation failed: {} critical issue(s)", failures.len());
            for failure in failures {
                error!("   • {}: {}", failure.name, failure.message);
            }
        } else {
            let warnings = self.warnings();
            if !warnings.is_empty() {
                warn!("⚠️  {} warning(s) detected", warnings.len());
                for warning in warnings {
                    warn!("   • {}: {}", warning.name, warning.message);
                }
            }
            info!("✅ All critical checks passed");
        }
    }
}

/// Pre-flight validator for a configured model run
pub struct PreFlightValidator {
    config: Config,
}

impl PreFlightValidator {
    pub fn new(config: Config) -> Self {
        PreFlightValidator { config }
    }

    /// Run full validation suite
    pub fn validate_all(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        let model = &self.config.model;

        result.add_check(self.check_parameters(model));
        result.add_check(self.check_loop_starts(model));
        result.add_check(self.check_terminal_variance_budget(model));
        result.add_check(self.check_resolution(model));
        result.add_check(self.check_seed());

        result
    }

    fn check_parameters(&self, model: &ModelConfig) -> ValidationCheck {
        match model.clone().build() {
            Ok(_) => ValidationCheck {
                name: "Parameters".to_string(),
                passed: true,
                message: format!(
                    "N={}, SIGMA_G={}, SIGMA={}, target {} ± {}",
                    model.steps,
                    model.terminal_guess_volatility,
                    model.noise_variance,
                    model.target_initial_variance,
                    model.tolerance
                ),
                level: ValidationLevel::Critical,
            },
            Err(e) => ValidationCheck {
                name: "Parameters".to_string(),
                passed: false,
                message: e.to_string(),
                level: ValidationLevel::Critical,
            },
        }
    }

    fn check_loop_starts(&self, model: &ModelConfig) -> ValidationCheck {
        // SIGMA_post[0] starts at zero, so a target inside the tolerance ends
        // the search before the first pass and leaves LAMBDA[0] at zero.
        let starts = model.target_initial_variance > model.tolerance;
        ValidationCheck {
            name: "Outer Loop".to_string(),
            passed: starts,
            message: if starts {
                "Initial variance target lies outside the tolerance band around zero".to_string()
            } else {
                format!(
                    "target_initial_variance ({}) is within tolerance ({}) of zero; no pass would run",
                    model.target_initial_variance, model.tolerance
                )
            },
            level: ValidationLevel::Critical,
        }
    }

    fn check_terminal_variance_budget(&self, model: &ModelConfig) -> ValidationCheck {
        // Passes that still start from a non-negative terminal variance
        let usable =
            (model.terminal_guess_volatility / TERMINAL_VARIANCE_STEP).floor() as usize + 1;
        if usable < model.max_iterations {
            ValidationCheck {
                name: "Terminal Variance".to_string(),
                passed: false,
                message: format!(
                    "SIGMA_G={} supports {} passes at step {}, fewer than max_iterations={}",
                    model.terminal_guess_volatility,
                    usable,
                    TERMINAL_VARIANCE_STEP,
                    model.max_iterations
                ),
                level: ValidationLevel::Warning,
            }
        } else {
            ValidationCheck {
                name: "Terminal Variance".to_string(),
                passed: true,
                message: format!("{} passes available", usable),
                level: ValidationLevel::Info,
            }
        }
    }

    fn check_resolution(&self, model: &ModelConfig) -> ValidationCheck {
        if model.steps < 2 {
            ValidationCheck {
                name: "Discretization".to_string(),
                passed: false,
                message: "N=1 has no interior periods; the forward pass only carries the terminal change"
                    .to_string(),
                level: ValidationLevel::Warning,
            }
        } else {
            ValidationCheck {
                name: "Discretization".to_string(),
                passed: true,
                message: format!("dT = {:.6}", 1.0 / model.steps as f64),
                level: ValidationLevel::Info,
            }
        }
    }

    fn check_seed(&self) -> ValidationCheck {
        match self.config.solver.seed {
            Some(seed) => ValidationCheck {
                name: "Random Source".to_string(),
                passed: true,
                message: format!("seeded with {}", seed),
                level: ValidationLevel::Info,
            },
            None => ValidationCheck {
                name: "Random Source".to_string(),
                passed: true,
                message: "seeded from entropy; runs are not reproducible".to_string(),
                level: ValidationLevel::Info,
            },
        }
    }
}
