// Common test utilities and helpers
#![allow(dead_code)]

use kyle_model::{Config, ModelConfig, ModelParameters};
use tempfile::TempDir;
use std::path::PathBuf;

/// Parameters that converge (N=10 reaches the target after 54 iterations)
pub fn solvable_config() -> ModelConfig {
    ModelConfig {
        steps: 10,
        ..Default::default()
    }
}

pub fn solvable_params() -> ModelParameters {
    solvable_config().build().expect("valid parameters")
}

/// Parameters with an unreachable target, so every run uses the whole budget
pub fn budget_bound_params(steps: usize, max_iterations: usize) -> ModelParameters {
    ModelConfig {
        steps,
        max_iterations,
        target_initial_variance: 100.0,
        tolerance: 0.01,
        ..Default::default()
    }
    .build()
    .expect("valid parameters")
}

/// Create a test configuration with a fixed seed
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.model = solvable_config();
    config.solver.seed = Some(42);
    config.solver.show_progress = false;
    config
}

/// Create a temporary directory holding a config path
pub fn create_temp_config_path() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("kyle.toml");
    (temp_dir, path)
}
