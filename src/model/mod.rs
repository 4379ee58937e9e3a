// Kyle (1985) model: parameters, randomness, backward solve and forward simulation

pub mod parameters;
pub mod stochastic;
pub mod roots;
pub mod solver;
pub mod forward;
pub mod one_period;
pub mod engine;

// Re-export commonly used types
pub use parameters::{ModelConfig, ModelParameters};
pub use stochastic::StochasticSource;
pub use roots::{polynomial_roots, select_depth_root, Root};
pub use solver::{
    BackwardRecursionSolver, CancellationFlag, CoefficientTable, IterationObserver, IterationReport,
    RootDiagnostic, RootPolicy, SolvedCoefficients, Termination, TERMINAL_VARIANCE_STEP,
};
pub use forward::{ForwardPath, ForwardSimulator};
pub use one_period::{CrossCheck, OnePeriodResult, INFORMED_PROFIT_KEY, MM_PRICE_KEY};
pub use engine::{KyleModel, ModelRun, MultiperiodResult};
