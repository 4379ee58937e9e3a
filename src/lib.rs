// Kyle Model Library
//
// Numerical solver for the discretized Kyle (1985) insider-trading model:
// backward recursion with an outer fixed-point search, forward order-flow
// simulation and the closed-form single-period benchmark

pub mod model;
pub mod config;
pub mod error;       // Unified error handling
pub mod validation;  // Pre-flight validation
pub mod progress;
pub mod sink;

// Re-export model types
pub use model::{
    polynomial_roots, select_depth_root, BackwardRecursionSolver, CancellationFlag,
    CoefficientTable, CrossCheck, ForwardPath, ForwardSimulator, IterationObserver,
    IterationReport, KyleModel, ModelConfig, ModelParameters, ModelRun, MultiperiodResult,
    OnePeriodResult, Root, RootDiagnostic, RootPolicy, SolvedCoefficients, StochasticSource,
    Termination, INFORMED_PROFIT_KEY, MM_PRICE_KEY, TERMINAL_VARIANCE_STEP,
};

// Re-export error types
pub use error::{DegeneracyKind, KyleError, KyleResult};

// Re-export validation types
pub use validation::{PreFlightValidator, ValidationResult, ValidationCheck, ValidationLevel};

// Re-export configuration
pub use config::{Config, SolverConfig, LoggingConfig, ConfigError};

// Re-export progress and output
pub use progress::{ConvergenceProgress, Spinner};
pub use sink::{JsonSink, LogSink, VisualizationSink};
