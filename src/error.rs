//! Unified error handling for the Kyle model solver
//!
//! Every fallible operation in the crate returns `KyleResult<T>`. Numerical
//! failures carry the period index at which the recursion broke down so the
//! caller can see where the coefficient chain stopped being well defined.

use std::fmt;
use std::io;

/// Why a backward-recursion step could not be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegeneracyKind {
    /// `LAMBDA[n]` is zero
    ZeroPriceImpact,
    /// `SIGMA_post[n]` is zero
    ZeroPosteriorVariance,
    /// The terminal variance was stepped below zero
    NegativeTerminalVariance,
    /// `BETA[n] * LAMBDA[n] == 1`
    UnitBetaLambda,
    /// `1 - ALPHA[n] * LAMBDA[n] * dT == 0`
    VarianceUpdateDenominator,
    /// The depth polynomial has no roots at all
    NoRoot,
    /// A coefficient came out as NaN or infinite
    NonFinite,
}

impl fmt::Display for DegeneracyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DegeneracyKind::ZeroPriceImpact => "price impact LAMBDA is zero",
            DegeneracyKind::ZeroPosteriorVariance => "posterior variance is zero",
            DegeneracyKind::NegativeTerminalVariance => "terminal variance stepped below zero",
            DegeneracyKind::UnitBetaLambda => "BETA * LAMBDA equals one",
            DegeneracyKind::VarianceUpdateDenominator => "variance update denominator is zero",
            DegeneracyKind::NoRoot => "depth polynomial has no roots",
            DegeneracyKind::NonFinite => "coefficient is not finite",
        };
        f.write_str(text)
    }
}

/// Main error type for the Kyle model
#[derive(Debug)]
pub enum KyleError {
    // Parameter errors
    InvalidParameter(String, String), // (parameter_name, reason)

    // Numerical errors
    NumericalDegeneracy { index: usize, kind: DegeneracyKind },
    NonConvergence { iterations: usize, gap: f64 },
    ComplexRootAmbiguity { index: usize, re: f64, im: f64 },
    Cancelled { iterations: usize },

    // Configuration errors
    ConfigNotFound(String),
    ConfigParse(String),
    ConfigValidation(String),

    // IO errors
    FileRead(String),
    FileWrite(String),

    // General errors
    Internal(String),
}

impl KyleError {
    /// Get a user-friendly error message with helpful context
    pub fn user_message(&self) -> String {
        match self {
            KyleError::ConfigNotFound(path) => {
                format!(
                    "Configuration file not found: {}\n\n\
                    💡 Quick fix:\n\
                    1. Run: kyle init\n\
                    2. Edit kyle.toml\n\
                    3. Try again",
                    path
                )
            }
            KyleError::NumericalDegeneracy { index, kind } => {
                format!(
                    "Backward recursion broke down at period {}: {}\n\n\
                    💡 Try:\n\
                    - A larger terminal_guess_volatility\n\
                    - A looser tolerance or smaller max_iterations\n\
                    - Running `kyle check` to see parameter warnings",
                    index, kind
                )
            }
            KyleError::NonConvergence { iterations, gap } => {
                format!(
                    "Initial variance did not reach its target after {} iterations (gap {:.6})\n\n\
                    💡 Either:\n\
                    - Increase max_iterations\n\
                    - Loosen tolerance",
                    iterations, gap
                )
            }
            KyleError::ComplexRootAmbiguity { index, re, im } => {
                format!(
                    "Depth root at period {} is not real and positive ({} {:+}i)\n\n\
                    💡 Rerun with root_policy = \"warn\" to keep the real part",
                    index, re, im
                )
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            KyleError::InvalidParameter(_, _) => "parameter",

            KyleError::NumericalDegeneracy { .. }
            | KyleError::NonConvergence { .. }
            | KyleError::ComplexRootAmbiguity { .. } => "numerical",

            KyleError::Cancelled { .. } => "cancelled",

            KyleError::ConfigNotFound(_)
            | KyleError::ConfigParse(_)
            | KyleError::ConfigValidation(_) => "config",

            KyleError::FileRead(_) | KyleError::FileWrite(_) => "io",

            KyleError::Internal(_) => "internal",
        }
    }

    /// Index of the period where the recursion failed, if any
    pub fn period_index(&self) -> Option<usize> {
        match self {
            KyleError::NumericalDegeneracy { index, .. }
            | KyleError::ComplexRootAmbiguity { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for KyleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KyleError::InvalidParameter(param, reason) => {
                write!(f, "Invalid parameter '{}': {}", param, reason)
            }

            KyleError::NumericalDegeneracy { index, kind } => {
                write!(f, "Numerical degeneracy at period {}: {}", index, kind)
            }
            KyleError::NonConvergence { iterations, gap } => {
                write!(f, "No convergence after {} iterations (gap {:.6})", iterations, gap)
            }
            KyleError::ComplexRootAmbiguity { index, re, im } => {
                write!(f, "Inadmissible depth root at period {}: {} {:+}i", index, re, im)
            }
            KyleError::Cancelled { iterations } => {
                write!(f, "Solver cancelled after {} iterations", iterations)
            }

            KyleError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path)
            }
            KyleError::ConfigParse(msg) => {
                write!(f, "Configuration parse error: {}", msg)
            }
            KyleError::ConfigValidation(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }

            KyleError::FileRead(msg) => {
                write!(f, "File read error: {}", msg)
            }
            KyleError::FileWrite(msg) => {
                write!(f, "File write error: {}", msg)
            }

            KyleError::Internal(msg) => {
                write!(f, "Internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for KyleError {}

// Conversion implementations for common error types

impl From<io::Error> for KyleError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => KyleError::ConfigNotFound(err.to_string()),
            io::ErrorKind::PermissionDenied => KyleError::FileRead(err.to_string()),
            _ => KyleError::Internal(format!("IO error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for KyleError {
    fn from(err: serde_json::Error) -> Self {
        KyleError::FileWrite(format!("JSON encode error: {}", err))
    }
}

impl From<toml::de::Error> for KyleError {
    fn from(err: toml::de::Error) -> Self {
        KyleError::ConfigParse(format!("TOML parse error: {}", err))
    }
}

impl From<crate::config::ConfigError> for KyleError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::FileRead(msg) => KyleError::FileRead(msg),
            ConfigError::FileWrite(msg) => KyleError::FileWrite(msg),
            ConfigError::Parse(msg) => KyleError::ConfigParse(msg),
            ConfigError::Serialize(msg) => KyleError::Internal(msg),
            ConfigError::Validation(msg) => KyleError::ConfigValidation(msg),
        }
    }
}

impl From<tokio::task::JoinError> for KyleError {
    fn from(err: tokio::task::JoinError) -> Self {
        KyleError::Internal(format!("Solver task failed: {}", err))
    }
}

/// Result type alias using KyleError
pub type KyleResult<T> = Result<T, KyleError>;

/// Helper macro for creating context-rich errors
#[macro_export]
macro_rules! kyle_error {
    (invalid_param, $param:expr, $reason:expr) => {
        $crate::error::KyleError::InvalidParameter($param.to_string(), $reason.to_string())
    };
    (degenerate, $index:expr, $kind:ident) => {
        $crate::error::KyleError::NumericalDegeneracy {
            index: $index,
            kind: $crate::error::DegeneracyKind::$kind,
        }
    };
}
