use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a model, writing it out, or driving an
/// external solver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LpError {
    /// Both operands of a product carry variables.
    #[error("non-constant expressions cannot be multiplied")]
    NonConstantProduct,

    /// The divisor of an expression division carries variables.
    #[error("expressions cannot be divided by a non-constant expression")]
    NonConstantDivisor,

    /// A constraint with no variables whose constant part violates its sense.
    #[error("cannot add a trivially false constraint: {constraint}")]
    FalseConstraint { constraint: String },

    /// An element kind a problem cannot absorb.
    #[error("can only add constraints, expressions or true to a problem")]
    UnsupportedElement,

    /// A constraint name already used in the problem, with overlap forbidden.
    #[error("overlapping constraint name '{name}'")]
    DuplicateConstraint { name: String },

    /// A solution value was reported for a variable the problem never saw.
    #[error("variable '{name}' is not part of the problem")]
    UnknownVariable { name: String },

    /// An operation needed a variable value that was never assigned.
    #[error("variable '{name}' has no value")]
    MissingValue { name: String },

    /// A lower bound above the upper bound.
    #[error("inconsistent bounds for variable '{name}': {low} > {up}")]
    InconsistentBounds { name: String, low: f64, up: f64 },

    /// A name the LP/MPS formats cannot carry.
    #[error("invalid name '{name}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidName { name: String },

    /// A status word missing from the backend's translation table.
    #[error("unknown status returned by {solver}: {status}")]
    UnknownStatus { solver: &'static str, status: String },

    /// The solver executable could not be found or is not executable.
    #[error("cannot execute solver '{path}'")]
    SolverNotFound { path: PathBuf },

    /// The solver process failed to run to completion.
    #[error("error while running {solver} (exit code {code:?})")]
    SolverFailure { solver: &'static str, code: Option<i32> },

    /// The solver exited without leaving a solution file behind.
    #[error("{solver} left no solution file at '{path}'")]
    MissingSolutionFile { solver: &'static str, path: PathBuf },

    /// A solution file that does not follow the backend's documented layout.
    #[error("malformed {solver} solution file: {details}")]
    SolutionFormat { solver: &'static str, details: String },

    /// File I/O related errors.
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl LpError {
    /// Create a new unknown-status error.
    pub fn unknown_status(solver: &'static str, status: impl Into<String>) -> Self {
        Self::UnknownStatus { solver, status: status.into() }
    }

    /// Create a new malformed-solution-file error.
    pub fn solution_format(solver: &'static str, details: impl Into<String>) -> Self {
        Self::SolutionFormat { solver, details: details.into() }
    }

    /// Create a new invalid-name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Create a new duplicate-constraint error.
    pub fn duplicate_constraint(name: impl Into<String>) -> Self {
        Self::DuplicateConstraint { name: name.into() }
    }
}

/// Convert from standard I/O errors.
impl From<std::io::Error> for LpError {
    fn from(err: std::io::Error) -> Self {
        Self::Io { message: err.to_string() }
    }
}

/// Result type alias for modeler operations.
pub type LpResult<T> = Result<T, LpError>;
