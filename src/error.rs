//! Error types for the maintenance planner.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Minimal set of constraints that cannot hold together, extracted from an
/// infeasible model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conflict {
    /// Names of the constraints in the irreducible inconsistent subsystem
    pub constraints: Vec<String>,
    /// Where the sub-model was written, if an artifact was requested
    pub artifact: Option<PathBuf>,
}

impl Conflict {
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// True if any constraint name in the conflict starts with `prefix`.
    pub fn mentions(&self, prefix: &str) -> bool {
        self.constraints.iter().any(|name| name.starts_with(prefix))
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} conflicting constraint(s): {}", self.constraints.len(), self.constraints.join(", "))?;
        if let Some(path) = &self.artifact {
            write!(f, " (written to {})", path.display())?;
        }
        Ok(())
    }
}

/// Error type for planner operations.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Problem parameters rejected before model construction.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A coefficient, bound or right-hand side is NaN or infinite.
    #[error("Non-finite value in {context}")]
    NonFinite { context: String },

    /// No assignment satisfies every constraint.
    #[error("Model is infeasible: {0}")]
    Infeasible(Conflict),

    /// The objective has no finite minimum.
    #[error("Model is unbounded (a constraint is probably missing)")]
    Unbounded,

    /// The solver hit its limit before finding any incumbent.
    #[error("Time limit exceeded without an incumbent solution")]
    TimeLimitExceeded,

    /// The backend itself failed.
    #[error("Solver error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for planner operations.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Shorthand used by the parameter validators.
pub(crate) fn invalid<T>(message: impl Into<String>) -> Result<T> {
    Err(PlannerError::InvalidParameter(message.into()))
}
