//! Backend selection and solver settings.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::solver::{GurobiSolver, MicrolpSolver, Solver};

pub use crate::solver::SolverConfig;

/// Available MILP backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Pure-Rust branch and bound (always available)
    #[default]
    Microlp,
    /// Gurobi through the `grb` bindings (needs the `gurobi` feature)
    Gurobi,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Microlp => "microlp",
            Backend::Gurobi => "gurobi",
        }
    }
}

/// Create the solver for a backend
pub fn create_solver(backend: Backend) -> Box<dyn Solver> {
    match backend {
        Backend::Microlp => Box::new(MicrolpSolver::new()),
        Backend::Gurobi => Box::new(GurobiSolver::new()),
    }
}

/// Solver settings from the command-line options
pub fn solver_config(time_limit: Option<f64>, iis_path: Option<PathBuf>, verbose: bool) -> SolverConfig {
    let defaults = SolverConfig::default();
    SolverConfig {
        time_limit: time_limit.unwrap_or(defaults.time_limit),
        verbose,
        iis_path,
        ..defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_solver_names() {
        assert_eq!(create_solver(Backend::Microlp).name(), "microlp");
        assert_eq!(create_solver(Backend::Gurobi).name(), "gurobi");
        assert_eq!(Backend::default(), Backend::Microlp);
    }

    #[test]
    fn test_solver_config_overrides() {
        let config = solver_config(Some(30.0), Some(PathBuf::from("conflict.lp")), true);
        assert_eq!(config.time_limit, 30.0);
        assert!(config.verbose);
        assert!(config.diagnose_infeasible);
        assert_eq!(config.mip_gap, 1e-6);

        let config = solver_config(None, None, false);
        assert_eq!(config.time_limit, 3600.0);
        assert!(config.iis_path.is_none());
    }
}
