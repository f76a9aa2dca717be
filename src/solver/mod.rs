//! Solver backends.
//!
//! Every backend implements [`Solver`]: it receives a complete [`Model`] and
//! returns a [`SolveOutcome`]. [`solve_model`] turns that outcome into either a
//! [`Solution`] or one of the [`PlannerError`] statuses, extracting an
//! irreducible inconsistent subsystem when the model is infeasible.

pub mod microlp;

// When built with the `gurobi` feature, expose the real implementation
#[cfg(feature = "gurobi")]
mod gurobi;
#[cfg(feature = "gurobi")]
pub use gurobi::GurobiSolver;

// Otherwise provide a stub so callers can still name the backend
#[cfg(not(feature = "gurobi"))]
mod gurobi_stub {
	use super::{SolveOutcome, Solver, SolverConfig};
	use crate::error::{PlannerError, Result};
	use crate::model::Model;

	#[derive(Debug, Clone, Default)]
	pub struct GurobiSolver;

	impl GurobiSolver {
		pub fn new() -> Self { GurobiSolver }
	}

	impl Solver for GurobiSolver {
		fn name(&self) -> &str { "gurobi" }

		fn solve(&self, _model: &Model, _config: &SolverConfig) -> Result<SolveOutcome> {
			Err(PlannerError::Backend("Gurobi feature not enabled in this build".to_string()))
		}
	}
}

#[cfg(not(feature = "gurobi"))]
pub use gurobi_stub::GurobiSolver;

pub use self::microlp::MicrolpSolver;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::diagnostics;
use crate::error::{Conflict, PlannerError, Result};
use crate::model::{ConstraintId, Model};
use crate::solution::Solution;

/// Solver configuration
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Time limit in seconds
    pub time_limit: f64,
    /// MIP gap tolerance
    pub mip_gap: f64,
    /// Number of threads (0 = automatic)
    pub threads: i32,
    /// Enable solver log output
    pub verbose: bool,
    /// Extract a conflict when the model is infeasible
    pub diagnose_infeasible: bool,
    /// Where to write the conflicting sub-model when the model is infeasible
    pub iis_path: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: 3600.0,
            mip_gap: 1e-6,
            threads: 0,
            verbose: false,
            diagnose_infeasible: true,
            iis_path: None,
        }
    }
}

/// Termination status reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    TimeLimit,
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::Unbounded => "Unbounded",
            SolveStatus::TimeLimit => "TimeLimit",
        };
        f.write_str(s)
    }
}

/// Raw result of one backend call
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Objective value including the objective constant, if an incumbent exists
    pub objective: Option<f64>,
    /// One value per model variable, if an incumbent exists
    pub values: Option<Vec<f64>>,
    /// Proven bound, when the backend reports one
    pub lower_bound: Option<f64>,
    /// Number of branch-and-bound nodes, when the backend reports it
    pub nodes_explored: Option<i64>,
    /// Wall-clock time in seconds
    pub computation_time: f64,
}

impl SolveOutcome {
    pub fn without_incumbent(status: SolveStatus, computation_time: f64) -> Self {
        SolveOutcome {
            status,
            objective: None,
            values: None,
            lower_bound: None,
            nodes_explored: None,
            computation_time,
        }
    }
}

/// A MILP solver accepting a complete model.
pub trait Solver {
    /// Backend name used in logs and reports
    fn name(&self) -> &str;

    /// Solve the model. A non-optimal termination is an `Ok` outcome; `Err` is
    /// reserved for backend failures.
    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<SolveOutcome>;

    /// Compute an irreducible inconsistent subsystem of an infeasible model.
    ///
    /// The default runs a deletion filter on top of [`Solver::solve`].
    fn compute_iis(&self, model: &Model, config: &SolverConfig) -> Result<Vec<ConstraintId>> {
        diagnostics::deletion_filter(self, model, config)
    }
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, model: &Model, config: &SolverConfig) -> Result<SolveOutcome> {
        (**self).solve(model, config)
    }

    fn compute_iis(&self, model: &Model, config: &SolverConfig) -> Result<Vec<ConstraintId>> {
        (**self).compute_iis(model, config)
    }
}

/// Solve a model and map every non-optimal status onto the error taxonomy.
///
/// A time-limited run that still produced an incumbent is returned as a
/// solution flagged `TimeLimit`; the caller decides whether to accept it.
pub fn solve_model<S: Solver + ?Sized>(model: &Model, solver: &S, config: &SolverConfig) -> Result<Solution> {
    log::info!(
        "Solving {} with {} ({} variables, {} constraints)",
        model.name,
        solver.name(),
        model.num_variables(),
        model.num_constraints()
    );
    let outcome = solver.solve(model, config)?;
    log::info!("{} finished with status {} in {:.3}s", solver.name(), outcome.status, outcome.computation_time);

    match outcome.status {
        SolveStatus::Optimal => Solution::from_outcome(outcome, solver.name()),
        SolveStatus::TimeLimit if outcome.values.is_some() => {
            log::warn!("Time limit reached; returning incumbent that is not certified optimal");
            Solution::from_outcome(outcome, solver.name())
        }
        SolveStatus::TimeLimit => Err(PlannerError::TimeLimitExceeded),
        SolveStatus::Unbounded => Err(PlannerError::Unbounded),
        SolveStatus::Infeasible if !config.diagnose_infeasible => Err(PlannerError::Infeasible(Conflict::default())),
        SolveStatus::Infeasible => {
            let conflict = diagnostics::extract_conflict(model, solver, config)?;
            log::warn!("{} is infeasible: {}", model.name, conflict);
            Err(PlannerError::Infeasible(conflict))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::model::{LinearExpr, Relation};

    /// Backend that always reports the same outcome.
    struct Canned {
        outcome: SolveOutcome,
        iis_calls: Cell<usize>,
    }

    impl Canned {
        fn new(outcome: SolveOutcome) -> Self {
            Canned { outcome, iis_calls: Cell::new(0) }
        }
    }

    impl Solver for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn solve(&self, _model: &Model, _config: &SolverConfig) -> Result<SolveOutcome> {
            Ok(self.outcome.clone())
        }

        fn compute_iis(&self, model: &Model, _config: &SolverConfig) -> Result<Vec<ConstraintId>> {
            self.iis_calls.set(self.iis_calls.get() + 1);
            Ok(model.constraint_ids())
        }
    }

    fn model() -> Model {
        let mut model = Model::new("tiny");
        let x = model.binary("x").unwrap();
        model.add_constraint("cap", LinearExpr::from(x), Relation::Le, 1.0).unwrap();
        model
    }

    fn incumbent(status: SolveStatus) -> SolveOutcome {
        SolveOutcome {
            status,
            objective: Some(3.0),
            values: Some(vec![1.0]),
            lower_bound: Some(2.0),
            nodes_explored: Some(12),
            computation_time: 0.5,
        }
    }

    #[test]
    fn test_optimal_returns_certified_solution() {
        let solution = solve_model(&model(), &Canned::new(incumbent(SolveStatus::Optimal)), &SolverConfig::default()).unwrap();
        assert!(solution.certified_optimal());
        assert_eq!(solution.objective, 3.0);
        assert_eq!(solution.backend, "canned");
    }

    #[test]
    fn test_time_limit_with_incumbent_is_uncertified() {
        let solution = solve_model(&model(), &Canned::new(incumbent(SolveStatus::TimeLimit)), &SolverConfig::default()).unwrap();
        assert_eq!(solution.status, SolveStatus::TimeLimit);
        assert!(!solution.certified_optimal());
        assert!((solution.gap().unwrap() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_limit_without_incumbent() {
        let solver = Canned::new(SolveOutcome::without_incumbent(SolveStatus::TimeLimit, 10.0));
        assert!(matches!(solve_model(&model(), &solver, &SolverConfig::default()), Err(PlannerError::TimeLimitExceeded)));
    }

    #[test]
    fn test_unbounded_is_surfaced() {
        let solver = Canned::new(SolveOutcome::without_incumbent(SolveStatus::Unbounded, 0.1));
        assert!(matches!(solve_model(&model(), &solver, &SolverConfig::default()), Err(PlannerError::Unbounded)));
    }

    #[test]
    fn test_infeasible_extracts_conflict() {
        let solver = Canned::new(SolveOutcome::without_incumbent(SolveStatus::Infeasible, 0.1));
        match solve_model(&model(), &solver, &SolverConfig::default()) {
            Err(PlannerError::Infeasible(conflict)) => {
                assert_eq!(conflict.constraints, vec!["cap".to_string()]);
                assert!(conflict.artifact.is_none());
            }
            other => panic!("expected infeasible, got {:?}", other.map(|s| s.objective)),
        }
        assert_eq!(solver.iis_calls.get(), 1);
    }

    #[test]
    fn test_infeasible_without_diagnosis_skips_extraction() {
        let solver = Canned::new(SolveOutcome::without_incumbent(SolveStatus::Infeasible, 0.1));
        let config = SolverConfig { diagnose_infeasible: false, ..Default::default() };
        match solve_model(&model(), &solver, &config) {
            Err(PlannerError::Infeasible(conflict)) => assert!(conflict.constraints.is_empty()),
            other => panic!("expected infeasible, got {:?}", other.map(|s| s.objective)),
        }
        assert_eq!(solver.iis_calls.get(), 0);
    }

    #[test]
    fn test_optimal_without_values_is_backend_error() {
        let solver = Canned::new(SolveOutcome::without_incumbent(SolveStatus::Optimal, 0.1));
        assert!(matches!(solve_model(&model(), &solver, &SolverConfig::default()), Err(PlannerError::Backend(_))));
    }
}
