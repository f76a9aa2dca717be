//! Predictive-Maintenance Planner Library
//!
//! Schedules component replacements as mixed-integer linear programs.
//!
//! # Features
//!
//! - Solver-neutral MILP model with named constraints
//! - Three formulations: slot assignment with leased spares and reliability
//!   groups, inventory driven by predicted demand, makespan with crew capacity
//! - Epsilon-constraint sweep tracing the cost / completion-time frontier
//! - Infeasibility diagnostics: minimal conflicting constraint sets, exported
//!   in LP format
//! - Backends: pure-Rust `microlp` by default, Gurobi behind the `gurobi` feature
//! - Reports, CSV exports and SVG charts
//!
//! # Example
//!
//! ```no_run
//! use pdm_planner::formulation::{solve, SlotAssignmentModel};
//! use pdm_planner::instance::SlotAssignmentInstance;
//! use pdm_planner::solver::{MicrolpSolver, SolverConfig};
//!
//! let instance = SlotAssignmentInstance::example();
//! let model = SlotAssignmentModel::build(&instance).unwrap();
//! let plan = solve(&model, &MicrolpSolver::new(), &SolverConfig::default()).unwrap();
//!
//! println!("{}", plan);
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod formulation;
pub mod instance;
pub mod lp_format;
pub mod model;
pub mod pareto;
pub mod report;
pub mod solution;
pub mod solver;
pub mod visualization;

pub use error::{Conflict, PlannerError, Result};
pub use instance::Scenario;
pub use model::Model;
pub use solution::Solution;
