//! Infeasibility diagnostics.
//!
//! When a model has no feasible assignment, [`extract_conflict`] asks the
//! backend for an irreducible inconsistent subsystem (IIS) and optionally
//! writes it as an LP file next to the run's other outputs. Backends without a
//! native IIS routine fall back to [`deletion_filter`].

use std::path::Path;

use crate::error::{Conflict, PlannerError, Result};
use crate::lp_format;
use crate::model::{ConstraintId, Model};
use crate::solver::{SolveStatus, Solver, SolverConfig};

/// Deletion filter (Chinneck & Dravnieks).
///
/// Walks the constraints once; a constraint is dropped for good when the
/// model stays infeasible without it. What survives is infeasible, and
/// removing any single member makes it feasible. Variable bounds and domains
/// are treated as fixed.
pub fn deletion_filter<S: Solver + ?Sized>(solver: &S, model: &Model, config: &SolverConfig) -> Result<Vec<ConstraintId>> {
    let mut kept = model.constraint_ids();

    if !is_infeasible(solver, &model.restricted_to(&kept), config)? {
        return Err(PlannerError::Backend(format!(
            "{} reported infeasible but the full constraint set solves",
            solver.name()
        )));
    }

    let mut position = 0;
    while position < kept.len() {
        let candidate = kept.remove(position);
        if is_infeasible(solver, &model.restricted_to(&kept), config)? {
            log::debug!("IIS filter: dropped {}", constraint_name(model, candidate));
        } else {
            kept.insert(position, candidate);
            position += 1;
        }
    }

    log::debug!("IIS filter kept {} of {} constraints", kept.len(), model.num_constraints());
    Ok(kept)
}

fn is_infeasible<S: Solver + ?Sized>(solver: &S, model: &Model, config: &SolverConfig) -> Result<bool> {
    Ok(solver.solve(model, config)?.status == SolveStatus::Infeasible)
}

fn constraint_name(model: &Model, id: ConstraintId) -> String {
    model
        .constraint(id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| format!("#{}", id.index()))
}

/// Compute the IIS of an infeasible model and, if `config.iis_path` is set,
/// persist it for inspection.
pub fn extract_conflict<S: Solver + ?Sized>(model: &Model, solver: &S, config: &SolverConfig) -> Result<Conflict> {
    let members = solver.compute_iis(model, config)?;
    let constraints = members.iter().map(|&id| constraint_name(model, id)).collect();

    let artifact = match &config.iis_path {
        Some(path) => {
            export_conflict(model, &members, path)?;
            log::info!("IIS written to {}", path.display());
            Some(path.clone())
        }
        None => None,
    };

    Ok(Conflict { constraints, artifact })
}

/// Write the sub-model made of `members` in LP format.
pub fn export_conflict<P: AsRef<Path>>(model: &Model, members: &[ConstraintId], path: P) -> Result<()> {
    let mut sub_model = model.restricted_to(members);
    sub_model.name = format!("{}_iis", model.name);
    lp_format::write_lp(&sub_model, path)
}
