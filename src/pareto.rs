//! Epsilon-constraint sweep over the makespan formulation.
//!
//! For every bound `eps` in a strictly increasing list, the row `C <= eps` is
//! added to the base model, the model is re-solved for minimum cost, and the
//! row is removed again. Optimal solutions become Pareto points; bounds under
//! which the model is infeasible are skipped.

use std::fs::File;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{invalid, PlannerError, Result};
use crate::formulation::{self, MakespanModel, ScheduledTask};
use crate::solver::{SolveStatus, Solver, SolverConfig};

/// One point of the cost / completion-time trade-off
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParetoPoint {
    /// Completion-time bound the point was solved under
    pub bound: f64,
    /// Optimal cost under that bound
    pub cost: f64,
    /// Makespan of the returned schedule
    pub makespan: usize,
    pub tasks: Vec<ScheduledTask>,
}

#[derive(Serialize)]
struct ParetoRow<'a> {
    bound: f64,
    cost: f64,
    makespan: usize,
    corrective: usize,
    schedule: &'a str,
}

/// Points collected by [`epsilon_sweep`], in bound order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParetoFront {
    points: Vec<ParetoPoint>,
    /// Bounds that produced no point
    skipped: Vec<f64>,
}

impl ParetoFront {
    pub fn points(&self) -> &[ParetoPoint] {
        &self.points
    }

    pub fn skipped(&self) -> &[f64] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cost never increases as the bound loosens.
    pub fn is_monotone(&self, tolerance: f64) -> bool {
        self.points.windows(2).all(|w| w[1].cost <= w[0].cost + tolerance)
    }

    /// Points not dominated in (makespan, cost), sorted by makespan.
    pub fn non_dominated(&self) -> Vec<&ParetoPoint> {
        let mut sorted: Vec<&ParetoPoint> = self.points.iter().collect();
        sorted.sort_by_key(|p| (p.makespan, OrderedFloat(p.cost)));

        let mut front: Vec<&ParetoPoint> = Vec::new();
        for point in sorted {
            if front.last().map_or(true, |last| point.cost < last.cost) {
                front.push(point);
            }
        }
        front
    }

    /// Export the points to CSV, one row per bound
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        for point in &self.points {
            let schedule = point
                .tasks
                .iter()
                .map(|t| format!("{}@{}", t.name, t.start))
                .collect::<Vec<_>>()
                .join(" ");
            writer.serialize(ParetoRow {
                bound: point.bound,
                cost: point.cost,
                makespan: point.makespan,
                corrective: point.tasks.iter().filter(|t| t.corrective).count(),
                schedule: &schedule,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Display for ParetoFront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:>10} {:>14} {:>10}", "Bound", "Cost", "Makespan")?;
        writeln!(f, "{}", "-".repeat(36))?;
        for point in &self.points {
            writeln!(f, "{:>10.2} {:>14.2} {:>10}", point.bound, point.cost, point.makespan)?;
        }
        if !self.skipped.is_empty() {
            writeln!(f, "Skipped bounds: {:?}", self.skipped)?;
        }
        Ok(())
    }
}

fn check_bounds(bounds: &[f64]) -> Result<()> {
    if let Some(bad) = bounds.iter().find(|b| !b.is_finite() || **b < 0.0) {
        return invalid(format!("sweep bound {} is not a finite non-negative value", bad));
    }
    if let Some(w) = bounds.windows(2).find(|w| w[1] <= w[0]) {
        return invalid(format!("sweep bounds must be strictly increasing ({} then {})", w[0], w[1]));
    }
    Ok(())
}

/// Run the epsilon-constraint sweep. The model is left in its base state.
pub fn epsilon_sweep<S: Solver + ?Sized>(
    makespan: &mut MakespanModel,
    bounds: &[f64],
    solver: &S,
    config: &SolverConfig,
    show_progress: bool,
) -> Result<ParetoFront> {
    check_bounds(bounds)?;

    // Infeasible bounds are expected in a sweep; no conflict extraction.
    let config = SolverConfig { diagnose_infeasible: false, ..config.clone() };

    let pb = if show_progress {
        let pb = ProgressBar::new(bounds.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut front = ParetoFront::default();
    for &bound in bounds {
        pb.set_message(format!("C <= {}", bound));
        let row = makespan.bound_completion(bound)?;
        let result = formulation::solve(&*makespan, solver, &config);
        makespan.release(row);

        match result {
            Ok(plan) if plan.status == SolveStatus::Optimal => {
                log::info!("bound {}: cost {:.2}, makespan {}", bound, plan.objective, plan.makespan);
                front.points.push(ParetoPoint {
                    bound,
                    cost: plan.objective,
                    makespan: plan.makespan,
                    tasks: plan.tasks,
                });
            }
            Ok(plan) => {
                log::warn!("bound {}: stopped with {}, point skipped", bound, plan.status);
                front.skipped.push(bound);
            }
            Err(PlannerError::Infeasible(_)) => {
                log::info!("bound {}: infeasible, point skipped", bound);
                front.skipped.push(bound);
            }
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if !front.is_monotone(1e-6) {
        log::warn!("sweep costs are not monotone; check the solver tolerances");
    }
    Ok(front)
}
