//! Makespan formulation: one start period per task, crew capacity over the
//! task durations and a completion-time variable `C`.
//!
//! A task started after its RUL is corrective: it takes longer and pays the
//! corrective cost through the failure indicator `fail[c]`. A task started
//! before its RUL pays for the useful life thrown away.

use serde::{Deserialize, Serialize};

use super::Formulation;
use crate::error::{invalid, Result};
use crate::instance::MakespanInstance;
use crate::model::{ConstraintId, LinearExpr, Model, Relation, Sense, VarDomain, VarId};
use crate::solution::Solution;
use crate::solver::SolveStatus;

/// Start and duration of one task in a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub name: String,
    pub start: usize,
    pub duration: usize,
    pub corrective: bool,
}

impl ScheduledTask {
    pub fn finish(&self) -> usize {
        self.start + self.duration
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakespanPlan {
    pub instance: String,
    pub status: SolveStatus,
    pub objective: f64,
    pub tasks: Vec<ScheduledTask>,
    /// Latest finish over the scheduled tasks
    pub makespan: usize,
    pub computation_time: f64,
}

impl MakespanPlan {
    pub fn corrective_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.corrective).count()
    }
}

/// Makespan MILP built from an instance
pub struct MakespanModel {
    instance: MakespanInstance,
    model: Model,
    /// `start[c][t]`
    start: Vec<Vec<VarId>>,
    fail: Vec<VarId>,
    completion: VarId,
}

impl MakespanModel {
    pub fn build(instance: &MakespanInstance) -> Result<Self> {
        instance.validate()?;
        let mut model = Model::new(&format!("makespan_{}", instance.name));
        let periods = instance.periods;
        let last_finish = instance.last_finish();

        let completion = model.declare_variable("C", VarDomain::Continuous, 0.0, last_finish as f64)?;
        let mut objective = completion * instance.makespan_weight;
        let mut start = Vec::with_capacity(instance.tasks.len());
        let mut fail = Vec::with_capacity(instance.tasks.len());

        for (c, task) in instance.tasks.iter().enumerate() {
            let starts = (0..periods)
                .map(|t| model.binary(&format!("start[{},{}]", c, t)))
                .collect::<Result<Vec<_>>>()?;
            let failed = model.binary(&format!("fail[{}]", c))?;

            objective.add_constant(task.preventive_cost);
            objective.add_term(failed, task.corrective_cost - task.preventive_cost);
            for (t, &s) in starts.iter().enumerate() {
                if t < task.rul {
                    objective.add_term(s, instance.wasted_life_cost * (task.rul - t) as f64);
                }
            }

            model.add_constraint(&format!("one_start[{}]", c), LinearExpr::sum(starts.iter().copied()), Relation::Eq, 1.0)?;

            let mut late = LinearExpr::from(failed);
            for &s in starts.iter().skip(task.rul.saturating_add(1)) {
                late.add_term(s, -1.0);
            }
            model.add_constraint(&format!("failure[{}]", c), late, Relation::Ge, 0.0)?;

            for (t, &s) in starts.iter().enumerate() {
                let finish = (t + task.duration(t)) as f64;
                model.add_constraint(
                    &format!("completion[{},{}]", c, t),
                    LinearExpr::from(completion) - s * finish,
                    Relation::Ge,
                    0.0,
                )?;
            }

            start.push(starts);
            fail.push(failed);
        }

        // A task started in t occupies a crew in [t, t + duration(t)).
        for p in 0..last_finish {
            let mut busy = LinearExpr::new();
            for (task, starts) in instance.tasks.iter().zip(&start) {
                for (t, &s) in starts.iter().enumerate() {
                    if t <= p && p < t + task.duration(t) {
                        busy.add_term(s, 1.0);
                    }
                }
            }
            model.add_constraint(&format!("crew_capacity[{}]", p), busy, Relation::Le, instance.crews as f64)?;
        }

        model.set_objective(objective, Sense::Minimize)?;
        log::debug!("Built {}", model);
        Ok(MakespanModel { instance: instance.clone(), model, start, fail, completion })
    }

    pub fn instance(&self) -> &MakespanInstance {
        &self.instance
    }

    pub fn completion_var(&self) -> VarId {
        self.completion
    }

    pub fn start_var(&self, task: usize, period: usize) -> VarId {
        self.start[task][period]
    }

    pub fn fail_var(&self, task: usize) -> VarId {
        self.fail[task]
    }

    /// Add the temporary row `C <= epsilon`.
    pub fn bound_completion(&mut self, epsilon: f64) -> Result<ConstraintId> {
        if epsilon.is_nan() || epsilon < 0.0 {
            return invalid(format!("completion bound must be non-negative, got {}", epsilon));
        }
        self.model.add_constraint(
            &format!("epsilon[{}]", epsilon),
            LinearExpr::from(self.completion),
            Relation::Le,
            epsilon,
        )
    }

    /// Drop a row added by [`bound_completion`](Self::bound_completion).
    pub fn release(&mut self, bound: ConstraintId) {
        self.model.remove_constraint(bound);
    }
}

impl Formulation for MakespanModel {
    type Plan = MakespanPlan;

    fn model(&self) -> &Model {
        &self.model
    }

    fn interpret(&self, solution: &Solution) -> MakespanPlan {
        let tasks: Vec<ScheduledTask> = self
            .instance
            .tasks
            .iter()
            .zip(&self.start)
            .map(|(task, starts)| {
                let start = starts.iter().position(|&s| solution.is_set(s)).unwrap_or(0);
                ScheduledTask {
                    name: task.name.clone(),
                    start,
                    duration: task.duration(start),
                    corrective: task.is_corrective(start),
                }
            })
            .collect();
        let makespan = tasks.iter().map(ScheduledTask::finish).max().unwrap_or(0);

        MakespanPlan {
            instance: self.instance.name.clone(),
            status: solution.status,
            objective: solution.objective,
            tasks,
            makespan,
            computation_time: solution.computation_time,
        }
    }
}

impl std::fmt::Display for MakespanPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Makespan plan for {} ({})", self.instance, self.status)?;
        writeln!(f, "  Objective: {:.2}", self.objective)?;
        writeln!(f, "  Makespan: {}", self.makespan)?;
        for task in &self.tasks {
            writeln!(
                f,
                "  {:<16} start {:>3}  duration {}{}",
                task.name,
                task.start,
                task.duration,
                if task.corrective { "  (corrective)" } else { "" }
            )?;
        }
        write!(f, "  Time: {:.4}s", self.computation_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;
    use crate::formulation::solve;
    use crate::instance::MaintenanceTask;
    use crate::solver::{solve_model, MicrolpSolver, SolverConfig};

    fn task(name: &str, rul: usize) -> MaintenanceTask {
        MaintenanceTask {
            name: name.to_string(),
            rul,
            preventive_duration: 1,
            corrective_duration: 2,
            preventive_cost: 100.0,
            corrective_cost: 300.0,
        }
    }

    fn instance(crews: i32) -> MakespanInstance {
        MakespanInstance {
            name: "three-tasks".to_string(),
            periods: 4,
            crews,
            tasks: vec![task("a", 1), task("b", 1), task("c", 3)],
            wasted_life_cost: 10.0,
            makespan_weight: 0.0,
        }
    }

    #[test]
    fn test_crew_capacity_respected() {
        let built = MakespanModel::build(&instance(1)).unwrap();
        let plan = solve(&built, &MicrolpSolver::new(), &SolverConfig::default()).unwrap();
        assert_eq!(plan.status, SolveStatus::Optimal);

        for p in 0..built.instance().last_finish() {
            let busy = plan.tasks.iter().filter(|t| t.start <= p && p < t.finish()).count();
            assert!(busy <= 1, "period {} has {} tasks", p, busy);
        }
        // Two tasks share RUL 1 with a single crew: one of them must start early.
        assert_eq!(plan.corrective_count(), 0);
    }

    #[test]
    fn test_completion_bounds_finish_times() {
        let mut instance = instance(2);
        instance.makespan_weight = 1.0;
        let built = MakespanModel::build(&instance).unwrap();
        let solution = solve_model(built.model(), &MicrolpSolver::new(), &SolverConfig::default()).unwrap();
        let plan = built.interpret(&solution);
        let completion = solution.value(built.completion_var());
        assert!(plan.tasks.iter().all(|t| t.finish() as f64 <= completion + 1e-6));
    }

    #[test]
    fn test_tight_bound_forces_corrective_free_schedule() {
        let mut built = MakespanModel::build(&instance(3)).unwrap();
        let bound = built.bound_completion(2.0).unwrap();
        let plan = solve(&built, &MicrolpSolver::new(), &SolverConfig::default()).unwrap();
        assert!(plan.makespan <= 2);

        built.release(bound);
        assert!(built.model().constraint(bound).is_none());
    }

    #[test]
    fn test_no_crews_is_infeasible() {
        let built = MakespanModel::build(&instance(0)).unwrap();
        match solve(&built, &MicrolpSolver::new(), &SolverConfig::default()) {
            Err(PlannerError::Infeasible(conflict)) => assert!(conflict.mentions("crew_capacity")),
            other => panic!("expected infeasible, got {:?}", other.map(|p| p.objective)),
        }
    }

    #[test]
    fn test_unbounded_life_never_fails() {
        let mut instance = instance(2);
        instance.tasks[2].rul = usize::MAX;
        let built = MakespanModel::build(&instance).unwrap();
        let (_, row) = built.model().constraints().find(|(_, c)| c.name == "failure[2]").unwrap();
        assert_eq!(row.expr.terms(), &[(built.fail_var(2), 1.0)]);
        assert!(row.expr.is_finite());
    }

    #[test]
    fn test_negative_bound_rejected() {
        let mut built = MakespanModel::build(&instance(1)).unwrap();
        assert!(matches!(built.bound_completion(-1.0), Err(PlannerError::InvalidParameter(_))));
    }
}
