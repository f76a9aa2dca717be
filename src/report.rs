//! Reporting and export helpers.
//!
//! Provides chart data for one component's trajectory, model statistics for
//! the `analyze` command, and run records that can be summarised or exported
//! to CSV.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formulation::ScenarioPlan;
use crate::model::{Model, VarDomain};

/// One named numeric series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Labels plus two series, e.g. stock and orders over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub title: String,
    pub labels: Vec<String>,
    pub first: Series,
    pub second: Series,
}

impl ChartData {
    /// Largest value over both series, 0 when empty.
    pub fn max_value(&self) -> f64 {
        self.first.values.iter().chain(&self.second.values).cloned().fold(0.0, f64::max)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Size of a built model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatistics {
    pub name: String,
    pub variables: usize,
    pub binary_variables: usize,
    pub integer_variables: usize,
    pub continuous_variables: usize,
    pub constraints: usize,
    pub nonzeros: usize,
}

impl ModelStatistics {
    pub fn of(model: &Model) -> Self {
        let count = |domain: VarDomain| model.variables().iter().filter(|v| v.domain == domain).count();
        ModelStatistics {
            name: model.name.clone(),
            variables: model.num_variables(),
            binary_variables: count(VarDomain::Binary),
            integer_variables: count(VarDomain::Integer),
            continuous_variables: count(VarDomain::Continuous),
            constraints: model.num_constraints(),
            nonzeros: model.constraints().map(|(_, c)| c.expr.terms().len()).sum(),
        }
    }
}

impl std::fmt::Display for ModelStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Model: {}", self.name)?;
        writeln!(
            f,
            "  Variables: {} ({} binary, {} integer, {} continuous)",
            self.variables, self.binary_variables, self.integer_variables, self.continuous_variables
        )?;
        writeln!(f, "  Constraints: {}", self.constraints)?;
        write!(f, "  Non-zeros: {}", self.nonzeros)
    }
}

/// Result of one solve, as exported to CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub scenario: String,
    pub variant: String,
    pub backend: String,
    pub status: String,
    pub objective: f64,
    /// Computation time in seconds
    pub time: f64,
    /// Local time the run finished, RFC 3339
    pub timestamp: String,
}

impl RunRecord {
    pub fn from_plan(plan: &ScenarioPlan, variant: &str, backend: &str) -> Self {
        RunRecord {
            scenario: plan.instance().to_string(),
            variant: variant.to_string(),
            backend: backend.to_string(),
            status: plan.status().to_string(),
            objective: plan.objective(),
            time: plan.computation_time(),
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Export run records to CSV
pub fn export_runs_csv<P: AsRef<Path>>(records: &[RunRecord], path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Summary table over run records
pub fn generate_report(records: &[RunRecord]) -> String {
    let mut report = String::new();

    report.push_str("========================================\n");
    report.push_str("       Maintenance Planning Report\n");
    report.push_str("========================================\n\n");

    report.push_str(&format!(
        "{:<28} {:<16} {:<10} {:<10} {:>14} {:>10}\n",
        "Scenario", "Variant", "Backend", "Status", "Objective", "Time"
    ));
    report.push_str("-".repeat(93).as_str());
    report.push('\n');

    for record in records {
        report.push_str(&format!(
            "{:<28} {:<16} {:<10} {:<10} {:>14.2} {:>10.4}\n",
            record.scenario, record.variant, record.backend, record.status, record.objective, record.time
        ));
    }

    report.push_str("-".repeat(93).as_str());
    report.push('\n');
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinearExpr, Relation};

    #[test]
    fn test_model_statistics() {
        let mut model = Model::new("stats");
        let x = model.binary("x").unwrap();
        let y = model.declare_variable("y", VarDomain::Integer, 0.0, 5.0).unwrap();
        let z = model.declare_variable("z", VarDomain::Continuous, 0.0, 1.0).unwrap();
        model.add_constraint("row", LinearExpr::sum([x, y, z]), Relation::Le, 4.0).unwrap();

        let stats = ModelStatistics::of(&model);
        assert_eq!(stats.variables, 3);
        assert_eq!(stats.binary_variables, 1);
        assert_eq!(stats.integer_variables, 1);
        assert_eq!(stats.constraints, 1);
        assert_eq!(stats.nonzeros, 3);
    }

    #[test]
    fn test_chart_data_round_trips_through_json() {
        let chart = ChartData {
            title: "Inventory of pump".to_string(),
            labels: vec!["t0".to_string(), "t1".to_string()],
            first: Series { name: "stock".to_string(), values: vec![1.0, 0.0] },
            second: Series { name: "orders".to_string(), values: vec![0.0, 3.0] },
        };
        assert_eq!(chart.max_value(), 3.0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        chart.save_json(&path).unwrap();
        let loaded: ChartData = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(loaded, chart);
    }

    #[test]
    fn test_report_lists_records() {
        let records = vec![RunRecord {
            scenario: "example".to_string(),
            variant: "inventory".to_string(),
            backend: "microlp".to_string(),
            status: "Optimal".to_string(),
            objective: 123.5,
            time: 0.01,
            timestamp: chrono::Local::now().to_rfc3339(),
        }];
        let report = generate_report(&records);
        assert!(report.contains("example"));
        assert!(report.contains("123.50"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.csv");
        export_runs_csv(&records, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("scenario,variant,backend,status,objective,time,timestamp"));
    }
}
