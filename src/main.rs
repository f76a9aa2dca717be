//! Predictive-Maintenance Planner - Command Line Interface
//!
//! Solves maintenance-scheduling scenarios stored as JSON files.

use clap::{Parser, Subcommand, ValueEnum};
use pdm_planner::config::{create_solver, solver_config, Backend};
use pdm_planner::formulation::{build_model, solve_scenario, MakespanModel, ScenarioPlan};
use pdm_planner::instance::{InventoryInstance, MakespanInstance, Scenario, SlotAssignmentInstance};
use pdm_planner::lp_format::write_lp;
use pdm_planner::pareto::epsilon_sweep;
use pdm_planner::report::{export_runs_csv, generate_report, ModelStatistics, RunRecord};
use pdm_planner::visualization::Visualizer;
use pdm_planner::PlannerError;

use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pdm-planner")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Predictive-maintenance scheduling with mixed-integer linear programming")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a scenario and print the plan
    Solve {
        #[arg(short, long)]
        scenario: PathBuf,

        /// MILP backend
        #[arg(short, long, value_enum, default_value = "microlp")]
        backend: Backend,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Write the conflicting constraints here (LP format) if infeasible
        #[arg(long)]
        iis: Option<PathBuf>,

        /// Output plan to JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the run record to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Inventory chart: SVG, PNG, or the raw chart data as JSON (by extension)
        #[arg(long)]
        chart: Option<PathBuf>,

        /// Component shown in the chart
        #[arg(long, default_value = "0")]
        component: usize,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Trace the cost / completion-time frontier of a makespan scenario
    Sweep {
        #[arg(short, long)]
        scenario: PathBuf,

        /// Completion-time bounds, strictly increasing
        #[arg(long, value_delimiter = ',', required = true)]
        bounds: Vec<f64>,

        /// MILP backend
        #[arg(short, long, value_enum, default_value = "microlp")]
        backend: Backend,

        /// Time limit per point in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Output CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Frontier chart (SVG, or PNG by extension)
        #[arg(long)]
        chart: Option<PathBuf>,
    },

    /// Write a scenario file
    Generate {
        #[arg(long, value_enum)]
        variant: Variant,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of components (tasks for makespan)
        #[arg(long, default_value = "3")]
        components: usize,

        /// Number of periods
        #[arg(long, default_value = "10")]
        periods: usize,

        /// Maintenance crews (makespan only)
        #[arg(long, default_value = "2")]
        crews: i32,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Validate a scenario and print model statistics
    Analyze {
        #[arg(short, long)]
        scenario: PathBuf,

        /// Also write the model in LP format
        #[arg(long)]
        lp: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Variant {
    /// Built-in aircraft example
    SlotAssignment,
    /// Random inventory instance
    Inventory,
    /// Random makespan instance
    Makespan,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve { scenario, backend, time_limit, iis, output, csv, chart, component, verbose } => {
            solve(&scenario, backend, time_limit, iis, output, csv, chart, component, verbose);
        }

        Commands::Sweep { scenario, bounds, backend, time_limit, csv, chart } => {
            sweep(&scenario, &bounds, backend, time_limit, csv, chart);
        }

        Commands::Generate { variant, seed, components, periods, crews, output } => {
            generate(variant, seed, components, periods, crews, &output);
        }

        Commands::Analyze { scenario, lp } => {
            analyze(&scenario, lp);
        }
    }
}

fn load_scenario(path: &Path) -> Scenario {
    match Scenario::from_file(path) {
        Ok(scenario) => scenario,
        Err(e) => {
            log::error!("Error loading scenario: {}", e);
            eprintln!("Error loading scenario: {}", e);
            std::process::exit(1);
        }
    }
}

fn write_chart(svg: &str, path: &Path) {
    let viz = Visualizer::new();
    let result = if path.extension().map_or(false, |e| e == "png") {
        viz.save_png(svg, path)
    } else {
        viz.save_svg(svg, path)
    };
    match result {
        Ok(()) => println!("Chart saved to {:?}", path),
        Err(e) => log::error!("Failed to write chart: {}", e),
    }
}

#[allow(clippy::too_many_arguments)]
fn solve(
    path: &Path,
    backend: Backend,
    time_limit: Option<f64>,
    iis: Option<PathBuf>,
    output: Option<PathBuf>,
    csv: Option<PathBuf>,
    chart: Option<PathBuf>,
    component: usize,
    verbose: bool,
) {
    let scenario = load_scenario(path);
    let solver = create_solver(backend);
    let config = solver_config(time_limit, iis, verbose);

    println!("Solving {} ({}) with {}...", scenario.name(), scenario.variant(), backend.name());

    let plan = match solve_scenario(&scenario, &solver, &config) {
        Ok(plan) => plan,
        Err(PlannerError::Infeasible(conflict)) => {
            println!("Scenario is infeasible. Conflicting constraints:");
            for name in &conflict.constraints {
                println!("  {}", name);
            }
            if let Some(artifact) = &conflict.artifact {
                println!("Conflict written to {:?}", artifact);
            }
            std::process::exit(2);
        }
        Err(e) => {
            log::error!("Solve failed: {}", e);
            eprintln!("Solve failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n{}", plan);
    if plan.status() != pdm_planner::solver::SolveStatus::Optimal {
        println!("Warning: plan is not certified optimal");
    }

    if let Some(out_path) = output {
        let written = File::create(&out_path)
            .map_err(PlannerError::from)
            .and_then(|file| serde_json::to_writer_pretty(file, &plan).map_err(PlannerError::from));
        match written {
            Ok(()) => println!("Plan saved to {:?}", out_path),
            Err(e) => log::error!("Failed to save plan: {}", e),
        }
    }

    if let Some(csv_path) = csv {
        let records = vec![RunRecord::from_plan(&plan, scenario.variant(), backend.name())];
        if verbose {
            println!("\n{}", generate_report(&records));
        }
        match export_runs_csv(&records, &csv_path) {
            Ok(()) => println!("Run record exported to {:?}", csv_path),
            Err(e) => log::error!("Failed to export run record: {}", e),
        }
    }

    if let Some(chart_path) = chart {
        match &plan {
            ScenarioPlan::Inventory(inventory) => match inventory.chart_data(component) {
                Some(data) if chart_path.extension().map_or(false, |e| e == "json") => match data.save_json(&chart_path) {
                    Ok(()) => println!("Chart data saved to {:?}", chart_path),
                    Err(e) => log::error!("Failed to write chart data: {}", e),
                },
                Some(data) => write_chart(&Visualizer::new().chart_svg(&data), &chart_path),
                None => log::error!("No component {} in the plan", component),
            },
            _ => log::warn!("Charts are only produced for inventory scenarios"),
        }
    }
}

fn sweep(path: &Path, bounds: &[f64], backend: Backend, time_limit: Option<f64>, csv: Option<PathBuf>, chart: Option<PathBuf>) {
    let Scenario::Makespan(instance) = load_scenario(path) else {
        eprintln!("The sweep needs a makespan scenario");
        std::process::exit(1);
    };

    let solver = create_solver(backend);
    let config = solver_config(time_limit, None, false);

    let result = MakespanModel::build(&instance)
        .and_then(|mut model| epsilon_sweep(&mut model, bounds, &solver, &config, true));
    let front = match result {
        Ok(front) => front,
        Err(e) => {
            log::error!("Sweep failed: {}", e);
            eprintln!("Sweep failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n========== Pareto frontier: {} ==========", instance.name);
    print!("{}", front);

    if let Some(csv_path) = csv {
        match front.export_csv(&csv_path) {
            Ok(()) => println!("\nResults exported to {:?}", csv_path),
            Err(e) => log::error!("Failed to export frontier: {}", e),
        }
    }

    if let Some(chart_path) = chart {
        write_chart(&Visualizer::new().pareto_svg(&front), &chart_path);
    }
}

fn generate(variant: Variant, seed: u64, components: usize, periods: usize, crews: i32, output: &Path) {
    let scenario = match variant {
        Variant::SlotAssignment => Scenario::SlotAssignment(SlotAssignmentInstance::example()),
        Variant::Inventory => Scenario::Inventory(InventoryInstance::random(seed, components, periods)),
        Variant::Makespan => Scenario::Makespan(MakespanInstance::random(seed, components, periods, crews)),
    };

    if let Err(e) = scenario.validate() {
        log::error!("Generated scenario is invalid: {}", e);
        std::process::exit(1);
    }

    match scenario.save(output) {
        Ok(()) => println!("Scenario {} written to {:?}", scenario.name(), output),
        Err(e) => {
            log::error!("Failed to write scenario: {}", e);
            eprintln!("Failed to write scenario: {}", e);
            std::process::exit(1);
        }
    }
}

fn analyze(path: &Path, lp: Option<PathBuf>) {
    let scenario = load_scenario(path);

    println!("========== Scenario Analysis ==========");
    println!("Name: {}", scenario.name());
    println!("Variant: {}", scenario.variant());

    match &scenario {
        Scenario::SlotAssignment(instance) => {
            println!("Aircraft: {}", instance.aircraft.len());
            println!("Components: {}", instance.num_components());
            println!("Slots: {}", instance.slots.len());
            println!("Days tracked: {:?}", instance.days());
            println!("Critical aircraft: {}", instance.critical.len());
        }
        Scenario::Inventory(instance) => {
            println!("Components: {}", instance.components.len());
            println!("Periods: {}", instance.periods);
            let total: u64 = instance.components.iter().map(|c| c.total_demand()).sum();
            println!("Total predicted demand: {}", total);
        }
        Scenario::Makespan(instance) => {
            println!("Tasks: {}", instance.tasks.len());
            println!("Periods: {}", instance.periods);
            println!("Crews: {}", instance.crews);
            println!("Latest possible finish: {}", instance.last_finish());
        }
    }

    let model = match build_model(&scenario) {
        Ok(model) => model,
        Err(e) => {
            log::error!("Model construction failed: {}", e);
            eprintln!("Model construction failed: {}", e);
            std::process::exit(1);
        }
    };
    println!("\n{}", ModelStatistics::of(&model));

    if let Some(lp_path) = lp {
        match write_lp(&model, &lp_path) {
            Ok(()) => println!("\nModel written to {:?}", lp_path),
            Err(e) => log::error!("Failed to write model: {}", e),
        }
    }
}
