//! The command line interface for the planner.
use crate::analytics::attach_analytics;
use crate::dataset::assemble;
use crate::input::{load_master_data, read_plan_parameters};
use crate::log;
use crate::optimisation::RepairOptions;
use crate::output::{
    create_output_directory, get_output_dir, write_metadata, write_run, write_run_to_path,
};
use crate::planning::{OptimisationType, PlanRequest, run};
use crate::scenario::default_scenarios;
use crate::settings::Settings;
use crate::solver::{SolverBackend, SolverConfig};
use ::log::{info, warn};
use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// The command line interface for the planner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the `run` command
#[derive(Args)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Solver backend to use (gurobi, cbc, highs, scip)
    #[arg(short, long, default_value = "highs")]
    pub solver: String,
    /// Solver time limit in seconds
    #[arg(long, default_value_t = 60)]
    pub time_limit: u64,
    /// Relative optimality gap target
    #[arg(long, default_value_t = 0.01)]
    pub mip_gap: f64,
    /// Formulation to use (deterministic, stochastic, robust)
    #[arg(long, default_value = "deterministic")]
    pub optimisation: String,
    /// Solve the feasibility-repair variant: always return a plan, surfacing
    /// unmet demand as shortfall rows instead of failing as infeasible
    #[arg(long)]
    pub allow_shortfall: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a planning model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a model without solving it.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Compute analytics for a persisted run and attach them to it.
    Analyse {
        /// Path to the run document (run.json).
        run_file: PathBuf,
        /// The path to the model directory with current master data.
        model_dir: PathBuf,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Analyse {
                run_file,
                model_dir,
            } => handle_analyse_command(&run_file, &model_dir, None),
        }
    }
}

/// Parse CLI arguments and dispatch
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        command.execute()?;
    } else {
        // No command provided. Show help.
        Cli::command().print_long_help()?;
    }

    Ok(())
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };
    if opts.overwrite {
        settings.overwrite = true;
    }

    // Backend and formulation names are validated before anything runs
    let backend: SolverBackend = opts.solver.parse()?;
    let optimisation_type: OptimisationType = opts.optimisation.parse()?;

    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path, settings.results_root.clone())?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(&settings.log_level, Some(output_path)).context("Failed to initialise logging.")?;

    info!("Starting clinkplan v{}", env!("CARGO_PKG_VERSION"));
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let master = load_master_data(model_path).context("Failed to load master data.")?;
    let parameters = read_plan_parameters(model_path).context("Failed to load plan.toml.")?;
    info!("Loaded model from {}", model_path.display());

    let scenarios = match optimisation_type {
        OptimisationType::Deterministic => Vec::new(),
        _ if parameters.scenarios.is_empty() => {
            info!("No scenarios defined in plan.toml; using the default Low/Normal/High set");
            default_scenarios()
        }
        _ => parameters.scenarios.clone(),
    };

    let request = PlanRequest {
        periods: parameters.periods.clone(),
        demand_class: parameters.demand_class.clone(),
        optimisation_type,
        scenarios,
        repair: opts.allow_shortfall.then(RepairOptions::default),
        solver: SolverConfig {
            backend,
            time_limit_seconds: opts.time_limit,
            mip_gap: opts.mip_gap,
            log_path: settings
                .solver_logs
                .then(|| output_path.join("solver.log")),
        },
    };

    let solved = run(&master, &request)?;
    let run_path = write_run(output_path, &solved)?;
    write_metadata(output_path, model_path)?;
    info!("Run document written to {}", run_path.display());

    if !solved.is_success() {
        bail!("Run failed ({}): {}", solved.termination, solved.message);
    }
    info!("Planning complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // No log file for the validate command
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    let master = load_master_data(model_path).context("Failed to validate model.")?;
    let parameters = read_plan_parameters(model_path).context("Failed to validate model.")?;
    assemble(&parameters.periods, parameters.demand_class.clone(), &master)
        .context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}

/// Handle the `analyse` command.
pub fn handle_analyse_command(
    run_file: &Path,
    model_path: &Path,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    let master = load_master_data(model_path).context("Failed to load master data.")?;
    let mut solved = crate::output::read_run(run_file)?;
    attach_analytics(&mut solved, &master)?;
    write_run_to_path(run_file, &solved)?;

    let analytics = solved.analytics.as_ref().expect("Analytics just attached");
    info!(
        "Analytics attached to {}: resilience score {:.1} ({:?})",
        run_file.display(),
        analytics.resilience.score,
        analytics.resilience.classification
    );

    Ok(())
}
