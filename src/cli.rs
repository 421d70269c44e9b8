//! The command line interface for the dispatch planner.
use crate::example::campus_model;
use crate::log;
use crate::optimisation::DispatchRun;
use crate::output::{DataWriter, create_output_directory, get_output_dir, write_metadata};
use crate::settings::Settings;
use crate::units::Dimensionless;
use ::log::{info, warn};
use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// The command line interface for the dispatch planner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
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
    /// Relative optimality gap for the solver
    #[arg(long, value_name = "GAP")]
    pub mip_gap: Option<f64>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Compute an operating plan for the bundled site.
    Run {
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { opts } => handle_run_command(&opts, None),
        }
    }
}

/// Parse CLI arguments and start mesplan
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ mesplan --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    if let Some(command) = cli.command {
        command.execute()?;
    } else {
        // No command provided. Show help.
        Cli::command().print_long_help()?;
    }

    Ok(())
}

/// Handle the `run` command.
pub fn handle_run_command(opts: &RunOpts, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // These settings can be overridden by command-line arguments
    if opts.overwrite {
        settings.overwrite = true;
    }
    if let Some(gap) = opts.mip_gap {
        settings.mip_gap = Dimensionless(gap);
    }

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(&settings.results_root);
        &pathbuf
    };

    let overwrite =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(&settings.log_level, Some(output_path)).context("Failed to initialise logging.")?;

    info!("Starting mesplan v{}", env!("CARGO_PKG_VERSION"));
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    // Solve the dispatch problem for the bundled site
    let model = campus_model();
    let outcome = DispatchRun::new(&model)
        .with_mip_gap(settings.mip_gap)
        .run()?;
    let Some(solution) = outcome.solution() else {
        bail!("Dispatch finished with status: {}", outcome.status());
    };
    if solution.is_provisional() {
        warn!("Solver stopped at a limit; the plan may be suboptimal");
    }

    // Write the plan and run metadata
    let plan = solution.create_plan();
    let mut writer = DataWriter::create(output_path)?;
    writer.write_plan(&plan)?;
    writer.flush()?;
    write_metadata(output_path, &plan)?;

    info!("Dispatch complete!");

    Ok(())
}
