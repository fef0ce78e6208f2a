use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use diag_collector::cli::{has_archive_extension, Args, Commands};
use diag_collector::collectors::collector;
use diag_collector::config::{load_or_default, CollectionConfig, RunConfig, ToolEnvironment};
use diag_collector::constants::{EXIT_FATAL, EXIT_PRECONDITION};
use diag_collector::privileges;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = initialize_logging(args.verbose) {
        eprintln!("{:#}", e);
    }

    if let Some(cmd) = &args.command {
        return match handle_subcommand(cmd) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{:#}", e);
                ExitCode::from(EXIT_FATAL)
            }
        };
    }

    let config = match prepare_run(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_PRECONDITION);
        }
    };

    info!("Starting diagnostic collection into {}", config.output.display());
    match collector::run(&config) {
        Ok(summary) => {
            info!("Archive written to {}", summary.archive.display());
            if summary.failures > 0 {
                info!("{} steps failed, see collection.log in the archive", summary.failures);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Collection failed: {}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Initialize the logging system
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ).context("Failed to initialize logger")?;
    Ok(())
}

fn handle_subcommand(cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::InitConfig { path } => {
            info!("Creating default configuration file at {}", path.display());
            CollectionConfig::default().save_to_yaml_file(path)?;
            Ok(())
        }
    }
}

/// Check every precondition and build the run configuration.
fn prepare_run(args: &Args) -> Result<RunConfig> {
    if !privileges::check_privileges(args.force) {
        bail!(
            "Root privileges are required. {} (or pass --force)",
            privileges::get_elevation_instructions()
        );
    }

    let mut collection = load_or_default(args.config.as_deref())?;
    args.apply_to(&mut collection);

    let hostname = hostname::get()
        .context("Failed to determine hostname")?
        .to_string_lossy()
        .into_owned();
    let output = args.output_path(&hostname);
    check_output(&output)?;

    let top_level = args.top_level_name(&output);
    Ok(RunConfig::new(output, top_level, collection, ToolEnvironment::from_process()))
}

fn check_output(output: &Path) -> Result<()> {
    if !has_archive_extension(output) {
        bail!("Output {} must end in .zip", output.display());
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            bail!("Output directory {} does not exist", parent.display());
        }
    }
    Ok(())
}
