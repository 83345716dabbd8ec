//! bt-core CLI entry point.
//!
//! Runs health checks against an extracted DC/OS diagnostics bundle and
//! prints a report on stdout. Logs go to stderr.

use bt_bundle::{Bundle, BundleError, FileTypeRegistry};
use bt_checks::{CheckError, CheckRegistry, SearchCheck};
use bt_core::config;
use bt_core::error::{format_error_human, CliError};
use bt_core::exit_codes::ExitCode;
use bt_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use bt_core::report::OutputFormat;
use bt_core::runner::{self, Selection};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Bundle Triage - health checks for DC/OS diagnostics bundles
#[derive(Parser)]
#[command(name = "bt-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to the extracted bundle (default: $BT_BUNDLE, then the current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// YAML file with additional search checks
    #[arg(long, global = true)]
    search_checks: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "human")]
    format: OutputFormat,

    /// Also show checks that passed or could not decide
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level for stderr (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format for stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single check and show all of its results
    Check {
        /// Check name, as printed by `list`
        name: String,
    },

    /// List the available checks
    List,
}

#[derive(Serialize)]
struct CheckListing<'a> {
    name: &'a str,
    description: &'a str,
    cure: &'a str,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::AllOk,
                _ => ExitCode::ArgsError,
            };
            std::process::exit(code.as_i32());
        }
    };

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format)
        .with_color(!cli.global.no_color);
    init_logging(&log_config);

    let exit_code = match execute(&cli) {
        Ok(code) => code,
        Err(err) => {
            let use_color = !cli.global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", format_error_human(&err, use_color));
            err.exit_code()
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn execute(cli: &Cli) -> Result<ExitCode, CliError> {
    let settings = config::resolve(
        cli.global.path.as_deref(),
        cli.global.search_checks.as_deref(),
    )?;
    debug!(
        bundle = %settings.bundle.display(),
        bundle_source = %settings.bundle_source,
        search_checks_source = %settings.search_checks_source,
        "Resolved settings"
    );

    let file_types = FileTypeRegistry::builtin().map_err(BundleError::from)?;
    let mut registry = CheckRegistry::builtin(&file_types).map_err(CliError::Catalogue)?;
    if let Some(path) = &settings.search_checks {
        let extra = SearchCheck::load(path).map_err(CliError::SearchChecks)?;
        let count = extra.len();
        registry
            .register_search_checks(extra, &file_types)
            .map_err(CliError::SearchChecks)?;
        info!(path = %path.display(), checks = count, "Loaded search checks");
    }

    let (selection, verbose) = match &cli.command {
        Some(Commands::List) => {
            print_list(&registry, cli.global.format)?;
            return Ok(ExitCode::AllOk);
        }
        Some(Commands::Check { name }) => {
            registry
                .get(name)
                .map_err(|_| CliError::UnknownCheck(name.clone()))?;
            (Selection::One(name.clone()), true)
        }
        None => (Selection::All, cli.global.verbose),
    };

    let bundle = Bundle::open_with_registry(&settings.bundle, Arc::clone(&file_types))?;
    let run_id = generate_run_id();
    let report = runner::run(&registry, &bundle, &selection, &run_id).map_err(|err| match err {
        CheckError::UnknownCheck(name) => CliError::UnknownCheck(name),
        other => CliError::Catalogue(other),
    })?;

    match cli.global.format {
        OutputFormat::Human => {
            let use_color = !cli.global.no_color && std::io::stdout().is_terminal();
            print!("{}", report.render_human(verbose, use_color));
        }
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(if report.all_ok() {
        ExitCode::AllOk
    } else {
        ExitCode::NotOk
    })
}

fn print_list(registry: &CheckRegistry, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Human => {
            let width = registry.list().map(|c| c.name.len()).max().unwrap_or(0);
            for check in registry.list() {
                println!("{:<width$}  {}", check.name, check.description);
            }
        }
        OutputFormat::Json => {
            let listing: Vec<CheckListing<'_>> = registry
                .list()
                .map(|check| CheckListing {
                    name: &check.name,
                    description: &check.description,
                    cure: &check.cure,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
    }
    Ok(())
}
