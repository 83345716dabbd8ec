//! Errors that end a bt-core run before or instead of a report.

use crate::config::ConfigError;
use crate::exit_codes::ExitCode;
use bt_bundle::BundleError;
use bt_checks::CheckError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Bundle(#[from] BundleError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    /// User-supplied search check definitions did not load.
    #[error("{0}")]
    SearchChecks(#[source] CheckError),

    /// The built-in check catalogue did not load.
    #[error("{0}")]
    Catalogue(#[source] CheckError),

    #[error("check {0:?} not found")]
    UnknownCheck(String),

    #[error("cannot write report: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Exit code this error ends the process with.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Bundle(BundleError::Catalogue(_)) => ExitCode::InternalError,
            CliError::Bundle(_) => ExitCode::BundleError,
            CliError::Config(ConfigError::CurrentDir(_)) => ExitCode::BundleError,
            CliError::Config(_) | CliError::SearchChecks(_) => ExitCode::ConfigError,
            CliError::UnknownCheck(_) => ExitCode::ArgsError,
            CliError::Catalogue(_) | CliError::Output(_) => ExitCode::InternalError,
        }
    }

    /// Short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            CliError::Bundle(BundleError::Catalogue(_)) => "File Catalogue Error",
            CliError::Bundle(_) => "Bundle Error",
            CliError::Config(_) => "Configuration Error",
            CliError::SearchChecks(_) => "Invalid Search Checks",
            CliError::Catalogue(_) => "Check Catalogue Error",
            CliError::UnknownCheck(_) => "Unknown Check",
            CliError::Output(_) => "Output Error",
        }
    }

    /// Human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            CliError::Bundle(BundleError::Catalogue(_)) | CliError::Catalogue(_) => {
                "The built-in catalogue is broken. Please report this as a bug."
            }
            CliError::Bundle(_) => {
                "Pass the extracted bundle directory with '--path', or run from inside it."
            }
            CliError::Config(_) => {
                "Check the --search-checks argument and the BT_SEARCH_CHECKS / BT_CONFIG_DIR variables."
            }
            CliError::SearchChecks(_) => {
                "Fix the search check definitions; each needs a name, a description, a fileTypeName and an errorPattern."
            }
            CliError::UnknownCheck(_) => "Run 'bt-core list' to see the available checks.",
            CliError::Output(_) => "Retry the run. If persistent, please report this as a bug.",
        }
    }
}

/// Format an error for human-readable stderr output.
pub fn format_error_human(err: &CliError, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
