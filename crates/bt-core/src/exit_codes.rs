//! Exit codes for the bt-core CLI.
//!
//! Exit codes communicate the outcome of a run without requiring output
//! parsing.
//!
//! Exit code ranges:
//! - 0-1: Run outcomes (every check ran; the code says whether all were OK)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

/// Exit codes for bt-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Run Outcomes (0-1)
    // ========================================================================
    /// Every check reported OK
    AllOk = 0,

    /// At least one check reported PROBLEM or UNDEFINED
    NotOk = 1,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments or unknown check name
    ArgsError = 10,

    /// Bundle missing or not recognizable
    BundleError = 11,

    /// Invalid search check definitions
    ConfigError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates that all checks passed.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::AllOk)
    }

    /// Check if this exit code is a run outcome (codes 0-1).
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::AllOk => "OK_ALL",
            ExitCode::NotOk => "OK_NOT_ALL",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::BundleError => "ERR_BUNDLE",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
