//! Bundle triage core.
//!
//! Library side of the `bt-core` binary:
//! - [`config`]: resolution of the bundle path and extra search checks
//! - [`logging`]: stderr logging, human or JSONL
//! - [`runner`]: runs checks and collects their results
//! - [`report`]: human and JSON renderings of a run
//! - [`exit_codes`]: the process exit code contract
//! - [`error`]: errors that end a run, with remediation hints

pub mod config;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod report;
pub mod runner;
