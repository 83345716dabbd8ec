//! Errors raised while defining and registering checks.
//!
//! These are start-up errors: a check that fails to build or register is a
//! defect in the check catalogue, not in the bundle being analyzed. Problems
//! found in bundle data are reported through [`CheckResult`](crate::CheckResult)
//! instead.

use bt_bundle::{NodeRole, RegistryError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("a check needs at least one collector")]
    NoCollectors,

    #[error("collector for {0} hosts is defined twice")]
    DuplicateCollector(NodeRole),

    #[error("cannot collect from {0} directories; only node roles are supported")]
    UnsupportedRole(NodeRole),

    #[error("check {check:?} is missing required field {field}")]
    MissingField { check: String, field: &'static str },

    #[error(
        "description of check {check} should start with a verb in the third person, e.g. \"Checks\" or \"Detects\": {description:?}"
    )]
    Description { check: String, description: String },

    #[error("check {0} is registered twice")]
    Duplicate(String),

    #[error("unknown check: {0}")]
    UnknownCheck(String),

    #[error("check {check}: invalid pattern {pattern:?}: {source}")]
    Pattern {
        check: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("check {0}: curePattern cannot be combined with failIfNotFound")]
    CureWithFailIfNotFound(String),

    #[error("check {check}: {source}")]
    FileType {
        check: String,
        #[source]
        source: RegistryError,
    },

    #[error("cannot read search checks from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse search checks: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CheckError>;
