//! Checks for diagnostics bundles.
//!
//! A [`Check`] is an independent health rule evaluated against a
//! [`Bundle`](bt_bundle::Bundle); it yields zero or more [`CheckResult`]s,
//! each OK, PROBLEM or UNDEFINED. Most checks are built with
//! [`CheckFuncBuilder`], which runs a per-host collector over the nodes of
//! the selected roles and hands the tagged outputs to one aggregator.
//!
//! - [`search`]: log-scanning checks driven by a YAML catalogue
//! - [`checks`]: concrete checks, including VIP and container IP reconciliation
//! - [`registry`]: name-indexed, write-once check catalogue

pub mod builder;
pub mod check;
pub mod checks;
pub mod error;
pub mod mesos;
pub mod registry;
pub mod result;
pub mod search;

pub use builder::{Aggregate, CheckFuncBuilder, Collector};
pub use check::{Check, CheckFn};
pub use error::{CheckError, Result};
pub use registry::CheckRegistry;
pub use result::{split_observations, CheckResult, Evidence, Observation, ResultsExt, Status};
pub use search::{SearchCheck, SearchRule};
