//! Diagnostics bundle access for bundle triage.
//!
//! A bundle is a directory tree captured from a cluster: one subtree per
//! node (named `<IPv4>_<role>`) plus the bundle root itself. Files inside
//! the tree are addressed by *logical* name through a [`FileTypeRegistry`],
//! which maps each name to the node roles that carry it and to an ordered
//! list of candidate relative paths. Any candidate may also be stored
//! gzip-compressed as `<path>.gz`; the reader decompresses it transparently.
//!
//! # Example
//!
//! ```no_run
//! use bt_bundle::Bundle;
//! use std::ops::ControlFlow;
//!
//! let bundle = Bundle::open("/tmp/bundle").unwrap();
//! for master in bundle.masters() {
//!     let state: serde_json::Value = master.read_json("mesos-master-state").unwrap();
//!     println!("{} -> {}", master.ip(), state["hostname"]);
//! }
//! let agent = &bundle.agents()[0];
//! agent
//!     .scan_lines("mesos-agent-log", |n, line| {
//!         println!("{n}: {line}");
//!         ControlFlow::Continue(())
//!     })
//!     .unwrap();
//! ```

pub mod bundle;
pub mod directory;
pub mod error;
pub mod file_type;

pub use bundle::{Bundle, Host};
pub use directory::{BundleFile, Directory};
pub use error::{BundleError, RegistryError, Result};
pub use file_type::{ContentCategory, FileType, FileTypeRegistry, NodeRole};

/// Logical files whose presence at the root marks a single-node bundle.
pub const SUMMARY_REPORT: &str = "summary-report";
/// Fallback summary written when report generation itself failed.
pub const SUMMARY_ERRORS_REPORT: &str = "summary-errors-report";
