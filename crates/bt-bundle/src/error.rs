//! Error types for bundle operations.

use crate::file_type::NodeRole;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading data out of a bundle.
///
/// These describe bad or missing bundle data; checks turn them into
/// UNDEFINED results rather than aborting.
#[derive(Error, Debug)]
pub enum BundleError {
    /// The logical file is not captured on nodes of this role.
    #[error("{file_type} files do not belong to {role} hosts")]
    RoleMismatch { file_type: String, role: NodeRole },

    /// None of the candidate paths exist, plain or gzip-compressed.
    #[error("none of the following files are found:\n{}", join_paths(.attempted))]
    NotFound {
        file_type: String,
        attempted: Vec<PathBuf>,
    },

    /// I/O error other than "does not exist"
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was found but its JSON body could not be decoded.
    #[error("cannot decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The directory does not look like a diagnostics bundle.
    #[error("bundle not found in the given directory: {}", .0.display())]
    BundleNotFound(PathBuf),

    /// Two node directories claim the same IP.
    #[error("host {ip} appears more than once in the bundle")]
    DuplicateHost { ip: Ipv4Addr },

    /// The file catalogue could not be loaded.
    #[error("file catalogue error: {0}")]
    Catalogue(#[from] RegistryError),
}

impl BundleError {
    /// True when the error means "the data is simply not there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, BundleError::NotFound { .. })
    }
}

/// Errors in the file-type catalogue itself.
///
/// The catalogue is fixed at build time, so any of these indicates a
/// catalogue bug rather than bad bundle data.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("file type {0} is registered twice")]
    Duplicate(String),

    #[error("file type {name:?} is missing required field {field}")]
    MissingField { name: String, field: &'static str },

    #[error("unknown file type: {0}")]
    UnknownFileType(String),

    #[error("file type {name} has unknown directory type {value:?}")]
    UnknownRole { name: String, value: String },

    #[error("file type {name} has unknown content type {value:?}")]
    UnknownContentType { name: String, value: String },

    #[error("cannot parse file catalogue: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
