//! Bundle discovery: the root directory plus one [`Host`] per node subtree.

use crate::directory::{BundleFile, Directory};
use crate::error::{BundleError, Result};
use crate::file_type::{FileTypeRegistry, NodeRole};
use crate::{SUMMARY_ERRORS_REPORT, SUMMARY_REPORT};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

// Node directories are named `<IPv4>_<role>`; the suffix alternatives must
// stay in step with `NodeRole::from_dir_suffix`.
static HOST_DIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((?:(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9]))_(agent_public|agent|master)$",
    )
    .unwrap()
});

/// A cluster node captured in the bundle.
#[derive(Debug, Clone)]
pub struct Host {
    ip: Ipv4Addr,
    dir: Directory,
}

impl Host {
    pub fn new(ip: Ipv4Addr, dir: Directory) -> Self {
        Self { ip, dir }
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn role(&self) -> NodeRole {
        self.dir.role()
    }

    pub fn directory(&self) -> &Directory {
        &self.dir
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// See [`Directory::open_file`].
    pub fn open_file(&self, name: &str) -> Result<BundleFile> {
        self.dir.open_file(name)
    }

    /// See [`Directory::read_json`].
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.dir.read_json(name)
    }

    /// See [`Directory::scan_lines`].
    pub fn scan_lines<F>(&self, name: &str, visit: F) -> Result<PathBuf>
    where
        F: FnMut(usize, &str) -> ControlFlow<()>,
    {
        self.dir.scan_lines(name, visit)
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip && self.role() == other.role() && self.path() == other.path()
    }
}

impl Eq for Host {}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.role(), self.ip)
    }
}

/// A diagnostics bundle opened from disk.
///
/// Read-only once constructed; no file handles are held between calls.
#[derive(Debug, Clone)]
pub struct Bundle {
    root: Directory,
    hosts: Vec<Host>,
}

impl Bundle {
    /// Open a bundle using the built-in file catalogue.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_registry(path, FileTypeRegistry::builtin()?)
    }

    /// Open a bundle with an explicit file catalogue.
    ///
    /// Node directories are discovered in file-name order. A bundle without
    /// node directories is accepted as a single-node capture only when the
    /// root carries a summary report.
    pub fn open_with_registry(
        path: impl AsRef<Path>,
        registry: Arc<FileTypeRegistry>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let root_path = std::fs::canonicalize(path).map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let root = Directory::new(NodeRole::Root, &root_path, Arc::clone(&registry));

        let mut names = Vec::new();
        let entries = std::fs::read_dir(&root_path).map_err(|source| BundleError::Io {
            path: root_path.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| BundleError::Io {
                path: root_path.clone(),
                source,
            })?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        let mut hosts = Vec::new();
        let mut seen = HashSet::new();
        for name in names {
            let Some(caps) = HOST_DIR.captures(&name) else {
                debug!(dir = %name, "Skipping non-host directory");
                continue;
            };
            let ip: Ipv4Addr = match caps[1].parse() {
                Ok(ip) => ip,
                Err(_) => continue,
            };
            let role = match NodeRole::from_dir_suffix(&caps[2]) {
                Some(role) => role,
                None => unreachable!("host directory pattern accepted unknown role {}", &caps[2]),
            };
            if !seen.insert(ip) {
                return Err(BundleError::DuplicateHost { ip });
            }
            let dir = Directory::new(role, root_path.join(&name), Arc::clone(&registry));
            hosts.push(Host::new(ip, dir));
        }

        let bundle = Self { root, hosts };
        if bundle.hosts.is_empty() && !bundle.has_summary() {
            return Err(BundleError::BundleNotFound(root_path));
        }

        info!(
            path = %root_path.display(),
            masters = bundle.masters().len(),
            agents = bundle.agents().len(),
            public_agents = bundle.public_agents().len(),
            "Bundle opened"
        );
        Ok(bundle)
    }

    fn has_summary(&self) -> bool {
        [SUMMARY_REPORT, SUMMARY_ERRORS_REPORT]
            .iter()
            .any(|name| self.root.open_file(name).is_ok())
    }

    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// All hosts in discovery order.
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn hosts_with_role(&self, role: NodeRole) -> impl Iterator<Item = &Host> {
        self.hosts.iter().filter(move |h| h.role() == role)
    }

    pub fn masters(&self) -> Vec<&Host> {
        self.hosts_with_role(NodeRole::Master).collect()
    }

    pub fn agents(&self) -> Vec<&Host> {
        self.hosts_with_role(NodeRole::Agent).collect()
    }

    pub fn public_agents(&self) -> Vec<&Host> {
        self.hosts_with_role(NodeRole::PublicAgent).collect()
    }

    /// Find a host by IP.
    pub fn host(&self, ip: Ipv4Addr) -> Option<&Host> {
        self.hosts.iter().find(|h| h.ip == ip)
    }

    /// Visit every directory that may carry `name`: the root first, then
    /// hosts in discovery order. Stops when `visit` breaks.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the file catalogue.
    pub fn for_each_directory<F>(&self, name: &str, mut visit: F)
    where
        F: FnMut(&Directory) -> ControlFlow<()>,
    {
        let file_type = self.root.registry().get(name);
        let dirs = std::iter::once(&self.root).chain(self.hosts.iter().map(Host::directory));
        for dir in dirs.filter(|d| file_type.exists_on(d.role())) {
            if visit(dir).is_break() {
                return;
            }
        }
    }

    /// Like [`Bundle::for_each_directory`], but only for directories where
    /// the file could be opened.
    pub fn for_each_file<F>(&self, name: &str, mut visit: F)
    where
        F: FnMut(BundleFile) -> ControlFlow<()>,
    {
        self.for_each_directory(name, |dir| match dir.open_file(name) {
            Ok(file) => visit(file),
            Err(_) => ControlFlow::Continue(()),
        });
    }

    /// Decode the first copy of a cluster-wide JSON document that can be
    /// read, along with the directory it came from.
    ///
    /// When no copy decodes, the error from the last attempt is returned.
    pub fn read_any_json<T: DeserializeOwned>(&self, name: &str) -> Result<(T, &Directory)> {
        let mut found = None;
        let mut last_err = None;
        let dirs = std::iter::once(&self.root).chain(self.hosts.iter().map(Host::directory));
        let file_type = self.root.registry().get(name);
        for dir in dirs.filter(|d| file_type.exists_on(d.role())) {
            match dir.read_json(name) {
                Ok(value) => {
                    found = Some((value, dir));
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        match (found, last_err) {
            (Some(found), _) => Ok(found),
            (None, Some(err)) => Err(err),
            (None, None) => Err(BundleError::NotFound {
                file_type: name.to_string(),
                attempted: Vec::new(),
            }),
        }
    }
}
