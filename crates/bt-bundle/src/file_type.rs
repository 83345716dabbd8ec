//! Logical file catalogue.
//!
//! Each [`FileType`] names a logical file (e.g. `mesos-master-state`), the
//! node roles that carry it, and the candidate paths it may be stored under
//! relative to a node directory. The built-in catalogue is embedded as YAML
//! and loaded once; afterwards the registry is only ever read.

use crate::error::RegistryError;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

const BUILTIN_CATALOGUE: &str = include_str!("file_types.yaml");

static BUILTIN: OnceCell<Arc<FileTypeRegistry>> = OnceCell::new();

/// Role of a directory inside a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// The bundle's own top-level directory.
    Root,
    Master,
    Agent,
    PublicAgent,
}

impl NodeRole {
    /// Roles that correspond to cluster nodes, in collection order.
    pub const NODES: [NodeRole; 3] = [NodeRole::Master, NodeRole::Agent, NodeRole::PublicAgent];

    /// Map the suffix of a `<IPv4>_<suffix>` node directory to a role.
    pub fn from_dir_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "master" => Some(NodeRole::Master),
            "agent" => Some(NodeRole::Agent),
            "agent_public" => Some(NodeRole::PublicAgent),
            _ => None,
        }
    }

    /// Parse the role names used by the catalogue.
    fn from_catalogue(value: &str) -> Option<Self> {
        match value {
            "root" => Some(NodeRole::Root),
            "master" => Some(NodeRole::Master),
            "agent" => Some(NodeRole::Agent),
            "public agent" => Some(NodeRole::PublicAgent),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Root => write!(f, "root"),
            NodeRole::Master => write!(f, "master"),
            NodeRole::Agent => write!(f, "agent"),
            NodeRole::PublicAgent => write!(f, "public agent"),
        }
    }
}

/// How the content of a logical file is structured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    /// A single JSON document.
    Json,
    /// Line-oriented text: journal units, dmesg, command output.
    LineLog,
    Other,
}

impl ContentCategory {
    fn from_catalogue(value: &str) -> Option<Self> {
        match value {
            "json" => Some(ContentCategory::Json),
            "journal" | "dmesg" | "output" | "log" => Some(ContentCategory::LineLog),
            "other" => Some(ContentCategory::Other),
            _ => None,
        }
    }
}

/// A logical file and where to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileType {
    pub name: String,
    pub description: String,
    pub content: ContentCategory,
    /// Node roles that carry this file. Never empty.
    pub roles: Vec<NodeRole>,
    /// Candidate paths relative to a node directory, tried in order. Never empty.
    pub paths: Vec<String>,
}

impl FileType {
    /// Whether directories of `role` may carry this file.
    pub fn exists_on(&self, role: NodeRole) -> bool {
        self.roles.contains(&role)
    }
}

/// Catalogue entry as written in YAML.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogueEntry {
    name: String,
    content_type: String,
    #[serde(default)]
    paths: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    dir_types: Vec<String>,
}

impl TryFrom<CatalogueEntry> for FileType {
    type Error = RegistryError;

    fn try_from(entry: CatalogueEntry) -> Result<Self, Self::Error> {
        let content = ContentCategory::from_catalogue(&entry.content_type).ok_or_else(|| {
            RegistryError::UnknownContentType {
                name: entry.name.clone(),
                value: entry.content_type.clone(),
            }
        })?;
        let roles = entry
            .dir_types
            .iter()
            .map(|value| {
                NodeRole::from_catalogue(value).ok_or_else(|| RegistryError::UnknownRole {
                    name: entry.name.clone(),
                    value: value.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FileType {
            name: entry.name,
            description: entry.description,
            content,
            roles,
            paths: entry.paths,
        })
    }
}

/// Name-indexed catalogue of logical files.
#[derive(Debug, Default)]
pub struct FileTypeRegistry {
    types: HashMap<String, FileType>,
}

impl FileTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in catalogue, parsed on first use and shared afterwards.
    pub fn builtin() -> Result<Arc<Self>, RegistryError> {
        BUILTIN
            .get_or_try_init(|| Self::from_yaml(BUILTIN_CATALOGUE).map(Arc::new))
            .cloned()
    }

    /// Build a registry from a YAML list of catalogue entries.
    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        let entries: Vec<CatalogueEntry> = serde_yaml::from_str(yaml)?;
        let mut registry = Self::new();
        for entry in entries {
            registry.register(FileType::try_from(entry)?)?;
        }
        debug!(file_types = registry.len(), "File catalogue loaded");
        Ok(registry)
    }

    /// Add a file type. Names are unique; roles and paths must be non-empty.
    pub fn register(&mut self, file_type: FileType) -> Result<(), RegistryError> {
        if file_type.name.is_empty() {
            return Err(RegistryError::MissingField {
                name: file_type.name,
                field: "name",
            });
        }
        if file_type.paths.is_empty() {
            return Err(RegistryError::MissingField {
                name: file_type.name,
                field: "paths",
            });
        }
        if file_type.roles.is_empty() {
            return Err(RegistryError::MissingField {
                name: file_type.name,
                field: "dirTypes",
            });
        }
        if self.types.contains_key(&file_type.name) {
            return Err(RegistryError::Duplicate(file_type.name));
        }
        self.types.insert(file_type.name.clone(), file_type);
        Ok(())
    }

    /// Look up a file type by name.
    pub fn lookup(&self, name: &str) -> Result<&FileType, RegistryError> {
        self.types
            .get(name)
            .ok_or_else(|| RegistryError::UnknownFileType(name.to_string()))
    }

    /// Look up a file type that the caller knows to be registered.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the catalogue. Check and search-check
    /// registration validate their file names against the registry, so
    /// reaching this panic means a catalogue bug.
    pub fn get(&self, name: &str) -> &FileType {
        match self.types.get(name) {
            Some(file_type) => file_type,
            None => panic!("bt-bundle: unknown file type {name}"),
        }
    }

    /// All file types sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &FileType> {
        let mut types: Vec<&FileType> = self.types.values().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        types.into_iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_type(name: &str) -> FileType {
        FileType {
            name: name.to_string(),
            description: "test log".to_string(),
            content: ContentCategory::LineLog,
            roles: vec![NodeRole::Agent, NodeRole::PublicAgent],
            paths: vec!["a.log".to_string(), "b.log".to_string()],
        }
    }

    #[test]
    fn test_lookup_returns_registered_fields() {
        let mut registry = FileTypeRegistry::new();
        registry.register(log_type("agent-log")).unwrap();

        let found = registry.lookup("agent-log").unwrap();
        assert_eq!(found, &log_type("agent-log"));
        assert!(found.exists_on(NodeRole::PublicAgent));
        assert!(!found.exists_on(NodeRole::Master));
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut registry = FileTypeRegistry::new();
        registry.register(log_type("agent-log")).unwrap();
        let err = registry.register(log_type("agent-log")).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "agent-log"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_requires_paths_and_roles() {
        let mut registry = FileTypeRegistry::new();

        let mut no_paths = log_type("x");
        no_paths.paths.clear();
        assert!(matches!(
            registry.register(no_paths),
            Err(RegistryError::MissingField { field: "paths", .. })
        ));

        let mut no_roles = log_type("y");
        no_roles.roles.clear();
        assert!(matches!(
            registry.register(no_roles),
            Err(RegistryError::MissingField { field: "dirTypes", .. })
        ));

        assert!(matches!(
            registry.register(log_type("")),
            Err(RegistryError::MissingField { field: "name", .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = FileTypeRegistry::new();
        assert!(matches!(
            registry.lookup("nope"),
            Err(RegistryError::UnknownFileType(_))
        ));
    }

    #[test]
    #[should_panic(expected = "unknown file type nope")]
    fn test_get_unknown_panics() {
        FileTypeRegistry::new().get("nope");
    }

    #[test]
    fn test_from_yaml_converts_roles_and_content() {
        let yaml = r#"
- name: net-log
  contentType: journal
  paths: [dcos-net.service]
  dirTypes: [master, agent, public agent]
- name: summary-report
  contentType: other
  paths: [summaryReport.txt]
  dirTypes: [root]
"#;
        let registry = FileTypeRegistry::from_yaml(yaml).unwrap();
        let net = registry.get("net-log");
        assert_eq!(net.content, ContentCategory::LineLog);
        assert_eq!(net.roles, NodeRole::NODES.to_vec());
        assert_eq!(registry.get("summary-report").roles, vec![NodeRole::Root]);
    }

    #[test]
    fn test_from_yaml_unknown_role() {
        let yaml = r#"
- name: x
  contentType: json
  paths: [x.json]
  dirTypes: [worker]
"#;
        let err = FileTypeRegistry::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownRole { value, .. } if value == "worker"));
    }

    #[test]
    fn test_from_yaml_unknown_content_type() {
        let yaml = r#"
- name: x
  contentType: parquet
  paths: [x.parquet]
  dirTypes: [master]
"#;
        let err = FileTypeRegistry::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownContentType { .. }));
    }

    #[test]
    fn test_builtin_catalogue_loads() {
        let registry = FileTypeRegistry::builtin().unwrap();
        for name in [
            "summary-report",
            "summary-errors-report",
            "mesos-master-state",
            "mesos-agent-containers",
            "vips",
            "net-log",
            "ps",
        ] {
            assert!(registry.lookup(name).is_ok(), "missing {name}");
        }
        assert_eq!(
            registry.get("mesos-master-state").content,
            ContentCategory::Json
        );
        let names: Vec<&str> = registry.iter().map(|t| t.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_role_suffixes() {
        assert_eq!(NodeRole::from_dir_suffix("master"), Some(NodeRole::Master));
        assert_eq!(NodeRole::from_dir_suffix("agent"), Some(NodeRole::Agent));
        assert_eq!(
            NodeRole::from_dir_suffix("agent_public"),
            Some(NodeRole::PublicAgent)
        );
        assert_eq!(NodeRole::from_dir_suffix("root"), None);
        assert_eq!(NodeRole::PublicAgent.to_string(), "public agent");
    }
}
