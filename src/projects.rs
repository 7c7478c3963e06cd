//! Read-only view over the project snapshot produced by the scanner.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::RegistryError;

/// Size of a project's dependency folder as reported by the scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySize {
    Bytes(u64),
    Label(String),
}

/// A discovered project. Identity is `path`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescriptor {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub run_command: Option<String>,
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(default)]
    pub has_dependencies_installed: bool,
    #[serde(default, alias = "nodeModulesSize")]
    pub dependency_size: Option<DependencySize>,
}

/// A descriptor together with the exact JSON text it was read from, so
/// listing a snapshot hands back what the scanner wrote, key order included.
#[derive(Debug, Clone)]
pub struct Project {
    pub descriptor: ProjectDescriptor,
    raw: Box<RawValue>,
}

impl Serialize for Project {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

/// Snapshot file wrapped in an object, `{ "projects": [...] }`. Raw values
/// cannot pass through an untagged enum, so the bare-array form is told
/// apart by its first character instead.
#[derive(Deserialize)]
struct WrappedSnapshot {
    projects: Vec<Box<RawValue>>,
}

/// Holds the current snapshot. Reload swaps it wholesale.
pub struct ProjectRegistry {
    source: PathBuf,
    snapshot: RwLock<Arc<Vec<Project>>>,
}

impl ProjectRegistry {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Creates the registry and loads the snapshot once. A missing or broken
    /// file leaves the registry empty.
    pub fn open(source: impl Into<PathBuf>) -> Self {
        let registry = Self::new(source);
        if let Err(e) = registry.reload() {
            warn!("Starting with an empty project list: {}", e);
        }
        registry
    }

    /// Re-reads the snapshot from disk and returns the project count. On
    /// failure the previous snapshot stays in place.
    pub fn reload(&self) -> Result<usize, RegistryError> {
        let projects = read_snapshot(&self.source)?;
        let count = projects.len();
        *self.snapshot.write() = Arc::new(projects);
        info!("Loaded {} projects from {:?}", count, self.source);
        Ok(count)
    }

    pub fn projects(&self) -> Arc<Vec<Project>> {
        self.snapshot.read().clone()
    }

    /// Projects whose dependency folder was present at scan time
    pub fn with_dependencies(&self) -> Vec<Project> {
        self.projects()
            .iter()
            .filter(|p| p.descriptor.has_dependencies_installed)
            .cloned()
            .collect()
    }

    pub fn find(&self, path: &str) -> Option<ProjectDescriptor> {
        self.projects()
            .iter()
            .find(|p| p.descriptor.path == path)
            .map(|p| p.descriptor.clone())
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_snapshot(path: &Path) -> Result<Vec<Project>, RegistryError> {
    let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let entries: Vec<Box<RawValue>> = if contents.trim_start().starts_with('[') {
        serde_json::from_str(&contents).map_err(parse_err)?
    } else {
        serde_json::from_str::<WrappedSnapshot>(&contents)
            .map_err(parse_err)?
            .projects
    };

    entries
        .into_iter()
        .map(|raw| -> Result<Project, RegistryError> {
            let descriptor = serde_json::from_str(raw.get()).map_err(parse_err)?;
            Ok(Project { descriptor, raw })
        })
        .collect()
}
