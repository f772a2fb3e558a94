//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};

/// Name of the project marker directory
pub const PROJECT_DIR: &str = ".rca";

/// File extension of record files
pub const RECORD_EXTENSION: &str = ".rca.yaml";

/// Represents an rcatrack project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .rca/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }
        Self::create(root)
    }

    /// Initialize even if .rca/ exists, recreating missing directories and a
    /// missing config file. An existing config file and existing records are
    /// left in place.
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create(root)
    }

    fn create(root: PathBuf) -> Result<Self, ProjectError> {
        let rca_dir = root.join(PROJECT_DIR);
        std::fs::create_dir_all(&rca_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;
        let config = rca_dir.join("config.yaml");
        if config.exists() {
            tracing::debug!(path = %config.display(), "keeping existing project config");
        } else {
            std::fs::write(&config, Self::default_config())
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        for prefix in EntityPrefix::all() {
            std::fs::create_dir_all(root.join(prefix.directory()))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# rcatrack project configuration

# Default author for new records (can be overridden by global config)
# author: ""

# Minimum cosine similarity for an RCA to count as a recurrence match
similarity_threshold: 0.3

# Matches shown per incident
max_matches: 5

# Let an action owner verify their own evidence
allow_self_verification: false

# Due date for newly synthesized actions, in days from ingestion
# default_due_days: 14

# Replace the built-in stop words
# stop_words: [a, an, the, of, to]

# Replace the header synonyms of a section
# section_header_synonyms:
#   root_cause: ["root cause", "primary cause"]
#   long_term_solutions: ["long term solutions", "corrective actions"]
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .rca configuration directory
    pub fn rca_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Directory holding records of a type
    pub fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(prefix.directory())
    }

    /// Get the path of a record file
    pub fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.entity_dir(id.prefix())
            .join(format!("{}{}", id, RECORD_EXTENSION))
    }

    /// Iterate all record files of a given prefix type
    pub fn iter_entity_files(&self, prefix: EntityPrefix) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(self.entity_dir(prefix))
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy().ends_with(RECORD_EXTENSION))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not an rcatrack project (searched from {searched_from:?}). Run 'rca init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("rcatrack project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.rca_dir().exists());
        assert!(project.rca_dir().join("config.yaml").exists());
        assert!(project.root().join("rcas").is_dir());
        assert!(project.root().join("actions").is_dir());
        assert!(project.root().join("incidents").is_dir());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
        assert!(Project::init_force(tmp.path()).is_ok());
    }

    #[test]
    fn test_init_force_keeps_existing_config() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let config = project.rca_dir().join("config.yaml");
        std::fs::write(&config, "similarity_threshold: 0.55\n").unwrap();
        std::fs::remove_dir_all(project.root().join("incidents")).unwrap();

        let project = Project::init_force(tmp.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&config).unwrap(),
            "similarity_threshold: 0.55\n"
        );
        assert!(project.root().join("incidents").is_dir());

        std::fs::remove_file(&config).unwrap();
        Project::init_force(tmp.path()).unwrap();
        assert!(std::fs::read_to_string(&config)
            .unwrap()
            .contains("similarity_threshold: 0.3"));
    }

    #[test]
    fn test_project_discover_finds_rca_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_rca_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_entity_paths() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let id = EntityId::new(EntityPrefix::Act);

        let path = project.entity_path(&id);
        assert!(path.starts_with(project.root().join("actions")));
        assert!(path.to_string_lossy().ends_with(".rca.yaml"));

        std::fs::write(&path, "x").unwrap();
        std::fs::write(project.entity_dir(EntityPrefix::Act).join("notes.txt"), "x").unwrap();
        let files: Vec<PathBuf> = project.iter_entity_files(EntityPrefix::Act).collect();
        assert_eq!(files, vec![path]);
    }
}
