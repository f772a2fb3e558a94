//! Record store - persistence of RCAs, actions and incidents
//!
//! `FileStore` keeps one YAML file per record under the project directory.
//! Records can be loaded by full id or by any unique prefix of it.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::normalize::Normalizer;
use crate::core::project::{Project, RECORD_EXTENSION};
use crate::core::similarity::SimilarityIndex;
use crate::entities::action::RemedialAction;
use crate::entities::incident::IncidentReport;
use crate::entities::rca::RcaDocument;

/// Errors raised by record stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {prefix} record matches '{query}'")]
    NotFound { prefix: EntityPrefix, query: String },

    #[error("'{query}' matches {count} {prefix} records; use more characters")]
    Ambiguous {
        prefix: EntityPrefix,
        query: String,
        count: usize,
    },

    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to serialize {id}: {message}")]
    Serialize { id: EntityId, message: String },

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persistence boundary for all records
pub trait RecordStore {
    fn save_rca(&self, rca: &RcaDocument) -> Result<(), StoreError>;
    fn load_rca(&self, id: &str) -> Result<RcaDocument, StoreError>;
    fn list_rcas(&self) -> Result<Vec<RcaDocument>, StoreError>;

    fn save_action(&self, action: &RemedialAction) -> Result<(), StoreError>;
    fn load_action(&self, id: &str) -> Result<RemedialAction, StoreError>;
    /// Actions ordered by source RCA then sequence, optionally of one RCA only
    fn list_actions(&self, rca: Option<&EntityId>) -> Result<Vec<RemedialAction>, StoreError>;

    fn save_incident(&self, incident: &IncidentReport) -> Result<(), StoreError>;
    fn load_incident(&self, id: &str) -> Result<IncidentReport, StoreError>;
    fn list_incidents(&self) -> Result<Vec<IncidentReport>, StoreError>;
}

/// YAML file store rooted at a project
#[derive(Debug, Clone)]
pub struct FileStore {
    project: Project,
}

impl FileStore {
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Path of the file holding a record
    pub fn path_of(&self, id: &EntityId) -> PathBuf {
        self.project.entity_path(id)
    }

    fn save<T: Entity>(&self, entity: &T) -> Result<(), StoreError> {
        let path = self.path_of(entity.id());
        let yaml = serde_yml::to_string(entity).map_err(|e| StoreError::Serialize {
            id: entity.id().clone(),
            message: e.to_string(),
        })?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, yaml).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(id = %entity.id(), path = %path.display(), "saved record");
        Ok(())
    }

    fn load<T: Entity>(&self, query: &str) -> Result<T, StoreError> {
        let path = self.resolve(T::PREFIX, query)?;
        read_record(&path)
    }

    fn list<T: Entity>(&self) -> Result<Vec<T>, StoreError> {
        let mut records = Vec::new();
        for path in self.project.iter_entity_files(T::PREFIX) {
            match read_record::<T>(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    /// Find the file for a full id or a unique id prefix
    fn resolve(&self, prefix: EntityPrefix, query: &str) -> Result<PathBuf, StoreError> {
        let mut wanted = query.trim().to_uppercase();
        if !wanted.starts_with(&format!("{}-", prefix.as_str())) {
            wanted = format!("{}-{}", prefix.as_str(), wanted);
        }
        let not_found = || StoreError::NotFound {
            prefix,
            query: query.to_string(),
        };

        if let Ok(id) = EntityId::parse(&wanted) {
            if id.prefix() == prefix {
                let path = self.path_of(&id);
                return if path.is_file() { Ok(path) } else { Err(not_found()) };
            }
        }

        let candidates: Vec<PathBuf> = self
            .project
            .iter_entity_files(prefix)
            .filter(|path| record_stem(path).is_some_and(|stem| stem.starts_with(&wanted)))
            .collect();

        match candidates.len() {
            0 => Err(not_found()),
            1 => Ok(candidates.into_iter().next().ok_or_else(not_found)?),
            count => Err(StoreError::Ambiguous {
                prefix,
                query: query.to_string(),
                count,
            }),
        }
    }
}

/// Upper-cased file name without the record extension
fn record_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_suffix(RECORD_EXTENSION).map(str::to_uppercase)
}

fn read_record<T: Entity>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yml::from_str(&content).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl RecordStore for FileStore {
    fn save_rca(&self, rca: &RcaDocument) -> Result<(), StoreError> {
        self.save(rca)
    }

    fn load_rca(&self, id: &str) -> Result<RcaDocument, StoreError> {
        self.load(id)
    }

    fn list_rcas(&self) -> Result<Vec<RcaDocument>, StoreError> {
        self.list()
    }

    fn save_action(&self, action: &RemedialAction) -> Result<(), StoreError> {
        self.save(action)
    }

    fn load_action(&self, id: &str) -> Result<RemedialAction, StoreError> {
        self.load(id)
    }

    fn list_actions(&self, rca: Option<&EntityId>) -> Result<Vec<RemedialAction>, StoreError> {
        let mut actions: Vec<RemedialAction> = self
            .list::<RemedialAction>()?
            .into_iter()
            .filter(|a| rca.is_none_or(|id| &a.source_rca == id))
            .collect();
        actions.sort_by(|a, b| {
            a.source_rca
                .cmp(&b.source_rca)
                .then(a.sequence.cmp(&b.sequence))
        });
        Ok(actions)
    }

    fn save_incident(&self, incident: &IncidentReport) -> Result<(), StoreError> {
        self.save(incident)
    }

    fn load_incident(&self, id: &str) -> Result<IncidentReport, StoreError> {
        self.load(id)
    }

    fn list_incidents(&self) -> Result<Vec<IncidentReport>, StoreError> {
        self.list()
    }
}

/// Add or refresh an RCA in the similarity index
pub fn index_rca(index: &SimilarityIndex, normalizer: &Normalizer, rca: &RcaDocument) {
    let tokens = normalizer.tokens_of(&rca.recurrence_profile());
    index.insert(rca.id.clone(), &tokens);
}

/// Build the similarity index from every stored RCA, oldest first
pub fn build_index(
    store: &dyn RecordStore,
    normalizer: &Normalizer,
) -> Result<SimilarityIndex, StoreError> {
    let mut rcas = store.list_rcas()?;
    rcas.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));

    let index = SimilarityIndex::new();
    for rca in &rcas {
        index_rca(&index, normalizer, rca);
    }
    tracing::debug!(rcas = index.len(), "built similarity index");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extract::ExtractedFields;
    use crate::entities::action::ActionStatus;
    use tempfile::{tempdir, TempDir};

    fn store() -> (TempDir, FileStore) {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        (tmp, FileStore::new(project))
    }

    fn rca(title: &str, root_cause: &str) -> RcaDocument {
        let mut doc = RcaDocument::new(
            title.to_string(),
            format!("Root Cause: {}", root_cause),
            format!("root cause {}", root_cause.to_lowercase()),
            "alice".to_string(),
        );
        doc.record_extraction(ExtractedFields {
            root_cause: Some(root_cause.to_string()),
            ..Default::default()
        });
        doc
    }

    #[test]
    fn test_rca_save_and_load() {
        let (_tmp, store) = store();
        let doc = rca("Pump outage", "Bearing seal failure");
        store.save_rca(&doc).unwrap();

        let loaded = store.load_rca(&doc.id.to_string()).unwrap();
        assert_eq!(loaded, doc);
        assert!(store.path_of(&doc.id).is_file());
    }

    #[test]
    fn test_load_by_prefix() {
        let (_tmp, store) = store();
        let doc = rca("Pump outage", "Bearing seal failure");
        store.save_rca(&doc).unwrap();

        let full = doc.id.to_string();
        let loaded = store.load_rca(&full[..12].to_lowercase()).unwrap();
        assert_eq!(loaded.id, doc.id);

        // Prefix without the type tag
        let loaded = store.load_rca(&full[4..14]).unwrap();
        assert_eq!(loaded.id, doc.id);
    }

    #[test]
    fn test_ambiguous_and_missing() {
        let (_tmp, store) = store();
        store.save_rca(&rca("One", "a")).unwrap();
        store.save_rca(&rca("Two", "b")).unwrap();

        assert!(matches!(
            store.load_rca("RCA-"),
            Err(StoreError::Ambiguous { count: 2, .. })
        ));
        assert!(matches!(
            store.load_rca("RCA-ZZZZ"),
            Err(StoreError::NotFound { .. })
        ));
        let missing = EntityId::new(EntityPrefix::Rca).to_string();
        assert!(matches!(
            store.load_rca(&missing),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_unparseable_files_are_skipped() {
        let (_tmp, store) = store();
        let doc = rca("Pump outage", "Bearing seal failure");
        store.save_rca(&doc).unwrap();
        let broken = store.project().entity_dir(EntityPrefix::Rca).join("RCA-BROKEN.rca.yaml");
        std::fs::write(broken, "id: [not valid").unwrap();

        let all = store.list_rcas().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, doc.id);
    }

    #[test]
    fn test_list_actions_filters_and_orders() {
        let (_tmp, store) = store();
        let first = rca("One", "a");
        let second = rca("Two", "b");

        for (rca_id, sequence) in [(&first.id, 2), (&second.id, 1), (&first.id, 1)] {
            let action = RemedialAction::new(
                rca_id.clone(),
                sequence,
                format!("step {}", sequence),
                "alice".to_string(),
            );
            store.save_action(&action).unwrap();
        }

        let of_first = store.list_actions(Some(&first.id)).unwrap();
        assert_eq!(of_first.len(), 2);
        assert_eq!(of_first[0].sequence, 1);
        assert_eq!(of_first[1].sequence, 2);
        assert!(of_first.iter().all(|a| a.status == ActionStatus::Open));

        assert_eq!(store.list_actions(None).unwrap().len(), 3);
    }

    #[test]
    fn test_incident_roundtrip() {
        let (_tmp, store) = store();
        let incident = IncidentReport::new(
            "Pump seal failed again".to_string(),
            "pump seal failed again".to_string(),
            "alice".to_string(),
        );
        store.save_incident(&incident).unwrap();
        assert_eq!(store.list_incidents().unwrap(), vec![incident.clone()]);
        assert_eq!(store.load_incident(&incident.id.to_string()).unwrap(), incident);
    }

    #[test]
    fn test_build_index_from_store() {
        let (_tmp, store) = store();
        let seal = rca("Pump outage", "Bearing seal failure due to contamination");
        store.save_rca(&seal).unwrap();
        store.save_rca(&rca("Roaming outage", "VPLMN address flag rejected")).unwrap();

        let normalizer = Normalizer::default();
        let index = build_index(&store, &normalizer).unwrap();
        assert_eq!(index.len(), 2);

        let matches = index.rank(&normalizer.tokens_of("bearing seal contamination"), 0.3);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rca_id, seal.id);
    }

    #[test]
    fn test_build_index_on_empty_store() {
        let (_tmp, store) = store();
        let index = build_index(&store, &Normalizer::default()).unwrap();
        assert!(index.is_empty());
    }
}
