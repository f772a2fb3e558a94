//! RCA tracker - the closed loop over a record store
//!
//! Wires the normalizer, extractor, synthesizer, similarity index and
//! lifecycle manager to a [`RecordStore`]. The similarity index is built
//! from the store when the tracker is opened and kept current as RCAs are
//! ingested.

use thiserror::Error;

use crate::core::config::Config;
use crate::core::extract::FieldExtractor;
use crate::core::identity::EntityId;
use crate::core::lifecycle::{LifecycleError, LifecycleManager, Transition};
use crate::core::normalize::{NormalizeError, Normalizer};
use crate::core::similarity::{SimilarityIndex, DEFAULT_MAX_MATCHES, DEFAULT_THRESHOLD};
use crate::core::store::{build_index, index_rca, RecordStore, StoreError};
use crate::core::synthesize::{ActionSynthesizer, Synthesis};
use crate::entities::action::RemedialAction;
use crate::entities::incident::IncidentReport;
use crate::entities::rca::{Environment, RcaDocument};

/// Errors raised by tracker operations
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// A document to ingest
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub title: String,
    pub raw_text: String,
    pub oem: Option<String>,
    pub environment: Option<Environment>,
}

/// Outcome of ingesting or re-extracting a document
#[derive(Debug, Clone)]
pub struct Ingested {
    pub rca: RcaDocument,
    pub synthesis: Synthesis,
}

/// Processing settings of a tracker
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub normalizer: Normalizer,
    pub extractor: FieldExtractor,
    pub synthesizer: ActionSynthesizer,
    pub lifecycle: LifecycleManager,
    pub threshold: f64,
    pub max_matches: usize,
    pub author: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            normalizer: Normalizer::default(),
            extractor: FieldExtractor::default(),
            synthesizer: ActionSynthesizer::default(),
            lifecycle: LifecycleManager::default(),
            threshold: DEFAULT_THRESHOLD,
            max_matches: DEFAULT_MAX_MATCHES,
            author: "unknown".to_string(),
        }
    }
}

impl TrackerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            normalizer: config.normalizer(),
            extractor: FieldExtractor::new(config.section_table()),
            synthesizer: config.synthesizer(),
            lifecycle: LifecycleManager::new(config.lifecycle_policy()),
            threshold: config.threshold(),
            max_matches: config.max_matches(),
            author: config.author(),
        }
    }
}

/// Closed-loop RCA operations over a store
pub struct RcaTracker<S: RecordStore> {
    store: S,
    settings: TrackerSettings,
    index: SimilarityIndex,
}

impl<S: RecordStore> RcaTracker<S> {
    /// Open a tracker, building the similarity index from stored RCAs
    pub fn open(store: S, settings: TrackerSettings) -> Result<Self, TrackerError> {
        let index = build_index(&store, &settings.normalizer)?;
        Ok(Self {
            store,
            settings,
            index,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Store a new document, extract its fields and synthesize its actions
    pub fn ingest(&self, document: NewDocument) -> Result<Ingested, TrackerError> {
        let normalized = self.settings.normalizer.normalize(&document.raw_text)?;

        let mut rca = RcaDocument::new(
            document.title,
            document.raw_text,
            normalized.text,
            self.settings.author.clone(),
        );
        rca.oem = document.oem;
        rca.environment = document.environment;

        let fields = self.settings.extractor.extract(&rca.raw_text);
        rca.record_extraction(fields);
        if rca.needs_review() {
            tracing::warn!(rca = %rca.id, "no root cause found; document needs review");
        }

        let synthesis = self.settings.synthesizer.synthesize(
            &rca.id,
            rca.long_term_solutions(),
            &[],
            &self.settings.author,
        );

        self.store.save_rca(&rca)?;
        for action in &synthesis.created {
            self.store.save_action(action)?;
        }
        index_rca(&self.index, &self.settings.normalizer, &rca);

        tracing::info!(
            rca = %rca.id,
            actions = synthesis.created.len(),
            "ingested rca document"
        );
        Ok(Ingested { rca, synthesis })
    }

    /// Run extraction again, append the snapshot and merge new actions
    pub fn reextract(&self, rca_id: &str) -> Result<Ingested, TrackerError> {
        let mut rca = self.store.load_rca(rca_id)?;
        let fields = self.settings.extractor.extract(&rca.raw_text);
        rca.record_extraction(fields);

        let existing = self.store.list_actions(Some(&rca.id))?;
        let synthesis = self.settings.synthesizer.synthesize(
            &rca.id,
            rca.long_term_solutions(),
            &existing,
            &self.settings.author,
        );

        self.store.save_rca(&rca)?;
        for action in &synthesis.created {
            self.store.save_action(action)?;
        }
        index_rca(&self.index, &self.settings.normalizer, &rca);

        if !synthesis.stale.is_empty() {
            tracing::warn!(
                rca = %rca.id,
                stale = synthesis.stale.len(),
                "actions no longer match a long term solution"
            );
        }
        Ok(Ingested { rca, synthesis })
    }

    /// Record an incident and rank the RCAs it resembles
    pub fn check_incident(&self, raw_text: &str) -> Result<IncidentReport, TrackerError> {
        let normalized = self.settings.normalizer.normalize(raw_text)?;
        let mut incident = IncidentReport::new(
            raw_text.to_string(),
            normalized.text,
            self.settings.author.clone(),
        );
        let matches = self.index.rank_top(
            &normalized.tokens,
            self.settings.threshold,
            Some(self.settings.max_matches),
        );
        incident.set_matches(matches, self.settings.threshold);

        self.store.save_incident(&incident)?;
        tracing::info!(
            incident = %incident.id,
            matches = incident.matched_rca_candidates.len(),
            "checked incident"
        );
        Ok(incident)
    }

    /// Recompute an incident's matches against the current corpus
    pub fn refresh_incident(&self, incident_id: &str) -> Result<IncidentReport, TrackerError> {
        let mut incident = self.store.load_incident(incident_id)?;
        let tokens = self.settings.normalizer.tokenize(&incident.normalized_text);
        let matches = self.index.rank_top(
            &tokens,
            self.settings.threshold,
            Some(self.settings.max_matches),
        );
        incident.set_matches(matches, self.settings.threshold);
        self.store.save_incident(&incident)?;
        Ok(incident)
    }

    /// Apply a lifecycle transition to a stored action and save it
    pub fn transition(
        &self,
        action_id: &str,
        transition: Transition,
    ) -> Result<RemedialAction, TrackerError> {
        let mut action = self.store.load_action(action_id)?;
        self.settings.lifecycle.apply(&mut action, transition)?;
        self.store.save_action(&action)?;
        Ok(action)
    }

    /// Load the RCA an action came from
    pub fn source_of(&self, action: &RemedialAction) -> Result<RcaDocument, TrackerError> {
        Ok(self.store.load_rca(&action.source_rca.to_string())?)
    }

    /// Ids of the actions of an RCA
    pub fn action_ids(&self, rca: &EntityId) -> Result<Vec<EntityId>, TrackerError> {
        Ok(self
            .store
            .list_actions(Some(rca))?
            .into_iter()
            .map(|a| a.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::project::Project;
    use crate::core::store::FileStore;
    use crate::entities::action::{ActionStatus, Evidence};
    use tempfile::{tempdir, TempDir};

    const BEARING_RCA: &str = "Root Cause: Bearing seal failure due to contamination\n\
                               Long Term Solutions: 1. Install inline filter 2. Revise maintenance interval";

    fn tracker() -> (TempDir, RcaTracker<FileStore>) {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let settings = TrackerSettings {
            author: "alice".to_string(),
            ..Default::default()
        };
        let tracker = RcaTracker::open(FileStore::new(project), settings).unwrap();
        (tmp, tracker)
    }

    fn document(title: &str, text: &str) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            raw_text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ingest_extracts_and_synthesizes() {
        let (_tmp, tracker) = tracker();
        let ingested = tracker.ingest(document("Line 3 pump outage", BEARING_RCA)).unwrap();

        assert_eq!(
            ingested.rca.root_cause(),
            Some("Bearing seal failure due to contamination")
        );
        let actions = tracker.store().list_actions(Some(&ingested.rca.id)).unwrap();
        let descriptions: Vec<&str> = actions.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["Install inline filter", "Revise maintenance interval"]
        );
        assert!(actions.iter().all(|a| a.status == ActionStatus::Open));
        assert!(tracker.index().contains(&ingested.rca.id));
    }

    #[test]
    fn test_ingest_rejects_empty_text() {
        let (_tmp, tracker) = tracker();
        let err = tracker.ingest(document("Empty", "  \n --- \n")).unwrap_err();
        assert!(matches!(err, TrackerError::Normalize(NormalizeError::EmptyInput)));
        assert!(tracker.store().list_rcas().unwrap().is_empty());
    }

    #[test]
    fn test_ingest_without_root_cause_needs_review() {
        let (_tmp, tracker) = tracker();
        let ingested = tracker
            .ingest(document("Notes", "Corrective actions\n- Replace pump"))
            .unwrap();
        assert!(ingested.rca.needs_review());
        assert_eq!(ingested.synthesis.created.len(), 1);
    }

    #[test]
    fn test_reextract_is_idempotent() {
        let (_tmp, tracker) = tracker();
        let ingested = tracker.ingest(document("Line 3 pump outage", BEARING_RCA)).unwrap();
        let before = tracker.action_ids(&ingested.rca.id).unwrap();

        let again = tracker.reextract(&ingested.rca.id.to_string()).unwrap();
        assert!(again.synthesis.created.is_empty());
        assert_eq!(again.synthesis.retained, before);
        assert_eq!(again.rca.extractions.len(), 2);
        assert_eq!(tracker.action_ids(&ingested.rca.id).unwrap(), before);
    }

    #[test]
    fn test_incident_matches_ingested_rca() {
        let (_tmp, tracker) = tracker();
        let seal = tracker.ingest(document("Line 3 pump outage", BEARING_RCA)).unwrap();
        tracker
            .ingest(document(
                "Roaming",
                "Root Cause: VPLMN dynamic address flag set in HSS\nLong term solutions\n- Validate connectivity",
            ))
            .unwrap();

        let incident = tracker
            .check_incident("seal contamination causing bearing wear")
            .unwrap();
        let top = incident.top_match().unwrap();
        assert_eq!(top.rca_id, seal.rca.id);
        assert!(top.score > DEFAULT_THRESHOLD);
        assert_eq!(incident.matched_rca_candidates.len(), 1);

        let stored = tracker.store().load_incident(&incident.id.to_string()).unwrap();
        assert_eq!(stored, incident);
    }

    #[test]
    fn test_incident_without_corpus() {
        let (_tmp, tracker) = tracker();
        let incident = tracker.check_incident("printer jammed").unwrap();
        assert!(incident.matched_rca_candidates.is_empty());
    }

    #[test]
    fn test_refresh_sees_new_rcas() {
        let (_tmp, tracker) = tracker();
        let incident = tracker
            .check_incident("seal contamination causing bearing wear")
            .unwrap();
        assert!(incident.matched_rca_candidates.is_empty());

        tracker.ingest(document("Line 3 pump outage", BEARING_RCA)).unwrap();
        let refreshed = tracker.refresh_incident(&incident.id.to_string()).unwrap();
        assert_eq!(refreshed.matched_rca_candidates.len(), 1);
    }

    #[test]
    fn test_reextract_keeps_tie_order() {
        let (tmp, tracker) = tracker();
        let older = tracker.ingest(document("Line 3 pump outage", BEARING_RCA)).unwrap();
        let newer = tracker.ingest(document("Line 3 pump outage", BEARING_RCA)).unwrap();

        let before = tracker.check_incident("bearing seal contamination").unwrap();
        assert_eq!(before.top_match().map(|m| &m.rca_id), Some(&newer.rca.id));

        tracker.reextract(&older.rca.id.to_string()).unwrap();
        let after = tracker.check_incident("bearing seal contamination").unwrap();
        let ids: Vec<&EntityId> = after.matched_rca_candidates.iter().map(|m| &m.rca_id).collect();
        assert_eq!(ids, vec![&newer.rca.id, &older.rca.id]);

        let project = Project::discover_from(tmp.path()).unwrap();
        let reopened = RcaTracker::open(FileStore::new(project), TrackerSettings::default()).unwrap();
        let again = reopened.check_incident("bearing seal contamination").unwrap();
        assert_eq!(again.top_match().map(|m| &m.rca_id), Some(&newer.rca.id));
    }

    #[test]
    fn test_reopened_tracker_rebuilds_index() {
        let (tmp, tracker) = tracker();
        let seal = tracker.ingest(document("Line 3 pump outage", BEARING_RCA)).unwrap();
        drop(tracker);

        let project = Project::discover_from(tmp.path()).unwrap();
        let reopened = RcaTracker::open(FileStore::new(project), TrackerSettings::default()).unwrap();
        assert!(reopened.index().contains(&seal.rca.id));
    }

    #[test]
    fn test_transition_persists() {
        let (_tmp, tracker) = tracker();
        let ingested = tracker.ingest(document("Line 3 pump outage", BEARING_RCA)).unwrap();
        let id = ingested.synthesis.created[0].id.to_string();

        tracker
            .transition(&id, Transition::Assign { owner: "bob".into() })
            .unwrap();
        tracker
            .transition(
                &id,
                Transition::SubmitEvidence(Evidence::Text("Filter fitted".into())),
            )
            .unwrap();
        let err = tracker.transition(&id, Transition::Start).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Lifecycle(LifecycleError::InvalidTransition { .. })
        ));

        let stored = tracker.store().load_action(&id).unwrap();
        assert_eq!(stored.status, ActionStatus::EvidenceSubmitted);
        assert_eq!(tracker.source_of(&stored).unwrap().id, ingested.rca.id);
    }
}
