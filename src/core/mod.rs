//! Core module - fundamental types and the closed-loop RCA engine

pub mod config;
pub mod entity;
pub mod extract;
pub mod identity;
pub mod lifecycle;
pub mod normalize;
pub mod project;
pub mod similarity;
pub mod store;
pub mod synthesize;
pub mod tracker;

pub use config::{Config, ConfigError};
pub use entity::Entity;
pub use extract::{ExtractedFields, FieldExtractor, SectionKind, SectionTable};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use lifecycle::{LifecycleError, LifecycleManager, LifecyclePolicy, Transition};
pub use normalize::{NormalizeError, NormalizedText, Normalizer, TokenBag};
pub use project::{Project, ProjectError};
pub use similarity::{SimilarityIndex, SimilarityMatch};
pub use store::{build_index, FileStore, RecordStore, StoreError};
pub use synthesize::{ActionSynthesizer, Synthesis};
pub use tracker::{Ingested, NewDocument, RcaTracker, TrackerError, TrackerSettings};
