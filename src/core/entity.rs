//! Entity trait - common interface for all persisted record types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};

/// Common trait for RCA documents, remedial actions and incident reports
pub trait Entity: Serialize + DeserializeOwned + 'static {
    /// The record type prefix
    const PREFIX: EntityPrefix;

    /// Get the record's unique ID
    fn id(&self) -> &EntityId;

    /// Get a one-line title for listings
    fn title(&self) -> &str;

    /// Get the record's status as displayed
    fn status(&self) -> String;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the author
    fn author(&self) -> &str;
}
