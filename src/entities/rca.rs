//! RCA document entity - uploaded report with its extraction history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::extract::ExtractedFields;
use crate::core::identity::{EntityId, EntityPrefix};

/// Environment the incident occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    PreLive,
    Uat,
    Production,
    Testing,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::PreLive => write!(f, "pre_live"),
            Environment::Uat => write!(f, "uat"),
            Environment::Production => write!(f, "production"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pre_live" | "prelive" => Ok(Environment::PreLive),
            "uat" => Ok(Environment::Uat),
            "production" | "prod" => Ok(Environment::Production),
            "testing" | "test" => Ok(Environment::Testing),
            _ => Err(format!(
                "Invalid environment: {}. Use pre_live, uat, production, or testing",
                s
            )),
        }
    }
}

/// One extraction run over the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSnapshot {
    /// 1-based position in the extraction history
    pub revision: u32,

    pub extracted_at: DateTime<Utc>,

    #[serde(flatten)]
    pub fields: ExtractedFields,
}

/// An uploaded RCA document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcaDocument {
    /// Unique identifier
    pub id: EntityId,

    /// Short title
    pub title: String,

    /// OEM / customer the RCA concerns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oem: Option<String>,

    /// Environment the incident happened in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    /// Decoded document text as uploaded
    pub raw_text: String,

    /// Normalized form of `raw_text`
    pub normalized_text: String,

    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,

    /// Extraction history, oldest first; never rewritten
    #[serde(default)]
    pub extractions: Vec<ExtractionSnapshot>,

    /// Who uploaded the document
    pub author: String,
}

impl Entity for RcaDocument {
    const PREFIX: EntityPrefix = EntityPrefix::Rca;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> String {
        match self.current() {
            None => "pending".to_string(),
            Some(s) if s.fields.needs_review => "needs_review".to_string(),
            Some(_) => "extracted".to_string(),
        }
    }

    fn created(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl RcaDocument {
    pub fn new(title: String, raw_text: String, normalized_text: String, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Rca),
            title,
            oem: None,
            environment: None,
            raw_text,
            normalized_text,
            uploaded_at: Utc::now(),
            extractions: Vec::new(),
            author,
        }
    }

    /// The latest extraction
    pub fn current(&self) -> Option<&ExtractionSnapshot> {
        self.extractions.last()
    }

    /// Append a new extraction snapshot and return it
    pub fn record_extraction(&mut self, fields: ExtractedFields) -> &ExtractionSnapshot {
        let revision = self.extractions.len() as u32 + 1;
        self.extractions.push(ExtractionSnapshot {
            revision,
            extracted_at: Utc::now(),
            fields,
        });
        &self.extractions[self.extractions.len() - 1]
    }

    pub fn root_cause(&self) -> Option<&str> {
        self.current().and_then(|s| s.fields.root_cause.as_deref())
    }

    pub fn long_term_solutions(&self) -> &[String] {
        self.current()
            .map(|s| s.fields.long_term_solutions.as_slice())
            .unwrap_or(&[])
    }

    pub fn needs_review(&self) -> bool {
        self.current().is_none_or(|s| s.fields.needs_review)
    }

    /// Text indexed for recurrence detection
    ///
    /// Title, root cause and solutions of the current extraction; the whole
    /// normalized document when no root cause was found.
    pub fn recurrence_profile(&self) -> String {
        let Some(root_cause) = self.root_cause() else {
            return self.normalized_text.clone();
        };

        let mut lines = vec![self.title.as_str(), root_cause];
        lines.extend(self.long_term_solutions().iter().map(String::as_str));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> RcaDocument {
        RcaDocument::new(
            "Pump outage".to_string(),
            "Root Cause: Bearing seal failure".to_string(),
            "root cause bearing seal failure".to_string(),
            "alice".to_string(),
        )
    }

    fn fields(root_cause: Option<&str>, solutions: &[&str]) -> ExtractedFields {
        ExtractedFields {
            root_cause: root_cause.map(String::from),
            long_term_solutions: solutions.iter().map(|s| s.to_string()).collect(),
            needs_review: root_cause.is_none(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_document_is_pending() {
        let doc = document();
        assert!(doc.id.to_string().starts_with("RCA-"));
        assert_eq!(doc.status(), "pending");
        assert!(doc.needs_review());
        assert!(doc.long_term_solutions().is_empty());
    }

    #[test]
    fn test_extractions_append() {
        let mut doc = document();
        doc.record_extraction(fields(None, &[]));
        doc.record_extraction(fields(Some("Bearing seal failure"), &["Install filter"]));

        assert_eq!(doc.extractions.len(), 2);
        assert_eq!(doc.extractions[0].revision, 1);
        assert!(doc.extractions[0].fields.root_cause.is_none());
        assert_eq!(doc.current().map(|s| s.revision), Some(2));
        assert_eq!(doc.root_cause(), Some("Bearing seal failure"));
        assert_eq!(doc.status(), "extracted");
    }

    #[test]
    fn test_profile_uses_extraction() {
        let mut doc = document();
        doc.record_extraction(fields(Some("Bearing seal failure"), &["Install filter", "Audit"]));
        assert_eq!(
            doc.recurrence_profile(),
            "Pump outage\nBearing seal failure\nInstall filter\nAudit"
        );
    }

    #[test]
    fn test_profile_falls_back_to_normalized_text() {
        let mut doc = document();
        doc.record_extraction(fields(None, &["Install filter"]));
        assert_eq!(doc.recurrence_profile(), "root cause bearing seal failure");
        assert_eq!(doc.status(), "needs_review");
    }

    #[test]
    fn test_yaml_roundtrip_keeps_history() {
        let mut doc = document();
        doc.environment = Some(Environment::PreLive);
        doc.record_extraction(fields(Some("Bearing seal failure"), &["Install filter"]));

        let yaml = serde_yml::to_string(&doc).unwrap();
        assert!(yaml.contains("environment: pre_live"));
        assert!(yaml.contains("root_cause: Bearing seal failure"));

        let parsed: RcaDocument = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("Pre-Live".parse::<Environment>().unwrap(), Environment::PreLive);
        assert_eq!("UAT".parse::<Environment>().unwrap(), Environment::Uat);
        assert!("staging".parse::<Environment>().is_err());
    }
}
