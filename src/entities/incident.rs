//! Incident report entity - new incident text checked against past RCAs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::similarity::SimilarityMatch;

/// A reported incident and the RCAs it resembles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    /// Unique identifier
    pub id: EntityId,

    /// First line of the incident text, shortened for listings
    pub title: String,

    /// Incident text as reported
    pub raw_text: String,

    /// Normalized form of `raw_text`
    pub normalized_text: String,

    /// When the incident was reported
    pub reported_at: DateTime<Utc>,

    /// Ranked candidates, best first
    #[serde(default)]
    pub matched_rca_candidates: Vec<SimilarityMatch>,

    /// When the candidates were last computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_at: Option<DateTime<Utc>>,

    /// Threshold used for the last match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    /// Who reported the incident
    pub author: String,
}

impl Entity for IncidentReport {
    const PREFIX: EntityPrefix = EntityPrefix::Inc;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> String {
        if self.matched_rca_candidates.is_empty() {
            "no_match".to_string()
        } else {
            "recurrence".to_string()
        }
    }

    fn created(&self) -> DateTime<Utc> {
        self.reported_at
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl IncidentReport {
    pub fn new(raw_text: String, normalized_text: String, author: String) -> Self {
        let title = summary_line(&raw_text);
        Self {
            id: EntityId::new(EntityPrefix::Inc),
            title,
            raw_text,
            normalized_text,
            reported_at: Utc::now(),
            matched_rca_candidates: Vec::new(),
            matched_at: None,
            threshold: None,
            author,
        }
    }

    /// Replace the candidate list with a fresh ranking
    pub fn set_matches(&mut self, matches: Vec<SimilarityMatch>, threshold: f64) {
        self.matched_rca_candidates = matches;
        self.threshold = Some(threshold);
        self.matched_at = Some(Utc::now());
    }

    /// Best candidate, if any
    pub fn top_match(&self) -> Option<&SimilarityMatch> {
        self.matched_rca_candidates.first()
    }
}

/// First non-blank line of the text, at most 60 characters
fn summary_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| truncate(l, 60))
        .unwrap_or_default()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars - 3).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_creation() {
        let report = IncidentReport::new(
            "\n  Pump seal failed again\ncontamination suspected".to_string(),
            "pump seal failed again\ncontamination suspected".to_string(),
            "alice".to_string(),
        );
        assert!(report.id.to_string().starts_with("INC-"));
        assert_eq!(report.title(), "Pump seal failed again");
        assert_eq!(report.status(), "no_match");
        assert!(report.matched_at.is_none());
    }

    #[test]
    fn test_set_matches() {
        let mut report = IncidentReport::new("x".into(), "x".into(), "alice".into());
        let rca = EntityId::new(EntityPrefix::Rca);
        report.set_matches(
            vec![SimilarityMatch {
                rca_id: rca.clone(),
                score: 0.42,
            }],
            0.3,
        );
        assert_eq!(report.status(), "recurrence");
        assert_eq!(report.top_match().map(|m| &m.rca_id), Some(&rca));
        assert!(report.matched_at.is_some());
    }

    #[test]
    fn test_long_title_truncated() {
        let report = IncidentReport::new("a".repeat(100), "a".repeat(100), "alice".into());
        assert_eq!(report.title().chars().count(), 60);
        assert!(report.title().ends_with("..."));
    }
}
