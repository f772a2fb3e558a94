//! Remedial action entity - a tracked task derived from one Long Term Solution

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// Action lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Open,
    InProgress,
    EvidenceSubmitted,
    Verified,
    Rejected,
}

impl ActionStatus {
    /// Whether work on the action is finished
    pub fn is_closed(&self) -> bool {
        matches!(self, ActionStatus::Verified)
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionStatus::Open => write!(f, "open"),
            ActionStatus::InProgress => write!(f, "in_progress"),
            ActionStatus::EvidenceSubmitted => write!(f, "evidence_submitted"),
            ActionStatus::Verified => write!(f, "verified"),
            ActionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "open" => Ok(ActionStatus::Open),
            "in_progress" | "inprogress" => Ok(ActionStatus::InProgress),
            "evidence_submitted" | "evidencesubmitted" => Ok(ActionStatus::EvidenceSubmitted),
            "verified" => Ok(ActionStatus::Verified),
            "rejected" => Ok(ActionStatus::Rejected),
            _ => Err(format!(
                "Invalid action status: {}. Use open, in_progress, evidence_submitted, verified, or rejected",
                s
            )),
        }
    }
}

/// Evidence that an action was carried out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Evidence {
    /// Free-text description of what was done
    Text(String),
    /// Reference to an attachment held elsewhere (path, URL, document number)
    Attachment(String),
}

impl Evidence {
    /// Evidence whose payload is blank does not count as evidence
    pub fn is_blank(&self) -> bool {
        match self {
            Evidence::Text(s) | Evidence::Attachment(s) => s.trim().is_empty(),
        }
    }
}

impl std::fmt::Display for Evidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evidence::Text(text) => write!(f, "{}", text),
            Evidence::Attachment(reference) => write!(f, "attachment: {}", reference),
        }
    }
}

/// Rejection record kept in the action's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub rejector: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// A remedial action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemedialAction {
    /// Unique identifier
    pub id: EntityId,

    /// RCA document the action was synthesized from
    pub source_rca: EntityId,

    /// Display position within the RCA (1-based)
    pub sequence: u32,

    /// Long term solution statement, copied verbatim
    pub description: String,

    /// Responsible owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Team the owner belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_team: Option<String>,

    /// Due date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Lifecycle status
    #[serde(default)]
    pub status: ActionStatus,

    /// Evidence of completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Evidence>,

    /// How completion will be verified (test run, audit, document review)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,

    /// When evidence was submitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_submitted_at: Option<DateTime<Utc>>,

    /// Who verified the evidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,

    /// When the evidence was verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,

    /// Reason for the current rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,

    /// Every rejection this action went through
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<RejectionRecord>,

    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Author (who ingested the source RCA)
    pub author: String,

    /// Revision number, bumped on every change
    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

fn default_revision() -> u32 {
    1
}

impl Entity for RemedialAction {
    const PREFIX: EntityPrefix = EntityPrefix::Act;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.description
    }

    fn status(&self) -> String {
        self.status.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}

impl RemedialAction {
    /// Create an Open, unassigned action for one solution statement
    pub fn new(source_rca: EntityId, sequence: u32, description: String, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Act),
            source_rca,
            sequence,
            description,
            owner: None,
            owner_team: None,
            due_date: None,
            status: ActionStatus::Open,
            evidence: None,
            verification_method: None,
            evidence_submitted_at: None,
            verified_by: None,
            verified_at: None,
            rejection_reason: None,
            rejections: Vec::new(),
            notes: None,
            created: Utc::now(),
            author,
            entity_revision: 1,
        }
    }

    /// Past its due date and not yet verified
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_closed() && self.due_date.is_some_and(|due| due < today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action() -> RemedialAction {
        RemedialAction::new(
            EntityId::new(EntityPrefix::Rca),
            1,
            "Install inline filter".to_string(),
            "test".to_string(),
        )
    }

    #[test]
    fn test_action_creation() {
        let action = action();
        assert!(action.id.to_string().starts_with("ACT-"));
        assert_eq!(action.status, ActionStatus::Open);
        assert!(action.owner.is_none());
        assert!(action.due_date.is_none());
        assert_eq!(action.title(), "Install inline filter");
    }

    #[test]
    fn test_action_yaml_shape() {
        let mut action = action();
        action.evidence = Some(Evidence::Attachment("docs/filter-install.pdf".to_string()));
        action.status = ActionStatus::EvidenceSubmitted;

        let yaml = serde_yml::to_string(&action).unwrap();
        assert!(yaml.contains("status: evidence_submitted"));
        assert!(yaml.contains("kind: attachment"));
        assert!(!yaml.contains("owner:"));

        let parsed: RemedialAction = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed, action);
    }

    #[test]
    fn test_tracking_details_are_optional() {
        let mut action = action();
        let yaml = serde_yml::to_string(&action).unwrap();
        assert!(!yaml.contains("owner_team:"));
        assert!(!yaml.contains("verification_method:"));
        assert!(!yaml.contains("notes:"));

        action.owner_team = Some("Core Network".to_string());
        action.verification_method = Some("Regression test on staging".to_string());
        action.notes = Some("Waiting on vendor patch".to_string());
        let yaml = serde_yml::to_string(&action).unwrap();
        assert!(yaml.contains("owner_team: Core Network"));
        let parsed: RemedialAction = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed, action);
    }

    #[test]
    fn test_overdue() {
        let mut action = action();
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(!action.is_overdue(today));

        action.due_date = NaiveDate::from_ymd_opt(2026, 2, 14);
        assert!(action.is_overdue(today));

        action.status = ActionStatus::Verified;
        assert!(!action.is_overdue(today));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "in-progress".parse::<ActionStatus>().unwrap(),
            ActionStatus::InProgress
        );
        assert_eq!(
            "evidence_submitted".parse::<ActionStatus>().unwrap(),
            ActionStatus::EvidenceSubmitted
        );
        assert!("done".parse::<ActionStatus>().is_err());
    }

    #[test]
    fn test_blank_evidence() {
        assert!(Evidence::Text("   ".to_string()).is_blank());
        assert!(!Evidence::Text("photo of filter".to_string()).is_blank());
    }
}
