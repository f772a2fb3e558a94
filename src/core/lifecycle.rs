//! Action lifecycle manager - state machine for remedial actions
//!
//! Every transition is validated completely before the action is touched, so
//! a rejected transition leaves the action exactly as it was.

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::entities::action::{ActionStatus, Evidence, RejectionRecord, RemedialAction};

/// Lifecycle rules taken from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Let the action owner verify their own evidence
    pub allow_self_verification: bool,
}

/// A requested change to an action
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Set the owner; moves Open actions to InProgress
    Assign { owner: String },
    /// Begin work on an Open action
    Start,
    /// Attach evidence of completion
    SubmitEvidence(Evidence),
    /// Accept the submitted evidence
    Verify { verifier: String },
    /// Refuse the submitted evidence
    Reject { reason: String, rejected_by: String },
    /// Reopen a rejected action
    Resubmit,
    /// Change or clear the due date
    SetDueDate(Option<NaiveDate>),
    /// Update the tracking details; not a status change
    SetDetails(ActionDetails),
}

/// Tracking details of an action. `None` leaves a field as it is, blank text
/// clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionDetails {
    pub owner_team: Option<String>,
    pub verification_method: Option<String>,
    pub notes: Option<String>,
}

impl ActionDetails {
    pub fn is_empty(&self) -> bool {
        self.owner_team.is_none() && self.verification_method.is_none() && self.notes.is_none()
    }
}

impl Transition {
    /// Short name used in logs and messages
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Assign { .. } => "assign",
            Transition::Start => "start",
            Transition::SubmitEvidence(_) => "submit_evidence",
            Transition::Verify { .. } => "verify",
            Transition::Reject { .. } => "reject",
            Transition::Resubmit => "resubmit",
            Transition::SetDueDate(_) => "set_due_date",
            Transition::SetDetails(_) => "set_details",
        }
    }
}

/// Errors raised by lifecycle transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ActionStatus,
        to: ActionStatus,
    },

    #[error("Action has no owner. Assign one first")]
    OwnerRequired,

    #[error("Evidence is required before the action can be {0}")]
    EvidenceRequired(&'static str),

    #[error("A rejection reason is required")]
    ReasonRequired,

    #[error("A verifier is required")]
    VerifierRequired,

    #[error("Owner '{0}' cannot verify their own action")]
    SelfVerification(String),

    #[error("Action is verified and can no longer change")]
    Immutable,

    #[error("Evidence is awaiting review; the owner cannot change until it is verified or rejected")]
    AwaitingReview,
}

/// Applies transitions to remedial actions
#[derive(Debug, Clone, Default)]
pub struct LifecycleManager {
    policy: LifecyclePolicy,
}

impl LifecycleManager {
    pub fn new(policy: LifecyclePolicy) -> Self {
        Self { policy }
    }

    /// Check if a status change is valid
    pub fn is_valid_transition(&self, from: ActionStatus, to: ActionStatus) -> bool {
        matches!(
            (from, to),
            (ActionStatus::Open, ActionStatus::InProgress)
                | (ActionStatus::InProgress, ActionStatus::EvidenceSubmitted)
                | (ActionStatus::EvidenceSubmitted, ActionStatus::Verified)
                | (ActionStatus::EvidenceSubmitted, ActionStatus::Rejected)
                // Resubmission is the only way back
                | (ActionStatus::Rejected, ActionStatus::Open)
        )
    }

    /// Statuses reachable from the current one
    pub fn legal_transitions(&self, current: ActionStatus) -> Vec<ActionStatus> {
        match current {
            ActionStatus::Open => vec![ActionStatus::InProgress],
            ActionStatus::InProgress => vec![ActionStatus::EvidenceSubmitted],
            ActionStatus::EvidenceSubmitted => {
                vec![ActionStatus::Verified, ActionStatus::Rejected]
            }
            ActionStatus::Rejected => vec![ActionStatus::Open],
            ActionStatus::Verified => vec![],
        }
    }

    /// Apply a transition, returning the resulting status
    pub fn apply(
        &self,
        action: &mut RemedialAction,
        transition: Transition,
    ) -> Result<ActionStatus, LifecycleError> {
        let from = action.status;
        if from == ActionStatus::Verified {
            return Err(LifecycleError::Immutable);
        }

        let name = transition.name();
        match transition {
            Transition::Assign { owner } => {
                if from == ActionStatus::EvidenceSubmitted {
                    return Err(LifecycleError::AwaitingReview);
                }
                let owner = required(owner).ok_or(LifecycleError::OwnerRequired)?;
                action.owner = Some(owner);
                if from == ActionStatus::Open {
                    action.status = ActionStatus::InProgress;
                }
            }

            Transition::Start => {
                self.check(from, ActionStatus::InProgress)?;
                if action.owner.as_deref().is_none_or(|o| o.trim().is_empty()) {
                    return Err(LifecycleError::OwnerRequired);
                }
                action.status = ActionStatus::InProgress;
            }

            Transition::SubmitEvidence(evidence) => {
                self.check(from, ActionStatus::EvidenceSubmitted)?;
                if evidence.is_blank() {
                    return Err(LifecycleError::EvidenceRequired("submitted"));
                }
                action.evidence = Some(evidence);
                action.evidence_submitted_at = Some(Utc::now());
                action.status = ActionStatus::EvidenceSubmitted;
            }

            Transition::Verify { verifier } => {
                self.check(from, ActionStatus::Verified)?;
                if action.evidence.as_ref().is_none_or(Evidence::is_blank) {
                    return Err(LifecycleError::EvidenceRequired("verified"));
                }
                let verifier = required(verifier).ok_or(LifecycleError::VerifierRequired)?;
                if !self.policy.allow_self_verification {
                    if let Some(owner) = action.owner.as_deref() {
                        if owner.trim().to_lowercase() == verifier.to_lowercase() {
                            return Err(LifecycleError::SelfVerification(verifier));
                        }
                    }
                }
                action.verified_by = Some(verifier);
                action.verified_at = Some(Utc::now());
                action.rejection_reason = None;
                action.status = ActionStatus::Verified;
            }

            Transition::Reject {
                reason,
                rejected_by,
            } => {
                self.check(from, ActionStatus::Rejected)?;
                let reason = required(reason).ok_or(LifecycleError::ReasonRequired)?;
                action.rejections.push(RejectionRecord {
                    rejector: rejected_by.trim().to_string(),
                    reason: reason.clone(),
                    timestamp: Utc::now(),
                });
                action.rejection_reason = Some(reason);
                action.status = ActionStatus::Rejected;
            }

            Transition::Resubmit => {
                self.check(from, ActionStatus::Open)?;
                action.evidence = None;
                action.evidence_submitted_at = None;
                action.verified_by = None;
                action.verified_at = None;
                action.rejection_reason = None;
                action.status = ActionStatus::Open;
            }

            Transition::SetDueDate(due) => {
                action.due_date = due;
            }

            Transition::SetDetails(details) => {
                if let Some(team) = details.owner_team {
                    action.owner_team = required(team);
                }
                if let Some(method) = details.verification_method {
                    action.verification_method = required(method);
                }
                if let Some(notes) = details.notes {
                    action.notes = required(notes);
                }
            }
        }

        action.entity_revision += 1;
        tracing::debug!(
            action = %action.id,
            transition = name,
            from = %from,
            to = %action.status,
            "applied transition"
        );
        Ok(action.status)
    }

    fn check(&self, from: ActionStatus, to: ActionStatus) -> Result<(), LifecycleError> {
        if self.is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition { from, to })
        }
    }
}

fn required(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
