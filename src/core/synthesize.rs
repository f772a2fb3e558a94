//! Action synthesizer - one remedial action per Long Term Solution
//!
//! Synthesis is an idempotent merge: statements already represented by an
//! action of the same RCA are left alone, so re-running it after a
//! re-extraction only adds what is new.

use chrono::{Days, NaiveDate, Utc};
use std::collections::{BTreeMap, VecDeque};

use crate::core::identity::EntityId;
use crate::entities::action::RemedialAction;

/// Result of merging solution statements with existing actions
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    /// Newly created actions, in statement order
    pub created: Vec<RemedialAction>,
    /// Existing actions that still match a statement
    pub retained: Vec<EntityId>,
    /// Existing actions whose statement no longer appears
    pub stale: Vec<EntityId>,
}

impl Synthesis {
    /// Nothing was created
    pub fn is_unchanged(&self) -> bool {
        self.created.is_empty()
    }
}

/// Builds action skeletons from extracted solution statements
#[derive(Debug, Clone, Default)]
pub struct ActionSynthesizer {
    default_due_days: Option<u32>,
}

impl ActionSynthesizer {
    /// `default_due_days` sets a due date on new actions relative to today
    pub fn new(default_due_days: Option<u32>) -> Self {
        Self { default_due_days }
    }

    /// Merge `solutions` into `existing` actions of `rca_id`
    pub fn synthesize(
        &self,
        rca_id: &EntityId,
        solutions: &[String],
        existing: &[RemedialAction],
        author: &str,
    ) -> Synthesis {
        self.synthesize_on(rca_id, solutions, existing, author, Utc::now().date_naive())
    }

    /// As [`Self::synthesize`], with an explicit "today" for due dates
    pub fn synthesize_on(
        &self,
        rca_id: &EntityId,
        solutions: &[String],
        existing: &[RemedialAction],
        author: &str,
        today: NaiveDate,
    ) -> Synthesis {
        let mut own: Vec<&RemedialAction> = existing
            .iter()
            .filter(|a| &a.source_rca == rca_id)
            .collect();
        own.sort_by_key(|a| a.sequence);

        // Statement text -> unmatched actions carrying it, lowest sequence first
        let mut pool: BTreeMap<&str, VecDeque<&RemedialAction>> = BTreeMap::new();
        for &action in &own {
            pool.entry(action.description.trim())
                .or_default()
                .push_back(action);
        }

        let mut next_sequence = own.iter().map(|a| a.sequence).max().unwrap_or(0);
        let due_date = self
            .default_due_days
            .and_then(|days| today.checked_add_days(Days::new(u64::from(days))));

        let mut synthesis = Synthesis::default();
        for statement in solutions {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }

            if let Some(action) = pool.get_mut(statement).and_then(VecDeque::pop_front) {
                synthesis.retained.push(action.id.clone());
                continue;
            }

            next_sequence += 1;
            let mut action = RemedialAction::new(
                rca_id.clone(),
                next_sequence,
                statement.to_string(),
                author.to_string(),
            );
            action.due_date = due_date;
            synthesis.created.push(action);
        }

        let mut stale: Vec<&RemedialAction> = pool.into_values().flatten().collect();
        stale.sort_by_key(|a| a.sequence);
        synthesis.stale = stale.into_iter().map(|a| a.id.clone()).collect();

        tracing::debug!(
            rca = %rca_id,
            created = synthesis.created.len(),
            retained = synthesis.retained.len(),
            stale = synthesis.stale.len(),
            "synthesized actions"
        );
        synthesis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use crate::entities::action::ActionStatus;

    fn statements(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_action_per_statement() {
        let rca = EntityId::new(EntityPrefix::Rca);
        let result = ActionSynthesizer::default().synthesize(
            &rca,
            &statements(&["Install inline filter", "Revise maintenance interval"]),
            &[],
            "alice",
        );

        assert_eq!(result.created.len(), 2);
        assert_eq!(result.created[0].description, "Install inline filter");
        assert_eq!(result.created[0].sequence, 1);
        assert_eq!(result.created[1].sequence, 2);
        for action in &result.created {
            assert_eq!(action.source_rca, rca);
            assert_eq!(action.status, ActionStatus::Open);
            assert!(action.owner.is_none());
            assert!(action.due_date.is_none());
            assert_eq!(action.author, "alice");
        }
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let rca = EntityId::new(EntityPrefix::Rca);
        let solutions = statements(&["A", "B"]);
        let synth = ActionSynthesizer::default();

        let first = synth.synthesize(&rca, &solutions, &[], "alice");
        let second = synth.synthesize(&rca, &solutions, &first.created, "alice");

        assert!(second.is_unchanged());
        assert!(second.stale.is_empty());
        let first_ids: Vec<EntityId> = first.created.iter().map(|a| a.id.clone()).collect();
        assert_eq!(second.retained, first_ids);
    }

    #[test]
    fn test_merge_adds_new_and_reports_stale() {
        let rca = EntityId::new(EntityPrefix::Rca);
        let synth = ActionSynthesizer::default();
        let first = synth.synthesize(&rca, &statements(&["A", "B"]), &[], "alice");

        let second = synth.synthesize(&rca, &statements(&["B ", "C"]), &first.created, "alice");

        assert_eq!(second.retained, vec![first.created[1].id.clone()]);
        assert_eq!(second.stale, vec![first.created[0].id.clone()]);
        assert_eq!(second.created.len(), 1);
        assert_eq!(second.created[0].description, "C");
        assert_eq!(second.created[0].sequence, 3);
    }

    #[test]
    fn test_duplicate_statements_count_separately() {
        let rca = EntityId::new(EntityPrefix::Rca);
        let synth = ActionSynthesizer::default();
        let first = synth.synthesize(&rca, &statements(&["Retrain staff"]), &[], "alice");

        let second = synth.synthesize(
            &rca,
            &statements(&["Retrain staff", "Retrain staff"]),
            &first.created,
            "alice",
        );
        assert_eq!(second.retained.len(), 1);
        assert_eq!(second.created.len(), 1);
    }

    #[test]
    fn test_actions_of_other_rcas_are_ignored() {
        let rca = EntityId::new(EntityPrefix::Rca);
        let other = EntityId::new(EntityPrefix::Rca);
        let synth = ActionSynthesizer::default();
        let foreign = synth.synthesize(&other, &statements(&["A"]), &[], "bob");

        let result = synth.synthesize(&rca, &statements(&["A"]), &foreign.created, "alice");
        assert_eq!(result.created.len(), 1);
        assert!(result.retained.is_empty());
        assert!(result.stale.is_empty());
    }

    #[test]
    fn test_default_due_date() {
        let rca = EntityId::new(EntityPrefix::Rca);
        let today = NaiveDate::from_ymd_opt(2026, 1, 25).unwrap();
        let result = ActionSynthesizer::new(Some(14)).synthesize_on(
            &rca,
            &statements(&["A"]),
            &[],
            "alice",
            today,
        );
        assert_eq!(result.created[0].due_date, NaiveDate::from_ymd_opt(2026, 2, 8));
    }

    #[test]
    fn test_blank_statements_skipped() {
        let rca = EntityId::new(EntityPrefix::Rca);
        let result =
            ActionSynthesizer::default().synthesize(&rca, &statements(&["  ", "A"]), &[], "alice");
        assert_eq!(result.created.len(), 1);
        assert_eq!(result.created[0].sequence, 1);
    }
}
