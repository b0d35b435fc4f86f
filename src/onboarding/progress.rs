//! Onboarding progress model and the pure navigation rules.
//!
//! The legal-transition relation lives here as free functions of the
//! canonical order, the visible-step set and the completed set, so the
//! controller and the tests share one definition instead of re-deriving
//! it in button handlers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::steps::StepId;

/// Persisted onboarding progress, one row per institution.
///
/// `version` increments on every successful write; updates are
/// compare-and-set against it so concurrent writers fail cleanly
/// instead of clobbering each other's completed set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingProgress {
    pub institution_id: Uuid,
    pub current_step: StepId,
    pub completed_steps: BTreeSet<StepId>,
    pub is_locked: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingProgress {
    /// A fresh, unlocked record positioned at `first_step`.
    pub fn new(institution_id: Uuid, first_step: StepId) -> Self {
        let now = Utc::now();
        Self {
            institution_id,
            current_step: first_step,
            completed_steps: BTreeSet::new(),
            is_locked: false,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self, step: StepId) -> bool {
        self.completed_steps.contains(&step)
    }
}

/// A partial update to an onboarding progress row.
///
/// `completed_steps` only ever grows: the patch carries steps to add,
/// never a replacement set.
#[derive(Debug, Clone, Default)]
pub struct ProgressPatch {
    pub current_step: Option<StepId>,
    pub add_completed: Vec<StepId>,
    pub lock: bool,
}

impl ProgressPatch {
    pub fn set_current(step: StepId) -> Self {
        Self {
            current_step: Some(step),
            ..Default::default()
        }
    }

    pub fn complete(step: StepId) -> Self {
        Self {
            add_completed: vec![step],
            ..Default::default()
        }
    }

    pub fn lock() -> Self {
        Self {
            lock: true,
            ..Default::default()
        }
    }

    pub fn with_current(mut self, step: StepId) -> Self {
        self.current_step = Some(step);
        self
    }
}

/// Whether an actor positioned at `current` may navigate to `target`.
///
/// Navigable iff `target` is visible AND one of:
/// - it is the current step (lateral),
/// - it is already completed (backward),
/// - every visible step before it in canonical order is completed
///   (forward to the next incomplete step, never skipping a gate).
pub fn can_navigate_to(
    visible: &[StepId],
    completed: &BTreeSet<StepId>,
    current: StepId,
    target: StepId,
) -> bool {
    if !visible.contains(&target) {
        return false;
    }
    if target == current || completed.contains(&target) {
        return true;
    }
    visible
        .iter()
        .take_while(|s| **s != target)
        .all(|s| completed.contains(s))
}

/// The next visible step after `step`, if any.
pub fn next_visible_after(visible: &[StepId], step: StepId) -> Option<StepId> {
    let idx = visible.iter().position(|s| *s == step)?;
    visible.get(idx + 1).copied()
}

/// Where an actor should be positioned: the first incomplete visible
/// step, falling back to the first visible step when everything is done.
/// `None` when nothing is visible.
pub fn resolve_current_step(
    visible: &[StepId],
    completed: &BTreeSet<StepId>,
) -> Option<StepId> {
    visible
        .iter()
        .find(|s| !completed.contains(s))
        .or_else(|| visible.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::steps::{visible_step_ids, StepId::*};
    use crate::roles::{Role, RoleSet};

    fn completed(steps: &[StepId]) -> BTreeSet<StepId> {
        steps.iter().copied().collect()
    }

    #[test]
    fn fresh_progress_is_unlocked_at_first_step() {
        let p = OnboardingProgress::new(Uuid::new_v4(), InstitutionProfile);
        assert_eq!(p.current_step, InstitutionProfile);
        assert!(p.completed_steps.is_empty());
        assert!(!p.is_locked);
        assert_eq!(p.version, 1);
    }

    #[test]
    fn navigation_allows_completed_current_and_next() {
        let visible = visible_step_ids(&RoleSet::single(Role::SchoolAdmin));
        let done = completed(&[InstitutionProfile, AcademicCalendar]);

        // Backward to completed steps
        assert!(can_navigate_to(&visible, &done, ClassSetup, InstitutionProfile));
        assert!(can_navigate_to(&visible, &done, ClassSetup, AcademicCalendar));
        // Lateral to current
        assert!(can_navigate_to(&visible, &done, ClassSetup, ClassSetup));
        // Forward to the first incomplete step
        assert!(can_navigate_to(&visible, &done, AcademicCalendar, ClassSetup));
    }

    #[test]
    fn navigation_denies_skipping_past_incomplete_gate() {
        let visible = visible_step_ids(&RoleSet::single(Role::SchoolAdmin));
        let done = completed(&[InstitutionProfile, AcademicCalendar]);

        // class_setup is incomplete — anything past it is out of reach
        assert!(!can_navigate_to(&visible, &done, ClassSetup, SubjectSetup));
        assert!(!can_navigate_to(&visible, &done, ClassSetup, FeeStructure));
        assert!(!can_navigate_to(&visible, &done, ClassSetup, GoLive));
    }

    #[test]
    fn navigation_denies_invisible_target() {
        let visible = visible_step_ids(&RoleSet::single(Role::Bursar));
        let done = completed(&[InstitutionProfile]);
        assert!(!can_navigate_to(&visible, &done, InstitutionProfile, ClassSetup));
    }

    #[test]
    fn navigation_with_empty_visible_set_is_a_noop() {
        let visible: Vec<StepId> = Vec::new();
        let done = BTreeSet::new();
        assert!(!can_navigate_to(&visible, &done, InstitutionProfile, GoLive));
        assert_eq!(resolve_current_step(&visible, &done), None);
        assert_eq!(next_visible_after(&visible, InstitutionProfile), None);
    }

    #[test]
    fn gate_holds_over_a_sparse_visible_set() {
        // Bursar: institution_profile → fee_structure → go_live
        let visible = visible_step_ids(&RoleSet::single(Role::Bursar));
        let done = completed(&[InstitutionProfile]);

        assert!(can_navigate_to(&visible, &done, InstitutionProfile, FeeStructure));
        assert!(!can_navigate_to(&visible, &done, InstitutionProfile, GoLive));

        let done = completed(&[InstitutionProfile, FeeStructure]);
        assert!(can_navigate_to(&visible, &done, FeeStructure, GoLive));
    }

    #[test]
    fn next_visible_walks_the_sequence() {
        let visible = visible_step_ids(&RoleSet::single(Role::SchoolAdmin));
        assert_eq!(next_visible_after(&visible, ClassSetup), Some(SubjectSetup));
        assert_eq!(next_visible_after(&visible, GoLive), None);

        let sparse = visible_step_ids(&RoleSet::single(Role::Bursar));
        assert_eq!(
            next_visible_after(&sparse, InstitutionProfile),
            Some(FeeStructure)
        );
    }

    #[test]
    fn resolve_picks_first_incomplete_then_falls_back() {
        let visible = visible_step_ids(&RoleSet::single(Role::Registrar));
        // {institution_profile, academic_calendar, class_setup, go_live}

        let done = completed(&[InstitutionProfile, AcademicCalendar]);
        assert_eq!(resolve_current_step(&visible, &done), Some(ClassSetup));

        let all_done = completed(&[InstitutionProfile, AcademicCalendar, ClassSetup, GoLive]);
        assert_eq!(
            resolve_current_step(&visible, &all_done),
            Some(InstitutionProfile)
        );
    }

    #[test]
    fn resolve_is_idempotent() {
        let visible = visible_step_ids(&RoleSet::single(Role::Registrar));
        let done = completed(&[InstitutionProfile]);
        let first = resolve_current_step(&visible, &done);
        let second = resolve_current_step(&visible, &done);
        assert_eq!(first, second);
        assert_eq!(first, Some(AcademicCalendar));
    }

    #[test]
    fn progress_serde_roundtrip() {
        let mut p = OnboardingProgress::new(Uuid::new_v4(), AcademicCalendar);
        p.completed_steps.insert(InstitutionProfile);

        let json = serde_json::to_string(&p).unwrap();
        let parsed: OnboardingProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.current_step, AcademicCalendar);
        assert!(parsed.is_completed(InstitutionProfile));
        assert!(!parsed.is_locked);
    }
}
