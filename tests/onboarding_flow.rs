//! End-to-end onboarding flow tests against the in-memory libSQL backend.

use std::sync::Arc;

use uuid::Uuid;

use campus_onboard::error::WorkflowError;
use campus_onboard::onboarding::checklist::{ChecklistItemId, ChecklistStatus};
use campus_onboard::onboarding::steps::StepId::*;
use campus_onboard::onboarding::{ProgressPatch, WorkflowController};
use campus_onboard::roles::{Role, RoleSet};
use campus_onboard::store::{Database, LibSqlBackend};

async fn setup() -> (Arc<LibSqlBackend>, WorkflowController, Uuid) {
    let backend = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let institution = Uuid::new_v4();
    backend
        .create_institution(institution, "Hilltop Academy", None)
        .await
        .unwrap();
    let controller = WorkflowController::new(backend.clone() as Arc<dyn Database>);
    (backend, controller, institution)
}

fn admin() -> RoleSet {
    RoleSet::single(Role::SchoolAdmin)
}

/// Seed everything an admin needs for go-live: contact email, an
/// academic year and at least one class.
async fn seed_admin_requirements(db: &LibSqlBackend, institution: Uuid) {
    db.set_institution_contact_email(institution, "admin@hilltop.example")
        .await
        .unwrap();
    db.add_academic_year(institution, "2026/2027").await.unwrap();
    db.add_class(institution, "Grade 1").await.unwrap();
}

#[tokio::test]
async fn fresh_institution_initializes_at_profile_step() {
    let (_, controller, institution) = setup().await;

    let progress = controller.load_or_init(institution, &admin()).await.unwrap();
    assert_eq!(progress.current_step, InstitutionProfile);
    assert!(progress.completed_steps.is_empty());
    assert!(!progress.is_locked);
}

#[tokio::test]
async fn load_is_idempotent() {
    let (_, controller, institution) = setup().await;

    let first = controller.load_or_init(institution, &admin()).await.unwrap();
    let second = controller.load_or_init(institution, &admin()).await.unwrap();
    assert_eq!(first.current_step, second.current_step);
    assert_eq!(first.version, second.version);
}

#[tokio::test]
async fn completing_a_step_advances_to_the_next_visible_one() {
    let (_, controller, institution) = setup().await;
    let roles = admin();
    controller.load_or_init(institution, &roles).await.unwrap();

    controller
        .complete_step(institution, &roles, InstitutionProfile)
        .await
        .unwrap();
    controller
        .complete_step(institution, &roles, AcademicCalendar)
        .await
        .unwrap();
    let progress = controller
        .complete_step(institution, &roles, ClassSetup)
        .await
        .unwrap();

    assert_eq!(progress.current_step, SubjectSetup);
    assert!(progress.completed_steps.contains(&InstitutionProfile));
    assert!(progress.completed_steps.contains(&AcademicCalendar));
    assert!(progress.completed_steps.contains(&ClassSetup));
}

#[tokio::test]
async fn completing_twice_is_idempotent_on_the_set() {
    let (_, controller, institution) = setup().await;
    let roles = admin();
    controller.load_or_init(institution, &roles).await.unwrap();

    controller
        .complete_step(institution, &roles, InstitutionProfile)
        .await
        .unwrap();
    let progress = controller
        .complete_step(institution, &roles, InstitutionProfile)
        .await
        .unwrap();

    assert_eq!(progress.completed_steps.len(), 1);
    // Still advances to the step after the completed one
    assert_eq!(progress.current_step, AcademicCalendar);
}

#[tokio::test]
async fn navigation_cannot_skip_an_incomplete_gate() {
    let (_, controller, institution) = setup().await;
    let roles = admin();
    controller.load_or_init(institution, &roles).await.unwrap();

    controller
        .complete_step(institution, &roles, InstitutionProfile)
        .await
        .unwrap();

    // Two steps ahead of the last completed step
    let err = controller
        .update_step(institution, &roles, ClassSetup)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

    // Immediately next incomplete step is fine, as is going back
    controller
        .update_step(institution, &roles, AcademicCalendar)
        .await
        .unwrap();
    let back = controller
        .update_step(institution, &roles, InstitutionProfile)
        .await
        .unwrap();
    assert_eq!(back.current_step, InstitutionProfile);
}

#[tokio::test]
async fn invisible_step_cannot_be_completed() {
    let (_, controller, institution) = setup().await;
    let bursar = RoleSet::single(Role::Bursar);
    controller.load_or_init(institution, &bursar).await.unwrap();

    let err = controller
        .complete_step(institution, &bursar, ClassSetup)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::StepNotVisible(ClassSetup)));
}

#[tokio::test]
async fn role_mismatch_auto_corrects_to_first_incomplete_visible_step() {
    let (backend, controller, institution) = setup().await;
    let roles = admin();
    controller.load_or_init(institution, &roles).await.unwrap();

    // Admin works through to fee_structure
    for step in [InstitutionProfile, AcademicCalendar] {
        controller.complete_step(institution, &roles, step).await.unwrap();
    }
    backend
        .update_progress(
            institution,
            controller
                .load_or_init(institution, &roles)
                .await
                .unwrap()
                .version,
            &ProgressPatch::set_current(FeeStructure),
        )
        .await
        .unwrap();

    // A registrar reopens: fee_structure is not visible to them, so the
    // position resolves to their first incomplete visible step.
    let registrar = RoleSet::single(Role::Registrar);
    let corrected = controller
        .load_or_init(institution, &registrar)
        .await
        .unwrap();
    assert_eq!(corrected.current_step, ClassSetup);

    // Running the correction again changes nothing
    let again = controller
        .load_or_init(institution, &registrar)
        .await
        .unwrap();
    assert_eq!(again.current_step, ClassSetup);
    assert_eq!(again.version, corrected.version);
}

#[tokio::test]
async fn checklist_for_finance_only_actor_requires_fee_items() {
    let (_, controller, institution) = setup().await;
    let bursar = RoleSet::single(Role::Bursar);
    controller.load_or_init(institution, &bursar).await.unwrap();

    let items = controller.checklist(institution, &bursar).await;
    let fee = items
        .iter()
        .find(|i| i.id == ChecklistItemId::FeeItems)
        .unwrap();
    assert!(fee.required);
    assert_eq!(fee.status, ChecklistStatus::Incomplete);

    let err = controller.go_live(institution, &bursar).await.unwrap_err();
    match err {
        WorkflowError::IncompleteRequirements { items } => {
            assert_eq!(items, vec![ChecklistItemId::FeeItems]);
        }
        other => panic!("expected IncompleteRequirements, got {other:?}"),
    }
}

#[tokio::test]
async fn finance_actor_goes_live_once_fee_items_exist() {
    let (backend, controller, institution) = setup().await;
    let bursar = RoleSet::single(Role::Bursar);
    controller.load_or_init(institution, &bursar).await.unwrap();

    backend
        .add_fee_item(institution, "Tuition", 250_000)
        .await
        .unwrap();

    let progress = controller.go_live(institution, &bursar).await.unwrap();
    assert!(progress.is_locked);
}

#[tokio::test]
async fn admin_goes_live_with_empty_fee_structure() {
    let (backend, controller, institution) = setup().await;
    let roles = admin();
    controller.load_or_init(institution, &roles).await.unwrap();
    seed_admin_requirements(&backend, institution).await;

    let items = controller.checklist(institution, &roles).await;
    let fee = items
        .iter()
        .find(|i| i.id == ChecklistItemId::FeeItems)
        .unwrap();
    assert!(!fee.required);
    assert_eq!(fee.status, ChecklistStatus::Warning);

    let progress = controller.go_live(institution, &roles).await.unwrap();
    assert!(progress.is_locked);
}

#[tokio::test]
async fn admin_go_live_blocks_on_missing_structural_items() {
    let (backend, controller, institution) = setup().await;
    let roles = admin();
    controller.load_or_init(institution, &roles).await.unwrap();

    // Only the email is set; calendar and classes are still empty.
    backend
        .set_institution_contact_email(institution, "admin@hilltop.example")
        .await
        .unwrap();

    let err = controller.go_live(institution, &roles).await.unwrap_err();
    match err {
        WorkflowError::IncompleteRequirements { items } => {
            assert_eq!(
                items,
                vec![ChecklistItemId::AcademicYears, ChecklistItemId::Classes]
            );
        }
        other => panic!("expected IncompleteRequirements, got {other:?}"),
    }

    // The failed attempt must not have locked anything
    let progress = controller.load_or_init(institution, &roles).await.unwrap();
    assert!(!progress.is_locked);
}

#[tokio::test]
async fn locked_workflow_freezes_all_mutations() {
    let (backend, controller, institution) = setup().await;
    let roles = admin();
    controller.load_or_init(institution, &roles).await.unwrap();
    seed_admin_requirements(&backend, institution).await;

    controller
        .complete_step(institution, &roles, InstitutionProfile)
        .await
        .unwrap();
    let locked = controller.go_live(institution, &roles).await.unwrap();
    assert!(locked.is_locked);

    let err = controller
        .complete_step(institution, &roles, AcademicCalendar)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Locked));

    let err = controller
        .update_step(institution, &roles, InstitutionProfile)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Locked));

    let err = controller.go_live(institution, &roles).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Locked));

    // Nothing moved
    let after = controller.load_or_init(institution, &roles).await.unwrap();
    assert_eq!(after.current_step, locked.current_step);
    assert_eq!(after.completed_steps, locked.completed_steps);
}

#[tokio::test]
async fn concurrent_writers_fail_cleanly_on_version_conflict() {
    let (backend, controller, institution) = setup().await;
    let roles = admin();
    let progress = controller.load_or_init(institution, &roles).await.unwrap();

    // A second tab writes first with the same version
    backend
        .update_progress(
            institution,
            progress.version,
            &ProgressPatch::complete(InstitutionProfile),
        )
        .await
        .unwrap();

    // The stale writer loses without clobbering the completed set
    let err = backend
        .update_progress(
            institution,
            progress.version,
            &ProgressPatch::set_current(AcademicCalendar),
        )
        .await
        .map(|_| ())
        .map_err(WorkflowError::from)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict));

    let current = controller.load_or_init(institution, &roles).await.unwrap();
    assert!(current.completed_steps.contains(&InstitutionProfile));
}
