//! Go-live readiness checklist.
//!
//! Aggregates record counts from the domain tables into a per-item
//! readiness signal. Which items are required (blocking go-live) versus
//! advisory depends on the actor's roles; the mapping lives in one
//! place here so the controller and the UI agree. Counter queries run
//! concurrently and degrade independently: a failed read logs a warning
//! and reports the item as empty rather than aborting the checklist.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::RoleSet;
use crate::store::traits::Database;

/// Identifier for a readiness checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistItemId {
    Profile,
    AcademicYears,
    Classes,
    Subjects,
    FeeItems,
    Students,
    Staff,
}

impl std::fmt::Display for ChecklistItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Profile => "profile",
            Self::AcademicYears => "academic_years",
            Self::Classes => "classes",
            Self::Subjects => "subjects",
            Self::FeeItems => "fee_items",
            Self::Students => "students",
            Self::Staff => "staff",
        };
        write!(f, "{s}")
    }
}

/// Readiness status of a single checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    Complete,
    /// Required and missing — blocks go-live.
    Incomplete,
    /// Advisory and missing — shown, never blocks.
    Warning,
}

/// One row of the go-live checklist. Derived on demand, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ChecklistItemId,
    pub status: ChecklistStatus,
    pub required: bool,
    pub count: i64,
}

impl ChecklistItem {
    fn from_count(id: ChecklistItemId, count: i64, required: bool) -> Self {
        let status = if count > 0 {
            ChecklistStatus::Complete
        } else if required {
            ChecklistStatus::Incomplete
        } else {
            ChecklistStatus::Warning
        };
        Self {
            id,
            status,
            required,
            count,
        }
    }
}

/// Whether an item is required for an actor holding `roles`.
///
/// Profile, calendar and classes gate admin and academic actors. The fee
/// structure gates only finance-without-admin actors (advisory for
/// admins). Subjects, students and staff never block.
pub fn item_required(id: ChecklistItemId, roles: &RoleSet) -> bool {
    match id {
        ChecklistItemId::Profile
        | ChecklistItemId::AcademicYears
        | ChecklistItemId::Classes => roles.any_admin() || roles.any_academic(),
        ChecklistItemId::FeeItems => roles.finance_only(),
        ChecklistItemId::Subjects | ChecklistItemId::Students | ChecklistItemId::Staff => false,
    }
}

/// Build the go-live checklist for an institution as seen by `roles`.
///
/// Read-only; the seven domain reads are issued concurrently since they
/// touch disjoint tables.
pub async fn build_checklist(
    db: &dyn Database,
    institution_id: Uuid,
    roles: &RoleSet,
) -> Vec<ChecklistItem> {
    let (email, years, classes, subjects, fees, students, staff) = tokio::join!(
        db.institution_contact_email(institution_id),
        db.count_academic_years(institution_id),
        db.count_classes(institution_id),
        db.count_subjects(institution_id),
        db.count_fee_items(institution_id),
        db.count_students(institution_id),
        db.count_staff(institution_id),
    );

    let email = email.unwrap_or_else(|e| {
        tracing::warn!(%institution_id, "Profile lookup failed, treating as incomplete: {e}");
        None
    });

    let count_or_zero = |label: &str, res: Result<i64, crate::error::DatabaseError>| match res {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(%institution_id, item = label, "Count query failed, treating as zero: {e}");
            0
        }
    };

    // The profile item keys off email presence rather than a row count;
    // the count field carries 1/0 for uniformity in the UI.
    let profile_count = i64::from(email.is_some());

    vec![
        ChecklistItem::from_count(
            ChecklistItemId::Profile,
            profile_count,
            item_required(ChecklistItemId::Profile, roles),
        ),
        ChecklistItem::from_count(
            ChecklistItemId::AcademicYears,
            count_or_zero("academic_years", years),
            item_required(ChecklistItemId::AcademicYears, roles),
        ),
        ChecklistItem::from_count(
            ChecklistItemId::Classes,
            count_or_zero("classes", classes),
            item_required(ChecklistItemId::Classes, roles),
        ),
        ChecklistItem::from_count(
            ChecklistItemId::Subjects,
            count_or_zero("subjects", subjects),
            item_required(ChecklistItemId::Subjects, roles),
        ),
        ChecklistItem::from_count(
            ChecklistItemId::FeeItems,
            count_or_zero("fee_items", fees),
            item_required(ChecklistItemId::FeeItems, roles),
        ),
        ChecklistItem::from_count(
            ChecklistItemId::Students,
            count_or_zero("students", students),
            item_required(ChecklistItemId::Students, roles),
        ),
        ChecklistItem::from_count(
            ChecklistItemId::Staff,
            count_or_zero("staff", staff),
            item_required(ChecklistItemId::Staff, roles),
        ),
    ]
}

/// Ids of required items that are not complete, in checklist order.
pub fn unmet_required(items: &[ChecklistItem]) -> Vec<ChecklistItemId> {
    items
        .iter()
        .filter(|i| i.required && i.status != ChecklistStatus::Complete)
        .map(|i| i.id)
        .collect()
}
