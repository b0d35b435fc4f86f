//! Unified `Database` trait — single async interface for all persistence.
//!
//! Covers the onboarding progress store (with compare-and-set updates),
//! the minimal domain write surface the onboarding flow needs, and the
//! read-only domain counters feeding the go-live checklist.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::progress::{OnboardingProgress, ProgressPatch};

/// A tenant institution (school or campus) as stored.
#[derive(Debug, Clone)]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
}

/// Backend-agnostic database trait for the onboarding service.
#[async_trait]
pub trait Database: Send + Sync {
    // ── Institutions ────────────────────────────────────────────────

    /// Create an institution. `contact_email` may be filled in later via
    /// the profile step.
    async fn create_institution(
        &self,
        id: Uuid,
        name: &str,
        contact_email: Option<&str>,
    ) -> Result<(), DatabaseError>;

    /// Get an institution by id.
    async fn get_institution(&self, id: Uuid) -> Result<Option<Institution>, DatabaseError>;

    /// Set the institution's contact email (profile completion signal).
    async fn set_institution_contact_email(
        &self,
        id: Uuid,
        email: &str,
    ) -> Result<(), DatabaseError>;

    // ── Onboarding progress ─────────────────────────────────────────

    /// Get the progress row for an institution. `None` means onboarding
    /// has never been opened — the caller initializes.
    async fn get_progress(
        &self,
        institution_id: Uuid,
    ) -> Result<Option<OnboardingProgress>, DatabaseError>;

    /// Insert a fresh progress row. Fails on duplicate.
    async fn create_progress(&self, progress: &OnboardingProgress) -> Result<(), DatabaseError>;

    /// Apply a patch to the progress row, compare-and-set on `version`.
    ///
    /// The write succeeds only when the stored version equals
    /// `expected_version`; otherwise `DatabaseError::Conflict` is
    /// returned and nothing is modified. Returns the updated row.
    async fn update_progress(
        &self,
        institution_id: Uuid,
        expected_version: i64,
        patch: &ProgressPatch,
    ) -> Result<OnboardingProgress, DatabaseError>;

    // ── Domain records (setup steps write these) ────────────────────

    /// Add an academic year, e.g. "2026/2027".
    async fn add_academic_year(
        &self,
        institution_id: Uuid,
        name: &str,
    ) -> Result<(), DatabaseError>;

    /// Add a class level/stream.
    async fn add_class(&self, institution_id: Uuid, name: &str) -> Result<(), DatabaseError>;

    /// Add a subject.
    async fn add_subject(&self, institution_id: Uuid, name: &str) -> Result<(), DatabaseError>;

    /// Add a fee item with an amount in minor currency units.
    async fn add_fee_item(
        &self,
        institution_id: Uuid,
        name: &str,
        amount_cents: i64,
    ) -> Result<(), DatabaseError>;

    /// Add a student record.
    async fn add_student(
        &self,
        institution_id: Uuid,
        full_name: &str,
    ) -> Result<(), DatabaseError>;

    /// Add a staff record.
    async fn add_staff(&self, institution_id: Uuid, full_name: &str) -> Result<(), DatabaseError>;

    // ── Domain counters (go-live checklist reads) ───────────────────

    /// The institution's contact email, if set. Used as the minimal
    /// profile-completeness signal.
    async fn institution_contact_email(
        &self,
        institution_id: Uuid,
    ) -> Result<Option<String>, DatabaseError>;

    async fn count_academic_years(&self, institution_id: Uuid) -> Result<i64, DatabaseError>;

    async fn count_classes(&self, institution_id: Uuid) -> Result<i64, DatabaseError>;

    async fn count_subjects(&self, institution_id: Uuid) -> Result<i64, DatabaseError>;

    async fn count_fee_items(&self, institution_id: Uuid) -> Result<i64, DatabaseError>;

    async fn count_students(&self, institution_id: Uuid) -> Result<i64, DatabaseError>;

    async fn count_staff(&self, institution_id: Uuid) -> Result<i64, DatabaseError>;
}
