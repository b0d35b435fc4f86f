//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Progress updates are
//! compare-and-set on the row's `version` column so two concurrent
//! writers cannot silently clobber each other.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::progress::{OnboardingProgress, ProgressPatch};
use crate::onboarding::steps::StepId;
use crate::store::migrations;
use crate::store::traits::{Database, Institution};

/// libSQL database backend.
///
/// Stores a single connection reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Insert a row into one of the per-institution domain tables.
    async fn insert_domain_row(
        &self,
        sql: &str,
        institution_id: Uuid,
        name: &str,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                sql,
                params![
                    Uuid::new_v4().to_string(),
                    institution_id.to_string(),
                    name
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert domain row: {e}")))?;
        Ok(())
    }

    /// Run a `COUNT(*)` query scoped to an institution.
    async fn count_for_institution(
        &self,
        sql: &str,
        institution_id: Uuid,
    ) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params![institution_id.to_string()])
            .await
            .map_err(|e| DatabaseError::Query(format!("count query: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0)),
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count read: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Convert `Option<&str>` to a libsql Value (NULL when absent).
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Serialize a completed-steps set to its JSON array column form.
fn steps_to_json(steps: &std::collections::BTreeSet<StepId>) -> Result<String, DatabaseError> {
    serde_json::to_string(steps).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

/// Parse the completed-steps JSON array column. Unknown entries fail
/// loudly — a bad step id in storage is corruption, not a default.
fn json_to_steps(s: &str) -> Result<std::collections::BTreeSet<StepId>, DatabaseError> {
    serde_json::from_str(s).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

/// Map a libsql row to an OnboardingProgress.
///
/// Column order: 0:institution_id, 1:current_step, 2:completed_steps,
/// 3:is_locked, 4:version, 5:created_at, 6:updated_at
fn row_to_progress(row: &libsql::Row) -> Result<OnboardingProgress, DatabaseError> {
    let institution_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("progress row: {e}")))?;
    let step_str: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("progress row: {e}")))?;
    let completed_str: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("progress row: {e}")))?;
    let locked: i64 = row.get(3).unwrap_or(0);
    let version: i64 = row.get(4).unwrap_or(1);
    let created_str: String = row.get(5).unwrap_or_default();
    let updated_str: String = row.get(6).unwrap_or_default();

    let institution_id = Uuid::parse_str(&institution_str)
        .map_err(|e| DatabaseError::Serialization(format!("institution id: {e}")))?;
    let current_step: StepId = step_str
        .parse()
        .map_err(|e| DatabaseError::Serialization(format!("current step: {e}")))?;

    Ok(OnboardingProgress {
        institution_id,
        current_step,
        completed_steps: json_to_steps(&completed_str)?,
        is_locked: locked != 0,
        version,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

const PROGRESS_COLUMNS: &str =
    "institution_id, current_step, completed_steps, is_locked, version, created_at, updated_at";

#[async_trait]
impl Database for LibSqlBackend {
    // ── Institutions ────────────────────────────────────────────────

    async fn create_institution(
        &self,
        id: Uuid,
        name: &str,
        contact_email: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO institutions (id, name, contact_email) VALUES (?1, ?2, ?3)",
                params![id.to_string(), name, opt_text(contact_email)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_institution: {e}")))?;
        Ok(())
    }

    async fn get_institution(&self, id: Uuid) -> Result<Option<Institution>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, name, contact_email FROM institutions WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_institution: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let id_str: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_institution: {e}")))?;
                let name: String = row
                    .get(1)
                    .map_err(|e| DatabaseError::Query(format!("get_institution: {e}")))?;
                let contact_email: Option<String> = row.get(2).ok();
                Ok(Some(Institution {
                    id: Uuid::parse_str(&id_str)
                        .map_err(|e| DatabaseError::Serialization(e.to_string()))?,
                    name,
                    contact_email,
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_institution: {e}"))),
        }
    }

    async fn set_institution_contact_email(
        &self,
        id: Uuid,
        email: &str,
    ) -> Result<(), DatabaseError> {
        let affected = self
            .conn()
            .execute(
                "UPDATE institutions
                 SET contact_email = ?2, updated_at = datetime('now')
                 WHERE id = ?1",
                params![id.to_string(), email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_contact_email: {e}")))?;
        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "institution".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    // ── Onboarding progress ─────────────────────────────────────────

    async fn get_progress(
        &self,
        institution_id: Uuid,
    ) -> Result<Option<OnboardingProgress>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {PROGRESS_COLUMNS} FROM onboarding_progress WHERE institution_id = ?1"
                ),
                params![institution_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_progress: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_progress(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_progress: {e}"))),
        }
    }

    async fn create_progress(&self, progress: &OnboardingProgress) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO onboarding_progress
                     (institution_id, current_step, completed_steps, is_locked,
                      version, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    progress.institution_id.to_string(),
                    progress.current_step.to_string(),
                    steps_to_json(&progress.completed_steps)?,
                    progress.is_locked as i64,
                    progress.version,
                    progress.created_at.to_rfc3339(),
                    progress.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_progress: {e}")))?;
        Ok(())
    }

    async fn update_progress(
        &self,
        institution_id: Uuid,
        expected_version: i64,
        patch: &ProgressPatch,
    ) -> Result<OnboardingProgress, DatabaseError> {
        // Read-modify-write: the union of completed steps is computed
        // here, and the write is guarded by the version predicate so a
        // concurrent writer makes this update affect zero rows.
        let current = self
            .get_progress(institution_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "onboarding_progress".to_string(),
                id: institution_id.to_string(),
            })?;

        let mut completed = current.completed_steps.clone();
        completed.extend(patch.add_completed.iter().copied());
        let current_step = patch.current_step.unwrap_or(current.current_step);
        let is_locked = current.is_locked || patch.lock;
        let now = Utc::now().to_rfc3339();

        let affected = self
            .conn()
            .execute(
                "UPDATE onboarding_progress
                 SET current_step = ?3, completed_steps = ?4, is_locked = ?5,
                     version = version + 1, updated_at = ?6
                 WHERE institution_id = ?1 AND version = ?2",
                params![
                    institution_id.to_string(),
                    expected_version,
                    current_step.to_string(),
                    steps_to_json(&completed)?,
                    is_locked as i64,
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_progress: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::Conflict {
                entity: "onboarding_progress".to_string(),
                id: institution_id.to_string(),
                expected: expected_version,
            });
        }

        self.get_progress(institution_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "onboarding_progress".to_string(),
                id: institution_id.to_string(),
            })
    }

    // ── Domain records ──────────────────────────────────────────────

    async fn add_academic_year(
        &self,
        institution_id: Uuid,
        name: &str,
    ) -> Result<(), DatabaseError> {
        self.insert_domain_row(
            "INSERT INTO academic_years (id, institution_id, name) VALUES (?1, ?2, ?3)",
            institution_id,
            name,
        )
        .await
    }

    async fn add_class(&self, institution_id: Uuid, name: &str) -> Result<(), DatabaseError> {
        self.insert_domain_row(
            "INSERT INTO classes (id, institution_id, name) VALUES (?1, ?2, ?3)",
            institution_id,
            name,
        )
        .await
    }

    async fn add_subject(&self, institution_id: Uuid, name: &str) -> Result<(), DatabaseError> {
        self.insert_domain_row(
            "INSERT INTO subjects (id, institution_id, name) VALUES (?1, ?2, ?3)",
            institution_id,
            name,
        )
        .await
    }

    async fn add_fee_item(
        &self,
        institution_id: Uuid,
        name: &str,
        amount_cents: i64,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO fee_items (id, institution_id, name, amount_cents)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    institution_id.to_string(),
                    name,
                    amount_cents
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("add_fee_item: {e}")))?;
        Ok(())
    }

    async fn add_student(
        &self,
        institution_id: Uuid,
        full_name: &str,
    ) -> Result<(), DatabaseError> {
        self.insert_domain_row(
            "INSERT INTO students (id, institution_id, full_name) VALUES (?1, ?2, ?3)",
            institution_id,
            full_name,
        )
        .await
    }

    async fn add_staff(&self, institution_id: Uuid, full_name: &str) -> Result<(), DatabaseError> {
        self.insert_domain_row(
            "INSERT INTO staff (id, institution_id, full_name) VALUES (?1, ?2, ?3)",
            institution_id,
            full_name,
        )
        .await
    }

    // ── Domain counters ─────────────────────────────────────────────

    async fn institution_contact_email(
        &self,
        institution_id: Uuid,
    ) -> Result<Option<String>, DatabaseError> {
        Ok(self
            .get_institution(institution_id)
            .await?
            .and_then(|i| i.contact_email))
    }

    async fn count_academic_years(&self, institution_id: Uuid) -> Result<i64, DatabaseError> {
        self.count_for_institution(
            "SELECT COUNT(*) FROM academic_years WHERE institution_id = ?1",
            institution_id,
        )
        .await
    }

    async fn count_classes(&self, institution_id: Uuid) -> Result<i64, DatabaseError> {
        self.count_for_institution(
            "SELECT COUNT(*) FROM classes WHERE institution_id = ?1",
            institution_id,
        )
        .await
    }

    async fn count_subjects(&self, institution_id: Uuid) -> Result<i64, DatabaseError> {
        self.count_for_institution(
            "SELECT COUNT(*) FROM subjects WHERE institution_id = ?1",
            institution_id,
        )
        .await
    }

    async fn count_fee_items(&self, institution_id: Uuid) -> Result<i64, DatabaseError> {
        self.count_for_institution(
            "SELECT COUNT(*) FROM fee_items WHERE institution_id = ?1",
            institution_id,
        )
        .await
    }

    async fn count_students(&self, institution_id: Uuid) -> Result<i64, DatabaseError> {
        self.count_for_institution(
            "SELECT COUNT(*) FROM students WHERE institution_id = ?1",
            institution_id,
        )
        .await
    }

    async fn count_staff(&self, institution_id: Uuid) -> Result<i64, DatabaseError> {
        self.count_for_institution(
            "SELECT COUNT(*) FROM staff WHERE institution_id = ?1",
            institution_id,
        )
        .await
    }
}
