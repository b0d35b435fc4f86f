//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "institutions_and_progress",
        sql: r#"
            CREATE TABLE IF NOT EXISTS institutions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                contact_email TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS onboarding_progress (
                institution_id TEXT PRIMARY KEY
                    REFERENCES institutions(id) ON DELETE CASCADE,
                current_step TEXT NOT NULL,
                completed_steps TEXT NOT NULL DEFAULT '[]',
                is_locked INTEGER NOT NULL DEFAULT 0,
                version INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "domain_records",
        sql: r#"
            CREATE TABLE IF NOT EXISTS academic_years (
                id TEXT PRIMARY KEY,
                institution_id TEXT NOT NULL
                    REFERENCES institutions(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (institution_id, name)
            );
            CREATE INDEX IF NOT EXISTS idx_academic_years_institution
                ON academic_years(institution_id);

            CREATE TABLE IF NOT EXISTS classes (
                id TEXT PRIMARY KEY,
                institution_id TEXT NOT NULL
                    REFERENCES institutions(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (institution_id, name)
            );
            CREATE INDEX IF NOT EXISTS idx_classes_institution
                ON classes(institution_id);

            CREATE TABLE IF NOT EXISTS subjects (
                id TEXT PRIMARY KEY,
                institution_id TEXT NOT NULL
                    REFERENCES institutions(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (institution_id, name)
            );
            CREATE INDEX IF NOT EXISTS idx_subjects_institution
                ON subjects(institution_id);

            CREATE TABLE IF NOT EXISTS fee_items (
                id TEXT PRIMARY KEY,
                institution_id TEXT NOT NULL
                    REFERENCES institutions(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                amount_cents INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_fee_items_institution
                ON fee_items(institution_id);

            CREATE TABLE IF NOT EXISTS students (
                id TEXT PRIMARY KEY,
                institution_id TEXT NOT NULL
                    REFERENCES institutions(id) ON DELETE CASCADE,
                full_name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_students_institution
                ON students(institution_id);

            CREATE TABLE IF NOT EXISTS staff (
                id TEXT PRIMARY KEY,
                institution_id TEXT NOT NULL
                    REFERENCES institutions(id) ON DELETE CASCADE,
                full_name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_staff_institution
                ON staff(institution_id);
        "#,
    },
];

/// Run all pending migrations on the given connection.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            record_version(conn, migration.version, migration.name).await?;
        }
    }

    tracing::info!("Database migrations complete (at V{})", {
        let v = get_current_version(conn).await?;
        if v == 0 {
            MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
        } else {
            v
        }
    });

    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => {
            let version: i64 = row.get(0).map_err(|e| {
                DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
            })?;
            Ok(version)
        }
        None => Ok(0),
    }
}

/// Insert a version record into `_migrations`.
async fn record_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
