//! Error types for Campus Onboard.

use crate::onboarding::checklist::ChecklistItemId;
use crate::onboarding::steps::StepId;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Version conflict updating {entity} {id}: expected version {expected}")]
    Conflict {
        entity: String,
        id: String,
        expected: i64,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Onboarding workflow errors.
///
/// All variants are recoverable: the actor retries the action (or a
/// different one) once the underlying condition resolves. None of them
/// leaves a partial write behind.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Onboarding is locked: the institution has already gone live")]
    Locked,

    #[error("Cannot navigate from {from} to {target}")]
    InvalidTransition { from: StepId, target: StepId },

    #[error("Step {0} is not accessible to the current actor")]
    StepNotVisible(StepId),

    #[error("Required checklist items are incomplete: {}", format_items(.items))]
    IncompleteRequirements { items: Vec<ChecklistItemId> },

    #[error("No onboarding steps are accessible to the current actor's roles")]
    NoAccessibleSteps,

    #[error("Onboarding progress was modified concurrently; reload and retry")]
    Conflict,

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for WorkflowError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::Conflict { .. } => Self::Conflict,
            other => Self::Database(other),
        }
    }
}

fn format_items(items: &[ChecklistItemId]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
