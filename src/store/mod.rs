//! Persistence layer — libSQL-backed storage for institutions, progress
//! and domain records.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{Database, Institution};
