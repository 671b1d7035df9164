//! Bulk import pipeline for the admin back office.
//!
//! 1. **Parsing** (`csv`) - raw CSV text into coerced [`Row`]s
//! 2. **Pre-flight** (`schema`) - advisory required-field checks
//! 3. **Importers** (`importers`) - per-type validation, reference lookups and writes
//! 4. **Coordination** (`coordinator`) - sequential row loop, failure policy, aggregation
//!
//! The importers re-validate every row; the pre-flight pass is only a hint
//! for the UI and the two may disagree.

use thiserror::Error;

use crate::store::StoreError;

pub mod config;
pub mod coordinator;
pub mod csv;
pub mod fields;
pub mod importers;
pub mod schema;
pub mod templates;
pub mod types;

pub use config::ImportConfig;
pub use coordinator::{ImportContext, run_import};
pub use schema::ValidationReport;
pub use types::{FailurePolicy, ImportKind, ImportOptions, ImportOutcome, ImportRowError, Row};

/// Errors that abort a whole run or reject the request before any row is touched.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unknown import type '{0}'")]
    UnknownKind(String),
    #[error("{0}")]
    Store(StoreError),
}

/// Failure of a single row. Never escapes the importer except as a fatal store error.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}
