//! Backing store abstraction.
//!
//! The import pipeline and the auth guards only talk to [`CampusStore`].
//! [`postgres::PgStore`] is the production implementation; [`memory::MemoryStore`]
//! keeps everything in process and backs the test suite.

use std::sync::Arc;

use rocket_db_pools::sqlx;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, CategoryRecord, CourseRecord, LessonRecord, NewUserAccount, UserType};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle managed in Rocket state.
pub type SharedStore = Arc<dyn CampusStore>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused this particular write (constraint violation, missing row).
    #[error("{0}")]
    Rejected(String),
    /// The store could not be reached or answered with something unusable.
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                let message = match db_err.code().as_deref() {
                    Some("23505") => format!("duplicate value violates unique constraint {constraint}"),
                    Some("23503") => {
                        format!("referenced record does not exist ({constraint})")
                    }
                    Some("23514") => format!("value violates check constraint {constraint}"),
                    Some("23502") => format!("missing value: {}", db_err.message()),
                    Some("22003") => format!("value out of range: {}", db_err.message()),
                    _ => db_err.message().to_string(),
                };
                StoreError::Rejected(message)
            }
            sqlx::Error::RowNotFound => StoreError::Rejected("record not found".to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// The course's highest lesson index is already the largest `i32`.
pub(crate) fn order_index_exhausted() -> StoreError {
    StoreError::Rejected("value out of range: next order_index exceeds the integer range".to_string())
}

/// How a record reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Insert,
    /// Insert or replace keyed by the record id.
    Upsert,
}

/// Result of a lesson write, carrying the index the store settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonWrite {
    pub id: Uuid,
    pub order_index: i32,
}

#[rocket::async_trait]
pub trait CampusStore: Send + Sync {
    /// Look up an identity together with its profile.
    async fn find_account(&self, user_id: Uuid) -> StoreResult<Option<Account>>;

    /// Case-insensitive lookup used by login.
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    async fn category_exists(&self, id: Uuid) -> StoreResult<bool>;

    async fn course_exists(&self, id: Uuid) -> StoreResult<bool>;

    /// Profile type of `id`, or `None` when no profile exists.
    async fn profile_type(&self, id: Uuid) -> StoreResult<Option<UserType>>;

    async fn write_category(&self, record: &CategoryRecord, mode: WriteMode) -> StoreResult<Uuid>;

    async fn write_course(&self, record: &CourseRecord, mode: WriteMode) -> StoreResult<Uuid>;

    /// Write a lesson. When `record.order_index` is `None` the store assigns
    /// the next index for the course atomically with the write.
    async fn write_lesson(&self, record: &LessonRecord, mode: WriteMode) -> StoreResult<LessonWrite>;

    /// Create the identity, its credentials and its profile as one unit.
    async fn create_user_account(&self, account: &NewUserAccount) -> StoreResult<Uuid>;
}
