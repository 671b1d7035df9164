//! One import strategy per record type.
//!
//! Each strategy validates a row, resolves its references, builds the
//! canonical record with defaults and writes it through the store.

use crate::import::{ImportContext, ImportKind, Row, RowError};

pub mod categories;
pub mod courses;
pub mod lessons;
pub mod users;

pub async fn import_row(ctx: &ImportContext<'_>, kind: ImportKind, row: &Row) -> Result<(), RowError> {
    match kind {
        ImportKind::Categories => categories::import_row(ctx, row).await,
        ImportKind::Courses => courses::import_row(ctx, row).await,
        ImportKind::Lessons => lessons::import_row(ctx, row).await,
        ImportKind::Users => users::import_row(ctx, row).await,
    }
}

/// Parse an enumerated value, naming the accepted set on failure.
pub(crate) fn enumerated<T>(
    row: &Row,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
    accepted: &[&str],
) -> Result<Option<T>, RowError> {
    match crate::import::fields::text(row, key) {
        None => Ok(None),
        Some(raw) => parse(&raw).map(Some).ok_or_else(|| {
            RowError::Invalid(format!(
                "{key} '{raw}' must be one of {}",
                accepted.join(", ")
            ))
        }),
    }
}
