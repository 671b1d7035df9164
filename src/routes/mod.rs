//! HTTP route handlers grouped by resource domain.
//!
//! Handlers are annotated with `#[openapi]` so `rocket_okapi` can derive
//! the OpenAPI document; JSON catchers keep error bodies uniform.

pub mod catchers;
pub mod health;
pub mod import;
