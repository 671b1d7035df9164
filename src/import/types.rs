use std::fmt;
use std::str::FromStr;

use rocket::http::Status;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::import::ImportError;

/// One parsed unit of import input: a flat key to value mapping.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Categories,
    Courses,
    Lessons,
    Users,
}

impl ImportKind {
    pub const ALL: [ImportKind; 4] = [
        ImportKind::Categories,
        ImportKind::Courses,
        ImportKind::Lessons,
        ImportKind::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Categories => "categories",
            ImportKind::Courses => "courses",
            ImportKind::Lessons => "lessons",
            ImportKind::Users => "users",
        }
    }

    /// Whether rows of this kind can be upserted by `id`.
    pub fn supports_upsert(&self) -> bool {
        !matches!(self, ImportKind::Users)
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = ImportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "categories" => Ok(ImportKind::Categories),
            "courses" => Ok(ImportKind::Courses),
            "lessons" => Ok(ImportKind::Lessons),
            "users" => Ok(ImportKind::Users),
            _ => Err(ImportError::UnknownKind(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Upsert rows that carry an `id` instead of inserting them.
    pub update_existing: bool,
    /// Keep going after a row fails.
    pub skip_errors: bool,
}

/// What happens to the rest of the batch after a row fails.
///
/// Rows already written stay committed under both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    StopOnFirstError,
    ContinueOnError,
}

impl From<ImportOptions> for FailurePolicy {
    fn from(options: ImportOptions) -> Self {
        if options.skip_errors {
            FailurePolicy::ContinueOnError
        } else {
            FailurePolicy::StopOnFirstError
        }
    }
}

/// Per-row failure as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImportRowError {
    /// 0-based position of the row in the submitted data.
    pub index: usize,
    pub error: String,
    /// The submitted row with sensitive fields redacted.
    pub data: Row,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImportOutcome {
    pub success: bool,
    pub imported: usize,
    pub errors: Vec<ImportRowError>,
    pub warnings: Vec<String>,
}

impl ImportOutcome {
    /// HTTP status for this outcome. Row failures never turn into 4xx/5xx.
    pub fn status(&self, options: ImportOptions) -> Status {
        if !self.errors.is_empty() && options.skip_errors {
            Status::MultiStatus
        } else {
            Status::Ok
        }
    }
}
