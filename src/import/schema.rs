//! Column definitions and the advisory pre-flight validator.

use std::collections::BTreeSet;

use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::import::{ImportKind, Row, fields};

/// Result of the pre-flight pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ImportKind {
    /// Template columns in download order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ImportKind::Categories => &["name", "description", "icon", "color"],
            ImportKind::Courses => &[
                "title",
                "description",
                "instructor_id",
                "category_id",
                "level",
                "status",
                "price",
                "duration_hours",
                "thumbnail_url",
                "requirements",
                "what_you_learn",
            ],
            ImportKind::Lessons => &[
                "course_id",
                "title",
                "description",
                "content",
                "video_url",
                "duration_minutes",
                "order_index",
                "is_free",
            ],
            ImportKind::Users => &["email", "password", "full_name", "user_type", "bio"],
        }
    }

    /// Fields the pre-flight pass insists on.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            ImportKind::Categories => &["name"],
            ImportKind::Courses => &["title", "instructor_id"],
            ImportKind::Lessons => &["title", "course_id"],
            ImportKind::Users => &["email", "password"],
        }
    }

    /// CSV columns taken exactly as written, never coerced to numbers or booleans.
    pub fn verbatim_columns(&self) -> &'static [&'static str] {
        match self {
            ImportKind::Users => &["password"],
            _ => &[],
        }
    }

    pub fn recognizes(&self, column: &str) -> bool {
        (self.supports_upsert() && column == "id") || self.columns().contains(&column)
    }
}

/// Presence-only checks; types and references are left to the importers.
pub fn validate(kind: ImportKind, rows: &[Row]) -> ValidationReport {
    if rows.is_empty() {
        return ValidationReport {
            valid: false,
            errors: vec!["No data to import".to_string()],
        };
    }

    let errors: Vec<String> = rows
        .iter()
        .enumerate()
        .flat_map(|(index, row)| {
            kind.required_fields()
                .iter()
                .filter(move |field| !fields::present(row, field))
                .map(move |field| format!("Row {}: missing required field '{}'", index + 1, field))
        })
        .collect();

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

/// One warning per column that the importer for `kind` will ignore.
pub fn unknown_column_warnings(kind: ImportKind, rows: &[Row]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut warnings = Vec::new();
    for column in rows.iter().flat_map(|row| row.keys()) {
        if !kind.recognizes(column) && seen.insert(column.as_str()) {
            warnings.push(format!(
                "Column '{column}' is not recognized for {kind} and was ignored"
            ));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<Row> {
        value
            .as_array()
            .expect("array literal")
            .iter()
            .map(|v| v.as_object().cloned().expect("object literal"))
            .collect()
    }

    #[test]
    fn empty_input_is_rejected() {
        let report = validate(ImportKind::Categories, &[]);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["No data to import"]);
    }

    #[test]
    fn reports_each_missing_field_with_one_based_rows() {
        let data = rows(json!([
            {"title": "Rust", "instructor_id": "x"},
            {"title": ""},
            {"description": "no title"}
        ]));
        let report = validate(ImportKind::Courses, &data);
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![
                "Row 2: missing required field 'instructor_id'",
                "Row 3: missing required field 'title'",
                "Row 3: missing required field 'instructor_id'",
            ]
        );
    }

    #[test]
    fn presence_is_the_only_check() {
        let data = rows(json!([{"email": "not-an-email", "password": 1}]));
        assert!(validate(ImportKind::Users, &data).valid);

        let data = rows(json!([{"title": "Intro", "course_id": "not-a-uuid"}]));
        assert!(validate(ImportKind::Lessons, &data).valid);
    }

    #[test]
    fn unknown_columns_are_reported_once() {
        let data = rows(json!([
            {"name": "A", "slug": "a", "id": "x"},
            {"name": "B", "slug": "b"}
        ]));
        let warnings = unknown_column_warnings(ImportKind::Categories, &data);
        assert_eq!(
            warnings,
            vec!["Column 'slug' is not recognized for categories and was ignored"]
        );

        let data = rows(json!([{"email": "a@b.c", "id": "x"}]));
        assert_eq!(unknown_column_warnings(ImportKind::Users, &data).len(), 1);
    }
}
