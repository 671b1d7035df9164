//! Import coordination.
//!
//! Rows are processed one at a time in input order. Each row's store
//! round-trips complete before the next row starts, which keeps error
//! indices stable and makes the stop-on-first-error policy exact.

use crate::auth::PasswordService;
use crate::import::importers::{self, users};
use crate::import::{
    FailurePolicy, ImportError, ImportKind, ImportOptions, ImportOutcome, ImportRowError, Row,
    RowError, fields, schema,
};
use crate::store::{CampusStore, WriteMode};

/// Collaborators and options shared by every row of one run.
pub struct ImportContext<'a> {
    pub store: &'a dyn CampusStore,
    pub passwords: &'a PasswordService,
    pub options: ImportOptions,
}

impl<'a> ImportContext<'a> {
    pub fn new(
        store: &'a dyn CampusStore,
        passwords: &'a PasswordService,
        options: ImportOptions,
    ) -> Self {
        Self {
            store,
            passwords,
            options,
        }
    }

    /// Write mode for a row: upsert only when asked to and the row has an id.
    pub fn write_mode(&self, row: &Row) -> WriteMode {
        if self.options.update_existing && fields::present(row, "id") {
            WriteMode::Upsert
        } else {
            WriteMode::Insert
        }
    }
}

/// Run one import and aggregate the per-row outcomes.
///
/// Row failures are recorded in the outcome. Only a store that cannot be
/// reached aborts the run; rows written before that stay committed.
pub async fn run_import(
    ctx: &ImportContext<'_>,
    kind: ImportKind,
    rows: &[Row],
) -> Result<ImportOutcome, ImportError> {
    let policy = FailurePolicy::from(ctx.options);
    log::info!(
        "import started: type={} rows={} update_existing={} skip_errors={}",
        kind,
        rows.len(),
        ctx.options.update_existing,
        ctx.options.skip_errors
    );

    let mut outcome = ImportOutcome {
        warnings: schema::unknown_column_warnings(kind, rows),
        ..Default::default()
    };
    if kind == ImportKind::Users && ctx.options.update_existing {
        outcome
            .warnings
            .push("updateExisting does not apply to users; every row creates a new account".into());
    }

    for (index, row) in rows.iter().enumerate() {
        if ctx.options.update_existing && kind.supports_upsert() && !fields::present(row, "id") {
            outcome
                .warnings
                .push(format!("Row {}: no id given, inserted as a new record", index + 1));
        }

        match importers::import_row(ctx, kind, row).await {
            Ok(()) => outcome.imported += 1,
            Err(RowError::Store(err)) if err.is_fatal() => {
                log::error!(
                    "import aborted at row {} after {} imported: {}",
                    index,
                    outcome.imported,
                    err
                );
                return Err(ImportError::Store(err));
            }
            Err(err) => {
                let failed = failure(kind, index, &err, row);
                log::debug!("import row {} failed: {}", index, failed.error);
                outcome.errors.push(failed);

                if policy == FailurePolicy::StopOnFirstError {
                    log::info!("import stopped at row {} (skipErrors=false)", index);
                    break;
                }
            }
        }
    }

    outcome.success = outcome.errors.is_empty();
    log::info!(
        "import finished: type={} imported={} errors={} warnings={}",
        kind,
        outcome.imported,
        outcome.errors.len(),
        outcome.warnings.len()
    );
    Ok(outcome)
}

fn failure(kind: ImportKind, index: usize, err: &RowError, row: &Row) -> ImportRowError {
    let message = err.to_string();
    match kind {
        ImportKind::Users => ImportRowError {
            index,
            error: match err {
                RowError::Store(_) => users::scrub(&message, row),
                _ => message,
            },
            data: users::redact(row),
        },
        _ => ImportRowError {
            index,
            error: message,
            data: row.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserType;
    use crate::store::MemoryStore;
    use serde_json::{Value, json};
    use uuid::Uuid;

    fn rows(value: Value) -> Vec<Row> {
        value
            .as_array()
            .expect("array literal")
            .iter()
            .map(|v| v.as_object().cloned().expect("object literal"))
            .collect()
    }

    fn passwords() -> PasswordService {
        PasswordService::new().expect("password service")
    }

    async fn run(
        store: &MemoryStore,
        kind: ImportKind,
        data: Value,
        options: ImportOptions,
    ) -> Result<ImportOutcome, ImportError> {
        let passwords = passwords();
        let ctx = ImportContext::new(store, &passwords, options);
        run_import(&ctx, kind, &rows(data)).await
    }

    fn skip_errors() -> ImportOptions {
        ImportOptions {
            update_existing: false,
            skip_errors: true,
        }
    }

    async fn seed_course(store: &MemoryStore) -> Uuid {
        let instructor = store
            .insert_account("profe@example.com", None, UserType::Instructor)
            .await;
        let outcome = run(
            store,
            ImportKind::Courses,
            json!([{"title": "Rust", "instructor_id": instructor.to_string()}]),
            ImportOptions::default(),
        )
        .await
        .expect("course import runs");
        assert_eq!(outcome.imported, 1);
        store.courses().await[0].id
    }

    #[tokio::test]
    async fn category_import_with_defaults() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            ImportKind::Categories,
            json!([{"name": "Programación", "color": "#3b82f6"}]),
            ImportOptions::default(),
        )
        .await
        .expect("import runs");

        assert!(outcome.success);
        assert_eq!(outcome.imported, 1);
        assert!(outcome.errors.is_empty());
        assert_eq!(ImportOutcome::status(&outcome, ImportOptions::default()).code, 200);

        let categories = store.categories().await;
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Programación");
        assert_eq!(categories[0].color.as_deref(), Some("#3b82f6"));
        assert_eq!(categories[0].icon, None);
    }

    #[tokio::test]
    async fn course_without_instructor_fails_at_index_zero() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            ImportKind::Courses,
            json!([{"title": "X"}]),
            ImportOptions::default(),
        )
        .await
        .expect("import runs");

        assert!(!outcome.success);
        assert_eq!(outcome.imported, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 0);
        assert!(outcome.errors[0].error.contains("instructor"));
        assert_eq!(outcome.errors[0].data["title"], json!("X"));
    }

    #[tokio::test]
    async fn lessons_without_order_index_are_numbered_sequentially() {
        let store = MemoryStore::new();
        let course_id = seed_course(&store).await;

        let outcome = run(
            &store,
            ImportKind::Lessons,
            json!([
                {"title": "Intro", "course_id": course_id.to_string()},
                {"title": "Setup", "course_id": course_id.to_string()}
            ]),
            skip_errors(),
        )
        .await
        .expect("import runs");

        assert!(outcome.success);
        assert_eq!(outcome.imported, 2);
        let indices: Vec<i32> = store.lessons().await.iter().map(|l| l.order_index).collect();
        assert_eq!(indices, vec![1, 2]);

        let outcome = run(
            &store,
            ImportKind::Lessons,
            json!([
                {"title": "Pinned", "course_id": course_id.to_string(), "order_index": 10},
                {"title": "After", "course_id": course_id.to_string()}
            ]),
            skip_errors(),
        )
        .await
        .expect("import runs");
        assert_eq!(outcome.imported, 2);
        let indices: Vec<i32> = store.lessons().await.iter().map(|l| l.order_index).collect();
        assert_eq!(indices, vec![1, 2, 10, 11]);
    }

    #[tokio::test]
    async fn lesson_index_past_the_integer_range_is_a_row_error() {
        let store = MemoryStore::new();
        let course_id = seed_course(&store).await;

        let outcome = run(
            &store,
            ImportKind::Lessons,
            json!([
                {"title": "Last", "course_id": course_id.to_string(), "order_index": i32::MAX},
                {"title": "Overflow", "course_id": course_id.to_string()},
                {"title": "Pinned", "course_id": course_id.to_string(), "order_index": 3}
            ]),
            skip_errors(),
        )
        .await
        .expect("import runs");

        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 1);
        assert!(outcome.errors[0].error.contains("out of range"));
        let indices: Vec<i32> = store.lessons().await.iter().map(|l| l.order_index).collect();
        assert_eq!(indices, vec![i32::MAX, 3]);
    }

    #[tokio::test]
    async fn lesson_moved_to_another_course_takes_its_next_index() {
        let store = MemoryStore::new();
        let first = seed_course(&store).await;
        let instructor = store.courses().await[0].instructor_id;
        let outcome = run(
            &store,
            ImportKind::Courses,
            json!([{"title": "Go", "instructor_id": instructor.to_string()}]),
            ImportOptions::default(),
        )
        .await
        .expect("course import runs");
        assert_eq!(outcome.imported, 1);
        let second = store.courses().await[1].id;

        let moved = Uuid::new_v4().to_string();
        let upsert = ImportOptions {
            update_existing: true,
            skip_errors: false,
        };
        let outcome = run(
            &store,
            ImportKind::Lessons,
            json!([
                {"title": "A1", "course_id": first.to_string()},
                {"title": "A2", "course_id": first.to_string()},
                {"id": moved, "title": "A3", "course_id": first.to_string()},
                {"title": "B1", "course_id": second.to_string()},
                {"id": moved, "title": "A3 moved", "course_id": second.to_string()}
            ]),
            upsert,
        )
        .await
        .expect("import runs");
        assert!(outcome.success, "{:?}", outcome.errors);

        let lessons = store.lessons().await;
        let lesson = lessons
            .iter()
            .find(|l| l.record.title == "A3 moved")
            .expect("moved lesson");
        assert_eq!(lesson.record.course_id, second);
        assert_eq!(lesson.order_index, 2);
    }

    #[tokio::test]
    async fn lessons_require_an_existing_course() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            ImportKind::Lessons,
            json!([{"title": "Orphan", "course_id": Uuid::new_v4().to_string()}]),
            ImportOptions::default(),
        )
        .await
        .expect("import runs");

        assert_eq!(outcome.imported, 0);
        assert!(outcome.errors[0].error.contains("not found"));
    }

    #[tokio::test]
    async fn error_indices_follow_input_positions() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            ImportKind::Categories,
            json!([
                {"name": "A"},
                {"name": ""},
                {"name": "C"},
                {"description": "no name"},
                {"name": "E"}
            ]),
            skip_errors(),
        )
        .await
        .expect("import runs");

        assert_eq!(outcome.imported, 3);
        let indices: Vec<usize> = outcome.errors.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert_eq!(outcome.status(skip_errors()).code, 207);
    }

    #[tokio::test]
    async fn first_failure_stops_the_run_without_rollback() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            ImportKind::Categories,
            json!([
                {"name": "A"},
                {"name": "B"},
                {"icon": "broken"},
                {"name": "D"}
            ]),
            ImportOptions::default(),
        )
        .await
        .expect("import runs");

        assert!(!outcome.success);
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 2);
        assert_eq!(outcome.status(ImportOptions::default()).code, 200);

        let names: Vec<String> = store.categories().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn upsert_by_id_is_idempotent() {
        let id = Uuid::new_v4().to_string();
        let row = json!([{"id": id, "name": "Data"}]);
        let upsert = ImportOptions {
            update_existing: true,
            skip_errors: false,
        };

        let store = MemoryStore::new();
        for _ in 0..2 {
            let outcome = run(&store, ImportKind::Categories, row.clone(), upsert)
                .await
                .expect("import runs");
            assert!(outcome.success);
        }
        assert_eq!(store.categories().await.len(), 1);

        let store = MemoryStore::new();
        for _ in 0..2 {
            let outcome = run(&store, ImportKind::Categories, row.clone(), ImportOptions::default())
                .await
                .expect("import runs");
            assert!(outcome.success);
        }
        assert_eq!(store.categories().await.len(), 2);
    }

    #[tokio::test]
    async fn upsert_without_id_warns_and_inserts() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            ImportKind::Categories,
            json!([{"name": "No id", "slug": "x"}]),
            ImportOptions {
                update_existing: true,
                skip_errors: false,
            },
        )
        .await
        .expect("import runs");

        assert_eq!(outcome.imported, 1);
        assert_eq!(
            outcome.warnings,
            vec![
                "Column 'slug' is not recognized for categories and was ignored",
                "Row 1: no id given, inserted as a new record",
            ]
        );
    }

    #[tokio::test]
    async fn user_errors_never_echo_the_password() {
        let store = MemoryStore::new();
        store
            .insert_account("taken@example.com", None, UserType::Student)
            .await;

        let outcome = run(
            &store,
            ImportKind::Users,
            json!([
                {"email": "taken@example.com", "password": "hunter22-secret"},
                {"email": "new@example.com", "password": "abc"},
                {"email": "ok@example.com", "password": "long-enough", "full_name": "Ok", "user_type": "instructor"}
            ]),
            skip_errors(),
        )
        .await
        .expect("import runs");

        assert_eq!(outcome.imported, 1);
        assert_eq!(outcome.errors.len(), 2);
        for error in &outcome.errors {
            let rendered = serde_json::to_string(error).expect("serializes");
            assert!(!rendered.contains("hunter22-secret"));
            assert!(!rendered.contains("\"abc\""));
            assert_eq!(error.data["password"], json!("[REDACTED]"));
        }

        let id = store
            .account_id_by_email("ok@example.com")
            .await
            .expect("account created");
        let profile = store.profile(id).await.expect("profile created");
        assert_eq!(profile.user_type, UserType::Instructor);
        assert_eq!(profile.full_name.as_deref(), Some("Ok"));
        assert_eq!(
            store.identity_metadata(id).await,
            Some(json!({"full_name": "Ok"}))
        );
    }

    #[tokio::test]
    async fn short_password_message_stays_readable() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            ImportKind::Users,
            json!([{"email": "e@example.com", "password": "e"}]),
            ImportOptions::default(),
        )
        .await
        .expect("import runs");

        assert_eq!(outcome.imported, 0);
        assert_eq!(outcome.errors[0].error, "password must be at least 6 characters");
        assert_eq!(outcome.errors[0].data["password"], json!("[REDACTED]"));
    }

    #[tokio::test]
    async fn numeric_passwords_must_arrive_as_text() {
        let store = MemoryStore::new();
        let outcome = run(
            &store,
            ImportKind::Users,
            json!([{"email": "num@example.com", "password": 12345678}]),
            ImportOptions::default(),
        )
        .await
        .expect("import runs");

        assert_eq!(outcome.imported, 0);
        assert_eq!(outcome.errors[0].error, "password must be text");
        assert_eq!(outcome.errors[0].data["password"], json!("[REDACTED]"));
        assert!(store.account_id_by_email("num@example.com").await.is_none());
    }

    #[tokio::test]
    async fn csv_passwords_keep_leading_zeros() {
        let store = MemoryStore::new();
        let parsed = crate::import::csv::parse_for(
            ImportKind::Users,
            "email,password\nzero@example.com,0012345678\n",
        );
        assert_eq!(parsed[0]["password"], json!("0012345678"));

        let passwords = passwords();
        let ctx = ImportContext::new(&store, &passwords, ImportOptions::default());
        let outcome = run_import(&ctx, ImportKind::Users, &parsed)
            .await
            .expect("import runs");
        assert_eq!(outcome.imported, 1);

        let hash = store
            .find_account_by_email("zero@example.com")
            .await
            .expect("lookup runs")
            .and_then(|account| account.password_hash)
            .expect("credentials stored");
        assert!(passwords.verify_password("0012345678", &hash).expect("verify runs"));
        assert!(!passwords.verify_password("12345678", &hash).expect("verify runs"));
    }

    #[tokio::test]
    async fn unreachable_store_aborts_the_run() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = run(
            &store,
            ImportKind::Categories,
            json!([{"name": "A"}]),
            skip_errors(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ImportError::Store(_)));
    }

    #[tokio::test]
    async fn courses_check_instructor_role_and_category() {
        let store = MemoryStore::new();
        let student = store
            .insert_account("student@example.com", None, UserType::Student)
            .await;
        let instructor = store
            .insert_account("profe@example.com", None, UserType::Instructor)
            .await;

        let outcome = run(
            &store,
            ImportKind::Courses,
            json!([
                {"title": "A", "instructor_id": student.to_string()},
                {"title": "B", "instructor_id": instructor.to_string(), "category_id": Uuid::new_v4().to_string()},
                {"title": "C", "instructor_id": instructor.to_string(), "level": "expert"},
                {"title": "D", "instructor_id": instructor.to_string(), "price": "12.5", "requirements": ["git"]}
            ]),
            skip_errors(),
        )
        .await
        .expect("import runs");

        assert_eq!(outcome.imported, 1);
        let messages: Vec<&str> = outcome.errors.iter().map(|e| e.error.as_str()).collect();
        assert!(messages[0].contains("is not an instructor"));
        assert!(messages[1].contains("Category"));
        assert!(messages[2].contains("level"));

        let courses = store.courses().await;
        assert_eq!(courses.len(), 1);
        let course = &courses[0];
        assert_eq!(course.title, "D");
        assert_eq!(course.price, 12.5);
        assert_eq!(course.duration_hours, 1);
        assert_eq!(course.level.as_str(), "beginner");
        assert_eq!(course.status.as_str(), "draft");
        assert_eq!(course.requirements, vec!["git"]);
    }
}
