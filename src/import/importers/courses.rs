use uuid::Uuid;

use crate::import::importers::enumerated;
use crate::import::{ImportContext, Row, RowError, fields};
use crate::models::{CourseLevel, CourseRecord, CourseStatus};
use crate::store::WriteMode;

const DEFAULT_PRICE: f64 = 0.0;
const DEFAULT_DURATION_HOURS: i32 = 1;

/// Canonical course from a row. References are checked separately.
pub fn build_record(row: &Row, mode: WriteMode) -> Result<CourseRecord, RowError> {
    let title = fields::required_text(row, "title")?;
    let instructor_id = fields::uuid(row, "instructor_id")?
        .ok_or_else(|| RowError::Invalid("instructor_id is required".to_string()))?;

    let price = fields::number(row, "price")?.unwrap_or(DEFAULT_PRICE);
    if price < 0.0 {
        return Err(RowError::Invalid(format!("price {price} must not be negative")));
    }
    let duration_hours = fields::integer(row, "duration_hours")?.unwrap_or(DEFAULT_DURATION_HOURS);
    if duration_hours <= 0 {
        return Err(RowError::Invalid(format!(
            "duration_hours {duration_hours} must be positive"
        )));
    }

    let id = match mode {
        WriteMode::Upsert => fields::uuid(row, "id")?.unwrap_or_else(Uuid::new_v4),
        WriteMode::Insert => Uuid::new_v4(),
    };

    Ok(CourseRecord {
        id,
        title,
        description: fields::text(row, "description"),
        instructor_id,
        category_id: fields::uuid(row, "category_id")?,
        level: enumerated(
            row,
            "level",
            CourseLevel::parse,
            &["beginner", "intermediate", "advanced"],
        )?
        .unwrap_or_default(),
        status: enumerated(
            row,
            "status",
            CourseStatus::parse,
            &["draft", "published", "archived"],
        )?
        .unwrap_or_default(),
        price,
        duration_hours,
        thumbnail_url: fields::text(row, "thumbnail_url"),
        requirements: fields::string_list(row, "requirements")?,
        what_you_learn: fields::string_list(row, "what_you_learn")?,
    })
}

pub async fn import_row(ctx: &ImportContext<'_>, row: &Row) -> Result<(), RowError> {
    let mode = ctx.write_mode(row);
    let record = build_record(row, mode)?;

    match ctx.store.profile_type(record.instructor_id).await? {
        None => {
            return Err(RowError::Invalid(format!(
                "Instructor {} not found",
                record.instructor_id
            )));
        }
        Some(user_type) if !user_type.can_teach() => {
            return Err(RowError::Invalid(format!(
                "User {} is not an instructor",
                record.instructor_id
            )));
        }
        Some(_) => {}
    }

    if let Some(category_id) = record.category_id {
        if !ctx.store.category_exists(category_id).await? {
            return Err(RowError::Invalid(format!("Category {category_id} not found")));
        }
    }

    ctx.store.write_course(&record, mode).await?;
    Ok(())
}
