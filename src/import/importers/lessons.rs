use uuid::Uuid;

use crate::import::{ImportContext, Row, RowError, fields};
use crate::models::LessonRecord;
use crate::store::WriteMode;

pub fn build_record(row: &Row, mode: WriteMode) -> Result<LessonRecord, RowError> {
    let title = fields::required_text(row, "title")?;
    let course_id = fields::uuid(row, "course_id")?
        .ok_or_else(|| RowError::Invalid("course_id is required".to_string()))?;

    let order_index = fields::integer(row, "order_index")?;
    if let Some(index) = order_index.filter(|index| *index < 0) {
        return Err(RowError::Invalid(format!(
            "order_index {index} must not be negative"
        )));
    }
    let duration_minutes = fields::integer(row, "duration_minutes")?;
    if let Some(minutes) = duration_minutes.filter(|minutes| *minutes < 0) {
        return Err(RowError::Invalid(format!(
            "duration_minutes {minutes} must not be negative"
        )));
    }

    let id = match mode {
        WriteMode::Upsert => fields::uuid(row, "id")?.unwrap_or_else(Uuid::new_v4),
        WriteMode::Insert => Uuid::new_v4(),
    };

    Ok(LessonRecord {
        id,
        course_id,
        title,
        description: fields::text(row, "description"),
        content: fields::text(row, "content"),
        video_url: fields::text(row, "video_url"),
        duration_minutes,
        order_index,
        is_free: fields::boolean(row, "is_free")?.unwrap_or(false),
    })
}

pub async fn import_row(ctx: &ImportContext<'_>, row: &Row) -> Result<(), RowError> {
    let mode = ctx.write_mode(row);
    let record = build_record(row, mode)?;

    if !ctx.store.course_exists(record.course_id).await? {
        return Err(RowError::Invalid(format!(
            "Course {} not found",
            record.course_id
        )));
    }

    // The store assigns the next order_index atomically when the row leaves it out.
    let written = ctx.store.write_lesson(&record, mode).await?;
    log::trace!(
        "lesson {} written to course {} at index {}",
        written.id,
        record.course_id,
        written.order_index
    );
    Ok(())
}
