use uuid::Uuid;

use crate::import::{ImportContext, Row, RowError, fields};
use crate::models::CategoryRecord;
use crate::store::WriteMode;

pub fn build_record(row: &Row, mode: WriteMode) -> Result<CategoryRecord, RowError> {
    let name = fields::required_text(row, "name")?;
    let id = match mode {
        WriteMode::Upsert => fields::uuid(row, "id")?.unwrap_or_else(Uuid::new_v4),
        WriteMode::Insert => Uuid::new_v4(),
    };

    Ok(CategoryRecord {
        id,
        name,
        description: fields::text(row, "description"),
        icon: fields::text(row, "icon"),
        color: fields::text(row, "color"),
    })
}

pub async fn import_row(ctx: &ImportContext<'_>, row: &Row) -> Result<(), RowError> {
    let mode = ctx.write_mode(row);
    let record = build_record(row, mode)?;
    ctx.store.write_category(&record, mode).await?;
    Ok(())
}
