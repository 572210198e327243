use sqlx::{sqlite::SqliteRow, Row};

use crate::models::*;

/// Map a SQLite row to a Template struct. An unknown `type` is a decode error.
pub fn map_template_row(row: &SqliteRow) -> Result<Template, sqlx::Error> {
    let kind: String = row.try_get("type")?;
    let kind = kind.parse::<TemplateType>().map_err(|e| {
        tracing::warn!("Template row has unknown type {:?}", kind);
        sqlx::Error::ColumnDecode {
            index: "type".into(),
            source: e.into(),
        }
    })?;
    Ok(Template {
        name: row.try_get("name")?,
        kind,
        description: row.try_get("description")?,
        source: row.try_get("source")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map a SQLite row to a TemplateSummary struct
pub fn map_template_summary_row(row: &SqliteRow) -> TemplateSummary {
    TemplateSummary {
        name: row.get("name"),
        description: row.get("description"),
    }
}
