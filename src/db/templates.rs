use anyhow::Result;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::models::*;

use super::row_helpers::{map_template_row, map_template_summary_row};

const SELECT_TEMPLATE: &str = r#"
    SELECT name, type, description, source, created_at, updated_at
    FROM templates
"#;

/// Template database operations
pub struct TemplateRepo;

impl TemplateRepo {
    pub async fn list(pool: &Pool<Sqlite>, kind: TemplateType) -> Result<Vec<TemplateSummary>> {
        let rows = sqlx::query("SELECT name, description FROM templates WHERE type = ? ORDER BY name")
            .bind(kind.as_str())
            .fetch_all(pool)
            .await?;

        Ok(rows.iter().map(map_template_summary_row).collect())
    }

    pub async fn get(pool: &Pool<Sqlite>, name: &str, kind: TemplateType) -> Result<Option<Template>> {
        let row = sqlx::query(&format!("{} WHERE name = ? AND type = ?", SELECT_TEMPLATE))
            .bind(name)
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_template_row).transpose()?)
    }

    /// Insert or replace by (name, type); created_at survives a replace
    pub async fn upsert(pool: &Pool<Sqlite>, template: &NewTemplate) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO templates (name, type, description, source, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (name, type) DO UPDATE SET
                description = excluded.description,
                source = excluded.source,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&template.name)
        .bind(template.kind.as_str())
        .bind(&template.description)
        .bind(&template.source)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &Pool<Sqlite>, name: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM templates WHERE name = ?")
            .bind(name)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
