pub(crate) mod row_helpers;
mod templates;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use crate::catalog::TemplateCatalog;
use crate::models::*;

use templates::TemplateRepo;

/// Store is the SQLite-backed template catalog.
#[derive(Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
}

impl Store {
    /// Create a new database store with the default pool size
    #[allow(dead_code)]
    pub async fn new(db_path: &str) -> Result<Self> {
        Self::with_pool_size(db_path, 5).await
    }

    /// Create a new database store with a specific pool size
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }
}

#[async_trait]
impl TemplateCatalog for Store {
    async fn get(&self, name: &str, kind: TemplateType) -> Result<Option<Template>> {
        TemplateRepo::get(&self.pool, name, kind).await
    }

    async fn list(&self, kind: TemplateType) -> Result<Vec<TemplateSummary>> {
        TemplateRepo::list(&self.pool, kind).await
    }

    async fn put(&self, template: &NewTemplate) -> Result<()> {
        TemplateRepo::upsert(&self.pool, template).await
    }

    async fn remove(&self, name: &str) -> Result<u64> {
        TemplateRepo::delete(&self.pool, name).await
    }
}
