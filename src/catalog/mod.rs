pub mod seeds;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;

use crate::error::BootstrapError;
use crate::models::*;

/// Read-mostly store of templates keyed by `(name, type)`.
///
/// Implementors supply the four storage primitives; the pipeline-facing
/// operations (`resolve`, `import`, `delete`) are built on top of them.
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn get(&self, name: &str, kind: TemplateType) -> Result<Option<Template>>;

    /// Entries of one type, ordered by name
    async fn list(&self, kind: TemplateType) -> Result<Vec<TemplateSummary>>;

    /// Insert, or replace the entry with the same `(name, type)`
    async fn put(&self, template: &NewTemplate) -> Result<()>;

    /// Remove every entry with this name. Returns the number removed.
    async fn remove(&self, name: &str) -> Result<u64>;

    /// Template source for `(name, type)`
    async fn resolve(&self, name: &str, kind: TemplateType) -> Result<String, BootstrapError> {
        match self.get(name, kind).await? {
            Some(template) => Ok(template.source),
            None => Err(BootstrapError::TemplateNotFound {
                name: name.to_string(),
                kind,
                caller_supplied: false,
            }),
        }
    }

    async fn import(&self, source: &str, name: &str, description: &str, kind: TemplateType) -> bool {
        let template = NewTemplate {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            source: source.to_string(),
        };
        match self.put(&template).await {
            Ok(()) => {
                tracing::info!("Imported {} template {}", kind, name);
                true
            }
            Err(e) => {
                tracing::error!("Failed to import {} template {}: {:#}", kind, name, e);
                false
            }
        }
    }

    async fn delete(&self, name: &str) -> bool {
        match self.remove(name).await {
            Ok(0) => {
                tracing::warn!("No template named {} to delete", name);
                false
            }
            Ok(count) => {
                tracing::info!("Deleted {} template(s) named {}", count, name);
                true
            }
            Err(e) => {
                tracing::error!("Failed to delete template {}: {:#}", name, e);
                false
            }
        }
    }
}

/// In-process catalog, used when no database path is configured
#[derive(Default)]
pub struct MemoryCatalog {
    templates: RwLock<BTreeMap<(String, TemplateType), Template>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateCatalog for MemoryCatalog {
    async fn get(&self, name: &str, kind: TemplateType) -> Result<Option<Template>> {
        let templates = self.templates.read().await;
        Ok(templates.get(&(name.to_string(), kind)).cloned())
    }

    async fn list(&self, kind: TemplateType) -> Result<Vec<TemplateSummary>> {
        let templates = self.templates.read().await;
        Ok(templates
            .values()
            .filter(|t| t.kind == kind)
            .map(|t| TemplateSummary {
                name: t.name.clone(),
                description: t.description.clone(),
            })
            .collect())
    }

    async fn put(&self, template: &NewTemplate) -> Result<()> {
        let now = Utc::now();
        let mut templates = self.templates.write().await;
        let key = (template.name.clone(), template.kind);
        let created_at = templates.get(&key).map(|t| t.created_at).unwrap_or(now);
        templates.insert(
            key,
            Template {
                name: template.name.clone(),
                kind: template.kind,
                description: template.description.clone(),
                source: template.source.clone(),
                created_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<u64> {
        let mut templates = self.templates.write().await;
        let before = templates.len();
        templates.retain(|(n, _), _| n != name);
        Ok((before - templates.len()) as u64)
    }
}

/// Import template files from `<dir>/init_cfg/` and `<dir>/bootstrap/`.
///
/// The file stem becomes the template name; existing entries are replaced.
/// A missing directory is not an error.
pub async fn import_templates_from_dir(catalog: &dyn TemplateCatalog, dir: &Path) -> Result<usize> {
    let mut imported = 0;
    for kind in [TemplateType::InitCfg, TemplateType::Bootstrap] {
        let subdir = dir.join(kind.as_str());
        if !tokio::fs::try_exists(&subdir).await.unwrap_or(false) {
            continue;
        }

        let mut entries = tokio::fs::read_dir(&subdir)
            .await
            .with_context(|| format!("Failed to read template directory {}", subdir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            let description = format!("Imported from {}", path.display());
            if catalog.import(&source, name, &description, kind).await {
                imported += 1;
            }
        }
    }
    Ok(imported)
}

/// Catalog whose storage is unreachable
#[cfg(test)]
pub(crate) struct FailingCatalog;

#[cfg(test)]
#[async_trait]
impl TemplateCatalog for FailingCatalog {
    async fn get(&self, _name: &str, _kind: TemplateType) -> Result<Option<Template>> {
        anyhow::bail!("database is locked")
    }

    async fn list(&self, _kind: TemplateType) -> Result<Vec<TemplateSummary>> {
        anyhow::bail!("database is locked")
    }

    async fn put(&self, _template: &NewTemplate) -> Result<()> {
        anyhow::bail!("database is locked")
    }

    async fn remove(&self, _name: &str) -> Result<u64> {
        anyhow::bail!("database is locked")
    }
}
