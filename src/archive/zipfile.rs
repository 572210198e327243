use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{ArchiveStrategy, Layout};

/// Plain ZIP container, written in-process
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipStrategy;

#[async_trait]
impl ArchiveStrategy for ZipStrategy {
    async fn package(&self, layout: &Layout, output: &Path) -> Result<()> {
        let layout = layout.clone();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || write_zip(&layout, &output))
            .await
            .context("zip writer task failed")?
    }
}

fn write_zip(layout: &Layout, output: &Path) -> Result<()> {
    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut zip = ZipWriter::new(file);

    let dir_options = SimpleFileOptions::default().unix_permissions(0o755);
    for dir in &layout.dirs {
        zip.add_directory(format!("{}/", dir), dir_options)?;
    }

    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    for (path, content) in &layout.files {
        zip.start_file(path.as_str(), file_options)
            .with_context(|| format!("Failed to add {}", path))?;
        zip.write_all(content.as_bytes())?;
    }

    zip.finish().context("Failed to finalize zip")?;
    Ok(())
}
