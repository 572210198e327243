use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use super::{ArchiveStrategy, Layout};

/// ISO9660 image authored by an external mkisofs-compatible tool.
///
/// The layout is staged next to the output file and removed afterwards,
/// whether or not the tool succeeded.
#[derive(Debug, Clone)]
pub struct IsoStrategy {
    pub tool: String,
    pub volume_id: String,
}

impl Default for IsoStrategy {
    fn default() -> Self {
        Self {
            tool: "genisoimage".to_string(),
            volume_id: "bootstrap".to_string(),
        }
    }
}

impl IsoStrategy {
    pub fn new(tool: impl Into<String>, volume_id: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            volume_id: volume_id.into(),
        }
    }

    /// Joliet + Rock Ridge so long, mixed-case file names survive
    fn command_args(&self, staging: &Path, output: &Path) -> Vec<String> {
        vec![
            "-J".to_string(),
            "-R".to_string(),
            "-V".to_string(),
            self.volume_id.clone(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            staging.to_string_lossy().into_owned(),
        ]
    }

    async fn author(&self, staging: &Path, output: &Path) -> Result<()> {
        let result = Command::new(&self.tool)
            .args(self.command_args(staging, output))
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.tool))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            anyhow::bail!("{} exited with {}: {}", self.tool, result.status, stderr.trim());
        }
        Ok(())
    }
}

/// Staging directory for an output file: `<output>.d`
fn staging_dir(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".d");
    PathBuf::from(name)
}

/// Write the layout as a directory tree under `root`
pub(super) async fn stage(layout: &Layout, root: &Path) -> Result<()> {
    for dir in &layout.dirs {
        tokio::fs::create_dir_all(root.join(dir))
            .await
            .with_context(|| format!("Failed to create {}", dir))?;
    }
    for (path, content) in &layout.files {
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;
    }
    Ok(())
}

#[async_trait]
impl ArchiveStrategy for IsoStrategy {
    async fn package(&self, layout: &Layout, output: &Path) -> Result<()> {
        let staging = staging_dir(output);
        let result = match stage(layout, &staging).await {
            Ok(()) => self.author(&staging, output).await,
            Err(e) => Err(e),
        };

        if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
            tracing::warn!("Could not remove staging dir {}: {}", staging.display(), e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{payload_file, RenderedPayload};

    fn layout() -> Layout {
        let mut payload = RenderedPayload::new();
        payload.insert(payload_file::INIT_CFG.into(), "hostname=fw1".into());
        payload.insert("openstack/heat-template.yaml".into(), "heat".into());
        Layout::from_payload(&payload).unwrap()
    }

    #[test]
    fn test_command_args() {
        let iso = IsoStrategy::new("mkisofs", "bootstrap");
        let args = iso.command_args(Path::new("/tmp/fw1.iso.d"), Path::new("/tmp/fw1.iso"));
        assert_eq!(args, vec!["-J", "-R", "-V", "bootstrap", "-o", "/tmp/fw1.iso", "/tmp/fw1.iso.d"]);
    }

    #[test]
    fn test_staging_dir() {
        assert_eq!(staging_dir(Path::new("/out/fw1-abc.iso")), PathBuf::from("/out/fw1-abc.iso.d"));
    }

    #[tokio::test]
    async fn test_stage_writes_boot_loader_layout() {
        let dir = tempfile::tempdir().unwrap();
        stage(&layout(), dir.path()).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("config/init-cfg.txt")).unwrap(),
            "hostname=fw1"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("openstack/heat-template.yaml")).unwrap(),
            "heat"
        );
        for sub in ["content", "license", "software"] {
            assert!(dir.path().join(sub).is_dir());
        }
    }

    #[tokio::test]
    async fn test_missing_tool_fails_and_cleans_staging() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("fw1.iso");
        let iso = IsoStrategy::new("bootstrapper-no-such-iso-tool", "bootstrap");

        let err = iso.package(&layout(), &output).await.unwrap_err();
        assert!(format!("{:#}", err).contains("bootstrapper-no-such-iso-tool"));
        assert!(!staging_dir(&output).exists());
        assert!(!output.exists());
    }

    fn installed_tool() -> Option<&'static str> {
        ["genisoimage", "mkisofs", "xorrisofs"]
            .into_iter()
            .find(|tool| std::process::Command::new(tool).arg("-version").output().is_ok())
    }

    fn contains(image: &[u8], needle: &[u8]) -> bool {
        image.windows(needle.len()).any(|w| w == needle)
    }

    #[tokio::test]
    async fn test_image_contains_every_entry() {
        let Some(tool) = installed_tool() else {
            eprintln!("skipping: no mkisofs-compatible tool on PATH");
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("fw1.iso");

        IsoStrategy::new(tool, "bootstrap").package(&layout(), &output).await.unwrap();
        assert!(!staging_dir(&output).exists());

        // File data is stored uncompressed; Rock Ridge keeps the original names
        let image = std::fs::read(&output).unwrap();
        assert!(contains(&image, b"bootstrap"));
        for needle in [&b"init-cfg.txt"[..], b"heat-template.yaml", b"hostname=fw1", b"heat"] {
            assert!(contains(&image, needle), "{}", String::from_utf8_lossy(needle));
        }

        let Some(listing) = std::process::Command::new("isoinfo")
            .args(["-f", "-R", "-i"])
            .arg(&output)
            .output()
            .ok()
            .filter(|out| out.status.success())
        else {
            return;
        };
        let listing = String::from_utf8_lossy(&listing.stdout);
        for path in [
            "/config/init-cfg.txt",
            "/openstack/heat-template.yaml",
            "/content",
            "/license",
            "/software",
        ] {
            assert!(listing.lines().any(|l| l == path), "{} missing from {}", path, listing);
        }
    }
}
