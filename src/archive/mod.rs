mod iso;
mod zipfile;

pub use iso::IsoStrategy;
pub use zipfile::ZipStrategy;

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::BootstrapError;
use crate::models::*;

/// Directories the boot loader looks for at the root of a bootstrap volume
pub const BOOTSTRAP_DIRS: [&str; 4] = ["config", "content", "license", "software"];

/// Files and directories to write into an archive, with relative paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub dirs: BTreeSet<String>,
    pub files: Vec<(String, String)>,
}

impl Layout {
    /// Place payload entries at their conventional paths.
    ///
    /// Plain file names go under `config/`; names with a directory component
    /// keep their relative path.
    pub fn from_payload(payload: &RenderedPayload) -> Result<Self, BootstrapError> {
        let mut layout = Layout {
            dirs: BOOTSTRAP_DIRS.iter().map(|d| d.to_string()).collect(),
            files: Vec::with_capacity(payload.len()),
        };

        for (name, content) in payload {
            let path = archive_path(name)?;
            let mut parent = Path::new(&path).parent();
            while let Some(dir) = parent.filter(|p| !p.as_os_str().is_empty()) {
                layout.dirs.insert(dir.to_string_lossy().into_owned());
                parent = dir.parent();
            }
            layout.files.push((path, content.clone()));
        }
        Ok(layout)
    }
}

/// Relative archive path of a payload entry
pub fn archive_path(name: &str) -> Result<String, BootstrapError> {
    let unsafe_name = name.is_empty()
        || name.starts_with('/')
        || name.ends_with('/')
        || name.contains('\\')
        || name.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if unsafe_name {
        return Err(BootstrapError::ArchiveBuild(format!("invalid payload file name: {:?}", name)));
    }

    if name.contains('/') {
        Ok(name.to_string())
    } else {
        Ok(format!("config/{}", name))
    }
}

/// Turns a layout into one archive file at `output`.
#[async_trait]
pub trait ArchiveStrategy: Send + Sync {
    async fn package(&self, layout: &Layout, output: &Path) -> anyhow::Result<()>;
}

/// A packaged archive on disk. The caller owns the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    pub archive_type: ArchiveType,
}

impl Archive {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Packages rendered payloads into uniquely named ISO or ZIP files
pub struct ArchiveBuilder {
    output_dir: PathBuf,
    iso: Arc<dyn ArchiveStrategy>,
    zip: Arc<dyn ArchiveStrategy>,
}

impl ArchiveBuilder {
    pub fn new(output_dir: impl Into<PathBuf>, iso: IsoStrategy) -> Self {
        Self::with_strategies(output_dir, Arc::new(iso), Arc::new(ZipStrategy))
    }

    pub fn with_strategies(
        output_dir: impl Into<PathBuf>,
        iso: Arc<dyn ArchiveStrategy>,
        zip: Arc<dyn ArchiveStrategy>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            iso,
            zip,
        }
    }

    fn strategy(&self, archive_type: ArchiveType) -> &dyn ArchiveStrategy {
        match archive_type {
            ArchiveType::Iso => self.iso.as_ref(),
            ArchiveType::Zip => self.zip.as_ref(),
        }
    }

    /// `<output_dir>/<hostname>-<uuid>.<ext>`
    fn output_path(&self, hostname: &str, archive_type: ArchiveType) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}.{}",
            hostname,
            uuid::Uuid::new_v4(),
            archive_type.extension()
        ))
    }

    pub async fn build(
        &self,
        payload: &RenderedPayload,
        hostname: &str,
        archive_type: ArchiveType,
    ) -> Result<Archive, BootstrapError> {
        if !crate::utils::is_valid_hostname(hostname) {
            return Err(BootstrapError::required(format!("invalid hostname: {:?}", hostname)));
        }
        let layout = Layout::from_payload(payload)?;

        tokio::fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            BootstrapError::ArchiveBuild(format!("cannot create {}: {}", self.output_dir.display(), e))
        })?;

        let output = self.output_path(hostname, archive_type);
        tracing::debug!("Packaging {} files into {}", layout.files.len(), output.display());

        if let Err(e) = self.strategy(archive_type).package(&layout, &output).await {
            tracing::error!("Failed to build {} for {}: {:#}", archive_type, hostname, e);
            if let Err(rm) = tokio::fs::remove_file(&output).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Could not remove partial archive {}: {}", output.display(), rm);
                }
            }
            return Err(BootstrapError::ArchiveBuild(format!("{:#}", e)));
        }

        Ok(Archive {
            path: output,
            archive_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tokio::sync::Mutex;

    /// Records the layout it was asked to package and writes a marker file
    #[derive(Default)]
    struct RecordingStrategy {
        seen: Mutex<Vec<Layout>>,
    }

    #[async_trait]
    impl ArchiveStrategy for RecordingStrategy {
        async fn package(&self, layout: &Layout, output: &Path) -> anyhow::Result<()> {
            self.seen.lock().await.push(layout.clone());
            tokio::fs::write(output, b"image").await?;
            Ok(())
        }
    }

    struct FailingStrategy;

    #[async_trait]
    impl ArchiveStrategy for FailingStrategy {
        async fn package(&self, _layout: &Layout, output: &Path) -> anyhow::Result<()> {
            tokio::fs::write(output, b"half").await?;
            anyhow::bail!("authoring tool crashed")
        }
    }

    fn payload() -> RenderedPayload {
        let mut payload = RenderedPayload::new();
        payload.insert(payload_file::INIT_CFG.into(), "hostname=fw1".into());
        payload.insert(payload_file::BOOTSTRAP.into(), "<config/>".into());
        payload.insert("openstack/heat-env.yaml".into(), "parameters: {}".into());
        payload
    }

    #[test]
    fn test_archive_path() {
        assert_eq!(archive_path("init-cfg.txt").unwrap(), "config/init-cfg.txt");
        assert_eq!(archive_path("openstack/heat.yaml").unwrap(), "openstack/heat.yaml");
        for bad in ["", "/etc/passwd", "../x", "a/../../b", "a//b", "dir/", "a\\b", "./x"] {
            assert!(archive_path(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_layout_from_payload() {
        let layout = Layout::from_payload(&payload()).unwrap();
        let dirs: Vec<&str> = layout.dirs.iter().map(String::as_str).collect();
        assert_eq!(dirs, vec!["config", "content", "license", "openstack", "software"]);
        let paths: Vec<&str> = layout.files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec!["config/bootstrap.xml", "config/init-cfg.txt", "openstack/heat-env.yaml"]
        );
    }

    #[test]
    fn test_layout_includes_nested_parents() {
        let mut payload = RenderedPayload::new();
        payload.insert("openstack/latest/user_data".into(), "x".into());
        let layout = Layout::from_payload(&payload).unwrap();
        assert!(layout.dirs.contains("openstack"));
        assert!(layout.dirs.contains("openstack/latest"));
    }

    #[tokio::test]
    async fn test_build_selects_strategy_and_unique_paths() {
        let dir = tempfile::tempdir().unwrap();
        let iso = Arc::new(RecordingStrategy::default());
        let builder = ArchiveBuilder::with_strategies(dir.path(), iso.clone(), Arc::new(ZipStrategy));

        let first = builder.build(&payload(), "fw1", ArchiveType::Iso).await.unwrap();
        let second = builder.build(&payload(), "fw1", ArchiveType::Iso).await.unwrap();
        assert_ne!(first.path, second.path);
        assert!(first.file_name().starts_with("fw1-"));
        assert!(first.file_name().ends_with(".iso"));
        assert_eq!(iso.seen.lock().await.len(), 2);
        assert_eq!(iso.seen.lock().await[0], Layout::from_payload(&payload()).unwrap());

        let zip = builder.build(&payload(), "fw1", ArchiveType::Zip).await.unwrap();
        assert_eq!(zip.archive_type, ArchiveType::Zip);
        assert!(zip.file_name().ends_with(".zip"));
        assert_eq!(iso.seen.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_zip_contains_every_payload_entry() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ArchiveBuilder::with_strategies(
            dir.path(),
            Arc::new(RecordingStrategy::default()),
            Arc::new(ZipStrategy),
        );

        let archive = builder.build(&payload(), "fw1", ArchiveType::Zip).await.unwrap();
        let file = std::fs::File::open(&archive.path).unwrap();
        let mut zip = ::zip::ZipArchive::new(file).unwrap();

        for (path, expected) in [
            ("config/init-cfg.txt", "hostname=fw1"),
            ("config/bootstrap.xml", "<config/>"),
            ("openstack/heat-env.yaml", "parameters: {}"),
        ] {
            let mut contents = String::new();
            zip.by_name(path).unwrap().read_to_string(&mut contents).unwrap();
            assert_eq!(contents, expected);
        }
        for dir in BOOTSTRAP_DIRS {
            assert!(zip.by_name(&format!("{}/", dir)).unwrap().is_dir());
        }
    }

    #[tokio::test]
    async fn test_failed_build_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ArchiveBuilder::with_strategies(
            dir.path(),
            Arc::new(FailingStrategy),
            Arc::new(ZipStrategy),
        );

        let err = builder.build(&payload(), "fw1", ArchiveType::Iso).await.unwrap_err();
        assert!(matches!(err, BootstrapError::ArchiveBuild(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_build_rejects_unsafe_hostname() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ArchiveBuilder::new(dir.path(), IsoStrategy::default());
        let err = builder.build(&payload(), "../fw1", ArchiveType::Zip).await.unwrap_err();
        assert!(matches!(err, BootstrapError::RequiredParameters(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
