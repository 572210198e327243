use std::collections::BTreeSet;
use std::sync::Arc;

use crate::archive::{Archive, ArchiveBuilder};
use crate::catalog::TemplateCatalog;
use crate::error::BootstrapError;
use crate::heat;
use crate::models::*;
use crate::render::{Renderer, TemplateDefaults};

/// Runs a request through render, optional augmentation and packaging.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct BootstrapService {
    renderer: Renderer,
    archives: ArchiveBuilder,
}

impl BootstrapService {
    pub fn new(catalog: Arc<dyn TemplateCatalog>, defaults: TemplateDefaults, archives: ArchiveBuilder) -> Self {
        Self {
            renderer: Renderer::new(catalog, defaults),
            archives,
        }
    }

    pub fn catalog(&self) -> &Arc<dyn TemplateCatalog> {
        self.renderer.catalog()
    }

    /// Variables the request's templates reference
    pub async fn required_variables(&self, request: &RenderRequest) -> Result<BTreeSet<String>, BootstrapError> {
        self.renderer.extract_variables(request).await
    }

    /// Render and augment without packaging
    pub async fn payload(&self, request: &RenderRequest) -> Result<RenderedPayload, BootstrapError> {
        let payload = self.renderer.render(request).await?;
        tracing::debug!("Rendered {} payload files for {}", payload.len(), request.hostname);

        if request.deployment_type.requires_augmentation() {
            tracing::debug!("Augmenting {} payload for {}", request.deployment_type, request.hostname);
        }
        heat::augment(payload, request)
    }

    /// Build the archive for a request. Any failure ends the request; nothing
    /// is retried and no archive exists unless this returns Ok.
    pub async fn generate(&self, request: &RenderRequest) -> Result<Archive, BootstrapError> {
        tracing::debug!(
            "Generating {} package for {} ({})",
            request.archive_type,
            request.hostname,
            request.deployment_type
        );

        let result = match self.payload(request).await {
            Ok(payload) => {
                self.archives
                    .build(&payload, &request.hostname, request.archive_type)
                    .await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(archive) => tracing::info!("Built {} for {}", archive.path.display(), request.hostname),
            Err(e) => tracing::warn!("Package for {:?} failed: {}", request.hostname, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::IsoStrategy;
    use crate::catalog::MemoryCatalog;
    use std::io::Read;
    use std::path::Path;

    async fn service(archive_dir: &Path) -> BootstrapService {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog
            .import("hostname={{hostname}}\nip={{ip-address}}", "fw", "", TemplateType::Bootstrap)
            .await;
        catalog
            .import("hostname={{ hostname }}\ntype={{ mgmt_type }}", "Default", "", TemplateType::InitCfg)
            .await;
        let defaults = TemplateDefaults {
            init_cfg: Some("Default".into()),
            bootstrap: None,
        };
        let archives = ArchiveBuilder::new(archive_dir, IsoStrategy::new("bootstrapper-no-such-iso-tool", "bootstrap"));
        BootstrapService::new(catalog, defaults, archives)
    }

    fn zip_entry(path: &Path, name: &str) -> String {
        let mut zip = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
        let mut contents = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut contents).unwrap();
        contents
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_kvm_zip_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let request = RenderRequest::from_json(&serde_json::json!({
            "hostname": "fw-01",
            "deployment_type": "kvm",
            "archive_type": "zip",
            "bootstrap_template": "fw",
            "variables": {"hostname": "fw-01", "ip-address": "10.0.0.5"}
        }))
        .unwrap();

        let archive = service.generate(&request).await.unwrap();
        assert_eq!(archive.archive_type, ArchiveType::Zip);
        assert_eq!(zip_entry(&archive.path, "config/bootstrap.xml"), "hostname=fw-01\nip=10.0.0.5");
        assert_eq!(zip_entry(&archive.path, "config/init-cfg.txt"), "hostname=fw-01\ntype=");
    }

    #[tokio::test]
    async fn test_missing_hostname_builds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let request = RenderRequest::from_json(&serde_json::json!({"archive_type": "zip"})).unwrap();
        let err = service.generate(&request).await.unwrap_err();
        assert!(matches!(err, BootstrapError::RequiredParameters(_)));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_openstack_without_network_builds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let request = RenderRequest::from_json(&serde_json::json!({
            "hostname": "fw-os",
            "deployment_type": "openstack",
            "archive_type": "zip",
            "image": "pa-vm",
            "flavor": "m1.large",
            "outside_network": "public",
            "inside_network": "private"
        }))
        .unwrap();

        let err = service.generate(&request).await.unwrap_err();
        match err {
            BootstrapError::RequiredParameters(msg) => assert!(msg.contains("mgmt_network")),
            other => panic!("expected RequiredParameters, got {:?}", other),
        }
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_openstack_zip_contains_heat_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let request = RenderRequest::from_json(&serde_json::json!({
            "hostname": "fw-os",
            "deployment_type": "openstack",
            "archive_type": "zip",
            "image": "pa-vm",
            "flavor": "m1.large",
            "mgmt_network": "mgmt",
            "outside_network": "public",
            "inside_network": "private"
        }))
        .unwrap();

        let archive = service.generate(&request).await.unwrap();
        assert!(zip_entry(&archive.path, heat::TEMPLATE_FILE).contains("OS::Nova::Server"));
        assert!(zip_entry(&archive.path, heat::ENVIRONMENT_FILE).contains(r#"mgmt_network: "mgmt""#));
        assert_eq!(zip_entry(&archive.path, "config/init-cfg.txt"), "hostname=fw-os\ntype=");
    }

    #[tokio::test]
    async fn test_iso_failure_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let request = RenderRequest::new("fw1");
        let err = service.generate(&request).await.unwrap_err();
        assert!(matches!(err, BootstrapError::ArchiveBuild(_)));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_payload_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path()).await;

        let mut request = RenderRequest::new("fw1").with_variable("ip-address", "10.1.1.1");
        request.bootstrap_template = Some("fw".into());
        assert_eq!(service.payload(&request).await.unwrap(), service.payload(&request).await.unwrap());
    }
}
