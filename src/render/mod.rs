use regex_lite::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use crate::catalog::TemplateCatalog;
use crate::error::BootstrapError;
use crate::models::*;

/// `{{ name }}` with optional inner whitespace. Names are letters, digits,
/// `_`, `-` and `.`.
fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Names referenced by placeholders in `source`
pub fn placeholders(source: &str) -> BTreeSet<String> {
    placeholder_re()
        .captures_iter(source)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replace every placeholder with its bound value. Unbound names become
/// the empty string. Substituted values are not scanned again.
pub fn substitute(source: &str, variables: &VariableSet) -> String {
    placeholder_re()
        .replace_all(source, |caps: &Captures<'_>| {
            variables.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

/// Template names used when a request does not pick its own
#[derive(Debug, Clone, Default)]
pub struct TemplateDefaults {
    pub init_cfg: Option<String>,
    pub bootstrap: Option<String>,
}

/// A template chosen for a request, and the payload file it renders into
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selected {
    kind: TemplateType,
    name: String,
    output: &'static str,
    caller_supplied: bool,
}

/// Renders the init-cfg and bootstrap templates selected by a request
pub struct Renderer {
    catalog: Arc<dyn TemplateCatalog>,
    defaults: TemplateDefaults,
}

impl Renderer {
    pub fn new(catalog: Arc<dyn TemplateCatalog>, defaults: TemplateDefaults) -> Self {
        Self { catalog, defaults }
    }

    pub fn catalog(&self) -> &Arc<dyn TemplateCatalog> {
        &self.catalog
    }

    fn select(&self, request: &RenderRequest) -> Result<Vec<Selected>, BootstrapError> {
        let mut selected = Vec::new();
        let choices = [
            (
                TemplateType::InitCfg,
                payload_file::INIT_CFG,
                &request.init_cfg_template,
                &self.defaults.init_cfg,
            ),
            (
                TemplateType::Bootstrap,
                payload_file::BOOTSTRAP,
                &request.bootstrap_template,
                &self.defaults.bootstrap,
            ),
        ];

        for (kind, output, requested, default) in choices {
            let (name, caller_supplied) = match (requested, default) {
                (Some(name), _) => (name.clone(), true),
                (None, Some(name)) => (name.clone(), false),
                (None, None) => continue,
            };
            selected.push(Selected {
                kind,
                name,
                output,
                caller_supplied,
            });
        }

        if selected.is_empty() {
            return Err(BootstrapError::required(
                "no init_cfg_template or bootstrap_template selected and no defaults configured",
            ));
        }
        Ok(selected)
    }

    async fn load(&self, selected: &Selected) -> Result<String, BootstrapError> {
        tracing::debug!("Resolving {} template {}", selected.kind, selected.name);
        self.catalog
            .resolve(&selected.name, selected.kind)
            .await
            .map_err(|e| e.supplied_by_caller(selected.caller_supplied))
    }

    /// Variables referenced by the templates this request selects. Nothing is
    /// substituted and the request does not need a hostname.
    pub async fn extract_variables(&self, request: &RenderRequest) -> Result<BTreeSet<String>, BootstrapError> {
        let mut variables = BTreeSet::new();
        for selected in self.select(request)? {
            let source = self.load(&selected).await?;
            variables.extend(placeholders(&source));
        }
        Ok(variables)
    }

    /// Render the selected templates into payload entries.
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderedPayload, BootstrapError> {
        request.validate()?;

        let mut payload = RenderedPayload::new();
        for selected in self.select(request)? {
            let source = self.load(&selected).await?;
            let unbound: Vec<String> = placeholders(&source)
                .into_iter()
                .filter(|name| !request.variables.contains_key(name))
                .collect();
            if !unbound.is_empty() {
                tracing::debug!(
                    "{} template {} has unbound variables: {}",
                    selected.kind,
                    selected.name,
                    unbound.join(", ")
                );
            }
            payload.insert(selected.output.to_string(), substitute(&source, &request.variables));
        }
        Ok(payload)
    }
}

/// Request skeleton returned by variable discovery: the request's template
/// choices plus every discovered variable, blank or self-referencing.
pub fn discovery_payload(
    request: &RenderRequest,
    variables: &BTreeSet<String>,
    format: DiscoveryFormat,
) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("archive_type".into(), Value::from(ArchiveType::default().as_str()));
    payload.insert("deployment_type".into(), Value::from(DeploymentType::default().as_str()));
    if let Some(name) = &request.bootstrap_template {
        payload.insert("bootstrap_template".into(), Value::from(name.as_str()));
    }
    if let Some(name) = &request.init_cfg_template {
        payload.insert("init_cfg_template".into(), Value::from(name.as_str()));
    }

    for name in variables {
        let value = match format {
            DiscoveryFormat::Blank => String::new(),
            DiscoveryFormat::Aframe => format!("{{{{ {} }}}}", name),
        };
        payload.insert(name.clone(), Value::from(value));
    }
    payload
}
