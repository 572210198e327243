use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::BootstrapError;

/// Variable name -> substitution value, supplied per request
pub type VariableSet = HashMap<String, String>;

/// Output file name -> rendered text
pub type RenderedPayload = BTreeMap<String, String>;

/// Canonical payload file names understood by the device boot loader
pub mod payload_file {
    pub const INIT_CFG: &str = "init-cfg.txt";
    pub const BOOTSTRAP: &str = "bootstrap.xml";
}

/// Where the appliance is going to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentType {
    #[default]
    Kvm,
    Vmware,
    Openstack,
}

impl DeploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kvm => "kvm",
            Self::Vmware => "vmware",
            Self::Openstack => "openstack",
        }
    }

    /// Deployments that need orchestration content next to the base config
    pub fn requires_augmentation(&self) -> bool {
        matches!(self, Self::Openstack)
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentType {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kvm" => Ok(Self::Kvm),
            "vmware" => Ok(Self::Vmware),
            "openstack" => Ok(Self::Openstack),
            other => Err(BootstrapError::required(format!(
                "unsupported deployment_type: {}",
                other
            ))),
        }
    }
}

/// Container format of the generated package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveType {
    #[default]
    Iso,
    Zip,
}

impl ArchiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Iso => "iso",
            Self::Zip => "zip",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Iso => "application/iso-image",
            Self::Zip => "application/zip",
        }
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveType {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iso" => Ok(Self::Iso),
            "zip" => Ok(Self::Zip),
            other => Err(BootstrapError::required(format!(
                "unsupported archive_type: {}",
                other
            ))),
        }
    }
}

/// RenderRequest is the validated form of a package or discovery request.
///
/// The wire format is a flat JSON object: every top-level scalar is also a
/// template variable, and an optional nested `variables` object is merged on
/// top of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderRequest {
    pub hostname: String,
    pub deployment_type: DeploymentType,
    pub archive_type: ArchiveType,
    pub bootstrap_template: Option<String>,
    pub init_cfg_template: Option<String>,
    pub variables: VariableSet,
}

impl RenderRequest {
    pub fn new(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        let mut variables = VariableSet::new();
        variables.insert("hostname".to_string(), hostname.clone());
        Self {
            hostname,
            variables,
            ..Default::default()
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Parse a posted JSON body. Hostname presence is checked by
    /// [`RenderRequest::validate`] so discovery requests can omit it.
    pub fn from_json(body: &Value) -> Result<Self, BootstrapError> {
        let object = body
            .as_object()
            .ok_or_else(|| BootstrapError::required("request body must be a JSON object"))?;

        let mut variables = VariableSet::new();
        for (key, value) in object {
            if key == "variables" {
                continue;
            }
            if let Some(text) = scalar_to_string(value) {
                variables.insert(key.clone(), text);
            } else {
                tracing::debug!("Ignoring non-scalar request field {}", key);
            }
        }
        if let Some(nested) = object.get("variables") {
            let nested = nested
                .as_object()
                .ok_or_else(|| BootstrapError::required("variables must be a JSON object"))?;
            merge_variables(&mut variables, nested)?;
        }

        let deployment_type = match string_field(object, "deployment_type")? {
            Some(value) => value.parse()?,
            None => DeploymentType::default(),
        };
        let archive_type = match string_field(object, "archive_type")? {
            Some(value) => value.parse()?,
            None => ArchiveType::default(),
        };

        Ok(Self {
            hostname: string_field(object, "hostname")?.unwrap_or_default(),
            deployment_type,
            archive_type,
            bootstrap_template: string_field(object, "bootstrap_template")?,
            init_cfg_template: string_field(object, "init_cfg_template")?,
            variables,
        })
    }

    /// Check the invariants required before anything is rendered or packaged.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        if self.hostname.trim().is_empty() {
            return Err(BootstrapError::required("hostname is required"));
        }
        if !crate::utils::is_valid_hostname(&self.hostname) {
            return Err(BootstrapError::required(format!(
                "invalid hostname: {}",
                self.hostname
            )));
        }
        Ok(())
    }
}

fn merge_variables(variables: &mut VariableSet, nested: &Map<String, Value>) -> Result<(), BootstrapError> {
    for (key, value) in nested {
        let text = scalar_to_string(value).ok_or_else(|| {
            BootstrapError::required(format!("variable {} must be a string, number or boolean", key))
        })?;
        variables.insert(key.clone(), text);
    }
    Ok(())
}

/// Read an optional string field; empty strings and null count as absent.
fn string_field(object: &Map<String, Value>, key: &str) -> Result<Option<String>, BootstrapError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(BootstrapError::required(format!("{} must be a string", key))),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// How discovered variables are echoed back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryFormat {
    /// Every variable bound to the empty string
    #[default]
    Blank,
    /// Every variable bound to its own placeholder (template authoring)
    Aframe,
}

impl DiscoveryFormat {
    pub fn from_request(body: &Value) -> Self {
        match body.get("format").and_then(Value::as_str) {
            Some("aframe") => Self::Aframe,
            _ => Self::Blank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_defaults() {
        let req = RenderRequest::from_json(&json!({"hostname": "fw1"})).unwrap();
        assert_eq!(req.hostname, "fw1");
        assert_eq!(req.deployment_type, DeploymentType::Kvm);
        assert_eq!(req.archive_type, ArchiveType::Iso);
        assert_eq!(req.bootstrap_template, None);
        assert_eq!(req.init_cfg_template, None);
        assert_eq!(req.variables.get("hostname").map(String::as_str), Some("fw1"));
    }

    #[test]
    fn test_from_json_flat_and_nested_variables() {
        let req = RenderRequest::from_json(&json!({
            "hostname": "fw-01",
            "archive_type": "zip",
            "deployment_type": "OpenStack",
            "ip-address": "10.0.0.5",
            "mtu": 9000,
            "ha": false,
            "dns": null,
            "variables": {"ip-address": "10.0.0.6", "vlan": 12}
        }))
        .unwrap();

        assert_eq!(req.archive_type, ArchiveType::Zip);
        assert_eq!(req.deployment_type, DeploymentType::Openstack);
        assert_eq!(req.variables["ip-address"], "10.0.0.6");
        assert_eq!(req.variables["mtu"], "9000");
        assert_eq!(req.variables["ha"], "false");
        assert_eq!(req.variables["dns"], "");
        assert_eq!(req.variables["vlan"], "12");
        assert!(!req.variables.contains_key("variables"));
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            RenderRequest::from_json(&json!(["fw1"])),
            Err(BootstrapError::RequiredParameters(_))
        ));
        assert!(matches!(
            RenderRequest::from_json(&json!({"hostname": "fw1", "deployment_type": "mainframe"})),
            Err(BootstrapError::RequiredParameters(_))
        ));
        assert!(matches!(
            RenderRequest::from_json(&json!({"hostname": "fw1", "archive_type": "tar"})),
            Err(BootstrapError::RequiredParameters(_))
        ));
        assert!(matches!(
            RenderRequest::from_json(&json!({"hostname": 7})),
            Err(BootstrapError::RequiredParameters(_))
        ));
        assert!(matches!(
            RenderRequest::from_json(&json!({"hostname": "fw1", "variables": {"a": [1]}})),
            Err(BootstrapError::RequiredParameters(_))
        ));
    }

    #[test]
    fn test_empty_template_names_are_absent() {
        let req = RenderRequest::from_json(&json!({
            "hostname": "fw1",
            "bootstrap_template": "",
            "init_cfg_template": null
        }))
        .unwrap();
        assert_eq!(req.bootstrap_template, None);
        assert_eq!(req.init_cfg_template, None);
    }

    #[test]
    fn test_validate_hostname() {
        assert!(RenderRequest::new("fw-01").validate().is_ok());
        assert!(RenderRequest::new("").validate().is_err());
        assert!(RenderRequest::new("   ").validate().is_err());
        assert!(RenderRequest::new("../etc/passwd").validate().is_err());
        assert!(RenderRequest::from_json(&json!({})).unwrap().validate().is_err());
    }

    #[test]
    fn test_discovery_format() {
        assert_eq!(DiscoveryFormat::from_request(&json!({"format": "aframe"})), DiscoveryFormat::Aframe);
        assert_eq!(DiscoveryFormat::from_request(&json!({"format": "other"})), DiscoveryFormat::Blank);
        assert_eq!(DiscoveryFormat::from_request(&json!({})), DiscoveryFormat::Blank);
    }
}
