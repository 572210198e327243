use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of template; together with the name it identifies a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    #[default]
    Bootstrap,
    InitCfg,
    Other,
}

impl TemplateType {
    pub const ALL: [TemplateType; 3] = [Self::Bootstrap, Self::InitCfg, Self::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::InitCfg => "init_cfg",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bootstrap" => Ok(Self::Bootstrap),
            "init_cfg" => Ok(Self::InitCfg),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown template type: {}", s)),
        }
    }
}

/// Template represents a stored configuration template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TemplateType,
    pub description: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry, without the template body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub name: String,
    pub description: String,
}

/// NewTemplate is the input to a catalog import
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub kind: TemplateType,
    pub description: String,
    pub source: String,
}

/// ImportTemplateRequest for adding or replacing a template
#[derive(Debug, Clone, Deserialize)]
pub struct ImportTemplateRequest {
    pub name: String,
    /// Template body, optionally URL-encoded
    pub template: String,
    #[serde(default = "default_import_description")]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: TemplateType,
}

fn default_import_description() -> String {
    "Imported Template".to_string()
}

/// TemplateNameRequest selects a template by name (delete / fetch)
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateNameRequest {
    pub template_name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<TemplateType>,
}

/// TemplateListResponse wraps a listing in the status envelope
#[derive(Debug, Clone, Serialize)]
pub struct TemplateListResponse {
    pub success: bool,
    pub templates: Vec<TemplateSummary>,
    pub status_code: u16,
}
