use std::env;

use crate::render::TemplateDefaults;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite catalog path. Empty selects the in-memory catalog.
    pub db_path: String,
    pub db_max_connections: u32,
    pub listen_addr: String,
    pub templates_dir: String,
    pub archive_dir: String,
    pub iso_tool: String,
    pub iso_volume_id: String,
    pub default_init_cfg_template: Option<String>,
    pub default_bootstrap_template: Option<String>,
    pub keep_archives: bool,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            db_path: get_env("DB_PATH", "/data/bootstrapper.db"),
            db_max_connections: get_env("DB_MAX_CONNECTIONS", "5")
                .parse()
                .unwrap_or(5),
            listen_addr: get_env("LISTEN_ADDR", "0.0.0.0:5000"),
            templates_dir: get_env("TEMPLATES_DIR", "/app/templates"),
            archive_dir: get_env("ARCHIVE_DIR", "/tmp/bootstrapper"),
            iso_tool: get_env("ISO_TOOL", "genisoimage"),
            iso_volume_id: get_env("ISO_VOLUME_ID", "bootstrap"),
            default_init_cfg_template: get_optional_env("DEFAULT_INIT_CFG_TEMPLATE", Some("Default")),
            default_bootstrap_template: get_optional_env("DEFAULT_BOOTSTRAP_TEMPLATE", None),
            keep_archives: parse_bool(&get_env("KEEP_ARCHIVES", "false")),
        }
    }

    /// Template names used when a request does not pick its own
    pub fn template_defaults(&self) -> TemplateDefaults {
        TemplateDefaults {
            init_cfg: self.default_init_cfg_template.clone(),
            bootstrap: self.default_bootstrap_template.clone(),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// An explicitly empty variable disables the default.
fn get_optional_env(key: &str, default: Option<&str>) -> Option<String> {
    match env::var(key) {
        Ok(value) => Some(value).filter(|v| !v.trim().is_empty()),
        Err(_) => default.map(str::to_string),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
