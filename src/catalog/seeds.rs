use anyhow::Result;

use super::TemplateCatalog;
use crate::models::TemplateType;

pub const DEFAULT_TEMPLATE_NAME: &str = "Default";

/// Built-in init-cfg template, one `key=value` per line as PAN-OS expects
pub const DEFAULT_INIT_CFG: &str = r#"type={{ mgmt_type }}
ip-address={{ ip_address }}
default-gateway={{ default_gateway }}
netmask={{ netmask }}
ipv6-address={{ ipv6_address }}
ipv6-default-gateway={{ ipv6_default_gateway }}
hostname={{ hostname }}
vm-auth-key={{ vm_auth_key }}
panorama-server={{ panorama_server }}
panorama-server-2={{ panorama_server_2 }}
tplname={{ tplname }}
dgname={{ dgname }}
dns-primary={{ dns_primary }}
dns-secondary={{ dns_secondary }}
op-command-modes={{ op_command_modes }}
dhcp-send-hostname=yes
dhcp-send-client-id=yes
dhcp-accept-server-hostname=yes
dhcp-accept-server-domain=yes
"#;

/// Built-in bootstrap.xml skeleton with management settings only
pub const DEFAULT_BOOTSTRAP: &str = r#"<?xml version="1.0"?>
<config version="8.0.0" urldb="paloaltonetworks">
  <devices>
    <entry name="localhost.localdomain">
      <deviceconfig>
        <system>
          <hostname>{{ hostname }}</hostname>
          <ip-address>{{ ip_address }}</ip-address>
          <netmask>{{ netmask }}</netmask>
          <default-gateway>{{ default_gateway }}</default-gateway>
          <dns-setting>
            <servers>
              <primary>{{ dns_primary }}</primary>
              <secondary>{{ dns_secondary }}</secondary>
            </servers>
          </dns-setting>
        </system>
      </deviceconfig>
    </entry>
  </devices>
</config>
"#;

/// (name, type, description, source) of every built-in template
pub fn seed_template_params() -> Vec<(&'static str, TemplateType, &'static str, &'static str)> {
    vec![
        (DEFAULT_TEMPLATE_NAME, TemplateType::InitCfg, "Default init-cfg", DEFAULT_INIT_CFG),
        (DEFAULT_TEMPLATE_NAME, TemplateType::Bootstrap, "Default bootstrap.xml", DEFAULT_BOOTSTRAP),
    ]
}

/// Insert built-in templates that are not present yet, leaving user edits alone.
pub async fn seed_default_templates(catalog: &dyn TemplateCatalog) -> Result<()> {
    for (name, kind, description, source) in seed_template_params() {
        if catalog.get(name, kind).await?.is_some() {
            continue;
        }
        if !catalog.import(source, name, description, kind).await {
            anyhow::bail!("Failed to seed {} template {}", kind, name);
        }
    }
    Ok(())
}
