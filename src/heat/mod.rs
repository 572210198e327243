//! OpenStack heat content for `openstack` deployments.
//!
//! The generated stack boots the appliance with a config drive and three
//! ports (management, outside, inside). Files land under `openstack/` in the
//! package so they never collide with the base config files.

use std::collections::btree_map::Entry;
use tera::{Context, Tera};

use crate::error::BootstrapError;
use crate::models::*;

pub const TEMPLATE_FILE: &str = "openstack/heat-template.yaml";
pub const ENVIRONMENT_FILE: &str = "openstack/heat-env.yaml";

/// Variables an openstack deployment cannot be generated without
pub const REQUIRED_VARIABLES: [&str; 5] = [
    "image",
    "flavor",
    "mgmt_network",
    "outside_network",
    "inside_network",
];

const HEAT_TEMPLATE: &str = r#"heat_template_version: 2016-04-08

description: Bootstrapped firewall {{ hostname }}

parameters:
  image:
    type: string
    description: Glance image for the firewall
  flavor:
    type: string
    description: Nova flavor for the firewall
  mgmt_network:
    type: string
    description: Management network
  outside_network:
    type: string
    description: Untrusted network
  inside_network:
    type: string
    description: Trusted network
{% if floating_network %}  floating_network:
    type: string
    description: External network for the management floating IP
{% endif %}
resources:
  mgmt_port:
    type: OS::Neutron::Port
    properties:
      network: { get_param: mgmt_network }

  outside_port:
    type: OS::Neutron::Port
    properties:
      network: { get_param: outside_network }
      port_security_enabled: false

  inside_port:
    type: OS::Neutron::Port
    properties:
      network: { get_param: inside_network }
      port_security_enabled: false
{% if floating_network %}
  mgmt_floating_ip:
    type: OS::Neutron::FloatingIP
    properties:
      floating_network: { get_param: floating_network }
      port_id: { get_resource: mgmt_port }
{% endif %}
  firewall:
    type: OS::Nova::Server
    properties:
      name: {{ hostname | json_encode() }}
      image: { get_param: image }
      flavor: { get_param: flavor }
      config_drive: true
      user_data_format: RAW
      networks:
        - port: { get_resource: mgmt_port }
        - port: { get_resource: outside_port }
        - port: { get_resource: inside_port }

outputs:
  mgmt_ip:
    description: Management address of the firewall
    value: { get_attr: [mgmt_port, fixed_ips, 0, ip_address] }
"#;

const HEAT_ENVIRONMENT: &str = r#"parameters:
  image: {{ image | json_encode() }}
  flavor: {{ flavor | json_encode() }}
  mgmt_network: {{ mgmt_network | json_encode() }}
  outside_network: {{ outside_network | json_encode() }}
  inside_network: {{ inside_network | json_encode() }}
{% if floating_network %}  floating_network: {{ floating_network | json_encode() }}
{% endif %}"#;

/// Add deployment-specific files to a rendered payload.
///
/// Non-openstack requests pass through unchanged. Required variables are
/// checked before anything is generated; keys already in `payload` win.
pub fn augment(payload: RenderedPayload, request: &RenderRequest) -> Result<RenderedPayload, BootstrapError> {
    if !request.deployment_type.requires_augmentation() {
        return Ok(payload);
    }

    let missing = missing_variables(request);
    if !missing.is_empty() {
        return Err(BootstrapError::required(format!(
            "{} deployment requires: {}",
            request.deployment_type,
            missing.join(", ")
        )));
    }

    tracing::debug!("Generating heat templates for {}", request.hostname);
    Ok(merge(payload, generate(request)?))
}

fn missing_variables(request: &RenderRequest) -> Vec<&'static str> {
    REQUIRED_VARIABLES
        .iter()
        .copied()
        .filter(|key| {
            request
                .variables
                .get(*key)
                .map_or(true, |value| value.trim().is_empty())
        })
        .collect()
}

fn generate(request: &RenderRequest) -> Result<RenderedPayload, BootstrapError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (TEMPLATE_FILE, HEAT_TEMPLATE),
        (ENVIRONMENT_FILE, HEAT_ENVIRONMENT),
    ])
    .map_err(|e| BootstrapError::Render(e.to_string()))?;

    let lookup = |key: &str| request.variables.get(key).cloned().unwrap_or_default();
    let mut context = Context::new();
    context.insert("hostname", &request.hostname);
    for key in REQUIRED_VARIABLES {
        context.insert(key, &lookup(key));
    }
    context.insert("floating_network", &lookup("floating_network"));

    let mut generated = RenderedPayload::new();
    for name in [TEMPLATE_FILE, ENVIRONMENT_FILE] {
        let rendered = tera
            .render(name, &context)
            .map_err(|e| BootstrapError::Render(format!("{}: {}", name, e)))?;
        generated.insert(name.to_string(), rendered);
    }
    Ok(generated)
}

/// Insert-if-absent merge of generated content into a base payload
pub fn merge(mut base: RenderedPayload, extra: RenderedPayload) -> RenderedPayload {
    for (name, content) in extra {
        match base.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(content);
            }
            Entry::Occupied(existing) => {
                tracing::warn!("Keeping rendered {} over generated content", existing.key());
            }
        }
    }
    base
}
