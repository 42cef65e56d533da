// file: src/provision/template.rs
// version: 1.0.1
// guid: 70e80f6e-242e-43cb-bdc1-76842e215eeb

//! First-boot script template rendering
//!
//! Placeholders are `{{NAME}}`. The Wi-Fi list is a repeated section:
//!
//! ```text
//! {{#WIFI_NETWORKS}}
//! add_network "{{SSID}}" "{{PSK}}"
//! {{/WIFI_NETWORKS}}
//! ```
//!
//! Rendering is a single pass over the template, so values are inserted
//! verbatim and never re-scanned for placeholders.

use crate::config::WifiNetwork;
use crate::Result;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub const AUTH_KEY: &str = "AUTH_KEY";
pub const PI_USER: &str = "PI_USER";
pub const PI_PASSWORD: &str = "PI_PASSWORD";
pub const HOSTNAME: &str = "HOSTNAME";
pub const WIFI_SECTION: &str = "WIFI_NETWORKS";
pub const SSID: &str = "SSID";
pub const PSK: &str = "PSK";

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\{\{#WIFI_NETWORKS\}\}\n?(.*?)\{\{/WIFI_NETWORKS\}\}\n?")
            .expect("valid section pattern")
    })
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("valid placeholder pattern"))
}

/// Everything the template can refer to
#[derive(Clone)]
pub struct ScriptValues {
    pub auth_key: String,
    pub pi_user: String,
    pub pi_password: String,
    pub hostname: String,
    pub wifi_networks: Vec<WifiNetwork>,
}

impl ScriptValues {
    fn scalar(&self, name: &str) -> Option<&str> {
        match name {
            AUTH_KEY => Some(&self.auth_key),
            PI_USER => Some(&self.pi_user),
            PI_PASSWORD => Some(&self.pi_password),
            HOSTNAME => Some(&self.hostname),
            _ => None,
        }
    }
}

/// A loaded first-boot script template
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    source: String,
}

impl ScriptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Read a template from disk
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            crate::error::PrepperError::template(format!(
                "Error reading the template file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(source))
    }

    /// Render the script. Unknown or misplaced placeholders are an error.
    pub fn render(&self, values: &ScriptValues) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;

        for caps in section_re().captures_iter(&self.source) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&substitute(&self.source[last..whole.start()], |name| {
                values.scalar(name).map(str::to_string)
            })?);

            let body = &caps[1];
            for network in &values.wifi_networks {
                out.push_str(&substitute(body, |name| match name {
                    SSID => Some(network.ssid.clone()),
                    PSK => Some(network.psk.clone()),
                    other => values.scalar(other).map(str::to_string),
                })?);
            }
            last = whole.end();
        }

        out.push_str(&substitute(&self.source[last..], |name| {
            values.scalar(name).map(str::to_string)
        })?);
        Ok(out)
    }
}

fn substitute<F>(text: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in placeholder_re().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let name = caps[1].trim();
        let value = lookup(name).ok_or_else(|| {
            crate::error::PrepperError::template(format!("Unknown placeholder '{{{{{}}}}}'", name))
        })?;

        out.push_str(&text[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(wifi: Vec<WifiNetwork>) -> ScriptValues {
        ScriptValues {
            auth_key: "tskey-auth-123".to_string(),
            pi_user: "pi".to_string(),
            pi_password: "raspberry".to_string(),
            hostname: "pi-one".to_string(),
            wifi_networks: wifi,
        }
    }

    #[test]
    fn test_render_scalars() {
        let template = ScriptTemplate::new("hostnamectl set-hostname {{HOSTNAME}}\ntailscale up --authkey={{AUTH_KEY}}\n");

        let script = template.render(&values(vec![])).unwrap();

        assert_eq!(
            script,
            "hostnamectl set-hostname pi-one\ntailscale up --authkey=tskey-auth-123\n"
        );
    }

    #[test]
    fn test_render_wifi_section_in_order() {
        let template = ScriptTemplate::new(
            "start\n{{#WIFI_NETWORKS}}\nnet \"{{SSID}}\" \"{{PSK}}\" on {{HOSTNAME}}\n{{/WIFI_NETWORKS}}\nend\n",
        );

        let script = template
            .render(&values(vec![
                WifiNetwork::new("home", "secret1"),
                WifiNetwork::new("office", "secret2"),
            ]))
            .unwrap();

        assert_eq!(
            script,
            "start\nnet \"home\" \"secret1\" on pi-one\nnet \"office\" \"secret2\" on pi-one\nend\n"
        );
    }

    #[test]
    fn test_render_empty_wifi_list_drops_section() {
        let template = ScriptTemplate::new("a\n{{#WIFI_NETWORKS}}\n{{SSID}}\n{{/WIFI_NETWORKS}}\nb\n");
        assert_eq!(template.render(&values(vec![])).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let mut v = values(vec![]);
        v.pi_password = "{{HOSTNAME}}".to_string();
        let template = ScriptTemplate::new("{{PI_PASSWORD}}");

        assert_eq!(template.render(&v).unwrap(), "{{HOSTNAME}}");
    }

    #[test]
    fn test_unknown_placeholder_is_an_error() {
        let template = ScriptTemplate::new("{{NOT_A_FIELD}}");
        let err = template.render(&values(vec![])).unwrap_err();
        assert!(err.to_string().contains("{{NOT_A_FIELD}}"));
    }

    #[test]
    fn test_ssid_outside_section_is_an_error() {
        let template = ScriptTemplate::new("{{SSID}}");
        assert!(template.render(&values(vec![WifiNetwork::new("a", "b")])).is_err());
    }

    #[test]
    fn test_unclosed_section_is_an_error() {
        let template = ScriptTemplate::new("{{#WIFI_NETWORKS}}\n{{SSID}}\n");
        assert!(template.render(&values(vec![])).is_err());
    }

    #[tokio::test]
    async fn test_load_missing_template() {
        let err = ScriptTemplate::load("/nonexistent/firstboot_template.sh")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Error reading the template file"));
    }
}
