// file: src/config/mod.rs
// version: 1.0.1
// guid: b4bfb1a2-b771-4d00-83f4-3918160c90c0

//! Configuration module for Pi Prepper
//!
//! Holds the settings read from the `.env` file and the Wi-Fi credentials
//! parsed out of them.

pub mod loader;

pub use loader::ConfigLoader;

/// Settings keys read from the environment file
pub const TAILNET_NAME: &str = "TAILNET_NAME";
pub const OAUTH_CLIENT_ID: &str = "OAUTH_CLIENT_ID";
pub const OAUTH_CLIENT_SECRET: &str = "OAUTH_CLIENT_SECRET";
pub const PI_USER: &str = "PI_USER";
pub const PI_PASSWORD: &str = "PI_PASSWORD";
pub const WIFI_NETWORKS: &str = "WIFI_NETWORKS";

/// Run configuration. Loaded once at startup and never mutated.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Tailnet the new device joins
    pub tailnet_name: String,
    /// OAuth client id for the control-plane API
    pub oauth_client_id: String,
    /// OAuth client secret for the control-plane API
    pub oauth_client_secret: String,
    /// Local account created on the Pi
    pub pi_user: String,
    /// Password for the local account
    pub pi_password: String,
    /// Raw `name,key` entries in the order they were configured
    pub wifi_networks: Vec<String>,
}

// Secrets stay out of debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("tailnet_name", &self.tailnet_name)
            .field("oauth_client_id", &self.oauth_client_id)
            .field("oauth_client_secret", &"<redacted>")
            .field("pi_user", &self.pi_user)
            .field("pi_password", &"<redacted>")
            .field("wifi_networks", &self.wifi_networks.len())
            .finish()
    }
}

impl Config {
    /// Build a configuration from any key lookup. Absent keys become empty strings.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();

        Self {
            tailnet_name: get(TAILNET_NAME),
            oauth_client_id: get(OAUTH_CLIENT_ID),
            oauth_client_secret: get(OAUTH_CLIENT_SECRET),
            pi_user: get(PI_USER),
            pi_password: get(PI_PASSWORD),
            wifi_networks: split_wifi_entries(&get(WIFI_NETWORKS)),
        }
    }

    /// Parse the configured Wi-Fi entries into credentials, preserving order
    pub fn wifi_credentials(&self) -> crate::Result<Vec<WifiNetwork>> {
        self.wifi_networks
            .iter()
            .map(|entry| entry.parse())
            .collect()
    }
}

fn hostname_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
            .expect("valid hostname pattern")
    })
}

/// Check an operator-entered hostname and return it trimmed.
///
/// The name must be a single DNS label: letters, digits and inner hyphens,
/// at most 63 characters.
pub fn validate_hostname(input: &str) -> crate::Result<String> {
    let hostname = input.trim();
    if hostname.is_empty() {
        return Err(crate::error::PrepperError::validation(
            "Hostname cannot be empty",
        ));
    }

    if !hostname_re().is_match(hostname) {
        return Err(crate::error::PrepperError::validation(format!(
            "Invalid hostname '{}': use letters, digits and hyphens (max 63 characters, no leading or trailing hyphen)",
            hostname
        )));
    }

    Ok(hostname.to_string())
}

/// Split the space separated `WIFI_NETWORKS` value, dropping empty segments
pub fn split_wifi_entries(value: &str) -> Vec<String> {
    value
        .split(' ')
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// One Wi-Fi network the Pi should know about
#[derive(Clone, PartialEq, Eq)]
pub struct WifiNetwork {
    pub ssid: String,
    pub psk: String,
}

impl WifiNetwork {
    pub fn new(ssid: impl Into<String>, psk: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            psk: psk.into(),
        }
    }
}

impl std::fmt::Debug for WifiNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiNetwork")
            .field("ssid", &self.ssid)
            .field("psk", &"<redacted>")
            .finish()
    }
}

impl std::str::FromStr for WifiNetwork {
    type Err = crate::error::PrepperError;

    /// Entries are `name,key`; only the first comma separates, the key may contain more.
    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        match entry.split_once(',') {
            Some((ssid, psk)) => Ok(Self::new(ssid, psk)),
            None => Err(crate::error::PrepperError::validation(format!(
                "Wi-Fi entry '{}' is not in name,key form",
                entry
            ))),
        }
    }
}
