// Endpoint resolution: default host, region hosts and the starting version
// header. Region codes come from login redirect payloads.

use crate::error::{LluError, LluResult};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.libreview.io";
pub const DEFAULT_VERSION: &str = "4.16.0";
pub const DEFAULT_PRODUCT: &str = "llu.android";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const KNOWN_REGIONS: &[(&str, &str)] = &[
    ("ae", "https://api-ae.libreview.io"),
    ("ap", "https://api-ap.libreview.io"),
    ("au", "https://api-au.libreview.io"),
    ("ca", "https://api-ca.libreview.io"),
    ("de", "https://api-de.libreview.io"),
    ("eu", "https://api-eu.libreview.io"),
    ("eu2", "https://api-eu2.libreview.io"),
    ("fr", "https://api-fr.libreview.io"),
    ("jp", "https://api-jp.libreview.io"),
    ("la", "https://api-la.libreview.io"),
    ("ru", "https://api.libreview.ru"),
    ("us", "https://api-us.libreview.io"),
];

/// Region code to host mapping.
#[derive(Debug, Clone)]
pub struct RegionMap {
    hosts: HashMap<String, String>,
}

impl Default for RegionMap {
    fn default() -> Self {
        let hosts = KNOWN_REGIONS
            .iter()
            .map(|(code, host)| (code.to_string(), host.to_string()))
            .collect();
        Self { hosts }
    }
}

impl RegionMap {
    /// A map with no entries; every lookup uses the naming fallback.
    pub fn empty() -> Self {
        Self {
            hosts: HashMap::new(),
        }
    }

    /// Add or replace the host for a region code.
    pub fn with_host(mut self, region: &str, host: &str) -> Self {
        self.hosts.insert(region.to_ascii_lowercase(), trim_base(host));
        self
    }

    /// Host for a region code. Codes without an entry follow the upstream's
    /// `api-{code}` naming, which only admits ASCII alphanumeric codes.
    pub fn host_for(&self, region: &str) -> LluResult<String> {
        let code = region.trim().to_ascii_lowercase();
        if let Some(host) = self.hosts.get(&code) {
            return Ok(host.clone());
        }
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(LluError::Protocol(format!(
                "redirect to unrecognized region code {:?}",
                region
            )));
        }
        Ok(format!("https://api-{}.libreview.io", code))
    }
}

/// Static client settings: where negotiation starts and how requests look.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub version: String,
    pub product: String,
    pub timeout: Duration,
    pub regions: RegionMap,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            version: DEFAULT_VERSION.to_string(),
            product: DEFAULT_PRODUCT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            regions: RegionMap::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = trim_base(base_url);
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }
}

/// Mutable endpoint state for one negotiation: the current host and version
/// header, plus how many times each has been switched.
#[derive(Debug, Clone)]
pub struct EndpointState {
    pub base_url: String,
    pub version: String,
    redirects: u8,
    version_bumps: u8,
}

impl EndpointState {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: trim_base(&config.base_url),
            version: config.version.clone(),
            redirects: 0,
            version_bumps: 0,
        }
    }

    /// Switch to a region host. Returns false if a redirect was already taken.
    pub fn redirect(&mut self, regions: &RegionMap, region: &str) -> LluResult<bool> {
        if self.redirects > 0 {
            return Ok(false);
        }
        self.base_url = regions.host_for(region)?;
        self.redirects += 1;
        Ok(true)
    }

    /// Adopt the upstream minimum version. Returns false if already bumped.
    pub fn bump_version(&mut self, minimum_version: &str) -> bool {
        if self.version_bumps > 0 {
            return false;
        }
        self.version_bumps += 1;
        self.version = minimum_version.to_string();
        true
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
