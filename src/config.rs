// CLI arguments and environment variable handling using clap.

use crate::resolver::{ClientConfig, RegionMap, DEFAULT_BASE_URL, DEFAULT_PRODUCT, DEFAULT_VERSION};
use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Fetch the latest glucose reading shared with a LibreLinkUp follower account.
#[derive(Parser, Clone)]
#[command(name = "llu-follower", version, about)]
pub struct Args {
    /// Follower account email (prompted when unset)
    #[arg(long, env = "LIBRELINK_EMAIL")]
    pub email: Option<String>,

    /// Follower account password (prompted when unset)
    #[arg(long, env = "LIBRELINK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Host the first login request goes to
    #[arg(long, env = "LLU_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Client version header sent before any upstream bump
    #[arg(long = "client-version", env = "LLU_VERSION", default_value = DEFAULT_VERSION)]
    pub client_version: String,

    /// Product header
    #[arg(long, env = "LLU_PRODUCT", default_value = DEFAULT_PRODUCT)]
    pub product: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "LLU_TIMEOUT_SECS", default_value = "20")]
    pub timeout_secs: u64,

    /// Fetch this patient instead of the first connection
    #[arg(long, env = "LLU_PATIENT_ID")]
    pub patient_id: Option<String>,

    /// Extra or overriding region host, as `code=url` (repeatable)
    #[arg(long = "region-host", value_parser = parse_region_host)]
    pub region_hosts: Vec<(String, String)>,

    /// Print the reading as JSON
    #[arg(long)]
    pub json: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl Args {
    pub fn client_config(&self) -> ClientConfig {
        let regions = self
            .region_hosts
            .iter()
            .fold(RegionMap::default(), |map, (code, host)| map.with_host(code, host));
        ClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            product: self.product.clone(),
            regions,
            ..ClientConfig::default()
        }
        .with_base_url(&self.base_url)
        .with_version(&self.client_version)
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("email", &self.email.as_ref().map(|_| "<redacted>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("client_version", &self.client_version)
            .field("product", &self.product)
            .field("timeout_secs", &self.timeout_secs)
            .field("patient_id", &self.patient_id)
            .field("region_hosts", &self.region_hosts)
            .field("json", &self.json)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn parse_region_host(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((code, host)) if !code.trim().is_empty() && !host.trim().is_empty() => {
            Ok((code.trim().to_string(), host.trim().to_string()))
        }
        _ => Err(format!("expected code=url, got {:?}", raw)),
    }
}

/// Load `.env` from the working directory, then the per-user one under the
/// config dir. Variables already set are never overwritten.
pub fn load_env_files() -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    if let Ok(path) = dotenvy::dotenv() {
        loaded.push(path);
    }
    if let Some(path) = user_env_file() {
        if path.is_file() && dotenvy::from_path(&path).is_ok() {
            loaded.push(path);
        }
    }
    loaded
}

pub fn user_env_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("llu-follower").join(".env"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn version_flag_prints_package_version() {
        let err = Args::try_parse_from(["llu-follower", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn debug_output_hides_credentials() {
        let args = Args::try_parse_from([
            "llu-follower",
            "--email",
            "me@example.com",
            "--password",
            "hunter2",
        ])
        .unwrap();
        let shown = format!("{:?}", args);
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("me@example.com"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn region_host_parses_pairs() {
        assert_eq!(
            parse_region_host("eu=http://localhost:9000").unwrap(),
            ("eu".to_string(), "http://localhost:9000".to_string())
        );
        assert!(parse_region_host("eu").is_err());
        assert!(parse_region_host("=http://x").is_err());
    }

    #[test]
    fn args_build_client_config() {
        let args = Args::try_parse_from([
            "llu-follower",
            "--base-url",
            "http://localhost:8080/",
            "--client-version",
            "4.17.0",
            "--timeout-secs",
            "5",
            "--region-host",
            "eu=http://localhost:8081",
        ])
        .unwrap();
        let config = args.client_config();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.version, "4.17.0");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.regions.host_for("eu").unwrap(), "http://localhost:8081");
        assert_eq!(config.regions.host_for("de").unwrap(), "https://api-de.libreview.io");
    }
}
