//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::mws::{ConnectionConfig, Marketplace};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL scheme (https or http)
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Endpoint host; defaults to the marketplace's host
    #[serde(default)]
    pub host: Option<String>,

    /// Merchant (seller) identifier
    #[serde(default)]
    pub merchant: Option<String>,

    /// AWS access key id
    #[serde(default)]
    pub access: Option<String>,

    /// AWS secret key
    #[serde(default)]
    pub secret: Option<String>,

    /// Marketplace whose endpoint host is used when `host` is unset
    #[serde(default)]
    pub marketplace: Marketplace,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_scheme() -> String {
    "https".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: None,
            merchant: None,
            access: None,
            secret: None,
            marketplace: Marketplace::Us,
            proxy: None,
            timeout_secs: None,
            format: OutputFormat::Xml,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("mws-connect").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(scheme) = std::env::var("MWS_SCHEME") {
            self.scheme = scheme;
        }

        if let Ok(host) = std::env::var("MWS_HOST") {
            self.host = Some(host);
        }

        if let Ok(merchant) = std::env::var("MWS_MERCHANT") {
            self.merchant = Some(merchant);
        }

        if let Ok(access) = std::env::var("MWS_ACCESS_KEY") {
            self.access = Some(access);
        }

        if let Ok(secret) = std::env::var("MWS_SECRET_KEY") {
            self.secret = Some(secret);
        }

        if let Ok(marketplace) = std::env::var("MWS_MARKETPLACE") {
            if let Ok(m) = marketplace.parse() {
                self.marketplace = m;
            }
        }

        if let Ok(proxy) = std::env::var("MWS_PROXY") {
            self.proxy = Some(proxy);
        }

        self
    }

    /// Endpoint host: the explicit host, else the marketplace's.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or_else(|| self.marketplace.host())
    }

    /// Builds the library connection settings. Credentials are validated when
    /// the connection is created.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            scheme: self.scheme.clone(),
            host: self.host().to_string(),
            merchant: self.merchant.clone(),
            access: self.access.clone(),
            secret: self.secret.clone(),
            proxy: self.proxy.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Output format for result nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xml,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xml" => Ok(OutputFormat::Xml),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use: xml, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Xml => write!(f, "xml"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
