//! API call command implementation (signed GET/POST).

use crate::config::Config;
use crate::format::Formatter;
use crate::mws::{Connection, Marketplace, Method, MwsApi, Overrides, RequestOptions};
use crate::utils::camelize;
use anyhow::{Context, Result};
use tracing::info;

/// A single logical API call as described on the command line.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub method: Method,
    pub path: String,
    pub action: Option<String>,
    pub version: Option<String>,
    /// Marketplace codes (`us`, `de`) or raw MarketplaceIds
    pub markets: Vec<String>,
    pub list_pattern: Option<String>,
    pub xpath: Option<String>,
    pub params: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ApiCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            action: None,
            version: None,
            markets: Vec::new(),
            list_pattern: None,
            xpath: None,
            params: Vec::new(),
            body: None,
        }
    }

    /// Query options for this call.
    pub fn request_options(&self) -> RequestOptions {
        let markets = self.markets.iter().map(|m| match m.parse::<Marketplace>() {
            Ok(marketplace) => marketplace.id().to_string(),
            Err(_) => m.clone(),
        });

        self.params
            .iter()
            .fold(RequestOptions::new().markets(markets), |options, (key, value)| {
                options.param(key.clone(), value.clone())
            })
    }

    /// Overrides for this call.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            action: self.action.clone(),
            version: self.version.clone(),
            list_pattern: self.list_pattern.clone(),
            xpath: self.xpath.clone(),
        }
    }
}

/// Parses a `key=value` argument. Snake_case keys are camelized
/// (`created_after` -> `CreatedAfter`); keys with uppercase letters are kept verbatim.
pub fn parse_param(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("Invalid parameter '{}'. Expected key=value", arg))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid parameter '{}'. Key must not be empty", arg));
    }

    let key = if key.chars().any(char::is_uppercase) {
        key.to_string()
    } else {
        camelize(key, true)
    };

    Ok((key, value.to_string()))
}

/// Executes a signed API call.
pub struct RequestCommand {
    config: Config,
}

impl RequestCommand {
    /// Creates a new request command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Connects with the configured credentials and executes the call.
    pub async fn execute(&self, call: &ApiCall) -> Result<String> {
        let connection = Connection::new(self.config.connection_config())
            .context("Failed to create connection")?;

        self.execute_with_client(&connection, call).await
    }

    /// Executes the call with a provided client (for testing).
    pub async fn execute_with_client(&self, client: &impl MwsApi, call: &ApiCall) -> Result<String> {
        info!("Calling {} {}", call.method, call.path);

        let options = call.request_options();
        let overrides = call.overrides();

        let node = match call.method {
            Method::Get => client.get(&call.path, options, &overrides).await?,
            Method::Post => {
                client.post(&call.path, options, call.body.as_deref(), &overrides).await?
            }
        };

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_node(&node))
    }
}
