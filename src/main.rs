//! mws-connect - Signed request client for Amazon Marketplace Web Service

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mws_connect::commands::request::parse_param;
use mws_connect::commands::{ApiCall, RequestCommand, SignCommand};
use mws_connect::config::{Config, OutputFormat};
use mws_connect::format::Formatter;
use mws_connect::mws::{Marketplace, Method};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mws-connect",
    version,
    about = "Signed request client for Amazon Marketplace Web Service"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// URL scheme (https or http)
    #[arg(long, global = true, env = "MWS_SCHEME")]
    scheme: Option<String>,

    /// Endpoint host (defaults to the marketplace host)
    #[arg(long, global = true, env = "MWS_HOST")]
    host: Option<String>,

    /// Marketplace whose endpoint host is used (code or MarketplaceId)
    #[arg(long, global = true, env = "MWS_MARKETPLACE")]
    marketplace: Option<Marketplace>,

    /// Merchant identifier
    #[arg(long, global = true, env = "MWS_MERCHANT")]
    merchant: Option<String>,

    /// Access key id
    #[arg(long, global = true, env = "MWS_ACCESS_KEY")]
    access: Option<String>,

    /// Secret key
    #[arg(long, global = true, env = "MWS_SECRET_KEY", hide_env_values = true)]
    secret: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "MWS_PROXY")]
    proxy: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CallArgs {
    /// Request path (e.g. /Orders/2011-01-01)
    #[arg(default_value = "/")]
    path: String,

    /// API action (e.g. ListOrders)
    #[arg(short, long)]
    action: Option<String>,

    /// API version (e.g. 2011-01-01)
    #[arg(long)]
    api_version: Option<String>,

    /// Marketplace code or id (repeatable)
    #[arg(short, long = "market")]
    markets: Vec<String>,

    /// List key template with {key} and {index} placeholders
    #[arg(long)]
    list_pattern: Option<String>,

    /// Result path, overriding the <Action>Result default
    #[arg(long)]
    xpath: Option<String>,

    /// Extra parameter as key=value (repeatable)
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

impl CallArgs {
    fn into_call(self, method: Method) -> ApiCall {
        ApiCall {
            method,
            path: self.path,
            action: self.action,
            version: self.api_version,
            markets: self.markets,
            list_pattern: self.list_pattern,
            xpath: self.xpath,
            params: self.params,
            body: None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Send a signed GET request
    Get {
        #[command(flatten)]
        call: CallArgs,
    },

    /// Send a signed POST request
    Post {
        #[command(flatten)]
        call: CallArgs,

        /// File whose contents are sent as the XML body
        #[arg(long)]
        body_file: Option<PathBuf>,
    },

    /// Print the signed query for a request without sending it
    Sign {
        #[command(flatten)]
        call: CallArgs,

        /// HTTP verb the signature is computed for
        #[arg(long, default_value = "post")]
        verb: String,
    },

    /// List supported marketplaces
    Marketplaces,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(scheme) = cli.scheme {
        config.scheme = scheme;
    }
    if let Some(host) = cli.host {
        config.host = Some(host);
    }
    if let Some(marketplace) = cli.marketplace {
        config.marketplace = marketplace;
    }
    if let Some(merchant) = cli.merchant {
        config.merchant = Some(merchant);
    }
    if let Some(access) = cli.access {
        config.access = Some(access);
    }
    if let Some(secret) = cli.secret {
        config.secret = Some(secret);
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(format) = cli.format {
        config.format = format;
    }

    match cli.command {
        Commands::Get { call } => {
            let cmd = RequestCommand::new(config);
            let output = cmd.execute(&call.into_call(Method::Get)).await?;
            println!("{}", output);
        }

        Commands::Post { call, body_file } => {
            let mut call = call.into_call(Method::Post);
            if let Some(path) = body_file {
                let body = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read body file: {}", path.display()))?;
                call.body = Some(body);
            }

            let cmd = RequestCommand::new(config);
            let output = cmd.execute(&call).await?;
            println!("{}", output);
        }

        Commands::Sign { call, verb } => {
            let method = match verb.to_lowercase().as_str() {
                "get" => Method::Get,
                "post" => Method::Post,
                other => anyhow::bail!("Unknown verb: {}. Use: get, post", other),
            };

            let cmd = SignCommand::new(config);
            println!("{}", cmd.execute(&call.into_call(method))?);
        }

        Commands::Marketplaces => {
            let formatter = Formatter::new(config.format);
            println!("{}", formatter.format_marketplaces(Marketplace::all()));
        }
    }

    Ok(())
}
