//! Connection: builds the query, signs it, performs the HTTP call and parses the result.

use crate::mws::errors::{Error, Result, ServerError, ValidationError};
use crate::mws::node::XmlNode;
use crate::mws::query::{Overrides, Query, RequestOptions};
use crate::mws::signer::{SignatureMethod, Signer, SignerConfig, DEFAULT_HOST};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use md5::{Digest, Md5};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use wreq::Client;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("MWS Connect/", env!("CARGO_PKG_VERSION"), " (Language=Rust)");

/// Result path used when neither an xpath nor an action is given.
pub const FEEDS_RESULT_PATH: &str = "AmazonEnvelope/Message";

const ERROR_ROOT: &str = "ErrorResponse";

/// Trait for MWS calls - enables mocking for tests.
#[async_trait]
pub trait MwsApi: Send + Sync {
    /// Performs a signed GET and returns the result node.
    async fn get(&self, path: &str, params: RequestOptions, overrides: &Overrides)
        -> Result<XmlNode>;

    /// Performs a signed POST, optionally with an XML body, and returns the result node.
    async fn post(
        &self,
        path: &str,
        params: RequestOptions,
        body: Option<&str>,
        overrides: &Overrides,
    ) -> Result<XmlNode>;
}

/// HTTP verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reachability and credentials for a [`Connection`].
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub scheme: String,
    pub host: String,
    pub merchant: Option<String>,
    pub access: Option<String>,
    pub secret: Option<String>,
    /// Proxy URL (e.g., socks5://host:port)
    pub proxy: Option<String>,
    /// Overall request timeout; the transport default applies when unset.
    pub timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: DEFAULT_HOST.to_string(),
            merchant: None,
            access: None,
            secret: None,
            proxy: None,
            timeout: None,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn access(mut self, access: impl Into<String>) -> Self {
        self.access = Some(access.into());
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("merchant", &self.merchant)
            .field("access", &self.access)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Creates a connection from the given configuration.
pub fn connect(config: ConnectionConfig) -> Result<Connection> {
    Connection::new(config)
}

/// A configured MWS endpoint. Immutable once built; safe to share across tasks.
#[derive(Clone)]
pub struct Connection {
    client: Client,
    scheme: String,
    host: String,
    merchant: String,
    access: String,
    secret: String,
    base_url: Option<String>,
}

impl Connection {
    /// Creates a connection, failing before any I/O if a credential is missing.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Self::with_base_url(config, None)
    }

    /// Creates a connection that sends requests to `base_url` instead of
    /// `scheme://host:port` (for testing). Signing still uses the configured host.
    pub fn with_base_url(config: ConnectionConfig, base_url: Option<String>) -> Result<Self> {
        let merchant = required(config.merchant, "A merchant identifier must be specified.")?;
        let access = required(config.access, "An access key must be specified.")?;
        let secret = required(config.secret, "A secret key must be specified.")?;

        let scheme = config.scheme.to_lowercase();
        if scheme != "https" && scheme != "http" {
            return Err(ValidationError::new(format!(
                "Unsupported scheme '{}'. Use https or http.",
                config.scheme
            ))
            .into());
        }

        let mut builder = Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            builder = builder.proxy(wreq::Proxy::all(proxy_url)?);
        }

        let client = builder.build()?;

        Ok(Self { client, scheme, host: config.host, merchant, access, secret, base_url })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn merchant(&self) -> &str {
        &self.merchant
    }

    pub fn access(&self) -> &str {
        &self.access
    }

    fn port(&self) -> u16 {
        if self.scheme == "https" {
            443
        } else {
            80
        }
    }

    /// Merges connection defaults and overrides into `params` and builds the query.
    ///
    /// Values already present in `params` win over the overrides. The connection's
    /// merchant is only used when `params` names neither a merchant nor a seller.
    pub fn query_for(&self, params: RequestOptions, overrides: &Overrides) -> Result<Query> {
        let mut options = params;

        if options.action.is_none() {
            options.action = overrides.action.clone();
        }
        if options.version.is_none() {
            options.version = overrides.version.clone();
        }
        if options.list_pattern.is_none() {
            options.list_pattern = overrides.list_pattern.clone();
        }
        if options.merchant.is_none() && options.seller.is_none() {
            options.merchant = Some(self.merchant.clone());
        }
        if options.access.is_none() {
            options.access = Some(self.access.clone());
        }

        Ok(Query::new(&options)?)
    }

    /// Builds and signs the canonical query for a request, without sending it.
    pub fn signed_query(
        &self,
        method: Method,
        path: &str,
        params: RequestOptions,
        overrides: &Overrides,
    ) -> Result<String> {
        let query = self.query_for(params, overrides)?;
        self.sign_query(method, path, &query)
    }

    fn sign_query(&self, method: Method, path: &str, query: &Query) -> Result<String> {
        // Sign with the algorithm the query advertises.
        let signature_method: SignatureMethod =
            query.get("SignatureMethod").unwrap_or_default().parse()?;

        let signer = Signer::new(
            SignerConfig::new()
                .verb(method.as_str())
                .host(self.host.as_str())
                .path(path)
                .secret(self.secret.as_str())
                .method(signature_method),
        );

        Ok(signer.sign(&query.to_string(), None))
    }

    /// Runs the full cycle: build, sign, send, parse.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: RequestOptions,
        body: Option<&str>,
        overrides: &Overrides,
    ) -> Result<XmlNode> {
        let query = self.query_for(params, overrides)?;
        let lookup = result_lookup(&query, overrides);
        info!("{} {} (action: {})", method, path, lookup.action.as_deref().unwrap_or("-"));

        let signed = self.sign_query(method, path, &query)?;
        let response = self.response_for(method, path, &signed, body).await?;
        Self::parse(&response, &lookup)
    }

    fn url_for(&self, path: &str, query: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}{}?{}", base.trim_end_matches('/'), path, query),
            None => format!("{}://{}:{}{}?{}", self.scheme, self.host, self.port(), path, query),
        }
    }

    /// Performs the HTTP call and returns the raw body.
    ///
    /// A non-2xx status or an empty body raises a `ServerError` of type `HTTP`,
    /// unless the body is an `ErrorResponse`, which is reported as the service error.
    pub async fn response_for(
        &self,
        method: Method,
        path: &str,
        query: &str,
        body: Option<&str>,
    ) -> Result<String> {
        let url = self.url_for(path, query);
        debug!("{} {}{}", method, self.host, path);

        let mut request = match method {
            Method::Get => self.client.get(url.as_str()),
            Method::Post => self.client.post(url.as_str()),
        }
        .header("User-Agent", USER_AGENT)
        .header("Accept-Encoding", "text/xml");

        if let (Method::Post, Some(body)) = (method, body.filter(|b| !b.is_empty())) {
            request = request
                .header("Content-Type", "text/xml")
                .header("Content-MD5", content_md5(body))
                .body(body.to_owned());
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        let text = response.text().await?;

        if !status.is_success() || text.trim().is_empty() {
            if let Ok(root) = XmlNode::parse(&text) {
                if root.name == ERROR_ROOT {
                    return Err(service_error(&root).into());
                }
            }

            let reason = status.canonical_reason().unwrap_or("Unknown Status");
            warn!("Request failed with status: {}", status);
            return Err(ServerError::http(status.as_u16(), reason).into());
        }

        Ok(text)
    }

    /// Parses a response body and returns the single result node.
    pub fn parse(body: &str, overrides: &Overrides) -> Result<XmlNode> {
        let (path, nodes) = Self::select(body, overrides)?;
        nodes.into_iter().next().ok_or(Error::MissingResult { path })
    }

    /// Parses a response body and returns every node matching the result path.
    pub fn parse_all(body: &str, overrides: &Overrides) -> Result<Vec<XmlNode>> {
        Ok(Self::select(body, overrides)?.1)
    }

    fn select(body: &str, overrides: &Overrides) -> Result<(String, Vec<XmlNode>)> {
        let root = XmlNode::parse(body)?;

        if root.name == ERROR_ROOT {
            return Err(service_error(&root).into());
        }

        let (path, nodes) = if let Some(xpath) = &overrides.xpath {
            (xpath.clone(), root.select(xpath))
        } else if let Some(action) = &overrides.action {
            let name = format!("{}Result", action);
            let path = format!("{}/{}", root.name, name);
            (path, root.children.iter().filter(|c| c.name == name).collect())
        } else {
            (FEEDS_RESULT_PATH.to_string(), root.select(FEEDS_RESULT_PATH))
        };

        debug!("Result path {} matched {} node(s)", path, nodes.len());
        Ok((path, nodes.into_iter().cloned().collect()))
    }
}

#[async_trait]
impl MwsApi for Connection {
    async fn get(
        &self,
        path: &str,
        params: RequestOptions,
        overrides: &Overrides,
    ) -> Result<XmlNode> {
        self.request(Method::Get, path, params, None, overrides).await
    }

    async fn post(
        &self,
        path: &str,
        params: RequestOptions,
        body: Option<&str>,
        overrides: &Overrides,
    ) -> Result<XmlNode> {
        self.request(Method::Post, path, params, body, overrides).await
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("merchant", &self.merchant)
            .field("access", &self.access)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn required(value: Option<String>, message: &str) -> std::result::Result<String, ValidationError> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| ValidationError::new(message))
}

fn service_error(root: &XmlNode) -> ServerError {
    let field = |name: &str| root.text_at(&format!("Error/{}", name)).unwrap_or_default().to_string();
    ServerError::service(field("Type"), field("Code"), field("Message"))
}

/// Result lookup for a sent query: the action that was actually signed picks
/// `<Action>Result`, whichever of params, pass-through or overrides supplied it.
fn result_lookup(query: &Query, overrides: &Overrides) -> Overrides {
    Overrides {
        action: query.get("Action").map(str::to_string),
        ..overrides.clone()
    }
}

/// Base64 MD5 digest of the request body.
fn content_md5(body: &str) -> String {
    BASE64.encode(Md5::digest(body.as_bytes()))
}
