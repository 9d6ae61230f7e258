//! Signature Version 2 request signing.

use crate::mws::errors::ValidationError;
use crate::utils::uri_escape;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

pub const DEFAULT_VERB: &str = "POST";
pub const DEFAULT_HOST: &str = "mws.amazonservices.com";
pub const DEFAULT_PATH: &str = "/";

/// HMAC algorithm named by the `SignatureMethod` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureMethod {
    #[default]
    HmacSha256,
    HmacSha1,
}

impl SignatureMethod {
    /// Wire value sent as the `SignatureMethod` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::HmacSha256 => "HmacSHA256",
            SignatureMethod::HmacSha1 => "HmacSHA1",
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HmacSHA256" => Ok(SignatureMethod::HmacSha256),
            "HmacSHA1" => Ok(SignatureMethod::HmacSha1),
            _ => Err(ValidationError::new(format!("Unsupported signature method: {}", s))),
        }
    }
}

/// Inputs to the string-to-sign, fixed for the lifetime of a [`Signer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerConfig {
    pub verb: String,
    pub host: String,
    pub path: String,
    pub secret: String,
    pub method: SignatureMethod,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            verb: DEFAULT_VERB.to_string(),
            host: DEFAULT_HOST.to_string(),
            path: DEFAULT_PATH.to_string(),
            secret: String::new(),
            method: SignatureMethod::default(),
        }
    }
}

impl SignerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = verb.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn method(mut self, method: SignatureMethod) -> Self {
        self.method = method;
        self
    }
}

/// Computes and appends signatures over canonical query strings.
///
/// Signing is a pure function of (verb, host, path, query, secret, method).
#[derive(Clone)]
pub struct Signer {
    verb: String,
    host: String,
    path: String,
    secret: String,
    method: SignatureMethod,
}

impl Signer {
    /// Creates a signer; the verb is upper-cased and the host lower-cased.
    pub fn new(config: SignerConfig) -> Self {
        Self {
            verb: config.verb.to_uppercase(),
            host: config.host.to_lowercase(),
            path: config.path,
            secret: config.secret,
            method: config.method,
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> SignatureMethod {
        self.method
    }

    /// `VERB\nhost\npath\nquery`, no trailing newline.
    pub fn string_to_sign(&self, query: &str) -> String {
        format!("{}\n{}\n{}\n{}", self.verb, self.host, self.path, query)
    }

    /// Base64 HMAC of the string-to-sign, keyed by `secret` or the configured secret.
    pub fn signature(&self, query: &str, secret: Option<&str>) -> String {
        let key = secret.unwrap_or(&self.secret).as_bytes();
        let message = self.string_to_sign(query);

        let digest = match self.method {
            SignatureMethod::HmacSha256 => {
                let mut mac = HmacSha256::new_from_slice(key)
                    .expect("HMAC can take key of any size");
                mac.update(message.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
            SignatureMethod::HmacSha1 => {
                let mut mac =
                    HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
                mac.update(message.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
        };

        BASE64.encode(digest).trim_end().to_string()
    }

    /// Appends `&Signature=<encoded signature>` to the query.
    pub fn sign(&self, query: &str, secret: Option<&str>) -> String {
        format!("{}&Signature={}", query, uri_escape(&self.signature(query, secret)))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("verb", &self.verb)
            .field("host", &self.host)
            .field("path", &self.path)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
