//! MWS marketplaces, their wire identifiers and regional endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marketplaces reachable through MWS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    #[default]
    Us,
    Ca,
    Mx,
    Br,
    Uk,
    De,
    Fr,
    It,
    Es,
    In,
    Jp,
    Cn,
    Au,
}

impl Marketplace {
    /// Returns the `MarketplaceId` sent on the wire.
    pub fn id(&self) -> &'static str {
        match self {
            Marketplace::Us => "ATVPDKIKX0DER",
            Marketplace::Ca => "A2EUQ1WTGCTBG2",
            Marketplace::Mx => "A1AM78C64UM0Y8",
            Marketplace::Br => "A2Q3Y263D00KWC",
            Marketplace::Uk => "A1F83G8C2ARO7P",
            Marketplace::De => "A1PA6795UKMFR9",
            Marketplace::Fr => "A13V1IB3VIYZZH",
            Marketplace::It => "APJ6JRA9NG5V4",
            Marketplace::Es => "A1RKKUPIHCS9HS",
            Marketplace::In => "A21TJRUUN4KGTP",
            Marketplace::Jp => "A1VC38T7YXB528",
            Marketplace::Cn => "AAHKV2X7AFYLW",
            Marketplace::Au => "A39IBJ37TRP1C6",
        }
    }

    /// Returns the MWS endpoint host serving this marketplace.
    pub fn host(&self) -> &'static str {
        match self {
            Marketplace::Us | Marketplace::Br => "mws.amazonservices.com",
            Marketplace::Ca => "mws.amazonservices.ca",
            Marketplace::Mx => "mws.amazonservices.com.mx",
            Marketplace::Uk
            | Marketplace::De
            | Marketplace::Fr
            | Marketplace::It
            | Marketplace::Es => "mws-eu.amazonservices.com",
            Marketplace::In => "mws.amazonservices.in",
            Marketplace::Jp => "mws.amazonservices.jp",
            Marketplace::Cn => "mws.amazonservices.com.cn",
            Marketplace::Au => "mws.amazonservices.com.au",
        }
    }

    /// Looks a marketplace up by its wire identifier.
    pub fn from_id(id: &str) -> Option<Marketplace> {
        Self::all().iter().copied().find(|m| m.id() == id)
    }

    /// Returns all supported marketplaces.
    pub fn all() -> &'static [Marketplace] {
        &[
            Marketplace::Us,
            Marketplace::Ca,
            Marketplace::Mx,
            Marketplace::Br,
            Marketplace::Uk,
            Marketplace::De,
            Marketplace::Fr,
            Marketplace::It,
            Marketplace::Es,
            Marketplace::In,
            Marketplace::Jp,
            Marketplace::Cn,
            Marketplace::Au,
        ]
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Marketplace::Us => "us",
            Marketplace::Ca => "ca",
            Marketplace::Mx => "mx",
            Marketplace::Br => "br",
            Marketplace::Uk => "uk",
            Marketplace::De => "de",
            Marketplace::Fr => "fr",
            Marketplace::It => "it",
            Marketplace::Es => "es",
            Marketplace::In => "in",
            Marketplace::Jp => "jp",
            Marketplace::Cn => "cn",
            Marketplace::Au => "au",
        };
        write!(f, "{}", code)
    }
}

impl FromStr for Marketplace {
    type Err = MarketplaceParseError;

    /// Accepts a symbolic code (`us`, `gb`, ...) or a wire identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(marketplace) = Marketplace::from_id(s.trim()) {
            return Ok(marketplace);
        }

        match s.trim().to_lowercase().as_str() {
            "us" | "usa" => Ok(Marketplace::Us),
            "ca" => Ok(Marketplace::Ca),
            "mx" => Ok(Marketplace::Mx),
            "br" => Ok(Marketplace::Br),
            "uk" | "gb" => Ok(Marketplace::Uk),
            "de" => Ok(Marketplace::De),
            "fr" => Ok(Marketplace::Fr),
            "it" => Ok(Marketplace::It),
            "es" => Ok(Marketplace::Es),
            "in" => Ok(Marketplace::In),
            "jp" => Ok(Marketplace::Jp),
            "cn" => Ok(Marketplace::Cn),
            "au" => Ok(Marketplace::Au),
            _ => Err(MarketplaceParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketplaceParseError(String);

impl fmt::Display for MarketplaceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown marketplace '{}'. Use a code (us, ca, mx, br, uk, de, fr, it, es, in, jp, cn, au) or a MarketplaceId",
            self.0
        )
    }
}

impl std::error::Error for MarketplaceParseError {}
