//! MWS protocol layer: canonical queries, request signing and response parsing.

pub mod connection;
pub mod errors;
pub mod marketplace;
pub mod node;
pub mod query;
pub mod signer;

pub use connection::{connect, Connection, ConnectionConfig, Method, MwsApi};
pub use errors::{Error, ErrorCode, Result, ServerError, ValidationError};
pub use marketplace::Marketplace;
pub use node::XmlNode;
pub use query::{Overrides, Query, RequestOptions};
pub use signer::{SignatureMethod, Signer, SignerConfig};
