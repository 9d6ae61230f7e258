//! mws-connect - Signed request client for Amazon Marketplace Web Service
//!
//! Turns a logical API call into a canonical, Signature Version 2 signed HTTP
//! request and turns the XML response into a result node or a structured error.

pub mod commands;
pub mod config;
pub mod format;
pub mod mws;
pub mod utils;

pub use config::Config;
pub use mws::{
    connect, Connection, ConnectionConfig, Error, Marketplace, MwsApi, Overrides, Query,
    RequestOptions, ServerError, Signer, SignerConfig, ValidationError, XmlNode,
};
