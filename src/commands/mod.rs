//! CLI command implementations.

pub mod request;
pub mod sign;

pub use request::{ApiCall, RequestCommand};
pub use sign::SignCommand;
