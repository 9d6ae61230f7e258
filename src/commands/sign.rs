//! Offline signing command: prints the signed query without sending it.

use crate::commands::request::ApiCall;
use crate::config::Config;
use crate::mws::Connection;
use anyhow::{Context, Result};
use tracing::debug;

/// Builds and signs the canonical query for a call.
pub struct SignCommand {
    config: Config,
}

impl SignCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn execute(&self, call: &ApiCall) -> Result<String> {
        let connection = Connection::new(self.config.connection_config())
            .context("Failed to create connection")?;

        debug!("Signing {} {} for {}", call.method, call.path, connection.host());

        let signed = connection
            .signed_query(call.method, &call.path, call.request_options(), &call.overrides())
            .context("Failed to build signed query")?;

        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mws::{Marketplace, Method, Signer, SignerConfig};

    fn make_test_config() -> Config {
        Config {
            merchant: Some("J4UBGSWCA31UTJ".to_string()),
            access: Some("Q6K3SCWMLYAKIAJXAAYQ".to_string()),
            secret: Some("53kddzBej7O7I5Yx9drGrXEUbzq/NskSrW4m5ncq".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_sign_command_output() {
        let mut call = ApiCall::new(Method::Post, "/");
        call.action = Some("SubmitFeed".to_string());
        call.markets = vec!["us".to_string()];
        call.params = vec![("Timestamp".to_string(), "2012-10-12T15:14:52-05:00".to_string())];

        let signed = SignCommand::new(make_test_config()).execute(&call).unwrap();
        let (query, signature) = signed.rsplit_once("&Signature=").unwrap();

        assert!(query.contains("Action=SubmitFeed"));
        assert!(query.contains("MarketplaceIdList.Id.1=ATVPDKIKX0DER"));
        assert!(query.contains("Timestamp=2012-10-12T15%3A14%3A52-05%3A00"));

        let signer = Signer::new(
            SignerConfig::new().secret("53kddzBej7O7I5Yx9drGrXEUbzq/NskSrW4m5ncq"),
        );
        assert_eq!(signature, urlencoding::encode(&signer.signature(query, None)));
    }

    #[test]
    fn test_marketplace_setting_only_selects_host() {
        let config = Config { marketplace: Marketplace::De, ..make_test_config() };
        let mut call = ApiCall::new(Method::Get, "/");
        call.params = vec![("Timestamp".to_string(), "2012-10-12T15:14:52-05:00".to_string())];

        let signed = SignCommand::new(config).execute(&call).unwrap();
        let (query, signature) = signed.rsplit_once("&Signature=").unwrap();

        assert!(!query.contains("MarketplaceId"));

        let signer = Signer::new(
            SignerConfig::new()
                .verb("GET")
                .host(Marketplace::De.host())
                .secret("53kddzBej7O7I5Yx9drGrXEUbzq/NskSrW4m5ncq"),
        );
        assert_eq!(signature, urlencoding::encode(&signer.signature(query, None)));
    }

    #[test]
    fn test_sign_command_requires_credentials() {
        let err = SignCommand::new(Config::default())
            .execute(&ApiCall::new(Method::Get, "/"))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("A merchant identifier must be specified."));
    }

    #[test]
    fn test_sign_command_rejects_bad_list_pattern() {
        let mut call = ApiCall::new(Method::Get, "/");
        call.markets = vec!["us".to_string()];
        call.list_pattern = Some("{key}".to_string());

        let err = SignCommand::new(make_test_config()).execute(&call).unwrap_err();
        assert!(format!("{:#}", err).contains("{index}"));
    }
}
