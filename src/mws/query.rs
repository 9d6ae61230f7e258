//! Canonical query construction.
//!
//! A [`Query`] is built fresh for every request from [`RequestOptions`]. Values are
//! stored raw and only percent-encoded when the query is serialized, at which point
//! the keys are emitted in ascending byte order.

use crate::mws::errors::ValidationError;
use crate::utils::uri_escape;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Default `SignatureMethod` parameter.
pub const DEFAULT_SIGNATURE_METHOD: &str = "HmacSHA256";

/// Default `SignatureVersion` parameter.
pub const DEFAULT_SIGNATURE_VERSION: &str = "2";

/// Default list expansion: `MarketplaceIdList.Id.1`, `MarketplaceIdList.Id.2`, ...
pub const DEFAULT_LIST_PATTERN: &str = "{key}List.Id.{index}";

const MARKET_KEY: &str = "MarketplaceId";
const SIGNATURE_KEY: &str = "Signature";

/// Logical options a query is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub action: Option<String>,
    pub version: Option<String>,
    pub merchant: Option<String>,
    pub seller: Option<String>,
    pub access: Option<String>,
    /// Template with `{key}` and `{index}` placeholders; `{index}` is 1-based.
    pub list_pattern: Option<String>,
    pub markets: Vec<String>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub signature_method: String,
    pub signature_version: String,
    /// Pass-through parameters, inserted verbatim.
    pub params: BTreeMap<String, String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            action: None,
            version: None,
            merchant: None,
            seller: None,
            access: None,
            list_pattern: None,
            markets: Vec::new(),
            timestamp: None,
            signature_method: DEFAULT_SIGNATURE_METHOD.to_string(),
            signature_version: DEFAULT_SIGNATURE_VERSION.to_string(),
            params: BTreeMap::new(),
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn seller(mut self, seller: impl Into<String>) -> Self {
        self.seller = Some(seller.into());
        self
    }

    pub fn access(mut self, access: impl Into<String>) -> Self {
        self.access = Some(access.into());
        self
    }

    pub fn list_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.list_pattern = Some(pattern.into());
        self
    }

    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.markets.push(market.into());
        self
    }

    pub fn markets<I, S>(mut self, markets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markets = markets.into_iter().map(Into::into).collect();
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn signature_method(mut self, method: impl Into<String>) -> Self {
        self.signature_method = method.into();
        self
    }

    pub fn signature_version(mut self, version: impl Into<String>) -> Self {
        self.signature_version = version.into();
        self
    }

    /// Adds a pass-through parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Per-call overrides: the action/version/list pattern fed into the query,
/// and the result path used when parsing the response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub action: Option<String>,
    pub version: Option<String>,
    pub list_pattern: Option<String>,
    pub xpath: Option<String>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn list_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.list_pattern = Some(pattern.into());
        self
    }

    pub fn xpath(mut self, xpath: impl Into<String>) -> Self {
        self.xpath = Some(xpath.into());
        self
    }
}

/// Canonical parameter map for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<String, String>,
}

impl Query {
    /// Builds the canonical parameters.
    ///
    /// Fails when `merchant` and `seller` disagree, when the list pattern has no
    /// `{index}` placeholder, or when a pass-through key would collide with `Signature`.
    pub fn new(options: &RequestOptions) -> Result<Self, ValidationError> {
        let mut params = BTreeMap::new();

        let timestamp = options.timestamp.unwrap_or_else(|| DateTime::from(Utc::now()));
        params.insert(
            "Timestamp".to_string(),
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        params.insert("SignatureMethod".to_string(), options.signature_method.clone());
        params.insert("SignatureVersion".to_string(), options.signature_version.clone());

        if let Some(action) = &options.action {
            params.insert("Action".to_string(), action.clone());
        }
        if let Some(version) = &options.version {
            params.insert("Version".to_string(), version.clone());
        }
        if let Some(access) = &options.access {
            params.insert("AWSAccessKeyId".to_string(), access.clone());
        }
        if let Some(id) = seller_id(options)? {
            params.insert("SellerId".to_string(), id.to_string());
        }

        let pattern = options.list_pattern.as_deref().unwrap_or(DEFAULT_LIST_PATTERN);
        expand_list(&mut params, pattern, MARKET_KEY, &options.markets)?;

        for (key, value) in &options.params {
            if key == SIGNATURE_KEY {
                return Err(ValidationError::new(
                    "The Signature parameter is reserved and cannot be supplied.",
                ));
            }
            if params.insert(key.clone(), value.clone()).is_some() {
                debug!("Pass-through parameter {} overrides a derived value", key);
            }
        }

        Ok(Self { params })
    }

    /// Raw (unencoded) parameters, keyed by parameter name.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Display for Query {
    /// Serializes as `key=value` pairs joined by `&`, keys ascending, both sides percent-encoded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Ordering is over the encoded names, which is what the service sorts.
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .map(|(key, value)| (uri_escape(key), uri_escape(value)))
            .collect();
        pairs.sort();

        for (i, (key, value)) in pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

fn seller_id(options: &RequestOptions) -> Result<Option<&str>, ValidationError> {
    match (options.merchant.as_deref(), options.seller.as_deref()) {
        (Some(merchant), Some(seller)) if merchant != seller => Err(ValidationError::new(
            "Only one of merchant or seller may be specified.",
        )),
        (Some(id), _) | (None, Some(id)) => Ok(Some(id)),
        (None, None) => Ok(None),
    }
}

fn expand_list(
    params: &mut BTreeMap<String, String>,
    pattern: &str,
    key: &str,
    values: &[String],
) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Ok(());
    }
    if !pattern.contains("{index}") {
        return Err(ValidationError::new(format!(
            "List pattern '{}' must contain an {{index}} placeholder.",
            pattern
        )));
    }

    for (i, value) in values.iter().enumerate() {
        let name = pattern.replace("{key}", key).replace("{index}", &(i + 1).to_string());
        params.insert(name, value.clone());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> RequestOptions {
        RequestOptions::new()
            .access("Q6K3SCWMLYAKIAJXAAYQ")
            .merchant("J4UBGSWCA31UTJ")
            .markets(["ATVPDKIKX0DER", "KIKX0DERATVPD"])
            .param("LastUpdatedAfter", "2012-10-12T11:11:54-05:00")
    }

    fn fixed_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2012-10-12T15:14:52-05:00").unwrap()
    }

    #[test]
    fn test_default_signature_method() {
        let query = Query::new(&defaults()).unwrap();
        assert_eq!(query.get("SignatureMethod"), Some("HmacSHA256"));
    }

    #[test]
    fn test_default_signature_version() {
        let query = Query::new(&defaults()).unwrap();
        assert_eq!(query.get("SignatureVersion"), Some("2"));
    }

    #[test]
    fn test_default_timestamp_is_now() {
        let before = Utc::now().timestamp();
        let query = Query::new(&defaults()).unwrap();
        let after = Utc::now().timestamp();

        let stamp = DateTime::parse_from_rfc3339(query.get("Timestamp").unwrap()).unwrap();
        assert!(stamp.timestamp() >= before && stamp.timestamp() <= after);
    }

    #[test]
    fn test_signature_overrides() {
        let options = defaults().signature_method("HmacSHA1").signature_version("3");
        let query = Query::new(&options).unwrap();
        assert_eq!(query.get("SignatureMethod"), Some("HmacSHA1"));
        assert_eq!(query.get("SignatureVersion"), Some("3"));
    }

    #[test]
    fn test_timestamp_override_keeps_offset() {
        let query = Query::new(&defaults().timestamp(fixed_time())).unwrap();
        assert_eq!(query.get("Timestamp"), Some("2012-10-12T15:14:52-05:00"));
    }

    #[test]
    fn test_utc_timestamp_uses_z() {
        let time = DateTime::parse_from_rfc3339("2012-10-12T20:14:52Z").unwrap();
        let query = Query::new(&defaults().timestamp(time)).unwrap();
        assert_eq!(query.get("Timestamp"), Some("2012-10-12T20:14:52Z"));
    }

    #[test]
    fn test_access_translates_to_aws_access_key_id() {
        let query = Query::new(&defaults()).unwrap();
        assert_eq!(query.get("AWSAccessKeyId"), Some("Q6K3SCWMLYAKIAJXAAYQ"));
    }

    #[test]
    fn test_merchant_or_seller_translates_to_seller_id() {
        let by_merchant = RequestOptions::new().merchant("J4UBGSWCA31UTJ");
        let by_seller = RequestOptions::new().seller("J4UBGSWCA31UTJ");

        for options in [by_merchant, by_seller] {
            let query = Query::new(&options).unwrap();
            assert_eq!(query.get("SellerId"), Some("J4UBGSWCA31UTJ"));
        }
    }

    #[test]
    fn test_conflicting_merchant_and_seller_rejected() {
        let options = RequestOptions::new().merchant("A").seller("B");
        let err = Query::new(&options).unwrap_err();
        assert_eq!(err.message, "Only one of merchant or seller may be specified.");
    }

    #[test]
    fn test_matching_merchant_and_seller_accepted() {
        let options = RequestOptions::new().merchant("A").seller("A");
        assert_eq!(Query::new(&options).unwrap().get("SellerId"), Some("A"));
    }

    #[test]
    fn test_action_and_version() {
        let options = defaults().action("ListOrders").version("2011-01-01");
        let query = Query::new(&options).unwrap();
        assert_eq!(query.get("Action"), Some("ListOrders"));
        assert_eq!(query.get("Version"), Some("2011-01-01"));
    }

    #[test]
    fn test_empty_markets() {
        let query = Query::new(&defaults().markets(Vec::<String>::new())).unwrap();
        assert!(query.params().keys().all(|k| !k.starts_with("MarketplaceIdList")));
    }

    #[test]
    fn test_single_market() {
        let query = Query::new(&defaults().markets(["ATVPDKIKX0DER"])).unwrap();
        assert_eq!(query.get("MarketplaceIdList.Id.1"), Some("ATVPDKIKX0DER"));
        assert_eq!(query.get("MarketplaceIdList.Id.2"), None);
    }

    #[test]
    fn test_multiple_markets() {
        let query = Query::new(&defaults().markets(["A", "B"])).unwrap();
        assert_eq!(query.get("MarketplaceIdList.Id.1"), Some("A"));
        assert_eq!(query.get("MarketplaceIdList.Id.2"), Some("B"));
    }

    #[test]
    fn test_custom_list_pattern() {
        let markets = ["ATVPDKIKX0DER", "KIKX0DERATVPD"];
        let options = defaults().markets(markets).list_pattern("{key}[{index}]");
        let query = Query::new(&options).unwrap();

        for (i, market) in markets.iter().enumerate() {
            assert_eq!(query.get(&format!("MarketplaceId[{}]", i + 1)), Some(*market));
        }
        assert_eq!(query.get("MarketplaceIdList.Id.1"), None);
    }

    #[test]
    fn test_list_pattern_without_index_rejected() {
        let options = defaults().list_pattern("{key}");
        assert!(Query::new(&options).is_err());
    }

    #[test]
    fn test_reserved_signature_param_rejected() {
        let options = defaults().param("Signature", "forged");
        assert!(Query::new(&options).is_err());
    }

    #[test]
    fn test_pass_through_params_verbatim() {
        let options = defaults().param("CreatedAfter", "2012-01-01T00:00:00Z");
        let query = Query::new(&options).unwrap();
        assert_eq!(query.get("CreatedAfter"), Some("2012-01-01T00:00:00Z"));
        assert_eq!(query.get("LastUpdatedAfter"), Some("2012-10-12T11:11:54-05:00"));
    }

    #[test]
    fn test_keys_sorted_in_serialization() {
        let options = defaults().param("zzz", "1").param("AAA", "2").param("Mmm", "3");
        let serialized = Query::new(&options).unwrap().to_string();

        let keys: Vec<&str> = serialized
            .split('&')
            .map(|pair| pair.split('=').next().unwrap())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.first(), Some(&"AAA"));
        assert_eq!(keys.last(), Some(&"zzz"));
    }

    #[test]
    fn test_serialization_round_trip() {
        let options = defaults().param("Note", "a b&c=d/é");
        let query = Query::new(&options).unwrap();
        let serialized = query.to_string();

        let mut seen = 0;
        for entry in serialized.split('&') {
            let (key, value) = entry.split_once('=').unwrap();
            let decoded = urlencoding::decode(value).unwrap();
            assert_eq!(query.get(key), Some(decoded.as_ref()));
            seen += 1;
        }
        assert_eq!(seen, query.len());
    }

    #[test]
    fn test_reserved_characters_in_keys_are_encoded() {
        let options = defaults()
            .param("Odd Key&x=1", "v")
            .markets(["A"])
            .list_pattern("{key}[{index}]");
        let query = Query::new(&options).unwrap();
        let serialized = query.to_string();

        assert!(serialized.contains("Odd%20Key%26x%3D1=v"));
        assert!(serialized.contains("MarketplaceId%5B1%5D=A"));

        for entry in serialized.split('&') {
            let (key, value) = entry.split_once('=').unwrap();
            let key = urlencoding::decode(key).unwrap();
            let value = urlencoding::decode(value).unwrap();
            assert_eq!(query.get(key.as_ref()), Some(value.as_ref()));
        }
    }

    #[test]
    fn test_exact_serialization() {
        let options = defaults().timestamp(fixed_time());
        let query = Query::new(&options).unwrap();
        assert_eq!(
            query.to_string(),
            "AWSAccessKeyId=Q6K3SCWMLYAKIAJXAAYQ\
             &LastUpdatedAfter=2012-10-12T11%3A11%3A54-05%3A00\
             &MarketplaceIdList.Id.1=ATVPDKIKX0DER\
             &MarketplaceIdList.Id.2=KIKX0DERATVPD\
             &SellerId=J4UBGSWCA31UTJ\
             &SignatureMethod=HmacSHA256\
             &SignatureVersion=2\
             &Timestamp=2012-10-12T15%3A14%3A52-05%3A00"
        );
    }
}
