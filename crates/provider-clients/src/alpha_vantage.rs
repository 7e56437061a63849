use async_trait::async_trait;
use market_core::{
    ConfigError, JsonObject, MalformedReason, MetricsProvider, ProviderError, ProviderKind,
    RateLimitSignal, RawPayload,
};
use serde_json::Value;
use std::time::Duration;

use crate::http::{build_client, get_json};
use crate::{env_credential, require_credential};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: ProviderKind = ProviderKind::AlphaVantage;
pub const API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";

/// Fundamentals provider A: company OVERVIEW plus GLOBAL_QUOTE for the price.
///
/// Alpha Vantage reports throttling inside a 200 response (`Note` or
/// `Information`), never with a 429.
#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require_credential(PROVIDER, API_KEY_VAR, api_key)?,
            client: build_client(PROVIDER, timeout)?,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        let key = env_credential(&[API_KEY_VAR, "ALPHAVANTAGE_API_KEY"]).unwrap_or_default();
        Self::new(key, timeout)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn query(&self, function: &str, symbol: &str) -> Result<JsonObject, ProviderError> {
        let request = self.client.get(&self.base_url).query(&[
            ("function", function),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ]);
        let body = get_json(PROVIDER, symbol, request).await?;
        check_body(symbol, body)
    }

    /// Company fundamentals overview
    pub async fn get_company_overview(&self, symbol: &str) -> Result<JsonObject, ProviderError> {
        self.query("OVERVIEW", symbol).await
    }

    /// Latest quote, `None` when the symbol has no quote.
    pub async fn get_global_quote(&self, symbol: &str) -> Result<Option<JsonObject>, ProviderError> {
        let body = self.query("GLOBAL_QUOTE", symbol).await?;
        Ok(extract_global_quote(body))
    }
}

/// Turns a parsed 200 body into an error when it carries one of Alpha
/// Vantage's in-band markers.
pub(crate) fn check_body(symbol: &str, body: Value) -> Result<JsonObject, ProviderError> {
    let Value::Object(map) = body else {
        return Err(ProviderError::Malformed {
            provider: PROVIDER,
            reason: MalformedReason::Unparseable,
            message: "expected a JSON object".to_string(),
        });
    };

    if let Some(message) = map.get("Error Message").and_then(|v| v.as_str()) {
        if mentions_api_key(message) {
            return Err(ProviderError::Auth {
                provider: PROVIDER,
                message: message.to_string(),
            });
        }
        return Err(ProviderError::NotFound {
            provider: PROVIDER,
            symbol: symbol.to_string(),
        });
    }

    for marker in ["Note", "Information"] {
        if let Some(message) = map.get(marker).and_then(|v| v.as_str()) {
            if mentions_api_key(message) {
                return Err(ProviderError::Auth {
                    provider: PROVIDER,
                    message: message.to_string(),
                });
            }
            return Err(ProviderError::RateLimited {
                provider: PROVIDER,
                signal: RateLimitSignal::BodyMarker,
                message: message.to_string(),
            });
        }
    }

    Ok(map)
}

fn mentions_api_key(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("apikey") && (lower.contains("invalid") || lower.contains("missing"))
}

pub(crate) fn extract_global_quote(body: JsonObject) -> Option<JsonObject> {
    body.get("Global Quote")
        .and_then(|v| v.as_object())
        .filter(|q| !q.is_empty())
        .cloned()
}

/// A symbol with fundamentals but no quote keeps its overview. Throttling,
/// transport and credential failures fail the whole fetch so the caller
/// retries both calls.
fn quote_or_missing(
    symbol: &str,
    quote: Result<Option<JsonObject>, ProviderError>,
) -> Result<Option<JsonObject>, ProviderError> {
    match quote {
        Ok(quote) => Ok(quote),
        Err(e @ ProviderError::NotFound { .. })
        | Err(
            e @ ProviderError::Malformed {
                reason: MalformedReason::EmptyBody,
                ..
            },
        ) => {
            tracing::warn!("Alpha Vantage has no quote for {}: {}", symbol, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl MetricsProvider for AlphaVantageClient {
    fn kind(&self) -> ProviderKind {
        PROVIDER
    }

    fn calls_per_fetch(&self) -> u32 {
        2
    }

    async fn fetch(&self, symbol: &str) -> Result<RawPayload, ProviderError> {
        let overview = self.get_company_overview(symbol).await?;
        let quote = quote_or_missing(symbol, self.get_global_quote(symbol).await)?;
        Ok(RawPayload::Overview { overview, quote })
    }
}
