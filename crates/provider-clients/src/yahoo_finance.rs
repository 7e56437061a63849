use async_trait::async_trait;
use market_core::{
    ConfigError, JsonObject, MalformedReason, MetricsProvider, ProviderError, ProviderKind,
    RawPayload,
};
use serde_json::Value;
use std::time::Duration;

use crate::http::{build_client, get_json};

const BASE_URL: &str = "https://query2.finance.yahoo.com/v7/finance";
const PROVIDER: ProviderKind = ProviderKind::Yahoo;

/// Consumer market-data source. No credentials; throttles with HTTP 429.
#[derive(Clone)]
pub struct YahooFinanceClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Get quote data for a symbol
    pub async fn get_quote(&self, symbol: &str) -> Result<JsonObject, ProviderError> {
        let url = format!("{}/quote", self.base_url);
        let request = self.client.get(&url).query(&[("symbols", symbol)]);
        let body = get_json(PROVIDER, symbol, request).await?;
        extract_quote(symbol, &body)
    }
}

/// Pulls the first `quoteResponse.result` entry out of a v7 quote body.
pub(crate) fn extract_quote(symbol: &str, body: &Value) -> Result<JsonObject, ProviderError> {
    let response = body.get("quoteResponse").or_else(|| body.get("finance"));

    if let Some(error) = response
        .and_then(|r| r.get("error"))
        .filter(|e| !e.is_null())
    {
        let code = error.get("code").and_then(|c| c.as_str()).unwrap_or_default();
        let message = error
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or(code)
            .to_string();
        return Err(if code.eq_ignore_ascii_case("unauthorized") {
            ProviderError::Auth {
                provider: PROVIDER,
                message,
            }
        } else {
            ProviderError::Transient {
                provider: PROVIDER,
                message,
            }
        });
    }

    let results = response
        .and_then(|r| r.get("result"))
        .and_then(|r| r.as_array())
        .ok_or_else(|| ProviderError::Malformed {
            provider: PROVIDER,
            reason: MalformedReason::Unparseable,
            message: "missing quoteResponse.result".to_string(),
        })?;

    results
        .iter()
        .filter_map(|v| v.as_object())
        .find(|q| {
            q.get("symbol")
                .and_then(|s| s.as_str())
                .map_or(true, |s| s.eq_ignore_ascii_case(symbol))
        })
        .cloned()
        .ok_or_else(|| ProviderError::NotFound {
            provider: PROVIDER,
            symbol: symbol.to_string(),
        })
}

#[async_trait]
impl MetricsProvider for YahooFinanceClient {
    fn kind(&self) -> ProviderKind {
        PROVIDER
    }

    async fn fetch(&self, symbol: &str) -> Result<RawPayload, ProviderError> {
        let quote = self.get_quote(symbol).await?;
        Ok(RawPayload::Quote(quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_extract_quote() {
        let body = json!({
            "quoteResponse": {
                "result": [{
                    "symbol": "MSFT",
                    "regularMarketPrice": 415.5,
                    "trailingPE": 36.1,
                    "beta": 0.9
                }],
                "error": null
            }
        });
        let quote = extract_quote("MSFT", &body).unwrap();
        assert_eq!(quote.get("regularMarketPrice").and_then(|v| v.as_f64()), Some(415.5));
    }

    #[test]
    fn test_empty_result_is_not_found() {
        let body = json!({"quoteResponse": {"result": [], "error": null}});
        let err = extract_quote("ZZZZ", &body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_unauthorized_is_auth() {
        let body = json!({
            "finance": {
                "result": null,
                "error": {"code": "Unauthorized", "description": "Invalid Crumb"}
            }
        });
        assert_eq!(extract_quote("AAPL", &body).unwrap_err().kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_other_finance_error_is_transient() {
        let body = json!({
            "finance": {"result": null, "error": {"code": "Internal", "description": "busy"}}
        });
        assert_eq!(extract_quote("AAPL", &body).unwrap_err().kind(), ErrorKind::Transient);
    }

    #[test]
    fn test_unexpected_shape_is_malformed() {
        let body = json!({"chart": {"result": []}});
        assert_eq!(extract_quote("AAPL", &body).unwrap_err().kind(), ErrorKind::Malformed);
    }
}
