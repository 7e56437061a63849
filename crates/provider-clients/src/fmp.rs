use async_trait::async_trait;
use market_core::{
    ConfigError, JsonObject, MalformedReason, MetricsProvider, ProviderError, ProviderKind,
    RateLimitSignal, RawPayload,
};
use serde_json::Value;
use std::cmp::Reverse;
use std::time::Duration;

use crate::http::{build_client, get_json};
use crate::{env_credential, require_credential};

const BASE_URL: &str = "https://financialmodelingprep.com/stable";
const PROVIDER: ProviderKind = ProviderKind::Fmp;
pub const API_KEY_VAR: &str = "FMP_API_KEY";

/// Fundamentals provider B: revenue growth history and trailing ratios.
#[derive(Clone)]
pub struct FmpClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl FmpClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: require_credential(PROVIDER, API_KEY_VAR, api_key)?,
            client: build_client(PROVIDER, timeout)?,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        let key = env_credential(&[API_KEY_VAR]).unwrap_or_default();
        Self::new(key, timeout)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_rows(&self, endpoint: &str, symbol: &str) -> Result<Vec<JsonObject>, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let request = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())]);
        let body = get_json(PROVIDER, symbol, request).await?;
        check_body(symbol, body)
    }

    /// Annual income statement growth rows, latest fiscal year first.
    pub async fn get_income_statement_growth(
        &self,
        symbol: &str,
    ) -> Result<Vec<JsonObject>, ProviderError> {
        let mut rows = self.get_rows("income-statement-growth", symbol).await?;
        sort_latest_first(&mut rows);
        Ok(rows)
    }

    /// Trailing-twelve-month ratios
    pub async fn get_ratios_ttm(&self, symbol: &str) -> Result<JsonObject, ProviderError> {
        let mut rows = self.get_rows("ratios-ttm", symbol).await?;
        Ok(rows.swap_remove(0))
    }
}

/// Validates an FMP body. FMP answers with a JSON array of rows on success and
/// an `{"Error Message": ...}` object on failure, often with status 200.
pub(crate) fn check_body(symbol: &str, body: Value) -> Result<Vec<JsonObject>, ProviderError> {
    match body {
        Value::Array(items) => {
            let rows: Vec<JsonObject> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            if rows.is_empty() {
                return Err(ProviderError::Malformed {
                    provider: PROVIDER,
                    reason: MalformedReason::Unparseable,
                    message: "array without row objects".to_string(),
                });
            }
            Ok(rows)
        }
        Value::Object(map) => {
            let message = map
                .get("Error Message")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            Err(classify_error_message(symbol, message))
        }
        other => Err(ProviderError::Malformed {
            provider: PROVIDER,
            reason: MalformedReason::Unparseable,
            message: format!("unexpected body: {}", other),
        }),
    }
}

fn classify_error_message(symbol: &str, message: String) -> ProviderError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("limit reach") {
        ProviderError::RateLimited {
            provider: PROVIDER,
            signal: RateLimitSignal::BodyMarker,
            message,
        }
    } else if lower.contains("invalid api key") || lower.contains("subscription") {
        ProviderError::Auth {
            provider: PROVIDER,
            message,
        }
    } else if message.is_empty() {
        ProviderError::Malformed {
            provider: PROVIDER,
            reason: MalformedReason::Unparseable,
            message: "object body without rows".to_string(),
        }
    } else {
        tracing::debug!("FMP error for {}: {}", symbol, message);
        ProviderError::NotFound {
            provider: PROVIDER,
            symbol: symbol.to_string(),
        }
    }
}

fn fiscal_year(row: &JsonObject) -> Option<i64> {
    match row.get("fiscalYear")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Sorts rows by fiscal year, newest first. Rows without a year keep their
/// relative order after the dated ones.
fn sort_latest_first(rows: &mut [JsonObject]) {
    rows.sort_by_key(|row| Reverse(fiscal_year(row)));
}

#[async_trait]
impl MetricsProvider for FmpClient {
    fn kind(&self) -> ProviderKind {
        PROVIDER
    }

    fn calls_per_fetch(&self) -> u32 {
        2
    }

    async fn fetch(&self, symbol: &str) -> Result<RawPayload, ProviderError> {
        let growth = self.get_income_statement_growth(symbol).await?;
        let ratios = self.get_ratios_ttm(symbol).await?;
        Ok(RawPayload::Fundamentals { growth, ratios })
    }
}
