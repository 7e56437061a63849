use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use market_core::{
    Bar, ConfigError, MalformedReason, MetricsProvider, ProviderError, ProviderKind, RawPayload,
};
use reqwest::header;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::http::{build_client_with_headers, get_json};
use crate::{env_credential, require_credential};

const DATA_URL: &str = "https://data.alpaca.markets";
const PROVIDER: ProviderKind = ProviderKind::Alpaca;
const LOOKBACK_DAYS: i64 = 400;

pub const API_KEY_VAR: &str = "ALPACA_API_KEY";
pub const API_SECRET_VAR: &str = "ALPACA_API_SECRET";

/// Daily bars from the Alpaca market data API.
///
/// Only yields price-derived metrics (price, 52-week range, moving averages).
#[derive(Clone)]
pub struct AlpacaBarsClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<AlpacaBar>>,
}

impl AlpacaBarsClient {
    pub fn new(api_key: String, secret_key: String, timeout: Duration) -> Result<Self, ConfigError> {
        let api_key = require_credential(PROVIDER, API_KEY_VAR, api_key)?;
        let secret_key = require_credential(PROVIDER, API_SECRET_VAR, secret_key)?;

        let mut headers = header::HeaderMap::new();
        for (name, value, var) in [
            ("APCA-API-KEY-ID", &api_key, API_KEY_VAR),
            ("APCA-API-SECRET-KEY", &secret_key, API_SECRET_VAR),
        ] {
            let value =
                header::HeaderValue::from_str(value).map_err(|_| ConfigError::Invalid {
                    key: var.to_string(),
                    value: "<contains invalid header characters>".to_string(),
                })?;
            headers.insert(name, value);
        }

        Ok(Self {
            client: build_client_with_headers(PROVIDER, timeout, headers)?,
            base_url: DATA_URL.to_string(),
        })
    }

    pub fn from_env(timeout: Duration) -> Result<Self, ConfigError> {
        let api_key = env_credential(&[API_KEY_VAR, "APCA_API_KEY_ID"]).unwrap_or_default();
        let secret_key =
            env_credential(&[API_SECRET_VAR, "APCA_API_SECRET_KEY", "ALPACA_SECRET_KEY"])
                .unwrap_or_default();
        Self::new(api_key, secret_key, timeout)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Daily bars covering roughly the last 400 calendar days, oldest first.
    pub async fn get_daily_bars(&self, symbol: &str) -> Result<Vec<Bar>, ProviderError> {
        let start = (Utc::now() - ChronoDuration::days(LOOKBACK_DAYS)).format("%Y-%m-%d");
        let url = format!("{}/v2/stocks/{}/bars", self.base_url, symbol);
        let request = self.client.get(&url).query(&[
            ("timeframe", "1Day"),
            ("start", &start.to_string()),
            ("limit", "10000"),
            ("adjustment", "split"),
            ("feed", "iex"),
        ]);

        let body = get_json(PROVIDER, symbol, request).await?;
        parse_bars(symbol, body)
    }
}

pub(crate) fn parse_bars(symbol: &str, body: Value) -> Result<Vec<Bar>, ProviderError> {
    let response: BarsResponse =
        serde_json::from_value(body).map_err(|e| ProviderError::Malformed {
            provider: PROVIDER,
            reason: MalformedReason::Unparseable,
            message: e.to_string(),
        })?;

    let mut bars: Vec<Bar> = response
        .bars
        .unwrap_or_default()
        .into_iter()
        .map(|b| Bar {
            timestamp: b.t,
            open: b.o,
            high: b.h,
            low: b.l,
            close: b.c,
            volume: b.v,
        })
        .collect();

    if bars.is_empty() {
        return Err(ProviderError::NotFound {
            provider: PROVIDER,
            symbol: symbol.to_string(),
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

#[async_trait]
impl MetricsProvider for AlpacaBarsClient {
    fn kind(&self) -> ProviderKind {
        PROVIDER
    }

    async fn fetch(&self, symbol: &str) -> Result<RawPayload, ProviderError> {
        let bars = self.get_daily_bars(symbol).await?;
        tracing::debug!("Alpaca returned {} bars for {}", bars.len(), symbol);
        Ok(RawPayload::Bars(bars))
    }
}
