//! Per-symbol fallback across providers.
//!
//! States: `Idle -> TryingProvider(0) -> ... -> TryingProvider(n-1)`, ending
//! in `Success` or `ExhaustedFailure`. Within one provider the [`RetryPolicy`]
//! decides between retrying after a backoff and abandoning it. Every call,
//! retries included, goes through the [`RequestPacer`].

use market_core::{
    ErrorKind, MalformedReason, MetricsProvider, MetricsRecord, NormalizedMetrics, ProviderError,
    ProviderKind,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::normalize::normalize_into;
use crate::pacer::RequestPacer;
use crate::policy::RetryPolicy;

/// Summary of one abandoned provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    #[serde(serialize_with = "serialize_kind")]
    pub kind: ErrorKind,
    pub attempts: u32,
    pub message: String,
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(kind)
}

impl ProviderFailure {
    fn new(err: &ProviderError, attempts: u32) -> Self {
        Self {
            provider: err.provider(),
            kind: err.kind(),
            attempts,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} gave up after {} attempt(s) [{}]",
            self.provider, self.attempts, self.kind
        )
    }
}

fn summarize(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no providers configured".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("All providers failed for {symbol}: {}", summarize(.failures))]
    Exhausted {
        symbol: String,
        failures: Vec<ProviderFailure>,
    },
}

/// Successful ingestion of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub metrics: NormalizedMetrics,
    /// Providers abandoned before the one that succeeded
    pub failures: Vec<ProviderFailure>,
}

impl Ingested {
    pub fn provider(&self) -> ProviderKind {
        self.metrics.provider
    }

    pub fn symbol(&self) -> &str {
        &self.metrics.record.symbol
    }
}

#[derive(Debug)]
enum FetchState {
    Idle,
    TryingProvider(usize),
    Success(NormalizedMetrics),
    ExhaustedFailure,
}

pub struct FallbackOrchestrator {
    providers: Vec<Arc<dyn MetricsProvider>>,
    policy: RetryPolicy,
    pacer: RequestPacer,
}

impl FallbackOrchestrator {
    /// `providers` are tried in the given order.
    pub fn new(
        providers: Vec<Arc<dyn MetricsProvider>>,
        policy: RetryPolicy,
        pacer: RequestPacer,
    ) -> Self {
        Self {
            providers,
            policy,
            pacer,
        }
    }

    pub fn provider_order(&self) -> Vec<ProviderKind> {
        self.providers.iter().map(|p| p.kind()).collect()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolves one symbol to a normalized record, or to the list of
    /// per-provider failures when every provider was abandoned.
    pub async fn ingest(&self, raw_symbol: &str) -> Result<Ingested, IngestError> {
        let seed = MetricsRecord::new(raw_symbol)
            .ok_or_else(|| IngestError::InvalidSymbol(raw_symbol.to_string()))?;

        let mut failures = Vec::new();
        let mut state = FetchState::Idle;

        loop {
            state = match state {
                FetchState::Idle => FetchState::TryingProvider(0),
                FetchState::TryingProvider(index) => match self.providers.get(index) {
                    None => FetchState::ExhaustedFailure,
                    Some(provider) => {
                        match self.attempt_provider(provider.as_ref(), &seed).await {
                            Ok(metrics) => FetchState::Success(metrics),
                            Err(failure) => {
                                failures.push(failure);
                                FetchState::TryingProvider(index + 1)
                            }
                        }
                    }
                },
                FetchState::Success(metrics) => {
                    tracing::info!(
                        "Ingested {} via {} ({} fields)",
                        seed.symbol,
                        metrics.provider,
                        metrics.supplied.len()
                    );
                    return Ok(Ingested { metrics, failures });
                }
                FetchState::ExhaustedFailure => {
                    return Err(IngestError::Exhausted {
                        symbol: seed.symbol,
                        failures,
                    });
                }
            };
        }
    }

    /// Calls one provider until it succeeds or the policy gives up on it.
    async fn attempt_provider(
        &self,
        provider: &dyn MetricsProvider,
        seed: &MetricsRecord,
    ) -> Result<NormalizedMetrics, ProviderFailure> {
        let kind = provider.kind();
        let symbol = seed.symbol.as_str();
        let mut attempts = 0u32;
        let mut retries = 0u32;

        loop {
            self.pacer.acquire(kind, provider.calls_per_fetch()).await;
            attempts += 1;

            let err = match provider.fetch(symbol).await {
                Ok(payload) => {
                    let metrics = normalize_into(&payload, kind, seed.clone());
                    if !metrics.supplied.is_empty() {
                        return Ok(metrics);
                    }
                    ProviderError::Malformed {
                        provider: kind,
                        reason: MalformedReason::EmptyBody,
                        message: "no usable metrics in response".to_string(),
                    }
                }
                Err(e) => e,
            };

            if retries >= self.policy.retry_limit(err.kind()) {
                tracing::warn!(
                    "{} abandoned for {} after attempt {}: {}",
                    kind,
                    symbol,
                    attempts,
                    err
                );
                return Err(ProviderFailure::new(&err, attempts));
            }

            let delay = self.policy.delay_for(retries);
            tracing::warn!(
                "{} attempt {} for {} failed ({}), retrying in {:.1}s",
                kind,
                attempts,
                symbol,
                err.kind(),
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
            retries += 1;
        }
    }
}
