//! Scripted provider doubles shared by the unit tests.

use async_trait::async_trait;
use market_core::{
    MalformedReason, MetricsProvider, ProviderError, ProviderKind, RateLimitSignal, RawPayload,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Replays scripted results; answers NotFound once the script runs out.
pub(crate) struct ScriptedProvider {
    kind: ProviderKind,
    script: Mutex<VecDeque<Result<RawPayload, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new(kind: ProviderKind, script: Vec<Result<RawPayload, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn fetch(&self, symbol: &str) -> Result<RawPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Err(ProviderError::NotFound {
                provider: self.kind,
                symbol: symbol.to_string(),
            })
        })
    }
}

pub(crate) fn quote(price: f64) -> Result<RawPayload, ProviderError> {
    Ok(RawPayload::Quote(
        json!({"regularMarketPrice": price}).as_object().cloned().unwrap(),
    ))
}

pub(crate) fn auth(kind: ProviderKind) -> Result<RawPayload, ProviderError> {
    Err(ProviderError::Auth {
        provider: kind,
        message: "bad key".to_string(),
    })
}

pub(crate) fn rate_limited(kind: ProviderKind) -> Result<RawPayload, ProviderError> {
    Err(ProviderError::RateLimited {
        provider: kind,
        signal: RateLimitSignal::BodyMarker,
        message: "slow down".to_string(),
    })
}

pub(crate) fn empty_body(kind: ProviderKind) -> Result<RawPayload, ProviderError> {
    Err(ProviderError::Malformed {
        provider: kind,
        reason: MalformedReason::EmptyBody,
        message: "{}".to_string(),
    })
}
