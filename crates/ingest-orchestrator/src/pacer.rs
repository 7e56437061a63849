use market_core::ProviderKind;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum spacing between calls to the same provider.
///
/// Applies to every call, successful or not. Providers without a configured
/// interval are never delayed.
pub struct RequestPacer {
    intervals: HashMap<ProviderKind, Duration>,
    last_call: Mutex<HashMap<ProviderKind, Instant>>,
}

impl RequestPacer {
    pub fn new(intervals: HashMap<ProviderKind, Duration>) -> Self {
        Self {
            intervals,
            last_call: Mutex::new(HashMap::new()),
        }
    }

    /// Pacer that never waits
    pub fn unthrottled() -> Self {
        Self::new(HashMap::new())
    }

    pub fn interval(&self, provider: ProviderKind) -> Duration {
        self.intervals.get(&provider).copied().unwrap_or(Duration::ZERO)
    }

    /// Waits until a call of `weight` requests to `provider` may go out, then
    /// records it. The slot after this call opens `interval * weight` later.
    pub async fn acquire(&self, provider: ProviderKind, weight: u32) {
        let spacing = self.interval(provider).saturating_mul(weight.max(1));
        let mut last = self.last_call.lock().await;

        if let Some(ready_at) = last.get(&provider) {
            let now = Instant::now();
            if *ready_at > now {
                let wait = *ready_at - now;
                tracing::debug!(
                    "Pacer: waiting {:.1}s before next {} request",
                    wait.as_secs_f64(),
                    provider
                );
                tokio::time::sleep(wait).await;
            }
        }

        last.insert(provider, Instant::now() + spacing);
    }
}
