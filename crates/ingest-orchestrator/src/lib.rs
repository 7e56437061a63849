pub mod config;
pub mod normalize;
pub mod orchestrator;
pub mod pacer;
pub mod policy;
pub mod runner;

#[cfg(test)]
mod testing;

pub use config::IngestConfig;
pub use normalize::{normalize, normalize_into};
pub use orchestrator::{FallbackOrchestrator, IngestError, Ingested, ProviderFailure};
pub use pacer::RequestPacer;
pub use policy::RetryPolicy;
pub use runner::{run_batch, RunReport, SymbolFailure, SymbolSuccess};
