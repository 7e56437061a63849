use std::fmt;
use thiserror::Error;

use crate::types::ProviderKind;

/// Startup configuration problems. Fatal: raised before any network call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing credential for {provider}: set {var}")]
    MissingCredential { provider: ProviderKind, var: String },

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("Failed to build HTTP client for {provider}: {message}")]
    HttpClient { provider: ProviderKind, message: String },
}

/// Error tag the retry policy branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    Auth,
    NotFound,
    RateLimit,
    Transient,
    Malformed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Transient => "transient",
            ErrorKind::Malformed => "malformed",
        };
        f.write_str(s)
    }
}

/// How the provider told us it was throttling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitSignal {
    /// HTTP 429
    HttpStatus,
    /// 200 response whose body carries a throttling marker field
    BodyMarker,
}

impl fmt::Display for RateLimitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitSignal::HttpStatus => f.write_str("http 429"),
            RateLimitSignal::BodyMarker => f.write_str("body marker"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    EmptyBody,
    Unparseable,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::EmptyBody => f.write_str("empty body"),
            MalformedReason::Unparseable => f.write_str("unparseable"),
        }
    }
}

/// Failure of a single adapter call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{provider}: credentials rejected: {message}")]
    Auth {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: symbol not found: {symbol}")]
    NotFound {
        provider: ProviderKind,
        symbol: String,
    },

    #[error("{provider}: rate limited ({signal}): {message}")]
    RateLimited {
        provider: ProviderKind,
        signal: RateLimitSignal,
        message: String,
    },

    #[error("{provider}: transient failure: {message}")]
    Transient {
        provider: ProviderKind,
        message: String,
    },

    #[error("{provider}: malformed response ({reason}): {message}")]
    Malformed {
        provider: ProviderKind,
        reason: MalformedReason,
        message: String,
    },
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Auth { .. } => ErrorKind::Auth,
            ProviderError::NotFound { .. } => ErrorKind::NotFound,
            ProviderError::RateLimited { .. } => ErrorKind::RateLimit,
            ProviderError::Transient { .. } => ErrorKind::Transient,
            ProviderError::Malformed { .. } => ErrorKind::Malformed,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::Auth { provider, .. }
            | ProviderError::NotFound { provider, .. }
            | ProviderError::RateLimited { provider, .. }
            | ProviderError::Transient { provider, .. }
            | ProviderError::Malformed { provider, .. } => *provider,
        }
    }
}
