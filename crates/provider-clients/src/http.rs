//! Response classification shared by every adapter.
//!
//! Maps HTTP status, transport failures and unusable bodies onto the
//! [`ProviderError`] taxonomy. Body-level markers (rate-limit notes, error
//! messages inside a 200 response) are provider specific and handled by each
//! adapter after [`parse_body`] succeeds.

use market_core::{ConfigError, MalformedReason, ProviderError, ProviderKind, RateLimitSignal};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub(crate) fn build_client(provider: ProviderKind, timeout: Duration) -> Result<Client, ConfigError> {
    build_client_with_headers(provider, timeout, HeaderMap::new())
}

/// A client that cannot be built (TLS backend, headers) is a startup error.
pub(crate) fn build_client_with_headers(
    provider: ProviderKind,
    timeout: Duration,
    headers: HeaderMap,
) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .map_err(|e| ConfigError::HttpClient {
            provider,
            message: e.to_string(),
        })
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Maps a non-success HTTP status onto an error kind.
pub fn classify_status(
    provider: ProviderKind,
    symbol: &str,
    status: StatusCode,
    body: &str,
) -> Result<(), ProviderError> {
    if status.is_success() {
        return Ok(());
    }

    let message = format!("HTTP {}: {}", status.as_u16(), snippet(body));
    let err = match status.as_u16() {
        401 | 402 | 403 => ProviderError::Auth { provider, message },
        400 | 404 | 422 => ProviderError::NotFound {
            provider,
            symbol: symbol.to_string(),
        },
        429 => ProviderError::RateLimited {
            provider,
            signal: RateLimitSignal::HttpStatus,
            message,
        },
        408 | 500..=599 => ProviderError::Transient { provider, message },
        _ => ProviderError::Malformed {
            provider,
            reason: MalformedReason::Unparseable,
            message,
        },
    };
    Err(err)
}

/// Parses a JSON body. Blank bodies and `null`, `{}` or `[]` are empty.
pub fn parse_body(provider: ProviderKind, body: &str) -> Result<Value, ProviderError> {
    if body.trim().is_empty() {
        return Err(ProviderError::Malformed {
            provider,
            reason: MalformedReason::EmptyBody,
            message: "zero-length body".to_string(),
        });
    }

    let value: Value = serde_json::from_str(body).map_err(|e| ProviderError::Malformed {
        provider,
        reason: MalformedReason::Unparseable,
        message: format!("{}: {}", e, snippet(body)),
    })?;

    let empty = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        return Err(ProviderError::Malformed {
            provider,
            reason: MalformedReason::EmptyBody,
            message: snippet(body),
        });
    }

    Ok(value)
}

pub fn transport_error(provider: ProviderKind, err: reqwest::Error) -> ProviderError {
    if err.is_decode() {
        return ProviderError::Malformed {
            provider,
            reason: MalformedReason::Unparseable,
            message: err.to_string(),
        };
    }
    // timeouts, connect failures, resets
    ProviderError::Transient {
        provider,
        message: err.to_string(),
    }
}

/// Sends one request and returns the parsed, non-empty JSON body.
pub(crate) async fn get_json(
    provider: ProviderKind,
    symbol: &str,
    request: RequestBuilder,
) -> Result<Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(provider, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    classify_status(provider, symbol, status, &body)?;
    parse_body(provider, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::ErrorKind;

    fn status(code: u16) -> StatusCode {
        StatusCode::from_u16(code).unwrap()
    }

    #[test]
    fn test_status_classification() {
        let p = ProviderKind::Fmp;
        assert!(classify_status(p, "AAPL", status(200), "").is_ok());

        let cases = [
            (401, ErrorKind::Auth),
            (403, ErrorKind::Auth),
            (404, ErrorKind::NotFound),
            (422, ErrorKind::NotFound),
            (429, ErrorKind::RateLimit),
            (500, ErrorKind::Transient),
            (503, ErrorKind::Transient),
            (408, ErrorKind::Transient),
        ];
        for (code, kind) in cases {
            let err = classify_status(p, "AAPL", status(code), "oops").unwrap_err();
            assert_eq!(err.kind(), kind, "status {}", code);
        }
    }

    #[test]
    fn test_rate_limit_status_signal() {
        let err = classify_status(ProviderKind::Yahoo, "AAPL", status(429), "Too Many Requests")
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                signal: RateLimitSignal::HttpStatus,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_bodies() {
        for body in ["", "   ", "null", "{}", "[]"] {
            let err = parse_body(ProviderKind::AlphaVantage, body).unwrap_err();
            assert!(
                matches!(
                    err,
                    ProviderError::Malformed {
                        reason: MalformedReason::EmptyBody,
                        ..
                    }
                ),
                "body {:?}",
                body
            );
        }
    }

    #[test]
    fn test_unparseable_body() {
        let err = parse_body(ProviderKind::Fmp, "<html>gateway</html>").unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Malformed {
                reason: MalformedReason::Unparseable,
                ..
            }
        ));
        assert!(parse_body(ProviderKind::Fmp, r#"{"a":1}"#).is_ok());
    }

    #[test]
    fn test_client_builds_with_default_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("APCA-API-KEY-ID", "key".parse().unwrap());
        assert!(build_client_with_headers(ProviderKind::Alpaca, Duration::from_secs(5), headers).is_ok());
        assert!(build_client(ProviderKind::Yahoo, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_snippet_truncates_long_bodies() {
        let long = "x".repeat(500);
        let s = snippet(&long);
        assert!(s.len() < 210);
        assert!(s.ends_with("..."));
    }
}
