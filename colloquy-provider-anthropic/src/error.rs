//! Mapping of HTTP and transport failures to [`ProviderError`].

use std::time::Duration;

use colloquy_turn::ProviderError;

/// Map a non-success HTTP status from the Anthropic API.
///
/// Reference: <https://docs.anthropic.com/en/api/errors>
pub(crate) fn map_http_status(
    status: reqwest::StatusCode,
    retry_after: Option<&str>,
    body: &str,
) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(body.to_string()),
        429 => ProviderError::RateLimited {
            retry_after: retry_after.and_then(parse_retry_after),
        },
        // 529 is Anthropic's overloaded status
        500..=599 => ProviderError::Connection(format!("HTTP {status}: {body}")),
        _ => ProviderError::Protocol(format!("HTTP {status}: {body}")),
    }
}

/// Parse a `Retry-After` header given in whole seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Map a [`reqwest::Error`] raised while sending or reading.
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if err.is_decode() {
        ProviderError::Protocol(err.to_string())
    } else {
        ProviderError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn auth_statuses() {
        assert!(matches!(
            map_http_status(StatusCode::UNAUTHORIZED, None, "bad key"),
            ProviderError::Authentication(body) if body == "bad key"
        ));
        assert!(matches!(
            map_http_status(StatusCode::FORBIDDEN, None, ""),
            ProviderError::Authentication(_)
        ));
    }

    #[test]
    fn rate_limit_reads_retry_after() {
        let err = map_http_status(StatusCode::TOO_MANY_REQUESTS, Some("12"), "");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));
        assert!(err.is_retryable());

        let err = map_http_status(StatusCode::TOO_MANY_REQUESTS, Some("soon"), "");
        assert!(matches!(err, ProviderError::RateLimited { retry_after: None }));
    }

    #[test]
    fn server_errors_are_transient() {
        for code in [500u16, 502, 503, 529] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = map_http_status(status, None, "overloaded");
            assert!(matches!(err, ProviderError::Connection(_)), "{code}");
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn other_client_errors_are_protocol() {
        let err = map_http_status(StatusCode::BAD_REQUEST, None, "max_tokens too large");
        assert!(matches!(err, ProviderError::Protocol(_)));
        assert!(!err.is_retryable());
    }
}
