use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use thiserror::Error;

/// Rate-limit metadata a PDS attaches to responses via `ratelimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Total requests allowed in the current window.
    pub limit: Option<u32>,
    /// Requests remaining in the current window.
    pub remaining: Option<u32>,
    /// When the window resets and throttled callers may retry.
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimit {
    /// Extracts rate-limit metadata from response headers, if any is present.
    pub fn from_headers(headers: &HeaderMap) -> Option<RateLimit> {
        fn header_num<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers.get(name)?.to_str().ok()?.trim().parse().ok()
        }

        let limit = header_num(headers, "ratelimit-limit");
        let remaining = header_num(headers, "ratelimit-remaining");
        let reset = header_num::<i64>(headers, "ratelimit-reset")
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        if limit.is_none() && remaining.is_none() && reset.is_none() {
            return None;
        }
        Some(RateLimit {
            limit,
            remaining,
            reset,
        })
    }
}

/// Errors produced by the XRPC transport layer.
#[derive(Debug, Error)]
pub enum XrpcError {
    #[error("http transport: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status and (usually) a
    /// structured `{error, message}` body.
    #[error("{nsid}: HTTP {status} {error}: {message}")]
    Api {
        nsid: String,
        status: u16,
        error: String,
        message: String,
        ratelimit: Option<RateLimit>,
    },

    #[error("decoding {nsid} response: {source}")]
    Decode {
        nsid: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} requires an authenticated session")]
    Unauthenticated(String),
}

impl XrpcError {
    /// Whether this error is an upstream throttling response.
    pub fn is_throttled(&self) -> bool {
        matches!(
            self,
            XrpcError::Api { status, error, .. }
                if *status == 429 || error == "RateLimitExceeded"
        )
    }

    /// The rate-limit window reset time, when this error is a throttling
    /// response that carried one.
    pub fn throttle_reset(&self) -> Option<DateTime<Utc>> {
        if !self.is_throttled() {
            return None;
        }
        match self {
            XrpcError::Api { ratelimit, .. } => ratelimit.as_ref()?.reset,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(entries: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in entries {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn parses_ratelimit_headers() {
        let map = headers(&[
            ("ratelimit-limit", "3000"),
            ("ratelimit-remaining", "0"),
            ("ratelimit-reset", "1700000000"),
        ]);
        let rl = RateLimit::from_headers(&map).unwrap();
        assert_eq!(rl.limit, Some(3000));
        assert_eq!(rl.remaining, Some(0));
        assert_eq!(rl.reset.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn missing_headers_yield_none() {
        assert!(RateLimit::from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn throttled_api_error_exposes_reset() {
        let reset = Utc.timestamp_opt(1_700_000_000, 0).single();
        let err = XrpcError::Api {
            nsid: "app.bsky.graph.getList".into(),
            status: 429,
            error: "RateLimitExceeded".into(),
            message: "slow down".into(),
            ratelimit: Some(RateLimit {
                limit: None,
                remaining: Some(0),
                reset,
            }),
        };
        assert!(err.is_throttled());
        assert_eq!(err.throttle_reset(), reset);
    }

    #[test]
    fn plain_api_error_is_not_throttled() {
        let err = XrpcError::Api {
            nsid: "app.bsky.graph.getList".into(),
            status: 400,
            error: "InvalidRequest".into(),
            message: "bad cursor".into(),
            ratelimit: None,
        };
        assert!(!err.is_throttled());
        assert_eq!(err.throttle_reset(), None);
    }
}
