//! WebSocket URL derivation
//!
//! The notifications socket lives on the same host as the REST API:
//! `http(s)://host[:port][/prefix]/api` becomes
//! `ws(s)://host[:port][/prefix]<ws_path>`.

use ::url::Url;

use super::error::{ConnectionError, ConnectionResult};

/// Default path of the notifications endpoint
pub const DEFAULT_WS_PATH: &str = "/ws/notifications/";

/// Derive the WebSocket URL for `ws_path` from an HTTP API base URL
pub fn derive_ws_url(base_url: &str, ws_path: &str) -> ConnectionResult<String> {
    let base = base_url.trim();
    let parsed = Url::parse(base).map_err(|e| ConnectionError::invalid_url(base, e))?;

    let scheme = match parsed.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConnectionError::invalid_url(
                base,
                format!("unsupported scheme `{}`", other),
            ))
        }
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| ConnectionError::invalid_url(base, "missing host"))?;

    let mut url = format!("{}://{}", scheme, host);
    if let Some(port) = parsed.port() {
        url.push_str(&format!(":{}", port));
    }

    let path = parsed.path().trim_end_matches('/');
    let path = path.strip_suffix("/api").unwrap_or(path);
    url.push_str(path.trim_end_matches('/'));

    if !ws_path.starts_with('/') {
        url.push('/');
    }
    url.push_str(ws_path);

    Ok(url)
}

/// Append the access token as the `token` query parameter
pub(crate) fn with_token(ws_url: &str, token: &str) -> String {
    let separator = if ws_url.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", ws_url, separator, urlencoding::encode(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_local_http() {
        assert_eq!(
            derive_ws_url("http://localhost:8000/api", DEFAULT_WS_PATH).unwrap(),
            "ws://localhost:8000/ws/notifications/"
        );
    }

    #[test]
    fn test_derive_https() {
        assert_eq!(
            derive_ws_url("https://api.example.com/api", DEFAULT_WS_PATH).unwrap(),
            "wss://api.example.com/ws/notifications/"
        );
    }

    #[test]
    fn test_derive_without_api_suffix() {
        assert_eq!(
            derive_ws_url("http://localhost:8000", DEFAULT_WS_PATH).unwrap(),
            "ws://localhost:8000/ws/notifications/"
        );
        assert_eq!(
            derive_ws_url("https://example.com/", DEFAULT_WS_PATH).unwrap(),
            "wss://example.com/ws/notifications/"
        );
    }

    #[test]
    fn test_derive_keeps_prefix_and_strips_trailing_api_only() {
        assert_eq!(
            derive_ws_url("https://example.com/backend/api/", DEFAULT_WS_PATH).unwrap(),
            "wss://example.com/backend/ws/notifications/"
        );
        assert_eq!(
            derive_ws_url("https://example.com/myapi", DEFAULT_WS_PATH).unwrap(),
            "wss://example.com/myapi/ws/notifications/"
        );
        assert_eq!(
            derive_ws_url("https://example.com/api/v2", DEFAULT_WS_PATH).unwrap(),
            "wss://example.com/api/v2/ws/notifications/"
        );
    }

    #[test]
    fn test_derive_custom_path() {
        assert_eq!(
            derive_ws_url("http://127.0.0.1:9000/api", "ws/alerts/").unwrap(),
            "ws://127.0.0.1:9000/ws/alerts/"
        );
    }

    #[test]
    fn test_derive_accepts_ws_schemes() {
        assert_eq!(
            derive_ws_url("wss://push.example.com", DEFAULT_WS_PATH).unwrap(),
            "wss://push.example.com/ws/notifications/"
        );
    }

    #[test]
    fn test_derive_rejects_bad_input() {
        assert!(matches!(
            derive_ws_url("ftp://example.com/api", DEFAULT_WS_PATH),
            Err(ConnectionError::InvalidUrl { .. })
        ));
        assert!(derive_ws_url("not a url", DEFAULT_WS_PATH).is_err());
    }

    #[test]
    fn test_with_token_encodes() {
        assert_eq!(
            with_token("ws://h/ws/notifications/", "a b+c"),
            "ws://h/ws/notifications/?token=a%20b%2Bc"
        );
        assert_eq!(with_token("ws://h/ws/?v=2", "t"), "ws://h/ws/?v=2&token=t");
    }
}
