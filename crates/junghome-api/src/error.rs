use thiserror::Error;

/// Top-level error type for the `junghome-api` crate.
///
/// Covers every failure mode of the gateway surfaces: REST requests,
/// TLS setup, the WebSocket stream, and payload decoding.
/// `junghome-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The gateway rejected the token (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status other than 401/404.
    #[error("Gateway returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The requested function or datapoint does not exist (HTTP 404).
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the gateway rejected the token.
    ///
    /// Auth failures are never retried automatically.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` for network-level failures worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500,
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Status { status: 404, .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// Returns `true` if a payload or frame could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }

    /// HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn decode(err: &serde_json::Error, body: &str) -> Self {
        let preview: String = body.chars().take(200).collect();
        Self::Deserialization {
            message: format!("{err} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn auth_is_not_transient() {
        let err = Error::Authentication {
            message: "bad token".into(),
        };
        assert!(err.is_auth());
        assert!(!err.is_transient());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Status {
            status: 503,
            message: "busy".into(),
        };
        assert!(err.is_transient());

        let err = Error::Status {
            status: 400,
            message: "bad request".into(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn decode_error_keeps_body_and_truncates_preview() {
        let body = "x".repeat(500);
        let parse_err = serde_json::from_str::<serde_json::Value>(&body).unwrap_err();
        let err = Error::decode(&parse_err, &body);

        assert!(err.is_decode());
        match err {
            Error::Deserialization { message, body: kept } => {
                assert_eq!(kept.len(), 500);
                assert!(message.len() < 400, "preview should be truncated: {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
