//! Gateway WebSocket connection.
//!
//! One [`GatewaySocket`] is one connection attempt: the upgrade carries the
//! `token` header, a ping goes out every heartbeat interval, and text frames
//! are decoded into `{type, data}` envelopes. Reconnection is the caller's
//! job; this type never retries.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::Error;
use crate::transport::TOKEN_HEADER;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── RawFrame ─────────────────────────────────────────────────────────

/// Envelope of every text frame the gateway sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

// ── GatewaySocket ────────────────────────────────────────────────────

/// A live socket to the gateway.
pub struct GatewaySocket {
    stream: WsStream,
    ping: Interval,
    pong_timeout: Duration,
    pong_deadline: Option<Instant>,
}

impl GatewaySocket {
    /// Open the socket at `url` (already carrying the `t=` query).
    ///
    /// `connector` of `None` uses tokio-tungstenite's default TLS setup.
    pub async fn connect(
        url: &Url,
        token: &SecretString,
        connector: Option<Connector>,
        heartbeat: Duration,
    ) -> Result<Self, Error> {
        tracing::info!(url = %url, "Connecting to gateway socket");

        let uri: tungstenite::http::Uri = url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

        let request =
            ClientRequestBuilder::new(uri).with_header(TOKEN_HEADER, token.expose_secret());

        let (stream, _response) =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, connector)
                .await
                .map_err(|e| match e {
                    tungstenite::Error::Http(resp) if resp.status().as_u16() == 401 => {
                        Error::Authentication {
                            message: "token rejected during socket upgrade".into(),
                        }
                    }
                    other => Error::WebSocketConnect(other.to_string()),
                })?;

        tracing::info!("Gateway socket connected");

        let heartbeat = heartbeat.max(Duration::from_millis(10));
        let mut ping = tokio::time::interval(heartbeat);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping.reset(); // skip immediate first tick

        Ok(Self {
            stream,
            ping,
            pong_timeout: heartbeat / 2,
            pong_deadline: None,
        })
    }

    /// Wait for the next decoded frame.
    ///
    /// - `Some(Ok(frame))`: a decoded envelope.
    /// - `Some(Err(e))` with `e.is_decode()`: one bad frame; the socket is
    ///   still usable.
    /// - `Some(Err(e))` otherwise: the connection is dead.
    /// - `None`: the gateway closed the socket.
    pub async fn next_frame(&mut self) -> Option<Result<RawFrame, Error>> {
        loop {
            let pong_deadline = self.pong_deadline;
            tokio::select! {
                msg = self.stream.next() => {
                    self.pong_deadline = None;
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            return Some(decode_frame(text.as_str()));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            log_close(frame.as_ref());
                            return None;
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                            // tungstenite answers pings itself
                            tracing::trace!("socket keepalive");
                        }
                        Some(Ok(_)) => {} // Binary, Frame
                        Some(Err(e)) => {
                            return Some(Err(Error::WebSocketClosed {
                                code: 1006,
                                reason: e.to_string(),
                            }));
                        }
                        None => {
                            tracing::info!("Gateway socket stream ended");
                            return None;
                        }
                    }
                }

                _ = self.ping.tick() => {
                    if let Err(e) = self.stream.send(Message::Ping(Default::default())).await {
                        return Some(Err(Error::WebSocketClosed {
                            code: 1006,
                            reason: format!("failed to send ping: {e}"),
                        }));
                    }
                    if self.pong_deadline.is_none() {
                        self.pong_deadline = Some(Instant::now() + self.pong_timeout);
                    }
                }

                () = tokio::time::sleep_until(pong_deadline.unwrap_or_else(Instant::now)),
                    if pong_deadline.is_some() =>
                {
                    tracing::warn!(
                        timeout_ms = u64::try_from(self.pong_timeout.as_millis()).unwrap_or(u64::MAX),
                        "Gateway socket heartbeat timed out"
                    );
                    return Some(Err(Error::WebSocketClosed {
                        code: 1006,
                        reason: "heartbeat timeout".into(),
                    }));
                }
            }
        }
    }

    /// Send a close frame. Errors are ignored; the socket is going away.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "error while closing gateway socket");
        }
    }
}

fn decode_frame(text: &str) -> Result<RawFrame, Error> {
    serde_json::from_str(text).map_err(|e| {
        tracing::warn!(error = %e, raw = %text, "Failed to decode socket frame");
        Error::decode(&e, text)
    })
}

fn log_close(frame: Option<&CloseFrame>) {
    if let Some(cf) = frame {
        tracing::info!(code = %cf.code, reason = %cf.reason, "Gateway socket closed");
    } else {
        tracing::info!("Gateway socket closed (no payload)");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_envelope() {
        let frame = decode_frame(r#"{"type":"datapoint","data":{"id":"dp1","values":[]}}"#).unwrap();
        assert_eq!(frame.kind, "datapoint");
        assert_eq!(frame.data, json!({ "id": "dp1", "values": [] }));
    }

    #[test]
    fn missing_data_is_null() {
        let frame = decode_frame(r#"{"type":"version"}"#).unwrap();
        assert_eq!(frame.kind, "version");
        assert!(frame.data.is_null());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_frame("not json at all").unwrap_err();
        assert!(err.is_decode());
    }
}
