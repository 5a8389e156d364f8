// ── Reconnection supervisor ──
//
// Keeps one socket alive for the lifetime of a `Gateway`. Each attempt
// primes the gateway with a catalog GET, opens the socket with a fresh
// timestamp, and feeds frames to the reconciler until the socket dies.
// Then it waits a fixed delay and starts over. Only cancellation (or a
// rejected token) ends the loop. The reconciler is shared with the HTTP
// catalog poll, which only writes while the socket is down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use junghome_api::{GatewayClient, GatewaySocket, TransportConfig};

use crate::config::GatewayConfig;
use crate::reconciler::Reconciler;
use crate::router;

// ── ConnectionState ──────────────────────────────────────────────────

/// Socket connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Connection state plus a flag readable without touching the channel.
pub(crate) struct Liveness {
    connected: AtomicBool,
    state: watch::Sender<ConnectionState>,
}

impl Liveness {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connected: AtomicBool::new(false),
            state,
        }
    }

    pub(crate) fn set(&self, next: ConnectionState) {
        self.connected
            .store(next == ConnectionState::Connected, Ordering::Release);
        self.state.send_if_modified(|current| {
            let changed = *current != next;
            *current = next;
            changed
        });
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

// ── Supervisor ───────────────────────────────────────────────────────

/// How one socket session ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Cancelled; leave the loop.
    Stopped,
    /// The socket died or never opened; retry after the delay.
    Lost,
    /// The gateway rejected the token; retrying cannot help.
    Rejected,
}

pub(crate) struct Supervisor {
    client: GatewayClient,
    transport: TransportConfig,
    config: GatewayConfig,
    reconciler: Arc<Mutex<Reconciler>>,
    liveness: Arc<Liveness>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub(crate) fn new(
        client: GatewayClient,
        config: GatewayConfig,
        reconciler: Arc<Mutex<Reconciler>>,
        liveness: Arc<Liveness>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            transport: config.transport(),
            config,
            reconciler,
            liveness,
            cancel,
        }
    }

    /// Run until cancelled.
    pub(crate) async fn run(mut self) {
        loop {
            self.liveness.set(ConnectionState::Connecting);

            match self.session().await {
                SessionEnd::Stopped => break,
                SessionEnd::Rejected => {
                    error!("gateway rejected the token, not reconnecting");
                    break;
                }
                SessionEnd::Lost => {}
            }

            self.liveness.set(ConnectionState::Disconnected);
            let delay = self.config.reconnect_delay;
            info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Waiting before reconnect"
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.liveness.set(ConnectionState::Disconnected);
        let devices = self.reconciler.lock().await.len();
        debug!(devices, "supervisor exiting");
    }

    async fn session(&mut self) -> SessionEnd {
        if self.prime().await.is_none() {
            return SessionEnd::Stopped;
        }

        let connecting = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            socket = self.open() => Some(socket),
        };
        let mut socket = match connecting {
            None => return SessionEnd::Stopped,
            Some(Ok(socket)) => socket,
            Some(Err(e)) if e.is_auth() => return SessionEnd::Rejected,
            Some(Err(e)) => {
                warn!(error = %e, "gateway socket connect failed");
                return SessionEnd::Lost;
            }
        };

        self.liveness.set(ConnectionState::Connected);
        info!("gateway socket live");

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                frame = socket.next_frame() => Some(frame),
            };
            let Some(frame) = next else {
                socket.close().await;
                return SessionEnd::Stopped;
            };

            match frame {
                Some(Ok(raw)) => match router::classify(raw) {
                    Ok(frame) => router::route(frame, &mut *self.reconciler.lock().await),
                    Err(e) => warn!(error = %e, "dropping frame"),
                },
                Some(Err(e)) if e.is_decode() => {}
                Some(Err(e)) => {
                    warn!(error = %e, "gateway socket failed");
                    return SessionEnd::Lost;
                }
                None => {
                    info!("gateway socket closed");
                    return SessionEnd::Lost;
                }
            }
        }
    }

    /// Best-effort catalog GET ahead of the socket. The gateway fills its
    /// socket-side cache from it, and the result catches the table up on
    /// whatever changed while the socket was down. `None` when cancelled.
    async fn prime(&mut self) -> Option<()> {
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return None,
            result = self.client.list_functions() => result,
        };
        match result {
            Ok(catalog) => {
                let mut reconciler = self.reconciler.lock().await;
                if reconciler.is_loaded() {
                    debug!(count = catalog.functions.len(), "priming request succeeded");
                } else {
                    info!(count = catalog.functions.len(), "device table loaded over HTTP");
                }
                reconciler.apply_catalog(catalog);
            }
            Err(e) => warn!(error = %e, "priming request failed, connecting anyway"),
        }
        Some(())
    }

    async fn open(&self) -> Result<GatewaySocket, junghome_api::Error> {
        let url = self.client.ws_url(Utc::now().timestamp_millis())?;
        let connector = self.transport.ws_connector()?;
        GatewaySocket::connect(
            &url,
            &self.config.token,
            connector,
            heartbeat(self.config.heartbeat_interval),
        )
        .await
    }
}

fn heartbeat(interval: Duration) -> Duration {
    if interval.is_zero() {
        Duration::from_secs(30)
    } else {
        interval
    }
}
