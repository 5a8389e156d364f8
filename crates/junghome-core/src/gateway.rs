// ── Gateway abstraction ──
//
// Full lifecycle management for one JUNG HOME gateway: initial catalog
// load, the socket supervisor, command routing, periodic hub and catalog
// refresh, and read/subscribe access to the published device table.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use junghome_api::GatewayClient;

use crate::command::{self, Command, CommandEnvelope, CommandResult};
use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::fanout::{CategoryCallback, EntityRegistry, FanOut, LoggingRegistry, TableEvent};
use crate::model::{Category, DatapointValue, Device, HubInfo};
use crate::reconciler::Reconciler;
use crate::store::{DeviceStore, DeviceStream, OpaqueRecords};
use crate::supervisor::{ConnectionState, Liveness, Supervisor};

const COMMAND_CHANNEL_SIZE: usize = 64;
const HUB_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Gateway ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<GatewayInner>`. Register category callbacks
/// before [`connect()`](Self::connect) so the initial catalog reaches them.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    config: GatewayConfig,
    client: GatewayClient,
    store: Arc<DeviceStore>,
    fanout: Arc<FanOut>,
    registry: Arc<dyn EntityRegistry>,
    liveness: Arc<Liveness>,
    hub: watch::Sender<Option<Arc<HubInfo>>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Gateway {
    /// Create a gateway handle. Does NOT connect.
    pub fn new(config: GatewayConfig) -> Result<Self, CoreError> {
        Self::with_registry(config, Arc::new(LoggingRegistry))
    }

    /// Like [`new`](Self::new), with a collaborator that retracts
    /// consumer entities when devices leave the table.
    pub fn with_registry(
        config: GatewayConfig,
        registry: Arc<dyn EntityRegistry>,
    ) -> Result<Self, CoreError> {
        let client = GatewayClient::new(config.url.clone(), &config.token, &config.transport())?;
        let (hub, _) = watch::channel(None);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(GatewayInner {
                config,
                client,
                store: Arc::new(DeviceStore::new()),
                fanout: Arc::new(FanOut::new()),
                registry,
                liveness: Arc::new(Liveness::new()),
                hub,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DeviceStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Load the device catalog over HTTP and start the background tasks:
    /// socket supervisor, command processor, hub refresh and the catalog
    /// poll that covers socket outages.
    ///
    /// A failed initial load (unreachable gateway, rejected token) is
    /// returned as-is; later failures are logged and retried.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Err(CoreError::Internal(
                "gateway was disconnected; create a new handle".into(),
            ));
        }
        let Some(command_rx) = inner.command_rx.lock().await.take() else {
            debug!("connect called twice, ignoring");
            return Ok(());
        };

        inner.liveness.set(ConnectionState::Connecting);
        let catalog = match inner.client.list_functions().await {
            Ok(catalog) => catalog,
            Err(e) => {
                inner.liveness.set(ConnectionState::Disconnected);
                *inner.command_rx.lock().await = Some(command_rx);
                return Err(e.into());
            }
        };

        let mut reconciler = Reconciler::new(
            Arc::clone(&inner.store),
            Arc::clone(&inner.fanout),
            Arc::clone(&inner.registry),
        );
        reconciler.apply_catalog(catalog);
        let reconciler = Arc::new(Mutex::new(reconciler));

        if let Err(e) = self.refresh_hub_info().await {
            warn!(error = %e, "initial hub configuration read failed");
        }

        let mut handles = inner.task_handles.lock().await;
        handles.push(tokio::spawn(command_processor_task(self.clone(), command_rx)));

        if inner.config.socket_enabled {
            let supervisor = Supervisor::new(
                inner.client.clone(),
                inner.config.clone(),
                Arc::clone(&reconciler),
                Arc::clone(&inner.liveness),
                inner.cancel.child_token(),
            );
            handles.push(tokio::spawn(supervisor.run()));
        } else {
            inner.liveness.set(ConnectionState::Disconnected);
        }

        let interval_secs = inner.config.hub_refresh_interval_secs;
        if interval_secs > 0 {
            let gateway = self.clone();
            let cancel = inner.cancel.clone();
            handles.push(tokio::spawn(hub_refresh_task(gateway, interval_secs, cancel)));
        }

        let interval_secs = inner.config.catalog_refresh_interval_secs;
        if interval_secs > 0 {
            let gateway = self.clone();
            let cancel = inner.cancel.clone();
            handles.push(tokio::spawn(catalog_refresh_task(
                gateway,
                reconciler,
                interval_secs,
                cancel,
            )));
        }

        info!(devices = inner.store.len(), url = %inner.config.url, "gateway ready");
        Ok(())
    }

    /// Stop every background task and close the socket. Safe to call
    /// more than once, and while a reconnect is in flight.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }

        self.inner.liveness.set(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// One-shot: load the catalog over HTTP, run `f`, disconnect.
    ///
    /// No socket and no periodic refresh; commands are unavailable.
    pub async fn oneshot<F, Fut, T>(config: GatewayConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Gateway) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.socket_enabled = false;
        cfg.hub_refresh_interval_secs = 0;
        cfg.catalog_refresh_interval_secs = 0;

        let gateway = Gateway::new(cfg)?;
        gateway.connect().await?;
        let result = f(gateway.clone()).await;
        gateway.disconnect().await;
        result
    }

    /// Wait until the socket is live, up to `timeout`.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), CoreError> {
        let mut rx = self.inner.liveness.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(|s| *s == ConnectionState::Connected)).await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(CoreError::GatewayDisconnected),
            Err(_) => Err(CoreError::Timeout),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Execute a write. Rejected while the socket is down; the table only
    /// changes once the gateway confirms through a `datapoint` frame.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if !self.is_connected() {
            return Err(CoreError::GatewayDisconnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::GatewayDisconnected)?;

        rx.await.map_err(|_| CoreError::GatewayDisconnected)?
    }

    // ── Direct reads ─────────────────────────────────────────────────

    /// Current values of one datapoint, straight from the gateway.
    pub async fn read_datapoint(
        &self,
        device_id: &str,
        datapoint_id: &str,
    ) -> Result<Vec<DatapointValue>, CoreError> {
        let values = self.inner.client.datapoint(device_id, datapoint_id).await?;
        Ok(values.values.into_iter().map(DatapointValue::from).collect())
    }

    /// `true` when the catalog endpoint answers with this token.
    pub async fn test_connection(&self) -> bool {
        match self.inner.client.list_functions().await {
            Ok(catalog) => {
                debug!(count = catalog.functions.len(), "connection test succeeded");
                true
            }
            Err(e) => {
                warn!(error = %e, "connection test failed");
                false
            }
        }
    }

    /// Re-read the hub configuration and publish it.
    pub async fn refresh_hub_info(&self) -> Result<Arc<HubInfo>, CoreError> {
        let config = self.inner.client.hub_config().await?;
        let info = Arc::new(HubInfo::from(config));
        self.inner.hub.send_replace(Some(Arc::clone(&info)));
        Ok(info)
    }

    // ── State observation ────────────────────────────────────────────

    /// Non-blocking liveness of the socket.
    pub fn is_connected(&self) -> bool {
        self.inner.liveness.is_connected()
    }

    pub fn current_state(&self) -> ConnectionState {
        self.inner.liveness.current()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.liveness.subscribe()
    }

    pub fn get_device(&self, id: &str) -> Option<Arc<Device>> {
        self.inner.store.get(id)
    }

    pub fn list_devices(&self) -> Vec<Arc<Device>> {
        self.inner.store.list()
    }

    /// Subscribe to published table snapshots.
    pub fn devices(&self) -> DeviceStream {
        self.inner.store.subscribe()
    }

    pub fn register_category_callback(&self, category: Category, callback: CategoryCallback) {
        self.inner.fanout.register(category, callback);
    }

    pub fn events(&self) -> broadcast::Receiver<TableEvent> {
        self.inner.fanout.subscribe()
    }

    pub fn groups(&self) -> Arc<OpaqueRecords> {
        self.inner.store.groups()
    }

    pub fn scenes(&self) -> Arc<OpaqueRecords> {
        self.inner.store.scenes()
    }

    /// Last hub configuration read, if any succeeded.
    pub fn hub_info(&self) -> Option<Arc<HubInfo>> {
        self.inner.hub.borrow().clone()
    }

    pub fn hub_updates(&self) -> watch::Receiver<Option<Arc<HubInfo>>> {
        self.inner.hub.subscribe()
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodically re-read the hub configuration.
async fn hub_refresh_task(gateway: Gateway, interval_secs: u64, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match tokio::time::timeout(HUB_REQUEST_TIMEOUT, gateway.refresh_hub_info()).await {
                    Ok(Ok(_)) => debug!("hub configuration refreshed"),
                    Ok(Err(e)) => warn!(error = %e, "hub refresh failed"),
                    Err(_) => warn!("hub refresh timed out"),
                }
            }
        }
    }
}

/// Poll the catalog over HTTP while the socket is down. Live sessions
/// are left to the socket's own frames.
async fn catalog_refresh_task(
    gateway: Gateway,
    reconciler: Arc<Mutex<Reconciler>>,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if gateway.is_connected() {
                    continue;
                }
                match gateway.inner.client.list_functions().await {
                    Ok(catalog) => {
                        let outcome = reconciler.lock().await.apply_catalog(catalog);
                        debug!(added = outcome.added.len(), "catalog polled over HTTP");
                    }
                    Err(e) => warn!(error = %e, "catalog poll failed"),
                }
            }
        }
    }
}

/// Serve commands from the channel one at a time.
async fn command_processor_task(gateway: Gateway, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = gateway.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result =
                    command::route_command(&gateway.inner.client, &gateway.inner.store, envelope.command)
                        .await;
                if let Err(ref e) = result {
                    warn!(error = %e, "command failed");
                }
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}
