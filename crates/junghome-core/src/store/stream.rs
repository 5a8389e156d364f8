// ── Table subscriptions ──

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::snapshot::TableSnapshot;

/// A subscription to the device table.
///
/// Gives point-in-time snapshot access plus change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct DeviceStream {
    current: Arc<TableSnapshot>,
    receiver: watch::Receiver<Arc<TableSnapshot>>,
}

impl DeviceStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<TableSnapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed`).
    pub fn current(&self) -> &Arc<TableSnapshot> {
        &self.current
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Arc<TableSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publish. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Arc<TableSnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    pub fn into_stream(self) -> DeviceWatchStream {
        DeviceWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` of table snapshots backed by a `watch::Receiver`.
pub struct DeviceWatchStream {
    inner: WatchStream<Arc<TableSnapshot>>,
}

impl Stream for DeviceWatchStream {
    type Item = Arc<TableSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
