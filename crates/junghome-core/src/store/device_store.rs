// ── Device store ──
//
// Single writer (the reconciler), many readers. Reads go through `ArcSwap`
// and never block; subscribers are woken through a `watch` channel.

use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::watch;

use super::snapshot::TableSnapshot;
use super::stream::DeviceStream;
use crate::model::Device;

/// Opaque group or scene records keyed by their id.
pub type OpaqueRecords = IndexMap<String, Value>;

pub struct DeviceStore {
    current: ArcSwap<TableSnapshot>,
    snapshot: watch::Sender<Arc<TableSnapshot>>,
    groups: ArcSwap<OpaqueRecords>,
    scenes: ArcSwap<OpaqueRecords>,
}

impl DeviceStore {
    pub fn new() -> Self {
        let empty = Arc::new(TableSnapshot::default());
        let (snapshot, _) = watch::channel(Arc::clone(&empty));
        Self {
            current: ArcSwap::new(empty),
            snapshot,
            groups: ArcSwap::from_pointee(IndexMap::new()),
            scenes: ArcSwap::from_pointee(IndexMap::new()),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The last published table.
    pub fn snapshot(&self) -> Arc<TableSnapshot> {
        self.current.load_full()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Device>> {
        self.current.load().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<Device>> {
        self.current.load().devices().to_vec()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    pub fn groups(&self) -> Arc<OpaqueRecords> {
        self.groups.load_full()
    }

    pub fn scenes(&self) -> Arc<OpaqueRecords> {
        self.scenes.load_full()
    }

    pub fn subscribe(&self) -> DeviceStream {
        DeviceStream::new(self.snapshot.subscribe())
    }

    // ── Writes (reconciler only) ─────────────────────────────────────

    /// Publish a new table version. Returns the version number.
    pub(crate) fn publish(&self, devices: Vec<Arc<Device>>) -> u64 {
        let version = self.current.load().version() + 1;
        let snap = Arc::new(TableSnapshot::new(devices, version));
        self.current.store(Arc::clone(&snap));
        // `send_replace` updates unconditionally, even with zero receivers.
        self.snapshot.send_replace(snap);
        version
    }

    pub(crate) fn set_groups(&self, groups: OpaqueRecords) {
        self.groups.store(Arc::new(groups));
    }

    pub(crate) fn set_scenes(&self, scenes: OpaqueRecords) {
        self.scenes.store(Arc::new(scenes));
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use junghome_api::FunctionPayload;
    use serde_json::json;

    fn device(id: &str) -> Arc<Device> {
        let payload: FunctionPayload =
            serde_json::from_value(json!({ "id": id, "type": "OnOff", "label": id })).unwrap();
        Arc::new(Device::from_payload(payload))
    }

    #[test]
    fn starts_empty_and_unpublished() {
        let store = DeviceStore::new();
        assert!(store.is_empty());
        assert_eq!(store.snapshot().version(), 0);
        assert!(store.snapshot().published_at().is_none());
    }

    #[test]
    fn publish_swaps_whole_table() {
        let store = DeviceStore::new();
        let before = store.snapshot();

        store.publish(vec![device("a"), device("b")]);

        assert!(before.is_empty(), "old snapshot is never mutated");
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("b").unwrap().label, "b");
        assert_eq!(store.snapshot().version(), 1);
        assert!(store.get("c").is_none());
    }

    #[tokio::test]
    async fn subscribers_see_new_versions() {
        let store = DeviceStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        store.publish(vec![device("a")]);

        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(stream.current().version(), 1);
    }
}
