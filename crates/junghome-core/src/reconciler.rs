// ── State reconciler ──
//
// Sole owner of the canonical device table. Catalog snapshots and
// single-datapoint deltas are merged here, derived fields recomputed,
// and every change published to the store as a whole new snapshot.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use junghome_api::models::entry_id;
use junghome_api::{Catalog, DatapointUpdate, FunctionPayload};

use crate::fanout::{EntityRegistry, FanOut, TableEvent};
use crate::model::Device;
use crate::store::DeviceStore;

/// What a catalog snapshot did to the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogOutcome {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// `false` when the fast path refreshed devices in place.
    pub diffed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffMode {
    /// Payloads replaced in place, membership untouched.
    FastPath,
    /// New ids are added, missing ids are kept.
    AddOnly,
    /// Membership follows the snapshot exactly.
    Full,
}

pub struct Reconciler {
    table: IndexMap<String, Arc<Device>>,
    membership_pending: bool,
    loaded: bool,
    store: Arc<DeviceStore>,
    fanout: Arc<FanOut>,
    registry: Arc<dyn EntityRegistry>,
}

impl Reconciler {
    pub fn new(
        store: Arc<DeviceStore>,
        fanout: Arc<FanOut>,
        registry: Arc<dyn EntityRegistry>,
    ) -> Self {
        Self {
            table: IndexMap::new(),
            membership_pending: false,
            loaded: false,
            store,
            fanout,
            registry,
        }
    }

    /// `true` once any catalog snapshot has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Record that the gateway announced added or deleted devices; the
    /// next catalog snapshot is diffed for membership.
    pub fn mark_membership_pending(&mut self) {
        self.membership_pending = true;
    }

    // ── Catalog snapshots ────────────────────────────────────────────

    /// Merge a catalog snapshot. Entries that failed to decode keep their
    /// existing table entry, whatever the mode.
    pub fn apply_catalog(&mut self, catalog: impl Into<Catalog>) -> CatalogOutcome {
        let Catalog {
            functions: payloads,
            unparsed,
        } = catalog.into();
        let mode = if !self.loaded || self.membership_pending || self.table.is_empty() {
            DiffMode::Full
        } else if payloads.iter().any(|p| !self.table.contains_key(&p.id)) {
            debug!("catalog carries unknown ids without an announcement, adding them");
            DiffMode::AddOnly
        } else {
            DiffMode::FastPath
        };

        let outcome = if mode == DiffMode::FastPath {
            self.refresh_in_place(payloads)
        } else {
            self.diff(payloads, &unparsed, mode)
        };

        self.loaded = true;
        self.membership_pending = false;
        outcome
    }

    /// Devices whose payload did not change keep their `Arc`, and an
    /// unchanged snapshot publishes nothing.
    fn refresh_in_place(&mut self, payloads: Vec<FunctionPayload>) -> CatalogOutcome {
        let mut count = 0;
        for payload in payloads {
            if let Some(device) = self.table.get_mut(&payload.id) {
                let mut next = Device::clone(device);
                next.absorb(payload);
                if next != **device {
                    *device = Arc::new(next);
                    count += 1;
                }
            }
        }
        if count > 0 {
            self.publish();
            self.fanout.emit(TableEvent::Refreshed { count });
        }
        debug!(changed = count, "catalog refreshed in place");
        CatalogOutcome::default()
    }

    fn diff(
        &mut self,
        payloads: Vec<FunctionPayload>,
        unparsed: &[String],
        mode: DiffMode,
    ) -> CatalogOutcome {
        let mut previous = std::mem::take(&mut self.table);
        let mut next: IndexMap<String, Arc<Device>> = IndexMap::with_capacity(payloads.len());
        let mut added: Vec<Arc<Device>> = Vec::new();

        for payload in payloads {
            if next.contains_key(&payload.id) {
                warn!(device_id = %payload.id, "duplicate id in catalog, keeping the first");
                continue;
            }
            let id = payload.id.clone();
            let device = match previous.shift_remove(&id) {
                Some(mut existing) => {
                    Arc::make_mut(&mut existing).absorb(payload);
                    existing
                }
                None => {
                    let device = Arc::new(Device::from_payload(payload));
                    added.push(Arc::clone(&device));
                    device
                }
            };
            next.insert(id, device);
        }

        // Listed but undecodable: the device is still there.
        for id in unparsed {
            if next.contains_key(id) {
                continue;
            }
            if let Some(existing) = previous.shift_remove(id) {
                debug!(device_id = %id, "keeping previous state of malformed entry");
                next.insert(id.clone(), existing);
            }
        }

        // Whatever is left in `previous` was not in the snapshot.
        let removed: Vec<String> = if mode == DiffMode::Full {
            previous.keys().cloned().collect()
        } else {
            next.extend(previous);
            Vec::new()
        };

        self.table = next;
        self.publish();

        for id in &removed {
            self.registry.retract(id);
        }
        self.fanout.notify_added(&added);

        let added_ids: Vec<String> = added.iter().map(|d| d.id.clone()).collect();
        if !added_ids.is_empty() {
            self.fanout.emit(TableEvent::Added {
                ids: added_ids.clone(),
            });
        }
        if !removed.is_empty() {
            self.fanout.emit(TableEvent::Removed {
                ids: removed.clone(),
            });
        }

        info!(
            total = self.table.len(),
            added = added_ids.len(),
            removed = removed.len(),
            "catalog applied"
        );

        CatalogOutcome {
            added: added_ids,
            removed,
            diffed: true,
        }
    }

    // ── Single-datapoint deltas ──────────────────────────────────────

    /// Apply new values for one datapoint. Returns the owning device id,
    /// or `None` when no device carries that datapoint.
    pub fn apply_delta(&mut self, update: DatapointUpdate) -> Option<String> {
        let device = self
            .table
            .values_mut()
            .find(|d| d.has_datapoint(&update.id));

        let Some(device) = device else {
            debug!(datapoint_id = %update.id, "delta for unknown datapoint, ignoring");
            return None;
        };

        let device = Arc::make_mut(device);
        if let Some(dp) = device.datapoint_mut(&update.id) {
            dp.replace_values(update.values);
        }
        device.rederive();
        let id = device.id.clone();

        self.publish();
        self.fanout.emit(TableEvent::Updated { id: id.clone() });
        Some(id)
    }

    // ── Groups and scenes ────────────────────────────────────────────

    pub fn apply_groups(&self, records: Vec<Value>) {
        let map = key_by_id(records);
        debug!(count = map.len(), "groups snapshot");
        self.store.set_groups(map);
    }

    pub fn apply_scenes(&self, records: Vec<Value>) {
        let map = key_by_id(records);
        debug!(count = map.len(), "scenes snapshot");
        self.store.set_scenes(map);
    }

    fn publish(&self) {
        self.store.publish(self.table.values().cloned().collect());
    }
}

fn key_by_id(records: Vec<Value>) -> IndexMap<String, Value> {
    records
        .into_iter()
        .filter_map(|record| {
            let Some(id) = entry_id(&record) else {
                warn!("record without id, skipping");
                return None;
            };
            Some((id, record))
        })
        .collect()
}
