// ── Subscription fan-out ──
//
// Category-keyed callback registry plus a broadcast of table events.
// Removals bypass the registry and go to the `EntityRegistry`
// collaborator, which owns whatever entities consumers built per device.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::model::{Category, Device};

const EVENT_CHANNEL_SIZE: usize = 256;

/// Callback invoked with the newly added devices of one category.
///
/// Runs on the reconciler task, so it must not block.
pub type CategoryCallback = Arc<dyn Fn(&[Arc<Device>]) + Send + Sync>;

/// Change notifications for the whole table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    /// Devices entered the table.
    Added { ids: Vec<String> },
    /// Devices left the table.
    Removed { ids: Vec<String> },
    /// One device changed through a datapoint delta.
    Updated { id: String },
    /// A catalog snapshot changed `count` existing devices in place.
    Refreshed { count: usize },
}

/// Owner of consumer-side entities. Told to drop entities whose identity
/// matches a device that left the table.
pub trait EntityRegistry: Send + Sync {
    fn retract(&self, device_id: &str);
}

/// Registry that only logs; used when no host platform is attached.
#[derive(Debug, Default)]
pub struct LoggingRegistry;

impl EntityRegistry for LoggingRegistry {
    fn retract(&self, device_id: &str) {
        debug!(device_id, "device removed, no entity registry attached");
    }
}

pub struct FanOut {
    callbacks: RwLock<HashMap<Category, Vec<CategoryCallback>>>,
    events: broadcast::Sender<TableEvent>,
}

impl FanOut {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            callbacks: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Register `callback` for devices of `category`.
    pub fn register(&self, category: Category, callback: CategoryCallback) {
        match self.callbacks.write() {
            Ok(mut map) => map.entry(category).or_default().push(callback),
            Err(poisoned) => poisoned
                .into_inner()
                .entry(category)
                .or_default()
                .push(callback),
        }
    }

    /// Invoke every callback whose category matches at least one of
    /// `devices`, passing only the matching subset.
    pub fn notify_added(&self, devices: &[Arc<Device>]) {
        if devices.is_empty() {
            return;
        }
        let map = match self.callbacks.read() {
            Ok(map) => map,
            Err(poisoned) => {
                warn!("callback registry lock poisoned, continuing");
                poisoned.into_inner()
            }
        };
        for (category, callbacks) in map.iter() {
            let matching: Vec<Arc<Device>> = devices
                .iter()
                .filter(|d| category.matches(d))
                .cloned()
                .collect();
            if matching.is_empty() {
                continue;
            }
            debug!(%category, count = matching.len(), "notifying category callbacks");
            for callback in callbacks {
                callback(&matching);
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: TableEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new()
    }
}
