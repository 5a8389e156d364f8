use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::model::Device;

/// One immutable version of the device table.
///
/// Readers always see a whole snapshot; the reconciler builds a new one
/// for every change and swaps it in.
#[derive(Debug, Clone, Default)]
pub struct TableSnapshot {
    devices: Vec<Arc<Device>>,
    index: HashMap<String, usize>,
    version: u64,
    published_at: Option<DateTime<Utc>>,
}

impl TableSnapshot {
    pub(crate) fn new(devices: Vec<Arc<Device>>, version: u64) -> Self {
        let index = devices
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        Self {
            devices,
            index,
            version,
            published_at: Some(Utc::now()),
        }
    }

    /// Devices in catalog order.
    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Device>> {
        self.index.get(id).and_then(|&i| self.devices.get(i))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Monotonic publish counter; 0 means nothing was ever published.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}
