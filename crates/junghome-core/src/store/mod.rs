// ── Published device table ──
//
// Lock-free reads of the last published table, with push-based change
// notification for subscribers.

mod device_store;
mod snapshot;
mod stream;

pub use device_store::{DeviceStore, OpaqueRecords};
pub use snapshot::TableSnapshot;
pub use stream::{DeviceStream, DeviceWatchStream};
