// ── Domain model ──
//
// Canonical representation of gateway functions (devices), their
// datapoints, consumer categories, and hub information.

pub mod category;
pub mod device;
pub mod hub;

pub use category::Category;
pub use device::{
    Datapoint, DatapointKind, DatapointValue, DerivedState, Device, DeviceType, LevelMove,
    Quantity, QuantityKind,
};
pub use hub::HubInfo;
