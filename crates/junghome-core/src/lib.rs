// junghome-core: Device-state synchronization between junghome-api and consumers.

pub mod command;
pub mod config;
pub mod derive;
pub mod error;
pub mod fanout;
pub mod gateway;
pub mod model;
pub mod reconciler;
pub mod router;
pub mod store;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{GatewayConfig, TlsVerification};
pub use error::CoreError;
pub use fanout::{CategoryCallback, EntityRegistry, LoggingRegistry, TableEvent};
pub use gateway::Gateway;
pub use store::{DeviceStore, DeviceStream, OpaqueRecords, TableSnapshot};
pub use supervisor::ConnectionState;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Category, Datapoint, DatapointKind, DatapointValue, DerivedState, Device, DeviceType, HubInfo,
    LevelMove, Quantity, QuantityKind,
};
