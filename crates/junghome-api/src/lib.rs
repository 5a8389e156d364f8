// junghome-api: Async Rust client for the JUNG HOME gateway (REST + WebSocket)

pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod websocket;

pub use client::GatewayClient;
pub use error::Error;
pub use models::{
    Catalog, DatapointPayload, DatapointUpdate, DatapointValues, FunctionPayload, HubConfig, KeyValue,
    PatchBody, PatchOutcome,
};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{GatewaySocket, RawFrame};
