// ── Runtime connection configuration ──
//
// Describes *how* to reach one gateway. Carries the token and connection
// tuning but never touches disk; the CLI builds a `GatewayConfig` from
// its profile and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use junghome_api::transport::{TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Bundled web PKI roots (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Gateways ship a self-signed certificate, so this
    /// is the default.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one gateway connection.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway base URL (e.g., `https://192.168.1.20`).
    pub url: Url,
    /// Static token sent in the `token` header.
    pub token: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Fixed pause between socket reconnection attempts.
    pub reconnect_delay: Duration,
    /// Socket ping interval.
    pub heartbeat_interval: Duration,
    /// How often to re-read the hub configuration (seconds). 0 = never.
    pub hub_refresh_interval_secs: u64,
    /// How often to poll the catalog over HTTP while the socket is down
    /// (seconds). 0 = never.
    pub catalog_refresh_interval_secs: u64,
    /// Run the socket supervisor. Off for one-shot HTTP reads.
    pub socket_enabled: bool,
}

impl GatewayConfig {
    /// Config for `url` with every tuning knob at its default.
    pub fn new(url: Url, token: SecretString) -> Self {
        Self {
            url,
            token,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(30),
            hub_refresh_interval_secs: 300,
            catalog_refresh_interval_secs: 30,
            socket_enabled: true,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
