// ── Hub (gateway) information ──

use serde::Serialize;

use junghome_api::HubConfig;

/// Gateway identity and health, derived from the hub configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HubInfo {
    pub serial: Option<String>,
    pub version: Option<String>,
    pub ip_address: Option<String>,
    pub cloud_username: Option<String>,
    pub cloud_registered: bool,
    /// The gateway reports a cloud error.
    pub cloud_problem: bool,
    /// No IP error is reported.
    pub connected: bool,
    /// The firmware is not up to date.
    pub update_available: bool,
    pub raw: HubConfig,
}

impl HubInfo {
    /// `"registered"` or `"not_registered"`.
    pub fn cloud_state(&self) -> &'static str {
        if self.cloud_registered {
            "registered"
        } else {
            "not_registered"
        }
    }
}

impl From<HubConfig> for HubInfo {
    fn from(cfg: HubConfig) -> Self {
        let version = match (&cfg.version_release, &cfg.version_build) {
            (Some(release), Some(build)) if !build.is_empty() => Some(format!("{release} ({build})")),
            (Some(release), _) => Some(release.clone()),
            (None, build) => build.clone(),
        };
        Self {
            serial: cfg.system_serial.clone(),
            version,
            ip_address: cfg.ip_address.clone(),
            cloud_username: cfg.cloud_username.clone(),
            cloud_registered: cfg.cloud_register.unwrap_or(false),
            cloud_problem: cfg.cloud_error.unwrap_or(false),
            connected: !cfg.ip_error.unwrap_or(false),
            update_available: !cfg.version_up_to_date.unwrap_or(true),
            raw: cfg,
        }
    }
}
