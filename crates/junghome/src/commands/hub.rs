//! Hub information and connection test.

use std::sync::Arc;

use serde::Serialize;

use junghome_core::{Gateway, HubInfo};

use crate::cli::GlobalOpts;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

fn yes_no(b: bool) -> String {
    let word = if b { "yes" } else { "no" };
    word.to_owned()
}

fn hub_detail(h: &Arc<HubInfo>) -> String {
    let dash = || "-".to_owned();
    output::detail_lines(&[
        ("Serial", h.serial.clone().unwrap_or_else(dash)),
        ("Version", h.version.clone().unwrap_or_else(dash)),
        ("IP address", h.ip_address.clone().unwrap_or_else(dash)),
        ("Network", if h.connected { "ok" } else { "error" }.to_owned()),
        ("Cloud", h.cloud_state().to_owned()),
        ("Cloud user", h.cloud_username.clone().unwrap_or_else(dash)),
        ("Cloud error", yes_no(h.cloud_problem)),
        ("Update available", yes_no(h.update_available)),
    ])
}

/// `junghome hub`
pub async fn show(resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let info = Gateway::oneshot(resolved.gateway, |gw| async move {
        match gw.hub_info() {
            Some(info) => Ok(info),
            None => gw.refresh_hub_info().await,
        }
    })
    .await?;

    let out = output::render_single(&resolved.format, &info, hub_detail, |h| {
        h.serial.clone().unwrap_or_default()
    })?;
    output::print_output(&out, global.quiet)
}

#[derive(Serialize)]
struct TestReport {
    url: String,
    profile: String,
    devices: usize,
    serial: Option<String>,
}

/// `junghome test`
pub async fn test(resolved: Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let url = resolved.gateway.url.to_string();
    let (devices, serial) = Gateway::oneshot(resolved.gateway, |gw| async move {
        let serial = gw.hub_info().and_then(|h| h.serial.clone());
        Ok((gw.list_devices().len(), serial))
    })
    .await?;

    let report = TestReport {
        url,
        profile: resolved.profile,
        devices,
        serial,
    };
    let out = output::render_single(
        &resolved.format,
        &report,
        |r| format!("Connected to {} ({} devices)", r.url, r.devices),
        |_| "ok".to_owned(),
    )?;
    output::print_output(&out, global.quiet)
}
