//! Device list, detail, and direct datapoint reads.

use std::str::FromStr;
use std::sync::Arc;

use tabled::Tabled;

use junghome_core::{Category, CoreError, DatapointValue, Device, Gateway, LevelMove};
use junghome_core::derive::percent_from_brightness;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

// ── Table rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "State")]
    state: String,
}

fn device_row(d: &Arc<Device>) -> DeviceRow {
    DeviceRow {
        id: d.id.clone(),
        label: d.label.clone(),
        device_type: d.device_type.to_string(),
        state: state_summary(d),
    }
}

#[derive(Tabled)]
struct ValueRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// One-line human summary of a device's derived state.
pub fn state_summary(d: &Device) -> String {
    if !d.available() {
        return "unavailable".into();
    }

    let t = &d.device_type;
    let mut summary = if t.is_cover() {
        match d.level_move() {
            LevelMove::Idle => format!("{}% open", d.current_position()),
            LevelMove::Opening => format!("{}% open, opening", d.current_position()),
            LevelMove::Closing => format!("{}% open, closing", d.current_position()),
        }
    } else if t.is_dimmable() && d.is_on() {
        format!("on {}%", percent_from_brightness(d.brightness()))
    } else if t.has_switch() {
        let word = if d.is_on() { "on" } else { "off" };
        word.to_owned()
    } else {
        "-".to_owned()
    };

    for q in d.quantities() {
        match q.value {
            Some(v) => summary.push_str(&format!(", {v} {}", q.unit)),
            None => summary.push_str(&format!(", ? {}", q.unit)),
        }
    }
    summary
}

fn detail(d: &Arc<Device>) -> String {
    let mut out = output::detail_lines(&[
        ("ID", d.id.clone()),
        ("Label", d.label.clone()),
        ("Type", d.device_type.to_string()),
        ("State", state_summary(d)),
    ]);
    for dp in d.datapoints() {
        let values = dp
            .values
            .iter()
            .map(|v| format!("{}={}", v.key, v.value))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&format!("\n  {} [{}] {values}", dp.id, dp.kind));
    }
    out
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(
    resolved: Resolved,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let format = resolved.format;

    match args.command {
        DevicesCommand::List(list) => {
            let category = list
                .category
                .as_deref()
                .map(|c| {
                    Category::from_str(c).map_err(|_| CliError::Validation {
                        field: "category".into(),
                        reason: format!("unknown category '{c}'"),
                    })
                })
                .transpose()?;

            let devices = Gateway::oneshot(resolved.gateway, |gw| async move {
                Ok(gw.list_devices())
            })
            .await?;

            let devices: Vec<Arc<Device>> = devices
                .into_iter()
                .filter(|d| category.is_none_or(|c| c.matches(d)))
                .collect();

            let out = output::render_list(&format, &devices, device_row, |d| d.id.clone())?;
            output::print_output(&out, global.quiet)
        }

        DevicesCommand::Get { device } => {
            let found = Gateway::oneshot(resolved.gateway, |gw| async move {
                gw.get_device(&device)
                    .ok_or(CoreError::DeviceNotFound { id: device })
            })
            .await?;

            let out = output::render_single(&format, &found, detail, |d| d.id.clone())?;
            output::print_output(&out, global.quiet)
        }

        DevicesCommand::Read { device, datapoint } => {
            let values: Vec<DatapointValue> = Gateway::oneshot(resolved.gateway, |gw| async move {
                gw.read_datapoint(&device, &datapoint).await
            })
            .await?;

            let out = output::render_list(
                &format,
                &values,
                |v| ValueRow {
                    key: v.key.clone(),
                    value: v.value.clone(),
                },
                |v| v.value.clone(),
            )?;
            output::print_output(&out, global.quiet)
        }
    }
}
