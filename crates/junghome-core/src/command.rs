// ── Command API ──
//
// Every write goes through `Command`. A command resolves to one datapoint
// PATCH; local state is never touched, the gateway's `datapoint` frame
// carries the confirmed value back.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use junghome_api::{GatewayClient, PatchBody};

use crate::derive::{level_from_position, percent_from_brightness};
use crate::error::CoreError;
use crate::model::{DatapointKind, Device};
use crate::store::DeviceStore;

/// A command envelope sent through the command channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All write operations against the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // ── Switches and lights ──────────────────────────────────────────
    SetSwitch { device_id: String, on: bool },
    /// 0–255.
    SetBrightness { device_id: String, brightness: u8 },

    // ── Covers ───────────────────────────────────────────────────────
    /// 0 (closed) – 100 (open).
    SetPosition { device_id: String, position: u8 },
    OpenCover { device_id: String },
    CloseCover { device_id: String },
}

impl Command {
    pub fn device_id(&self) -> &str {
        match self {
            Self::SetSwitch { device_id, .. }
            | Self::SetBrightness { device_id, .. }
            | Self::SetPosition { device_id, .. }
            | Self::OpenCover { device_id }
            | Self::CloseCover { device_id } => device_id,
        }
    }
}

/// What a command was sent as, plus whatever the gateway answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub device_id: String,
    pub datapoint_id: String,
    pub key: String,
    pub value: String,
    /// Echoed state, or `{"success": true}` for an empty answer.
    pub response: Value,
}

/// A command resolved against the current table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Write {
    pub device_id: String,
    pub datapoint_id: String,
    pub key: &'static str,
    pub value: String,
}

/// Resolve `command` to the datapoint write it stands for.
pub(crate) fn resolve(store: &DeviceStore, command: &Command) -> Result<Write, CoreError> {
    let device_id = command.device_id();
    let device = store.get(device_id).ok_or_else(|| CoreError::DeviceNotFound {
        id: device_id.to_owned(),
    })?;

    let (kind, key, value) = match *command {
        Command::SetSwitch { on, .. } => {
            require(&device, device.device_type.has_switch(), "switch")?;
            (DatapointKind::Switch, "switch", if on { "1" } else { "0" }.to_owned())
        }
        Command::SetBrightness { brightness, .. } => {
            require(&device, device.device_type.is_dimmable(), "brightness")?;
            (
                DatapointKind::Brightness,
                "brightness",
                percent_from_brightness(brightness).to_string(),
            )
        }
        Command::SetPosition { position, .. } => {
            if position > 100 {
                return Err(CoreError::ValidationFailed {
                    message: format!("position {position} is outside 0-100"),
                });
            }
            require(&device, device.device_type.is_cover(), "position")?;
            (
                DatapointKind::Level,
                "level",
                level_from_position(position).to_string(),
            )
        }
        Command::OpenCover { .. } => {
            require(&device, device.device_type.is_cover(), "open")?;
            (DatapointKind::Level, "level", "0".to_owned())
        }
        Command::CloseCover { .. } => {
            require(&device, device.device_type.is_cover(), "close")?;
            (DatapointKind::Level, "level", "100".to_owned())
        }
    };

    let datapoint = device
        .datapoint(&kind)
        .ok_or_else(|| CoreError::DatapointNotFound {
            device_id: device.id.clone(),
            kind: kind.to_string(),
        })?;

    Ok(Write {
        device_id: device.id.clone(),
        datapoint_id: datapoint.id.clone(),
        key,
        value,
    })
}

fn require(device: &Device, supported: bool, operation: &str) -> Result<(), CoreError> {
    if supported {
        Ok(())
    } else {
        Err(CoreError::ValidationFailed {
            message: format!(
                "{} ({}) does not support {operation}",
                device.id, device.device_type
            ),
        })
    }
}

/// Send one resolved command to the gateway.
pub(crate) async fn route_command(
    client: &GatewayClient,
    store: &DeviceStore,
    command: Command,
) -> Result<CommandResult, CoreError> {
    let write = resolve(store, &command)?;
    debug!(
        device_id = %write.device_id,
        datapoint_id = %write.datapoint_id,
        key = write.key,
        value = %write.value,
        "sending command"
    );

    let outcome = client
        .set_datapoint(
            &write.device_id,
            &write.datapoint_id,
            &PatchBody::single(write.key, write.value.clone()),
        )
        .await?;

    Ok(CommandResult {
        device_id: write.device_id,
        datapoint_id: write.datapoint_id,
        key: write.key.to_owned(),
        value: write.value,
        response: outcome.into_value(),
    })
}
