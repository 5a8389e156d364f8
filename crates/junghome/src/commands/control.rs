//! Switch, brightness, and cover writes.
//!
//! Writes need a live socket, so each one runs a full connect, waits for
//! the socket, sends the command, and disconnects.

use junghome_core::derive::brightness_from_percent;
use junghome_core::{Command, CommandResult, Gateway};

use crate::cli::{BrightnessArgs, CoverAction, CoverArgs, GlobalOpts, SwitchArgs, SwitchState};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

async fn execute(resolved: Resolved, cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = resolved.gateway;
    config.hub_refresh_interval_secs = 0;
    config.catalog_refresh_interval_secs = 0;
    let wait = config.timeout;

    let gateway = Gateway::new(config)?;
    gateway.connect().await?;

    let result = async {
        gateway.wait_connected(wait).await?;
        gateway.execute(cmd).await
    }
    .await;
    gateway.disconnect().await;
    let result = result?;

    let out = output::render_single(&resolved.format, &result, summary, |r| r.value.clone())?;
    output::print_output(&out, global.quiet)
}

fn summary(r: &CommandResult) -> String {
    format!("{} {} = {} (datapoint {})", r.device_id, r.key, r.value, r.datapoint_id)
}

/// `junghome switch <device> on|off`
pub async fn switch(resolved: Resolved, args: SwitchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cmd = Command::SetSwitch {
        device_id: args.device,
        on: args.state == SwitchState::On,
    };
    execute(resolved, cmd, global).await
}

/// `junghome brightness <device> <value> [--percent]`
pub async fn brightness(
    resolved: Resolved,
    args: BrightnessArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let brightness = if args.percent {
        if args.value > 100 {
            return Err(CliError::Validation {
                field: "value".into(),
                reason: format!("{} is not a percentage", args.value),
            });
        }
        brightness_from_percent(f64::from(args.value))
    } else {
        args.value
    };

    let cmd = Command::SetBrightness {
        device_id: args.device,
        brightness,
    };
    execute(resolved, cmd, global).await
}

/// `junghome cover <device> open|close|position <n>`
pub async fn cover(resolved: Resolved, args: CoverArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let device_id = args.device;
    let cmd = match args.action {
        CoverAction::Open => Command::OpenCover { device_id },
        CoverAction::Close => Command::CloseCover { device_id },
        CoverAction::Position { value } => Command::SetPosition {
            device_id,
            position: value,
        },
    };
    execute(resolved, cmd, global).await
}
