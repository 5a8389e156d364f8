//! Command dispatch: bridges CLI args to the gateway and output formatting.

pub mod config_cmd;
pub mod control;
pub mod devices;
pub mod hub;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a gateway-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    resolved: Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let profile = resolved.profile.clone();
    let result = match cmd {
        Command::Devices(args) => devices::handle(resolved, args, global).await,
        Command::Watch(args) => watch::handle(resolved, args, global).await,
        Command::Hub => hub::show(resolved, global).await,
        Command::Test => hub::test(resolved, global).await,
        Command::Switch(args) => control::switch(resolved, args, global).await,
        Command::Brightness(args) => control::brightness(resolved, args, global).await,
        Command::Cover(args) => control::cover(resolved, args, global).await,
        // Handled before a profile is resolved
        Command::Config(_) | Command::Completions(_) => Ok(()),
    };
    result.map_err(|e| e.for_profile(&profile))
}
