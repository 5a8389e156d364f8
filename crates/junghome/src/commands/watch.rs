//! Live view of table changes and socket state.

use chrono::Local;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;

use junghome_core::{Gateway, TableEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::commands::devices::state_summary;
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

fn event_json(gateway: &Gateway, event: &TableEvent) -> Value {
    match event {
        TableEvent::Added { ids } => json!({ "event": "added", "ids": ids }),
        TableEvent::Removed { ids } => json!({ "event": "removed", "ids": ids }),
        TableEvent::Refreshed { count } => json!({ "event": "refreshed", "count": count }),
        TableEvent::Updated { id } => json!({
            "event": "updated",
            "id": id,
            "device": gateway.get_device(id),
        }),
    }
}

fn event_line(gateway: &Gateway, event: &TableEvent) -> String {
    let ts = Local::now().format("%H:%M:%S");
    match event {
        TableEvent::Added { ids } => format!("{ts}  added      {}", ids.join(", ")),
        TableEvent::Removed { ids } => format!("{ts}  removed    {}", ids.join(", ")),
        TableEvent::Refreshed { count } => format!("{ts}  refreshed  {count} devices"),
        TableEvent::Updated { id } => match gateway.get_device(id) {
            Some(d) => format!("{ts}  updated    {id}  {}: {}", d.label, state_summary(&d)),
            None => format!("{ts}  updated    {id}"),
        },
    }
}

fn render(gateway: &Gateway, event: &TableEvent, format: &OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(event_line(gateway, event)),
        // One JSON document per line
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            output::render_json(&event_json(gateway, event), true)
        }
    }
}

/// `junghome watch [--count N]`
pub async fn handle(resolved: Resolved, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let url = resolved.gateway.url.clone();
    let gateway = Gateway::new(resolved.gateway)?;

    // Subscribe before connecting so the initial load is reported
    let mut events = gateway.events();
    let mut state = gateway.connection_state();
    gateway.connect().await?;

    if !global.quiet {
        eprintln!(
            "Watching {} devices on {url} (Ctrl-C to stop)",
            gateway.list_devices().len()
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut seen = 0usize;

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            ev = events.recv() => match ev {
                Ok(event) => {
                    let line = match render(&gateway, &event, &resolved.format) {
                        Ok(line) => line,
                        Err(e) => break Err(e),
                    };
                    if let Err(e) = output::print_output(&line, global.quiet) {
                        break Err(e);
                    }
                    seen += 1;
                    if args.count.is_some_and(|n| seen >= n) {
                        break Ok(());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch fell behind; events dropped");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *state.borrow_and_update();
                if !global.quiet {
                    eprintln!("{}  socket     {current}", Local::now().format("%H:%M:%S"));
                }
            }
        }
    };

    gateway.disconnect().await;
    result
}
