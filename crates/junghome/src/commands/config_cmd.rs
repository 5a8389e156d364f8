//! Config subcommand handlers.

use junghome_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

const MASK: &str = "********";

/// Copy of `cfg` with every plaintext token masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.token.is_some() {
            profile.token = Some(MASK.into());
        }
    }
    cfg
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = redacted(&junghome_config::load_config()?);
            let format = config::output_format(global, &cfg);
            let out = match format {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)
                    .map_err(|e| CliError::Config(e.to_string()))?,
                other => output::render_single(&other, &cfg, |_| String::new(), |_| String::new())?,
            };
            output::print_output(out.trim_end(), global.quiet)
        }

        ConfigCommand::Path => {
            let path = junghome_config::config_path();
            output::print_output(&path.display().to_string(), global.quiet)
        }

        ConfigCommand::Profiles => {
            let cfg = junghome_config::load_config()?;
            let default = cfg.default_profile.as_deref();
            let lines: Vec<String> = cfg
                .profiles
                .iter()
                .map(|(name, p)| {
                    let marker = if Some(name.as_str()) == default { "*" } else { " " };
                    format!("{marker} {name}\t{}", p.host)
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet)
        }

        ConfigCommand::Init(init) => init_profile(init, global),
    }
}

fn init_profile(args: ConfigInitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = junghome_config::load_config()?;
    let name = global.profile.clone().unwrap_or_else(|| "default".into());

    if cfg.profiles.contains_key(&name) && !args.force {
        return Err(CliError::Validation {
            field: "profile".into(),
            reason: format!("'{name}' already exists; pass --force to replace it"),
        });
    }

    // Reject hosts that will not parse later
    junghome_config::parse_host(&args.gateway)?;

    if args.plain_token.is_some() && !global.quiet {
        eprintln!("warning: the token is stored in plaintext; prefer --token-env");
    }

    let first = cfg.profiles.is_empty();
    cfg.profiles.insert(
        name.clone(),
        Profile {
            host: args.gateway,
            token: args.plain_token,
            token_env: args.token_env,
            ca_cert: args.ca_cert,
            ..Profile::default()
        },
    );
    if args.default || first {
        cfg.default_profile = Some(name.clone());
    }

    let path = junghome_config::save_config(&cfg)?;
    output::print_output(
        &format!("Saved profile '{name}' to {}", path.display()),
        global.quiet,
    )
}
