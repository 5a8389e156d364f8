//! Turns the profile file plus command-line flags into a `GatewayConfig`.
//!
//! Flags win over the profile; the profile wins over `[defaults]`.

use std::time::Duration;

use clap::ValueEnum;

use junghome_config::{Config, Profile};
use junghome_core::GatewayConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Everything a gateway-bound command needs.
#[derive(Debug)]
pub struct Resolved {
    pub profile: String,
    pub gateway: GatewayConfig,
    pub format: OutputFormat,
}

/// Load the config file and resolve the active profile against `global`.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = junghome_config::load_config()?;
    resolve_with(global, &cfg)
}

pub fn resolve_with(global: &GlobalOpts, cfg: &Config) -> Result<Resolved, CliError> {
    let name = active_profile_name(global, cfg);
    let format = output_format(global, cfg);

    let profile = match cfg.profiles.get(&name) {
        Some(existing) => apply_overrides(existing.clone(), global),
        None => match global.host.as_deref() {
            // Flags alone are enough for an ad-hoc gateway
            Some(_) => apply_overrides(Profile::default(), global),
            None if global.profile.is_some() => {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: available_profiles(cfg),
                });
            }
            None => {
                return Err(CliError::NoConfig {
                    path: junghome_config::config_path().display().to_string(),
                });
            }
        },
    };

    let mut gateway = junghome_config::profile_to_gateway_config(&profile, &name, &cfg.defaults)?;
    if let Some(secs) = global.timeout {
        gateway.timeout = Duration::from_secs(secs);
    }

    Ok(Resolved {
        profile: name,
        gateway,
        format,
    })
}

/// `--profile`, then the configured default, then `"default"`.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// `--output`, then `[defaults] output`, then table.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global.output.clone().unwrap_or_else(|| {
        OutputFormat::from_str(&cfg.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(ref token) = global.token {
        profile.token = Some(token.clone());
        profile.token_env = None;
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    profile
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use junghome_core::TlsVerification;
    use secrecy::ExposeSecret;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["junghome"];
        argv.extend_from_slice(args);
        argv.push("hub");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn sample() -> Config {
        let mut cfg = Config::default();
        cfg.default_profile = Some("home".into());
        cfg.defaults.output = "json".into();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                host: "192.168.1.20".into(),
                token: Some("from-file".into()),
                insecure: Some(false),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn default_profile_is_used() {
        let resolved = resolve_with(&global(&[]), &sample()).unwrap();
        assert_eq!(resolved.profile, "home");
        assert_eq!(resolved.gateway.url.as_str(), "https://192.168.1.20/");
        assert_eq!(resolved.gateway.token.expose_secret(), "from-file");
        assert_eq!(resolved.gateway.tls, TlsVerification::SystemDefaults);
        assert_eq!(resolved.format, OutputFormat::Json);
    }

    #[test]
    fn flags_override_profile() {
        let g = global(&[
            "--host",
            "10.0.0.5",
            "--token",
            "from-flag",
            "-k",
            "--timeout",
            "3",
            "-o",
            "yaml",
        ]);
        let resolved = resolve_with(&g, &sample()).unwrap();
        assert_eq!(resolved.gateway.url.host_str(), Some("10.0.0.5"));
        assert_eq!(resolved.gateway.token.expose_secret(), "from-flag");
        assert_eq!(resolved.gateway.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(resolved.gateway.timeout, Duration::from_secs(3));
        assert_eq!(resolved.format, OutputFormat::Yaml);
    }

    #[test]
    fn flags_alone_build_a_gateway() {
        let g = global(&["--host", "jung.local", "--token", "t"]);
        let resolved = resolve_with(&g, &Config::default()).unwrap();
        assert_eq!(resolved.profile, "default");
        assert_eq!(resolved.gateway.url.as_str(), "https://jung.local/");
    }

    #[test]
    fn unknown_profile_lists_available() {
        let err = resolve_with(&global(&["-p", "office"]), &sample()).unwrap_err();
        match err {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "office");
                assert_eq!(available, "home");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nothing_configured_is_no_config() {
        let err = resolve_with(&global(&[]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }
}
