//! Config subcommand handlers.

use vaultwatch_config::{Config, save_config};

use crate::cli::{BackendKind, ConfigArgs, ConfigCommand, GlobalOpts, InitArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = crate::config_file(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let (mut cfg, _) = crate::load(global)?;
            if cfg.firebase.auth_token.is_some() {
                cfg.firebase.auth_token = Some(REDACTED.into());
            }
            let rendered = match global.output {
                OutputFormat::Table => {
                    toml::to_string_pretty(&cfg).map_err(|e| CliError::ConfigLoad {
                        message: format!("failed to serialize config: {e}"),
                    })?
                }
                OutputFormat::Json => serde_json::to_string_pretty(&cfg)?,
                OutputFormat::JsonCompact => serde_json::to_string(&cfg)?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Init(init) => {
            let path = crate::config_file(global);
            if path.exists() && !init.force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let cfg = starter_config(init);
            save_config(&cfg, &path).map_err(|e| CliError::from_config(e, &path))?;
            if !global.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}

/// Build the starter file from `config init` flags.
///
/// A gateway install without an MQTT host sends commands through the
/// gateway itself.
fn starter_config(init: InitArgs) -> Config {
    let mut cfg = Config::default();
    cfg.backend.kind = init.backend.as_str().into();

    match init.backend {
        BackendKind::Firebase => cfg.firebase.database_url = init.url,
        BackendKind::Gateway => {
            cfg.gateway.base_url = init.url;
            if init.mqtt_host.is_none() {
                cfg.commands.transport = "gateway".into();
            }
        }
    }
    if let Some(host) = init.mqtt_host {
        cfg.mqtt.host = host;
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init(backend: BackendKind, url: Option<&str>, mqtt_host: Option<&str>) -> InitArgs {
        InitArgs {
            backend,
            url: url.map(str::to_owned),
            mqtt_host: mqtt_host.map(str::to_owned),
            force: false,
        }
    }

    #[test]
    fn gateway_without_broker_routes_commands_to_gateway() {
        let cfg = starter_config(init(BackendKind::Gateway, Some("http://10.0.0.5/api"), None));
        assert_eq!(cfg.backend.kind, "gateway");
        assert_eq!(cfg.gateway.base_url.as_deref(), Some("http://10.0.0.5/api"));
        assert_eq!(cfg.commands.transport, "gateway");
    }

    #[test]
    fn firebase_keeps_mqtt_commands() {
        let cfg = starter_config(init(
            BackendKind::Firebase,
            Some("https://demo-default-rtdb.firebaseio.com"),
            Some("broker.local"),
        ));
        assert_eq!(cfg.backend.kind, "firebase");
        assert_eq!(cfg.commands.transport, "mqtt");
        assert_eq!(cfg.mqtt.host, "broker.local");
        assert!(cfg.gateway.base_url.is_none());
    }
}
