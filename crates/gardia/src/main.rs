//! `gardia` - CLI for the emergency intake server
//!
//! This binary runs the web server and provides helpers to inspect the
//! configuration and preview compacted payloads.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};

use gardia::cli::{Cli, Command, CompactCommand, ConfigCommand, ServeCommand};
use gardia::web::{self, AppState};
use gardia::{compact, init_logging, Config, DryRunTransmitter, MeshTransmitter, Transmitter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path();

    // A broken file must not block `config init`, `path` or `validate`
    let loaded = Config::load_from(Some(config_path.clone()));
    let level = loaded.as_ref().map_or("INFO", |config| {
        if config.web.debug {
            "DEBUG"
        } else {
            config.logging.level.as_str()
        }
    });
    init_logging(cli.verbosity(level));

    let load = || loaded.with_context(|| format!("loading {}", config_path.display()));
    match cli.command {
        Command::Serve(serve_cmd) => {
            handle_serve(load()?, config_path.clone(), &serve_cmd).await
        }
        Command::Compact(compact_cmd) => handle_compact(&load()?, &compact_cmd),
        Command::Config(config_cmd) => handle_config(&config_path, config_cmd),
    }
}

async fn handle_serve(config: Config, config_path: PathBuf, cmd: &ServeCommand) -> anyhow::Result<()> {
    if !config_path.exists() {
        Config::write_default(&config_path)?;
    }

    let transmitter: Arc<dyn Transmitter> = if cmd.dry_run {
        info!("Dry run: payloads are logged, not transmitted");
        Arc::new(DryRunTransmitter::new())
    } else {
        let mesh = MeshTransmitter::new(&config.meshtastic);
        match mesh.connect().await {
            Ok(()) => info!("Meshtastic connected on {}", config.meshtastic.device),
            Err(err) => warn!(
                "Meshtastic unavailable on {} ({}), retrying on first alert",
                config.meshtastic.device, err
            ),
        }
        Arc::new(mesh)
    };

    let state = Arc::new(AppState::new(config, config_path, transmitter));
    web::serve(state).await?;
    Ok(())
}

fn handle_compact(config: &Config, cmd: &CompactCommand) -> anyhow::Result<()> {
    let limit = cmd.limit.unwrap_or_else(|| config.message_limit());
    let message = compact(&cmd.report(), &config.alert_types, limit);
    let steps: Vec<String> = message.steps.iter().map(ToString::to_string).collect();

    if cmd.json {
        let out = serde_json::json!({
            "payload": message.payload,
            "bytes": message.len(),
            "limit": limit,
            "truncated": message.truncated,
            "steps": steps,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", message.payload);
        println!();
        println!("Bytes:     {} / {}", message.len(), limit);
        if steps.is_empty() {
            println!("Shortened: no");
        } else {
            println!("Shortened: yes");
            for step in &steps {
                println!("  - {step}");
            }
        }
    }
    Ok(())
}

fn handle_show(config: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", config.to_yaml()?);
    }
    Ok(())
}

fn handle_config(config_path: &Path, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            handle_show(&Config::load_from(Some(config_path.to_path_buf()))?, json)?;
        }
        ConfigCommand::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(|| config_path.to_path_buf());
            println!("Validating configuration: {}", path.display());
            if !path.exists() {
                bail!("{} does not exist", path.display());
            }
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
        ConfigCommand::Init { force } => {
            if config_path.exists() && !force {
                bail!(
                    "{} already exists; use --force to overwrite",
                    config_path.display()
                );
            }
            Config::write_default(config_path)?;
            println!("Wrote {}", config_path.display());
        }
    }
    Ok(())
}
