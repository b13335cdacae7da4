use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use engine::{Engine, MemoryStore};

use crate::{cli::Cli, error::Result};

mod cli;
mod commands;
mod error;
mod settings;
mod snapshot;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match settings::Settings::new(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tripsplit={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("command failed: {err:?}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: settings::Settings) -> Result<()> {
    let path = cli.db.clone().unwrap_or(settings.store.path.clone());
    let store = Arc::new(MemoryStore::from_snapshot(snapshot::load(&path)?));
    let engine = Engine::builder()
        .store(store.clone())
        .directory(store.clone())
        .config(settings.engine_config()?)
        .build()?;

    let outcome = commands::run(&engine, cli.as_member.as_deref(), cli.command).await;

    // A failed command may still have written, e.g. a completed trip whose
    // ledger update is pending.
    if store.write_count() > 0 {
        snapshot::save(&path, &store.snapshot().await)?;
    }
    outcome
}
