//! # persist_app
//!
//! Command-line access to the metadata persistence store, plus a simulated
//! host that exercises the full lifecycle (object creation, chunk unload and
//! reload) against a real data file.
//!
//! The data file is taken from `--data-file`, then the `PERSIST_DATA_FILE`
//! environment variable, then the built-in default.

mod commands;
mod events;
mod simulate;
mod world;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use persist_core::{PersistenceConfig, PersistentId, ReloadPolicy};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "persist_app", about = "Inspect and exercise the metadata persistence store")]
struct Cli {
    /// Path of the TOML data file
    #[arg(short, long, global = true)]
    data_file: Option<PathBuf>,

    /// Keep the document in memory instead of re-reading it on every access
    #[arg(long, global = true)]
    cached: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the id high-water mark and every stored section
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one attribute
    Get { id: PersistentId, key: String },
    /// Set one attribute (TOML literal, or plain text)
    Set {
        id: PersistentId,
        key: String,
        value: String,
    },
    /// Remove one attribute
    Unset { id: PersistentId, key: String },
    /// Delete every attribute stored for an id
    Delete { id: PersistentId },
    /// Print the next id that will be allocated
    NextId,
    /// Run the simulated host against the data file
    Simulate {
        /// Number of objects to spawn
        #[arg(long, default_value_t = 8)]
        objects: usize,
        /// Number of chunks to spread them over
        #[arg(long, default_value_t = 2)]
        chunks: usize,
    },
}

impl Cli {
    fn persistence_config(&self) -> PersistenceConfig {
        let config = match &self.data_file {
            Some(path) => PersistenceConfig::new(path),
            None => PersistenceConfig::from_env(),
        };
        if self.cached {
            config.with_reload_policy(ReloadPolicy::Cached)
        } else {
            config
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persist_app=info,persist_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.persistence_config();
    info!(path = %config.data_file().display(), "using data file");

    match cli.command {
        Command::Show { json } => commands::show(&config, json),
        Command::Get { id, key } => commands::get(&config, id, &key),
        Command::Set { id, key, value } => commands::set(&config, id, &key, &value),
        Command::Unset { id, key } => commands::unset(&config, id, &key),
        Command::Delete { id } => commands::delete(&config, id),
        Command::NextId => commands::next_id(&config),
        Command::Simulate { objects, chunks } => {
            let summary = simulate::run(&config, simulate::SimulationConfig { objects, chunks })?;
            println!(
                "spawned {}, restored {}, mismatched {}",
                summary.spawned, summary.verified, summary.mismatched
            );
            anyhow::ensure!(summary.mismatched == 0, "some objects were not restored");
            Ok(())
        }
    }
}
