// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! RenderStream CLI
//!
//! Inspect the compositor's schema and streams, negotiate cluster node IDs,
//! and drive a host-memory RenderStream session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use renderstream::RenderStreamConfig;

mod commands;

#[derive(Parser)]
#[command(name = "renderstream")]
#[command(author, version, about = "RenderStream engine bridge CLI", long_about = None)]
struct Cli {
    /// Directory holding renderstream.toml (default: current directory,
    /// then the user config directory)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Use an in-process scripted compositor instead of the native library
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load or store the schema of an asset
    Schema {
        #[command(subcommand)]
        action: SchemaCommands,
    },

    /// List the streams the compositor has assigned to this process
    Streams {
        /// Enumeration attempts before giving up
        #[arg(long, default_value = "5")]
        polls: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Negotiate this node's cluster ID over UDP multicast
    Negotiate {
        #[command(flatten)]
        cluster: ClusterArgs,
    },

    /// Run a session that answers every frame with a test pattern
    Run {
        /// Asset path the schema is stored against
        #[arg(value_name = "ASSET")]
        asset: Option<PathBuf>,

        /// Stop after this many frames with new frame data
        #[arg(long)]
        frames: Option<u64>,

        #[command(flatten)]
        cluster: ClusterArgs,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Print the schema stored for an asset as JSON
    Show {
        #[arg(value_name = "ASSET")]
        asset: PathBuf,
    },

    /// Store a JSON schema against an asset
    Save {
        #[arg(value_name = "ASSET")]
        asset: PathBuf,

        /// JSON schema file
        #[arg(value_name = "SCHEMA_FILE")]
        schema_file: PathBuf,
    },
}

#[derive(Args, Clone, Default)]
struct ClusterArgs {
    /// Number of repeater nodes besides this one
    #[arg(long)]
    followers: Option<u32>,

    /// Network adapter to negotiate on
    #[arg(long)]
    adapter: Option<String>,
}

impl ClusterArgs {
    fn apply(&self, config: &mut RenderStreamConfig) {
        if let Some(followers) = self.followers {
            config.cluster.repeater_count = followers;
        }
        if let Some(adapter) = &self.adapter {
            config.cluster.adapter = Some(adapter.clone());
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(commands::env_filter())
        .init();

    let mut config = load_config(cli.config_dir.as_deref());
    let simulate = cli.simulate;

    match cli.command {
        Some(Commands::Schema { action }) => match action {
            SchemaCommands::Show { asset } => commands::schema::show(&config, &asset, simulate)?,
            SchemaCommands::Save { asset, schema_file } => {
                commands::schema::save(&config, &asset, &schema_file, simulate)?
            }
        },
        Some(Commands::Streams { polls, json }) => {
            commands::streams::list(&config, polls, json, simulate)?;
        }
        Some(Commands::Negotiate { cluster }) => {
            cluster.apply(&mut config);
            commands::negotiate::run(&config).await?;
        }
        Some(Commands::Run {
            asset,
            frames,
            cluster,
        }) => {
            cluster.apply(&mut config);
            let asset = match asset {
                Some(asset) => asset,
                None => std::env::current_exe().context("Failed to resolve the asset path")?,
            };
            let stop = Arc::new(AtomicBool::new(false));
            {
                let stop = Arc::clone(&stop);
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("Interrupted, stopping after this frame");
                        stop.store(true, Ordering::Release);
                    }
                });
            }
            commands::run::run(config, asset, frames, simulate, stop).await?;
        }
        None => {
            Cli::parse_from(["renderstream", "--help"]);
        }
    }

    Ok(())
}

/// `--config-dir` if given, else the current directory, else
/// `<user config dir>/renderstream`.
fn load_config(dir: Option<&Path>) -> RenderStreamConfig {
    if let Some(dir) = dir {
        return RenderStreamConfig::load_or_default(dir);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if cwd.join(RenderStreamConfig::FILE_NAME).exists() {
        return RenderStreamConfig::load_or_default(&cwd);
    }
    match dirs::config_dir() {
        Some(user) => RenderStreamConfig::load_or_default(&user.join("renderstream")),
        None => RenderStreamConfig::default(),
    }
}
