// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use anyhow::{Context, Result, bail};
use renderstream::RenderStreamConfig;
use renderstream::core::cluster;

/// Negotiate a node ID with the configured number of repeaters and print
/// the assignment.
pub async fn run(config: &RenderStreamConfig) -> Result<()> {
    if !config.cluster.is_enabled() {
        bail!("No repeater nodes specified; pass --followers N or set cluster.repeater_count");
    }
    let assignment = cluster::negotiate(&config.cluster)
        .await
        .context("Cluster negotiation failed")?;
    println!("{}", serde_json::to_string_pretty(&assignment)?);
    Ok(())
}
