// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use anyhow::{Context, Result};
use renderstream::core::protocol::wait_for_streams;
use renderstream::{RenderStreamApi, RenderStreamConfig, StreamDescription};

use super::{native_api, simulated_api};

/// List the streams assigned to this process.
pub fn list(config: &RenderStreamConfig, polls: usize, json: bool, simulate: bool) -> Result<()> {
    let streams = if simulate {
        enumerate(simulated_api(), config, polls)?
    } else {
        enumerate(native_api(config), config, polls)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&streams)?);
        return Ok(());
    }
    if streams.is_empty() {
        println!("No streams assigned.");
        return Ok(());
    }

    println!(
        "{:<24} {:<16} {:>11} {:<16} {:<20} REGION",
        "NAME", "CHANNEL", "SIZE", "FORMAT", "HANDLE"
    );
    for stream in &streams {
        let region = stream.clipping.sub_region();
        println!(
            "{:<24} {:<16} {:>11} {:<16} {:<20} {:.3},{:.3} {:.3}x{:.3}",
            stream.name,
            stream.channel,
            format!("{}x{}", stream.width, stream.height),
            stream.format.to_string(),
            stream.handle.to_string(),
            region.x,
            region.y,
            region.width,
            region.height
        );
    }
    Ok(())
}

fn enumerate<A: RenderStreamApi>(
    mut api: A,
    config: &RenderStreamConfig,
    polls: usize,
) -> Result<Vec<StreamDescription>> {
    api.initialize().context("Failed to initialise RenderStream")?;
    let streams = wait_for_streams(
        &mut api,
        config.protocol.stream_retry_interval(),
        Some(polls.max(1)),
        std::thread::sleep,
    )
    .context("Failed to enumerate streams");
    api.shutdown();
    streams
}
