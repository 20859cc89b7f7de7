// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Host-memory session loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use renderstream::core::native::{CompositorLogLayer, CompositorLogSink};
use renderstream::core::negotiate_or_standalone;
use renderstream::core::render::ImmediateRenderQueue;
use renderstream::core::textures::ScratchTextureManager;
use renderstream::{
    FrameOutcome, HostMemoryAllocator, HostTexture, RenderStream, RenderStreamApi,
    RenderStreamConfig,
};
use tracing_subscriber::layer::SubscriberExt;

use super::{env_filter, native_api, simulated_api};

/// Frame pacing of the scripted compositor.
const SIMULATED_FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Default)]
struct RunSummary {
    streams: usize,
    frames: u64,
    sends: u64,
}

pub async fn run(
    config: RenderStreamConfig,
    asset: PathBuf,
    frames: Option<u64>,
    simulate: bool,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    let assignment = negotiate_or_standalone(&config.cluster).await;
    if assignment.is_cluster() {
        tracing::info!(
            node_id = assignment.node_id,
            role = ?assignment.role,
            "Running as cluster node"
        );
    }

    let summary = tokio::task::spawn_blocking(move || {
        if simulate {
            let pace = Some(SIMULATED_FRAME_INTERVAL);
            return drive(simulated_api(), config, &asset, frames, pace, &stop);
        }
        let binding = native_api(&config);
        // Session-thread logs also reach the compositor console.
        let subscriber = compositor_subscriber(binding.compositor_log_sink());
        let _logging = tracing::subscriber::set_default(subscriber);
        drive(binding, config, &asset, frames, None, &stop)
    })
    .await
    .context("Session thread panicked")??;

    println!(
        "Rendered {} frame(s), submitted {} send(s) across {} stream(s)",
        summary.frames, summary.sends, summary.streams
    );
    Ok(())
}

fn compositor_subscriber(sink: CompositorLogSink) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .with(CompositorLogLayer::new(sink))
}

fn drive<A: RenderStreamApi>(
    api: A,
    config: RenderStreamConfig,
    asset: &Path,
    frames: Option<u64>,
    pace: Option<Duration>,
    stop: &AtomicBool,
) -> Result<RunSummary> {
    let mut session =
        RenderStream::start(api, config, asset).context("Failed to start RenderStream session")?;
    let mut textures: ScratchTextureManager<HostTexture, HostMemoryAllocator> =
        ScratchTextureManager::new("stream", HostMemoryAllocator::default());
    let mut generation = session.streams_generation();
    let mut summary = RunSummary::default();

    while !stop.load(Ordering::Acquire) {
        let outcome = session.tick()?;
        if session.streams_generation() != generation {
            textures.clear();
            generation = session.streams_generation();
        }

        match outcome {
            FrameOutcome::Quit => break,
            FrameOutcome::NewFrame(frame) => {
                summary.frames += 1;
                let shade = pattern_shade(frame.t_tracked);
                for index in 0..session.senders().len() {
                    let descriptor = session.senders()[index].texture_descriptor();
                    let (texture, frame_type, data) = textures.get_with_frame_data(&descriptor)?;
                    texture.pixels.fill(shade);
                    let result = session.send_frame(index, frame_type, data, &ImmediateRenderQueue)?;
                    if result.is_submitted() {
                        summary.sends += 1;
                    } else {
                        tracing::debug!(stream = index, ?result, "Frame not sent");
                    }
                }
            }
            other => tracing::trace!(?other, "No new frame data"),
        }
        session.end_frame();

        if frames.is_some_and(|limit| summary.frames >= limit) {
            break;
        }
        if let Some(pace) = pace {
            std::thread::sleep(pace);
        }
    }

    summary.streams = session.streams().len();
    session.shutdown();
    Ok(summary)
}

/// Grey level cycling once every ~4 seconds of tracked time.
fn pattern_shade(t_tracked: f64) -> u8 {
    ((t_tracked * 64.0).rem_euclid(256.0)) as u8
}
