// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use crate::core::error::Result;
use crate::core::frames::StreamDescription;
use crate::core::native::RenderStreamApi;

/// Enumerates streams, retrying every `retry_interval` while none exist.
///
/// With `max_polls` set, gives up after that many enumerations and returns
/// the (empty) last result. `sleep` is called between polls.
pub fn wait_for_streams<A, S>(
    api: &mut A,
    retry_interval: Duration,
    max_polls: Option<usize>,
    mut sleep: S,
) -> Result<Vec<StreamDescription>>
where
    A: RenderStreamApi + ?Sized,
    S: FnMut(Duration),
{
    let mut polls = 0usize;
    loop {
        let streams = api.get_streams()?;
        polls += 1;
        if !streams.is_empty() {
            tracing::info!("Found {} streams", streams.len());
            for stream in &streams {
                tracing::debug!(
                    handle = %stream.handle,
                    name = %stream.name,
                    width = stream.width,
                    height = stream.height,
                    format = %stream.format,
                    "Stream"
                );
            }
            return Ok(streams);
        }
        if max_polls.is_some_and(|max| polls >= max) {
            tracing::warn!(polls, "No streams after polling, continuing without streams");
            return Ok(streams);
        }
        tracing::info!("Waiting for streams...");
        sleep(retry_interval);
    }
}
