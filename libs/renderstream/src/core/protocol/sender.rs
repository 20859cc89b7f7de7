// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use renderstream_abi as abi;

use crate::core::error::{RenderStreamError, Result};
use crate::core::frames::{FrameData, PixelFormat, StreamDescription, StreamHandle, SubRegion, camera_response};
use crate::core::native::RenderStreamApi;
use crate::core::pool::EventDataPool;
use crate::core::render::{RenderCommand, RenderCommandQueue, SendFrameCommand};
use crate::core::textures::Texture2DDescriptor;

/// What happened to one send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// A command was queued for the render thread.
    Submitted,
    /// This stream already sent during the current engine frame.
    AlreadySent,
    /// Every pool slot was in flight. The frame is dropped.
    PoolExhausted,
    /// No new frame data arrived this cycle.
    NoFrameData,
    /// The compositor has no camera for the stream this frame.
    NoCamera,
}

impl SendResult {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// Sends rendered frames for one stream.
#[derive(Debug, Clone)]
pub struct FrameSender {
    name: String,
    handle: StreamHandle,
    format: PixelFormat,
    width: u32,
    height: u32,
    sub_region: SubRegion,
    last_sent_frame: Option<u64>,
}

impl FrameSender {
    pub fn new(stream: &StreamDescription) -> Self {
        tracing::debug!(
            name = %stream.name,
            handle = %stream.handle,
            width = stream.width,
            height = stream.height,
            format = %stream.format,
            "Created frame sender"
        );
        Self {
            name: stream.name.clone(),
            handle: stream.handle,
            format: stream.format,
            width: stream.width,
            height: stream.height,
            sub_region: stream.clipping.sub_region(),
            last_sent_frame: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> StreamHandle {
        self.handle
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Normalised part of the frustum this stream renders.
    pub fn sub_region(&self) -> SubRegion {
        self.sub_region
    }

    pub fn last_sent_frame(&self) -> Option<u64> {
        self.last_sent_frame
    }

    /// Shared output texture shape. Stream output is sRGB.
    pub fn texture_descriptor(&self) -> Texture2DDescriptor {
        Texture2DDescriptor::new(self.width, self.height, self.format, false)
    }

    /// Queues `rs_sendFrame` for this stream with the camera the compositor
    /// supplied for `frame`.
    ///
    /// At most one send per `engine_frame`. The command lives in `pool` until
    /// it ages out, so the texture behind `frame_data` must stay alive at
    /// least that long.
    #[allow(clippy::too_many_arguments)]
    pub fn send<A, Q>(
        &mut self,
        api: &mut A,
        pool: &mut EventDataPool<SendFrameCommand>,
        queue: &Q,
        engine_frame: u64,
        frame: &FrameData,
        frame_type: abi::SenderFrameType,
        frame_data: abi::SenderFrameTypeData,
    ) -> Result<SendResult>
    where
        A: RenderStreamApi + ?Sized,
        Q: RenderCommandQueue + ?Sized,
    {
        if self.last_sent_frame == Some(engine_frame) {
            return Ok(SendResult::AlreadySent);
        }
        self.last_sent_frame = Some(engine_frame);

        let send_frame = api.send_frame_fn().ok_or(RenderStreamError::NotInitialised)?;
        let Some(camera) = api.get_frame_camera(self.handle)? else {
            tracing::trace!(stream = %self.name, "No camera for stream this frame");
            return Ok(SendResult::NoCamera);
        };

        let command = SendFrameCommand {
            send_frame,
            stream: self.handle,
            frame_type,
            frame_data,
            camera_response: camera_response(frame.t_tracked, &camera),
        };
        let Some(ptr) = pool.try_acquire(command) else {
            tracing::warn!(stream = %self.name, "Event data pool exhausted, skipping frame send");
            return Ok(SendResult::PoolExhausted);
        };
        queue.submit(unsafe { RenderCommand::send_frame(ptr) })?;
        Ok(SendResult::Submitted)
    }
}
