// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;
use std::time::Duration;

use renderstream_abi as abi;

use crate::core::error::Result;
use crate::core::frames::{CameraData, FrameData, ImageFrameData, StreamDescription, StreamHandle};
use crate::core::schema::ManagedSchema;

use super::status::AwaitOutcome;

/// Typed call surface of the compositor library.
///
/// [`super::NativeBinding`] implements this over the loaded library. The
/// frame protocol only depends on the trait, so it can be driven by fakes.
///
/// Every call made before a successful [`RenderStreamApi::initialize`]
/// returns [`crate::core::error::RenderStreamError::NotInitialised`].
pub trait RenderStreamApi {
    /// Library loaded, every export bound and the graphics backend supported.
    fn is_available(&self) -> bool;

    /// Initialises the library for protocol version
    /// [`abi::RENDER_STREAM_VERSION_MAJOR`].[`abi::RENDER_STREAM_VERSION_MINOR`].
    fn initialize(&mut self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Loads the schema stored for `asset_path`.
    fn load_schema(&mut self, asset_path: &Path) -> Result<ManagedSchema>;

    fn save_schema(&mut self, asset_path: &Path, schema: &ManagedSchema) -> Result<()>;

    /// Publishes `schema`. The library assigns each scene its hash, which is
    /// written back into `schema`.
    fn set_schema(&mut self, schema: &mut ManagedSchema) -> Result<()>;

    /// Current stream set. Calling twice with no change in between yields the
    /// same list.
    fn get_streams(&mut self) -> Result<Vec<StreamDescription>>;

    /// Blocks up to `timeout` for the next frame (controller only).
    fn await_frame_data(&mut self, timeout: Duration) -> Result<AwaitOutcome>;

    fn set_follower(&mut self, follower: bool) -> Result<()>;

    /// Starts a follower frame for data relayed from the controller.
    fn begin_follower_frame(&mut self, frame: &FrameData) -> Result<AwaitOutcome>;

    /// Fills `out` with the numeric parameter values of the scene `schema_hash`.
    fn get_frame_parameters(&mut self, schema_hash: u64, out: &mut [f32]) -> Result<()>;

    fn get_frame_image_data(&mut self, schema_hash: u64, count: usize) -> Result<Vec<ImageFrameData>>;

    /// Text value of the `index`-th TEXT parameter of the scene.
    fn get_frame_text(&mut self, schema_hash: u64, index: u32) -> Result<String>;

    /// Camera for `stream` this frame, or `None` when the compositor has none.
    fn get_frame_camera(&mut self, stream: StreamHandle) -> Result<Option<CameraData>>;

    /// Raw `rs_sendFrame`, for commands executed on the render thread.
    fn send_frame_fn(&self) -> Option<abi::RsSendFrameFn>;

    /// Raw `rs_getFrameImage`, for commands executed on the render thread.
    fn get_frame_image_fn(&self) -> Option<abi::RsGetFrameImageFn>;

    fn log_to_compositor(&self, message: &str) -> Result<()>;

    fn set_status_message(&self, message: &str) -> Result<()>;

    fn send_profiling_data(&self, entries: &[(&str, f32)]) -> Result<()>;

    /// Releases the library. Later calls report not initialised.
    fn shutdown(&mut self);
}
