// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! In-process stand-in for the compositor library.
//!
//! Drives the frame protocol without a compositor: await results come from a
//! script, every call is recorded, and frames sent through
//! [`RenderStreamApi::send_frame_fn`] land in a process-wide log.

use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use renderstream_abi as abi;

use crate::core::error::{RenderStreamError, Result};
use crate::core::frames::{CameraData, FrameData, ImageFrameData, StreamDescription, StreamHandle};
use crate::core::schema::ManagedSchema;

use super::api::RenderStreamApi;
use super::status::AwaitOutcome;

/// A call made on a [`ScriptedApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Initialize,
    LoadSchema(PathBuf),
    SaveSchema(PathBuf),
    SetSchema,
    GetStreams,
    AwaitFrameData,
    SetFollower(bool),
    BeginFollowerFrame(f64),
    GetFrameParameters { schema_hash: u64, len: usize },
    GetFrameImageData { schema_hash: u64, count: usize },
    GetFrameText { schema_hash: u64, index: u32 },
    GetFrameCamera(StreamHandle),
    LogToCompositor(String),
    SetStatusMessage(String),
    SendProfilingData(usize),
    Shutdown,
}

/// A frame received by the scripted `rs_sendFrame`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentFrame {
    pub stream: StreamHandle,
    pub frame_type: abi::SenderFrameType,
    pub t_tracked: f64,
    pub camera_handle: u64,
}

static SENT_FRAMES: Mutex<Vec<SentFrame>> = Mutex::new(Vec::new());

/// Every frame sent through any [`ScriptedApi`] in this process.
pub fn sent_frames() -> Vec<SentFrame> {
    SENT_FRAMES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Frames sent to `stream`, oldest first.
pub fn sent_frames_for(stream: StreamHandle) -> Vec<SentFrame> {
    sent_frames().into_iter().filter(|f| f.stream == stream).collect()
}

unsafe extern "C" fn scripted_send_frame(
    stream: abi::StreamHandle,
    frame_type: abi::SenderFrameType,
    _data: abi::SenderFrameTypeData,
    response: *const abi::FrameResponseData,
) -> abi::RsError {
    let Some(response) = (unsafe { response.as_ref() }) else {
        return abi::RS_ERROR_INVALID_PARAMETERS;
    };
    let Some(camera) = (unsafe { response.camera_data.as_ref() }) else {
        return abi::RS_ERROR_INVALID_PARAMETERS;
    };
    let t_tracked = camera.t_tracked;
    let camera_handle = camera.camera.camera_handle;
    SENT_FRAMES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push(SentFrame {
            stream: StreamHandle(stream),
            frame_type,
            t_tracked,
            camera_handle,
        });
    abi::RS_ERROR_SUCCESS
}

/// Fills the first row of a host-memory target with the low byte of the
/// image id.
unsafe extern "C" fn scripted_get_frame_image(
    image_id: i64,
    frame_type: abi::SenderFrameType,
    data: abi::SenderFrameTypeData,
) -> abi::RsError {
    if frame_type != abi::RS_FRAMETYPE_HOST_MEMORY {
        return abi::RS_ERROR_BADSTREAMTYPE;
    }
    let cpu = unsafe { data.cpu };
    let (ptr, stride) = (cpu.data, cpu.stride);
    if ptr.is_null() {
        return abi::RS_ERROR_INVALID_PARAMETERS;
    }
    unsafe { std::ptr::write_bytes(ptr, image_id as u8, stride as usize) };
    abi::RS_ERROR_SUCCESS
}

/// Scripted [`RenderStreamApi`].
///
/// Fields are public so a test can arrange state directly. With
/// `synthesize_frames` set, an empty await script yields a steady 60 fps
/// frame sequence instead of timeouts.
#[derive(Debug, Default)]
pub struct ScriptedApi {
    pub available: bool,
    pub initialised: bool,
    /// Schemas stored per asset path.
    pub stored_schemas: HashMap<PathBuf, ManagedSchema>,
    /// Last schema published through `set_schema`.
    pub published: Option<ManagedSchema>,
    pub streams: Vec<StreamDescription>,
    /// Enumerations that return no streams before `streams` is reported.
    pub empty_stream_polls: usize,
    pub await_script: VecDeque<AwaitOutcome>,
    pub synthesize_frames: bool,
    pub follower: bool,
    pub parameters: Vec<f32>,
    pub texts: Vec<String>,
    pub images: Vec<ImageFrameData>,
    pub cameras: HashMap<StreamHandle, CameraData>,
    pub calls: Vec<ApiCall>,
    synthesized: u64,
}

impl ScriptedApi {
    /// Available but not yet initialised.
    pub fn new() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    pub fn initialised() -> Self {
        Self {
            initialised: true,
            ..Self::new()
        }
    }

    pub fn with_streams(mut self, streams: Vec<StreamDescription>) -> Self {
        self.streams = streams;
        self
    }

    /// Queues await results, consumed one per await or follower frame.
    pub fn script(&mut self, outcomes: impl IntoIterator<Item = AwaitOutcome>) {
        self.await_script.extend(outcomes);
    }

    /// Recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    fn check(&self) -> Result<()> {
        if !self.initialised {
            return Err(RenderStreamError::NotInitialised);
        }
        Ok(())
    }

    fn next_outcome(&mut self) -> AwaitOutcome {
        if let Some(outcome) = self.await_script.pop_front() {
            return outcome;
        }
        if !self.synthesize_frames {
            return AwaitOutcome::Timeout;
        }
        self.synthesized += 1;
        AwaitOutcome::Frame(FrameData {
            t_tracked: self.synthesized as f64 / 60.0,
            local_time: self.synthesized as f64 / 60.0,
            local_time_delta: 1.0 / 60.0,
            frame_rate_numerator: 60,
            frame_rate_denominator: 1,
            ..FrameData::default()
        })
    }
}

fn scene_hash(name: &str, index: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    index.hash(&mut hasher);
    hasher.finish()
}

impl RenderStreamApi for ScriptedApi {
    fn is_available(&self) -> bool {
        self.available
    }

    fn initialize(&mut self) -> Result<()> {
        self.calls.push(ApiCall::Initialize);
        if !self.available {
            return Err(RenderStreamError::LibraryUnavailable("scripted library unavailable".into()));
        }
        self.initialised = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialised
    }

    fn load_schema(&mut self, asset_path: &Path) -> Result<ManagedSchema> {
        self.check()?;
        self.calls.push(ApiCall::LoadSchema(asset_path.to_path_buf()));
        self.stored_schemas
            .get(asset_path)
            .cloned()
            .ok_or_else(|| RenderStreamError::Schema(format!("no schema stored for {}", asset_path.display())))
    }

    fn save_schema(&mut self, asset_path: &Path, schema: &ManagedSchema) -> Result<()> {
        self.check()?;
        self.calls.push(ApiCall::SaveSchema(asset_path.to_path_buf()));
        self.stored_schemas.insert(asset_path.to_path_buf(), schema.clone());
        Ok(())
    }

    fn set_schema(&mut self, schema: &mut ManagedSchema) -> Result<()> {
        self.check()?;
        self.calls.push(ApiCall::SetSchema);
        for (index, scene) in schema.scenes.iter_mut().enumerate() {
            scene.hash = scene_hash(&scene.name, index);
        }
        self.published = Some(schema.clone());
        Ok(())
    }

    fn get_streams(&mut self) -> Result<Vec<StreamDescription>> {
        self.check()?;
        self.calls.push(ApiCall::GetStreams);
        if self.empty_stream_polls > 0 {
            self.empty_stream_polls -= 1;
            return Ok(Vec::new());
        }
        Ok(self.streams.clone())
    }

    fn await_frame_data(&mut self, _timeout: Duration) -> Result<AwaitOutcome> {
        self.check()?;
        self.calls.push(ApiCall::AwaitFrameData);
        Ok(self.next_outcome())
    }

    fn set_follower(&mut self, follower: bool) -> Result<()> {
        self.check()?;
        self.calls.push(ApiCall::SetFollower(follower));
        self.follower = follower;
        Ok(())
    }

    fn begin_follower_frame(&mut self, frame: &FrameData) -> Result<AwaitOutcome> {
        self.check()?;
        self.calls.push(ApiCall::BeginFollowerFrame(frame.t_tracked));
        Ok(match self.next_outcome() {
            AwaitOutcome::Frame(_) => AwaitOutcome::Frame(*frame),
            other => other,
        })
    }

    fn get_frame_parameters(&mut self, schema_hash: u64, out: &mut [f32]) -> Result<()> {
        self.check()?;
        self.calls.push(ApiCall::GetFrameParameters {
            schema_hash,
            len: out.len(),
        });
        let n = out.len().min(self.parameters.len());
        out[..n].copy_from_slice(&self.parameters[..n]);
        out[n..].fill(0.0);
        Ok(())
    }

    fn get_frame_image_data(&mut self, schema_hash: u64, count: usize) -> Result<Vec<ImageFrameData>> {
        self.check()?;
        self.calls.push(ApiCall::GetFrameImageData { schema_hash, count });
        Ok(self.images.iter().take(count).copied().collect())
    }

    fn get_frame_text(&mut self, schema_hash: u64, index: u32) -> Result<String> {
        self.check()?;
        self.calls.push(ApiCall::GetFrameText { schema_hash, index });
        self.texts.get(index as usize).cloned().ok_or(RenderStreamError::Native {
            call: "rs_getFrameText",
            status: super::NativeStatus::InvalidParameters,
        })
    }

    fn get_frame_camera(&mut self, stream: StreamHandle) -> Result<Option<CameraData>> {
        self.check()?;
        self.calls.push(ApiCall::GetFrameCamera(stream));
        Ok(self.cameras.get(&stream).copied())
    }

    fn send_frame_fn(&self) -> Option<abi::RsSendFrameFn> {
        self.initialised.then_some(scripted_send_frame as abi::RsSendFrameFn)
    }

    fn get_frame_image_fn(&self) -> Option<abi::RsGetFrameImageFn> {
        self.initialised.then_some(scripted_get_frame_image as abi::RsGetFrameImageFn)
    }

    fn log_to_compositor(&self, message: &str) -> Result<()> {
        self.check()?;
        tracing::debug!(message, "Scripted compositor log");
        Ok(())
    }

    fn set_status_message(&self, message: &str) -> Result<()> {
        self.check()?;
        tracing::debug!(message, "Scripted status message");
        Ok(())
    }

    fn send_profiling_data(&self, entries: &[(&str, f32)]) -> Result<()> {
        self.check()?;
        tracing::trace!(count = entries.len(), "Scripted profiling data");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.calls.push(ApiCall::Shutdown);
        self.initialised = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_before_initialize_fail() {
        let mut api = ScriptedApi::new();
        assert!(matches!(api.get_streams(), Err(RenderStreamError::NotInitialised)));
        assert!(api.send_frame_fn().is_none());
        api.initialize().unwrap();
        assert!(api.get_streams().unwrap().is_empty());
    }

    #[test]
    fn test_set_schema_assigns_distinct_hashes() {
        let mut api = ScriptedApi::initialised();
        let mut schema = ManagedSchema::fallback();
        schema.scenes.push(crate::core::schema::ManagedRemoteParameters::new("Second"));
        api.set_schema(&mut schema).unwrap();
        assert_ne!(schema.scenes[0].hash, 0);
        assert_ne!(schema.scenes[0].hash, schema.scenes[1].hash);
        assert_eq!(api.published.as_ref(), Some(&schema));
    }

    #[test]
    fn test_synthesized_frames_advance() {
        let mut api = ScriptedApi::initialised();
        api.script([AwaitOutcome::StreamsChanged]);
        api.synthesize_frames = true;
        assert_eq!(
            api.await_frame_data(Duration::ZERO).unwrap(),
            AwaitOutcome::StreamsChanged
        );
        let AwaitOutcome::Frame(a) = api.await_frame_data(Duration::ZERO).unwrap() else {
            panic!("expected frame");
        };
        let AwaitOutcome::Frame(b) = api.await_frame_data(Duration::ZERO).unwrap() else {
            panic!("expected frame");
        };
        assert!(b.t_tracked > a.t_tracked);
    }
}
