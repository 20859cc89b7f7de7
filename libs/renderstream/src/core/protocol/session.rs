// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! RenderStream session: schema publication, the per-frame protocol and
//! frame sends for one process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use renderstream_abi as abi;

use crate::core::binding::{ParameterRegistry, SceneBindings, apply_numeric, apply_texts, bind_scene};
use crate::core::config::RenderStreamConfig;
use crate::core::error::{RenderStreamError, Result};
use crate::core::frames::{FrameData, StreamDescription};
use crate::core::native::{AwaitOutcome, RenderStreamApi};
use crate::core::pool::{EventDataPool, EventDataPoolStats};
use crate::core::render::{ImageInput, RenderCommandQueue, SendFrameCommand, TextureBlitter};
use crate::core::schema::{ManagedRemoteParameters, ManagedSchema};
use crate::core::textures::TextureAllocator;

use super::relay::FrameDataRelay;
use super::sender::{FrameSender, SendResult};
use super::state::{FrameOutcome, ProtocolRole, ProtocolState, SceneControl};
use super::streams::wait_for_streams;

/// One process's RenderStream session.
///
/// Drive it once per engine frame: [`RenderStream::tick`], then any
/// [`RenderStream::update_images`] and [`RenderStream::send_frame`] calls,
/// then [`RenderStream::end_frame`].
pub struct RenderStream<A: RenderStreamApi> {
    api: A,
    config: RenderStreamConfig,
    asset_path: PathBuf,
    schema: ManagedSchema,
    state: ProtocolState,
    role: ProtocolRole,
    streams: Vec<StreamDescription>,
    senders: Vec<FrameSender>,
    streams_generation: u64,
    scene_bindings: HashMap<u32, SceneBindings>,
    current_scene: u32,
    latest_frame: FrameData,
    has_new_frame_data: bool,
    engine_frame: u64,
    send_pool: EventDataPool<SendFrameCommand>,
    relay: Option<Box<dyn FrameDataRelay>>,
    follower_source: Option<Receiver<FrameData>>,
    parameter_buffer: Vec<f32>,
}

impl<A: RenderStreamApi> RenderStream<A> {
    /// Initialises the library, publishes the schema for `asset_path` and
    /// enumerates streams.
    ///
    /// A schema that cannot be loaded is replaced by one empty scene named
    /// [`ManagedSchema::DEFAULT_SCENE_NAME`].
    pub fn start(mut api: A, config: RenderStreamConfig, asset_path: impl AsRef<Path>) -> Result<Self> {
        let asset_path = asset_path.as_ref().to_path_buf();
        if !api.is_available() {
            return Err(RenderStreamError::LibraryUnavailable(
                "RenderStream library not loaded".to_string(),
            ));
        }
        if !api.is_initialized() {
            api.initialize()?;
        }

        let mut schema = match api.load_schema(&asset_path) {
            Ok(schema) => schema,
            Err(e) => {
                tracing::warn!(
                    asset = %asset_path.display(),
                    error = %e,
                    "Failed to load schema, using default schema"
                );
                ManagedSchema::fallback()
            }
        };
        if schema.scenes.is_empty() {
            schema
                .scenes
                .push(ManagedRemoteParameters::new(ManagedSchema::DEFAULT_SCENE_NAME));
        }
        if schema.engine_name.is_empty() {
            schema.engine_name = config.protocol.engine_name.clone();
        }
        if schema.engine_version.is_empty() {
            schema.engine_version = config.protocol.engine_version.clone();
        }
        schema.validate().map_err(RenderStreamError::Schema)?;
        api.set_schema(&mut schema)?;
        tracing::info!(
            asset = %asset_path.display(),
            scenes = schema.scenes.len(),
            channels = schema.channels.len(),
            "Published schema"
        );

        let send_pool = EventDataPool::with_frames_to_keep_alive(config.pool.frames_to_keep_alive);
        let mut session = Self {
            api,
            config,
            asset_path,
            schema,
            state: ProtocolState::AwaitingStreams,
            role: ProtocolRole::Controller,
            streams: Vec::new(),
            senders: Vec::new(),
            streams_generation: 0,
            scene_bindings: HashMap::new(),
            current_scene: 0,
            latest_frame: FrameData::default(),
            has_new_frame_data: false,
            engine_frame: 0,
            send_pool,
            relay: None,
            follower_source: None,
            parameter_buffer: Vec::new(),
        };
        session.create_streams()?;
        Ok(session)
    }

    /// Publishes every frame this controller receives through `relay`.
    pub fn attach_emitter(&mut self, relay: Box<dyn FrameDataRelay>) {
        tracing::info!("Relaying frame data to followers");
        self.relay = Some(relay);
    }

    /// Switches to follower mode: frames come from `source` instead of the
    /// compositor.
    pub fn attach_follower(&mut self, source: Receiver<FrameData>) -> Result<()> {
        self.api.set_follower(true)?;
        self.role = ProtocolRole::Follower;
        self.follower_source = Some(source);
        tracing::info!("Following relayed frame data");
        Ok(())
    }

    /// Binds scene `index` of the published schema to `registry`'s fields,
    /// replacing any earlier binding of that scene.
    pub fn bind_scene(&mut self, index: u32, registry: &ParameterRegistry) -> Result<&SceneBindings> {
        let scene = self
            .schema
            .scene(index)
            .ok_or_else(|| RenderStreamError::Schema(format!("schema has no scene {index}")))?;
        let bindings = bind_scene(scene, registry);
        if !bindings.unresolved.is_empty() {
            tracing::debug!(
                scene = %bindings.scene_name,
                unresolved = bindings.unresolved.len(),
                "Scene has unbound parameters"
            );
        }
        self.scene_bindings.insert(index, bindings);
        self.scene_bindings
            .get(&index)
            .ok_or_else(|| RenderStreamError::Schema(format!("scene {index} not bound")))
    }

    /// Runs one protocol step: waits for frame data and, if it arrived,
    /// applies the current scene's numeric and text parameters.
    pub fn tick(&mut self) -> Result<FrameOutcome> {
        match self.state {
            ProtocolState::Quit => return Ok(FrameOutcome::Quit),
            ProtocolState::Uninitialized => return Err(RenderStreamError::NotInitialised),
            _ => {}
        }

        self.engine_frame += 1;
        self.has_new_frame_data = false;

        let awaited = match self.role {
            ProtocolRole::Controller => {
                self.state = ProtocolState::Emitting;
                self.api.await_frame_data(self.config.protocol.await_timeout())
            }
            ProtocolRole::Follower => {
                self.state = ProtocolState::Following;
                self.next_follower_outcome()
            }
        };
        let outcome = match awaited {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state = ProtocolState::Idle;
                return Err(e);
            }
        };

        match outcome {
            AwaitOutcome::Quit => {
                tracing::info!("Compositor requested quit");
                self.state = ProtocolState::Quit;
                Ok(FrameOutcome::Quit)
            }
            AwaitOutcome::StreamsChanged => {
                tracing::info!("Streams changed");
                self.state = ProtocolState::AwaitingStreams;
                self.create_streams()?;
                Ok(FrameOutcome::StreamsChanged)
            }
            AwaitOutcome::Timeout => {
                self.state = ProtocolState::Idle;
                Ok(FrameOutcome::NoFrame)
            }
            AwaitOutcome::Frame(frame) => self.on_frame(frame),
        }
    }

    fn next_follower_outcome(&mut self) -> Result<AwaitOutcome> {
        let Some(source) = self.follower_source.as_ref() else {
            return Err(RenderStreamError::Configuration(
                "follower has no frame data source".to_string(),
            ));
        };
        match source.recv_timeout(self.config.protocol.await_timeout()) {
            Ok(frame) => self.api.begin_follower_frame(&frame),
            Err(RecvTimeoutError::Timeout) => Ok(AwaitOutcome::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(RenderStreamError::Negotiation(
                "frame data source disconnected".to_string(),
            )),
        }
    }

    fn on_frame(&mut self, frame: FrameData) -> Result<FrameOutcome> {
        if let Some(relay) = self.relay.as_ref() {
            if let Err(e) = relay.publish(&frame) {
                tracing::warn!(error = %e, "Failed to relay frame data");
            }
        }
        self.latest_frame = frame;

        let scene = match self.config.protocol.scene_control {
            SceneControl::Manual => 0,
            SceneControl::Selection => frame.scene,
        };
        if scene as usize >= self.schema.scenes.len() {
            tracing::warn!(
                scene,
                scenes = self.schema.scenes.len(),
                "Frame names an unknown scene, discarding"
            );
            self.state = ProtocolState::Idle;
            return Ok(FrameOutcome::Discarded { scene });
        }
        if scene != self.current_scene {
            let from = self.current_scene;
            self.current_scene = scene;
            tracing::info!(from, to = scene, "Scene changed");
            self.state = ProtocolState::Idle;
            return Ok(FrameOutcome::SceneChanged { from, to: scene });
        }

        self.has_new_frame_data = true;
        self.apply_scene_parameters(scene);
        Ok(FrameOutcome::NewFrame(frame))
    }

    /// Texts are only fetched once the numeric fetch has succeeded.
    fn apply_scene_parameters(&mut self, scene: u32) {
        let Some(bindings) = self.scene_bindings.get(&scene) else {
            tracing::trace!(scene, "No bindings for scene");
            return;
        };
        let hash = bindings.schema_hash;

        if bindings.numeric_slot_count > 0 {
            self.parameter_buffer.resize(bindings.numeric_slot_count, 0.0);
            if let Err(e) = self.api.get_frame_parameters(hash, &mut self.parameter_buffer) {
                tracing::warn!(scene = %bindings.scene_name, error = %e, "Failed to get frame parameters");
                return;
            }
            if let Err(e) = apply_numeric(bindings, &self.parameter_buffer) {
                tracing::warn!(scene = %bindings.scene_name, error = %e, "Failed to apply parameters");
            }
        }

        let api = &mut self.api;
        apply_texts(bindings, |index| api.get_frame_text(hash, index));
    }

    /// Re-enumerates streams and rebuilds the frame senders.
    fn create_streams(&mut self) -> Result<()> {
        let streams = wait_for_streams(
            &mut self.api,
            self.config.protocol.stream_retry_interval(),
            self.config.protocol.max_stream_polls,
            std::thread::sleep,
        )?;
        self.senders = streams.iter().map(FrameSender::new).collect();
        self.streams = streams;
        self.streams_generation += 1;
        self.latest_frame = FrameData::default();
        self.has_new_frame_data = false;
        self.state = ProtocolState::Idle;
        Ok(())
    }

    /// Sends the frame rendered for stream `stream_index`.
    ///
    /// Skipped without new frame data this cycle, and at most once per
    /// stream per [`RenderStream::tick`].
    pub fn send_frame<Q>(
        &mut self,
        stream_index: usize,
        frame_type: abi::SenderFrameType,
        frame_data: abi::SenderFrameTypeData,
        queue: &Q,
    ) -> Result<SendResult>
    where
        Q: RenderCommandQueue + ?Sized,
    {
        let sender = self
            .senders
            .get_mut(stream_index)
            .ok_or(RenderStreamError::UnknownStream(stream_index))?;
        if !self.has_new_frame_data {
            return Ok(SendResult::NoFrameData);
        }
        sender.send(
            &mut self.api,
            &mut self.send_pool,
            queue,
            self.engine_frame,
            &self.latest_frame,
            frame_type,
            frame_data,
        )
    }

    /// Delivers the current scene's remote images through `input`.
    pub fn update_images<T, Al, Q, B>(
        &mut self,
        input: &mut ImageInput<T, Al>,
        queue: &Q,
        blitter: &mut B,
    ) -> Result<usize>
    where
        Al: TextureAllocator<T>,
        Q: RenderCommandQueue + ?Sized,
        B: TextureBlitter<T>,
    {
        if !self.has_new_frame_data {
            return Ok(0);
        }
        let Some(bindings) = self.scene_bindings.get(&self.current_scene) else {
            return Ok(0);
        };
        input.update(&mut self.api, bindings, queue, blitter)
    }

    /// Ages in-flight send commands. Call once per engine frame after all
    /// sends.
    pub fn end_frame(&mut self) {
        self.send_pool.on_frame_boundary();
        if self.state.is_in_frame() {
            self.state = ProtocolState::Idle;
        }
    }

    /// Releases the library. The session reports [`FrameOutcome::Quit`]
    /// afterwards.
    pub fn shutdown(&mut self) {
        if self.api.is_initialized() {
            tracing::info!("Shutting down RenderStream");
            self.api.shutdown();
        }
        self.state = ProtocolState::Quit;
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn config(&self) -> &RenderStreamConfig {
        &self.config
    }

    pub fn asset_path(&self) -> &Path {
        &self.asset_path
    }

    /// The published schema, with library-assigned scene hashes.
    pub fn schema(&self) -> &ManagedSchema {
        &self.schema
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn role(&self) -> ProtocolRole {
        self.role
    }

    pub fn streams(&self) -> &[StreamDescription] {
        &self.streams
    }

    pub fn senders(&self) -> &[FrameSender] {
        &self.senders
    }

    /// Increments every time streams are enumerated. Hosts holding per-stream
    /// textures drop them when it changes.
    pub fn streams_generation(&self) -> u64 {
        self.streams_generation
    }

    pub fn scene_bindings(&self, index: u32) -> Option<&SceneBindings> {
        self.scene_bindings.get(&index)
    }

    pub fn current_scene(&self) -> u32 {
        self.current_scene
    }

    pub fn latest_frame(&self) -> &FrameData {
        &self.latest_frame
    }

    pub fn has_new_frame_data(&self) -> bool {
        self.has_new_frame_data
    }

    /// Ticks so far.
    pub fn engine_frame(&self) -> u64 {
        self.engine_frame
    }

    pub fn send_pool_stats(&self) -> EventDataPoolStats {
        self.send_pool.stats()
    }
}

impl<A: RenderStreamApi> Drop for RenderStream<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::binding::{ExposedParameters, ParameterValue, SharedSlot, ValueSlot, shared_slot};
    use crate::core::frames::{CameraData, StreamHandle};
    use crate::core::native::{ApiCall, ScriptedApi, sent_frames_for};
    use crate::core::protocol::FrameDataBus;
    use crate::core::render::ImmediateRenderQueue;
    use crate::core::schema::{ManagedRemoteParameter, RemoteParameterType};

    const ASSET: &str = "/projects/demo.exe";

    fn stream(handle: u64) -> StreamDescription {
        StreamDescription {
            handle: StreamHandle(handle),
            name: format!("stream {handle:x}"),
            width: 2,
            height: 1,
            ..Default::default()
        }
    }

    fn two_scene_schema() -> ManagedSchema {
        let mut main = ManagedRemoteParameters::new("Main");
        main.parameters = vec![
            ManagedRemoteParameter::number("Light intensity", "Light intensity", 0.0, 10.0, 0.1, 1.0),
            ManagedRemoteParameter::of_type("Light label", "Light label", RemoteParameterType::Text),
        ];
        ManagedSchema {
            scenes: vec![main, ManagedRemoteParameters::new("Other")],
            ..Default::default()
        }
    }

    fn api_with(schema: ManagedSchema, streams: Vec<StreamDescription>) -> ScriptedApi {
        let mut api = ScriptedApi::new().with_streams(streams);
        api.stored_schemas.insert(PathBuf::from(ASSET), schema);
        api
    }

    fn light_registry() -> (ParameterRegistry, SharedSlot, SharedSlot) {
        let intensity = shared_slot(ValueSlot::new(ParameterValue::Float(0.0)));
        let label = shared_slot(ValueSlot::new(ParameterValue::Text(String::new())));
        let mut light = ExposedParameters::new("Light", "Light");
        light.register("intensity", intensity.clone()).unwrap();
        light.register("label", label.clone()).unwrap();
        let mut registry = ParameterRegistry::new();
        registry.register(light).unwrap();
        (registry, intensity, label)
    }

    fn frame(t_tracked: f64, scene: u32) -> AwaitOutcome {
        AwaitOutcome::Frame(FrameData {
            t_tracked,
            scene,
            ..Default::default()
        })
    }

    #[test]
    fn test_start_publishes_schema_and_streams() {
        let api = api_with(two_scene_schema(), vec![stream(1), stream(2)]);
        let session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        assert_eq!(session.state(), ProtocolState::Idle);
        assert_eq!(session.streams().len(), 2);
        assert_eq!(session.senders().len(), 2);
        assert_eq!(session.streams_generation(), 1);
        assert_eq!(session.schema().engine_name, "renderstream-rs");
        assert_ne!(session.schema().scenes[0].hash, 0);

        let calls = &session.api().calls;
        let set_schema = calls.iter().position(|c| *c == ApiCall::SetSchema).unwrap();
        let get_streams = calls.iter().position(|c| *c == ApiCall::GetStreams).unwrap();
        assert!(set_schema < get_streams);
    }

    #[test]
    fn test_missing_schema_falls_back_to_default_scene() {
        let api = ScriptedApi::new().with_streams(vec![stream(1)]);
        let session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        assert_eq!(session.schema().scenes.len(), 1);
        assert_eq!(session.schema().scenes[0].name, ManagedSchema::DEFAULT_SCENE_NAME);
    }

    #[test]
    fn test_unavailable_library_is_rejected() {
        let api = ScriptedApi::default();
        assert!(matches!(
            RenderStream::start(api, RenderStreamConfig::default(), ASSET),
            Err(RenderStreamError::LibraryUnavailable(_))
        ));
    }

    #[test]
    fn test_new_frame_applies_numeric_and_text_parameters() {
        let mut api = api_with(two_scene_schema(), vec![stream(1)]);
        api.parameters = vec![4.5];
        api.texts = vec!["key light".to_string()];
        api.script([frame(1.0, 0)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        let (registry, intensity, label) = light_registry();
        let bindings = session.bind_scene(0, &registry).unwrap();
        assert_eq!(bindings.numeric.len(), 1);

        let outcome = session.tick().unwrap();
        assert!(outcome.has_new_frame_data());
        assert!(session.has_new_frame_data());
        assert_eq!(session.state(), ProtocolState::Emitting);
        assert_eq!(intensity.lock().get(), ParameterValue::Float(4.5));
        assert_eq!(label.lock().get(), ParameterValue::Text("key light".to_string()));

        session.end_frame();
        assert_eq!(session.state(), ProtocolState::Idle);
    }

    #[test]
    fn test_failed_parameter_fetch_skips_texts() {
        let mut api = api_with(two_scene_schema(), vec![stream(1)]);
        api.texts = vec!["ignored".to_string()];
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        let (registry, _, label) = light_registry();
        session.bind_scene(0, &registry).unwrap();

        session.api_mut().initialised = false;
        assert!(session.on_frame(FrameData::default()).unwrap().has_new_frame_data());
        assert_eq!(label.lock().get(), ParameterValue::Text(String::new()));
    }

    #[test]
    fn test_timeout_is_not_an_error() {
        let api = api_with(two_scene_schema(), vec![stream(1)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        assert_eq!(session.tick().unwrap(), FrameOutcome::NoFrame);
        assert!(!session.has_new_frame_data());
        assert_eq!(session.state(), ProtocolState::Idle);
    }

    #[test]
    fn test_failed_await_returns_to_idle() {
        let mut api = api_with(two_scene_schema(), vec![stream(1)]);
        api.script([frame(1.0, 0)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        session.tick().unwrap();
        assert_eq!(session.state(), ProtocolState::Emitting);

        session.api_mut().initialised = false;
        assert!(matches!(session.tick(), Err(RenderStreamError::NotInitialised)));
        assert_eq!(session.state(), ProtocolState::Idle);
        assert!(!session.has_new_frame_data());
    }

    #[test]
    fn test_scene_change_suppresses_processing() {
        let mut api = api_with(two_scene_schema(), vec![stream(1)]);
        api.parameters = vec![9.0];
        api.script([frame(1.0, 1), frame(2.0, 1)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        let (registry, intensity, _) = light_registry();
        session.bind_scene(0, &registry).unwrap();

        assert_eq!(session.tick().unwrap(), FrameOutcome::SceneChanged { from: 0, to: 1 });
        assert!(!session.has_new_frame_data());
        assert_eq!(session.current_scene(), 1);
        assert!(session.tick().unwrap().has_new_frame_data());
        // Scene 1 binds nothing, so scene 0's field is untouched.
        assert_eq!(intensity.lock().get(), ParameterValue::Float(0.0));
    }

    #[test]
    fn test_manual_scene_control_ignores_scene_index() {
        let mut api = api_with(two_scene_schema(), vec![stream(1)]);
        api.parameters = vec![2.0];
        api.script([frame(1.0, 1)]);
        let mut config = RenderStreamConfig::default();
        config.protocol.scene_control = SceneControl::Manual;
        let mut session = RenderStream::start(api, config, ASSET).unwrap();
        let (registry, intensity, _) = light_registry();
        session.bind_scene(0, &registry).unwrap();

        assert!(session.tick().unwrap().has_new_frame_data());
        assert_eq!(intensity.lock().get(), ParameterValue::Float(2.0));
    }

    #[test]
    fn test_out_of_range_scene_is_discarded() {
        let mut api = api_with(two_scene_schema(), vec![stream(1)]);
        api.script([frame(1.0, 3), frame(2.0, 0)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        assert_eq!(session.tick().unwrap(), FrameOutcome::Discarded { scene: 3 });
        assert_eq!(session.current_scene(), 0);
        assert!(session.tick().unwrap().has_new_frame_data());
    }

    #[test]
    fn test_streams_changed_reenumerates_without_applying() {
        let mut api = api_with(two_scene_schema(), vec![stream(1)]);
        api.parameters = vec![7.0];
        api.script([AwaitOutcome::StreamsChanged]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        let (registry, intensity, _) = light_registry();
        session.bind_scene(0, &registry).unwrap();
        session.api_mut().streams.push(stream(2));

        assert_eq!(session.tick().unwrap(), FrameOutcome::StreamsChanged);
        assert_eq!(session.streams().len(), 2);
        assert_eq!(session.streams_generation(), 2);
        assert_eq!(intensity.lock().get(), ParameterValue::Float(0.0));
        assert_eq!(
            session.api().count_calls(|c| matches!(c, ApiCall::GetFrameParameters { .. })),
            0
        );
    }

    #[test]
    fn test_quit_is_terminal() {
        let mut api = api_with(two_scene_schema(), vec![stream(1)]);
        api.script([AwaitOutcome::Quit, frame(1.0, 0)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        assert_eq!(session.tick().unwrap(), FrameOutcome::Quit);
        assert_eq!(session.tick().unwrap(), FrameOutcome::Quit);
        assert_eq!(session.state(), ProtocolState::Quit);
        assert_eq!(session.api().count_calls(|c| *c == ApiCall::AwaitFrameData), 1);
    }

    #[test]
    fn test_send_frame_requires_new_frame_data() {
        let handle = StreamHandle(0xB001);
        let mut api = api_with(two_scene_schema(), vec![stream(handle.0)]);
        api.cameras.insert(
            handle,
            CameraData {
                camera_handle: 5,
                ..Default::default()
            },
        );
        api.script([frame(3.0, 0)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        let mut pixels = vec![0u8; 8];
        let data = abi::SenderFrameTypeData {
            cpu: abi::HostMemoryData {
                data: pixels.as_mut_ptr(),
                stride: 8,
            },
        };

        let before = session
            .send_frame(0, abi::RS_FRAMETYPE_HOST_MEMORY, data, &ImmediateRenderQueue)
            .unwrap();
        assert_eq!(before, SendResult::NoFrameData);

        session.tick().unwrap();
        let sent = session
            .send_frame(0, abi::RS_FRAMETYPE_HOST_MEMORY, data, &ImmediateRenderQueue)
            .unwrap();
        let again = session
            .send_frame(0, abi::RS_FRAMETYPE_HOST_MEMORY, data, &ImmediateRenderQueue)
            .unwrap();
        assert_eq!(sent, SendResult::Submitted);
        assert_eq!(again, SendResult::AlreadySent);
        assert_eq!(session.send_pool_stats().in_use, 1);

        let frames = sent_frames_for(handle);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].t_tracked, 3.0);
        assert_eq!(frames[0].camera_handle, 5);

        assert!(matches!(
            session.send_frame(4, abi::RS_FRAMETYPE_HOST_MEMORY, data, &ImmediateRenderQueue),
            Err(RenderStreamError::UnknownStream(4))
        ));

        session.end_frame();
        session.end_frame();
        assert_eq!(session.send_pool_stats().in_use, 0);
    }

    #[test]
    fn test_follower_consumes_relayed_frames() {
        let api = api_with(two_scene_schema(), vec![stream(1)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        let (sender, receiver) = crossbeam_channel::unbounded();
        session.attach_follower(receiver).unwrap();
        assert_eq!(session.role(), ProtocolRole::Follower);
        assert!(session.api().follower);

        session.api_mut().script([frame(0.0, 0)]);
        sender
            .send(FrameData {
                t_tracked: 8.0,
                ..Default::default()
            })
            .unwrap();
        let outcome = session.tick().unwrap();
        assert!(outcome.has_new_frame_data());
        assert_eq!(session.latest_frame().t_tracked, 8.0);
        assert_eq!(session.state(), ProtocolState::Following);
        assert!(session.api().calls.contains(&ApiCall::BeginFollowerFrame(8.0)));
        assert_eq!(session.api().count_calls(|c| *c == ApiCall::AwaitFrameData), 0);
    }

    #[test]
    fn test_emitter_relays_frames() {
        let mut api = api_with(two_scene_schema(), vec![stream(1)]);
        api.script([frame(4.0, 0)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        let bus = FrameDataBus::new();
        let follower = bus.subscribe();
        session.attach_emitter(Box::new(bus));
        session.tick().unwrap();
        assert_eq!(follower.try_recv().unwrap().t_tracked, 4.0);
    }

    #[test]
    fn test_shutdown_releases_library() {
        let api = api_with(two_scene_schema(), vec![stream(1)]);
        let mut session = RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap();
        session.shutdown();
        assert!(!session.api().initialised);
        assert_eq!(session.tick().unwrap(), FrameOutcome::Quit);
    }
}
