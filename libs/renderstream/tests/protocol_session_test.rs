// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Whole-session scenarios against the scripted library.

use std::path::PathBuf;

use renderstream::abi;
use renderstream::core::binding::{ParameterSlot, SharedSlot};
use renderstream::core::native::{ApiCall, sent_frames_for};
use renderstream::core::render::{HostImageTargets, ImmediateRenderQueue};
use renderstream::core::textures::ScratchTextureManager;
use renderstream::{
    AwaitOutcome, CameraData, ExposedParameters, FrameData, FrameDataBus, FrameOutcome,
    HostMemoryAllocator, HostTexture, ImageFrameData, ImageInput, ManagedRemoteParameter,
    ManagedRemoteParameters, ManagedSchema, ParameterRegistry, ParameterValue, PixelFormat,
    ProtocolState, RemoteParameterType, RenderCommandQueue, RenderStream, RenderStreamConfig,
    ScriptedApi, SendResult, StreamDescription, StreamHandle, ThreadedRenderQueue, ValueSlot,
    shared_slot,
};

const ASSET: &str = "/projects/stage.exe";

fn stream(handle: u64) -> StreamDescription {
    StreamDescription {
        handle: StreamHandle(handle),
        channel: "Main".to_string(),
        name: format!("stream {handle:x}"),
        width: 4,
        height: 2,
        format: PixelFormat::Bgra8,
        ..Default::default()
    }
}

fn frame(t_tracked: f64, scene: u32) -> AwaitOutcome {
    AwaitOutcome::Frame(FrameData {
        t_tracked,
        scene,
        ..Default::default()
    })
}

fn value(slot: &SharedSlot) -> ParameterValue {
    slot.lock().get()
}

struct Rig {
    registry: ParameterRegistry,
    tint: SharedSlot,
    pose: SharedSlot,
    tags: SharedSlot,
    screen: SharedSlot,
}

fn rig() -> Rig {
    let tint = shared_slot(ValueSlot::new(ParameterValue::Color([1.0; 4])));
    let pose = shared_slot(ValueSlot::new(ParameterValue::Transform(Default::default())));
    let tags = shared_slot(ValueSlot::new(ParameterValue::TextList(Vec::new())));
    let screen = shared_slot(ValueSlot::new(ParameterValue::Image(None)));

    let mut object = ExposedParameters::new("Rig", "Rig");
    object.register("tint", tint.clone()).unwrap();
    object.register("pose", pose.clone()).unwrap();
    object.register("tags", tags.clone()).unwrap();
    object.register("screen", screen.clone()).unwrap();
    let mut registry = ParameterRegistry::new();
    registry.register(object).unwrap();

    Rig {
        registry,
        tint,
        pose,
        tags,
        screen,
    }
}

/// Scene 0 exposes the rig, scene 1 a single unrelated number.
fn rig_schema(registry: &ParameterRegistry) -> ManagedSchema {
    let mut main = ManagedRemoteParameters::new("Stage");
    main.parameters = registry.objects()[0].schema_parameters();
    let mut other = ManagedRemoteParameters::new("Backstage");
    other.parameters = vec![ManagedRemoteParameter::number("Haze density", "Haze", 0.0, 1.0, 0.01, 0.0)];
    let mut schema = ManagedSchema {
        scenes: vec![main, other],
        ..Default::default()
    };
    schema.add_channel("Main");
    schema
}

fn start(api: ScriptedApi) -> RenderStream<ScriptedApi> {
    RenderStream::start(api, RenderStreamConfig::default(), ASSET).unwrap()
}

fn api_for(schema: ManagedSchema, streams: Vec<StreamDescription>) -> ScriptedApi {
    let mut api = ScriptedApi::new().with_streams(streams);
    api.stored_schemas.insert(PathBuf::from(ASSET), schema);
    api
}

#[test]
fn test_composite_and_transform_fields_follow_the_compositor() {
    let rig = rig();
    let schema = rig_schema(&rig.registry);
    // tint r, g, b, a then the pose matrix.
    let stage = &schema.scenes[0];
    assert_eq!(stage.numeric_slot_count(), 20);
    assert_eq!(stage.count_of(RemoteParameterType::Text), 1);
    assert_eq!(stage.count_of(RemoteParameterType::Image), 1);

    let mut api = api_for(schema, vec![stream(0x5101)]);
    #[rustfmt::skip]
    let matrix = [
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        2.0, 3.0, 4.0, 1.0,
    ];
    api.parameters = [0.25, 0.5, 0.75, 1.0].into_iter().chain(matrix).collect();
    api.texts = vec!["spot  wash".to_string()];
    api.script([frame(1.0, 0)]);

    let mut session = start(api);
    let bindings = session.bind_scene(0, &rig.registry).unwrap();
    assert_eq!(bindings.numeric.len(), 2);
    assert!(bindings.unresolved.is_empty());

    let outcome = session.tick().unwrap();
    assert!(outcome.has_new_frame_data());
    assert_eq!(value(&rig.tint), ParameterValue::Color([0.25, 0.5, 0.75, 1.0]));
    let ParameterValue::Transform(pose) = value(&rig.pose) else {
        panic!("expected transform");
    };
    assert_eq!(pose.position, [2.0, 3.0, 4.0]);
    assert_eq!(pose.scale, [1.0, 1.0, 1.0]);
    assert_eq!(
        value(&rig.tags),
        ParameterValue::TextList(vec!["spot".to_string(), "wash".to_string()])
    );
}

#[test]
fn test_streams_changed_enumerates_before_any_send() {
    let rig = rig();
    let handle = StreamHandle(0x5201);
    let mut api = api_for(rig_schema(&rig.registry), vec![stream(handle.0)]);
    api.parameters = vec![0.5; 20];
    api.script([AwaitOutcome::StreamsChanged, frame(2.0, 0)]);
    api.cameras.insert(handle, CameraData::default());

    let mut session = start(api);
    session.bind_scene(0, &rig.registry).unwrap();
    let mut textures: ScratchTextureManager<HostTexture, HostMemoryAllocator> =
        ScratchTextureManager::new("send", HostMemoryAllocator::default());
    let descriptor = session.senders()[0].texture_descriptor();

    assert_eq!(session.tick().unwrap(), FrameOutcome::StreamsChanged);
    assert_eq!(session.streams_generation(), 2);
    assert!(!session.has_new_frame_data());
    assert_eq!(value(&rig.tint), ParameterValue::Color([1.0; 4]));
    assert_eq!(
        session
            .api()
            .count_calls(|c| matches!(c, ApiCall::GetFrameParameters { .. })),
        0
    );

    let (_, frame_type, data) = textures.get_with_frame_data(&descriptor).unwrap();
    assert_eq!(
        session.send_frame(0, frame_type, data, &ImmediateRenderQueue).unwrap(),
        SendResult::NoFrameData
    );
    assert!(sent_frames_for(handle).is_empty());

    assert!(session.tick().unwrap().has_new_frame_data());
    assert_eq!(
        session.send_frame(0, frame_type, data, &ImmediateRenderQueue).unwrap(),
        SendResult::Submitted
    );
    assert_eq!(sent_frames_for(handle).len(), 1);
    session.end_frame();
}

#[test]
fn test_unknown_scene_is_discarded_and_the_next_frame_proceeds() {
    let rig = rig();
    let mut api = api_for(rig_schema(&rig.registry), vec![stream(0x5301)]);
    api.parameters = vec![0.5; 20];
    api.script([frame(1.0, 3), frame(2.0, 0)]);

    let mut session = start(api);
    session.bind_scene(0, &rig.registry).unwrap();

    assert_eq!(session.tick().unwrap(), FrameOutcome::Discarded { scene: 3 });
    assert_eq!(session.current_scene(), 0);
    assert_eq!(value(&rig.tint), ParameterValue::Color([1.0; 4]));
    session.end_frame();

    let outcome = session.tick().unwrap();
    assert!(matches!(outcome, FrameOutcome::NewFrame(f) if f.t_tracked == 2.0));
    assert_eq!(value(&rig.tint), ParameterValue::Color([0.5; 4]));
}

#[test]
fn test_scene_switch_takes_effect_on_the_following_frame() {
    let rig = rig();
    let haze = shared_slot(ValueSlot::new(ParameterValue::Float(0.0)));
    let mut registry = ParameterRegistry::new();
    registry
        .register(ExposedParameters::new("Haze", "Haze").with_field("density", haze.clone()).unwrap())
        .unwrap();

    let mut api = api_for(rig_schema(&rig.registry), vec![stream(0x5401)]);
    api.parameters = vec![0.8];
    api.script([frame(1.0, 1), frame(2.0, 1)]);
    let mut session = start(api);
    session.bind_scene(1, &registry).unwrap();

    assert_eq!(session.tick().unwrap(), FrameOutcome::SceneChanged { from: 0, to: 1 });
    assert_eq!(value(&haze), ParameterValue::Float(0.0));
    session.end_frame();

    assert!(session.tick().unwrap().has_new_frame_data());
    assert_eq!(value(&haze), ParameterValue::Float(0.8));
}

#[test]
fn test_sends_through_render_worker() {
    let handles = [StreamHandle(0x5501), StreamHandle(0x5502)];
    let schema = ManagedSchema::fallback();
    let mut api = api_for(schema, handles.iter().map(|h| stream(h.0)).collect());
    for handle in handles {
        api.cameras.insert(
            handle,
            CameraData {
                camera_handle: handle.0,
                ..Default::default()
            },
        );
    }
    api.script([frame(10.0, 0), frame(11.0, 0)]);

    let mut session = start(api);
    let queue = ThreadedRenderQueue::spawn("renderstream-test-render").unwrap();
    let mut textures: ScratchTextureManager<HostTexture, HostMemoryAllocator> =
        ScratchTextureManager::new("send", HostMemoryAllocator::default());

    for _ in 0..2 {
        assert!(session.tick().unwrap().has_new_frame_data());
        for index in 0..handles.len() {
            let descriptor = session.senders()[index].texture_descriptor();
            let (_, frame_type, data) = textures.get_with_frame_data(&descriptor).unwrap();
            let result = session.send_frame(index, frame_type, data, &queue).unwrap();
            assert_eq!(result, SendResult::Submitted);
        }
        session.end_frame();
    }
    queue.flush().unwrap();
    assert_eq!(queue.executed(), 4);
    assert_eq!(queue.failed(), 0);
    // Both streams share one descriptor.
    assert_eq!(textures.len(), 1);

    for handle in handles {
        let sent = sent_frames_for(handle);
        let times: Vec<f64> = sent.iter().map(|f| f.t_tracked).collect();
        assert_eq!(times, vec![10.0, 11.0]);
        assert!(sent.iter().all(|f| f.camera_handle == handle.0));
        assert!(sent.iter().all(|f| f.frame_type == abi::RS_FRAMETYPE_HOST_MEMORY));
    }
}

#[test]
fn test_follower_mirrors_the_emitter() {
    let emitter_rig = rig();
    let mut emitter_api = api_for(rig_schema(&emitter_rig.registry), vec![stream(0x5601)]);
    emitter_api.script([frame(20.0, 0), frame(21.0, 0), AwaitOutcome::Quit]);
    let mut emitter = start(emitter_api);

    let follower_rig = rig();
    let mut follower_api = api_for(rig_schema(&follower_rig.registry), vec![stream(0x5602)]);
    follower_api.parameters = vec![0.1; 20];
    follower_api.synthesize_frames = true;
    let mut follower = start(follower_api);
    follower.bind_scene(0, &follower_rig.registry).unwrap();

    let bus = FrameDataBus::new();
    follower.attach_follower(bus.subscribe()).unwrap();
    emitter.attach_emitter(Box::new(bus));

    let mut followed = Vec::new();
    loop {
        let outcome = emitter.tick().unwrap();
        emitter.end_frame();
        if outcome == FrameOutcome::Quit {
            break;
        }
        if let FrameOutcome::NewFrame(_) = follower.tick().unwrap() {
            followed.push(follower.latest_frame().t_tracked);
        }
        follower.end_frame();
    }

    assert_eq!(followed, vec![20.0, 21.0]);
    assert_eq!(follower.state(), ProtocolState::Idle);
    assert_eq!(value(&follower_rig.tint), ParameterValue::Color([0.1; 4]));
    assert_eq!(
        follower
            .api()
            .count_calls(|c| matches!(c, ApiCall::BeginFollowerFrame(_))),
        2
    );
}

#[test]
fn test_remote_images_reach_image_fields() {
    let rig = rig();
    let mut api = api_for(rig_schema(&rig.registry), vec![stream(0x5701)]);
    api.parameters = vec![0.0; 20];
    api.images = vec![ImageFrameData {
        width: 2,
        height: 2,
        format: PixelFormat::Rgba8,
        image_id: 9,
    }];
    api.script([AwaitOutcome::Timeout, frame(1.0, 0)]);

    let mut session = start(api);
    session.bind_scene(0, &rig.registry).unwrap();
    let mut input = ImageInput::new(HostMemoryAllocator::default(), 2, 15);
    let mut targets = HostImageTargets::default();

    assert_eq!(session.tick().unwrap(), FrameOutcome::NoFrame);
    let delivered = session
        .update_images(&mut input, &ImmediateRenderQueue, &mut targets)
        .unwrap();
    assert_eq!(delivered, 0);
    assert_eq!(value(&rig.screen), ParameterValue::Image(None));

    assert!(session.tick().unwrap().has_new_frame_data());
    let delivered = session
        .update_images(&mut input, &ImmediateRenderQueue, &mut targets)
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(targets.get("Rig screen").unwrap().descriptor.width, 2);
    let ParameterValue::Image(Some(image)) = value(&rig.screen) else {
        panic!("expected image");
    };
    assert_eq!(image.image_id, 9);

    session.end_frame();
    input.end_frame();
}
