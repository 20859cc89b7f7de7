// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod binding;
pub mod cluster;
pub mod config;
pub mod error;
pub mod frames;
pub mod native;
pub mod pool;
pub mod protocol;
pub mod render;
pub mod schema;
pub mod textures;

pub use binding::{
    ExposedParameters, FieldKind, ParameterRegistry, ParameterSlot, ParameterValue, SceneBindings,
    SharedSlot, ValueSlot, bind_scene, shared_slot,
};
pub use cluster::{ClusterRole, NodeAssignment, negotiate, negotiate_or_standalone};
pub use config::RenderStreamConfig;
pub use error::*;
pub use frames::*;
pub use native::{AwaitOutcome, GraphicsBackend, NativeBinding, NativeStatus, RenderStreamApi, ScriptedApi};
pub use pool::{EventDataPool, EventDataPoolStats};
pub use protocol::{
    FrameDataBus, FrameDataRelay, FrameOutcome, FrameSender, ProtocolRole, ProtocolState,
    RenderStream, SceneControl, SendResult,
};
pub use render::{ImageInput, RenderCommandQueue, ThreadedRenderQueue};
pub use schema::{ManagedRemoteParameter, ManagedRemoteParameters, ManagedSchema, RemoteParameterType};
pub use textures::{
    HostMemoryAllocator, HostTexture, ScratchTextureManager, TemporaryTextureManager,
    Texture2DDescriptor, TextureAllocator,
};
