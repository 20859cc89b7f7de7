// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Engine-side bridge to the d3 RenderStream compositor.
//!
//! Loads the compositor's native library, publishes a parameter schema,
//! exchanges frames with the compositor as controller or follower, and
//! negotiates node IDs for clustered render nodes.

#![allow(clippy::too_many_arguments)] // Frame sends carry the full native payload
#![allow(clippy::missing_safety_doc)] // Safety documented in implementation comments

// Re-export for hosts that feed followers or read the ABI directly
pub use crossbeam_channel;
pub use renderstream_abi as abi;

pub mod core;

pub use core::{
    AwaitOutcome, CameraData, ClusterRole, EventDataPool, ExposedParameters, FieldKind, FrameData,
    FrameDataBus, FrameDataRelay, FrameOutcome, GraphicsBackend, HostMemoryAllocator, HostTexture,
    ImageFrameData, ImageInput, ManagedRemoteParameter, ManagedRemoteParameters, ManagedSchema,
    NativeBinding, NativeStatus, NodeAssignment, ParameterRegistry, ParameterValue, PixelFormat,
    ProtocolState, RemoteParameterType, RenderCommandQueue, RenderStream, RenderStreamApi,
    RenderStreamConfig, RenderStreamError, Result, SceneControl, ScriptedApi, SendResult,
    StreamDescription, StreamHandle, ThreadedRenderQueue, ValueSlot, shared_slot,
};
