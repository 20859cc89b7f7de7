// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Commands that touch GPU resources, and where they run.

mod commands;
mod image_input;
mod queue;

pub use commands::{InputImageCommand, RenderCommand, RenderEvent, SendFrameCommand, has_texture};
pub use image_input::{HostImageTargets, ImageInput, TextureBlitter};
pub use queue::{ImmediateRenderQueue, RenderCommandQueue, ThreadedRenderQueue};
