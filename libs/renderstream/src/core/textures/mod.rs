// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Descriptor-keyed texture managers for remote images and stream output.

mod allocator;
mod descriptor;
mod scratch;
mod temporary;

pub use allocator::{HostMemoryAllocator, HostTexture, TextureAllocator};
pub use descriptor::Texture2DDescriptor;
pub use scratch::ScratchTextureManager;
pub use temporary::{DEFAULT_RELEASE_AFTER_FRAMES, TemporaryTextureManager};
