// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use renderstream_abi as abi;

use crate::core::error::{RenderStreamError, Result};

use super::descriptor::Texture2DDescriptor;

/// Creates and destroys host textures of type `T`.
///
/// Engines implement this over their graphics API; the managers only deal in
/// descriptors and handles.
pub trait TextureAllocator<T> {
    fn create(&mut self, descriptor: &Texture2DDescriptor) -> Result<T>;

    fn destroy(&mut self, texture: T);

    /// Native frame payload describing `texture`.
    fn frame_data(&self, texture: &mut T) -> (abi::SenderFrameType, abi::SenderFrameTypeData);
}

/// CPU-side texture: tightly packed rows of `descriptor.format`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostTexture {
    pub descriptor: Texture2DDescriptor,
    pub pixels: Vec<u8>,
}

impl HostTexture {
    pub fn stride(&self) -> u32 {
        self.descriptor.row_bytes() as u32
    }

    /// Copies rows in reverse order into `target`. Both textures must share a
    /// descriptor.
    pub fn copy_flipped_into(&self, target: &mut HostTexture) -> Result<()> {
        if self.descriptor != target.descriptor {
            return Err(RenderStreamError::Texture(format!(
                "cannot blit {} into {}",
                self.descriptor, target.descriptor
            )));
        }
        let row = self.descriptor.row_bytes();
        if row == 0 {
            return Ok(());
        }
        for (src, dst) in self
            .pixels
            .chunks_exact(row)
            .rev()
            .zip(target.pixels.chunks_exact_mut(row))
        {
            dst.copy_from_slice(src);
        }
        Ok(())
    }
}

/// Allocates [`HostTexture`]s for `RS_FRAMETYPE_HOST_MEMORY` exchange.
#[derive(Debug, Default)]
pub struct HostMemoryAllocator {
    allocated_bytes: usize,
}

impl HostMemoryAllocator {
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }
}

impl TextureAllocator<HostTexture> for HostMemoryAllocator {
    fn create(&mut self, descriptor: &Texture2DDescriptor) -> Result<HostTexture> {
        if descriptor.format.bytes_per_pixel() == 0 {
            return Err(RenderStreamError::Texture(format!(
                "cannot allocate {descriptor}: invalid pixel format"
            )));
        }
        let len = descriptor.row_bytes() * descriptor.height as usize;
        self.allocated_bytes += len;
        Ok(HostTexture {
            descriptor: *descriptor,
            pixels: vec![0; len],
        })
    }

    fn destroy(&mut self, texture: HostTexture) {
        self.allocated_bytes = self.allocated_bytes.saturating_sub(texture.pixels.len());
    }

    fn frame_data(
        &self,
        texture: &mut HostTexture,
    ) -> (abi::SenderFrameType, abi::SenderFrameTypeData) {
        let stride = texture.stride();
        (
            abi::RS_FRAMETYPE_HOST_MEMORY,
            abi::SenderFrameTypeData {
                cpu: abi::HostMemoryData {
                    data: texture.pixels.as_mut_ptr(),
                    stride,
                },
            },
        )
    }
}
