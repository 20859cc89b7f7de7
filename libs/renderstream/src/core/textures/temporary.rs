// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Textures reused across frames and released once they go unused.
//!
//! Age only advances in frames where the manager was accessed at all, so a
//! paused input keeps its textures.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use renderstream_abi as abi;

use crate::core::error::{RenderStreamError, Result};

use super::allocator::TextureAllocator;
use super::descriptor::Texture2DDescriptor;

/// Frames without access before a texture is released.
pub const DEFAULT_RELEASE_AFTER_FRAMES: u32 = 15;

struct Item<T> {
    texture: T,
    frames_since_access: u32,
}

pub struct TemporaryTextureManager<T, A: TextureAllocator<T>> {
    allocator: A,
    items: HashMap<Texture2DDescriptor, Item<T>>,
    release_after_frames: u32,
    accessed_this_frame: bool,
}

impl<T, A: TextureAllocator<T>> TemporaryTextureManager<T, A> {
    pub fn new(allocator: A) -> Self {
        Self::with_release_after(allocator, DEFAULT_RELEASE_AFTER_FRAMES)
    }

    pub fn with_release_after(allocator: A, frames: u32) -> Self {
        Self {
            allocator,
            items: HashMap::new(),
            release_after_frames: frames.max(1),
            accessed_this_frame: false,
        }
    }

    /// Texture for `descriptor`, created on first use. Marks it accessed.
    pub fn get(&mut self, descriptor: &Texture2DDescriptor) -> Result<&mut T> {
        self.accessed_this_frame = true;
        let item = match self.items.entry(*descriptor) {
            Entry::Occupied(entry) => {
                let item = entry.into_mut();
                item.frames_since_access = 0;
                item
            }
            Entry::Vacant(entry) => {
                tracing::debug!(%descriptor, "Created temporary texture");
                entry.insert(Item {
                    texture: self.allocator.create(descriptor)?,
                    frames_since_access: 0,
                })
            }
        };
        Ok(&mut item.texture)
    }

    /// Like [`TemporaryTextureManager::get`], plus the texture's native payload.
    pub fn get_with_frame_data(
        &mut self,
        descriptor: &Texture2DDescriptor,
    ) -> Result<(&mut T, abi::SenderFrameType, abi::SenderFrameTypeData)> {
        self.get(descriptor)?;
        let Self {
            allocator, items, ..
        } = self;
        let item = items.get_mut(descriptor).ok_or_else(|| {
            RenderStreamError::Texture(format!("temporary texture {descriptor} missing after creation"))
        })?;
        let (frame_type, data) = allocator.frame_data(&mut item.texture);
        Ok((&mut item.texture, frame_type, data))
    }

    /// Call once at the end of every frame.
    pub fn on_frame_end(&mut self) {
        let threshold = self.release_after_frames;
        let accessed = self.accessed_this_frame;

        let expired: Vec<Texture2DDescriptor> = self
            .items
            .iter_mut()
            .filter_map(|(descriptor, item)| {
                if !descriptor.is_placeholder() && item.frames_since_access >= threshold {
                    Some(*descriptor)
                } else {
                    if accessed {
                        item.frames_since_access += 1;
                    }
                    None
                }
            })
            .collect();

        for descriptor in expired {
            if let Some(item) = self.items.remove(&descriptor) {
                tracing::debug!(%descriptor, "Released temporary texture");
                self.allocator.destroy(item.texture);
            }
        }
        self.accessed_this_frame = false;
    }

    pub fn contains(&self, descriptor: &Texture2DDescriptor) -> bool {
        self.items.contains_key(descriptor)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        for (_, item) in self.items.drain() {
            self.allocator.destroy(item.texture);
        }
    }
}

impl<T, A: TextureAllocator<T>> Drop for TemporaryTextureManager<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frames::PixelFormat;
    use crate::core::textures::HostMemoryAllocator;

    fn descriptor(width: u32, height: u32) -> Texture2DDescriptor {
        Texture2DDescriptor::new(width, height, PixelFormat::Rgba8, true)
    }

    #[test]
    fn test_release_after_fifteen_accessed_frames() {
        let mut manager = TemporaryTextureManager::new(HostMemoryAllocator::default());
        let stale = descriptor(8, 8);
        let live = descriptor(16, 16);
        manager.get(&stale).unwrap();
        manager.on_frame_end();

        for _ in 0..DEFAULT_RELEASE_AFTER_FRAMES {
            assert!(manager.contains(&stale));
            manager.get(&live).unwrap();
            manager.on_frame_end();
        }
        assert!(!manager.contains(&stale));
        assert!(manager.contains(&live));
    }

    #[test]
    fn test_idle_frames_do_not_age() {
        let mut manager = TemporaryTextureManager::with_release_after(HostMemoryAllocator::default(), 2);
        let desc = descriptor(8, 8);
        manager.get(&desc).unwrap();
        manager.on_frame_end();
        for _ in 0..100 {
            manager.on_frame_end();
        }
        assert!(manager.contains(&desc));
    }

    #[test]
    fn test_placeholder_is_never_released() {
        let mut manager = TemporaryTextureManager::with_release_after(HostMemoryAllocator::default(), 1);
        let placeholder = descriptor(1, 1);
        let other = descriptor(2, 2);
        manager.get(&placeholder).unwrap();
        for _ in 0..10 {
            manager.get(&other).unwrap();
            manager.on_frame_end();
        }
        assert!(manager.contains(&placeholder));
    }

    #[test]
    fn test_access_resets_age() {
        let mut manager = TemporaryTextureManager::with_release_after(HostMemoryAllocator::default(), 3);
        let desc = descriptor(4, 4);
        for _ in 0..10 {
            manager.get(&desc).unwrap();
            manager.on_frame_end();
        }
        assert_eq!(manager.len(), 1);
    }
}
