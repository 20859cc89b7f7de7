// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use renderstream_abi as abi;

use crate::core::error::Result;

use super::allocator::TextureAllocator;
use super::descriptor::Texture2DDescriptor;

/// One texture per descriptor, kept until [`ScratchTextureManager::clear`].
pub struct ScratchTextureManager<T, A: TextureAllocator<T>> {
    name: &'static str,
    allocator: A,
    items: HashMap<Texture2DDescriptor, T>,
}

impl<T, A: TextureAllocator<T>> ScratchTextureManager<T, A> {
    pub fn new(name: &'static str, allocator: A) -> Self {
        Self {
            name,
            allocator,
            items: HashMap::new(),
        }
    }

    /// Existing texture for `descriptor`, or a newly created one.
    pub fn get(&mut self, descriptor: &Texture2DDescriptor) -> Result<&mut T> {
        get_or_create(&mut self.items, &mut self.allocator, self.name, descriptor)
    }

    /// Texture for `descriptor` with its native frame payload.
    pub fn get_with_frame_data(
        &mut self,
        descriptor: &Texture2DDescriptor,
    ) -> Result<(&mut T, abi::SenderFrameType, abi::SenderFrameTypeData)> {
        let texture = get_or_create(&mut self.items, &mut self.allocator, self.name, descriptor)?;
        let (frame_type, data) = self.allocator.frame_data(texture);
        Ok((texture, frame_type, data))
    }

    /// Destroys every texture.
    pub fn clear(&mut self) {
        tracing::trace!(manager = self.name, count = self.items.len(), "Cleared textures");
        for (_, texture) in self.items.drain() {
            self.allocator.destroy(texture);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }
}

fn get_or_create<'a, T, A: TextureAllocator<T>>(
    items: &'a mut HashMap<Texture2DDescriptor, T>,
    allocator: &mut A,
    name: &'static str,
    descriptor: &Texture2DDescriptor,
) -> Result<&'a mut T> {
    match items.entry(*descriptor) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            tracing::trace!(manager = name, %descriptor, "Created texture");
            Ok(entry.insert(allocator.create(descriptor)?))
        }
    }
}

impl<T, A: TextureAllocator<T>> Drop for ScratchTextureManager<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}
