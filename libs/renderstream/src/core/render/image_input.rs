// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-frame delivery of remote images to image parameters.

use std::collections::HashMap;

use crate::core::binding::{ParameterValue, RemoteImage, SceneBindings};
use crate::core::error::{RenderStreamError, Result};
use crate::core::native::RenderStreamApi;
use crate::core::pool::{EventDataPool, EventDataPoolStats};
use crate::core::textures::{
    HostTexture, TemporaryTextureManager, Texture2DDescriptor, TextureAllocator,
};

use super::commands::{InputImageCommand, RenderCommand};
use super::queue::RenderCommandQueue;

/// Copies received images into the engine's image fields.
///
/// Remote images arrive upside down relative to the engine, so the copy
/// flips rows.
pub trait TextureBlitter<T> {
    fn blit_flipped(&mut self, key: &str, source: &T) -> Result<()>;
}

/// Host-memory image targets keyed by parameter key.
#[derive(Debug, Default)]
pub struct HostImageTargets {
    targets: HashMap<String, HostTexture>,
}

impl HostImageTargets {
    pub fn get(&self, key: &str) -> Option<&HostTexture> {
        self.targets.get(key)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl TextureBlitter<HostTexture> for HostImageTargets {
    fn blit_flipped(&mut self, key: &str, source: &HostTexture) -> Result<()> {
        let target = self
            .targets
            .entry(key.to_string())
            .or_insert_with(|| HostTexture {
                descriptor: source.descriptor,
                pixels: vec![0; source.pixels.len()],
            });
        if target.descriptor != source.descriptor {
            // Resize or reformat to follow the remote image.
            target.descriptor = source.descriptor;
            target.pixels = vec![0; source.pixels.len()];
        }
        source.copy_flipped_into(target)
    }
}

/// Fetches the current frame's remote images on the render thread.
///
/// Owns the temporary textures images are copied into and the pool that
/// keeps the input commands alive while the render thread reads them.
pub struct ImageInput<T, A: TextureAllocator<T>> {
    textures: TemporaryTextureManager<T, A>,
    pool: EventDataPool<InputImageCommand>,
}

impl<T, A: TextureAllocator<T>> ImageInput<T, A> {
    pub fn new(allocator: A, frames_to_keep_alive: u32, release_after_frames: u32) -> Self {
        Self {
            textures: TemporaryTextureManager::with_release_after(allocator, release_after_frames),
            pool: EventDataPool::with_frames_to_keep_alive(frames_to_keep_alive),
        }
    }

    /// Requests every bound image of the scene and hands the results to
    /// `blitter`. Returns the number of images delivered.
    ///
    /// An exhausted pool skips the image for this frame.
    pub fn update<Api, Q, B>(
        &mut self,
        api: &mut Api,
        bindings: &SceneBindings,
        queue: &Q,
        blitter: &mut B,
    ) -> Result<usize>
    where
        Api: RenderStreamApi + ?Sized,
        Q: RenderCommandQueue + ?Sized,
        B: TextureBlitter<T>,
    {
        if bindings.images.is_empty() {
            return Ok(0);
        }
        let get_frame_image = api
            .get_frame_image_fn()
            .ok_or(RenderStreamError::NotInitialised)?;
        let images = api.get_frame_image_data(bindings.schema_hash, bindings.image_count)?;

        // Images of equal size and format share a temporary texture, so each
        // one is copied out before the next fetch overwrites it.
        let mut delivered = 0;
        for binding in &bindings.images {
            let Some(image) = images.get(binding.image_index) else {
                continue;
            };
            let descriptor = Texture2DDescriptor::for_image(image);
            let (_, frame_type, frame_data) = self.textures.get_with_frame_data(&descriptor)?;

            let command = InputImageCommand {
                get_frame_image,
                image_id: image.image_id,
                frame_type,
                frame_data,
            };
            let Some(ptr) = self.pool.try_acquire(command) else {
                tracing::warn!(key = %binding.key, "Event data pool exhausted, skipping image input");
                continue;
            };
            queue.submit(unsafe { RenderCommand::input_image(ptr) })?;
            queue.flush()?;

            let texture = self.textures.get(&descriptor)?;
            blitter.blit_flipped(&binding.key, texture)?;
            let value = ParameterValue::Image(Some(RemoteImage {
                image_id: image.image_id,
                descriptor,
            }));
            if let Err(e) = binding.slot.lock().set(value) {
                tracing::warn!(key = %binding.key, error = %e, "Failed to set image parameter");
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Ages pooled commands and releases unused textures. Call once per frame.
    pub fn end_frame(&mut self) {
        self.pool.on_frame_boundary();
        self.textures.on_frame_end();
    }

    pub fn pool_stats(&self) -> EventDataPoolStats {
        self.pool.stats()
    }

    pub fn textures(&self) -> &TemporaryTextureManager<T, A> {
        &self.textures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::binding::{ExposedParameters, ParameterRegistry, ValueSlot, bind_scene, shared_slot};
    use crate::core::frames::{ImageFrameData, PixelFormat};
    use crate::core::native::ScriptedApi;
    use crate::core::render::ImmediateRenderQueue;
    use crate::core::schema::{ManagedRemoteParameter, ManagedRemoteParameters, RemoteParameterType};
    use crate::core::textures::HostMemoryAllocator;

    fn scene_with_image() -> (ParameterRegistry, SceneBindings) {
        let mut object = ExposedParameters::new("Screen", "Screen");
        object
            .register("content", shared_slot(ValueSlot::new(ParameterValue::Image(None))))
            .unwrap();
        let mut registry = ParameterRegistry::new();
        registry.register(object).unwrap();

        let mut scene = ManagedRemoteParameters::new("Main");
        scene.hash = 77;
        scene.parameters = vec![ManagedRemoteParameter::of_type(
            "Screen content",
            "content",
            RemoteParameterType::Image,
        )];
        let bindings = bind_scene(&scene, &registry);
        (registry, bindings)
    }

    #[test]
    fn test_image_is_fetched_flipped_and_recorded() {
        let (registry, bindings) = scene_with_image();
        let mut api = ScriptedApi::initialised();
        api.images = vec![ImageFrameData {
            width: 1,
            height: 2,
            format: PixelFormat::Rgba8,
            image_id: 5,
        }];

        let mut input = ImageInput::new(HostMemoryAllocator::default(), 2, 15);
        let mut targets = HostImageTargets::default();
        let delivered = input
            .update(&mut api, &bindings, &ImmediateRenderQueue, &mut targets)
            .unwrap();
        assert_eq!(delivered, 1);

        // The scripted library writes the image id into the first row.
        let target = targets.get("Screen content").unwrap();
        assert_eq!(target.pixels, vec![0, 0, 0, 0, 5, 5, 5, 5]);

        let value = registry.objects()[0].field("content").unwrap().lock().get();
        let ParameterValue::Image(Some(image)) = value else {
            panic!("expected image value");
        };
        assert_eq!(image.image_id, 5);
        assert_eq!(image.descriptor.height, 2);
        assert_eq!(input.pool_stats().in_use, 1);

        input.end_frame();
        input.end_frame();
        assert_eq!(input.pool_stats().in_use, 0);
    }

    fn image(width: u32, height: u32, image_id: i64) -> ImageFrameData {
        ImageFrameData {
            width,
            height,
            format: PixelFormat::Rgba8,
            image_id,
        }
    }

    fn image_id(registry: &ParameterRegistry, field: &str) -> i64 {
        let value = registry.objects()[0].field(field).unwrap().lock().get();
        let ParameterValue::Image(Some(image)) = value else {
            panic!("expected image value for {field}");
        };
        image.image_id
    }

    #[test]
    fn test_each_image_reaches_its_own_field() {
        let mut object = ExposedParameters::new("Screen", "Screen");
        for field in ["a", "b", "c"] {
            object
                .register(field, shared_slot(ValueSlot::new(ParameterValue::Image(None))))
                .unwrap();
        }
        let mut registry = ParameterRegistry::new();
        registry.register(object).unwrap();

        let mut scene = ManagedRemoteParameters::new("Main");
        scene.hash = 78;
        scene.parameters = ["a", "b", "c"]
            .iter()
            .map(|&field| {
                ManagedRemoteParameter::of_type(
                    format!("Screen {field}"),
                    field,
                    RemoteParameterType::Image,
                )
            })
            .collect();
        let bindings = bind_scene(&scene, &registry);

        let mut api = ScriptedApi::initialised();
        // `a` and `b` share size and format, `c` does not.
        api.images = vec![image(1, 2, 1), image(1, 2, 2), image(2, 1, 3)];

        let mut input = ImageInput::new(HostMemoryAllocator::default(), 2, 15);
        let mut targets = HostImageTargets::default();
        let delivered = input
            .update(&mut api, &bindings, &ImmediateRenderQueue, &mut targets)
            .unwrap();
        assert_eq!(delivered, 3);
        assert_eq!(input.textures().len(), 2);

        assert_eq!(targets.get("Screen a").unwrap().pixels, vec![0, 0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(targets.get("Screen b").unwrap().pixels, vec![0, 0, 0, 0, 2, 2, 2, 2]);
        assert_eq!(targets.get("Screen c").unwrap().pixels, vec![3; 8]);

        assert_eq!(image_id(&registry, "a"), 1);
        assert_eq!(image_id(&registry, "b"), 2);
        assert_eq!(image_id(&registry, "c"), 3);
    }

    #[test]
    fn test_missing_image_is_skipped() {
        let (_registry, bindings) = scene_with_image();
        let mut api = ScriptedApi::initialised();
        let mut input = ImageInput::new(HostMemoryAllocator::default(), 2, 15);
        let mut targets = HostImageTargets::default();
        let delivered = input
            .update(&mut api, &bindings, &ImmediateRenderQueue, &mut targets)
            .unwrap();
        assert_eq!(delivered, 0);
        assert!(targets.is_empty());
    }
}
