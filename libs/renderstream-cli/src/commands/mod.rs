// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod negotiate;
pub mod run;
pub mod schema;
pub mod streams;

use renderstream::core::ProjectionClipping;
use renderstream::{
    CameraData, NativeBinding, PixelFormat, RenderStreamConfig, ScriptedApi, StreamDescription,
    StreamHandle,
};
use tracing_subscriber::EnvFilter;

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Loads the compositor library named by the configuration.
pub fn native_api(config: &RenderStreamConfig) -> NativeBinding {
    let binding = NativeBinding::load(&config.library);
    if let Some(reason) = binding.unavailable_reason() {
        tracing::warn!(%reason, "Native library unavailable, calls will fail");
    }
    binding
}

/// A scripted compositor with one 1080p stream and a steady 60 fps frame
/// sequence.
pub fn simulated_api() -> ScriptedApi {
    let handle = StreamHandle(1);
    let mut api = ScriptedApi::new().with_streams(vec![StreamDescription {
        handle,
        channel: "Main".to_string(),
        name: "Simulated".to_string(),
        width: 1920,
        height: 1080,
        format: PixelFormat::Bgra8,
        clipping: ProjectionClipping {
            left: 0.0,
            right: 1.0,
            top: 0.0,
            bottom: 1.0,
        },
        ..Default::default()
    }]);
    api.synthesize_frames = true;
    api.cameras.insert(
        handle,
        CameraData {
            camera_handle: 1,
            focal_length: 35.0,
            sensor_size: [36.0, 24.0],
            near_z: 0.1,
            far_z: 1000.0,
            ..Default::default()
        },
    );
    api
}
