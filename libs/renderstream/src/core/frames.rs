// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-frame records exchanged with the compositor, in owned Rust form.

use std::ffi::CStr;
use std::fmt;

use bitflags::bitflags;
use renderstream_abi as abi;
use serde::{Deserialize, Serialize};

/// Opaque stream identity used in every per-stream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct StreamHandle(pub u64);

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Pixel formats a stream or remote image may use.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Invalid = 0,
    Bgra8 = 1,
    Bgrx8 = 2,
    Rgba32F = 3,
    Rgba16 = 4,
    Rgba8 = 5,
    Rgbx8 = 6,
}

impl PixelFormat {
    pub fn from_raw(raw: abi::RsPixelFormat) -> Self {
        match raw {
            abi::RS_FMT_BGRA8 => Self::Bgra8,
            abi::RS_FMT_BGRX8 => Self::Bgrx8,
            abi::RS_FMT_RGBA32F => Self::Rgba32F,
            abi::RS_FMT_RGBA16 => Self::Rgba16,
            abi::RS_FMT_RGBA8 => Self::Rgba8,
            abi::RS_FMT_RGBX8 => Self::Rgbx8,
            _ => Self::Invalid,
        }
    }

    pub const fn as_raw(self) -> abi::RsPixelFormat {
        self as abi::RsPixelFormat
    }

    /// Bytes per pixel for host-memory frames.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Invalid => 0,
            Self::Bgra8 | Self::Bgrx8 | Self::Rgba8 | Self::Rgbx8 => 4,
            Self::Rgba16 => 8,
            Self::Rgba32F => 16,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalid => "RS_FMT_INVALID",
            Self::Bgra8 => "RS_FMT_BGRA8",
            Self::Bgrx8 => "RS_FMT_BGRX8",
            Self::Rgba32F => "RS_FMT_RGBA32F",
            Self::Rgba16 => "RS_FMT_RGBA16",
            Self::Rgba8 => "RS_FMT_RGBA8",
            Self::Rgbx8 => "RS_FMT_RGBX8",
        };
        f.write_str(name)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FrameDataFlags: u32 {
        const RESET = abi::FRAMEDATA_RESET;
    }
}

/// Per-frame timing record pushed by the compositor to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameData {
    pub t_tracked: f64,
    pub local_time: f64,
    pub local_time_delta: f64,
    pub frame_rate_numerator: u32,
    pub frame_rate_denominator: u32,
    pub flags: FrameDataFlags,
    pub scene: u32,
}

impl FrameData {
    pub fn is_reset(&self) -> bool {
        self.flags.contains(FrameDataFlags::RESET)
    }

    /// Frames per second, or `None` if the denominator is zero.
    pub fn frame_rate(&self) -> Option<f64> {
        (self.frame_rate_denominator != 0)
            .then(|| f64::from(self.frame_rate_numerator) / f64::from(self.frame_rate_denominator))
    }
}

impl From<abi::FrameData> for FrameData {
    fn from(raw: abi::FrameData) -> Self {
        Self {
            t_tracked: raw.t_tracked,
            local_time: raw.local_time,
            local_time_delta: raw.local_time_delta,
            frame_rate_numerator: raw.frame_rate_numerator,
            frame_rate_denominator: raw.frame_rate_denominator,
            flags: FrameDataFlags::from_bits_truncate(raw.flags),
            scene: raw.scene,
        }
    }
}

impl From<FrameData> for abi::FrameData {
    fn from(frame: FrameData) -> Self {
        Self {
            t_tracked: frame.t_tracked,
            local_time: frame.local_time,
            local_time_delta: frame.local_time_delta,
            frame_rate_numerator: frame.frame_rate_numerator,
            frame_rate_denominator: frame.frame_rate_denominator,
            flags: frame.flags.bits(),
            scene: frame.scene,
        }
    }
}

/// Per-stream camera pose and lens state for one frame.
///
/// Rotation is in degrees with the compositor's sign convention.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraData {
    pub id: StreamHandle,
    pub camera_handle: u64,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub focal_length: f32,
    pub sensor_size: [f32; 2],
    pub lens_shift: [f32; 2],
    pub near_z: f32,
    pub far_z: f32,
    pub ortho_width: f32,
    pub tracking: abi::D3TrackingData,
}

impl CameraData {
    /// A zero handle means no camera is bound and only the aspect ratio is
    /// meaningful.
    pub fn has_camera(&self) -> bool {
        self.camera_handle != 0
    }

    pub fn is_orthographic(&self) -> bool {
        self.ortho_width > 0.0
    }
}

impl From<abi::CameraData> for CameraData {
    fn from(raw: abi::CameraData) -> Self {
        Self {
            id: StreamHandle(raw.id),
            camera_handle: raw.camera_handle,
            position: [raw.x, raw.y, raw.z],
            rotation: [raw.rx, raw.ry, raw.rz],
            focal_length: raw.focal_length,
            sensor_size: [raw.sensor_x, raw.sensor_y],
            lens_shift: [raw.cx, raw.cy],
            near_z: raw.near_z,
            far_z: raw.far_z,
            ortho_width: raw.ortho_width,
            tracking: raw.d3_tracking,
        }
    }
}

impl From<CameraData> for abi::CameraData {
    fn from(camera: CameraData) -> Self {
        Self {
            id: camera.id.0,
            camera_handle: camera.camera_handle,
            x: camera.position[0],
            y: camera.position[1],
            z: camera.position[2],
            rx: camera.rotation[0],
            ry: camera.rotation[1],
            rz: camera.rotation[2],
            focal_length: camera.focal_length,
            sensor_x: camera.sensor_size[0],
            sensor_y: camera.sensor_size[1],
            cx: camera.lens_shift[0],
            cy: camera.lens_shift[1],
            near_z: camera.near_z,
            far_z: camera.far_z,
            ortho_width: camera.ortho_width,
            d3_tracking: camera.tracking,
        }
    }
}

/// Builds the record echoed back with a rendered frame.
pub fn camera_response(t_tracked: f64, camera: &CameraData) -> abi::CameraResponseData {
    abi::CameraResponseData {
        t_tracked,
        camera: (*camera).into(),
    }
}

/// Normalised clipping rectangle of a stream's frustum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectionClipping {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl ProjectionClipping {
    /// Normalised sub-region `(x, y, width, height)` the renderer should fill.
    pub fn sub_region(&self) -> SubRegion {
        SubRegion {
            x: self.left,
            y: self.top,
            width: self.right - self.left,
            height: self.bottom - self.top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SubRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One output video channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamDescription {
    pub handle: StreamHandle,
    pub channel: String,
    pub mapping_id: u64,
    pub viewpoint: i32,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub clipping: ProjectionClipping,
}

impl StreamDescription {
    /// Copies a native description.
    ///
    /// # Safety
    /// String pointers must be null or point to valid null-terminated strings.
    pub unsafe fn from_raw(raw: &abi::StreamDescription) -> Self {
        let clipping = raw.clipping;
        Self {
            handle: StreamHandle(raw.handle),
            channel: unsafe { string_from_ptr(raw.channel) },
            mapping_id: raw.mapping_id,
            viewpoint: raw.i_viewpoint,
            name: unsafe { string_from_ptr(raw.name) },
            width: raw.width,
            height: raw.height,
            format: PixelFormat::from_raw(raw.format),
            clipping: ProjectionClipping {
                left: clipping.left,
                right: clipping.right,
                top: clipping.top,
                bottom: clipping.bottom,
            },
        }
    }
}

/// Dimensions and identity of one remote image for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageFrameData {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub image_id: i64,
}

impl From<abi::ImageFrameData> for ImageFrameData {
    fn from(raw: abi::ImageFrameData) -> Self {
        Self {
            width: raw.width,
            height: raw.height,
            format: PixelFormat::from_raw(raw.format),
            image_id: raw.image_id,
        }
    }
}

/// Copies a C string, treating null as empty.
///
/// # Safety
/// `ptr` must be null or point to a valid null-terminated string.
pub(crate) unsafe fn string_from_ptr(ptr: *const std::ffi::c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_frame_data_flags_from_raw() {
        let raw = abi::FrameData {
            t_tracked: 12.5,
            flags: abi::FRAMEDATA_RESET | 0x80,
            scene: 2,
            ..Default::default()
        };
        let frame = FrameData::from(raw);
        assert!(frame.is_reset());
        assert_eq!(frame.scene, 2);
        assert_eq!(abi::FrameData::from(frame).flags, abi::FRAMEDATA_RESET);
    }

    #[test]
    fn test_frame_rate() {
        let frame = FrameData {
            frame_rate_numerator: 60000,
            frame_rate_denominator: 1001,
            ..Default::default()
        };
        let fps = frame.frame_rate().unwrap();
        assert!((fps - 59.94).abs() < 0.01);
        assert_eq!(FrameData::default().frame_rate(), None);
    }

    #[test]
    fn test_camera_flags() {
        let mut camera = CameraData::default();
        assert!(!camera.has_camera());
        assert!(!camera.is_orthographic());
        camera.camera_handle = 7;
        camera.ortho_width = 2.0;
        assert!(camera.has_camera());
        assert!(camera.is_orthographic());
    }

    #[test]
    fn test_stream_description_from_raw() {
        let channel = CString::new("Main").unwrap();
        let name = CString::new("Screen 1").unwrap();
        let raw = abi::StreamDescription {
            handle: 42,
            channel: channel.as_ptr(),
            mapping_id: 3,
            i_viewpoint: 1,
            name: name.as_ptr(),
            width: 1920,
            height: 1080,
            format: abi::RS_FMT_RGBA8,
            clipping: abi::ProjectionClipping {
                left: 0.0,
                right: 0.5,
                top: 0.25,
                bottom: 1.0,
            },
        };
        let stream = unsafe { StreamDescription::from_raw(&raw) };
        assert_eq!(stream.handle, StreamHandle(42));
        assert_eq!(stream.channel, "Main");
        assert_eq!(stream.name, "Screen 1");
        assert_eq!(stream.format, PixelFormat::Rgba8);
        let region = stream.clipping.sub_region();
        assert_eq!(region.width, 0.5);
        assert_eq!(region.y, 0.25);
        assert_eq!(region.height, 0.75);
    }
}
