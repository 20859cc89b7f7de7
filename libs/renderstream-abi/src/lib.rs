// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! ABI-stable mirrors of the compositor's `d3renderstream` C header.
//!
//! Everything declared inside the header's `#pragma pack(push, 4)` region is
//! mirrored as `#[repr(C, packed(4))]`, so 8-byte fields (handles, doubles,
//! pointers) sit on 4-byte boundaries exactly as the vendor library expects.
//! [`FrameResponseData`] is declared after the matching `pack(pop)` and keeps
//! natural C alignment.
//!
//! Fields of packed structs must be copied out before use; taking a reference
//! to an 8-byte field is rejected by the compiler.
//!
//! C enums cross the boundary as their raw integer values. Higher-level crates
//! convert them into Rust enums after validating the range.

#![allow(non_camel_case_types)]

use std::ffi::{c_char, c_int, c_void};

/// Protocol major version this crate mirrors.
pub const RENDER_STREAM_VERSION_MAJOR: c_int = 1;

/// Protocol minor version this crate mirrors.
pub const RENDER_STREAM_VERSION_MINOR: c_int = 30;

/// Raw `RS_ERROR` value returned by every fallible entry point.
pub type RsError = c_int;

pub const RS_ERROR_SUCCESS: RsError = 0;
pub const RS_NOT_INITIALISED: RsError = 1;
pub const RS_ERROR_ALREADYINITIALISED: RsError = 2;
pub const RS_ERROR_INVALIDHANDLE: RsError = 3;
pub const RS_MAXSENDERSREACHED: RsError = 4;
pub const RS_ERROR_BADSTREAMTYPE: RsError = 5;
pub const RS_ERROR_NOTFOUND: RsError = 6;
pub const RS_ERROR_INCORRECTSCHEMA: RsError = 7;
pub const RS_ERROR_INVALID_PARAMETERS: RsError = 8;
pub const RS_ERROR_BUFFER_OVERFLOW: RsError = 9;
pub const RS_ERROR_TIMEOUT: RsError = 10;
pub const RS_ERROR_STREAMS_CHANGED: RsError = 11;
pub const RS_ERROR_INCOMPATIBLE_VERSION: RsError = 12;
pub const RS_ERROR_FAILED_TO_GET_DXDEVICE_FROM_RESOURCE: RsError = 13;
pub const RS_ERROR_FAILED_TO_INITIALISE_GPGPU: RsError = 14;
pub const RS_ERROR_QUIT: RsError = 15;
pub const RS_ERROR_UNSPECIFIED: RsError = 16;

/// Raw `RSPixelFormat` (declared `: uint32_t` in the header).
pub type RsPixelFormat = u32;

pub const RS_FMT_INVALID: RsPixelFormat = 0;
pub const RS_FMT_BGRA8: RsPixelFormat = 1;
pub const RS_FMT_BGRX8: RsPixelFormat = 2;
pub const RS_FMT_RGBA32F: RsPixelFormat = 3;
pub const RS_FMT_RGBA16: RsPixelFormat = 4;
pub const RS_FMT_RGBA8: RsPixelFormat = 5;
pub const RS_FMT_RGBX8: RsPixelFormat = 6;

pub const FRAMEDATA_NO_FLAGS: u32 = 0;
pub const FRAMEDATA_RESET: u32 = 1;

pub const REMOTEPARAMETER_NO_FLAGS: u32 = 0;
pub const REMOTEPARAMETER_NO_SEQUENCE: u32 = 1;
pub const REMOTEPARAMETER_READ_ONLY: u32 = 2;

/// Raw `RemoteParameterType`.
pub type RemoteParameterType = u32;

pub const RS_PARAMETER_NUMBER: RemoteParameterType = 0;
pub const RS_PARAMETER_IMAGE: RemoteParameterType = 1;
/// 4x4 TR matrix.
pub const RS_PARAMETER_POSE: RemoteParameterType = 2;
/// 4x4 TRS matrix.
pub const RS_PARAMETER_TRANSFORM: RemoteParameterType = 3;
pub const RS_PARAMETER_TEXT: RemoteParameterType = 4;

/// Raw `RemoteParameterDmxType`.
pub type RemoteParameterDmxType = u32;

pub const RS_DMX_DEFAULT: RemoteParameterDmxType = 0;
pub const RS_DMX_8: RemoteParameterDmxType = 1;
pub const RS_DMX_16_BE: RemoteParameterDmxType = 2;

/// Raw `SenderFrameType`.
pub type SenderFrameType = u32;

pub const RS_FRAMETYPE_HOST_MEMORY: SenderFrameType = 0;
pub const RS_FRAMETYPE_DX11_TEXTURE: SenderFrameType = 1;
pub const RS_FRAMETYPE_DX12_TEXTURE: SenderFrameType = 2;
pub const RS_FRAMETYPE_OPENGL_TEXTURE: SenderFrameType = 3;
pub const RS_FRAMETYPE_VULKAN_TEXTURE: SenderFrameType = 4;
pub const RS_FRAMETYPE_UNKNOWN: SenderFrameType = 5;

/// Raw `UseDX12SharedHeapFlag`.
pub type UseDx12SharedHeapFlag = u32;

pub const RS_DX12_USE_SHARED_HEAP_FLAG: UseDx12SharedHeapFlag = 0;
pub const RS_DX12_DO_NOT_USE_SHARED_HEAP_FLAG: UseDx12SharedHeapFlag = 1;

pub type StreamHandle = u64;
pub type CameraHandle = u64;

/// Logging callback installed with the `rs_register*LoggingFunc` family.
pub type Logger = unsafe extern "C" fn(message: *const c_char);

/// Tracking data required by the compositor but not used to render content.
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct D3TrackingData {
    pub virtual_zoom_scale: f32,
    pub virtual_reprojection_required: u8,
    pub x_real_camera: f32,
    pub y_real_camera: f32,
    pub z_real_camera: f32,
    pub rx_real_camera: f32,
    pub ry_real_camera: f32,
    pub rz_real_camera: f32,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraData {
    pub id: StreamHandle,
    pub camera_handle: CameraHandle,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
    pub rz: f32,
    pub focal_length: f32,
    pub sensor_x: f32,
    pub sensor_y: f32,
    pub cx: f32,
    pub cy: f32,
    pub near_z: f32,
    pub far_z: f32,
    /// If > 0, an orthographic camera should be used.
    pub ortho_width: f32,
    pub d3_tracking: D3TrackingData,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameData {
    pub t_tracked: f64,
    pub local_time: f64,
    pub local_time_delta: f64,
    pub frame_rate_numerator: u32,
    pub frame_rate_denominator: u32,
    pub flags: u32,
    pub scene: u32,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraResponseData {
    pub t_tracked: f64,
    pub camera: CameraData,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct HostMemoryData {
    pub data: *mut u8,
    pub stride: u32,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct Dx11Data {
    pub resource: *mut c_void,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct Dx12Data {
    pub resource: *mut c_void,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct OpenGlData {
    pub texture: u32,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct VulkanDataStructure {
    pub memory: *mut c_void,
    pub size: u64,
    pub format: RsPixelFormat,
    pub width: u32,
    pub height: u32,
    pub wait_semaphore: *mut c_void,
    pub wait_semaphore_value: u64,
    pub signal_semaphore: *mut c_void,
    pub signal_semaphore_value: u64,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct VulkanData {
    pub image: *mut VulkanDataStructure,
}

/// Frame payload, discriminated by a separate [`SenderFrameType`].
#[repr(C, packed(4))]
#[derive(Clone, Copy)]
pub union SenderFrameTypeData {
    pub cpu: HostMemoryData,
    pub dx11: Dx11Data,
    pub dx12: Dx12Data,
    pub gl: OpenGlData,
    pub vk: VulkanData,
}

impl Default for SenderFrameTypeData {
    fn default() -> Self {
        Self {
            cpu: HostMemoryData {
                data: std::ptr::null_mut(),
                stride: 0,
            },
        }
    }
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameRegion {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
}

/// Normalised (0-1) clipping planes for the edges of the camera frustum.
#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectionClipping {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct StreamDescription {
    pub handle: StreamHandle,
    pub channel: *const c_char,
    pub mapping_id: u64,
    pub i_viewpoint: i32,
    pub name: *const c_char,
    pub width: u32,
    pub height: u32,
    pub format: RsPixelFormat,
    pub clipping: ProjectionClipping,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct StreamDescriptions {
    pub n_streams: u32,
    pub streams: *mut StreamDescription,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericalDefaults {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default_value: f32,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct TextDefaults {
    pub default_value: *const c_char,
}

#[repr(C, packed(4))]
#[derive(Clone, Copy)]
pub union RemoteParameterTypeDefaults {
    pub number: NumericalDefaults,
    pub text: TextDefaults,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageFrameData {
    pub width: u32,
    pub height: u32,
    pub format: RsPixelFormat,
    pub image_id: i64,
}

#[repr(C, packed(4))]
#[derive(Clone, Copy)]
pub struct RemoteParameter {
    pub group: *const c_char,
    pub display_name: *const c_char,
    pub key: *const c_char,
    pub type_: RemoteParameterType,
    pub defaults: RemoteParameterTypeDefaults,
    pub n_options: u32,
    pub options: *mut *const c_char,
    /// DMX channel offset or auto (-1).
    pub dmx_offset: i32,
    pub dmx_type: RemoteParameterDmxType,
    pub flags: u32,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct RemoteParameters {
    pub name: *const c_char,
    pub n_parameters: u32,
    pub parameters: *mut RemoteParameter,
    pub hash: u64,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct Scenes {
    pub n_scenes: u32,
    pub scenes: *mut RemoteParameters,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct Channels {
    pub n_channels: u32,
    pub channels: *mut *const c_char,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub engine_name: *const c_char,
    pub engine_version: *const c_char,
    pub info: *const c_char,
    pub channels: Channels,
    pub scenes: Scenes,
}

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy)]
pub struct ProfilingEntry {
    pub name: *const c_char,
    pub value: f32,
}

/// Response metadata passed by pointer to `rs_sendFrame`.
///
/// Declared outside the header's packed region, so this uses natural alignment.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FrameResponseData {
    pub camera_data: *const CameraResponseData,
    pub schema_hash: u64,
    pub parameter_data_size: u32,
    pub parameter_data: *mut c_void,
    pub text_data_count: u32,
    pub text_data: *mut *const c_char,
}

impl Default for FrameResponseData {
    fn default() -> Self {
        Self {
            camera_data: std::ptr::null(),
            schema_hash: 0,
            parameter_data_size: 0,
            parameter_data: std::ptr::null_mut(),
            text_data_count: 0,
            text_data: std::ptr::null_mut(),
        }
    }
}

// Isolated functions, usable before rs_initialise.
pub type RsRegisterLoggingFuncFn = unsafe extern "C" fn(logger: Logger);
pub type RsUnregisterLoggingFuncFn = unsafe extern "C" fn();
pub type RsInitialiseFn =
    unsafe extern "C" fn(expected_version_major: c_int, expected_version_minor: c_int) -> RsError;
pub type RsInitialiseGpGpuWithoutInteropFn = unsafe extern "C" fn(device: *mut c_void) -> RsError;
pub type RsInitialiseGpGpuWithDx11DeviceFn = unsafe extern "C" fn(device: *mut c_void) -> RsError;
pub type RsInitialiseGpGpuWithDx11ResourceFn =
    unsafe extern "C" fn(resource: *mut c_void) -> RsError;
pub type RsInitialiseGpGpuWithDx12DeviceAndQueueFn =
    unsafe extern "C" fn(device: *mut c_void, queue: *mut c_void) -> RsError;
pub type RsInitialiseGpGpuWithOpenGlContextsFn =
    unsafe extern "C" fn(gl_context: *mut c_void, device_context: *mut c_void) -> RsError;
pub type RsInitialiseGpGpuWithVulkanDeviceFn = unsafe extern "C" fn(device: *mut c_void) -> RsError;
pub type RsShutdownFn = unsafe extern "C" fn() -> RsError;

// Require rs_initialise.
pub type RsUseDx12SharedHeapFlagFn =
    unsafe extern "C" fn(flag: *mut UseDx12SharedHeapFlag) -> RsError;
pub type RsSaveSchemaFn =
    unsafe extern "C" fn(asset_path: *const c_char, schema: *mut Schema) -> RsError;
pub type RsLoadSchemaFn = unsafe extern "C" fn(
    asset_path: *const c_char,
    schema: *mut Schema,
    n_bytes: *mut u32,
) -> RsError;

// Require the asset launcher environment.
pub type RsSetSchemaFn = unsafe extern "C" fn(schema: *mut Schema) -> RsError;
pub type RsGetStreamsFn =
    unsafe extern "C" fn(streams: *mut StreamDescriptions, n_bytes: *mut u32) -> RsError;
pub type RsAwaitFrameDataFn =
    unsafe extern "C" fn(timeout_ms: c_int, data: *mut FrameData) -> RsError;
pub type RsSetFollowerFn = unsafe extern "C" fn(is_follower: c_int) -> RsError;
pub type RsBeginFollowerFrameFn = unsafe extern "C" fn(t_tracked: f64) -> RsError;
pub type RsGetFrameParametersFn = unsafe extern "C" fn(
    schema_hash: u64,
    out_parameter_data: *mut c_void,
    out_parameter_data_size: u64,
) -> RsError;
pub type RsGetFrameImageDataFn = unsafe extern "C" fn(
    schema_hash: u64,
    out_parameter_data: *mut ImageFrameData,
    out_parameter_data_count: u64,
) -> RsError;
pub type RsGetFrameImageFn = unsafe extern "C" fn(
    image_id: i64,
    frame_type: SenderFrameType,
    data: SenderFrameTypeData,
) -> RsError;
pub type RsGetFrameTextFn = unsafe extern "C" fn(
    schema_hash: u64,
    text_param_index: u32,
    out_text_ptr: *mut *const c_char,
) -> RsError;
pub type RsGetFrameCameraFn =
    unsafe extern "C" fn(stream_handle: StreamHandle, out_camera_data: *mut CameraData) -> RsError;
pub type RsSendFrameFn = unsafe extern "C" fn(
    stream_handle: StreamHandle,
    frame_type: SenderFrameType,
    data: SenderFrameTypeData,
    frame_data: *const FrameResponseData,
) -> RsError;
pub type RsReleaseImageFn =
    unsafe extern "C" fn(frame_type: SenderFrameType, data: SenderFrameTypeData) -> RsError;
pub type RsLogToD3Fn = unsafe extern "C" fn(message: *const c_char) -> RsError;
pub type RsSendProfilingDataFn =
    unsafe extern "C" fn(entries: *mut ProfilingEntry, count: c_int) -> RsError;
pub type RsSetNewStatusMessageFn = unsafe extern "C" fn(message: *const c_char) -> RsError;
