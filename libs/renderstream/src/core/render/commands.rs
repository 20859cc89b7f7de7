// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Payload records executed on the render thread.
//!
//! Each record carries the native function pointer it calls, so the render
//! thread never touches the binding. Records live in an
//! [`crate::core::pool::EventDataPool`] slot until the call has been made.

use std::fmt;
use std::ptr::NonNull;

use renderstream_abi as abi;

use crate::core::frames::StreamHandle;
use crate::core::native::NativeStatus;

/// Render-thread event kinds, in native event ID order.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderEvent {
    InputImage = 0,
    SendFrame = 1,
}

/// Whether `data` carries a texture for `frame_type`.
pub fn has_texture(frame_type: abi::SenderFrameType, data: &abi::SenderFrameTypeData) -> bool {
    // Union reads are by value on the field matching `frame_type`.
    unsafe {
        match frame_type {
            abi::RS_FRAMETYPE_HOST_MEMORY => !{ data.cpu.data }.is_null(),
            abi::RS_FRAMETYPE_DX11_TEXTURE => !{ data.dx11.resource }.is_null(),
            abi::RS_FRAMETYPE_DX12_TEXTURE => !{ data.dx12.resource }.is_null(),
            abi::RS_FRAMETYPE_OPENGL_TEXTURE => {
                let texture = data.gl.texture;
                texture != 0
            }
            abi::RS_FRAMETYPE_VULKAN_TEXTURE => !{ data.vk.image }.is_null(),
            _ => false,
        }
    }
}

/// One `rs_sendFrame` call for a rendered stream texture.
#[derive(Clone, Copy)]
pub struct SendFrameCommand {
    pub send_frame: abi::RsSendFrameFn,
    pub stream: StreamHandle,
    pub frame_type: abi::SenderFrameType,
    pub frame_data: abi::SenderFrameTypeData,
    /// Referenced by the native call; must not move until it returns.
    pub camera_response: abi::CameraResponseData,
}

impl SendFrameCommand {
    /// Sends the frame. A missing texture is rejected with
    /// [`NativeStatus::InvalidParameters`] before the library is called.
    ///
    /// # Safety
    /// `command` must be null or point to a live command whose texture handle
    /// is valid for its frame type.
    pub unsafe fn execute(command: *const Self) -> NativeStatus {
        let Some(command) = (unsafe { command.as_ref() }) else {
            return NativeStatus::InvalidParameters;
        };
        if !has_texture(command.frame_type, &command.frame_data) {
            tracing::error!(stream = %command.stream, "SendFrameCommand null texture pointer");
            return NativeStatus::InvalidParameters;
        }
        let response = abi::FrameResponseData {
            camera_data: std::ptr::addr_of!(command.camera_response),
            ..Default::default()
        };
        let raw = unsafe {
            (command.send_frame)(
                command.stream.0,
                command.frame_type,
                command.frame_data,
                &response,
            )
        };
        NativeStatus::from_raw(raw)
    }
}

impl fmt::Debug for SendFrameCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t_tracked = self.camera_response.t_tracked;
        f.debug_struct("SendFrameCommand")
            .field("stream", &self.stream)
            .field("frame_type", &self.frame_type)
            .field("t_tracked", &t_tracked)
            .finish_non_exhaustive()
    }
}

/// One `rs_getFrameImage` call copying a remote image into a texture.
#[derive(Clone, Copy)]
pub struct InputImageCommand {
    pub get_frame_image: abi::RsGetFrameImageFn,
    pub image_id: i64,
    pub frame_type: abi::SenderFrameType,
    pub frame_data: abi::SenderFrameTypeData,
}

impl InputImageCommand {
    /// # Safety
    /// `command` must be null or point to a live command whose texture handle
    /// is valid for its frame type.
    pub unsafe fn execute(command: *const Self) -> NativeStatus {
        let Some(command) = (unsafe { command.as_ref() }) else {
            return NativeStatus::InvalidParameters;
        };
        if !has_texture(command.frame_type, &command.frame_data) {
            tracing::error!(image_id = command.image_id, "InputImageCommand null texture pointer");
            return NativeStatus::InvalidParameters;
        }
        let raw = unsafe {
            (command.get_frame_image)(command.image_id, command.frame_type, command.frame_data)
        };
        NativeStatus::from_raw(raw)
    }
}

impl fmt::Debug for InputImageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputImageCommand")
            .field("image_id", &self.image_id)
            .field("frame_type", &self.frame_type)
            .finish_non_exhaustive()
    }
}

/// A pooled command ready for the render thread.
#[derive(Debug, Clone, Copy)]
pub enum RenderCommand {
    InputImage(NonNull<InputImageCommand>),
    SendFrame(NonNull<SendFrameCommand>),
}

// The pointee is pool-owned `Copy` data that the main thread does not write
// while the slot is in use.
unsafe impl Send for RenderCommand {}

impl RenderCommand {
    /// # Safety
    /// `command` must stay valid and unmodified until the command executes.
    pub unsafe fn send_frame(command: NonNull<SendFrameCommand>) -> Self {
        Self::SendFrame(command)
    }

    /// # Safety
    /// `command` must stay valid and unmodified until the command executes.
    pub unsafe fn input_image(command: NonNull<InputImageCommand>) -> Self {
        Self::InputImage(command)
    }

    pub fn event(&self) -> RenderEvent {
        match self {
            Self::InputImage(_) => RenderEvent::InputImage,
            Self::SendFrame(_) => RenderEvent::SendFrame,
        }
    }

    /// Runs the command on the current thread.
    pub fn execute(self) -> NativeStatus {
        // Construction is unsafe and guarantees the pointee is live.
        match self {
            Self::InputImage(ptr) => unsafe { InputImageCommand::execute(ptr.as_ptr()) },
            Self::SendFrame(ptr) => unsafe { SendFrameCommand::execute(ptr.as_ptr()) },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::core::frames::{CameraData, camera_response};

    pub(crate) static SENT: Mutex<Vec<(u64, f64, u64)>> = Mutex::new(Vec::new());

    pub(crate) unsafe extern "C" fn fake_send_frame(
        handle: abi::StreamHandle,
        _frame_type: abi::SenderFrameType,
        _data: abi::SenderFrameTypeData,
        response: *const abi::FrameResponseData,
    ) -> abi::RsError {
        let response = unsafe { &*response };
        let camera = unsafe { *response.camera_data };
        let t_tracked = camera.t_tracked;
        let camera_handle = camera.camera.camera_handle;
        SENT.lock().unwrap().push((handle, t_tracked, camera_handle));
        abi::RS_ERROR_SUCCESS
    }

    unsafe extern "C" fn fake_get_frame_image(
        image_id: i64,
        _frame_type: abi::SenderFrameType,
        data: abi::SenderFrameTypeData,
    ) -> abi::RsError {
        let cpu = unsafe { data.cpu };
        unsafe { *{ cpu.data } = image_id as u8 };
        abi::RS_ERROR_SUCCESS
    }

    fn host_data(pixels: &mut [u8]) -> abi::SenderFrameTypeData {
        abi::SenderFrameTypeData {
            cpu: abi::HostMemoryData {
                data: pixels.as_mut_ptr(),
                stride: pixels.len() as u32,
            },
        }
    }

    #[test]
    fn test_send_frame_passes_camera_response() {
        let mut pixels = vec![0u8; 4];
        let camera = CameraData {
            camera_handle: 99,
            ..Default::default()
        };
        let command = SendFrameCommand {
            send_frame: fake_send_frame,
            stream: StreamHandle(0x5EED),
            frame_type: abi::RS_FRAMETYPE_HOST_MEMORY,
            frame_data: host_data(&mut pixels),
            camera_response: camera_response(4.5, &camera),
        };
        let status = unsafe { SendFrameCommand::execute(&command) };
        assert_eq!(status, NativeStatus::Success);
        assert!(SENT.lock().unwrap().contains(&(0x5EED, 4.5, 99)));
    }

    #[test]
    fn test_null_texture_is_invalid() {
        let command = SendFrameCommand {
            send_frame: fake_send_frame,
            stream: StreamHandle(1),
            frame_type: abi::RS_FRAMETYPE_DX11_TEXTURE,
            frame_data: abi::SenderFrameTypeData::default(),
            camera_response: camera_response(0.0, &CameraData::default()),
        };
        assert_eq!(
            unsafe { SendFrameCommand::execute(&command) },
            NativeStatus::InvalidParameters
        );
        assert_eq!(
            unsafe { SendFrameCommand::execute(std::ptr::null()) },
            NativeStatus::InvalidParameters
        );
    }

    #[test]
    fn test_input_image_through_render_command() {
        let mut pixels = vec![0u8; 4];
        let mut command = InputImageCommand {
            get_frame_image: fake_get_frame_image,
            image_id: 7,
            frame_type: abi::RS_FRAMETYPE_HOST_MEMORY,
            frame_data: host_data(&mut pixels),
        };
        let render = unsafe { RenderCommand::input_image(NonNull::from(&mut command)) };
        assert_eq!(render.event(), RenderEvent::InputImage);
        assert_eq!(render.execute(), NativeStatus::Success);
        assert_eq!(pixels[0], 7);
    }

    #[test]
    fn test_unknown_frame_type_has_no_texture() {
        let mut pixels = vec![0u8; 4];
        assert!(has_texture(abi::RS_FRAMETYPE_HOST_MEMORY, &host_data(&mut pixels)));
        assert!(!has_texture(abi::RS_FRAMETYPE_UNKNOWN, &host_data(&mut pixels)));
    }
}
