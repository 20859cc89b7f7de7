// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! [`RenderStreamApi`] over the loaded compositor library.

use std::ffi::{CString, c_char, c_int, c_void};
use std::path::Path;
use std::ptr;
use std::time::Duration;

use renderstream_abi as abi;

use crate::core::config::LibraryConfig;
use crate::core::error::{RenderStreamError, Result};
use crate::core::frames::{
    CameraData, FrameData, ImageFrameData, StreamDescription, StreamHandle, string_from_ptr,
};
use crate::core::schema::{ManagedSchema, SchemaLayout, read_schema};

use super::api::RenderStreamApi;
use super::graphics::{Dx12SharedHeapFlag, GraphicsBackend};
use super::library::{RenderStreamFunctions, RenderStreamLibrary};
use super::locate::{library_file_name, locate_library};
use super::logging::{self, CompositorLogSink};
use super::query::query_then_fetch;
use super::status::{AwaitOutcome, NativeStatus};

/// Owns the loaded library and tracks initialisation.
///
/// Loading never fails outright: when the library, a symbol or the graphics
/// backend is missing, the binding is built unavailable and records why.
pub struct NativeBinding {
    functions: RenderStreamFunctions,
    backend: GraphicsBackend,
    unavailable_reason: Option<String>,
    initialised: bool,
    loggers_registered: bool,
    log_sink: CompositorLogSink,
    // Dropped last so no function pointer outlives the code it points into.
    library: Option<RenderStreamLibrary>,
}

impl NativeBinding {
    pub fn load(config: &LibraryConfig) -> Self {
        let backend = config.graphics_backend;
        if !backend.is_supported() {
            return Self::unavailable(
                backend,
                format!("unsupported graphics backend: {backend}"),
            );
        }

        let Some(path) = locate_library(config.path.as_deref()) else {
            return Self::unavailable(
                backend,
                format!(
                    "{} not found; is the compositor installed? Set RENDERSTREAM_LIBRARY to override",
                    library_file_name()
                ),
            );
        };

        match RenderStreamLibrary::load(&path) {
            Ok(library) => {
                let mut binding = Self::from_functions(*library.functions(), backend);
                binding.library = Some(library);
                tracing::info!(path = %path.display(), %backend, "Loaded RenderStream");
                binding
            }
            Err(e) => Self::unavailable(backend, e.to_string()),
        }
    }

    /// Binding over a hand-built function table.
    ///
    /// Missing entries report not initialised when called.
    pub fn from_functions(functions: RenderStreamFunctions, backend: GraphicsBackend) -> Self {
        let unavailable_reason =
            (!backend.is_supported()).then(|| format!("unsupported graphics backend: {backend}"));
        Self {
            log_sink: CompositorLogSink::new(functions.log_to_d3),
            functions,
            backend,
            unavailable_reason,
            initialised: false,
            loggers_registered: false,
            library: None,
        }
    }

    fn unavailable(backend: GraphicsBackend, reason: String) -> Self {
        tracing::error!(%reason, "RenderStream unavailable");
        Self {
            functions: RenderStreamFunctions::default(),
            backend,
            unavailable_reason: Some(reason),
            initialised: false,
            loggers_registered: false,
            log_sink: CompositorLogSink::default(),
            library: None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable_reason.as_deref()
    }

    pub fn backend(&self) -> GraphicsBackend {
        self.backend
    }

    pub fn library_path(&self) -> Option<&Path> {
        self.library.as_ref().map(RenderStreamLibrary::path)
    }

    /// Handle for [`logging::CompositorLogLayer`]; disconnected on shutdown.
    pub fn compositor_log_sink(&self) -> CompositorLogSink {
        self.log_sink.clone()
    }

    fn require<T: Copy>(&self, function: Option<T>) -> Result<T> {
        if !self.initialised {
            return Err(RenderStreamError::NotInitialised);
        }
        function.ok_or(RenderStreamError::NotInitialised)
    }

    /// Routes native log output into `tracing`.
    pub fn register_logging(&mut self) {
        let functions = self.functions;
        if let Some(register) = functions.register_logging_func {
            unsafe { register(logging::log_info) };
        }
        if let Some(register) = functions.register_error_logging_func {
            unsafe { register(logging::log_error) };
        }
        if let Some(register) = functions.register_verbose_logging_func {
            unsafe { register(logging::log_verbose) };
        }
        self.loggers_registered = true;
    }

    pub fn unregister_logging(&mut self) {
        if !self.loggers_registered {
            return;
        }
        let functions = self.functions;
        if let Some(unregister) = functions.unregister_verbose_logging_func {
            unsafe { unregister() };
        }
        if let Some(unregister) = functions.unregister_error_logging_func {
            unsafe { unregister() };
        }
        if let Some(unregister) = functions.unregister_logging_func {
            unsafe { unregister() };
        }
        self.loggers_registered = false;
    }

    pub fn use_dx12_shared_heap_flag(&self) -> Result<Dx12SharedHeapFlag> {
        let query = self.require(self.functions.use_dx12_shared_heap_flag)?;
        let mut flag = abi::RS_DX12_USE_SHARED_HEAP_FLAG;
        NativeStatus::from_raw(unsafe { query(&mut flag) }).into_result("rs_useDX12SharedHeapFlag")?;
        Ok(Dx12SharedHeapFlag::from_raw(flag))
    }

    /// # Safety
    /// `device` must be null or a device the compositor can use without interop.
    pub unsafe fn initialise_gpgpu_without_interop(&self, device: *mut c_void) -> Result<()> {
        let init = self.require(self.functions.initialise_gpgpu_without_interop)?;
        NativeStatus::from_raw(unsafe { init(device) }).into_result("rs_initialiseGpGpuWithoutInterop")
    }

    /// # Safety
    /// `device` must be a live `ID3D11Device`.
    pub unsafe fn initialise_gpgpu_with_dx11_device(&self, device: *mut c_void) -> Result<()> {
        let init = self.require(self.functions.initialise_gpgpu_with_dx11_device)?;
        NativeStatus::from_raw(unsafe { init(device) }).into_result("rs_initialiseGpGpuWithDX11Device")
    }

    /// # Safety
    /// `resource` must be a live `ID3D11Resource`.
    pub unsafe fn initialise_gpgpu_with_dx11_resource(&self, resource: *mut c_void) -> Result<()> {
        let init = self.require(self.functions.initialise_gpgpu_with_dx11_resource)?;
        NativeStatus::from_raw(unsafe { init(resource) })
            .into_result("rs_initialiseGpGpuWithDX11Resource")
    }

    /// # Safety
    /// `device` and `queue` must be a live `ID3D12Device` and `ID3D12CommandQueue`.
    pub unsafe fn initialise_gpgpu_with_dx12_device_and_queue(
        &self,
        device: *mut c_void,
        queue: *mut c_void,
    ) -> Result<()> {
        let init = self.require(self.functions.initialise_gpgpu_with_dx12_device_and_queue)?;
        NativeStatus::from_raw(unsafe { init(device, queue) })
            .into_result("rs_initialiseGpGpuWithDX12DeviceAndQueue")
    }

    /// # Safety
    /// `gl_context` and `device_context` must be the current GL and device contexts.
    pub unsafe fn initialise_gpgpu_with_opengl_contexts(
        &self,
        gl_context: *mut c_void,
        device_context: *mut c_void,
    ) -> Result<()> {
        let init = self.require(self.functions.initialise_gpgpu_with_opengl_contexts)?;
        NativeStatus::from_raw(unsafe { init(gl_context, device_context) })
            .into_result("rs_initialiseGpGpuWithOpenGlContexts")
    }

    /// # Safety
    /// `device` must be a live `VkDevice`.
    pub unsafe fn initialise_gpgpu_with_vulkan_device(&self, device: *mut c_void) -> Result<()> {
        let init = self.require(self.functions.initialise_gpgpu_with_vulkan_device)?;
        NativeStatus::from_raw(unsafe { init(device) })
            .into_result("rs_initialiseGpGpuWithVulkanDevice")
    }

    /// Returns an image obtained through `rs_getFrameImage` to the compositor.
    ///
    /// # Safety
    /// `data` must describe a texture of `frame_type` still owned by the caller.
    pub unsafe fn release_image(
        &self,
        frame_type: abi::SenderFrameType,
        data: abi::SenderFrameTypeData,
    ) -> Result<()> {
        let release = self.require(self.functions.release_image)?;
        NativeStatus::from_raw(unsafe { release(frame_type, data) }).into_result("rs_releaseImage")
    }
}

impl RenderStreamApi for NativeBinding {
    fn is_available(&self) -> bool {
        self.unavailable_reason.is_none()
    }

    fn initialize(&mut self) -> Result<()> {
        if let Some(reason) = &self.unavailable_reason {
            return Err(RenderStreamError::LibraryUnavailable(reason.clone()));
        }
        if self.initialised {
            return Ok(());
        }
        let initialise = self
            .functions
            .initialise
            .ok_or_else(|| RenderStreamError::MissingSymbol("rs_initialise".into()))?;

        self.register_logging();

        let status = NativeStatus::from_raw(unsafe {
            initialise(abi::RENDER_STREAM_VERSION_MAJOR, abi::RENDER_STREAM_VERSION_MINOR)
        });
        match status {
            NativeStatus::Success => {
                self.initialised = true;
                tracing::info!(
                    major = abi::RENDER_STREAM_VERSION_MAJOR,
                    minor = abi::RENDER_STREAM_VERSION_MINOR,
                    "Initialised RenderStream"
                );
                Ok(())
            }
            NativeStatus::IncompatibleVersion => {
                tracing::error!(
                    "Unsupported RenderStream library, expected version {}.{}",
                    abi::RENDER_STREAM_VERSION_MAJOR,
                    abi::RENDER_STREAM_VERSION_MINOR
                );
                Err(RenderStreamError::IncompatibleVersion {
                    major: abi::RENDER_STREAM_VERSION_MAJOR,
                    minor: abi::RENDER_STREAM_VERSION_MINOR,
                })
            }
            status => {
                tracing::error!(%status, "Failed to initialise RenderStream");
                status.into_result("rs_initialise")
            }
        }
    }

    fn is_initialized(&self) -> bool {
        self.initialised
    }

    fn load_schema(&mut self, asset_path: &Path) -> Result<ManagedSchema> {
        let load = self.require(self.functions.load_schema)?;
        let asset_path = path_to_cstring(asset_path)?;

        let buffer = query_then_fetch("rs_loadSchema", |schema, n_bytes| {
            NativeStatus::from_raw(unsafe { load(asset_path.as_ptr(), schema.cast(), n_bytes) })
        })?;

        let schema = unsafe { buffer.header::<abi::Schema>() }.ok_or_else(|| {
            RenderStreamError::Schema("rs_loadSchema returned no schema".into())
        })?;
        unsafe { read_schema(schema) }
    }

    fn save_schema(&mut self, asset_path: &Path, schema: &ManagedSchema) -> Result<()> {
        let save = self.require(self.functions.save_schema)?;
        let asset_path = path_to_cstring(asset_path)?;
        let mut layout = SchemaLayout::new(schema)?;
        NativeStatus::from_raw(unsafe { save(asset_path.as_ptr(), layout.as_mut_ptr()) })
            .into_result("rs_saveSchema")
    }

    fn set_schema(&mut self, schema: &mut ManagedSchema) -> Result<()> {
        let set = self.require(self.functions.set_schema)?;
        let mut layout = SchemaLayout::new(schema)?;
        NativeStatus::from_raw(unsafe { set(layout.as_mut_ptr()) }).into_result("rs_setSchema")?;
        for (scene, hash) in schema.scenes.iter_mut().zip(layout.scene_hashes()) {
            scene.hash = hash;
        }
        Ok(())
    }

    fn get_streams(&mut self) -> Result<Vec<StreamDescription>> {
        let get = self.require(self.functions.get_streams)?;
        let buffer = query_then_fetch("rs_getStreams", |streams, n_bytes| {
            NativeStatus::from_raw(unsafe { get(streams.cast(), n_bytes) })
        })?;

        let Some(descriptions) = (unsafe { buffer.header::<abi::StreamDescriptions>() }) else {
            return Ok(Vec::new());
        };
        let count = descriptions.n_streams as usize;
        let first = descriptions.streams;
        if first.is_null() {
            return Ok(Vec::new());
        }
        Ok((0..count)
            .map(|i| {
                let raw = unsafe { first.add(i).read_unaligned() };
                unsafe { StreamDescription::from_raw(&raw) }
            })
            .collect())
    }

    fn await_frame_data(&mut self, timeout: Duration) -> Result<AwaitOutcome> {
        let await_frame = self.require(self.functions.await_frame_data)?;
        let timeout_ms = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
        let mut frame = abi::FrameData::default();
        let status = NativeStatus::from_raw(unsafe { await_frame(timeout_ms, &mut frame) });
        AwaitOutcome::from_status("rs_awaitFrameData", status, frame.into())
    }

    fn set_follower(&mut self, follower: bool) -> Result<()> {
        let set = self.require(self.functions.set_follower)?;
        NativeStatus::from_raw(unsafe { set(c_int::from(follower)) }).into_result("rs_setFollower")
    }

    fn begin_follower_frame(&mut self, frame: &FrameData) -> Result<AwaitOutcome> {
        let begin = self.require(self.functions.begin_follower_frame)?;
        let status = NativeStatus::from_raw(unsafe { begin(frame.t_tracked) });
        AwaitOutcome::from_status("rs_beginFollowerFrame", status, *frame)
    }

    fn get_frame_parameters(&mut self, schema_hash: u64, out: &mut [f32]) -> Result<()> {
        let get = self.require(self.functions.get_frame_parameters)?;
        let size = std::mem::size_of_val(out) as u64;
        NativeStatus::from_raw(unsafe { get(schema_hash, out.as_mut_ptr().cast(), size) })
            .into_result("rs_getFrameParameters")
    }

    fn get_frame_image_data(&mut self, schema_hash: u64, count: usize) -> Result<Vec<ImageFrameData>> {
        let get = self.require(self.functions.get_frame_image_data)?;
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut raw = vec![abi::ImageFrameData::default(); count];
        NativeStatus::from_raw(unsafe { get(schema_hash, raw.as_mut_ptr(), count as u64) })
            .into_result("rs_getFrameImageData")?;
        Ok(raw.into_iter().map(ImageFrameData::from).collect())
    }

    fn get_frame_text(&mut self, schema_hash: u64, index: u32) -> Result<String> {
        let get = self.require(self.functions.get_frame_text)?;
        let mut text: *const c_char = ptr::null();
        NativeStatus::from_raw(unsafe { get(schema_hash, index, &mut text) })
            .into_result("rs_getFrameText")?;
        Ok(unsafe { string_from_ptr(text) })
    }

    fn get_frame_camera(&mut self, stream: StreamHandle) -> Result<Option<CameraData>> {
        let get = self.require(self.functions.get_frame_camera)?;
        let mut camera = abi::CameraData::default();
        match NativeStatus::from_raw(unsafe { get(stream.0, &mut camera) }) {
            NativeStatus::Success => Ok(Some(camera.into())),
            NativeStatus::NotFound => Ok(None),
            status => status.into_result("rs_getFrameCamera").map(|()| None),
        }
    }

    fn send_frame_fn(&self) -> Option<abi::RsSendFrameFn> {
        self.require(self.functions.send_frame).ok()
    }

    fn get_frame_image_fn(&self) -> Option<abi::RsGetFrameImageFn> {
        self.require(self.functions.get_frame_image).ok()
    }

    fn log_to_compositor(&self, message: &str) -> Result<()> {
        let log = self.require(self.functions.log_to_d3)?;
        let message = str_to_cstring(message)?;
        NativeStatus::from_raw(unsafe { log(message.as_ptr()) }).into_result("rs_logToD3")
    }

    fn set_status_message(&self, message: &str) -> Result<()> {
        let set = self.require(self.functions.set_new_status_message)?;
        let message = str_to_cstring(message)?;
        NativeStatus::from_raw(unsafe { set(message.as_ptr()) }).into_result("rs_setNewStatusMessage")
    }

    fn send_profiling_data(&self, entries: &[(&str, f32)]) -> Result<()> {
        let send = self.require(self.functions.send_profiling_data)?;
        let names = entries
            .iter()
            .map(|(name, _)| str_to_cstring(name))
            .collect::<Result<Vec<_>>>()?;
        let mut native: Vec<abi::ProfilingEntry> = names
            .iter()
            .zip(entries)
            .map(|(name, (_, value))| abi::ProfilingEntry {
                name: name.as_ptr(),
                value: *value,
            })
            .collect();
        let count = c_int::try_from(native.len())
            .map_err(|_| RenderStreamError::Configuration("too many profiling entries".into()))?;
        NativeStatus::from_raw(unsafe { send(native.as_mut_ptr(), count) })
            .into_result("rs_sendProfilingData")
    }

    fn shutdown(&mut self) {
        self.log_sink.disconnect();
        self.unregister_logging();

        if self.initialised {
            self.initialised = false;
            if let Some(shutdown) = self.functions.shutdown {
                let status = NativeStatus::from_raw(unsafe { shutdown() });
                if !status.is_success() {
                    tracing::error!(%status, "Failed to shutdown");
                }
            }
            tracing::info!("Shut down RenderStream");
        }

        self.functions = RenderStreamFunctions::default();
        if self.library.take().is_some() {
            tracing::info!("Unloaded RenderStream");
        }
    }
}

impl Drop for NativeBinding {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn str_to_cstring(value: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| RenderStreamError::Configuration(format!("string contains a nul byte: {value:?}")))
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    str_to_cstring(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static INIT_CALLS: AtomicU32 = AtomicU32::new(0);
    static SHUTDOWN_CALLS: AtomicU32 = AtomicU32::new(0);

    unsafe extern "C" fn fake_initialise(major: c_int, minor: c_int) -> abi::RsError {
        INIT_CALLS.fetch_add(1, Ordering::SeqCst);
        if (major, minor) == (1, 30) {
            abi::RS_ERROR_SUCCESS
        } else {
            abi::RS_ERROR_INCOMPATIBLE_VERSION
        }
    }

    unsafe extern "C" fn incompatible_initialise(_: c_int, _: c_int) -> abi::RsError {
        abi::RS_ERROR_INCOMPATIBLE_VERSION
    }

    unsafe extern "C" fn fake_shutdown() -> abi::RsError {
        SHUTDOWN_CALLS.fetch_add(1, Ordering::SeqCst);
        abi::RS_ERROR_SUCCESS
    }

    unsafe extern "C" fn fake_get_frame_camera(
        stream: abi::StreamHandle,
        camera: *mut abi::CameraData,
    ) -> abi::RsError {
        if stream != 1 {
            return abi::RS_ERROR_NOTFOUND;
        }
        unsafe {
            (*camera).camera_handle = 9;
            (*camera).focal_length = 35.0;
        }
        abi::RS_ERROR_SUCCESS
    }

    unsafe extern "C" fn fake_get_frame_parameters(
        _hash: u64,
        out: *mut c_void,
        size: u64,
    ) -> abi::RsError {
        let count = size as usize / size_of::<f32>();
        let values = unsafe { std::slice::from_raw_parts_mut(out.cast::<f32>(), count) };
        for (i, value) in values.iter_mut().enumerate() {
            *value = i as f32;
        }
        abi::RS_ERROR_SUCCESS
    }

    fn fake_functions() -> RenderStreamFunctions {
        RenderStreamFunctions {
            initialise: Some(fake_initialise),
            shutdown: Some(fake_shutdown),
            get_frame_camera: Some(fake_get_frame_camera),
            get_frame_parameters: Some(fake_get_frame_parameters),
            ..Default::default()
        }
    }

    #[test]
    fn test_calls_before_initialise_are_rejected() {
        let mut binding = NativeBinding::from_functions(fake_functions(), GraphicsBackend::Dx11);
        assert!(binding.is_available());
        assert!(matches!(
            binding.get_frame_camera(StreamHandle(1)),
            Err(RenderStreamError::NotInitialised)
        ));
        assert!(matches!(binding.get_streams(), Err(RenderStreamError::NotInitialised)));
        assert!(binding.send_frame_fn().is_none());
    }

    #[test]
    fn test_initialise_then_call() {
        let mut binding = NativeBinding::from_functions(fake_functions(), GraphicsBackend::Dx11);
        binding.initialize().unwrap();
        assert!(binding.is_initialized());

        let camera = binding.get_frame_camera(StreamHandle(1)).unwrap().unwrap();
        assert!(camera.has_camera());
        assert_eq!(camera.focal_length, 35.0);
        assert_eq!(binding.get_frame_camera(StreamHandle(2)).unwrap(), None);

        let mut values = [0.0f32; 4];
        binding.get_frame_parameters(0, &mut values).unwrap();
        assert_eq!(values, [0.0, 1.0, 2.0, 3.0]);

        // Not bound in the fake table.
        assert!(matches!(
            binding.get_frame_text(0, 0),
            Err(RenderStreamError::NotInitialised)
        ));

        let before = SHUTDOWN_CALLS.load(Ordering::SeqCst);
        binding.shutdown();
        assert_eq!(SHUTDOWN_CALLS.load(Ordering::SeqCst), before + 1);
        assert!(matches!(
            binding.get_frame_camera(StreamHandle(1)),
            Err(RenderStreamError::NotInitialised)
        ));
        drop(binding);
        assert_eq!(SHUTDOWN_CALLS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_incompatible_version() {
        let functions = RenderStreamFunctions {
            initialise: Some(incompatible_initialise),
            ..Default::default()
        };
        let mut binding = NativeBinding::from_functions(functions, GraphicsBackend::Dx12);
        assert!(matches!(
            binding.initialize(),
            Err(RenderStreamError::IncompatibleVersion { major: 1, minor: 30 })
        ));
        assert!(!binding.is_initialized());
    }

    #[test]
    fn test_unsupported_backend_is_unavailable() {
        let mut binding = NativeBinding::from_functions(fake_functions(), GraphicsBackend::Metal);
        assert!(!binding.is_available());
        assert!(matches!(
            binding.initialize(),
            Err(RenderStreamError::LibraryUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_library_is_unavailable() {
        let config = LibraryConfig {
            path: Some("/nonexistent/libd3renderstream.so".into()),
            graphics_backend: GraphicsBackend::Vulkan,
        };
        let binding = NativeBinding::load(&config);
        assert!(!binding.is_available());
        assert!(binding.unavailable_reason().is_some());
        assert!(binding.library_path().is_none());
    }
}
