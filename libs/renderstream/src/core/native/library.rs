// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Dynamic loading of the compositor's `d3renderstream` library.

use std::path::{Path, PathBuf};

use libloading::Library;
use renderstream_abi as abi;

use crate::core::error::{RenderStreamError, Result};

macro_rules! render_stream_functions {
    ($($field:ident: $fn_type:ident = $symbol:literal,)*) => {
        /// Every `rs_*` export, bound once at load time.
        ///
        /// Fields are `None` only in tables assembled by hand (tests, partial
        /// fakes); [`RenderStreamLibrary::load`] fails unless all resolve.
        #[derive(Debug, Clone, Copy, Default)]
        pub struct RenderStreamFunctions {
            $(pub $field: Option<abi::$fn_type>,)*
        }

        impl RenderStreamFunctions {
            /// Export names in declaration order.
            pub const SYMBOLS: &'static [&'static str] = &[$($symbol,)*];

            /// # Safety
            /// Each export must have the signature declared in `renderstream-abi`.
            unsafe fn resolve(library: &Library) -> Result<Self> {
                Ok(Self {
                    $($field: Some(unsafe { resolve_symbol::<abi::$fn_type>(library, $symbol) }?),)*
                })
            }

            /// Exports with no bound function.
            pub fn missing(&self) -> Vec<&'static str> {
                let mut missing = Vec::new();
                $(
                    if self.$field.is_none() {
                        missing.push($symbol);
                    }
                )*
                missing
            }
        }
    };
}

render_stream_functions! {
    register_logging_func: RsRegisterLoggingFuncFn = "rs_registerLoggingFunc",
    register_error_logging_func: RsRegisterLoggingFuncFn = "rs_registerErrorLoggingFunc",
    register_verbose_logging_func: RsRegisterLoggingFuncFn = "rs_registerVerboseLoggingFunc",
    unregister_logging_func: RsUnregisterLoggingFuncFn = "rs_unregisterLoggingFunc",
    unregister_error_logging_func: RsUnregisterLoggingFuncFn = "rs_unregisterErrorLoggingFunc",
    unregister_verbose_logging_func: RsUnregisterLoggingFuncFn = "rs_unregisterVerboseLoggingFunc",
    initialise: RsInitialiseFn = "rs_initialise",
    initialise_gpgpu_without_interop: RsInitialiseGpGpuWithoutInteropFn = "rs_initialiseGpGpuWithoutInterop",
    initialise_gpgpu_with_dx11_device: RsInitialiseGpGpuWithDx11DeviceFn = "rs_initialiseGpGpuWithDX11Device",
    initialise_gpgpu_with_dx11_resource: RsInitialiseGpGpuWithDx11ResourceFn = "rs_initialiseGpGpuWithDX11Resource",
    initialise_gpgpu_with_dx12_device_and_queue: RsInitialiseGpGpuWithDx12DeviceAndQueueFn = "rs_initialiseGpGpuWithDX12DeviceAndQueue",
    initialise_gpgpu_with_opengl_contexts: RsInitialiseGpGpuWithOpenGlContextsFn = "rs_initialiseGpGpuWithOpenGlContexts",
    initialise_gpgpu_with_vulkan_device: RsInitialiseGpGpuWithVulkanDeviceFn = "rs_initialiseGpGpuWithVulkanDevice",
    shutdown: RsShutdownFn = "rs_shutdown",
    use_dx12_shared_heap_flag: RsUseDx12SharedHeapFlagFn = "rs_useDX12SharedHeapFlag",
    save_schema: RsSaveSchemaFn = "rs_saveSchema",
    load_schema: RsLoadSchemaFn = "rs_loadSchema",
    set_schema: RsSetSchemaFn = "rs_setSchema",
    get_streams: RsGetStreamsFn = "rs_getStreams",
    await_frame_data: RsAwaitFrameDataFn = "rs_awaitFrameData",
    set_follower: RsSetFollowerFn = "rs_setFollower",
    begin_follower_frame: RsBeginFollowerFrameFn = "rs_beginFollowerFrame",
    get_frame_parameters: RsGetFrameParametersFn = "rs_getFrameParameters",
    get_frame_image_data: RsGetFrameImageDataFn = "rs_getFrameImageData",
    get_frame_image: RsGetFrameImageFn = "rs_getFrameImage",
    get_frame_text: RsGetFrameTextFn = "rs_getFrameText",
    get_frame_camera: RsGetFrameCameraFn = "rs_getFrameCamera",
    send_frame: RsSendFrameFn = "rs_sendFrame",
    release_image: RsReleaseImageFn = "rs_releaseImage",
    log_to_d3: RsLogToD3Fn = "rs_logToD3",
    send_profiling_data: RsSendProfilingDataFn = "rs_sendProfilingData",
    set_new_status_message: RsSetNewStatusMessageFn = "rs_setNewStatusMessage",
}

unsafe fn resolve_symbol<T: Copy>(library: &Library, symbol: &'static str) -> Result<T> {
    let symbol_bytes = format!("{symbol}\0");
    unsafe { library.get::<T>(symbol_bytes.as_bytes()) }
        .map(|loaded| *loaded)
        .map_err(|e| RenderStreamError::MissingSymbol(format!("{symbol}: {e}")))
}

/// A loaded compositor library and its bound function table.
///
/// Keeps the [`Library`] alive for as long as the table may be called.
pub struct RenderStreamLibrary {
    functions: RenderStreamFunctions,
    path: PathBuf,
    _library: Library,
}

impl RenderStreamLibrary {
    /// Loads the library at `path` and binds every export.
    ///
    /// # Errors
    /// - The library failed to load
    /// - Any `rs_*` export is missing
    pub fn load(path: &Path) -> Result<Self> {
        let library = unsafe { Library::new(path) }.map_err(|e| {
            RenderStreamError::LibraryLoad(format!("{}: {e}", path.display()))
        })?;

        let functions = unsafe { RenderStreamFunctions::resolve(&library) }?;

        tracing::debug!(
            path = %path.display(),
            symbols = RenderStreamFunctions::SYMBOLS.len(),
            "Bound RenderStream library"
        );

        Ok(Self {
            functions,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    pub fn functions(&self) -> &RenderStreamFunctions {
        &self.functions
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RenderStreamLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderStreamLibrary")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
