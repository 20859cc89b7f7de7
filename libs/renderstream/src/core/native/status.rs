// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Result codes returned by the compositor library.

use std::fmt;

use renderstream_abi as abi;

use crate::core::error::{RenderStreamError, Result};
use crate::core::frames::FrameData;

/// Mirror of `RS_ERROR`.
///
/// Statuses are plain values so the frame loop can branch on quit, streams
/// changed and timeout without unwinding.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeStatus {
    Success = 0,
    NotInitialised = 1,
    AlreadyInitialised = 2,
    InvalidHandle = 3,
    MaxSendersReached = 4,
    BadStreamType = 5,
    NotFound = 6,
    IncorrectSchema = 7,
    InvalidParameters = 8,
    BufferOverflow = 9,
    Timeout = 10,
    StreamsChanged = 11,
    IncompatibleVersion = 12,
    FailedToGetDxDeviceFromResource = 13,
    FailedToInitialiseGpGpu = 14,
    Quit = 15,
    Unspecified = 16,
}

impl NativeStatus {
    /// Converts a raw `RS_ERROR`. Values outside the known range map to
    /// [`NativeStatus::Unspecified`].
    pub fn from_raw(raw: abi::RsError) -> Self {
        match raw {
            abi::RS_ERROR_SUCCESS => Self::Success,
            abi::RS_NOT_INITIALISED => Self::NotInitialised,
            abi::RS_ERROR_ALREADYINITIALISED => Self::AlreadyInitialised,
            abi::RS_ERROR_INVALIDHANDLE => Self::InvalidHandle,
            abi::RS_MAXSENDERSREACHED => Self::MaxSendersReached,
            abi::RS_ERROR_BADSTREAMTYPE => Self::BadStreamType,
            abi::RS_ERROR_NOTFOUND => Self::NotFound,
            abi::RS_ERROR_INCORRECTSCHEMA => Self::IncorrectSchema,
            abi::RS_ERROR_INVALID_PARAMETERS => Self::InvalidParameters,
            abi::RS_ERROR_BUFFER_OVERFLOW => Self::BufferOverflow,
            abi::RS_ERROR_TIMEOUT => Self::Timeout,
            abi::RS_ERROR_STREAMS_CHANGED => Self::StreamsChanged,
            abi::RS_ERROR_INCOMPATIBLE_VERSION => Self::IncompatibleVersion,
            abi::RS_ERROR_FAILED_TO_GET_DXDEVICE_FROM_RESOURCE => {
                Self::FailedToGetDxDeviceFromResource
            }
            abi::RS_ERROR_FAILED_TO_INITIALISE_GPGPU => Self::FailedToInitialiseGpGpu,
            abi::RS_ERROR_QUIT => Self::Quit,
            _ => Self::Unspecified,
        }
    }

    pub const fn as_raw(self) -> abi::RsError {
        self as abi::RsError
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Statuses that end RenderStream for this process.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::Quit
                | Self::IncompatibleVersion
                | Self::FailedToGetDxDeviceFromResource
                | Self::FailedToInitialiseGpGpu
        )
    }

    /// `Ok(())` on success, otherwise a [`RenderStreamError::Native`] naming
    /// the failed call.
    pub fn into_result(self, call: &'static str) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::NotInitialised => Err(RenderStreamError::NotInitialised),
            status => Err(RenderStreamError::Native { call, status }),
        }
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "RS_ERROR_SUCCESS",
            Self::NotInitialised => "RS_NOT_INITIALISED",
            Self::AlreadyInitialised => "RS_ERROR_ALREADYINITIALISED",
            Self::InvalidHandle => "RS_ERROR_INVALIDHANDLE",
            Self::MaxSendersReached => "RS_MAXSENDERSREACHED",
            Self::BadStreamType => "RS_ERROR_BADSTREAMTYPE",
            Self::NotFound => "RS_ERROR_NOTFOUND",
            Self::IncorrectSchema => "RS_ERROR_INCORRECTSCHEMA",
            Self::InvalidParameters => "RS_ERROR_INVALID_PARAMETERS",
            Self::BufferOverflow => "RS_ERROR_BUFFER_OVERFLOW",
            Self::Timeout => "RS_ERROR_TIMEOUT",
            Self::StreamsChanged => "RS_ERROR_STREAMS_CHANGED",
            Self::IncompatibleVersion => "RS_ERROR_INCOMPATIBLE_VERSION",
            Self::FailedToGetDxDeviceFromResource => {
                "RS_ERROR_FAILED_TO_GET_DXDEVICE_FROM_RESOURCE"
            }
            Self::FailedToInitialiseGpGpu => "RS_ERROR_FAILED_TO_INITIALISE_GPGPU",
            Self::Quit => "RS_ERROR_QUIT",
            Self::Unspecified => "RS_ERROR_UNSPECIFIED",
        };
        f.write_str(name)
    }
}

/// What one await (or follower acknowledgement) produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AwaitOutcome {
    /// New frame data is available for this cycle.
    Frame(FrameData),
    /// Nothing arrived within the timeout. Not an error; retry next frame.
    Timeout,
    /// The stream set changed; streams must be re-enumerated.
    StreamsChanged,
    /// The compositor asked this process to quit.
    Quit,
}

impl AwaitOutcome {
    /// Maps a native status and the frame it produced. Statuses other than
    /// the four per-frame signals are errors.
    pub fn from_status(call: &'static str, status: NativeStatus, frame: FrameData) -> Result<Self> {
        match status {
            NativeStatus::Success => Ok(Self::Frame(frame)),
            NativeStatus::Timeout => Ok(Self::Timeout),
            NativeStatus::StreamsChanged => Ok(Self::StreamsChanged),
            NativeStatus::Quit => Ok(Self::Quit),
            other => other.into_result(call).map(|()| Self::Timeout),
        }
    }
}
