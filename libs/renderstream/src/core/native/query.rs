// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Query-then-fetch for native calls that fill a caller-sized buffer.
//!
//! The first call passes a null buffer so the library reports the size it
//! needs. The buffer is then resized to that size until the call succeeds or
//! the attempt budget runs out.

use std::ffi::c_void;
use std::ptr;

use crate::core::error::{RenderStreamError, Result};

use super::status::NativeStatus;

/// Total native calls made for one query, the sizing call included.
pub const MAX_QUERY_ATTEMPTS: usize = 3;

/// Zeroed, 8-byte aligned scratch memory for one native response.
///
/// Backed by `u64` words so the packed structures at its head can be read in
/// place.
#[derive(Debug, Default)]
pub struct NativeBuffer {
    words: Vec<u64>,
    len: usize,
}

impl NativeBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(8)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        if self.is_empty() {
            ptr::null_mut()
        } else {
            self.words.as_mut_ptr().cast()
        }
    }

    /// Reads the structure at the start of the buffer.
    ///
    /// # Safety
    /// The bytes must hold a valid `T`, and every pointer inside it must
    /// remain valid while the returned reference is used.
    pub unsafe fn header<T: Copy>(&self) -> Option<&T> {
        if self.len < size_of::<T>() || align_of::<T>() > align_of::<u64>() {
            return None;
        }
        Some(unsafe { &*self.words.as_ptr().cast::<T>() })
    }

    fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }
}

/// Runs `native` until it succeeds, resizing the buffer each time it reports
/// `RS_ERROR_BUFFER_OVERFLOW`.
///
/// `native` receives the buffer pointer (null while the size is unknown) and
/// an in/out byte count. Statuses other than success and overflow are
/// returned as errors without retrying.
pub fn query_then_fetch<F>(call: &'static str, mut native: F) -> Result<NativeBuffer>
where
    F: FnMut(*mut c_void, &mut u32) -> NativeStatus,
{
    let mut buffer = NativeBuffer::default();
    let mut n_bytes = 0u32;

    for attempt in 1..=MAX_QUERY_ATTEMPTS {
        match native(buffer.as_mut_ptr(), &mut n_bytes) {
            NativeStatus::BufferOverflow => {
                tracing::trace!(call, attempt, n_bytes, "native buffer too small, resizing");
                buffer = NativeBuffer::zeroed(n_bytes as usize);
            }
            status => {
                status.into_result(call)?;
                buffer.truncate(n_bytes as usize);
                return Ok(buffer);
            }
        }
    }

    Err(RenderStreamError::BufferOverflow {
        call,
        attempts: MAX_QUERY_ATTEMPTS,
    })
}
