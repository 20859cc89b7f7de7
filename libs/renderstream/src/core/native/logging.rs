// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Log plumbing between the compositor library and `tracing`.
//!
//! Native messages arrive through the three logger callbacks and are
//! re-emitted under [`NATIVE_TARGET`]. In the other direction,
//! [`CompositorLogLayer`] forwards warnings and errors to `rs_logToD3` so
//! they show up in the compositor's console.

use std::ffi::{CString, c_char};
use std::fmt::{self, Write as _};
use std::sync::Arc;

use parking_lot::RwLock;
use renderstream_abi as abi;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::core::frames::string_from_ptr;

pub const NATIVE_TARGET: &str = "renderstream::native";

pub const ERROR_PREFIX: &str = "!!!!! ";
pub const WARNING_PREFIX: &str = "!!! ";

pub(crate) unsafe extern "C" fn log_info(message: *const c_char) {
    let message = unsafe { string_from_ptr(message) };
    tracing::info!(target: NATIVE_TARGET, "{}", message.trim_end());
}

pub(crate) unsafe extern "C" fn log_error(message: *const c_char) {
    let message = unsafe { string_from_ptr(message) };
    tracing::error!(target: NATIVE_TARGET, "{}", message.trim_end());
}

pub(crate) unsafe extern "C" fn log_verbose(message: *const c_char) {
    let message = unsafe { string_from_ptr(message) };
    tracing::debug!(target: NATIVE_TARGET, "{}", message.trim_end());
}

/// Shared slot holding `rs_logToD3` while the library is loaded.
///
/// Cleared on shutdown so a layer that outlives the binding stops forwarding.
#[derive(Clone, Default)]
pub struct CompositorLogSink {
    target: Arc<RwLock<Option<abi::RsLogToD3Fn>>>,
}

impl CompositorLogSink {
    pub fn new(log_to_d3: Option<abi::RsLogToD3Fn>) -> Self {
        Self {
            target: Arc::new(RwLock::new(log_to_d3)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.target.read().is_some()
    }

    pub fn disconnect(&self) {
        *self.target.write() = None;
    }

    /// Sends `message` to the compositor. Messages with interior nul bytes
    /// are truncated at the first one.
    pub fn forward(&self, message: &str) {
        let guard = self.target.read();
        let Some(log_to_d3) = *guard else {
            return;
        };
        let message = match CString::new(message) {
            Ok(message) => message,
            Err(e) => {
                let end = e.nul_position();
                CString::new(&message[..end]).unwrap_or_default()
            }
        };
        unsafe { log_to_d3(message.as_ptr()) };
    }
}

impl fmt::Debug for CompositorLogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositorLogSink")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Prefixed compositor message for `level`, or `None` below WARN.
pub fn compositor_message(level: Level, message: &str) -> Option<String> {
    let prefix = match level {
        Level::ERROR => ERROR_PREFIX,
        Level::WARN => WARNING_PREFIX,
        _ => return None,
    };
    Some(format!("{prefix}{message}"))
}

/// `tracing` layer forwarding WARN and ERROR events to the compositor.
///
/// Events under [`NATIVE_TARGET`] came from the compositor in the first place
/// and are not echoed back.
pub struct CompositorLogLayer {
    sink: CompositorLogSink,
}

impl CompositorLogLayer {
    pub fn new(sink: CompositorLogSink) -> Self {
        Self { sink }
    }
}

impl<S: Subscriber> Layer<S> for CompositorLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(NATIVE_TARGET) {
            return;
        }
        if *metadata.level() > Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if let Some(message) = compositor_message(*metadata.level(), &visitor.finish()) {
            self.sink.forward(&message);
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
