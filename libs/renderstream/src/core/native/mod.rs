// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Binding to the compositor's native `d3renderstream` library.

mod api;
mod binding;
mod graphics;
mod library;
pub mod locate;
pub mod logging;
mod query;
mod scripted;
mod status;

pub use api::RenderStreamApi;
pub use binding::NativeBinding;
pub use graphics::{Dx12SharedHeapFlag, GraphicsBackend};
pub use library::{RenderStreamFunctions, RenderStreamLibrary};
pub use logging::{CompositorLogLayer, CompositorLogSink};
pub use query::{MAX_QUERY_ATTEMPTS, NativeBuffer, query_then_fetch};
pub use scripted::{ApiCall, ScriptedApi, SentFrame, sent_frames, sent_frames_for};
pub use status::{AwaitOutcome, NativeStatus};
