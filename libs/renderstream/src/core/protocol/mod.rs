// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Frame exchange protocol for controllers and followers.

mod relay;
mod sender;
mod session;
mod state;
mod streams;

pub use relay::{FrameDataBus, FrameDataRelay};
pub use sender::{FrameSender, SendResult};
pub use session::RenderStream;
pub use state::{FrameOutcome, ProtocolRole, ProtocolState, SceneControl};
pub use streams::wait_for_streams;
