// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Frame protocol state machine types.

use serde::{Deserialize, Serialize};

use crate::core::frames::FrameData;

/// Lifecycle of a [`super::RenderStream`] session.
///
/// ```text
/// Uninitialized ──start()──► AwaitingStreams ──streams──► Idle
///                                   ▲                      │ tick()
///                                   │ streams changed      ▼
///                                   └──────────── Emitting | Following
///                                                          │
///                                                          ▼
///                                                        Idle
///
/// Any state ──quit──► Quit
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolState {
    #[default]
    Uninitialized,
    AwaitingStreams,
    Idle,
    /// Controller is inside a frame cycle.
    Emitting,
    /// Follower is inside a frame cycle.
    Following,
    /// Terminal. The compositor asked this process to quit.
    Quit,
}

impl ProtocolState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Quit)
    }

    /// Inside a frame cycle, between the await and the end of the frame.
    pub fn is_in_frame(&self) -> bool {
        matches!(self, Self::Emitting | Self::Following)
    }
}

/// How the active scene is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneControl {
    /// One merged scene. The compositor's scene index is ignored.
    Manual,
    /// The compositor selects the scene through `FrameData::scene`.
    #[default]
    Selection,
}

/// Whether this process drives frames or mirrors a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolRole {
    #[default]
    Controller,
    Follower,
}

/// Result of one [`super::RenderStream::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// New frame data; bindings for the scene have been applied.
    NewFrame(FrameData),
    /// Nothing arrived within the await timeout.
    NoFrame,
    /// Streams were re-enumerated. No parameters were applied.
    StreamsChanged,
    /// The compositor switched scenes. Processing is suppressed this frame.
    SceneChanged { from: u32, to: u32 },
    /// The frame named a scene the schema does not have and was dropped.
    Discarded { scene: u32 },
    Quit,
}

impl FrameOutcome {
    pub fn has_new_frame_data(&self) -> bool {
        matches!(self, Self::NewFrame(_))
    }
}
