// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Forwarding of controller frame data to followers.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::core::error::Result;
use crate::core::frames::FrameData;

/// Publishes each frame the emitter receives to its followers.
///
/// Implementations own the transport between machines.
pub trait FrameDataRelay: Send {
    fn publish(&self, frame: &FrameData) -> Result<()>;
}

/// In-process fan-out of frame data to any number of followers.
#[derive(Debug, Clone, Default)]
pub struct FrameDataBus {
    subscribers: Arc<Mutex<Vec<Sender<FrameData>>>>,
}

impl FrameDataBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// New follower feed. Receives every frame published from now on.
    pub fn subscribe(&self) -> Receiver<FrameData> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(sender);
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl FrameDataRelay for FrameDataBus {
    fn publish(&self, frame: &FrameData) -> Result<()> {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|sender| sender.send(*frame).is_ok());
        if subscribers.len() != before {
            tracing::debug!(
                dropped = before - subscribers.len(),
                remaining = subscribers.len(),
                "Pruned disconnected frame data subscribers"
            );
        }
        Ok(())
    }
}
