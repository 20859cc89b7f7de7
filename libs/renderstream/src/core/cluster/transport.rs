// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use crate::core::error::{RenderStreamError, Result};

/// Datagram transport shared by every node in a multicast group.
///
/// A node receives its own messages as well as everyone else's.
#[async_trait]
pub trait MulticastTransport: Send + Sync {
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// Next datagram from the group.
    async fn recv(&self) -> Result<Vec<u8>>;
}

const LOOPBACK_CAPACITY: usize = 1024;

/// In-process multicast group.
#[derive(Debug, Clone)]
pub struct LoopbackHub {
    sender: broadcast::Sender<Vec<u8>>,
}

impl Default for LoopbackHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LOOPBACK_CAPACITY);
        Self { sender }
    }

    /// A transport that sees everything sent to the hub from now on.
    pub fn join(&self) -> LoopbackTransport {
        LoopbackTransport {
            sender: self.sender.clone(),
            receiver: Mutex::new(self.sender.subscribe()),
        }
    }
}

pub struct LoopbackTransport {
    sender: broadcast::Sender<Vec<u8>>,
    receiver: Mutex<broadcast::Receiver<Vec<u8>>>,
}

#[async_trait]
impl MulticastTransport for LoopbackTransport {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        // Every transport holds a receiver, so there is always one subscriber.
        let _ = self.sender.send(payload.to_vec());
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>> {
        let mut receiver = self.receiver.lock().await;
        loop {
            match receiver.recv().await {
                Ok(payload) => return Ok(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Loopback transport lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(RenderStreamError::Negotiation("loopback hub closed".to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loopback_delivers_to_sender_and_peers() {
        let hub = LoopbackHub::new();
        let a = hub.join();
        let b = hub.join();
        a.send(b"ping").await.unwrap();
        assert_eq!(a.recv().await.unwrap(), b"ping");
        assert_eq!(b.recv().await.unwrap(), b"ping");
    }
}
