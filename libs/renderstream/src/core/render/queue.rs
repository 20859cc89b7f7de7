// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::core::error::{RenderStreamError, Result};
use crate::core::native::NativeStatus;

use super::commands::RenderCommand;

/// Where pooled render commands are executed.
///
/// Engines with their own render thread implement this over their plugin
/// event mechanism; [`ThreadedRenderQueue`] and [`ImmediateRenderQueue`] cover
/// hosts without one.
pub trait RenderCommandQueue {
    fn submit(&self, command: RenderCommand) -> Result<()>;

    /// Blocks until every command submitted so far has executed.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Executes commands on the submitting thread.
#[derive(Debug, Default)]
pub struct ImmediateRenderQueue;

impl RenderCommandQueue for ImmediateRenderQueue {
    fn submit(&self, command: RenderCommand) -> Result<()> {
        let status = command.execute();
        if !status.is_success() {
            tracing::warn!(event = ?command.event(), %status, "Render command failed");
        }
        Ok(())
    }
}

enum Message {
    Execute(RenderCommand),
    Flush(Sender<()>),
}

/// Executes commands in order on a dedicated worker thread.
pub struct ThreadedRenderQueue {
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
    executed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl ThreadedRenderQueue {
    pub fn spawn(name: &str) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let executed = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let worker = {
            let executed = Arc::clone(&executed);
            let failed = Arc::clone(&failed);
            std::thread::Builder::new()
                .name(name.to_string())
                .spawn(move || run_worker(receiver, executed, failed))?
        };
        tracing::debug!(thread = name, "Started render command worker");

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            executed,
            failed,
        })
    }

    /// Commands executed so far, including failed ones.
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    fn send(&self, message: Message) -> Result<()> {
        self.sender
            .as_ref()
            .ok_or_else(|| RenderStreamError::Other(anyhow::anyhow!("render queue is shut down")))?
            .send(message)
            .map_err(|_| RenderStreamError::Other(anyhow::anyhow!("render worker exited")))
    }
}

fn run_worker(receiver: Receiver<Message>, executed: Arc<AtomicU64>, failed: Arc<AtomicU64>) {
    for message in receiver {
        match message {
            Message::Execute(command) => {
                let status = command.execute();
                if status != NativeStatus::Success {
                    failed.fetch_add(1, Ordering::AcqRel);
                    tracing::warn!(event = ?command.event(), %status, "Render command failed");
                }
                executed.fetch_add(1, Ordering::AcqRel);
            }
            Message::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

impl RenderCommandQueue for ThreadedRenderQueue {
    fn submit(&self, command: RenderCommand) -> Result<()> {
        self.send(Message::Execute(command))
    }

    fn flush(&self) -> Result<()> {
        let (done, wait) = crossbeam_channel::bounded(1);
        self.send(Message::Flush(done))?;
        wait.recv()
            .map_err(|_| RenderStreamError::Other(anyhow::anyhow!("render worker exited")))
    }
}

impl Drop for ThreadedRenderQueue {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Render command worker panicked");
            }
        }
    }
}
