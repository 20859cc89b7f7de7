// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Node ID negotiation for a cluster of render nodes.
//!
//! Every node announces itself on the multicast group until it has heard
//! `repeater_count + 1` distinct announcements, then also reports ready.
//! Negotiation completes once that many distinct nodes report ready. A
//! node's ID is the rank of its own announcement among all announcements,
//! so every node derives the same ordering independently.

use std::collections::{BTreeSet, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::config::ClusterConfig;
use crate::core::error::{RenderStreamError, Result};

use super::interface::{NetworkAdapter, select_adapter};
use super::message::{NegotiationMessage, NodeIdentity};
use super::transport::MulticastTransport;
use super::udp::UdpMulticastTransport;

/// Part a node plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterRole {
    /// Node 0. Drives frames and relays frame data to repeaters.
    Emitter,
    /// Follows frame data relayed by the emitter.
    Repeater,
    /// Cluster mode disabled.
    Standalone,
}

/// Outcome of cluster negotiation for this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeAssignment {
    pub node_id: u8,
    pub role: ClusterRole,
    pub repeater_count: u32,
    /// Adapter negotiated on. `None` when standalone.
    pub adapter: Option<String>,
}

impl NodeAssignment {
    pub fn standalone() -> Self {
        Self {
            node_id: 0,
            role: ClusterRole::Standalone,
            repeater_count: 0,
            adapter: None,
        }
    }

    fn from_node_id(node_id: u8, repeater_count: u32, adapter: &NetworkAdapter) -> Self {
        Self {
            node_id,
            role: if node_id == 0 {
                ClusterRole::Emitter
            } else {
                ClusterRole::Repeater
            },
            repeater_count,
            adapter: Some(adapter.name.clone()),
        }
    }

    pub fn is_cluster(&self) -> bool {
        self.role != ClusterRole::Standalone
    }
}

/// Timing of one negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationTiming {
    pub announce_interval: Duration,
    pub handshake_timeout: Duration,
}

impl From<&ClusterConfig> for NegotiationTiming {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            announce_interval: config.announce_interval(),
            handshake_timeout: config.handshake_timeout(),
        }
    }
}

/// Negotiates this node's ID over `transport`.
///
/// Fails with [`RenderStreamError::NegotiationTimeout`] when the group does
/// not complete within the handshake timeout, and with
/// [`RenderStreamError::NegotiationAggregate`] when the tasks fail.
pub async fn negotiate_node_id(
    transport: Arc<dyn MulticastTransport>,
    identity: &NodeIdentity,
    repeater_count: u32,
    timing: NegotiationTiming,
) -> Result<u8> {
    let expected = repeater_count as usize + 1;
    let announce = identity.announce_message();
    let ready = identity.ready_message();
    let found_group = Arc::new(AtomicBool::new(false));
    let token = CancellationToken::new();

    tracing::info!(%identity, repeaters = repeater_count, "Negotiating node ID");

    let mut listen = tokio::spawn(listen_for_group(
        Arc::clone(&transport),
        expected,
        Arc::clone(&found_group),
        token.clone(),
    ));
    let broadcast = tokio::spawn(announce_presence(
        Arc::clone(&transport),
        announce.clone(),
        ready,
        timing.announce_interval,
        found_group,
        token.clone(),
    ));

    let listened = tokio::time::timeout(timing.handshake_timeout, &mut listen).await;
    token.cancel();

    let mut errors = Vec::new();
    match broadcast.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => errors.push(format!("announce: {e}")),
        Err(e) => errors.push(format!("announce task: {e}")),
    }

    let announcements = match listened {
        Err(_) => {
            // The listener observes the cancelled token and exits.
            if tokio::time::timeout(timing.handshake_timeout, listen).await.is_err() {
                tracing::warn!("Negotiation listener did not stop after cancellation");
            }
            for error in &errors {
                tracing::warn!(error = %error, "Negotiation task failed");
            }
            return Err(RenderStreamError::NegotiationTimeout(timing.handshake_timeout));
        }
        Ok(Ok(Ok(Some(announcements)))) => announcements,
        Ok(Ok(Ok(None))) => {
            errors.push("listen: cancelled before the group completed".to_string());
            BTreeSet::new()
        }
        Ok(Ok(Err(e))) => {
            errors.push(format!("listen: {e}"));
            BTreeSet::new()
        }
        Ok(Err(e)) => {
            errors.push(format!("listen task: {e}"));
            BTreeSet::new()
        }
    };

    if announcements.is_empty() {
        for error in &errors {
            tracing::error!(error = %error, "Negotiation task failed");
        }
        return Err(RenderStreamError::NegotiationAggregate(errors));
    }
    for error in &errors {
        tracing::warn!(error = %error, "Negotiation task failed after the group completed");
    }

    let rank = announcements
        .iter()
        .position(|message| *message == announce)
        .ok_or_else(|| {
            RenderStreamError::Negotiation("own announcement was never received".to_string())
        })?;
    let node_id = u8::try_from(rank)
        .map_err(|_| RenderStreamError::Negotiation(format!("node rank {rank} exceeds 255")))?;
    tracing::info!(node_id, nodes = announcements.len(), "Negotiated node ID");
    Ok(node_id)
}

/// Collects announcements until `expected` distinct nodes report ready.
/// Returns `None` if cancelled first.
async fn listen_for_group(
    transport: Arc<dyn MulticastTransport>,
    expected: usize,
    found_group: Arc<AtomicBool>,
    token: CancellationToken,
) -> Result<Option<BTreeSet<String>>> {
    let mut announcements = BTreeSet::new();
    let mut ready_reports = HashSet::new();
    loop {
        let payload = tokio::select! {
            _ = token.cancelled() => return Ok(None),
            received = transport.recv() => received?,
        };
        let Some(message) = NegotiationMessage::parse(&payload) else {
            tracing::trace!(len = payload.len(), "Ignoring unrelated datagram");
            continue;
        };
        tracing::debug!(message = message.text(), "Received negotiation message");

        match message {
            NegotiationMessage::Announce(text) => {
                if announcements.insert(text)
                    && announcements.len() >= expected
                    && !found_group.swap(true, Ordering::AcqRel)
                {
                    tracing::info!(nodes = announcements.len(), "Found group");
                }
            }
            NegotiationMessage::Ready(text) => {
                if ready_reports.insert(text) && ready_reports.len() >= expected {
                    tracing::info!("All {} nodes reported ready", expected);
                    return Ok(Some(announcements));
                }
            }
        }
    }
}

/// Announces until cancelled, adding a ready report once the group is found.
async fn announce_presence(
    transport: Arc<dyn MulticastTransport>,
    announce: String,
    ready: String,
    interval: Duration,
    found_group: Arc<AtomicBool>,
    token: CancellationToken,
) -> Result<()> {
    loop {
        if token.is_cancelled() {
            return Ok(());
        }
        transport.send(announce.as_bytes()).await?;
        if found_group.load(Ordering::Acquire) {
            tracing::trace!("Reporting ready");
            transport.send(ready.as_bytes()).await?;
        }
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Negotiates over UDP multicast on the configured adapter.
pub async fn negotiate(config: &ClusterConfig) -> Result<NodeAssignment> {
    if !config.is_enabled() {
        return Err(RenderStreamError::Configuration(
            "no repeater nodes specified".to_string(),
        ));
    }
    let adapter = select_adapter(config.adapter.as_deref())?;
    let transport = UdpMulticastTransport::bind(config.group, config.port, adapter.address)?;
    let identity = NodeIdentity::current(IpAddr::V4(adapter.address));
    let node_id = negotiate_node_id(
        Arc::new(transport),
        &identity,
        config.repeater_count,
        NegotiationTiming::from(config),
    )
    .await?;

    let assignment = NodeAssignment::from_node_id(node_id, config.repeater_count, &adapter);
    tracing::info!(
        node_id,
        role = ?assignment.role,
        adapter = %adapter.name,
        repeaters = config.repeater_count,
        "Auto-assigned node ID"
    );
    Ok(assignment)
}

/// Like [`negotiate`], but any failure leaves this node standalone.
pub async fn negotiate_or_standalone(config: &ClusterConfig) -> NodeAssignment {
    if !config.is_enabled() {
        tracing::warn!("There are no repeater nodes specified");
        return NodeAssignment::standalone();
    }
    match negotiate(config).await {
        Ok(assignment) => assignment,
        Err(e) => {
            tracing::error!(error = %e, "Cluster negotiation failed, disabling cluster mode");
            NodeAssignment::standalone()
        }
    }
}
