// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Cluster node negotiation over UDP multicast.

mod interface;
mod message;
mod negotiation;
mod transport;
mod udp;

pub use interface::{NetworkAdapter, choose_adapter, select_adapter};
pub use message::{ANNOUNCE_PREFIX, NegotiationMessage, NodeIdentity, READY_PREFIX};
pub use negotiation::{
    ClusterRole, NegotiationTiming, NodeAssignment, negotiate, negotiate_node_id,
    negotiate_or_standalone,
};
pub use transport::{LoopbackHub, LoopbackTransport, MulticastTransport};
pub use udp::UdpMulticastTransport;
