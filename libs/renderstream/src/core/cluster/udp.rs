// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::core::error::Result;

use super::transport::MulticastTransport;

/// Largest negotiation datagram accepted.
const MAX_DATAGRAM: usize = 1024;

/// IPv4 multicast over UDP on one network adapter.
#[derive(Debug)]
pub struct UdpMulticastTransport {
    socket: UdpSocket,
    destination: SocketAddrV4,
}

impl UdpMulticastTransport {
    /// Joins `group:port` on the adapter with address `adapter`. Loopback is
    /// enabled so the node receives its own messages, and the TTL is 1.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(group: Ipv4Addr, port: u16, adapter: Ipv4Addr) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;

        // Windows only delivers multicast to a socket bound to the adapter;
        // elsewhere binding to the adapter address filters the group out.
        let bind_address = if cfg!(windows) {
            SocketAddrV4::new(adapter, port)
        } else {
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)
        };
        socket.bind(&SocketAddr::V4(bind_address).into())?;
        socket.join_multicast_v4(&group, &adapter)?;
        socket.set_multicast_if_v4(&adapter)?;
        socket.set_multicast_loop_v4(true)?;
        socket.set_multicast_ttl_v4(1)?;
        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket.into())?;
        tracing::debug!(%group, port, %adapter, "Joined negotiation multicast group");
        Ok(Self {
            socket,
            destination: SocketAddrV4::new(group, port),
        })
    }

    pub fn destination(&self) -> SocketAddrV4 {
        self.destination
    }
}

#[async_trait]
impl MulticastTransport for UdpMulticastTransport {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        self.socket.send_to(payload, self.destination).await?;
        Ok(())
    }

    async fn recv(&self) -> Result<Vec<u8>> {
        let mut buffer = [0u8; MAX_DATAGRAM];
        let (len, _) = self.socket.recv_from(&mut buffer).await?;
        Ok(buffer[..len].to_vec())
    }
}
