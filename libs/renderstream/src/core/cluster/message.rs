// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Negotiation wire messages: UTF-8 `<prefix>:<address>-<pid>`.

use std::fmt;
use std::net::IpAddr;

/// Marks a node that is available to join a group.
pub const ANNOUNCE_PREFIX: &str = "8e310677-85cf-4c0c-8209-15890342c4e4";

/// Marks a node that has seen a complete group.
pub const READY_PREFIX: &str = "772c27a7-e38d-42a9-835c-158f05dc50e0";

/// Unique identity of one negotiating process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    pub address: IpAddr,
    pub pid: u32,
}

impl NodeIdentity {
    pub fn new(address: IpAddr, pid: u32) -> Self {
        Self { address, pid }
    }

    /// This process on `address`.
    pub fn current(address: IpAddr) -> Self {
        Self::new(address, std::process::id())
    }

    pub fn announce_message(&self) -> String {
        format!("{ANNOUNCE_PREFIX}:{self}")
    }

    pub fn ready_message(&self) -> String {
        format!("{READY_PREFIX}:{self}")
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.address, self.pid)
    }
}

/// A received negotiation message, holding its full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationMessage {
    Announce(String),
    Ready(String),
}

impl NegotiationMessage {
    /// `None` for payloads that are not UTF-8 or carry neither prefix.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(payload).ok()?;
        if text.starts_with(ANNOUNCE_PREFIX) {
            Some(Self::Announce(text.to_string()))
        } else if text.starts_with(READY_PREFIX) {
            Some(Self::Ready(text.to_string()))
        } else {
            None
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Announce(text) | Self::Ready(text) => text,
        }
    }

    /// Sender identity, when the body is well formed.
    pub fn identity(&self) -> Option<NodeIdentity> {
        let (_, body) = self.text().split_once(':')?;
        let (address, pid) = body.rsplit_once('-')?;
        Some(NodeIdentity::new(address.parse().ok()?, pid.parse().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_message_format() {
        let node = NodeIdentity::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)), 4242);
        assert_eq!(
            node.announce_message(),
            "8e310677-85cf-4c0c-8209-15890342c4e4:10.0.0.7-4242"
        );
        assert_eq!(
            node.ready_message(),
            "772c27a7-e38d-42a9-835c-158f05dc50e0:10.0.0.7-4242"
        );
    }

    #[test]
    fn test_parse() {
        let node = NodeIdentity::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9);
        let announce = NegotiationMessage::parse(node.announce_message().as_bytes()).unwrap();
        assert!(matches!(announce, NegotiationMessage::Announce(_)));
        assert_eq!(announce.identity(), Some(node.clone()));

        let ready = NegotiationMessage::parse(node.ready_message().as_bytes()).unwrap();
        assert!(matches!(ready, NegotiationMessage::Ready(_)));

        assert_eq!(NegotiationMessage::parse(b"hello"), None);
        assert_eq!(NegotiationMessage::parse(&[0xff, 0xfe]), None);
    }
}
