// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::net::{IpAddr, Ipv4Addr};

use crate::core::error::{RenderStreamError, Result};

/// An IPv4 network adapter usable for negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAdapter {
    pub name: String,
    pub address: Ipv4Addr,
}

/// Picks the adapter to negotiate on from the host's interfaces.
pub fn select_adapter(preferred: Option<&str>) -> Result<NetworkAdapter> {
    let interfaces = local_ip_address::list_afinet_netifas().map_err(|e| {
        RenderStreamError::Negotiation(format!("Failed to list network adapters: {e}"))
    })?;
    choose_adapter(&interfaces, preferred)
}

/// The IPv4 adapter named `preferred`, else the first non-loopback IPv4
/// adapter.
pub fn choose_adapter(interfaces: &[(String, IpAddr)], preferred: Option<&str>) -> Result<NetworkAdapter> {
    let ipv4 = || {
        interfaces.iter().filter_map(|(name, address)| match address {
            IpAddr::V4(address) => Some(NetworkAdapter {
                name: name.clone(),
                address: *address,
            }),
            IpAddr::V6(_) => None,
        })
    };

    if let Some(preferred) = preferred {
        if let Some(adapter) = ipv4().find(|adapter| adapter.name == preferred) {
            return Ok(adapter);
        }
        tracing::warn!(adapter = preferred, "Network adapter not found, selecting automatically");
    }

    ipv4()
        .find(|adapter| !adapter.address.is_loopback())
        .ok_or_else(|| RenderStreamError::Negotiation("no usable IPv4 network adapter".to_string()))
}
