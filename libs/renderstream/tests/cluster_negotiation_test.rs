// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Node ID negotiation between several nodes sharing one in-process group.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use renderstream::RenderStreamError;
use renderstream::core::cluster::{
    LoopbackHub, MulticastTransport, NegotiationTiming, NodeIdentity, negotiate_node_id,
};

fn timing(timeout: Duration) -> NegotiationTiming {
    NegotiationTiming {
        announce_interval: Duration::from_millis(10),
        handshake_timeout: timeout,
    }
}

fn identity(host: u8, pid: u32) -> NodeIdentity {
    NodeIdentity::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, host)), pid)
}

async fn run_group(
    hub: &LoopbackHub,
    nodes: &[NodeIdentity],
    repeaters: u32,
    timeout: Duration,
) -> Vec<Result<u8, RenderStreamError>> {
    // Join every node before any of them starts announcing.
    let transports: Vec<Arc<dyn MulticastTransport>> =
        nodes.iter().map(|_| Arc::new(hub.join()) as Arc<dyn MulticastTransport>).collect();

    let tasks: Vec<_> = nodes
        .iter()
        .cloned()
        .zip(transports)
        .map(|(node, transport)| {
            tokio::spawn(async move {
                negotiate_node_id(transport, &node, repeaters, timing(timeout)).await
            })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.expect("negotiation task panicked"));
    }
    results
}

#[tokio::test]
async fn test_three_nodes_agree_on_distinct_ids() {
    let hub = LoopbackHub::new();
    let nodes = [identity(3, 400), identity(1, 900), identity(2, 100)];
    let results = run_group(&hub, &nodes, 2, Duration::from_secs(5)).await;

    let mut ids: Vec<u8> = results.into_iter().map(|r| r.unwrap()).collect();
    // Ordering follows the announcement text, so 10.0.0.1 ranks first.
    assert_eq!(ids, vec![2, 0, 1]);
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_same_host_nodes_are_told_apart_by_pid() {
    let hub = LoopbackHub::new();
    let nodes = [identity(7, 2002), identity(7, 2001)];
    let results = run_group(&hub, &nodes, 1, Duration::from_secs(5)).await;
    let ids: Vec<u8> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(ids.iter().filter(|id| **id == 0).count(), 1);
    assert_eq!(ids, vec![1, 0]);
}

#[tokio::test]
async fn test_missing_node_times_out_everywhere() {
    let hub = LoopbackHub::new();
    // Two nodes present, but each expects a third.
    let nodes = [identity(1, 10), identity(2, 20)];
    let results = run_group(&hub, &nodes, 2, Duration::from_millis(200)).await;
    assert_eq!(results.len(), 2);
    for result in results {
        assert!(matches!(result, Err(RenderStreamError::NegotiationTimeout(_))));
    }
}

#[tokio::test]
async fn test_unrelated_traffic_is_ignored() {
    let hub = LoopbackHub::new();
    let noise = hub.join();
    let chatter = tokio::spawn(async move {
        for _ in 0..20 {
            noise.send(b"hello from another application").await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });
    let nodes = [identity(4, 1), identity(5, 1)];
    let results = run_group(&hub, &nodes, 1, Duration::from_secs(5)).await;
    chatter.await.unwrap();
    let ids: Vec<u8> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(ids, vec![0, 1]);
}
