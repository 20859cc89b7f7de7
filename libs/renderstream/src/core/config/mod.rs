// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Session configuration.

mod renderstream_config;

pub use renderstream_config::{
    ClusterConfig, LibraryConfig, PoolConfig, ProtocolConfig, RenderStreamConfig, TexturesConfig,
    followers_from_args,
};
