// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod event_data_pool;

pub use event_data_pool::{
    DEFAULT_FRAMES_TO_KEEP_ALIVE, EVENT_DATA_POOL_CAPACITY, EventDataPool, EventDataPoolStats,
};
