// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Remote parameter schema and its native layout.

mod marshal;
mod model;

pub use marshal::{SchemaLayout, read_schema};
pub use model::{
    DmxType, ManagedRemoteParameter, ManagedRemoteParameters, ManagedSchema, ParameterDefault,
    RemoteParameterFlags, RemoteParameterType,
};
