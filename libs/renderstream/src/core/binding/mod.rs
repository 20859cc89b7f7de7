// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Binding schema keys to engine fields and applying per-frame values.

mod apply;
pub mod math;
mod registry;
mod scene;
mod value;

pub use apply::{apply_numeric, apply_texts};
pub use registry::{
    ExposedParameters, ParameterRegistry, ParameterSlot, ResolvedField, SharedSlot, ValueSlot,
    shared_slot,
};
pub use scene::{ImageBinding, NumericBinding, SceneBindings, TextBinding, bind_scene};
pub use value::{FieldKind, ParameterBucket, ParameterValue, RemoteImage, TransformValue};
