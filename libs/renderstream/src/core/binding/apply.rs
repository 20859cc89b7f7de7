// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-frame application of received values to bound fields.

use crate::core::error::{RenderStreamError, Result};

use super::scene::SceneBindings;
use super::value::ParameterValue;

/// Writes the flat numeric buffer into every numeric binding.
///
/// Returns the number of fields updated. A field that refuses its value is
/// logged and skipped.
pub fn apply_numeric(bindings: &SceneBindings, values: &[f32]) -> Result<usize> {
    if values.len() < bindings.numeric_slot_count {
        return Err(RenderStreamError::Binding(format!(
            "scene '{}' needs {} numeric values, got {}",
            bindings.scene_name,
            bindings.numeric_slot_count,
            values.len()
        )));
    }

    let mut applied = 0;
    for binding in &bindings.numeric {
        let end = binding.slot_offset + binding.slot_count;
        let Some(value) = values
            .get(binding.slot_offset..end)
            .and_then(|slots| binding.kind.decode(slots))
        else {
            tracing::debug!(key = %binding.key, "No value decoded for numeric field");
            continue;
        };
        match binding.slot.lock().set(value) {
            Ok(()) => applied += 1,
            Err(e) => tracing::warn!(key = %binding.key, error = %e, "Failed to set parameter"),
        }
    }
    Ok(applied)
}

/// Fetches and applies every text binding. `fetch` receives the TEXT
/// parameter index. Failed fetches leave the field unchanged.
pub fn apply_texts<F>(bindings: &SceneBindings, mut fetch: F) -> usize
where
    F: FnMut(u32) -> Result<String>,
{
    let mut applied = 0;
    for binding in &bindings.texts {
        let text = match fetch(binding.text_index) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(key = %binding.key, error = %e, "Failed to get frame text");
                continue;
            }
        };
        let Some(value) = ParameterValue::from_text(binding.kind, &text) else {
            continue;
        };
        match binding.slot.lock().set(value) {
            Ok(()) => applied += 1,
            Err(e) => tracing::warn!(key = %binding.key, error = %e, "Failed to set parameter"),
        }
    }
    applied
}
