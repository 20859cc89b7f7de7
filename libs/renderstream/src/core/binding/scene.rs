// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use crate::core::schema::{ManagedRemoteParameter, ManagedRemoteParameters, RemoteParameterType};

use super::registry::{ParameterRegistry, ResolvedField, SharedSlot};
use super::value::{FieldKind, ParameterBucket};

/// Field fed from `slot_count` consecutive slots of the numeric buffer.
#[derive(Clone)]
pub struct NumericBinding {
    pub key: String,
    pub kind: FieldKind,
    pub slot: SharedSlot,
    pub slot_offset: usize,
    pub slot_count: usize,
}

/// Field fed from the `text_index`-th TEXT parameter.
#[derive(Clone)]
pub struct TextBinding {
    pub key: String,
    pub kind: FieldKind,
    pub slot: SharedSlot,
    pub text_index: u32,
}

/// Field fed from the `image_index`-th IMAGE parameter.
#[derive(Clone)]
pub struct ImageBinding {
    pub key: String,
    pub slot: SharedSlot,
    pub image_index: usize,
}

/// Resolved fields of one scene, split by how their values arrive.
#[derive(Clone, Default)]
pub struct SceneBindings {
    pub scene_name: String,
    pub schema_hash: u64,
    pub numeric: Vec<NumericBinding>,
    pub texts: Vec<TextBinding>,
    pub images: Vec<ImageBinding>,
    /// Keys no registered field matched. Their slots are still counted.
    pub unresolved: Vec<String>,
    /// Length of the numeric buffer for this scene.
    pub numeric_slot_count: usize,
    /// IMAGE parameters in the scene, bound or not.
    pub image_count: usize,
}

impl SceneBindings {
    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.texts.is_empty() && self.images.is_empty()
    }
}

impl std::fmt::Debug for SceneBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneBindings")
            .field("scene_name", &self.scene_name)
            .field("schema_hash", &self.schema_hash)
            .field("numeric", &self.numeric.len())
            .field("texts", &self.texts.len())
            .field("images", &self.images.len())
            .field("unresolved", &self.unresolved)
            .finish()
    }
}

/// Matches every parameter of `scene` against `registry`.
///
/// Consecutive NUMBER parameters `<base>_x`, `<base>_y`, ... bind one
/// composite field when the registered field has exactly those components.
/// Unresolved keys are logged and recorded; they never shift the slot
/// offsets of later fields.
pub fn bind_scene(scene: &ManagedRemoteParameters, registry: &ParameterRegistry) -> SceneBindings {
    let params = &scene.parameters;
    let mut bindings = SceneBindings {
        scene_name: scene.name.clone(),
        schema_hash: scene.hash,
        numeric_slot_count: scene.numeric_slot_count(),
        image_count: scene.count_of(RemoteParameterType::Image),
        ..SceneBindings::default()
    };

    let mut offset = 0;
    let mut text_index = 0u32;
    let mut image_index = 0usize;
    let mut j = 0;

    while j < params.len() {
        let parameter = &params[j];
        let resolved = registry.resolve(&parameter.key);

        match parameter.parameter_type {
            RemoteParameterType::Text => {
                match resolved {
                    Some(field) if field.suffix.is_none() && field.kind.bucket() == ParameterBucket::Text => {
                        bindings.texts.push(TextBinding {
                            key: parameter.key.clone(),
                            kind: field.kind,
                            slot: field.slot,
                            text_index,
                        });
                    }
                    _ => unresolved(&mut bindings, scene, parameter),
                }
                text_index += 1;
                j += 1;
            }
            RemoteParameterType::Image => {
                match resolved {
                    Some(field) if field.suffix.is_none() && field.kind == FieldKind::Image => {
                        bindings.images.push(ImageBinding {
                            key: parameter.key.clone(),
                            slot: field.slot,
                            image_index,
                        });
                    }
                    _ => unresolved(&mut bindings, scene, parameter),
                }
                image_index += 1;
                j += 1;
            }
            RemoteParameterType::Pose | RemoteParameterType::Transform => {
                let slots = parameter.numeric_slots();
                match resolved {
                    Some(field) if field.suffix.is_none() && field.kind == FieldKind::Transform => {
                        bindings.numeric.push(NumericBinding {
                            key: parameter.key.clone(),
                            kind: field.kind,
                            slot: field.slot,
                            slot_offset: offset,
                            slot_count: slots,
                        });
                    }
                    _ => unresolved(&mut bindings, scene, parameter),
                }
                offset += slots;
                j += 1;
            }
            RemoteParameterType::Number => {
                let consumed = resolved.as_ref().and_then(|field| match field.suffix {
                    Some(_) => composite_run(params, j, field),
                    None if field.kind.bucket() == ParameterBucket::Numeric
                        && field.kind.numeric_slots() == 1 =>
                    {
                        Some(1)
                    }
                    None => None,
                });

                match (consumed, resolved) {
                    (Some(count), Some(field)) => {
                        bindings.numeric.push(NumericBinding {
                            key: field.base_key,
                            kind: field.kind,
                            slot: Arc::clone(&field.slot),
                            slot_offset: offset,
                            slot_count: count,
                        });
                        offset += count;
                        j += count;
                    }
                    _ => {
                        unresolved(&mut bindings, scene, parameter);
                        offset += 1;
                        j += 1;
                    }
                }
            }
        }
    }

    tracing::debug!(
        scene = %bindings.scene_name,
        numeric = bindings.numeric.len(),
        texts = bindings.texts.len(),
        images = bindings.images.len(),
        unresolved = bindings.unresolved.len(),
        "Bound scene parameters"
    );
    bindings
}

/// Number of parameters a composite field consumes starting at `start`, or
/// `None` if the run of component keys is incomplete.
fn composite_run(
    params: &[ManagedRemoteParameter],
    start: usize,
    field: &ResolvedField,
) -> Option<usize> {
    let suffixes = field.kind.composite_suffixes();
    if field.suffix != suffixes.first().copied() {
        return None;
    }
    for (i, suffix) in suffixes.iter().enumerate().skip(1) {
        let next = params.get(start + i)?;
        if next.parameter_type != RemoteParameterType::Number
            || next.key != format!("{}_{}", field.base_key, suffix)
        {
            return None;
        }
    }
    Some(suffixes.len())
}

fn unresolved(
    bindings: &mut SceneBindings,
    scene: &ManagedRemoteParameters,
    parameter: &ManagedRemoteParameter,
) {
    tracing::warn!(scene = %scene.name, key = %parameter.key, "Unhandled remote parameter");
    bindings.unresolved.push(parameter.key.clone());
}
