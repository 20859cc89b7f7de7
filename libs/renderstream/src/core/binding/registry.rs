// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Explicit registration of engine fields the compositor can drive.
//!
//! A schema key is `"{prefix} {field_path}"`, with `_{suffix}` appended for
//! each component of a composite field.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::error::{RenderStreamError, Result};
use crate::core::schema::{ManagedRemoteParameter, RemoteParameterType};

use super::value::{FieldKind, ParameterValue};

/// A settable engine field.
pub trait ParameterSlot: Send {
    fn kind(&self) -> FieldKind;

    fn get(&self) -> ParameterValue;

    /// Stores `value`. Values of another kind are rejected.
    fn set(&mut self, value: ParameterValue) -> Result<()>;
}

pub type SharedSlot = Arc<Mutex<dyn ParameterSlot>>;

/// Wraps a slot for registration.
pub fn shared_slot<S: ParameterSlot + 'static>(slot: S) -> SharedSlot {
    Arc::new(Mutex::new(slot))
}

/// Slot that simply holds its last value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSlot {
    value: ParameterValue,
}

impl ValueSlot {
    pub fn new(initial: ParameterValue) -> Self {
        Self { value: initial }
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }
}

impl ParameterSlot for ValueSlot {
    fn kind(&self) -> FieldKind {
        self.value.kind()
    }

    fn get(&self) -> ParameterValue {
        self.value.clone()
    }

    fn set(&mut self, value: ParameterValue) -> Result<()> {
        if value.kind() != self.value.kind() {
            return Err(RenderStreamError::Binding(format!(
                "cannot store {:?} in a {:?} field",
                value.kind(),
                self.value.kind()
            )));
        }
        self.value = value;
        Ok(())
    }
}

struct ExposedField {
    path: String,
    group: Option<String>,
    slot: SharedSlot,
}

/// Fields of one engine object, addressed under a common key prefix.
pub struct ExposedParameters {
    prefix: String,
    display_name: String,
    fields: Vec<ExposedField>,
}

impl ExposedParameters {
    pub fn new(prefix: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            display_name: display_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers `slot` under `path`. Paths must be unique per object.
    pub fn register(&mut self, path: impl Into<String>, slot: SharedSlot) -> Result<()> {
        self.register_in_group(path, None, slot)
    }

    pub fn register_in_group(
        &mut self,
        path: impl Into<String>,
        group: Option<String>,
        slot: SharedSlot,
    ) -> Result<()> {
        let path = path.into();
        if path.is_empty() || self.field(&path).is_some() {
            return Err(RenderStreamError::Binding(format!(
                "field '{}' is empty or already registered on '{}'",
                path, self.prefix
            )));
        }
        self.fields.push(ExposedField { path, group, slot });
        Ok(())
    }

    pub fn with_field(mut self, path: impl Into<String>, slot: SharedSlot) -> Result<Self> {
        self.register(path, slot)?;
        Ok(self)
    }

    pub fn field(&self, path: &str) -> Option<&SharedSlot> {
        self.fields.iter().find(|f| f.path == path).map(|f| &f.slot)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Schema parameters describing every field, in registration order.
    /// Defaults come from the fields' current values.
    pub fn schema_parameters(&self) -> Vec<ManagedRemoteParameter> {
        let mut parameters = Vec::new();
        for field in &self.fields {
            let value = field.slot.lock().get();
            let kind = value.kind();
            let key = format!("{} {}", self.prefix, field.path);
            let display = format!("{} {}", self.display_name, field.path);
            let group = field.group.clone().unwrap_or_else(|| "Properties".to_string());

            let suffixes = kind.composite_suffixes();
            if !suffixes.is_empty() {
                let (min, max, step) = numeric_range(kind);
                for (suffix, default) in suffixes.iter().zip(value.numeric_defaults()) {
                    parameters.push(
                        ManagedRemoteParameter::number(
                            format!("{key}_{suffix}"),
                            format!("{display} {suffix}"),
                            min,
                            max,
                            step,
                            default,
                        )
                        .with_group(group.clone()),
                    );
                }
                continue;
            }

            let parameter = match kind {
                FieldKind::Text | FieldKind::TextList => {
                    ManagedRemoteParameter::of_type(key, display, RemoteParameterType::Text)
                }
                FieldKind::Image => {
                    ManagedRemoteParameter::of_type(key, display, RemoteParameterType::Image)
                }
                FieldKind::Transform => {
                    ManagedRemoteParameter::of_type(key, display, RemoteParameterType::Transform)
                }
                FieldKind::Bool => {
                    let default = value.numeric_defaults().first().copied().unwrap_or(0.0);
                    ManagedRemoteParameter::number(key, display, 0.0, 1.0, 1.0, default)
                        .with_options(vec!["Off".to_string(), "On".to_string()])
                }
                _ => {
                    let (min, max, step) = numeric_range(kind);
                    let default = value.numeric_defaults().first().copied().unwrap_or(0.0);
                    ManagedRemoteParameter::number(key, display, min, max, step, default)
                }
            };
            parameters.push(parameter.with_group(group));
        }
        parameters
    }
}

fn numeric_range(kind: FieldKind) -> (f32, f32, f32) {
    match kind {
        FieldKind::Int | FieldKind::IVec2 | FieldKind::IVec3 => (-1000.0, 1000.0, 1.0),
        FieldKind::Enum => (0.0, 255.0, 1.0),
        FieldKind::Color => (0.0, 1.0, 0.001),
        FieldKind::Quaternion => (-180.0, 180.0, 0.1),
        _ => (-1.0, 1.0, 0.001),
    }
}

/// A key resolved to a registered field.
#[derive(Clone)]
pub struct ResolvedField {
    pub slot: SharedSlot,
    pub kind: FieldKind,
    /// Key with any composite suffix removed.
    pub base_key: String,
    /// Composite component this key addresses, if any.
    pub suffix: Option<&'static str>,
}

impl std::fmt::Debug for ResolvedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedField")
            .field("kind", &self.kind)
            .field("base_key", &self.base_key)
            .field("suffix", &self.suffix)
            .finish()
    }
}

/// Every exposed object, searched in registration order.
#[derive(Default)]
pub struct ParameterRegistry {
    objects: Vec<ExposedParameters>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, object: ExposedParameters) -> Result<()> {
        if self.objects.iter().any(|o| o.prefix == object.prefix) {
            return Err(RenderStreamError::Binding(format!(
                "prefix '{}' is already registered",
                object.prefix
            )));
        }
        self.objects.push(object);
        Ok(())
    }

    pub fn objects(&self) -> &[ExposedParameters] {
        &self.objects
    }

    /// Finds the field `key` addresses.
    ///
    /// Candidate owners are the objects whose prefix, followed by a space,
    /// starts the key, tried in registration order. Within an owner the
    /// remainder is matched as a field path, then as a composite path with
    /// its `_x`/`_r`-style suffix removed.
    pub fn resolve(&self, key: &str) -> Option<ResolvedField> {
        self.objects.iter().find_map(|object| {
            let path = key
                .strip_prefix(object.prefix.as_str())
                .and_then(|rest| rest.strip_prefix(' '))?;
            resolve_in(object, key, path)
        })
    }
}

fn resolve_in(owner: &ExposedParameters, key: &str, path: &str) -> Option<ResolvedField> {
    if let Some(slot) = owner.field(path) {
        let kind = slot.lock().kind();
        return Some(ResolvedField {
            slot: Arc::clone(slot),
            kind,
            base_key: key.to_string(),
            suffix: None,
        });
    }

    let (base_path, suffix) = path.rsplit_once('_')?;
    let slot = owner.field(base_path)?;
    let kind = slot.lock().kind();
    let suffix = kind
        .composite_suffixes()
        .iter()
        .copied()
        .find(|candidate| *candidate == suffix)?;
    Some(ResolvedField {
        slot: Arc::clone(slot),
        kind,
        base_key: key[..key.len() - suffix.len() - 1].to_string(),
        suffix: Some(suffix),
    })
}
