// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Conversion between [`ManagedSchema`] and the native `Schema` tree.
//!
//! [`SchemaLayout`] owns every string and array the native tree points into.
//! It is built right before a call that takes a `Schema*`, handed over with
//! [`SchemaLayout::as_mut_ptr`], and dropped once the call returns.

use std::ffi::{CString, c_char};
use std::ptr;

use renderstream_abi as abi;

use crate::core::error::{RenderStreamError, Result};
use crate::core::frames::string_from_ptr;

use super::model::{
    DmxType, ManagedRemoteParameter, ManagedRemoteParameters, ManagedSchema, ParameterDefault,
    RemoteParameterFlags, RemoteParameterType,
};

/// Owned native layout of a schema.
pub struct SchemaLayout {
    // Heap data behind each CString and Vec stays put when the outer
    // vectors grow, so pointers taken into them remain valid.
    _strings: Vec<CString>,
    _options: Vec<Vec<*const c_char>>,
    parameters: Vec<Vec<abi::RemoteParameter>>,
    scenes: Vec<abi::RemoteParameters>,
    _channels: Vec<*const c_char>,
    schema: abi::Schema,
}

impl SchemaLayout {
    pub fn new(schema: &ManagedSchema) -> Result<Self> {
        let mut strings = StringArena::default();

        let engine_name = strings.intern(&schema.engine_name)?;
        let engine_version = strings.intern(&schema.engine_version)?;
        let info = strings.intern(&schema.info)?;

        let mut channels = Vec::with_capacity(schema.channels.len());
        for channel in &schema.channels {
            channels.push(strings.intern(channel)?);
        }

        let mut options = Vec::new();
        let mut parameters = Vec::with_capacity(schema.scenes.len());
        for scene in &schema.scenes {
            let mut native = Vec::with_capacity(scene.parameters.len());
            for parameter in &scene.parameters {
                let mut option_ptrs = Vec::with_capacity(parameter.options.len());
                for option in &parameter.options {
                    option_ptrs.push(strings.intern(option)?);
                }
                let options_ptr = if option_ptrs.is_empty() {
                    ptr::null_mut()
                } else {
                    option_ptrs.as_mut_ptr()
                };
                native.push(abi::RemoteParameter {
                    group: strings.intern(&parameter.group)?,
                    display_name: strings.intern(&parameter.display_name)?,
                    key: strings.intern(&parameter.key)?,
                    type_: parameter.parameter_type.as_raw(),
                    defaults: native_defaults(parameter, &mut strings)?,
                    n_options: count(option_ptrs.len(), "options")?,
                    options: options_ptr,
                    dmx_offset: parameter.dmx_offset,
                    dmx_type: parameter.dmx_type.as_raw(),
                    flags: parameter.flags.bits(),
                });
                options.push(option_ptrs);
            }
            parameters.push(native);
        }

        let mut scenes = Vec::with_capacity(schema.scenes.len());
        for (scene, native) in schema.scenes.iter().zip(parameters.iter_mut()) {
            scenes.push(abi::RemoteParameters {
                name: strings.intern(&scene.name)?,
                n_parameters: count(native.len(), "parameters")?,
                parameters: array_ptr(native),
                hash: scene.hash,
            });
        }

        let native_schema = abi::Schema {
            engine_name,
            engine_version,
            info,
            channels: abi::Channels {
                n_channels: count(channels.len(), "channels")?,
                channels: array_ptr(&mut channels),
            },
            scenes: abi::Scenes {
                n_scenes: count(scenes.len(), "scenes")?,
                scenes: array_ptr(&mut scenes),
            },
        };

        Ok(Self {
            _strings: strings.into_inner(),
            _options: options,
            parameters,
            scenes,
            _channels: channels,
            schema: native_schema,
        })
    }

    /// Pointer handed to `rs_saveSchema` / `rs_setSchema`. Valid while `self`
    /// is alive and not moved out of.
    pub fn as_mut_ptr(&mut self) -> *mut abi::Schema {
        &mut self.schema
    }

    pub fn as_ptr(&self) -> *const abi::Schema {
        &self.schema
    }

    /// Per-scene hashes, as written back by `rs_setSchema`.
    pub fn scene_hashes(&self) -> Vec<u64> {
        self.scenes.iter().map(|scene| scene.hash).collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.iter().map(Vec::len).sum()
    }
}

#[derive(Default)]
struct StringArena {
    strings: Vec<CString>,
}

impl StringArena {
    fn intern(&mut self, value: &str) -> Result<*const c_char> {
        let owned = CString::new(value).map_err(|_| {
            RenderStreamError::Schema(format!("string contains an interior nul byte: {value:?}"))
        })?;
        let ptr = owned.as_ptr();
        self.strings.push(owned);
        Ok(ptr)
    }

    fn into_inner(self) -> Vec<CString> {
        self.strings
    }
}

fn native_defaults(
    parameter: &ManagedRemoteParameter,
    strings: &mut StringArena,
) -> Result<abi::RemoteParameterTypeDefaults> {
    Ok(match (&parameter.default_value, parameter.parameter_type) {
        (ParameterDefault::Text(text), RemoteParameterType::Text) => {
            abi::RemoteParameterTypeDefaults {
                text: abi::TextDefaults {
                    default_value: strings.intern(text)?,
                },
            }
        }
        (ParameterDefault::Number(_), RemoteParameterType::Text) => {
            abi::RemoteParameterTypeDefaults {
                text: abi::TextDefaults {
                    default_value: strings.intern("")?,
                },
            }
        }
        (default, _) => abi::RemoteParameterTypeDefaults {
            number: abi::NumericalDefaults {
                min: parameter.min,
                max: parameter.max,
                step: parameter.step,
                default_value: match default {
                    ParameterDefault::Number(value) => *value,
                    ParameterDefault::Text(_) => 0.0,
                },
            },
        },
    })
}

fn count(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| RenderStreamError::Schema(format!("too many {what}: {len}")))
}

fn array_ptr<T>(items: &mut [T]) -> *mut T {
    if items.is_empty() {
        ptr::null_mut()
    } else {
        items.as_mut_ptr()
    }
}

/// Copies a native schema tree into a [`ManagedSchema`].
///
/// # Safety
/// `schema` must describe a well-formed tree: every non-null pointer must
/// reference an array of the stated length or a null-terminated string, all
/// valid for the duration of the call.
pub unsafe fn read_schema(schema: &abi::Schema) -> Result<ManagedSchema> {
    let channels = schema.channels;
    let scenes = schema.scenes;

    let mut managed = ManagedSchema {
        engine_name: unsafe { string_from_ptr(schema.engine_name) },
        engine_version: unsafe { string_from_ptr(schema.engine_version) },
        info: unsafe { string_from_ptr(schema.info) },
        channels: Vec::new(),
        scenes: Vec::with_capacity(scenes.n_scenes as usize),
    };

    for &channel in unsafe { native_slice(channels.channels, channels.n_channels) } {
        managed.add_channel(unsafe { string_from_ptr(channel) });
    }

    for scene in unsafe { native_slice(scenes.scenes, scenes.n_scenes) } {
        let mut parameters = Vec::with_capacity(scene.n_parameters as usize);
        for parameter in unsafe { native_slice(scene.parameters, scene.n_parameters) } {
            parameters.push(unsafe { read_parameter(parameter) }?);
        }
        managed.scenes.push(ManagedRemoteParameters {
            name: unsafe { string_from_ptr(scene.name) },
            parameters,
            hash: scene.hash,
        });
    }

    Ok(managed)
}

unsafe fn read_parameter(parameter: &abi::RemoteParameter) -> Result<ManagedRemoteParameter> {
    let raw_type = parameter.type_;
    let parameter_type = RemoteParameterType::from_raw(raw_type).ok_or_else(|| {
        RenderStreamError::Schema(format!("unknown remote parameter type {raw_type}"))
    })?;

    let defaults = parameter.defaults;
    let (min, max, step, default_value) = if parameter_type == RemoteParameterType::Text {
        let text = unsafe { defaults.text };
        (
            0.0,
            0.0,
            0.0,
            ParameterDefault::Text(unsafe { string_from_ptr(text.default_value) }),
        )
    } else {
        let number = unsafe { defaults.number };
        (
            number.min,
            number.max,
            number.step,
            ParameterDefault::Number(number.default_value),
        )
    };

    let options = unsafe { native_slice(parameter.options, parameter.n_options) }
        .iter()
        .map(|&option| unsafe { string_from_ptr(option) })
        .collect();

    Ok(ManagedRemoteParameter {
        group: unsafe { string_from_ptr(parameter.group) },
        display_name: unsafe { string_from_ptr(parameter.display_name) },
        key: unsafe { string_from_ptr(parameter.key) },
        parameter_type,
        min,
        max,
        step,
        default_value,
        options,
        dmx_offset: parameter.dmx_offset,
        dmx_type: DmxType::from_raw(parameter.dmx_type),
        flags: RemoteParameterFlags::from_bits_truncate(parameter.flags),
    })
}

/// # Safety
/// `ptr` must be null or point to `len` initialised elements.
unsafe fn native_slice<'a, T>(ptr: *mut T, len: u32) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len as usize) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::model::ManagedRemoteParameters;

    fn sample_schema() -> ManagedSchema {
        let mut main = ManagedRemoteParameters::new("Main");
        main.hash = 0xfeed_beef;
        main.parameters = vec![
            ManagedRemoteParameter::number("Cube speed", "Cube Speed", -1.0, 1.0, 0.001, 0.25),
            ManagedRemoteParameter::number("Cube mode", "Cube Mode", 0.0, 2.0, 1.0, 1.0)
                .with_options(vec!["Off".into(), "Slow".into(), "Fast".into()]),
            ManagedRemoteParameter::of_type("Cube transform", "Cube Transform", RemoteParameterType::Transform),
            ManagedRemoteParameter {
                default_value: ParameterDefault::Text("hello world".into()),
                ..ManagedRemoteParameter::of_type("Cube label", "Cube Label", RemoteParameterType::Text)
            },
        ];
        let mut empty = ManagedRemoteParameters::new("Empty");
        empty.hash = 7;

        ManagedSchema {
            engine_name: "renderstream".into(),
            engine_version: "0.1.0".into(),
            info: String::new(),
            channels: vec!["Main".into(), "Aux".into()],
            scenes: vec![main, empty],
        }
    }

    #[test]
    fn test_layout_round_trip() {
        let schema = sample_schema();
        let layout = SchemaLayout::new(&schema).unwrap();
        let read = unsafe { read_schema(&*layout.as_ptr()) }.unwrap();
        assert_eq!(read, schema);
        assert_eq!(layout.parameter_count(), 4);
        assert_eq!(layout.scene_hashes(), vec![0xfeed_beef, 7]);
    }

    #[test]
    fn test_empty_arrays_are_null() {
        let layout = SchemaLayout::new(&ManagedSchema::default()).unwrap();
        let native = unsafe { *layout.as_ptr() };
        let channels = native.channels;
        let scenes = native.scenes;
        assert_eq!({ channels.n_channels }, 0);
        assert!({ channels.channels }.is_null());
        assert_eq!({ scenes.n_scenes }, 0);
        assert!({ scenes.scenes }.is_null());
    }

    #[test]
    fn test_interior_nul_is_rejected() {
        let mut schema = sample_schema();
        schema.channels.push("bad\0channel".into());
        assert!(matches!(
            SchemaLayout::new(&schema),
            Err(RenderStreamError::Schema(_))
        ));
    }

    #[test]
    fn test_hash_written_back_by_native_side() {
        let mut layout = SchemaLayout::new(&sample_schema()).unwrap();
        // Stand-in for rs_setSchema filling per-scene hashes.
        unsafe {
            let native = &mut *layout.as_mut_ptr();
            let scenes = native.scenes;
            let first = &mut *scenes.scenes;
            first.hash = 1234;
        }
        assert_eq!(layout.scene_hashes()[0], 1234);
    }
}
