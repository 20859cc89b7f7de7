// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Owned representation of the remote parameter schema.

use bitflags::bitflags;
use renderstream_abi as abi;
use serde::{Deserialize, Serialize};

/// Kind of a remotely controlled parameter.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteParameterType {
    #[default]
    Number = 0,
    Image = 1,
    /// 4x4 TR matrix.
    Pose = 2,
    /// 4x4 TRS matrix.
    Transform = 3,
    Text = 4,
}

impl RemoteParameterType {
    pub fn from_raw(raw: abi::RemoteParameterType) -> Option<Self> {
        match raw {
            abi::RS_PARAMETER_NUMBER => Some(Self::Number),
            abi::RS_PARAMETER_IMAGE => Some(Self::Image),
            abi::RS_PARAMETER_POSE => Some(Self::Pose),
            abi::RS_PARAMETER_TRANSFORM => Some(Self::Transform),
            abi::RS_PARAMETER_TEXT => Some(Self::Text),
            _ => None,
        }
    }

    pub const fn as_raw(self) -> abi::RemoteParameterType {
        self as abi::RemoteParameterType
    }

    /// Slots this parameter occupies in the flat per-frame numeric buffer.
    pub const fn numeric_slots(self) -> usize {
        match self {
            Self::Number => 1,
            Self::Pose | Self::Transform => 16,
            Self::Image | Self::Text => 0,
        }
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmxType {
    Default = 0,
    Dmx8 = 1,
    #[default]
    Dmx16BigEndian = 2,
}

impl DmxType {
    pub fn from_raw(raw: abi::RemoteParameterDmxType) -> Self {
        match raw {
            abi::RS_DMX_8 => Self::Dmx8,
            abi::RS_DMX_16_BE => Self::Dmx16BigEndian,
            _ => Self::Default,
        }
    }

    pub const fn as_raw(self) -> abi::RemoteParameterDmxType {
        self as abi::RemoteParameterDmxType
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RemoteParameterFlags: u32 {
        const NO_SEQUENCE = abi::REMOTEPARAMETER_NO_SEQUENCE;
        const READ_ONLY = abi::REMOTEPARAMETER_READ_ONLY;
    }
}

/// Default value of a parameter; text parameters carry a string, all others a
/// number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterDefault {
    Number(f32),
    Text(String),
}

impl Default for ParameterDefault {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

/// One remotely controllable parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedRemoteParameter {
    pub group: String,
    pub display_name: String,
    /// Unique within a scene; joins the schema with live field bindings.
    pub key: String,
    #[serde(rename = "type")]
    pub parameter_type: RemoteParameterType,
    #[serde(default)]
    pub min: f32,
    #[serde(default)]
    pub max: f32,
    #[serde(default)]
    pub step: f32,
    #[serde(default)]
    pub default_value: ParameterDefault,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default = "auto_dmx_offset")]
    pub dmx_offset: i32,
    #[serde(default)]
    pub dmx_type: DmxType,
    #[serde(default)]
    pub flags: RemoteParameterFlags,
}

fn auto_dmx_offset() -> i32 {
    -1
}

impl ManagedRemoteParameter {
    /// A numeric parameter with the given bounds.
    pub fn number(
        key: impl Into<String>,
        display_name: impl Into<String>,
        min: f32,
        max: f32,
        step: f32,
        default: f32,
    ) -> Self {
        Self {
            group: "Properties".to_string(),
            display_name: display_name.into(),
            key: key.into(),
            parameter_type: RemoteParameterType::Number,
            min,
            max,
            step,
            default_value: ParameterDefault::Number(default),
            options: Vec::new(),
            dmx_offset: auto_dmx_offset(),
            dmx_type: DmxType::default(),
            flags: RemoteParameterFlags::empty(),
        }
    }

    /// A non-numeric parameter of `parameter_type` (image, pose, transform or text).
    pub fn of_type(
        key: impl Into<String>,
        display_name: impl Into<String>,
        parameter_type: RemoteParameterType,
    ) -> Self {
        let default_value = match parameter_type {
            RemoteParameterType::Text => ParameterDefault::Text(String::new()),
            _ => ParameterDefault::Number(0.0),
        };
        Self {
            parameter_type,
            min: 0.0,
            max: 255.0,
            step: 1.0,
            default_value,
            ..Self::number(key, display_name, 0.0, 0.0, 0.0, 0.0)
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn numeric_slots(&self) -> usize {
        self.parameter_type.numeric_slots()
    }
}

/// Parameters exposed by one scene, addressed per frame by `hash`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManagedRemoteParameters {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ManagedRemoteParameter>,
    #[serde(default)]
    pub hash: u64,
}

impl ManagedRemoteParameters {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            hash: 0,
        }
    }

    /// Total slots of the flat numeric buffer fetched for this scene.
    pub fn numeric_slot_count(&self) -> usize {
        self.parameters.iter().map(|p| p.numeric_slots()).sum()
    }

    pub fn count_of(&self, parameter_type: RemoteParameterType) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.parameter_type == parameter_type)
            .count()
    }
}

/// The full parameter tree exchanged with the compositor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManagedSchema {
    #[serde(default)]
    pub engine_name: String,
    #[serde(default)]
    pub engine_version: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub scenes: Vec<ManagedRemoteParameters>,
}

impl ManagedSchema {
    /// Name of the scene in the fallback schema.
    pub const DEFAULT_SCENE_NAME: &'static str = "Default";

    /// Schema used when none can be loaded: a single empty scene, no channels.
    pub fn fallback() -> Self {
        Self {
            scenes: vec![ManagedRemoteParameters::new(Self::DEFAULT_SCENE_NAME)],
            ..Self::default()
        }
    }

    /// Appends a channel unless it is already present.
    pub fn add_channel(&mut self, channel: impl Into<String>) -> bool {
        let channel = channel.into();
        if self.channels.contains(&channel) {
            return false;
        }
        self.channels.push(channel);
        true
    }

    pub fn scene(&self, index: u32) -> Option<&ManagedRemoteParameters> {
        self.scenes.get(index as usize)
    }

    /// Checks that keys are unique within each scene.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for scene in &self.scenes {
            let mut seen = std::collections::HashSet::new();
            for parameter in &scene.parameters {
                if !seen.insert(parameter.key.as_str()) {
                    return Err(format!(
                        "duplicate key '{}' in scene '{}'",
                        parameter.key, scene.name
                    ));
                }
            }
        }
        Ok(())
    }
}
