// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::textures::Texture2DDescriptor;

use super::math;

/// Which bucket of a scene binding a field lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterBucket {
    Numeric,
    Text,
    Image,
}

/// Shape of a bindable engine field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Float,
    Int,
    Bool,
    Enum,
    Vec2,
    IVec2,
    Vec3,
    IVec3,
    Vec4,
    /// Driven by three euler slots in degrees.
    Quaternion,
    Color,
    Transform,
    Text,
    /// Whitespace separated words.
    TextList,
    Image,
}

impl FieldKind {
    /// Slots this field consumes from the flat numeric buffer.
    pub const fn numeric_slots(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Bool | Self::Enum => 1,
            Self::Vec2 | Self::IVec2 => 2,
            Self::Vec3 | Self::IVec3 | Self::Quaternion => 3,
            Self::Vec4 | Self::Color => 4,
            Self::Transform => 16,
            Self::Text | Self::TextList | Self::Image => 0,
        }
    }

    /// Key suffixes of the schema parameters a composite field is split into.
    /// Empty for fields that map to a single parameter.
    pub const fn composite_suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Vec2 | Self::IVec2 => &["x", "y"],
            Self::Vec3 | Self::IVec3 | Self::Quaternion => &["x", "y", "z"],
            Self::Vec4 => &["x", "y", "z", "w"],
            Self::Color => &["r", "g", "b", "a"],
            _ => &[],
        }
    }

    pub const fn is_composite(self) -> bool {
        !self.composite_suffixes().is_empty()
    }

    pub const fn bucket(self) -> ParameterBucket {
        match self {
            Self::Text | Self::TextList => ParameterBucket::Text,
            Self::Image => ParameterBucket::Image,
            _ => ParameterBucket::Numeric,
        }
    }

    /// Builds a value of this kind from its numeric slots.
    ///
    /// Returns `None` for non-numeric kinds or when `slots` is too short.
    pub fn decode(self, slots: &[f32]) -> Option<ParameterValue> {
        if self.bucket() != ParameterBucket::Numeric || slots.len() < self.numeric_slots() {
            return None;
        }
        let s = slots;
        let value = match self {
            Self::Float => ParameterValue::Float(s[0]),
            Self::Int => ParameterValue::Int(s[0] as i32),
            Self::Bool => ParameterValue::Bool(s[0] != 0.0),
            Self::Enum => ParameterValue::Enum(s[0].max(0.0) as u32),
            Self::Vec2 => ParameterValue::Vec2([s[0], s[1]]),
            Self::IVec2 => ParameterValue::IVec2([s[0] as i32, s[1] as i32]),
            Self::Vec3 => ParameterValue::Vec3([s[0], s[1], s[2]]),
            Self::IVec3 => ParameterValue::IVec3([s[0] as i32, s[1] as i32, s[2] as i32]),
            Self::Vec4 => ParameterValue::Vec4([s[0], s[1], s[2], s[3]]),
            Self::Quaternion => {
                ParameterValue::Quaternion(math::quaternion_from_euler([s[0], s[1], s[2]]))
            }
            Self::Color => ParameterValue::Color([s[0], s[1], s[2], s[3]]),
            Self::Transform => {
                let mut m = [0.0; 16];
                m.copy_from_slice(&s[..16]);
                ParameterValue::Transform(math::decompose_transform(&m))
            }
            Self::Text | Self::TextList | Self::Image => return None,
        };
        Some(value)
    }
}

/// Local transform of an engine object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformValue {
    pub position: [f32; 3],
    /// `[x, y, z, w]`
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for TransformValue {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

/// Remote image bound to an image field for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoteImage {
    pub image_id: i64,
    pub descriptor: Texture2DDescriptor,
}

/// Value held by a bound field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Enum(u32),
    Vec2([f32; 2]),
    IVec2([i32; 2]),
    Vec3([f32; 3]),
    IVec3([i32; 3]),
    Vec4([f32; 4]),
    /// `[x, y, z, w]`
    Quaternion([f32; 4]),
    Color([f32; 4]),
    Transform(TransformValue),
    Text(String),
    TextList(Vec<String>),
    /// `None` until the compositor provides an image.
    Image(Option<RemoteImage>),
}

impl ParameterValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Float(_) => FieldKind::Float,
            Self::Int(_) => FieldKind::Int,
            Self::Bool(_) => FieldKind::Bool,
            Self::Enum(_) => FieldKind::Enum,
            Self::Vec2(_) => FieldKind::Vec2,
            Self::IVec2(_) => FieldKind::IVec2,
            Self::Vec3(_) => FieldKind::Vec3,
            Self::IVec3(_) => FieldKind::IVec3,
            Self::Vec4(_) => FieldKind::Vec4,
            Self::Quaternion(_) => FieldKind::Quaternion,
            Self::Color(_) => FieldKind::Color,
            Self::Transform(_) => FieldKind::Transform,
            Self::Text(_) => FieldKind::Text,
            Self::TextList(_) => FieldKind::TextList,
            Self::Image(_) => FieldKind::Image,
        }
    }

    /// Text value as received from the compositor, shaped for `kind`.
    pub fn from_text(kind: FieldKind, text: &str) -> Option<Self> {
        match kind {
            FieldKind::Text => Some(Self::Text(text.to_string())),
            FieldKind::TextList => Some(Self::TextList(
                text.split_whitespace().map(str::to_string).collect(),
            )),
            _ => None,
        }
    }

    /// Per-slot defaults for a schema built from the current value. Rotations
    /// and transforms have no meaningful numeric default and report zeros.
    pub fn numeric_defaults(&self) -> Vec<f32> {
        match self {
            Self::Float(v) => vec![*v],
            Self::Int(v) => vec![*v as f32],
            Self::Bool(v) => vec![if *v { 1.0 } else { 0.0 }],
            Self::Enum(v) => vec![*v as f32],
            Self::Vec2(v) => v.to_vec(),
            Self::IVec2(v) => v.iter().map(|c| *c as f32).collect(),
            Self::Vec3(v) => v.to_vec(),
            Self::IVec3(v) => v.iter().map(|c| *c as f32).collect(),
            Self::Vec4(v) | Self::Color(v) => v.to_vec(),
            other => vec![0.0; other.kind().numeric_slots()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_counts() {
        assert_eq!(FieldKind::Float.numeric_slots(), 1);
        assert_eq!(FieldKind::Enum.numeric_slots(), 1);
        assert_eq!(FieldKind::IVec2.numeric_slots(), 2);
        assert_eq!(FieldKind::Quaternion.numeric_slots(), 3);
        assert_eq!(FieldKind::Color.numeric_slots(), 4);
        assert_eq!(FieldKind::Transform.numeric_slots(), 16);
        assert_eq!(FieldKind::TextList.numeric_slots(), 0);
        for kind in [FieldKind::Vec2, FieldKind::Vec3, FieldKind::Vec4, FieldKind::Color] {
            assert_eq!(kind.composite_suffixes().len(), kind.numeric_slots());
        }
    }

    #[test]
    fn test_decode_numeric_kinds() {
        let slots = [3.7, -1.2, 0.0, 1.0];
        assert_eq!(FieldKind::Float.decode(&slots), Some(ParameterValue::Float(3.7)));
        assert_eq!(FieldKind::Int.decode(&slots), Some(ParameterValue::Int(3)));
        assert_eq!(FieldKind::Bool.decode(&slots[2..]), Some(ParameterValue::Bool(false)));
        assert_eq!(FieldKind::Enum.decode(&slots), Some(ParameterValue::Enum(3)));
        assert_eq!(
            FieldKind::IVec3.decode(&slots),
            Some(ParameterValue::IVec3([3, -1, 0]))
        );
        assert_eq!(
            FieldKind::Color.decode(&slots),
            Some(ParameterValue::Color([3.7, -1.2, 0.0, 1.0]))
        );
        assert_eq!(FieldKind::Vec4.decode(&slots[1..]), None);
        assert_eq!(FieldKind::Text.decode(&slots), None);
    }

    #[test]
    fn test_text_list_splits_on_whitespace() {
        assert_eq!(
            ParameterValue::from_text(FieldKind::TextList, "alpha  beta\tgamma "),
            Some(ParameterValue::TextList(vec![
                "alpha".to_string(),
                "beta".to_string(),
                "gamma".to_string()
            ]))
        );
        assert_eq!(
            ParameterValue::from_text(FieldKind::Text, "alpha beta"),
            Some(ParameterValue::Text("alpha beta".to_string()))
        );
        assert_eq!(ParameterValue::from_text(FieldKind::Float, "1"), None);
    }

    #[test]
    fn test_numeric_defaults_match_slot_count() {
        let values = [
            ParameterValue::Bool(true),
            ParameterValue::IVec2([1, 2]),
            ParameterValue::Quaternion([0.0, 0.0, 0.0, 1.0]),
            ParameterValue::Transform(TransformValue::default()),
        ];
        for value in values {
            assert_eq!(value.numeric_defaults().len(), value.kind().numeric_slots());
        }
    }
}
