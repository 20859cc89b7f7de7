// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;
use std::str::FromStr;

use renderstream_abi as abi;
use serde::{Deserialize, Serialize};

/// Graphics API the host renders with.
///
/// Determines which [`abi::SenderFrameTypeData`] variant frames are
/// exchanged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphicsBackend {
    Dx11,
    Dx12,
    #[serde(rename = "opengl")]
    OpenGl,
    Vulkan,
    /// CPU buffers, no GPU interop.
    #[default]
    HostMemory,
    Metal,
}

impl GraphicsBackend {
    /// Whether frames can be exchanged through this backend at all.
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::Metal)
    }

    pub const fn frame_type(self) -> abi::SenderFrameType {
        match self {
            Self::Dx11 => abi::RS_FRAMETYPE_DX11_TEXTURE,
            Self::Dx12 => abi::RS_FRAMETYPE_DX12_TEXTURE,
            Self::OpenGl => abi::RS_FRAMETYPE_OPENGL_TEXTURE,
            Self::Vulkan => abi::RS_FRAMETYPE_VULKAN_TEXTURE,
            Self::HostMemory => abi::RS_FRAMETYPE_HOST_MEMORY,
            Self::Metal => abi::RS_FRAMETYPE_UNKNOWN,
        }
    }
}

impl fmt::Display for GraphicsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dx11 => "dx11",
            Self::Dx12 => "dx12",
            Self::OpenGl => "opengl",
            Self::Vulkan => "vulkan",
            Self::HostMemory => "host_memory",
            Self::Metal => "metal",
        };
        f.write_str(name)
    }
}

impl FromStr for GraphicsBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dx11" | "d3d11" => Ok(Self::Dx11),
            "dx12" | "d3d12" => Ok(Self::Dx12),
            "opengl" | "gl" => Ok(Self::OpenGl),
            "vulkan" | "vk" => Ok(Self::Vulkan),
            "host_memory" | "cpu" => Ok(Self::HostMemory),
            "metal" => Ok(Self::Metal),
            other => Err(format!("unknown graphics backend '{other}'")),
        }
    }
}

/// Result of `rs_useDX12SharedHeapFlag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dx12SharedHeapFlag {
    UseSharedHeap,
    DoNotUseSharedHeap,
}

impl Dx12SharedHeapFlag {
    pub fn from_raw(raw: abi::UseDx12SharedHeapFlag) -> Self {
        if raw == abi::RS_DX12_DO_NOT_USE_SHARED_HEAP_FLAG {
            Self::DoNotUseSharedHeap
        } else {
            Self::UseSharedHeap
        }
    }
}
