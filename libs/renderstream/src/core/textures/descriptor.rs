// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::frames::{ImageFrameData, PixelFormat, StreamDescription};

/// Key for texture lookup (dimensions + format + color space).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Texture2DDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub linear: bool,
}

impl Texture2DDescriptor {
    pub fn new(width: u32, height: u32, format: PixelFormat, linear: bool) -> Self {
        Self {
            width,
            height,
            format,
            linear,
        }
    }

    /// Remote images are always sampled linearly.
    pub fn for_image(image: &ImageFrameData) -> Self {
        Self::new(image.width, image.height, image.format, true)
    }

    pub fn for_stream(stream: &StreamDescription, linear: bool) -> Self {
        Self::new(stream.width, stream.height, stream.format, linear)
    }

    /// The compositor binds a black 1x1 texture before real input arrives
    /// and while inputs are being swapped.
    pub fn is_placeholder(&self) -> bool {
        self.width == 1 && self.height == 1
    }

    /// Bytes of one tightly packed row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel() as usize
    }
}

impl fmt::Display for Texture2DDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} Format {} {}",
            self.width,
            self.height,
            self.format,
            if self.linear { "Linear" } else { "SRGB" }
        )
    }
}
