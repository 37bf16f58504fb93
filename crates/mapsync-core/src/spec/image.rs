// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use serde::{Deserialize, Serialize};

/// Decoded RGBA pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 pixels, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Creates an image filled with a single RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let len = (width as usize) * (height as usize);
        let pixels = rgba.iter().copied().cycle().take(len * 4).collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Returns `true` if the pixel buffer matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == (self.width as usize) * (self.height as usize) * 4
    }
}

/// Registration options for a sprite image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Ratio of pixels in the image to physical pixels on screen.
    #[serde(rename = "pixelRatio")]
    pub pixel_ratio: f32,
    /// Whether the image is a signed distance field (recolorable icon).
    pub sdf: bool,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            sdf: false,
        }
    }
}
