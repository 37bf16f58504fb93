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

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LngLat {
    /// Longitude.
    pub lng: f64,
    /// Latitude.
    pub lat: f64,
}

impl LngLat {
    /// Creates a position.
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// Describes a marker pinned to the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    /// Anchor position.
    pub lng_lat: LngLat,
    /// Whether the user may drag the marker.
    #[serde(default)]
    pub draggable: bool,
    /// CSS color of the default marker glyph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Pixel offset from the anchor.
    #[serde(default)]
    pub offset: [f64; 2],
    /// Id of a popup toggled by clicking the marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

impl MarkerSpec {
    /// A default marker at `lng_lat`.
    pub fn at(lng_lat: LngLat) -> Self {
        Self {
            lng_lat,
            draggable: false,
            color: None,
            offset: [0.0, 0.0],
            popup: None,
        }
    }
}

/// Body of a popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupContent {
    /// Plain text.
    Text(String),
    /// Raw HTML markup.
    Html(String),
}

/// Describes an information popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupSpec {
    /// Anchor position. `None` for popups only shown through a marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng_lat: Option<LngLat>,
    /// Popup body.
    pub content: PopupContent,
    /// Whether to render a close button.
    #[serde(default = "enabled")]
    pub close_button: bool,
    /// Whether clicking the map closes the popup.
    #[serde(default = "enabled")]
    pub close_on_click: bool,
    /// CSS max width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<String>,
}

fn enabled() -> bool {
    true
}

impl PopupSpec {
    /// A text popup with default behaviour.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            lng_lat: None,
            content: PopupContent::Text(content.into()),
            close_button: true,
            close_on_click: true,
            max_width: None,
        }
    }

    /// Anchors the popup at `lng_lat`.
    pub fn at(mut self, lng_lat: LngLat) -> Self {
        self.lng_lat = Some(lng_lat);
        self
    }
}
