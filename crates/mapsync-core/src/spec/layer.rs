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

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{PropertyMap, SourceRef};

/// Lowest zoom level of the tile pyramid.
pub const MIN_ZOOM: f64 = 0.0;

/// Highest zoom level of the tile pyramid. Fixed by the tiling scheme, not configurable.
pub const MAX_ZOOM: f64 = 24.0;

/// The drawing rule a layer applies to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Filled polygons.
    Fill,
    /// Points drawn as circles.
    Circle,
    /// Stroked lines.
    Line,
    /// Icons and text labels.
    Symbol,
}

impl LayerKind {
    /// All supported kinds.
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Fill,
        LayerKind::Circle,
        LayerKind::Line,
        LayerKind::Symbol,
    ];

    /// The style-spec type tag.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Fill => "fill",
            LayerKind::Circle => "circle",
            LayerKind::Line => "line",
            LayerKind::Symbol => "symbol",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully merged layer object, as handed to the engine's add-layer operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpecification {
    /// Unique layer id.
    pub id: String,
    /// Layer type tag.
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// The source this layer draws from.
    pub source: SourceRef,
    /// Layer within a multi-layer (vector tile) source.
    #[serde(rename = "source-layer", skip_serializing_if = "Option::is_none", default)]
    pub source_layer: Option<String>,
    /// Feature filter expression. `None` matches every feature.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filter: Option<Value>,
    /// Minimum zoom at which the layer is drawn.
    #[serde(rename = "minzoom")]
    pub min_zoom: f64,
    /// Maximum zoom at which the layer is drawn.
    #[serde(rename = "maxzoom")]
    pub max_zoom: f64,
    /// Layout properties.
    #[serde(default)]
    pub layout: PropertyMap,
    /// Paint properties.
    #[serde(default)]
    pub paint: PropertyMap,
}

/// Options forwarded with every paint/layout property update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSetterOptions {
    /// Whether the engine should validate the value against its style spec.
    pub validate: bool,
}

impl Default for StyleSetterOptions {
    fn default() -> Self {
        Self { validate: true }
    }
}
