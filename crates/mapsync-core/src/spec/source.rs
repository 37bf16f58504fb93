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
use serde_json::Value;

use super::PropertyMap;

/// The kind of data a source provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Inline or remote GeoJSON.
    #[serde(rename = "geojson")]
    GeoJson,
    /// Vector tiles.
    Vector,
    /// Raster tiles.
    Raster,
    /// Elevation tiles.
    RasterDem,
    /// A single georeferenced image.
    Image,
    /// A georeferenced video.
    Video,
}

/// The payload of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceData {
    /// A url the engine fetches or streams itself.
    Url(String),
    /// Structured data held in memory (e.g. a GeoJSON feature collection).
    Inline(Value),
}

/// Everything the engine needs to register a source.
///
/// `options` carries clustering and tiling hints; they are passed through
/// opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Source type tag.
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// The payload.
    pub data: SourceData,
    /// Additional engine options (`cluster`, `tileSize`, `attribution`, ...).
    #[serde(flatten)]
    pub options: PropertyMap,
}

impl SourceSpec {
    /// A GeoJSON source holding `data` inline.
    pub fn geojson(data: Value) -> Self {
        Self {
            kind: SourceKind::GeoJson,
            data: SourceData::Inline(data),
            options: PropertyMap::new(),
        }
    }

    /// A source of `kind` fetched from `url`.
    pub fn url(kind: SourceKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            data: SourceData::Url(url.into()),
            options: PropertyMap::new(),
        }
    }

    /// Adds an opaque engine option.
    pub fn with_option(mut self, name: impl Into<String>, value: Value) -> Self {
        self.options.insert(name.into(), value);
        self
    }
}

/// How a layer refers to the source it draws from.
///
/// Resolved by exhaustive match: a layer either names a source registered
/// elsewhere, or carries its own inline source description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceRef {
    /// A source registered on the engine under this id.
    Id(String),
    /// A source described inline, registered together with the layer.
    Inline(SourceSpec),
}

impl SourceRef {
    /// Returns the referenced id, if this is an id reference.
    pub fn id(&self) -> Option<&str> {
        match self {
            SourceRef::Id(id) => Some(id),
            SourceRef::Inline(_) => None,
        }
    }
}

impl From<&str> for SourceRef {
    fn from(id: &str) -> Self {
        SourceRef::Id(id.to_string())
    }
}

impl From<String> for SourceRef {
    fn from(id: String) -> Self {
        SourceRef::Id(id)
    }
}

impl From<SourceSpec> for SourceRef {
    fn from(spec: SourceSpec) -> Self {
        SourceRef::Inline(spec)
    }
}
