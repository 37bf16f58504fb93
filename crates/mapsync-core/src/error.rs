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

//! Defines the error types shared by the engine contract and the resource factories.

use std::fmt;

/// The kind of engine-side resource an operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A named data source.
    Source,
    /// A styled layer drawing from a source.
    Layer,
    /// A named sprite image.
    Image,
    /// A positioned marker.
    Marker,
    /// An information popup.
    Popup,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Source => "source",
            ResourceKind::Layer => "layer",
            ResourceKind::Image => "image",
            ResourceKind::Marker => "marker",
            ResourceKind::Popup => "popup",
        };
        f.write_str(name)
    }
}

/// An operation rejected by the rendering engine.
///
/// Factories catch these at their boundary and convert them into an `Error`
/// status; they never cross into the owning component.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// A resource with this id is already registered on the engine.
    #[error("{kind} '{id}' already exists")]
    AlreadyExists {
        /// Kind of the conflicting resource.
        kind: ResourceKind,
        /// The conflicting id.
        id: String,
    },
    /// The referenced resource does not exist on the engine.
    #[error("{kind} '{id}' does not exist")]
    NotFound {
        /// Kind of the missing resource.
        kind: ResourceKind,
        /// The missing id.
        id: String,
    },
    /// The resource description was malformed.
    #[error("invalid {kind} specification for '{id}': {reason}")]
    InvalidSpec {
        /// Kind of the rejected resource.
        kind: ResourceKind,
        /// Id of the rejected resource.
        id: String,
        /// Engine-provided explanation.
        reason: String,
    },
    /// The engine refused the operation for another reason.
    #[error("engine rejected operation: {0}")]
    Rejected(String),
    /// A source was accepted but its data failed to load.
    #[error("failed to load data of source '{id}': {reason}")]
    SourceLoad {
        /// The source id.
        id: String,
        /// Engine-provided explanation.
        reason: String,
    },
    /// An image could not be fetched or decoded.
    #[error("failed to load image from '{url}': {reason}")]
    ImageLoad {
        /// The requested url.
        url: String,
        /// Engine-provided explanation.
        reason: String,
    },
}

/// An error surfaced by a resource factory or the binding configuration.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// The engine rejected an operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The resource was removed before it finished becoming ready.
    #[error("{kind} '{id}' was removed before it became ready")]
    Removed {
        /// Kind of the removed resource.
        kind: ResourceKind,
        /// Id of the removed resource.
        id: String,
    },
    /// A zoom range outside `[0, 24]` or with `min >= max`.
    #[error("invalid zoom range [{min}, {max}]")]
    InvalidZoomRange {
        /// Requested minimum zoom.
        min: f64,
        /// Requested maximum zoom.
        max: f64,
    },
    /// The settings file could not be read or written.
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The settings document could not be parsed or produced.
    #[error("settings are malformed: {0}")]
    Settings(#[from] serde_json::Error),
}
