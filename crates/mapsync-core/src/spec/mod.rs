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

//! Declarative descriptions of engine resources.
//!
//! These are the plain data objects handed to the engine contract. Style
//! values stay as [`serde_json::Value`] because the engine, not this crate, is
//! the authority on what a paint or layout value may look like.

pub mod image;
pub mod layer;
pub mod marker;
pub mod source;

pub use self::image::{ImageData, ImageSpec};
pub use self::layer::{LayerKind, LayerSpecification, StyleSetterOptions, MAX_ZOOM, MIN_ZOOM};
pub use self::marker::{LngLat, MarkerSpec, PopupContent, PopupSpec};
pub use self::source::{SourceData, SourceKind, SourceRef, SourceSpec};

/// A style property map (`paint`, `layout`, or a merged style object).
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;

pub use serde_json::Value;
