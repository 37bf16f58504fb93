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

//! # Mapsync Bindings
//!
//! The resource factories. Each factory owns exactly one engine-side resource
//! and keeps it synchronized with its declarative inputs:
//!
//! - it creates the resource once the engine (and, for layers, the source
//!   dependency) is ready,
//! - forwards setter calls to the engine only while the resource exists,
//! - rebuilds it after every reload signalled by the shared
//!   [`ReloadCoordinator`](mapsync_core::ReloadCoordinator),
//! - and removes it exactly once when the factory is dropped.
//!
//! Factories never return engine errors to their owner. Failures become an
//! `Error` status on the factory's observable status signal.

#![warn(missing_docs)]

pub mod bridge;
pub mod handle;
pub mod image;
pub mod layer;
pub mod marker;
pub mod popup;
mod report;
pub mod source;

pub use bridge::{ObservableResource, RegistrationBridge};
pub use handle::ResourceHandle;
pub use image::{ImageActions, ImageFactory, ImageOptions, ImageSource};
pub use layer::{
    CircleLayer, FillLayer, LayerActions, LayerFactory, LayerOptions, LineLayer, SymbolLayer,
};
pub use marker::{MarkerActions, MarkerFactory, MarkerOptions};
pub use popup::{PopupActions, PopupFactory, PopupOptions};
pub use source::{SourceActions, SourceFactory, SourceOptions};
