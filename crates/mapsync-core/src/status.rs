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

//! Lifecycle states exposed by the resource factories.
//!
//! Every factory publishes its state through a `Signal`, so consumers always
//! observe the current value rather than a snapshot taken at construction.
//! Transitions only move forward; `Error` folds back to `NotCreated` when the
//! resource is removed, before any retry.

use std::fmt;

/// Lifecycle of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceStatus {
    /// Nothing exists on the engine for this factory.
    #[default]
    NotCreated,
    /// The engine call is in flight.
    Creating,
    /// The engine confirmed the resource.
    Created,
    /// The engine rejected the resource.
    Error,
}

impl ResourceStatus {
    /// Returns `true` if the resource exists on the engine.
    pub fn is_live(self) -> bool {
        self == ResourceStatus::Created
    }
}

/// Lifecycle of a data source. `Created` is split into loading phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceStatus {
    /// Nothing exists on the engine for this factory.
    #[default]
    NotCreated,
    /// The add-source call is in flight.
    Creating,
    /// The engine accepted the source.
    Created,
    /// Waiting for the engine to report the source data as loaded.
    Loading,
    /// Data is available; dependent layers may bind.
    Loaded,
    /// The engine rejected the source.
    Error,
}

impl SourceStatus {
    /// Returns `true` if the source exists on the engine.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            SourceStatus::Created | SourceStatus::Loading | SourceStatus::Loaded
        )
    }
}

/// Lifecycle of a sprite image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageStatus {
    /// Nothing exists on the engine for this factory.
    #[default]
    NotCreated,
    /// The image is being fetched or decoded.
    Loading,
    /// Pixels are available but not yet registered.
    Loaded,
    /// The image is registered on the engine.
    Created,
    /// Loading or registration failed.
    Error,
}

impl ImageStatus {
    /// Returns `true` if the image is registered on the engine.
    pub fn is_live(self) -> bool {
        self == ImageStatus::Created
    }
}

/// Lifecycle of a marker. `Created` splits into `Open`/`Closed` while a popup is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MarkerStatus {
    /// Nothing exists on the engine for this factory.
    #[default]
    NotCreated,
    /// The add-marker call is in flight.
    Creating,
    /// The marker is placed and has no popup attached.
    Created,
    /// The marker's popup is showing.
    Open,
    /// The marker has a popup that is hidden.
    Closed,
    /// The engine rejected the marker.
    Error,
}

impl MarkerStatus {
    /// Returns `true` if the marker exists on the engine.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            MarkerStatus::Created | MarkerStatus::Open | MarkerStatus::Closed
        )
    }
}

/// Lifecycle of a popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PopupStatus {
    /// Nothing exists on the engine for this factory.
    #[default]
    NotCreated,
    /// The add-popup call is in flight.
    Creating,
    /// Registered but its visibility is not known yet.
    Created,
    /// Showing on the map.
    Open,
    /// Registered and hidden.
    Closed,
    /// The engine rejected the popup.
    Error,
}

impl PopupStatus {
    /// Returns `true` if the popup exists on the engine.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            PopupStatus::Created | PopupStatus::Open | PopupStatus::Closed
        )
    }
}

macro_rules! impl_status_display {
    ($($status:ident),* $(,)?) => {
        $(
            impl fmt::Display for $status {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Debug::fmt(self, f)
                }
            }
        )*
    };
}

impl_status_display!(
    ResourceStatus,
    SourceStatus,
    ImageStatus,
    MarkerStatus,
    PopupStatus
);
