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

use mapsync_core::{EngineRef, ResourceKind};

/// The live, engine-confirmed counterpart of a factory's resource.
///
/// Only handed out while the engine actually holds the resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceHandle {
    /// The engine-side id.
    pub id: String,
    /// What kind of resource the id names.
    pub kind: ResourceKind,
    /// The engine holding the resource.
    pub engine: EngineRef,
}
