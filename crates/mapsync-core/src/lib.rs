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

//! # Mapsync Core
//!
//! Foundational crate containing the engine contract, the declarative resource
//! descriptions, the status model and the reactive machinery that every
//! resource factory is built upon.
//!
//! The crate defines the 'what': [`MapEngine`] describes the imperative engine
//! being driven, [`Signal`] carries reactive inputs, and the
//! [`ReloadCoordinator`] turns engine replacements into teardown/ready pairs.
//! The 'how' of keeping individual sources and layers alive lives in
//! `mapsync-bindings`, and concrete engines live in `mapsync-infra`.

#![warn(missing_docs)]

pub mod context;
pub mod engine;
pub mod error;
pub mod reactive;
pub mod reload;
pub mod settings;
pub mod spec;
pub mod status;

pub use context::BindingContext;
pub use engine::{
    EngineEvent, EngineEventKind, EngineHandle, EngineRef, EventHandler, ImageLoadCallback,
    ListenerId, MapEngine,
};
pub use error::{BindingError, EngineError, ResourceKind};
pub use reactive::{Disposer, Scope, Signal};
pub use reload::{ReloadCoordinator, ReloadHandler, ReloadSubscription};
pub use settings::BindingSettings;
pub use status::{ImageStatus, MarkerStatus, PopupStatus, ResourceStatus, SourceStatus};
