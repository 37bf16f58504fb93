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

use std::rc::Rc;

/// Events emitted by the engine that the bindings subscribe to.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The style finished loading. Fired again after every style swap, at
    /// which point all previously added sources and layers are gone.
    StyleLoad,
    /// Data for a source changed state.
    SourceData {
        /// The source the event concerns.
        source_id: String,
        /// Whether the source reports its data as fully loaded.
        loaded: bool,
    },
    /// A generic engine-side error.
    Error {
        /// Engine-provided description.
        message: String,
        /// The source involved, if any.
        source_id: Option<String>,
    },
    /// A popup became visible.
    PopupOpen {
        /// The popup id.
        popup_id: String,
    },
    /// A popup was hidden, by code or by the user.
    PopupClose {
        /// The popup id.
        popup_id: String,
    },
}

impl EngineEvent {
    /// The discriminant used for subscriptions.
    pub fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::StyleLoad => EngineEventKind::StyleLoad,
            EngineEvent::SourceData { .. } => EngineEventKind::SourceData,
            EngineEvent::Error { .. } => EngineEventKind::Error,
            EngineEvent::PopupOpen { .. } => EngineEventKind::PopupOpen,
            EngineEvent::PopupClose { .. } => EngineEventKind::PopupClose,
        }
    }
}

/// Subscription key for [`EngineEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineEventKind {
    /// See [`EngineEvent::StyleLoad`].
    StyleLoad,
    /// See [`EngineEvent::SourceData`].
    SourceData,
    /// See [`EngineEvent::Error`].
    Error,
    /// See [`EngineEvent::PopupOpen`].
    PopupOpen,
    /// See [`EngineEvent::PopupClose`].
    PopupClose,
}

/// Identifies a registered event handler so it can be detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A callback invoked for every matching engine event.
pub type EventHandler = Rc<dyn Fn(&EngineEvent)>;
