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

//! The contract expected from the external rendering engine.
//!
//! The engine is a single long-lived, mutable object shared by every factory.
//! All methods take `&self`: implementations use interior mutability, exactly
//! like the underlying imperative engines they wrap. Every mutation is a
//! named operation that is atomic from the engine's point of view.

mod event;

pub use self::event::{EngineEvent, EngineEventKind, EventHandler, ListenerId};

use std::fmt::{self, Debug};
use std::ops::Deref;
use std::rc::Rc;

use crate::error::EngineError;
use crate::reactive::{Disposer, Signal};
use crate::spec::{
    ImageData, ImageSpec, LayerSpecification, LngLat, MarkerSpec, PopupContent, PopupSpec,
    SourceData, SourceSpec, StyleSetterOptions, Value,
};

/// Completion callback for [`MapEngine::load_image`].
pub type ImageLoadCallback = Box<dyn FnOnce(Result<ImageData, EngineError>)>;

/// The imperative map engine driven by the bindings.
///
/// Modelled on the sources/layers/images API of style-driven map renderers.
/// Implementations must not hold internal borrows while invoking event
/// handlers or image callbacks: handlers re-enter the engine.
pub trait MapEngine: Debug {
    /// Returns `true` once the current style has finished loading.
    fn is_style_loaded(&self) -> bool;

    // --- Sources ---

    /// Registers a source under `id`.
    /// ## Errors
    /// * `EngineError::AlreadyExists` - If a source with this id exists.
    fn add_source(&self, id: &str, spec: &SourceSpec) -> Result<(), EngineError>;

    /// Removes the source registered under `id`.
    /// ## Errors
    /// * `EngineError::Rejected` - If layers still draw from the source.
    fn remove_source(&self, id: &str) -> Result<(), EngineError>;

    /// Returns the description of a registered source.
    fn get_source(&self, id: &str) -> Option<SourceSpec>;

    /// Returns `true` if a source is registered under `id`.
    fn has_source(&self, id: &str) -> bool;

    /// Returns `true` if the source exists and its data is loaded.
    fn is_source_loaded(&self, id: &str) -> bool;

    /// Replaces a source's data in place, without re-registering it.
    fn set_source_data(&self, id: &str, data: &SourceData) -> Result<(), EngineError>;

    // --- Layers ---

    /// Adds a layer, inserted before `before_id` or on top when `None`.
    /// ## Errors
    /// * `EngineError::AlreadyExists` - If a layer with this id exists.
    /// * `EngineError::NotFound` - If the referenced source or `before_id` is missing.
    /// * `EngineError::InvalidSpec` - If the layer object is malformed.
    fn add_layer(&self, layer: &LayerSpecification, before_id: Option<&str>)
        -> Result<(), EngineError>;

    /// Removes the layer registered under `id`.
    fn remove_layer(&self, id: &str) -> Result<(), EngineError>;

    /// Returns the current description of a layer.
    fn get_layer(&self, id: &str) -> Option<LayerSpecification>;

    /// Returns `true` if a layer is registered under `id`.
    fn has_layer(&self, id: &str) -> bool;

    /// Sets or clears (`None`) a layer's filter.
    fn set_filter(&self, id: &str, filter: Option<&Value>) -> Result<(), EngineError>;

    /// Sets the zoom range in which a layer is drawn.
    fn set_layer_zoom_range(&self, id: &str, min_zoom: f64, max_zoom: f64)
        -> Result<(), EngineError>;

    /// Moves a layer before `before_id`, or to the top when `None`.
    fn move_layer(&self, id: &str, before_id: Option<&str>) -> Result<(), EngineError>;

    /// Sets one paint property. `Value::Null` resets it to the default.
    fn set_paint_property(
        &self,
        id: &str,
        name: &str,
        value: &Value,
        options: &StyleSetterOptions,
    ) -> Result<(), EngineError>;

    /// Sets one layout property. `Value::Null` resets it to the default.
    fn set_layout_property(
        &self,
        id: &str,
        name: &str,
        value: &Value,
        options: &StyleSetterOptions,
    ) -> Result<(), EngineError>;

    // --- Events ---

    /// Registers `handler` for every event of `kind`.
    fn on(&self, kind: EngineEventKind, handler: EventHandler) -> ListenerId;

    /// Detaches a handler. Unknown ids are ignored.
    fn off(&self, listener: ListenerId);

    // --- Images ---

    /// Returns `true` if an image is registered under `id`.
    fn has_image(&self, id: &str) -> bool;

    /// Registers an image.
    fn add_image(&self, id: &str, image: &ImageData, spec: &ImageSpec) -> Result<(), EngineError>;

    /// Replaces the pixels of a registered image.
    fn update_image(&self, id: &str, image: &ImageData) -> Result<(), EngineError>;

    /// Removes a registered image.
    fn remove_image(&self, id: &str) -> Result<(), EngineError>;

    /// Starts fetching and decoding `url`; `done` runs once with the outcome.
    fn load_image(&self, url: &str, done: ImageLoadCallback);

    // --- Markers ---

    /// Places a marker.
    fn add_marker(&self, id: &str, spec: &MarkerSpec) -> Result<(), EngineError>;

    /// Removes a marker.
    fn remove_marker(&self, id: &str) -> Result<(), EngineError>;

    /// Returns `true` if a marker is placed under `id`.
    fn has_marker(&self, id: &str) -> bool;

    /// Moves a marker.
    fn set_marker_lng_lat(&self, id: &str, lng_lat: LngLat) -> Result<(), EngineError>;

    /// Enables or disables dragging.
    fn set_marker_draggable(&self, id: &str, draggable: bool) -> Result<(), EngineError>;

    /// Attaches (or detaches with `None`) the popup toggled by the marker.
    fn set_marker_popup(&self, id: &str, popup_id: Option<&str>) -> Result<(), EngineError>;

    // --- Popups ---

    /// Registers a popup (initially hidden).
    fn add_popup(&self, id: &str, spec: &PopupSpec) -> Result<(), EngineError>;

    /// Removes a popup.
    fn remove_popup(&self, id: &str) -> Result<(), EngineError>;

    /// Returns `true` if a popup is registered under `id`.
    fn has_popup(&self, id: &str) -> bool;

    /// Returns `true` if the popup is currently showing.
    fn is_popup_open(&self, id: &str) -> bool;

    /// Shows or hides a popup, emitting `PopupOpen`/`PopupClose`.
    fn set_popup_open(&self, id: &str, open: bool) -> Result<(), EngineError>;

    /// Moves a popup.
    fn set_popup_lng_lat(&self, id: &str, lng_lat: LngLat) -> Result<(), EngineError>;

    /// Replaces a popup's body.
    fn set_popup_content(&self, id: &str, content: &PopupContent) -> Result<(), EngineError>;
}

/// A shared handle to a live engine.
///
/// Equality is identity: two `EngineRef`s are equal only if they point at the
/// same engine object.
#[derive(Clone)]
pub struct EngineRef(Rc<dyn MapEngine>);

impl EngineRef {
    /// Wraps an engine.
    pub fn new(engine: impl MapEngine + 'static) -> Self {
        Self(Rc::new(engine))
    }

    /// Wraps an already shared engine.
    pub fn from_rc(engine: Rc<dyn MapEngine>) -> Self {
        Self(engine)
    }

    /// Subscribes `handler` and returns a [`Disposer`] that detaches it.
    ///
    /// The disposer only holds the engine weakly, so it never keeps a
    /// replaced engine alive.
    pub fn subscribe(
        &self,
        kind: EngineEventKind,
        handler: impl Fn(&EngineEvent) + 'static,
    ) -> Disposer {
        let listener = self.0.on(kind, Rc::new(handler));
        let engine = Rc::downgrade(&self.0);
        Disposer::new(move || {
            if let Some(engine) = engine.upgrade() {
                engine.off(listener);
            }
        })
    }
}

impl Deref for EngineRef {
    type Target = dyn MapEngine;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for EngineRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for EngineRef {}

impl Debug for EngineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EngineRef").field(&self.0).finish()
    }
}

impl<E: MapEngine + 'static> From<Rc<E>> for EngineRef {
    fn from(engine: Rc<E>) -> Self {
        Self(engine)
    }
}

/// The reactive "current engine" cell owned by the top-level map component.
pub type EngineHandle = Signal<Option<EngineRef>>;
