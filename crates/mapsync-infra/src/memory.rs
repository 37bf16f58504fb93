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

//! A headless, call-recording [`MapEngine`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;

use mapsync_core::engine::{
    EngineEvent, EngineEventKind, EventHandler, ImageLoadCallback, ListenerId, MapEngine,
};
use mapsync_core::error::{EngineError, ResourceKind};
use mapsync_core::spec::{
    ImageData, ImageSpec, LayerSpecification, LngLat, MarkerSpec, PopupContent, PopupSpec,
    SourceData, SourceRef, SourceSpec, StyleSetterOptions, Value,
};

/// The kind of a recorded [`EngineCall`], used for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    AddSource,
    RemoveSource,
    SetSourceData,
    AddLayer,
    RemoveLayer,
    SetFilter,
    SetZoomRange,
    MoveLayer,
    SetPaintProperty,
    SetLayoutProperty,
    AddImage,
    UpdateImage,
    RemoveImage,
    LoadImage,
    AddMarker,
    RemoveMarker,
    SetMarkerLngLat,
    SetMarkerDraggable,
    SetMarkerPopup,
    AddPopup,
    RemovePopup,
    SetPopupOpen,
    SetPopupLngLat,
    SetPopupContent,
}

/// One mutating call received by the engine, in arrival order.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    AddSource { id: String },
    RemoveSource { id: String },
    SetSourceData { id: String },
    AddLayer { id: String, source: Option<String>, before_id: Option<String> },
    RemoveLayer { id: String },
    SetFilter { id: String, filter: Option<Value> },
    SetZoomRange { id: String, min_zoom: f64, max_zoom: f64 },
    MoveLayer { id: String, before_id: Option<String> },
    SetPaintProperty { id: String, name: String, value: Value },
    SetLayoutProperty { id: String, name: String, value: Value },
    AddImage { id: String },
    UpdateImage { id: String },
    RemoveImage { id: String },
    LoadImage { url: String },
    AddMarker { id: String },
    RemoveMarker { id: String },
    SetMarkerLngLat { id: String, lng_lat: LngLat },
    SetMarkerDraggable { id: String, draggable: bool },
    SetMarkerPopup { id: String, popup_id: Option<String> },
    AddPopup { id: String },
    RemovePopup { id: String },
    SetPopupOpen { id: String, open: bool },
    SetPopupLngLat { id: String, lng_lat: LngLat },
    SetPopupContent { id: String },
}

impl EngineCall {
    /// The operation this call performed.
    pub fn op(&self) -> EngineOp {
        match self {
            EngineCall::AddSource { .. } => EngineOp::AddSource,
            EngineCall::RemoveSource { .. } => EngineOp::RemoveSource,
            EngineCall::SetSourceData { .. } => EngineOp::SetSourceData,
            EngineCall::AddLayer { .. } => EngineOp::AddLayer,
            EngineCall::RemoveLayer { .. } => EngineOp::RemoveLayer,
            EngineCall::SetFilter { .. } => EngineOp::SetFilter,
            EngineCall::SetZoomRange { .. } => EngineOp::SetZoomRange,
            EngineCall::MoveLayer { .. } => EngineOp::MoveLayer,
            EngineCall::SetPaintProperty { .. } => EngineOp::SetPaintProperty,
            EngineCall::SetLayoutProperty { .. } => EngineOp::SetLayoutProperty,
            EngineCall::AddImage { .. } => EngineOp::AddImage,
            EngineCall::UpdateImage { .. } => EngineOp::UpdateImage,
            EngineCall::RemoveImage { .. } => EngineOp::RemoveImage,
            EngineCall::LoadImage { .. } => EngineOp::LoadImage,
            EngineCall::AddMarker { .. } => EngineOp::AddMarker,
            EngineCall::RemoveMarker { .. } => EngineOp::RemoveMarker,
            EngineCall::SetMarkerLngLat { .. } => EngineOp::SetMarkerLngLat,
            EngineCall::SetMarkerDraggable { .. } => EngineOp::SetMarkerDraggable,
            EngineCall::SetMarkerPopup { .. } => EngineOp::SetMarkerPopup,
            EngineCall::AddPopup { .. } => EngineOp::AddPopup,
            EngineCall::RemovePopup { .. } => EngineOp::RemovePopup,
            EngineCall::SetPopupOpen { .. } => EngineOp::SetPopupOpen,
            EngineCall::SetPopupLngLat { .. } => EngineOp::SetPopupLngLat,
            EngineCall::SetPopupContent { .. } => EngineOp::SetPopupContent,
        }
    }
}

/// How an injected failure behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Reject the call without touching engine state.
    Reject,
    /// Apply the call, then report failure. Models an engine that leaves a
    /// half-created resource behind when it throws.
    RejectAfterApply,
}

#[derive(Debug)]
struct SourceRecord {
    spec: SourceSpec,
    loaded: bool,
}

#[derive(Debug)]
struct PopupRecord {
    spec: PopupSpec,
    open: bool,
}

#[derive(Default)]
struct MemoryState {
    style_loaded: bool,
    auto_load_sources: bool,
    sources: HashMap<String, SourceRecord>,
    /// Bottom to top.
    layers: Vec<LayerSpecification>,
    images: HashMap<String, (ImageData, ImageSpec)>,
    pending_images: Vec<(String, ImageLoadCallback)>,
    markers: HashMap<String, MarkerSpec>,
    popups: HashMap<String, PopupRecord>,
    calls: Vec<EngineCall>,
    failures: HashMap<EngineOp, FailureMode>,
}

impl MemoryState {
    fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut LayerSpecification, EngineError> {
        self.layers
            .iter_mut()
            .find(|layer| layer.id == id)
            .ok_or_else(|| not_found(ResourceKind::Layer, id))
    }
}

fn not_found(kind: ResourceKind, id: &str) -> EngineError {
    EngineError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn already_exists(kind: ResourceKind, id: &str) -> EngineError {
    EngineError::AlreadyExists {
        kind,
        id: id.to_string(),
    }
}

fn injected(op: EngineOp) -> EngineError {
    EngineError::Rejected(format!("injected failure on {op:?}"))
}

/// A headless engine backed by in-memory collections.
///
/// Asynchronous engine work is completed explicitly by the owner:
/// [`finish_style_load`](Self::finish_style_load),
/// [`finish_source_load`](Self::finish_source_load) and
/// [`complete_image_load`](Self::complete_image_load). Event handlers are
/// always invoked with no internal borrow held.
pub struct InMemoryEngine {
    state: RefCell<MemoryState>,
    listeners: RefCell<Vec<(ListenerId, EngineEventKind, EventHandler)>>,
    next_listener: Cell<u64>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    /// An engine with a loaded style whose sources load only when
    /// [`finish_source_load`](Self::finish_source_load) is called.
    pub fn new() -> Self {
        let engine = Self::unloaded();
        engine.state.borrow_mut().style_loaded = true;
        engine
    }

    /// An engine whose style has not loaded yet.
    pub fn unloaded() -> Self {
        log::debug!("InMemoryEngine initialized.");
        Self {
            state: RefCell::new(MemoryState::default()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        }
    }

    /// An engine with a loaded style whose sources report loaded data as soon
    /// as they are added.
    pub fn with_auto_load() -> Self {
        let engine = Self::new();
        engine.state.borrow_mut().auto_load_sources = true;
        engine
    }

    // --- Driving the engine ---

    /// Marks the style as loaded and emits `StyleLoad`.
    pub fn finish_style_load(&self) {
        self.state.borrow_mut().style_loaded = true;
        self.emit(EngineEvent::StyleLoad);
    }

    /// Swaps the style: drops every source, layer and image, then emits `StyleLoad`.
    pub fn reload_style(&self) {
        {
            let mut state = self.state.borrow_mut();
            log::debug!(
                "InMemoryEngine: style reload drops {} sources and {} layers",
                state.sources.len(),
                state.layers.len()
            );
            state.sources.clear();
            state.layers.clear();
            state.images.clear();
            state.style_loaded = true;
        }
        self.emit(EngineEvent::StyleLoad);
    }

    /// Marks a source's data as loaded and emits `SourceData`.
    ///
    /// ## Returns
    /// `false` if no such source exists.
    pub fn finish_source_load(&self, id: &str) -> bool {
        {
            let mut state = self.state.borrow_mut();
            match state.sources.get_mut(id) {
                Some(record) => record.loaded = true,
                None => return false,
            }
        }
        self.emit(EngineEvent::SourceData {
            source_id: id.to_string(),
            loaded: true,
        });
        true
    }

    /// Reports a failed data load for a source and emits `Error`.
    ///
    /// ## Returns
    /// `false` if no such source exists.
    pub fn fail_source_load(&self, id: &str, reason: &str) -> bool {
        if !self.state.borrow().sources.contains_key(id) {
            return false;
        }
        self.emit(EngineEvent::Error {
            message: reason.to_string(),
            source_id: Some(id.to_string()),
        });
        true
    }

    /// Completes the oldest pending load of `url`.
    ///
    /// ## Returns
    /// `false` if no load of `url` is pending.
    pub fn complete_image_load(&self, url: &str, result: Result<ImageData, String>) -> bool {
        let callback = {
            let mut state = self.state.borrow_mut();
            match state.pending_images.iter().position(|(u, _)| u == url) {
                Some(index) => state.pending_images.remove(index).1,
                None => return false,
            }
        };
        callback(result.map_err(|reason| EngineError::ImageLoad {
            url: url.to_string(),
            reason,
        }));
        true
    }

    /// Hides a popup as if the user clicked its close button.
    pub fn user_close_popup(&self, id: &str) {
        let was_open = {
            let mut state = self.state.borrow_mut();
            match state.popups.get_mut(id) {
                Some(record) => std::mem::replace(&mut record.open, false),
                None => false,
            }
        };
        if was_open {
            self.emit(EngineEvent::PopupClose {
                popup_id: id.to_string(),
            });
        }
    }

    /// Makes the next call of `op` fail.
    pub fn fail_next(&self, op: EngineOp, mode: FailureMode) {
        self.state.borrow_mut().failures.insert(op, mode);
    }

    /// Dispatches `event` to every matching listener.
    pub fn emit(&self, event: EngineEvent) {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(&event);
        }
    }

    // --- Inspection ---

    /// Every mutating call received so far.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.borrow().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Number of recorded calls of `op`.
    pub fn count(&self, op: EngineOp) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    /// Layer ids from bottom to top.
    pub fn layer_ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .layers
            .iter()
            .map(|layer| layer.id.clone())
            .collect()
    }

    /// Registered source ids, sorted.
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.borrow().sources.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Current value of a paint property.
    pub fn paint_property(&self, layer: &str, name: &str) -> Option<Value> {
        let state = self.state.borrow();
        let index = state.layer_index(layer)?;
        state.layers[index].paint.get(name).cloned()
    }

    /// Current value of a layout property.
    pub fn layout_property(&self, layer: &str, name: &str) -> Option<Value> {
        let state = self.state.borrow();
        let index = state.layer_index(layer)?;
        state.layers[index].layout.get(name).cloned()
    }

    /// Pixels of a registered image.
    pub fn image(&self, id: &str) -> Option<ImageData> {
        self.state
            .borrow()
            .images
            .get(id)
            .map(|(data, _)| data.clone())
    }

    /// Description of a placed marker.
    pub fn marker(&self, id: &str) -> Option<MarkerSpec> {
        self.state.borrow().markers.get(id).cloned()
    }

    /// Description of a registered popup.
    pub fn popup(&self, id: &str) -> Option<PopupSpec> {
        self.state
            .borrow()
            .popups
            .get(id)
            .map(|record| record.spec.clone())
    }

    /// Number of image loads waiting for completion.
    pub fn pending_image_loads(&self) -> usize {
        self.state.borrow().pending_images.len()
    }

    /// Number of attached event listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Records `call` and consumes any failure injected for its operation.
    fn begin(&self, call: EngineCall) -> Option<FailureMode> {
        let mut state = self.state.borrow_mut();
        let op = call.op();
        state.calls.push(call);
        state.failures.remove(&op)
    }

    /// Runs `apply` unless a failure is injected for `call`.
    fn mutate<T>(
        &self,
        call: EngineCall,
        apply: impl FnOnce(&mut MemoryState) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let op = call.op();
        match self.begin(call) {
            Some(FailureMode::Reject) => Err(injected(op)),
            Some(FailureMode::RejectAfterApply) => {
                apply(&mut self.state.borrow_mut())?;
                Err(injected(op))
            }
            None => apply(&mut self.state.borrow_mut()),
        }
    }
}

impl fmt::Debug for InMemoryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("InMemoryEngine")
            .field("style_loaded", &state.style_loaded)
            .field("sources", &state.sources.len())
            .field("layers", &state.layers.len())
            .field("images", &state.images.len())
            .field("markers", &state.markers.len())
            .field("popups", &state.popups.len())
            .finish()
    }
}

impl MapEngine for InMemoryEngine {
    fn is_style_loaded(&self) -> bool {
        self.state.borrow().style_loaded
    }

    fn add_source(&self, id: &str, spec: &SourceSpec) -> Result<(), EngineError> {
        let auto_load = self.mutate(
            EngineCall::AddSource { id: id.to_string() },
            |state| {
                if state.sources.contains_key(id) {
                    return Err(already_exists(ResourceKind::Source, id));
                }
                let loaded = state.auto_load_sources;
                state.sources.insert(
                    id.to_string(),
                    SourceRecord {
                        spec: spec.clone(),
                        loaded,
                    },
                );
                Ok(loaded)
            },
        )?;
        if auto_load {
            self.emit(EngineEvent::SourceData {
                source_id: id.to_string(),
                loaded: true,
            });
        }
        Ok(())
    }

    fn remove_source(&self, id: &str) -> Result<(), EngineError> {
        self.mutate(EngineCall::RemoveSource { id: id.to_string() }, |state| {
            if !state.sources.contains_key(id) {
                return Err(not_found(ResourceKind::Source, id));
            }
            if let Some(user) = state
                .layers
                .iter()
                .find(|layer| layer.source.id() == Some(id))
            {
                return Err(EngineError::Rejected(format!(
                    "source '{id}' is still used by layer '{}'",
                    user.id
                )));
            }
            state.sources.remove(id);
            Ok(())
        })
    }

    fn get_source(&self, id: &str) -> Option<SourceSpec> {
        self.state
            .borrow()
            .sources
            .get(id)
            .map(|record| record.spec.clone())
    }

    fn has_source(&self, id: &str) -> bool {
        self.state.borrow().sources.contains_key(id)
    }

    fn is_source_loaded(&self, id: &str) -> bool {
        self.state
            .borrow()
            .sources
            .get(id)
            .is_some_and(|record| record.loaded)
    }

    fn set_source_data(&self, id: &str, data: &SourceData) -> Result<(), EngineError> {
        let auto_load = self.mutate(EngineCall::SetSourceData { id: id.to_string() }, |state| {
            let auto_load = state.auto_load_sources;
            let record = state
                .sources
                .get_mut(id)
                .ok_or_else(|| not_found(ResourceKind::Source, id))?;
            record.spec.data = data.clone();
            Ok(auto_load)
        })?;
        if auto_load {
            self.emit(EngineEvent::SourceData {
                source_id: id.to_string(),
                loaded: true,
            });
        }
        Ok(())
    }

    fn add_layer(
        &self,
        layer: &LayerSpecification,
        before_id: Option<&str>,
    ) -> Result<(), EngineError> {
        let call = EngineCall::AddLayer {
            id: layer.id.clone(),
            source: layer.source.id().map(str::to_string),
            before_id: before_id.map(str::to_string),
        };
        self.mutate(call, |state| {
            if state.layer_index(&layer.id).is_some() {
                return Err(already_exists(ResourceKind::Layer, &layer.id));
            }
            if layer.min_zoom >= layer.max_zoom {
                return Err(EngineError::InvalidSpec {
                    kind: ResourceKind::Layer,
                    id: layer.id.clone(),
                    reason: "minzoom must be below maxzoom".to_string(),
                });
            }
            match &layer.source {
                SourceRef::Id(source) => {
                    if !state.sources.contains_key(source) {
                        return Err(not_found(ResourceKind::Source, source));
                    }
                }
                SourceRef::Inline(spec) => {
                    // Inline sources are registered under the layer's id.
                    state
                        .sources
                        .entry(layer.id.clone())
                        .or_insert_with(|| SourceRecord {
                            spec: spec.clone(),
                            loaded: true,
                        });
                }
            }
            let index = match before_id {
                Some(before) => state
                    .layer_index(before)
                    .ok_or_else(|| not_found(ResourceKind::Layer, before))?,
                None => state.layers.len(),
            };
            state.layers.insert(index, layer.clone());
            Ok(())
        })
    }

    fn remove_layer(&self, id: &str) -> Result<(), EngineError> {
        self.mutate(EngineCall::RemoveLayer { id: id.to_string() }, |state| {
            let index = state
                .layer_index(id)
                .ok_or_else(|| not_found(ResourceKind::Layer, id))?;
            state.layers.remove(index);
            Ok(())
        })
    }

    fn get_layer(&self, id: &str) -> Option<LayerSpecification> {
        let state = self.state.borrow();
        state.layer_index(id).map(|index| state.layers[index].clone())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.state.borrow().layer_index(id).is_some()
    }

    fn set_filter(&self, id: &str, filter: Option<&Value>) -> Result<(), EngineError> {
        let call = EngineCall::SetFilter {
            id: id.to_string(),
            filter: filter.cloned(),
        };
        self.mutate(call, |state| {
            state.layer_mut(id)?.filter = filter.cloned();
            Ok(())
        })
    }

    fn set_layer_zoom_range(
        &self,
        id: &str,
        min_zoom: f64,
        max_zoom: f64,
    ) -> Result<(), EngineError> {
        let call = EngineCall::SetZoomRange {
            id: id.to_string(),
            min_zoom,
            max_zoom,
        };
        self.mutate(call, |state| {
            let layer = state.layer_mut(id)?;
            layer.min_zoom = min_zoom;
            layer.max_zoom = max_zoom;
            Ok(())
        })
    }

    fn move_layer(&self, id: &str, before_id: Option<&str>) -> Result<(), EngineError> {
        let call = EngineCall::MoveLayer {
            id: id.to_string(),
            before_id: before_id.map(str::to_string),
        };
        self.mutate(call, |state| {
            let from = state
                .layer_index(id)
                .ok_or_else(|| not_found(ResourceKind::Layer, id))?;
            if let Some(before) = before_id {
                if state.layer_index(before).is_none() {
                    return Err(not_found(ResourceKind::Layer, before));
                }
            }
            let layer = state.layers.remove(from);
            let to = match before_id {
                Some(before) => state.layer_index(before).unwrap_or(state.layers.len()),
                None => state.layers.len(),
            };
            state.layers.insert(to, layer);
            Ok(())
        })
    }

    fn set_paint_property(
        &self,
        id: &str,
        name: &str,
        value: &Value,
        _options: &StyleSetterOptions,
    ) -> Result<(), EngineError> {
        let call = EngineCall::SetPaintProperty {
            id: id.to_string(),
            name: name.to_string(),
            value: value.clone(),
        };
        self.mutate(call, |state| {
            let paint = &mut state.layer_mut(id)?.paint;
            if value.is_null() {
                paint.remove(name);
            } else {
                paint.insert(name.to_string(), value.clone());
            }
            Ok(())
        })
    }

    fn set_layout_property(
        &self,
        id: &str,
        name: &str,
        value: &Value,
        _options: &StyleSetterOptions,
    ) -> Result<(), EngineError> {
        let call = EngineCall::SetLayoutProperty {
            id: id.to_string(),
            name: name.to_string(),
            value: value.clone(),
        };
        self.mutate(call, |state| {
            let layout = &mut state.layer_mut(id)?.layout;
            if value.is_null() {
                layout.remove(name);
            } else {
                layout.insert(name.to_string(), value.clone());
            }
            Ok(())
        })
    }

    fn on(&self, kind: EngineEventKind, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, kind, handler));
        id
    }

    fn off(&self, listener: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(id, _, _)| *id != listener);
    }

    fn has_image(&self, id: &str) -> bool {
        self.state.borrow().images.contains_key(id)
    }

    fn add_image(&self, id: &str, image: &ImageData, spec: &ImageSpec) -> Result<(), EngineError> {
        self.mutate(EngineCall::AddImage { id: id.to_string() }, |state| {
            if state.images.contains_key(id) {
                return Err(already_exists(ResourceKind::Image, id));
            }
            if !image.is_well_formed() {
                return Err(EngineError::InvalidSpec {
                    kind: ResourceKind::Image,
                    id: id.to_string(),
                    reason: "pixel buffer does not match dimensions".to_string(),
                });
            }
            state.images.insert(id.to_string(), (image.clone(), *spec));
            Ok(())
        })
    }

    fn update_image(&self, id: &str, image: &ImageData) -> Result<(), EngineError> {
        self.mutate(EngineCall::UpdateImage { id: id.to_string() }, |state| {
            let entry = state
                .images
                .get_mut(id)
                .ok_or_else(|| not_found(ResourceKind::Image, id))?;
            entry.0 = image.clone();
            Ok(())
        })
    }

    fn remove_image(&self, id: &str) -> Result<(), EngineError> {
        self.mutate(EngineCall::RemoveImage { id: id.to_string() }, |state| {
            state
                .images
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| not_found(ResourceKind::Image, id))
        })
    }

    fn load_image(&self, url: &str, done: ImageLoadCallback) {
        match self.begin(EngineCall::LoadImage {
            url: url.to_string(),
        }) {
            Some(_) => done(Err(EngineError::ImageLoad {
                url: url.to_string(),
                reason: "injected failure".to_string(),
            })),
            None => self
                .state
                .borrow_mut()
                .pending_images
                .push((url.to_string(), done)),
        }
    }

    fn add_marker(&self, id: &str, spec: &MarkerSpec) -> Result<(), EngineError> {
        self.mutate(EngineCall::AddMarker { id: id.to_string() }, |state| {
            if state.markers.contains_key(id) {
                return Err(already_exists(ResourceKind::Marker, id));
            }
            state.markers.insert(id.to_string(), spec.clone());
            Ok(())
        })
    }

    fn remove_marker(&self, id: &str) -> Result<(), EngineError> {
        self.mutate(EngineCall::RemoveMarker { id: id.to_string() }, |state| {
            state
                .markers
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| not_found(ResourceKind::Marker, id))
        })
    }

    fn has_marker(&self, id: &str) -> bool {
        self.state.borrow().markers.contains_key(id)
    }

    fn set_marker_lng_lat(&self, id: &str, lng_lat: LngLat) -> Result<(), EngineError> {
        let call = EngineCall::SetMarkerLngLat {
            id: id.to_string(),
            lng_lat,
        };
        self.mutate(call, |state| {
            let marker = state
                .markers
                .get_mut(id)
                .ok_or_else(|| not_found(ResourceKind::Marker, id))?;
            marker.lng_lat = lng_lat;
            Ok(())
        })
    }

    fn set_marker_draggable(&self, id: &str, draggable: bool) -> Result<(), EngineError> {
        let call = EngineCall::SetMarkerDraggable {
            id: id.to_string(),
            draggable,
        };
        self.mutate(call, |state| {
            let marker = state
                .markers
                .get_mut(id)
                .ok_or_else(|| not_found(ResourceKind::Marker, id))?;
            marker.draggable = draggable;
            Ok(())
        })
    }

    fn set_marker_popup(&self, id: &str, popup_id: Option<&str>) -> Result<(), EngineError> {
        let call = EngineCall::SetMarkerPopup {
            id: id.to_string(),
            popup_id: popup_id.map(str::to_string),
        };
        self.mutate(call, |state| {
            if let Some(popup) = popup_id {
                if !state.popups.contains_key(popup) {
                    return Err(not_found(ResourceKind::Popup, popup));
                }
            }
            let marker = state
                .markers
                .get_mut(id)
                .ok_or_else(|| not_found(ResourceKind::Marker, id))?;
            marker.popup = popup_id.map(str::to_string);
            Ok(())
        })
    }

    fn add_popup(&self, id: &str, spec: &PopupSpec) -> Result<(), EngineError> {
        self.mutate(EngineCall::AddPopup { id: id.to_string() }, |state| {
            if state.popups.contains_key(id) {
                return Err(already_exists(ResourceKind::Popup, id));
            }
            state.popups.insert(
                id.to_string(),
                PopupRecord {
                    spec: spec.clone(),
                    open: false,
                },
            );
            Ok(())
        })
    }

    fn remove_popup(&self, id: &str) -> Result<(), EngineError> {
        self.mutate(EngineCall::RemovePopup { id: id.to_string() }, |state| {
            state
                .popups
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| not_found(ResourceKind::Popup, id))
        })
    }

    fn has_popup(&self, id: &str) -> bool {
        self.state.borrow().popups.contains_key(id)
    }

    fn is_popup_open(&self, id: &str) -> bool {
        self.state
            .borrow()
            .popups
            .get(id)
            .is_some_and(|record| record.open)
    }

    fn set_popup_open(&self, id: &str, open: bool) -> Result<(), EngineError> {
        let call = EngineCall::SetPopupOpen {
            id: id.to_string(),
            open,
        };
        let changed = self.mutate(call, |state| {
            let record = state
                .popups
                .get_mut(id)
                .ok_or_else(|| not_found(ResourceKind::Popup, id))?;
            Ok(std::mem::replace(&mut record.open, open) != open)
        })?;
        if changed {
            let popup_id = id.to_string();
            self.emit(if open {
                EngineEvent::PopupOpen { popup_id }
            } else {
                EngineEvent::PopupClose { popup_id }
            });
        }
        Ok(())
    }

    fn set_popup_lng_lat(&self, id: &str, lng_lat: LngLat) -> Result<(), EngineError> {
        let call = EngineCall::SetPopupLngLat {
            id: id.to_string(),
            lng_lat,
        };
        self.mutate(call, |state| {
            let record = state
                .popups
                .get_mut(id)
                .ok_or_else(|| not_found(ResourceKind::Popup, id))?;
            record.spec.lng_lat = Some(lng_lat);
            Ok(())
        })
    }

    fn set_popup_content(&self, id: &str, content: &PopupContent) -> Result<(), EngineError> {
        self.mutate(EngineCall::SetPopupContent { id: id.to_string() }, |state| {
            let record = state
                .popups
                .get_mut(id)
                .ok_or_else(|| not_found(ResourceKind::Popup, id))?;
            record.spec.content = content.clone();
            Ok(())
        })
    }
}
