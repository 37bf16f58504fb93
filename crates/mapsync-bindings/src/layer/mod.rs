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

//! The generic layer factory.
//!
//! A [`LayerFactory`] owns one engine layer. It observes two reactive inputs:
//! the engine (through the context's reload coordinator) and its source
//! dependency, a `Signal<Option<SourceRef>>`. The layer exists on the engine
//! only while both resolve, and for an id dependency only once the engine
//! reports that source's data as loaded.
//!
//! Per-kind behaviour is data, not code: [`kinds`] holds the paint/layout key
//! tables, and the typed wrappers in [`typed`] add convenience setters on top
//! of the same factory.

pub mod kinds;
pub mod typed;
pub mod validate;

pub use self::typed::{CircleLayer, FillLayer, LineLayer, SymbolLayer};

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use mapsync_core::spec::{
    LayerKind, LayerSpecification, PropertyMap, SourceRef, StyleSetterOptions, Value, MAX_ZOOM,
    MIN_ZOOM,
};
use mapsync_core::{
    BindingContext, Disposer, EngineError, EngineEvent, EngineEventKind, EngineRef, ReloadHandler,
    ResourceKind, ResourceStatus, Scope, Signal,
};

use crate::handle::ResourceHandle;
use crate::report;

/// Declarative inputs of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerOptions {
    /// Layer id. Generated as `<layer_id_prefix>-<uuid>` when `None`.
    pub id: Option<String>,
    /// The drawing rule.
    pub kind: LayerKind,
    /// Layer within a vector tile source.
    pub source_layer: Option<String>,
    /// Feature filter; `None` matches every feature.
    pub filter: Option<Value>,
    /// Explicit paint properties.
    pub paint: PropertyMap,
    /// Explicit layout properties.
    pub layout: PropertyMap,
    /// Merged style object, partitioned by kind and applied over `paint`/`layout`.
    pub style: PropertyMap,
    /// Lowest zoom at which the layer is drawn.
    pub min_zoom: f64,
    /// Highest zoom at which the layer is drawn.
    pub max_zoom: f64,
    /// Insert the layer below this one.
    pub before_id: Option<String>,
    /// Log engine failures at `error` level.
    pub debug: bool,
}

impl LayerOptions {
    /// Default options for a layer of `kind`.
    pub fn new(kind: LayerKind) -> Self {
        Self {
            id: None,
            kind,
            source_layer: None,
            filter: None,
            paint: PropertyMap::new(),
            layout: PropertyMap::new(),
            style: PropertyMap::new(),
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            before_id: None,
            debug: false,
        }
    }

    /// Sets the layer id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds one paint property.
    pub fn with_paint(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.paint.insert(name.into(), value.into());
        self
    }

    /// Adds one layout property.
    pub fn with_layout(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.layout.insert(name.into(), value.into());
        self
    }

    /// Adds one key to the merged style object.
    pub fn with_style(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.style.insert(name.into(), value.into());
        self
    }

    /// Sets the feature filter.
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Inserts the layer below `before_id`.
    pub fn before(mut self, before_id: impl Into<String>) -> Self {
        self.before_id = Some(before_id.into());
        self
    }
}

/// The latest desired state; used on every (re)creation.
#[derive(Debug)]
struct DesiredLayer {
    source_layer: Option<String>,
    filter: Option<Value>,
    paint: PropertyMap,
    layout: PropertyMap,
    min_zoom: f64,
    max_zoom: f64,
    before_id: Option<String>,
}

fn apply_property(map: &mut PropertyMap, name: &str, value: &Value) {
    if value.is_null() {
        map.remove(name);
    } else {
        map.insert(name.to_string(), value.clone());
    }
}

struct LayerInner {
    id: String,
    kind: LayerKind,
    debug: bool,
    engine: RefCell<Option<EngineRef>>,
    dependency: Signal<Option<SourceRef>>,
    last_dependency: RefCell<Option<SourceRef>>,
    desired: RefCell<DesiredLayer>,
    status: Signal<ResourceStatus>,
    source_wait: RefCell<Option<Disposer>>,
    on_register: Option<Box<dyn Fn(&LayerActions)>>,
    this: Weak<LayerInner>,
}

impl LayerInner {
    fn create(&self) {
        let Some(engine) = self.engine.borrow().clone() else {
            log::trace!("Layer '{}': no ready engine, creation deferred.", self.id);
            return;
        };
        let source = match self.dependency.get() {
            None => {
                log::trace!("Layer '{}': dependency absent, creation deferred.", self.id);
                return;
            }
            Some(SourceRef::Id(id)) if id.is_empty() => {
                log::warn!("Layer '{}': empty source id rejected.", self.id);
                return;
            }
            Some(source) => source,
        };
        if engine.has_layer(&self.id) {
            log::trace!("Layer '{}' already exists on the engine.", self.id);
            return;
        }
        if let SourceRef::Id(source_id) = &source {
            if !engine.has_source(source_id) || !engine.is_source_loaded(source_id) {
                self.await_source(&engine, source_id);
                return;
            }
        }
        self.cancel_source_wait();

        self.status.set(ResourceStatus::Creating);
        let inline = matches!(source, SourceRef::Inline(_));
        let (spec, before_id) = self.specification(&engine, source);
        match engine.add_layer(&spec, before_id.as_deref()) {
            Ok(()) => {
                log::debug!("Layer '{}' ({}) created.", self.id, self.kind);
                self.status.set(ResourceStatus::Created);
                if let (Some(register), Some(actions)) = (&self.on_register, self.actions()) {
                    register(&actions);
                }
            }
            Err(err) => {
                self.failed("add", &err);
                self.roll_back(&engine, inline);
                self.status.set(ResourceStatus::Error);
            }
        }
    }

    /// Undoes whatever a failed `add_layer` left on the engine.
    fn roll_back(&self, engine: &EngineRef, inline: bool) {
        if engine.has_layer(&self.id) {
            if let Err(err) = engine.remove_layer(&self.id) {
                self.failed("rollback", &err);
            }
        }
        if inline {
            self.remove_inline_source(engine, "rollback");
        }
    }

    fn specification(
        &self,
        engine: &EngineRef,
        source: SourceRef,
    ) -> (LayerSpecification, Option<String>) {
        let desired = self.desired.borrow();
        let before_id = match &desired.before_id {
            Some(before) if engine.has_layer(before) => Some(before.clone()),
            Some(before) => {
                log::debug!(
                    "Layer '{}': before-layer '{before}' is missing, adding on top.",
                    self.id
                );
                None
            }
            None => None,
        };
        let spec = LayerSpecification {
            id: self.id.clone(),
            kind: self.kind,
            source,
            source_layer: desired.source_layer.clone(),
            filter: desired.filter.clone(),
            min_zoom: desired.min_zoom,
            max_zoom: desired.max_zoom,
            layout: desired.layout.clone(),
            paint: desired.paint.clone(),
        };
        (spec, before_id)
    }

    /// Arms a one-shot wait for the dependency's data to load.
    fn await_source(&self, engine: &EngineRef, source_id: &str) {
        if self.source_wait.borrow().is_some() {
            return;
        }
        log::trace!("Layer '{}': waiting for source '{source_id}' data.", self.id);
        let this = self.this.clone();
        let expected = source_id.to_string();
        let listener = engine.subscribe(EngineEventKind::SourceData, move |event| {
            if let EngineEvent::SourceData {
                source_id,
                loaded: true,
            } = event
            {
                if *source_id == expected {
                    if let Some(inner) = this.upgrade() {
                        inner.cancel_source_wait();
                        inner.create();
                    }
                }
            }
        });
        *self.source_wait.borrow_mut() = Some(listener);
    }

    fn cancel_source_wait(&self) {
        let pending = self.source_wait.borrow_mut().take();
        drop(pending);
    }

    fn remove(&self) {
        self.cancel_source_wait();
        let engine = self.engine.borrow().clone();
        if let Some(engine) = engine {
            self.remove_from(&engine);
        }
        self.status.set(ResourceStatus::NotCreated);
    }

    fn remove_from(&self, engine: &EngineRef) {
        if engine.has_layer(&self.id) {
            match engine.remove_layer(&self.id) {
                Ok(()) => log::debug!("Layer '{}' removed.", self.id),
                Err(err) => {
                    self.failed("remove", &err);
                    return;
                }
            }
        } else {
            log::trace!("Layer '{}' is not on the engine, nothing to remove.", self.id);
        }
        let inline = matches!(*self.last_dependency.borrow(), Some(SourceRef::Inline(_)));
        if inline {
            self.remove_inline_source(engine, "remove");
        }
    }

    /// Inline sources live under the layer's id.
    fn remove_inline_source(&self, engine: &EngineRef, operation: &str) {
        if !engine.has_source(&self.id) {
            return;
        }
        match engine.remove_source(&self.id) {
            Ok(()) => log::debug!("Layer '{}': inline source removed.", self.id),
            Err(err) => {
                report::engine_failure(self.debug, ResourceKind::Source, &self.id, operation, &err)
            }
        }
    }

    fn dependency_changed(&self, next: &Option<SourceRef>) {
        let previous = self.last_dependency.borrow().clone();
        if previous.is_some() && previous != *next {
            log::debug!("Layer '{}': dependency changed.", self.id);
            self.remove();
        }
        *self.last_dependency.borrow_mut() = next.clone();
        if next.is_some() {
            self.create();
        }
    }

    fn failed(&self, operation: &str, err: &EngineError) {
        report::engine_failure(self.debug, ResourceKind::Layer, &self.id, operation, err);
    }

    /// The engine, but only while it holds this layer.
    fn live_engine(&self) -> Option<EngineRef> {
        let engine = self.engine.borrow().clone()?;
        if engine.has_layer(&self.id) {
            Some(engine)
        } else {
            log::trace!("Layer '{}' is not live, engine update skipped.", self.id);
            None
        }
    }

    fn actions(&self) -> Option<LayerActions> {
        self.this.upgrade().map(|inner| LayerActions { inner })
    }
}

impl ReloadHandler for LayerInner {
    fn on_ready(&self, engine: &EngineRef) {
        *self.engine.borrow_mut() = Some(engine.clone());
        self.create();
    }

    fn on_teardown(&self, engine: &EngineRef) {
        self.cancel_source_wait();
        self.remove_from(engine);
        self.engine.borrow_mut().take();
        self.status.set(ResourceStatus::NotCreated);
    }
}

/// The action object of a layer: its identity, observable status, and setters.
///
/// Cloning shares the same layer. Equality is identity.
#[derive(Clone)]
pub struct LayerActions {
    inner: Rc<LayerInner>,
}

impl LayerActions {
    /// The layer id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The layer kind.
    pub fn kind(&self) -> LayerKind {
        self.inner.kind
    }

    /// The observable lifecycle status.
    pub fn status(&self) -> Signal<ResourceStatus> {
        self.inner.status.clone()
    }

    /// The source dependency this layer observes.
    pub fn dependency(&self) -> Signal<Option<SourceRef>> {
        self.inner.dependency.clone()
    }

    /// Creates the layer if the engine and the dependency are ready and it
    /// does not exist yet. No-op otherwise.
    pub fn create(&self) {
        self.inner.create();
    }

    /// Removes the layer. Idempotent; always leaves the status `NotCreated`.
    pub fn remove(&self) {
        self.inner.remove();
    }

    /// The live layer, if the engine currently holds it.
    pub fn live_handle(&self) -> Option<ResourceHandle> {
        self.inner.live_engine().map(|engine| ResourceHandle {
            id: self.inner.id.clone(),
            kind: ResourceKind::Layer,
            engine,
        })
    }

    /// Replaces the feature filter. `None` matches every feature.
    pub fn set_filter(&self, filter: Option<Value>) {
        self.inner.desired.borrow_mut().filter = filter.clone();
        if let Some(engine) = self.inner.live_engine() {
            if let Err(err) = engine.set_filter(self.id(), filter.as_ref()) {
                self.inner.failed("set filter", &err);
            }
        }
    }

    /// Sets the zoom range. Invalid ranges are logged and ignored.
    pub fn set_zoom_range(&self, min_zoom: f64, max_zoom: f64) {
        if let Err(err) = validate::zoom_range(min_zoom, max_zoom) {
            log::warn!("Layer '{}': {err}", self.id());
            return;
        }
        {
            let mut desired = self.inner.desired.borrow_mut();
            desired.min_zoom = min_zoom;
            desired.max_zoom = max_zoom;
        }
        if let Some(engine) = self.inner.live_engine() {
            if let Err(err) = engine.set_layer_zoom_range(self.id(), min_zoom, max_zoom) {
                self.inner.failed("set zoom range", &err);
            }
        }
    }

    /// Moves the layer below `before_id`, or to the top when `None`.
    pub fn set_before_id(&self, before_id: Option<String>) {
        self.inner.desired.borrow_mut().before_id = before_id.clone();
        let Some(engine) = self.inner.live_engine() else {
            return;
        };
        let target = before_id.filter(|before| engine.has_layer(before));
        if let Err(err) = engine.move_layer(self.id(), target.as_deref()) {
            self.inner.failed("move", &err);
        }
    }

    /// Sets one paint property. `Value::Null` resets it.
    pub fn set_paint_property(&self, name: &str, value: Value, options: &StyleSetterOptions) {
        apply_property(&mut self.inner.desired.borrow_mut().paint, name, &value);
        if let Some(engine) = self.inner.live_engine() {
            if let Err(err) = engine.set_paint_property(self.id(), name, &value, options) {
                self.inner.failed(name, &err);
            }
        }
    }

    /// Sets one layout property. `Value::Null` resets it.
    pub fn set_layout_property(&self, name: &str, value: Value, options: &StyleSetterOptions) {
        apply_property(&mut self.inner.desired.borrow_mut().layout, name, &value);
        if let Some(engine) = self.inner.live_engine() {
            if let Err(err) = engine.set_layout_property(self.id(), name, &value, options) {
                self.inner.failed(name, &err);
            }
        }
    }

    /// Shows or hides the layer.
    pub fn set_visibility(&self, visible: bool) {
        let value = if visible { "visible" } else { "none" };
        self.layout("visibility", Value::from(value));
    }

    /// Routes every key of `style` to the paint or layout setter of this
    /// layer's kind. Unknown keys are dropped.
    pub fn set_style(&self, style: &PropertyMap) {
        let partition = kinds::partition_style(self.kind(), style);
        for key in &partition.unknown {
            log::debug!(
                "Layer '{}': unknown {} style key '{key}' dropped.",
                self.id(),
                self.kind()
            );
        }
        let options = StyleSetterOptions::default();
        for (name, value) in partition.paint {
            self.set_paint_property(&name, value, &options);
        }
        for (name, value) in partition.layout {
            self.set_layout_property(&name, value, &options);
        }
    }

    pub(crate) fn paint(&self, name: &str, value: Value) {
        self.set_paint_property(name, value, &StyleSetterOptions::default());
    }

    pub(crate) fn layout(&self, name: &str, value: Value) {
        self.set_layout_property(name, value, &StyleSetterOptions::default());
    }
}

impl PartialEq for LayerActions {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LayerActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerActions")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("status", &self.inner.status.get())
            .finish()
    }
}

/// Owns one engine layer for as long as it lives.
///
/// Dropping the factory detaches every watcher and removes the layer exactly
/// once.
pub struct LayerFactory {
    actions: LayerActions,
    _scope: Scope,
}

impl LayerFactory {
    /// Creates a factory drawing from `dependency`.
    pub fn new(
        context: &BindingContext,
        dependency: Signal<Option<SourceRef>>,
        options: LayerOptions,
    ) -> Self {
        Self::build(context, dependency, options, None)
    }

    /// Like [`new`](Self::new), with a callback invoked once per successful
    /// (re)creation.
    pub fn with_registration(
        context: &BindingContext,
        dependency: Signal<Option<SourceRef>>,
        options: LayerOptions,
        on_register: impl Fn(&LayerActions) + 'static,
    ) -> Self {
        Self::build(context, dependency, options, Some(Box::new(on_register)))
    }

    fn build(
        context: &BindingContext,
        dependency: Signal<Option<SourceRef>>,
        options: LayerOptions,
        on_register: Option<Box<dyn Fn(&LayerActions)>>,
    ) -> Self {
        let settings = context.settings();
        let id = report::resolve_id(options.id, &settings.layer_id_prefix, ResourceKind::Layer);

        let (min_zoom, max_zoom) = match validate::zoom_range(options.min_zoom, options.max_zoom) {
            Ok(()) => (options.min_zoom, options.max_zoom),
            Err(err) => {
                log::warn!("Layer '{id}': {err}, using the full range.");
                (MIN_ZOOM, MAX_ZOOM)
            }
        };

        let mut paint = options.paint;
        let mut layout = options.layout;
        let partition = kinds::partition_style(options.kind, &options.style);
        for key in &partition.unknown {
            log::debug!("Layer '{id}': unknown {} style key '{key}' dropped.", options.kind);
        }
        paint.extend(partition.paint);
        layout.extend(partition.layout);

        let last_dependency = dependency.get();
        let inner = Rc::new_cyclic(|this| LayerInner {
            id,
            kind: options.kind,
            debug: options.debug || settings.debug,
            engine: RefCell::new(None),
            dependency: dependency.clone(),
            last_dependency: RefCell::new(last_dependency),
            desired: RefCell::new(DesiredLayer {
                source_layer: options.source_layer,
                filter: options.filter,
                paint,
                layout,
                min_zoom,
                max_zoom,
                before_id: options.before_id,
            }),
            status: Signal::new(ResourceStatus::NotCreated),
            source_wait: RefCell::new(None),
            on_register,
            this: this.clone(),
        });

        let scope = Scope::new();
        scope.add(context.reload().observe(inner.clone()).into_disposer());
        let removal = Rc::downgrade(&inner);
        scope.on_dispose(move || {
            if let Some(inner) = removal.upgrade() {
                inner.remove();
            }
        });
        let watched = Rc::downgrade(&inner);
        scope.add(dependency.watch(move |next| {
            if let Some(inner) = watched.upgrade() {
                inner.dependency_changed(next);
            }
        }));

        Self {
            actions: LayerActions { inner },
            _scope: scope,
        }
    }

    /// The layer's action object.
    pub fn actions(&self) -> &LayerActions {
        &self.actions
    }
}

impl Deref for LayerFactory {
    type Target = LayerActions;

    fn deref(&self) -> &Self::Target {
        &self.actions
    }
}

impl fmt::Debug for LayerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LayerFactory").field(&self.actions).finish()
    }
}
