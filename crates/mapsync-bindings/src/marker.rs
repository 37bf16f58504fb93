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

//! The marker factory.
//!
//! A marker may toggle a popup by id. While a popup is attached the marker's
//! status follows it: `Open` while the popup shows, `Closed` otherwise.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use mapsync_core::spec::{LngLat, MarkerSpec};
use mapsync_core::{
    BindingContext, Disposer, EngineError, EngineEvent, EngineEventKind, EngineRef,
    MarkerStatus, ReloadHandler, ResourceKind, Scope, Signal,
};

use crate::handle::ResourceHandle;
use crate::report;

/// Declarative inputs of a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    /// Marker id. Generated as `<marker_id_prefix>-<uuid>` when `None`.
    pub id: Option<String>,
    /// Position, appearance and attached popup.
    pub spec: MarkerSpec,
    /// Log engine failures at `error` level.
    pub debug: bool,
}

impl MarkerOptions {
    /// Options for a default marker at `lng_lat`.
    pub fn at(lng_lat: LngLat) -> Self {
        Self {
            id: None,
            spec: MarkerSpec::at(lng_lat),
            debug: false,
        }
    }

    /// Sets the marker id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attaches a popup by id.
    pub fn with_popup(mut self, popup_id: impl Into<String>) -> Self {
        self.spec.popup = Some(popup_id.into());
        self
    }
}

struct MarkerInner {
    id: String,
    debug: bool,
    engine: RefCell<Option<EngineRef>>,
    spec: RefCell<MarkerSpec>,
    status: Signal<MarkerStatus>,
    listeners: RefCell<Vec<Disposer>>,
    this: Weak<MarkerInner>,
}

impl MarkerInner {
    fn create(&self) {
        let Some(engine) = self.engine.borrow().clone() else {
            log::trace!("Marker '{}': no ready engine, creation deferred.", self.id);
            return;
        };
        if engine.has_marker(&self.id) {
            log::trace!("Marker '{}' already exists on the engine.", self.id);
            return;
        }

        self.status.set(MarkerStatus::Creating);
        // The popup is attached separately, once it exists.
        let spec = MarkerSpec {
            popup: None,
            ..self.spec.borrow().clone()
        };
        if let Err(err) = engine.add_marker(&self.id, &spec) {
            self.failed("add", &err);
            if engine.has_marker(&self.id) {
                if let Err(err) = engine.remove_marker(&self.id) {
                    self.failed("rollback", &err);
                }
            }
            self.status.set(MarkerStatus::Error);
            return;
        }
        log::debug!("Marker '{}' created.", self.id);
        self.status.set(MarkerStatus::Created);
        self.follow_popup(&engine);
        if self.spec.borrow().popup.is_some() {
            self.bind_popup(&engine);
        }
    }

    fn follow_popup(&self, engine: &EngineRef) {
        self.stop_following();
        for kind in [EngineEventKind::PopupOpen, EngineEventKind::PopupClose] {
            let this = self.this.clone();
            let listener = engine.subscribe(kind, move |event| {
                let Some(inner) = this.upgrade() else {
                    return;
                };
                let (popup_id, status) = match event {
                    EngineEvent::PopupOpen { popup_id } => (popup_id, MarkerStatus::Open),
                    EngineEvent::PopupClose { popup_id } => (popup_id, MarkerStatus::Closed),
                    _ => return,
                };
                let attached = inner.spec.borrow().popup.as_deref() == Some(popup_id.as_str());
                if attached && inner.status.get().is_live() {
                    inner.status.set(status);
                }
            });
            self.listeners.borrow_mut().push(listener);
        }
    }

    fn stop_following(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        drop(listeners);
    }

    /// Attaches the desired popup on the engine and derives the status from it.
    fn bind_popup(&self, engine: &EngineRef) {
        let popup = self.spec.borrow().popup.clone();
        let popup = match popup {
            Some(popup) if engine.has_popup(&popup) => Some(popup),
            Some(popup) => {
                log::debug!(
                    "Marker '{}': popup '{popup}' is not on the engine, left detached.",
                    self.id
                );
                None
            }
            None => None,
        };
        if let Err(err) = engine.set_marker_popup(&self.id, popup.as_deref()) {
            self.failed("attach popup", &err);
            return;
        }
        let status = match popup {
            Some(popup) if engine.is_popup_open(&popup) => MarkerStatus::Open,
            Some(_) => MarkerStatus::Closed,
            None => MarkerStatus::Created,
        };
        self.status.set(status);
    }

    fn remove(&self) {
        let engine = self.engine.borrow().clone();
        if let Some(engine) = engine {
            self.remove_from(&engine);
        }
        self.status.set(MarkerStatus::NotCreated);
    }

    fn remove_from(&self, engine: &EngineRef) {
        self.stop_following();
        if !engine.has_marker(&self.id) {
            log::trace!("Marker '{}' is not on the engine, nothing to remove.", self.id);
            return;
        }
        match engine.remove_marker(&self.id) {
            Ok(()) => log::debug!("Marker '{}' removed.", self.id),
            Err(err) => self.failed("remove", &err),
        }
    }

    fn live_engine(&self) -> Option<EngineRef> {
        let engine = self.engine.borrow().clone()?;
        if engine.has_marker(&self.id) {
            Some(engine)
        } else {
            log::trace!("Marker '{}' is not live, engine update skipped.", self.id);
            None
        }
    }

    fn failed(&self, operation: &str, err: &EngineError) {
        report::engine_failure(self.debug, ResourceKind::Marker, &self.id, operation, err);
    }
}

impl ReloadHandler for MarkerInner {
    fn on_ready(&self, engine: &EngineRef) {
        *self.engine.borrow_mut() = Some(engine.clone());
        self.create();
    }

    fn on_teardown(&self, engine: &EngineRef) {
        self.remove_from(engine);
        self.engine.borrow_mut().take();
        self.status.set(MarkerStatus::NotCreated);
    }
}

/// The action object of a marker.
#[derive(Clone)]
pub struct MarkerActions {
    inner: Rc<MarkerInner>,
}

impl MarkerActions {
    /// The marker id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The observable lifecycle status.
    pub fn status(&self) -> Signal<MarkerStatus> {
        self.inner.status.clone()
    }

    /// Places the marker if the engine is ready.
    pub fn create(&self) {
        self.inner.create();
    }

    /// Moves the marker.
    pub fn set_lng_lat(&self, lng_lat: LngLat) {
        self.inner.spec.borrow_mut().lng_lat = lng_lat;
        if let Some(engine) = self.inner.live_engine() {
            if let Err(err) = engine.set_marker_lng_lat(self.id(), lng_lat) {
                self.inner.failed("move", &err);
            }
        }
    }

    /// Enables or disables dragging.
    pub fn set_draggable(&self, draggable: bool) {
        self.inner.spec.borrow_mut().draggable = draggable;
        if let Some(engine) = self.inner.live_engine() {
            if let Err(err) = engine.set_marker_draggable(self.id(), draggable) {
                self.inner.failed("set draggable", &err);
            }
        }
    }

    /// Attaches the popup registered under `popup_id`, or detaches with `None`.
    pub fn attach_popup(&self, popup_id: Option<String>) {
        self.inner.spec.borrow_mut().popup = popup_id;
        if let Some(engine) = self.inner.live_engine() {
            self.inner.bind_popup(&engine);
        }
    }

    /// Removes the marker. Idempotent.
    pub fn remove(&self) {
        self.inner.remove();
    }

    /// The live marker, if the engine currently holds it.
    pub fn live_handle(&self) -> Option<ResourceHandle> {
        self.inner.live_engine().map(|engine| ResourceHandle {
            id: self.inner.id.clone(),
            kind: ResourceKind::Marker,
            engine,
        })
    }
}

impl PartialEq for MarkerActions {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MarkerActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerActions")
            .field("id", &self.inner.id)
            .field("status", &self.inner.status.get())
            .finish()
    }
}

/// Owns one engine marker for as long as it lives.
pub struct MarkerFactory {
    actions: MarkerActions,
    _scope: Scope,
}

impl MarkerFactory {
    /// Creates a factory for `options`.
    pub fn new(context: &BindingContext, options: MarkerOptions) -> Self {
        let settings = context.settings();
        let id = report::resolve_id(options.id, &settings.marker_id_prefix, ResourceKind::Marker);
        let inner = Rc::new_cyclic(|this| MarkerInner {
            id,
            debug: options.debug || settings.debug,
            engine: RefCell::new(None),
            spec: RefCell::new(options.spec),
            status: Signal::new(MarkerStatus::NotCreated),
            listeners: RefCell::new(Vec::new()),
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

        Self {
            actions: MarkerActions { inner },
            _scope: scope,
        }
    }

    /// The marker's action object.
    pub fn actions(&self) -> &MarkerActions {
        &self.actions
    }
}

impl Deref for MarkerFactory {
    type Target = MarkerActions;

    fn deref(&self) -> &Self::Target {
        &self.actions
    }
}

impl fmt::Debug for MarkerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MarkerFactory").field(&self.actions).finish()
    }
}
