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

//! The popup factory.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use mapsync_core::spec::{LngLat, PopupContent, PopupSpec};
use mapsync_core::{
    BindingContext, Disposer, EngineError, EngineEvent, EngineEventKind, EngineRef, PopupStatus,
    ReloadHandler, ResourceKind, Scope, Signal,
};

use crate::handle::ResourceHandle;
use crate::report;

/// Declarative inputs of a popup.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupOptions {
    /// Popup id. Generated as `<popup_id_prefix>-<uuid>` when `None`.
    pub id: Option<String>,
    /// Position, content and behaviour.
    pub spec: PopupSpec,
    /// Show the popup as soon as it is created.
    pub open: bool,
    /// Log engine failures at `error` level.
    pub debug: bool,
}

impl PopupOptions {
    /// Options for a hidden popup.
    pub fn new(spec: PopupSpec) -> Self {
        Self {
            id: None,
            spec,
            open: false,
            debug: false,
        }
    }

    /// Sets the popup id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

struct PopupInner {
    id: String,
    debug: bool,
    engine: RefCell<Option<EngineRef>>,
    spec: RefCell<PopupSpec>,
    want_open: Cell<bool>,
    status: Signal<PopupStatus>,
    listeners: RefCell<Vec<Disposer>>,
    this: Weak<PopupInner>,
}

impl PopupInner {
    fn create(&self) {
        let Some(engine) = self.engine.borrow().clone() else {
            log::trace!("Popup '{}': no ready engine, creation deferred.", self.id);
            return;
        };
        if engine.has_popup(&self.id) {
            log::trace!("Popup '{}' already exists on the engine.", self.id);
            return;
        }

        self.status.set(PopupStatus::Creating);
        let spec = self.spec.borrow().clone();
        if let Err(err) = engine.add_popup(&self.id, &spec) {
            self.failed("add", &err);
            if engine.has_popup(&self.id) {
                if let Err(err) = engine.remove_popup(&self.id) {
                    self.failed("rollback", &err);
                }
            }
            self.status.set(PopupStatus::Error);
            return;
        }
        log::debug!("Popup '{}' created.", self.id);
        self.status.set(PopupStatus::Created);
        self.follow_visibility(&engine);

        if self.want_open.get() {
            self.show(&engine, true);
        } else {
            self.status.set(PopupStatus::Closed);
        }
    }

    /// Mirrors engine-side open/close, including closes initiated by the user.
    fn follow_visibility(&self, engine: &EngineRef) {
        self.stop_following();
        for kind in [EngineEventKind::PopupOpen, EngineEventKind::PopupClose] {
            let this = self.this.clone();
            let listener = engine.subscribe(kind, move |event| {
                let Some(inner) = this.upgrade() else {
                    return;
                };
                match event {
                    EngineEvent::PopupOpen { popup_id } if *popup_id == inner.id => {
                        inner.want_open.set(true);
                        inner.status.set(PopupStatus::Open);
                    }
                    EngineEvent::PopupClose { popup_id } if *popup_id == inner.id => {
                        inner.want_open.set(false);
                        inner.status.set(PopupStatus::Closed);
                    }
                    _ => {}
                }
            });
            self.listeners.borrow_mut().push(listener);
        }
    }

    fn stop_following(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        drop(listeners);
    }

    fn show(&self, engine: &EngineRef, open: bool) {
        match engine.set_popup_open(&self.id, open) {
            Ok(()) => {
                let status = if open {
                    PopupStatus::Open
                } else {
                    PopupStatus::Closed
                };
                self.status.set(status);
            }
            Err(err) => self.failed(if open { "open" } else { "close" }, &err),
        }
    }

    fn set_open(&self, open: bool) {
        self.want_open.set(open);
        if let Some(engine) = self.live_engine() {
            self.show(&engine, open);
        }
    }

    fn remove(&self) {
        let engine = self.engine.borrow().clone();
        if let Some(engine) = engine {
            self.remove_from(&engine);
        }
        self.status.set(PopupStatus::NotCreated);
    }

    fn remove_from(&self, engine: &EngineRef) {
        self.stop_following();
        if !engine.has_popup(&self.id) {
            log::trace!("Popup '{}' is not on the engine, nothing to remove.", self.id);
            return;
        }
        match engine.remove_popup(&self.id) {
            Ok(()) => log::debug!("Popup '{}' removed.", self.id),
            Err(err) => self.failed("remove", &err),
        }
    }

    fn live_engine(&self) -> Option<EngineRef> {
        let engine = self.engine.borrow().clone()?;
        if engine.has_popup(&self.id) {
            Some(engine)
        } else {
            log::trace!("Popup '{}' is not live, engine update skipped.", self.id);
            None
        }
    }

    fn failed(&self, operation: &str, err: &EngineError) {
        report::engine_failure(self.debug, ResourceKind::Popup, &self.id, operation, err);
    }
}

impl ReloadHandler for PopupInner {
    fn on_ready(&self, engine: &EngineRef) {
        *self.engine.borrow_mut() = Some(engine.clone());
        self.create();
    }

    fn on_teardown(&self, engine: &EngineRef) {
        self.remove_from(engine);
        self.engine.borrow_mut().take();
        self.status.set(PopupStatus::NotCreated);
    }
}

/// The action object of a popup.
#[derive(Clone)]
pub struct PopupActions {
    inner: Rc<PopupInner>,
}

impl PopupActions {
    /// The popup id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The observable lifecycle status.
    pub fn status(&self) -> Signal<PopupStatus> {
        self.inner.status.clone()
    }

    /// Returns `true` while the popup is showing.
    pub fn is_open(&self) -> bool {
        self.inner.status.get() == PopupStatus::Open
    }

    /// Registers the popup if the engine is ready.
    pub fn create(&self) {
        self.inner.create();
    }

    /// Shows the popup, now or as soon as it is created.
    pub fn open(&self) {
        self.inner.set_open(true);
    }

    /// Hides the popup.
    pub fn close(&self) {
        self.inner.set_open(false);
    }

    /// Moves the popup.
    pub fn set_lng_lat(&self, lng_lat: LngLat) {
        self.inner.spec.borrow_mut().lng_lat = Some(lng_lat);
        if let Some(engine) = self.inner.live_engine() {
            if let Err(err) = engine.set_popup_lng_lat(self.id(), lng_lat) {
                self.inner.failed("move", &err);
            }
        }
    }

    /// Replaces the popup body.
    pub fn set_content(&self, content: PopupContent) {
        self.inner.spec.borrow_mut().content = content.clone();
        if let Some(engine) = self.inner.live_engine() {
            if let Err(err) = engine.set_popup_content(self.id(), &content) {
                self.inner.failed("set content", &err);
            }
        }
    }

    /// Removes the popup. Idempotent.
    pub fn remove(&self) {
        self.inner.remove();
    }

    /// The live popup, if the engine currently holds it.
    pub fn live_handle(&self) -> Option<ResourceHandle> {
        self.inner.live_engine().map(|engine| ResourceHandle {
            id: self.inner.id.clone(),
            kind: ResourceKind::Popup,
            engine,
        })
    }
}

impl PartialEq for PopupActions {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for PopupActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupActions")
            .field("id", &self.inner.id)
            .field("status", &self.inner.status.get())
            .finish()
    }
}

/// Owns one engine popup for as long as it lives.
pub struct PopupFactory {
    actions: PopupActions,
    _scope: Scope,
}

impl PopupFactory {
    /// Creates a factory for `options`.
    pub fn new(context: &BindingContext, options: PopupOptions) -> Self {
        let settings = context.settings();
        let id = report::resolve_id(options.id, &settings.popup_id_prefix, ResourceKind::Popup);
        let inner = Rc::new_cyclic(|this| PopupInner {
            id,
            debug: options.debug || settings.debug,
            engine: RefCell::new(None),
            spec: RefCell::new(options.spec),
            want_open: Cell::new(options.open),
            status: Signal::new(PopupStatus::NotCreated),
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
            actions: PopupActions { inner },
            _scope: scope,
        }
    }

    /// The popup's action object.
    pub fn actions(&self) -> &PopupActions {
        &self.actions
    }
}

impl Deref for PopupFactory {
    type Target = PopupActions;

    fn deref(&self) -> &Self::Target {
        &self.actions
    }
}

impl fmt::Debug for PopupFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PopupFactory").field(&self.actions).finish()
    }
}
