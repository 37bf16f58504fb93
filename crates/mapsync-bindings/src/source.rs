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

//! The source factory.
//!
//! Readiness is two-phase: the factory's `dependency` signal stays `None`
//! until the engine has both accepted the source and reported its data as
//! loaded. Layers observing that signal therefore never bind to a
//! half-initialized source.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use mapsync_core::spec::{SourceData, SourceRef, SourceSpec};
use mapsync_core::{
    BindingContext, Disposer, EngineError, EngineEvent, EngineEventKind, EngineRef,
    ReloadHandler, ResourceKind, Scope, Signal, SourceStatus,
};

use crate::handle::ResourceHandle;
use crate::report;

/// Declarative inputs of a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOptions {
    /// Source id. Generated as `<source_id_prefix>-<uuid>` when `None`.
    pub id: Option<String>,
    /// Type, payload and engine options.
    pub spec: SourceSpec,
    /// Log engine failures at `error` level.
    pub debug: bool,
}

impl SourceOptions {
    /// Options registering `spec` under a generated id.
    pub fn new(spec: SourceSpec) -> Self {
        Self {
            id: None,
            spec,
            debug: false,
        }
    }

    /// Sets the source id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

struct SourceInner {
    id: String,
    debug: bool,
    engine: RefCell<Option<EngineRef>>,
    spec: RefCell<SourceSpec>,
    status: Signal<SourceStatus>,
    dependency: Signal<Option<SourceRef>>,
    load_listeners: RefCell<Vec<Disposer>>,
    on_register: Option<Box<dyn Fn(&SourceActions)>>,
    this: Weak<SourceInner>,
}

impl SourceInner {
    fn create(&self) {
        let Some(engine) = self.engine.borrow().clone() else {
            log::trace!("Source '{}': no ready engine, creation deferred.", self.id);
            return;
        };
        if engine.has_source(&self.id) {
            log::trace!("Source '{}' already exists on the engine.", self.id);
            return;
        }

        self.status.set(SourceStatus::Creating);
        self.listen_for_data(&engine);
        let spec = self.spec.borrow().clone();
        match engine.add_source(&self.id, &spec) {
            Ok(()) => {
                log::debug!("Source '{}' added.", self.id);
                // The engine may already have delivered the loaded event.
                if self.status.get() != SourceStatus::Creating {
                    return;
                }
                self.status.set(SourceStatus::Created);
                if engine.is_source_loaded(&self.id) {
                    self.data_loaded();
                } else {
                    self.status.set(SourceStatus::Loading);
                }
            }
            Err(err) => {
                self.failed("add", &err);
                self.stop_listening();
                if engine.has_source(&self.id) {
                    if let Err(err) = engine.remove_source(&self.id) {
                        self.failed("rollback", &err);
                    }
                }
                self.status.set(SourceStatus::Error);
            }
        }
    }

    /// Subscribes once to the outcome of this source's data load.
    fn listen_for_data(&self, engine: &EngineRef) {
        let this = self.this.clone();
        let expected = self.id.clone();
        let loaded = engine.subscribe(EngineEventKind::SourceData, move |event| {
            if let EngineEvent::SourceData {
                source_id,
                loaded: true,
            } = event
            {
                if *source_id == expected {
                    if let Some(inner) = this.upgrade() {
                        inner.data_loaded();
                    }
                }
            }
        });
        let this = self.this.clone();
        let expected = self.id.clone();
        let failed = engine.subscribe(EngineEventKind::Error, move |event| {
            if let EngineEvent::Error {
                message,
                source_id: Some(source_id),
            } = event
            {
                if *source_id == expected {
                    if let Some(inner) = this.upgrade() {
                        inner.data_failed(message);
                    }
                }
            }
        });
        let previous = self.load_listeners.replace(vec![loaded, failed]);
        drop(previous);
    }

    fn stop_listening(&self) {
        let listeners = std::mem::take(&mut *self.load_listeners.borrow_mut());
        drop(listeners);
    }

    /// The source stays on the engine, but dependents are never released.
    fn data_failed(&self, message: &str) {
        self.stop_listening();
        let err = EngineError::SourceLoad {
            id: self.id.clone(),
            reason: message.to_string(),
        };
        self.failed("load", &err);
        self.status.set(SourceStatus::Error);
    }

    /// First loaded event wins; the listener is detached afterwards.
    fn data_loaded(&self) {
        self.stop_listening();
        if self.status.get() == SourceStatus::Loaded {
            return;
        }
        log::debug!("Source '{}' data loaded.", self.id);
        self.status.set(SourceStatus::Loaded);
        self.dependency.set(Some(SourceRef::Id(self.id.clone())));
        if let (Some(register), Some(actions)) = (&self.on_register, self.actions()) {
            register(&actions);
        }
    }

    fn set_data(&self, data: SourceData) {
        self.spec.borrow_mut().data = data.clone();
        let Some(engine) = self.engine.borrow().clone() else {
            return;
        };
        if !engine.has_source(&self.id) {
            log::trace!("Source '{}' is not live, data stored for creation.", self.id);
            return;
        }
        if let Err(err) = engine.set_source_data(&self.id, &data) {
            self.failed("set data", &err);
        }
    }

    fn remove(&self) {
        let engine = self.engine.borrow().clone();
        match engine {
            Some(engine) => self.remove_from(&engine),
            None => {
                self.stop_listening();
                self.dependency.set(None);
            }
        }
        self.status.set(SourceStatus::NotCreated);
    }

    fn remove_from(&self, engine: &EngineRef) {
        self.stop_listening();
        // Dependents tear down their layers before the source goes away.
        self.dependency.set(None);
        if !engine.has_source(&self.id) {
            log::trace!("Source '{}' is not on the engine, nothing to remove.", self.id);
            return;
        }
        match engine.remove_source(&self.id) {
            Ok(()) => log::debug!("Source '{}' removed.", self.id),
            Err(err) => self.failed("remove", &err),
        }
    }

    fn failed(&self, operation: &str, err: &EngineError) {
        report::engine_failure(self.debug, ResourceKind::Source, &self.id, operation, err);
    }

    fn actions(&self) -> Option<SourceActions> {
        self.this.upgrade().map(|inner| SourceActions { inner })
    }
}

impl ReloadHandler for SourceInner {
    fn on_ready(&self, engine: &EngineRef) {
        *self.engine.borrow_mut() = Some(engine.clone());
        self.create();
    }

    fn on_teardown(&self, engine: &EngineRef) {
        self.remove_from(engine);
        self.engine.borrow_mut().take();
        self.status.set(SourceStatus::NotCreated);
    }
}

/// The action object of a source.
///
/// Cloning shares the same source. Equality is identity.
#[derive(Clone)]
pub struct SourceActions {
    inner: Rc<SourceInner>,
}

impl SourceActions {
    /// The source id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The observable lifecycle status.
    pub fn status(&self) -> Signal<SourceStatus> {
        self.inner.status.clone()
    }

    /// The dependency handle for layers: `Some(Id(id))` only while the source
    /// exists and its data is loaded.
    pub fn dependency(&self) -> Signal<Option<SourceRef>> {
        self.inner.dependency.clone()
    }

    /// The current source description, including the latest data.
    pub fn spec(&self) -> SourceSpec {
        self.inner.spec.borrow().clone()
    }

    /// Creates the source if the engine is ready and it does not exist yet.
    pub fn create(&self) {
        self.inner.create();
    }

    /// Replaces the source's data in place. The source is never recreated.
    pub fn set_data(&self, data: SourceData) {
        self.inner.set_data(data);
    }

    /// Removes the source. Idempotent.
    pub fn remove(&self) {
        self.inner.remove();
    }

    /// The live source, if the engine currently holds it.
    pub fn live_handle(&self) -> Option<ResourceHandle> {
        let engine = self.inner.engine.borrow().clone()?;
        engine.has_source(self.id()).then(|| ResourceHandle {
            id: self.inner.id.clone(),
            kind: ResourceKind::Source,
            engine,
        })
    }
}

impl PartialEq for SourceActions {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SourceActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceActions")
            .field("id", &self.inner.id)
            .field("status", &self.inner.status.get())
            .finish()
    }
}

/// Owns one engine source for as long as it lives.
pub struct SourceFactory {
    actions: SourceActions,
    _scope: Scope,
}

impl SourceFactory {
    /// Creates a factory for `options`.
    pub fn new(context: &BindingContext, options: SourceOptions) -> Self {
        Self::build(context, options, None)
    }

    /// Like [`new`](Self::new), with a callback invoked once per successful
    /// (re)creation, when the data has loaded.
    pub fn with_registration(
        context: &BindingContext,
        options: SourceOptions,
        on_register: impl Fn(&SourceActions) + 'static,
    ) -> Self {
        Self::build(context, options, Some(Box::new(on_register)))
    }

    fn build(
        context: &BindingContext,
        options: SourceOptions,
        on_register: Option<Box<dyn Fn(&SourceActions)>>,
    ) -> Self {
        let settings = context.settings();
        let id = report::resolve_id(options.id, &settings.source_id_prefix, ResourceKind::Source);
        let inner = Rc::new_cyclic(|this| SourceInner {
            id,
            debug: options.debug || settings.debug,
            engine: RefCell::new(None),
            spec: RefCell::new(options.spec),
            status: Signal::new(SourceStatus::NotCreated),
            dependency: Signal::new(None),
            load_listeners: RefCell::new(Vec::new()),
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

        Self {
            actions: SourceActions { inner },
            _scope: scope,
        }
    }

    /// The source's action object.
    pub fn actions(&self) -> &SourceActions {
        &self.actions
    }
}

impl Deref for SourceFactory {
    type Target = SourceActions;

    fn deref(&self) -> &Self::Target {
        &self.actions
    }
}

impl fmt::Debug for SourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceFactory").field(&self.actions).finish()
    }
}
