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

//! The image factory.
//!
//! Images given as pixels are registered directly. Images given as a url are
//! fetched through the engine first; every fetch is tagged with a generation
//! number so a completion that arrives after a reload or removal is dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use mapsync_core::spec::{ImageData, ImageSpec};
use mapsync_core::{
    BindingContext, BindingError, EngineError, EngineRef, ImageStatus, ReloadHandler,
    ResourceKind, Scope, Signal,
};

use crate::handle::ResourceHandle;
use crate::report;

type Waiter = flume::Sender<Result<(), BindingError>>;

/// Where an image's pixels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Decoded pixels held in memory.
    Data(ImageData),
    /// A url fetched and decoded by the engine.
    Url(String),
}

/// Declarative inputs of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    /// Image id, referenced by `icon-image` or `*-pattern` properties.
    /// Generated as `<image_id_prefix>-<uuid>` when `None`.
    pub id: Option<String>,
    /// The pixels.
    pub source: ImageSource,
    /// Pixel ratio and SDF flag.
    pub spec: ImageSpec,
    /// Log engine failures at `error` level.
    pub debug: bool,
}

impl ImageOptions {
    /// Options for an image named `id`.
    pub fn new(id: impl Into<String>, source: ImageSource) -> Self {
        Self {
            id: Some(id.into()),
            source,
            spec: ImageSpec::default(),
            debug: false,
        }
    }
}

struct ImageInner {
    id: String,
    debug: bool,
    engine: RefCell<Option<EngineRef>>,
    source: RefCell<ImageSource>,
    spec: ImageSpec,
    status: Signal<ImageStatus>,
    generation: Cell<u64>,
    last_error: RefCell<Option<EngineError>>,
    waiters: RefCell<Vec<Waiter>>,
    on_register: Option<Box<dyn Fn(&ImageActions)>>,
    this: Weak<ImageInner>,
}

impl ImageInner {
    fn create(&self) {
        let Some(engine) = self.engine.borrow().clone() else {
            log::trace!("Image '{}': no ready engine, creation deferred.", self.id);
            return;
        };
        match self.status.get() {
            ImageStatus::Loading => {
                log::trace!("Image '{}' is already loading.", self.id);
                return;
            }
            ImageStatus::Created if engine.has_image(&self.id) => {
                log::trace!("Image '{}' already exists on the engine.", self.id);
                return;
            }
            _ => {}
        }

        let source = self.source.borrow().clone();
        match source {
            ImageSource::Data(data) => self.register(&engine, &data),
            ImageSource::Url(url) => {
                let generation = self.next_generation();
                self.status.set(ImageStatus::Loading);
                log::debug!("Image '{}': loading '{url}'.", self.id);
                let this = self.this.clone();
                engine.load_image(
                    &url,
                    Box::new(move |result| {
                        if let Some(inner) = this.upgrade() {
                            inner.loaded(generation, result);
                        }
                    }),
                );
            }
        }
    }

    fn next_generation(&self) -> u64 {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        generation
    }

    fn loaded(&self, generation: u64, result: Result<ImageData, EngineError>) {
        if generation != self.generation.get() {
            log::debug!("Image '{}': stale load result dropped.", self.id);
            return;
        }
        let Some(engine) = self.engine.borrow().clone() else {
            return;
        };
        match result {
            Ok(data) => {
                self.status.set(ImageStatus::Loaded);
                self.register(&engine, &data);
            }
            Err(err) => self.fail("load", err),
        }
    }

    /// Adds the image, or replaces its pixels if the id is already taken.
    fn register(&self, engine: &EngineRef, data: &ImageData) {
        let existed = engine.has_image(&self.id);
        let result = if existed {
            engine.update_image(&self.id, data)
        } else {
            engine.add_image(&self.id, data, &self.spec)
        };
        match result {
            Ok(()) => {
                log::debug!("Image '{}' registered.", self.id);
                self.last_error.borrow_mut().take();
                self.status.set(ImageStatus::Created);
                self.resolve_waiters(|| Ok(()));
                if let (Some(register), Some(actions)) = (&self.on_register, self.actions()) {
                    register(&actions);
                }
            }
            Err(err) => {
                if !existed && engine.has_image(&self.id) {
                    if let Err(err) = engine.remove_image(&self.id) {
                        report::engine_failure(
                            self.debug,
                            ResourceKind::Image,
                            &self.id,
                            "rollback",
                            &err,
                        );
                    }
                }
                self.fail("add", err);
            }
        }
    }

    fn fail(&self, operation: &str, err: EngineError) {
        report::engine_failure(self.debug, ResourceKind::Image, &self.id, operation, &err);
        self.last_error.replace(Some(err.clone()));
        self.status.set(ImageStatus::Error);
        self.resolve_waiters(|| Err(BindingError::Engine(err.clone())));
    }

    fn resolve_waiters(&self, outcome: impl Fn() -> Result<(), BindingError>) {
        let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
        for waiter in waiters {
            // A dropped future is not an error.
            let _ = waiter.send(outcome());
        }
    }

    fn removed_error(&self) -> BindingError {
        BindingError::Removed {
            kind: ResourceKind::Image,
            id: self.id.clone(),
        }
    }

    fn update(&self, data: ImageData) {
        // Newer pixels win over an in-flight fetch.
        self.next_generation();
        self.source.replace(ImageSource::Data(data.clone()));
        let Some(engine) = self.engine.borrow().clone() else {
            return;
        };
        if !engine.has_image(&self.id) {
            log::trace!("Image '{}' is not live, pixels stored for creation.", self.id);
            if self.status.get() == ImageStatus::Loading {
                self.status.set(ImageStatus::NotCreated);
                self.create();
            }
            return;
        }
        if let Err(err) = engine.update_image(&self.id, &data) {
            report::engine_failure(self.debug, ResourceKind::Image, &self.id, "update", &err);
        }
    }

    fn remove(&self) {
        self.next_generation();
        let engine = self.engine.borrow().clone();
        if let Some(engine) = engine {
            self.remove_from(&engine);
        }
        self.status.set(ImageStatus::NotCreated);
        self.resolve_waiters(|| Err(self.removed_error()));
    }

    fn remove_from(&self, engine: &EngineRef) {
        if !engine.has_image(&self.id) {
            log::trace!("Image '{}' is not on the engine, nothing to remove.", self.id);
            return;
        }
        match engine.remove_image(&self.id) {
            Ok(()) => log::debug!("Image '{}' removed.", self.id),
            Err(err) => {
                report::engine_failure(self.debug, ResourceKind::Image, &self.id, "remove", &err)
            }
        }
    }

    fn actions(&self) -> Option<ImageActions> {
        self.this.upgrade().map(|inner| ImageActions { inner })
    }
}

impl ReloadHandler for ImageInner {
    fn on_ready(&self, engine: &EngineRef) {
        *self.engine.borrow_mut() = Some(engine.clone());
        self.create();
    }

    /// Pending `ready()` futures survive a reload; the image is recreated.
    fn on_teardown(&self, engine: &EngineRef) {
        self.next_generation();
        self.remove_from(engine);
        self.engine.borrow_mut().take();
        self.status.set(ImageStatus::NotCreated);
    }
}

/// The action object of an image.
#[derive(Clone)]
pub struct ImageActions {
    inner: Rc<ImageInner>,
}

impl ImageActions {
    /// The image id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The observable lifecycle status.
    pub fn status(&self) -> Signal<ImageStatus> {
        self.inner.status.clone()
    }

    /// Registers the image if the engine is ready.
    pub fn create(&self) {
        self.inner.create();
    }

    /// Resolves once the image is registered on the engine.
    ///
    /// ## Errors
    /// * `BindingError::Engine` - If loading or registration failed.
    /// * `BindingError::Removed` - If the image was removed first.
    pub fn ready(&self) -> impl Future<Output = Result<(), BindingError>> {
        let (sender, receiver) = flume::bounded(1);
        let inner = &self.inner;
        match inner.status.get() {
            ImageStatus::Created => {
                let _ = sender.send(Ok(()));
            }
            ImageStatus::Error => {
                let outcome = match inner.last_error.borrow().clone() {
                    Some(err) => Err(BindingError::Engine(err)),
                    None => Err(inner.removed_error()),
                };
                let _ = sender.send(outcome);
            }
            _ => inner.waiters.borrow_mut().push(sender),
        }
        let removed = inner.removed_error();
        async move { receiver.recv_async().await.unwrap_or(Err(removed)) }
    }

    /// Replaces the pixels, in place when the image is registered.
    pub fn update(&self, data: ImageData) {
        self.inner.update(data);
    }

    /// Removes the image and rejects pending `ready()` futures. Idempotent.
    pub fn remove(&self) {
        self.inner.remove();
    }

    /// The live image, if the engine currently holds it.
    pub fn live_handle(&self) -> Option<ResourceHandle> {
        let engine = self.inner.engine.borrow().clone()?;
        engine.has_image(self.id()).then(|| ResourceHandle {
            id: self.inner.id.clone(),
            kind: ResourceKind::Image,
            engine,
        })
    }
}

impl PartialEq for ImageActions {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ImageActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageActions")
            .field("id", &self.inner.id)
            .field("status", &self.inner.status.get())
            .finish()
    }
}

/// Owns one engine image for as long as it lives.
pub struct ImageFactory {
    actions: ImageActions,
    _scope: Scope,
}

impl ImageFactory {
    /// Creates a factory for `options`.
    pub fn new(context: &BindingContext, options: ImageOptions) -> Self {
        Self::build(context, options, None)
    }

    /// Like [`new`](Self::new), with a callback invoked once per successful registration.
    pub fn with_registration(
        context: &BindingContext,
        options: ImageOptions,
        on_register: impl Fn(&ImageActions) + 'static,
    ) -> Self {
        Self::build(context, options, Some(Box::new(on_register)))
    }

    fn build(
        context: &BindingContext,
        options: ImageOptions,
        on_register: Option<Box<dyn Fn(&ImageActions)>>,
    ) -> Self {
        let settings = context.settings();
        let id = report::resolve_id(options.id, &settings.image_id_prefix, ResourceKind::Image);
        let inner = Rc::new_cyclic(|this| ImageInner {
            id,
            debug: options.debug || settings.debug,
            engine: RefCell::new(None),
            source: RefCell::new(options.source),
            spec: options.spec,
            status: Signal::new(ImageStatus::NotCreated),
            generation: Cell::new(0),
            last_error: RefCell::new(None),
            waiters: RefCell::new(Vec::new()),
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
            actions: ImageActions { inner },
            _scope: scope,
        }
    }

    /// The image's action object.
    pub fn actions(&self) -> &ImageActions {
        &self.actions
    }
}

impl Deref for ImageFactory {
    type Target = ImageActions;

    fn deref(&self) -> &Self::Target {
        &self.actions
    }
}

impl fmt::Debug for ImageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImageFactory").field(&self.actions).finish()
    }
}
