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

//! Turns engine replacements and style reloads into teardown/ready pairs.
//!
//! One [`ReloadCoordinator`] watches an [`EngineHandle`]. Resource factories
//! register a [`ReloadHandler`] with it and receive:
//!
//! - `on_ready(engine)` whenever an engine with a loaded style becomes current,
//! - `on_teardown(engine)` immediately before that engine stops being current.
//!
//! A transition tears down *every* handler (newest first) before readying any
//! of them (oldest first). Layers are registered after the sources they draw
//! from, so a reload removes layers before their sources and re-adds sources
//! before their layers.
//!
//! A transition happens when the handle changes, when it is re-notified with
//! the same engine, and when the current engine emits `StyleLoad` again (its
//! source and layer tables were cleared behind our back). Identity equality
//! therefore never implies "no reload".

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::engine::{EngineEventKind, EngineHandle, EngineRef};
use crate::reactive::Disposer;

/// Callbacks driven by the [`ReloadCoordinator`].
pub trait ReloadHandler {
    /// The engine is present and its style is loaded: (re)create resources.
    fn on_ready(&self, engine: &EngineRef);

    /// `engine` is about to be replaced or released: remove resources from it.
    fn on_teardown(&self, engine: &EngineRef);
}

struct CoordinatorState {
    handlers: RefCell<Vec<(u64, Rc<dyn ReloadHandler>)>>,
    next_handler: Cell<u64>,
    /// The engine whose handlers have received `on_ready`.
    ready: RefCell<Option<EngineRef>>,
    /// The engine in the handle, ready or still loading its style.
    current: RefCell<Option<EngineRef>>,
    style_listener: RefCell<Option<Disposer>>,
}

impl CoordinatorState {
    fn handlers(&self) -> Vec<(u64, Rc<dyn ReloadHandler>)> {
        self.handlers.borrow().clone()
    }

    fn is_registered(&self, id: u64) -> bool {
        self.handlers.borrow().iter().any(|(h, _)| *h == id)
    }

    fn teardown_all(&self) {
        let Some(engine) = self.ready.borrow_mut().take() else {
            return;
        };
        log::debug!("ReloadCoordinator: tearing down resources on {engine:?}");
        for (id, handler) in self.handlers().into_iter().rev() {
            if self.is_registered(id) {
                handler.on_teardown(&engine);
            }
        }
    }

    fn ready_all(&self, engine: &EngineRef) {
        log::debug!("ReloadCoordinator: engine ready, creating resources");
        *self.ready.borrow_mut() = Some(engine.clone());
        for (id, handler) in self.handlers() {
            // A handler may have replaced the engine while we were iterating.
            if self.ready.borrow().as_ref() != Some(engine) {
                return;
            }
            if self.is_registered(id) {
                handler.on_ready(engine);
            }
        }
    }

    fn engine_changed(state: &Rc<Self>, next: Option<EngineRef>) {
        state.style_listener.borrow_mut().take();
        state.teardown_all();
        *state.current.borrow_mut() = next.clone();

        let Some(engine) = next else {
            log::debug!("ReloadCoordinator: engine released");
            return;
        };

        let weak = Rc::downgrade(state);
        let listener = engine.subscribe(EngineEventKind::StyleLoad, move |_| {
            if let Some(state) = weak.upgrade() {
                state.style_loaded();
            }
        });
        *state.style_listener.borrow_mut() = Some(listener);

        if engine.is_style_loaded() {
            state.ready_all(&engine);
        } else {
            log::trace!("ReloadCoordinator: waiting for the style to load");
        }
    }

    fn style_loaded(&self) {
        let Some(engine) = self.current.borrow().clone() else {
            return;
        };
        log::debug!("ReloadCoordinator: style (re)loaded");
        self.teardown_all();
        self.ready_all(&engine);
    }
}

/// Watches an [`EngineHandle`] and fans its transitions out to [`ReloadHandler`]s.
pub struct ReloadCoordinator {
    state: Rc<CoordinatorState>,
    _watch: Disposer,
}

impl ReloadCoordinator {
    /// Starts observing `handle`.
    pub fn new(handle: &EngineHandle) -> Self {
        let state = Rc::new(CoordinatorState {
            handlers: RefCell::new(Vec::new()),
            next_handler: Cell::new(0),
            ready: RefCell::new(None),
            current: RefCell::new(None),
            style_listener: RefCell::new(None),
        });

        let weak: Weak<CoordinatorState> = Rc::downgrade(&state);
        let watch = handle.watch(move |engine| {
            if let Some(state) = weak.upgrade() {
                CoordinatorState::engine_changed(&state, engine.clone());
            }
        });
        CoordinatorState::engine_changed(&state, handle.get());

        Self {
            state,
            _watch: watch,
        }
    }

    /// Registers `handler`. If an engine is already ready, `on_ready` fires
    /// before this returns.
    ///
    /// Dropping the returned subscription fires `on_teardown` once more if an
    /// engine is ready at that point; nothing happens if the handle never
    /// became ready.
    pub fn observe(&self, handler: Rc<dyn ReloadHandler>) -> ReloadSubscription {
        let id = self.state.next_handler.get();
        self.state.next_handler.set(id + 1);
        self.state
            .handlers
            .borrow_mut()
            .push((id, handler.clone()));

        let ready = self.state.ready.borrow().clone();
        if let Some(engine) = ready {
            handler.on_ready(&engine);
        }

        ReloadSubscription {
            id,
            handler,
            state: self.state.clone(),
        }
    }

    /// The engine currently handed to `on_ready`, if any.
    pub fn ready_engine(&self) -> Option<EngineRef> {
        self.state.ready.borrow().clone()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.state.handlers.borrow().len()
    }
}

impl fmt::Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("handlers", &self.handler_count())
            .field("ready", &self.state.ready.borrow().is_some())
            .finish()
    }
}

/// A handler's registration with a [`ReloadCoordinator`].
///
/// Keeps the coordinator's state alive, so a handler still receives its final
/// teardown even if the coordinator itself was dropped first.
#[must_use = "dropping the subscription immediately tears the handler down"]
pub struct ReloadSubscription {
    id: u64,
    handler: Rc<dyn ReloadHandler>,
    state: Rc<CoordinatorState>,
}

impl ReloadSubscription {
    /// Unregisters the handler, tearing it down if an engine is ready.
    pub fn dispose(self) {}

    /// Converts the subscription into a [`Disposer`].
    pub fn into_disposer(self) -> Disposer {
        Disposer::new(move || drop(self))
    }
}

impl Drop for ReloadSubscription {
    fn drop(&mut self) {
        self.state
            .handlers
            .borrow_mut()
            .retain(|(id, _)| *id != self.id);
        let ready = self.state.ready.borrow().clone();
        if let Some(engine) = ready {
            self.handler.on_teardown(&engine);
        }
    }
}

impl fmt::Debug for ReloadSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadSubscription")
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineEvent, EventHandler, ImageLoadCallback, ListenerId, MapEngine};
    use crate::error::EngineError;
    use crate::spec::*;
    use std::cell::RefCell;

    /// A bare engine that only knows about its style and its listeners.
    #[derive(Default)]
    struct StyleOnlyEngine {
        loaded: Cell<bool>,
        listeners: RefCell<Vec<(ListenerId, EventHandler)>>,
        next: Cell<u64>,
    }

    impl fmt::Debug for StyleOnlyEngine {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("StyleOnlyEngine")
        }
    }

    impl StyleOnlyEngine {
        fn loaded() -> Rc<Self> {
            let engine = Rc::new(Self::default());
            engine.loaded.set(true);
            engine
        }

        fn emit_style_load(&self) {
            self.loaded.set(true);
            let handlers: Vec<EventHandler> =
                self.listeners.borrow().iter().map(|(_, h)| h.clone()).collect();
            for handler in handlers {
                handler(&EngineEvent::StyleLoad);
            }
        }
    }

    fn unsupported() -> EngineError {
        EngineError::Rejected("unsupported".to_string())
    }

    impl MapEngine for StyleOnlyEngine {
        fn is_style_loaded(&self) -> bool {
            self.loaded.get()
        }
        fn add_source(&self, _: &str, _: &SourceSpec) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn remove_source(&self, _: &str) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn get_source(&self, _: &str) -> Option<SourceSpec> {
            None
        }
        fn has_source(&self, _: &str) -> bool {
            false
        }
        fn is_source_loaded(&self, _: &str) -> bool {
            false
        }
        fn set_source_data(&self, _: &str, _: &SourceData) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn add_layer(&self, _: &LayerSpecification, _: Option<&str>) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn remove_layer(&self, _: &str) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn get_layer(&self, _: &str) -> Option<LayerSpecification> {
            None
        }
        fn has_layer(&self, _: &str) -> bool {
            false
        }
        fn set_filter(&self, _: &str, _: Option<&Value>) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn set_layer_zoom_range(&self, _: &str, _: f64, _: f64) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn move_layer(&self, _: &str, _: Option<&str>) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn set_paint_property(
            &self,
            _: &str,
            _: &str,
            _: &Value,
            _: &StyleSetterOptions,
        ) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn set_layout_property(
            &self,
            _: &str,
            _: &str,
            _: &Value,
            _: &StyleSetterOptions,
        ) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn on(&self, _: EngineEventKind, handler: EventHandler) -> ListenerId {
            let id = ListenerId(self.next.get());
            self.next.set(id.0 + 1);
            self.listeners.borrow_mut().push((id, handler));
            id
        }
        fn off(&self, listener: ListenerId) {
            self.listeners.borrow_mut().retain(|(id, _)| *id != listener);
        }
        fn has_image(&self, _: &str) -> bool {
            false
        }
        fn add_image(&self, _: &str, _: &ImageData, _: &ImageSpec) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn update_image(&self, _: &str, _: &ImageData) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn remove_image(&self, _: &str) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn load_image(&self, _: &str, done: ImageLoadCallback) {
            done(Err(unsupported()));
        }
        fn add_marker(&self, _: &str, _: &MarkerSpec) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn remove_marker(&self, _: &str) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn has_marker(&self, _: &str) -> bool {
            false
        }
        fn set_marker_lng_lat(&self, _: &str, _: LngLat) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn set_marker_draggable(&self, _: &str, _: bool) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn set_marker_popup(&self, _: &str, _: Option<&str>) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn add_popup(&self, _: &str, _: &PopupSpec) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn remove_popup(&self, _: &str) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn has_popup(&self, _: &str) -> bool {
            false
        }
        fn is_popup_open(&self, _: &str) -> bool {
            false
        }
        fn set_popup_open(&self, _: &str, _: bool) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn set_popup_lng_lat(&self, _: &str, _: LngLat) -> Result<(), EngineError> {
            Err(unsupported())
        }
        fn set_popup_content(&self, _: &str, _: &PopupContent) -> Result<(), EngineError> {
            Err(unsupported())
        }
    }

    /// Records every callback as `"<name>:ready"` / `"<name>:teardown"`.
    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ReloadHandler for Recorder {
        fn on_ready(&self, _: &EngineRef) {
            self.log.borrow_mut().push(format!("{}:ready", self.name));
        }
        fn on_teardown(&self, _: &EngineRef) {
            self.log.borrow_mut().push(format!("{}:teardown", self.name));
        }
    }

    fn recorder(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Rc<dyn ReloadHandler> {
        Rc::new(Recorder {
            name,
            log: log.clone(),
        })
    }

    #[test]
    fn never_ready_handle_has_no_side_effects() {
        let handle = EngineHandle::new(None);
        let coordinator = ReloadCoordinator::new(&handle);
        let log = Rc::new(RefCell::new(Vec::new()));

        let subscription = coordinator.observe(recorder("a", &log));
        drop(subscription);

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn replacement_tears_down_everything_before_readying_anything() {
        let handle = EngineHandle::new(Some(EngineRef::from(StyleOnlyEngine::loaded())));
        let coordinator = ReloadCoordinator::new(&handle);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = coordinator.observe(recorder("a", &log));
        let _b = coordinator.observe(recorder("b", &log));
        log.borrow_mut().clear();

        handle.set(Some(EngineRef::from(StyleOnlyEngine::loaded())));

        assert_eq!(
            *log.borrow(),
            vec!["b:teardown", "a:teardown", "a:ready", "b:ready"]
        );
    }

    #[test]
    fn renotifying_the_same_engine_is_a_reload() {
        let handle = EngineHandle::new(Some(EngineRef::from(StyleOnlyEngine::loaded())));
        let coordinator = ReloadCoordinator::new(&handle);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = coordinator.observe(recorder("a", &log));

        handle.notify();

        assert_eq!(*log.borrow(), vec!["a:ready", "a:teardown", "a:ready"]);
    }

    #[test]
    fn style_load_event_reloads_the_current_engine() {
        let engine = StyleOnlyEngine::loaded();
        let handle = EngineHandle::new(Some(EngineRef::from(engine.clone())));
        let coordinator = ReloadCoordinator::new(&handle);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = coordinator.observe(recorder("a", &log));

        engine.emit_style_load();

        assert_eq!(*log.borrow(), vec!["a:ready", "a:teardown", "a:ready"]);
    }

    #[test]
    fn waits_for_style_before_readying() {
        let engine = Rc::new(StyleOnlyEngine::default());
        let handle = EngineHandle::new(None);
        let coordinator = ReloadCoordinator::new(&handle);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _a = coordinator.observe(recorder("a", &log));

        handle.set(Some(EngineRef::from(engine.clone())));
        assert!(log.borrow().is_empty());
        assert!(coordinator.ready_engine().is_none());

        engine.emit_style_load();
        assert_eq!(*log.borrow(), vec!["a:ready"]);
    }

    #[test]
    fn releasing_the_engine_and_disposing_each_tear_down_once() {
        let handle = EngineHandle::new(Some(EngineRef::from(StyleOnlyEngine::loaded())));
        let coordinator = ReloadCoordinator::new(&handle);
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = coordinator.observe(recorder("a", &log));
        let b = coordinator.observe(recorder("b", &log));

        b.dispose();
        handle.set(None);
        drop(a);

        assert_eq!(
            *log.borrow(),
            vec!["a:ready", "b:ready", "b:teardown", "a:teardown"]
        );
    }

    #[test]
    fn replaced_engine_listeners_are_detached() {
        let first = StyleOnlyEngine::loaded();
        let handle = EngineHandle::new(Some(EngineRef::from(first.clone())));
        let coordinator = ReloadCoordinator::new(&handle);
        assert_eq!(first.listeners.borrow().len(), 1);

        handle.set(Some(EngineRef::from(StyleOnlyEngine::loaded())));

        assert!(first.listeners.borrow().is_empty());
        drop(coordinator);
    }
}
