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

use mapsync_bindings::{
    LayerActions, LayerFactory, LayerOptions, RegistrationBridge, SourceActions, SourceFactory,
    SourceOptions,
};
use mapsync_core::spec::{LayerKind, SourceRef, SourceSpec};
use mapsync_core::{
    BindingContext, BindingSettings, EngineHandle, EngineRef, MapEngine, ResourceStatus, Signal,
    SourceStatus,
};
use mapsync_infra::InMemoryEngine;
use serde_json::json;

fn mount(engine: &Rc<InMemoryEngine>) -> (EngineHandle, BindingContext) {
    let handle = EngineHandle::new(Some(EngineRef::from(engine.clone())));
    let context = BindingContext::new(handle.clone(), BindingSettings::default());
    (handle, context)
}

fn loaded_engine() -> Rc<InMemoryEngine> {
    let engine = Rc::new(InMemoryEngine::new());
    engine.add_source("src-1", &SourceSpec::geojson(json!({}))).unwrap();
    engine.finish_source_load("src-1");
    engine
}

#[test]
fn test_late_registration_sees_current_status() {
    let engine = loaded_engine();
    let (_handle, context) = mount(&engine);
    let layer = LayerFactory::new(
        &context,
        Signal::new(Some(SourceRef::from("src-1"))),
        LayerOptions::new(LayerKind::Fill).with_id("layer-1"),
    );
    let bridge = RegistrationBridge::<LayerActions>::new();
    assert_eq!(bridge.status().get(), None);

    bridge.register(layer.actions());

    assert_eq!(bridge.status().get(), Some(ResourceStatus::Created));
    assert_eq!(bridge.actions().get().as_ref(), Some(layer.actions()));

    layer.remove();
    assert_eq!(bridge.status().get(), Some(ResourceStatus::NotCreated));
}

#[test]
fn test_registering_the_same_instance_twice_keeps_one_subscription() {
    let engine = loaded_engine();
    let (_handle, context) = mount(&engine);
    let layer = LayerFactory::new(
        &context,
        Signal::new(Some(SourceRef::from("src-1"))),
        LayerOptions::new(LayerKind::Fill).with_id("layer-1"),
    );
    let bridge = RegistrationBridge::<LayerActions>::new();

    bridge.register(layer.actions());
    bridge.register(&layer.actions().clone());

    assert_eq!(layer.status().watcher_count(), 1);
}

#[test]
fn test_registering_another_instance_swaps_the_subscription() {
    // --- 1. ARRANGE ---
    let engine = loaded_engine();
    let (_handle, context) = mount(&engine);
    let dependency = Signal::new(Some(SourceRef::from("src-1")));
    let first = LayerFactory::new(
        &context,
        dependency.clone(),
        LayerOptions::new(LayerKind::Fill).with_id("first"),
    );
    let second = LayerFactory::new(
        &context,
        dependency,
        LayerOptions::new(LayerKind::Line).with_id("second"),
    );
    let bridge = RegistrationBridge::<LayerActions>::new();
    bridge.register(first.actions());

    // --- 2. ACT ---
    bridge.register(second.actions());

    // --- 3. ASSERT ---
    assert_eq!(first.status().watcher_count(), 0);
    assert_eq!(second.status().watcher_count(), 1);
    assert_eq!(bridge.actions().get().map(|a| a.id().to_string()), Some("second".into()));

    first.remove();
    assert_eq!(bridge.status().get(), Some(ResourceStatus::Created));
}

#[test]
fn test_registration_callback_feeds_the_bridge() {
    // --- 1. ARRANGE ---
    let engine = Rc::new(InMemoryEngine::new());
    let (handle, context) = mount(&engine);
    let bridge = Rc::new(RegistrationBridge::<SourceActions>::new());
    let registrar = bridge.clone();

    // --- 2. ACT ---
    let source = SourceFactory::with_registration(
        &context,
        SourceOptions::new(SourceSpec::geojson(json!({}))).with_id("parks"),
        move |actions| registrar.register(actions),
    );
    assert_eq!(bridge.status().get(), None, "Nothing registered before the data loads");
    engine.finish_source_load("parks");

    // --- 3. ASSERT ---
    assert_eq!(bridge.status().get(), Some(SourceStatus::Loaded));

    // A replacement engine re-registers the same instance without resubscribing.
    let replacement = Rc::new(InMemoryEngine::with_auto_load());
    handle.set(Some(EngineRef::from(replacement)));
    assert_eq!(bridge.status().get(), Some(SourceStatus::Loaded));
    assert_eq!(source.status().watcher_count(), 1);
}

#[test]
fn test_unregister_clears_both_signals() {
    let engine = loaded_engine();
    let (_handle, context) = mount(&engine);
    let layer = LayerFactory::new(
        &context,
        Signal::new(Some(SourceRef::from("src-1"))),
        LayerOptions::new(LayerKind::Fill).with_id("layer-1"),
    );
    let bridge = RegistrationBridge::<LayerActions>::default();
    bridge.register(layer.actions());

    bridge.unregister();

    assert_eq!(bridge.status().get(), None);
    assert_eq!(bridge.actions().get(), None);
    assert_eq!(layer.status().watcher_count(), 0);
}
