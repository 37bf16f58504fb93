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

use std::cell::Cell;
use std::rc::Rc;

use mapsync_bindings::{LayerFactory, LayerOptions, SourceFactory, SourceOptions};
use mapsync_core::spec::{LayerKind, SourceData, SourceRef, SourceSpec};
use mapsync_core::{
    BindingContext, BindingSettings, EngineEvent, EngineHandle, EngineRef, MapEngine,
    ResourceStatus, SourceStatus,
};
use mapsync_infra::{EngineCall, EngineOp, FailureMode, InMemoryEngine};
use serde_json::json;

fn mount(engine: &Rc<InMemoryEngine>) -> (EngineHandle, BindingContext) {
    let handle = EngineHandle::new(Some(EngineRef::from(engine.clone())));
    let context = BindingContext::new(handle.clone(), BindingSettings::default());
    (handle, context)
}

fn parks() -> SourceOptions {
    SourceOptions::new(SourceSpec::geojson(json!({ "type": "FeatureCollection", "features": [] })))
        .with_id("parks")
}

#[test]
fn test_source_is_ready_only_after_its_data_loads() {
    // --- 1. ARRANGE ---
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);

    // --- 2. ACT ---
    let source = SourceFactory::new(&context, parks());

    // --- 3. ASSERT ---
    assert!(engine.has_source("parks"));
    assert_eq!(source.status().get(), SourceStatus::Loading);
    assert_eq!(source.dependency().get(), None, "Not published before the data loads");

    engine.finish_source_load("parks");

    assert_eq!(source.status().get(), SourceStatus::Loaded);
    assert_eq!(source.dependency().get(), Some(SourceRef::from("parks")));
}

#[test]
fn test_auto_loading_engine_reaches_loaded_during_creation() {
    let engine = Rc::new(InMemoryEngine::with_auto_load());
    let (_handle, context) = mount(&engine);

    let source = SourceFactory::new(&context, parks());

    assert_eq!(source.status().get(), SourceStatus::Loaded);
    assert_eq!(engine.count(EngineOp::AddSource), 1);
}

#[test]
fn test_registration_fires_once_per_load() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let registrations = Rc::new(Cell::new(0));
    let counter = registrations.clone();
    let source = SourceFactory::with_registration(&context, parks(), move |actions| {
        assert_eq!(actions.id(), "parks");
        counter.set(counter.get() + 1);
    });

    engine.finish_source_load("parks");
    engine.finish_source_load("parks");

    assert_eq!(registrations.get(), 1);
    assert_eq!(source.status().get(), SourceStatus::Loaded);
}

#[test]
fn test_set_data_updates_in_place() {
    let engine = Rc::new(InMemoryEngine::with_auto_load());
    let (_handle, context) = mount(&engine);
    let source = SourceFactory::new(&context, parks());
    let next = SourceData::Inline(json!({ "type": "FeatureCollection", "features": [1] }));

    source.set_data(next.clone());

    assert_eq!(engine.count(EngineOp::AddSource), 1);
    assert_eq!(engine.count(EngineOp::SetSourceData), 1);
    assert_eq!(engine.count(EngineOp::RemoveSource), 0);
    assert_eq!(engine.get_source("parks").map(|spec| spec.data), Some(next));
}

#[test]
fn test_data_set_before_creation_is_used_on_creation() {
    let engine = Rc::new(InMemoryEngine::new());
    let handle = EngineHandle::new(None);
    let context = BindingContext::new(handle.clone(), BindingSettings::default());
    let source = SourceFactory::new(&context, parks());
    let next = SourceData::Url("https://tiles.example.org/parks.geojson".to_string());

    source.set_data(next.clone());
    handle.set(Some(EngineRef::from(engine.clone())));

    assert_eq!(engine.count(EngineOp::SetSourceData), 0);
    assert_eq!(engine.get_source("parks").map(|spec| spec.data), Some(next.clone()));
    assert_eq!(source.spec().data, next);
}

#[test]
fn test_removal_detaches_dependent_layers_first() {
    // --- 1. ARRANGE ---
    let engine = Rc::new(InMemoryEngine::with_auto_load());
    let (_handle, context) = mount(&engine);
    let source = SourceFactory::new(&context, parks());
    let layer = LayerFactory::new(
        &context,
        source.dependency(),
        LayerOptions::new(LayerKind::Fill).with_id("parks-fill"),
    );
    assert_eq!(layer.status().get(), ResourceStatus::Created);
    engine.clear_calls();

    // --- 2. ACT ---
    source.remove();

    // --- 3. ASSERT ---
    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::RemoveLayer {
                id: "parks-fill".to_string()
            },
            EngineCall::RemoveSource {
                id: "parks".to_string()
            },
        ]
    );
    assert_eq!(source.status().get(), SourceStatus::NotCreated);
    assert_eq!(layer.status().get(), ResourceStatus::NotCreated);

    // Removing again is a no-op.
    source.remove();
    assert_eq!(engine.count(EngineOp::RemoveSource), 1);
}

#[test]
fn test_source_is_added_before_its_layer() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let source = SourceFactory::new(&context, parks());
    let _layer = LayerFactory::new(
        &context,
        source.dependency(),
        LayerOptions::new(LayerKind::Fill).with_id("parks-fill"),
    );
    assert!(!engine.has_layer("parks-fill"));

    engine.finish_source_load("parks");

    let calls = engine.calls();
    let add_source = calls.iter().position(|call| call.op() == EngineOp::AddSource);
    let add_layer = calls.iter().position(|call| call.op() == EngineOp::AddLayer);
    assert!(add_source.is_some() && add_layer.is_some());
    assert!(add_source < add_layer);
}

#[test]
fn test_engine_replacement_rebuilds_source_and_layer() {
    // --- 1. ARRANGE ---
    let first = Rc::new(InMemoryEngine::with_auto_load());
    let (handle, context) = mount(&first);
    let source = SourceFactory::new(&context, parks());
    let layer = LayerFactory::new(
        &context,
        source.dependency(),
        LayerOptions::new(LayerKind::Fill).with_id("parks-fill"),
    );
    let second = Rc::new(InMemoryEngine::with_auto_load());

    // --- 2. ACT ---
    handle.set(Some(EngineRef::from(second.clone())));

    // --- 3. ASSERT ---
    assert!(first.source_ids().is_empty());
    assert!(first.layer_ids().is_empty());
    assert_eq!(first.count(EngineOp::RemoveLayer), 1);
    assert_eq!(first.count(EngineOp::RemoveSource), 1);
    assert_eq!(second.count(EngineOp::AddSource), 1);
    assert_eq!(second.count(EngineOp::AddLayer), 1);
    assert_eq!(source.status().get(), SourceStatus::Loaded);
    assert_eq!(layer.status().get(), ResourceStatus::Created);
}

#[test]
fn test_rejected_source_reports_error() {
    let engine = Rc::new(InMemoryEngine::new());
    engine.fail_next(EngineOp::AddSource, FailureMode::Reject);
    let (_handle, context) = mount(&engine);

    let source = SourceFactory::new(&context, parks());

    assert_eq!(source.status().get(), SourceStatus::Error);
    assert!(!engine.has_source("parks"));
    assert_eq!(source.live_handle(), None);

    // A manual retry succeeds once the engine accepts it.
    source.create();
    assert_eq!(source.status().get(), SourceStatus::Loading);
    assert!(source.live_handle().is_some());
}

#[test]
fn test_half_added_source_is_rolled_back() {
    let engine = Rc::new(InMemoryEngine::new());
    engine.fail_next(EngineOp::AddSource, FailureMode::RejectAfterApply);
    let (_handle, context) = mount(&engine);

    let source = SourceFactory::new(&context, parks());

    assert_eq!(source.status().get(), SourceStatus::Error);
    assert!(!engine.has_source("parks"));
    assert_eq!(engine.count(EngineOp::RemoveSource), 1);
}

#[test]
fn test_failed_data_load_reports_error_and_keeps_layers_waiting() {
    // --- 1. ARRANGE ---
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let listeners_before = engine.listener_count();
    let source = SourceFactory::new(&context, parks());
    let layer = LayerFactory::new(
        &context,
        source.dependency(),
        LayerOptions::new(LayerKind::Fill).with_id("parks-fill"),
    );

    // --- 2. ACT ---
    assert!(engine.fail_source_load("parks", "tile fetch failed"));

    // --- 3. ASSERT ---
    assert_eq!(source.status().get(), SourceStatus::Error);
    assert_eq!(source.dependency().get(), None);
    assert_eq!(layer.status().get(), ResourceStatus::NotCreated);
    assert!(!engine.has_layer("parks-fill"));
    assert_eq!(
        engine.listener_count(),
        listeners_before,
        "Both load listeners are detached"
    );

    // A late loaded event no longer publishes the source.
    engine.finish_source_load("parks");
    assert_eq!(source.status().get(), SourceStatus::Error);
    assert_eq!(source.dependency().get(), None);
}

#[test]
fn test_errors_for_other_sources_are_ignored() {
    let engine = Rc::new(InMemoryEngine::new());
    engine.add_source("roads", &SourceSpec::geojson(json!({}))).unwrap();
    let (_handle, context) = mount(&engine);
    let source = SourceFactory::new(&context, parks());

    engine.fail_source_load("roads", "tile fetch failed");
    engine.emit(EngineEvent::Error {
        message: "style warning".to_string(),
        source_id: None,
    });

    assert_eq!(source.status().get(), SourceStatus::Loading);
    engine.finish_source_load("parks");
    assert_eq!(source.status().get(), SourceStatus::Loaded);
}

#[test]
fn test_rewrapping_the_same_engine_does_not_reload() {
    // --- 1. ARRANGE ---
    let engine = Rc::new(InMemoryEngine::with_auto_load());
    let (handle, context) = mount(&engine);
    let source = SourceFactory::new(&context, parks());
    let shared: Rc<dyn MapEngine> = engine.clone();

    // --- 2. ACT ---
    let changed = handle.set(Some(EngineRef::from_rc(shared)));

    // --- 3. ASSERT ---
    assert!(!changed, "Wrappers of one engine compare equal");
    assert_eq!(engine.count(EngineOp::AddSource), 1);
    assert_eq!(engine.count(EngineOp::RemoveSource), 0);
    assert_eq!(source.status().get(), SourceStatus::Loaded);
}

#[test]
fn test_dropping_the_factory_removes_the_source() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let listeners_before = engine.listener_count();
    let source = SourceFactory::new(&context, parks());

    drop(source);

    assert!(!engine.has_source("parks"));
    assert_eq!(engine.count(EngineOp::RemoveSource), 1);
    assert_eq!(engine.listener_count(), listeners_before);
}
