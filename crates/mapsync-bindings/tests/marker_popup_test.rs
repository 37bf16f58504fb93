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

use mapsync_bindings::{MarkerFactory, MarkerOptions, PopupFactory, PopupOptions};
use mapsync_core::spec::{LngLat, PopupContent, PopupSpec};
use mapsync_core::{
    BindingContext, BindingSettings, EngineHandle, EngineRef, MapEngine, MarkerStatus,
    PopupStatus,
};
use mapsync_infra::{EngineOp, FailureMode, InMemoryEngine};

const HARBOUR: LngLat = LngLat::new(4.4777, 51.9244);

fn mount(engine: &Rc<InMemoryEngine>) -> (EngineHandle, BindingContext) {
    let handle = EngineHandle::new(Some(EngineRef::from(engine.clone())));
    let context = BindingContext::new(handle.clone(), BindingSettings::default());
    (handle, context)
}

fn harbour_popup(context: &BindingContext) -> PopupFactory {
    PopupFactory::new(
        context,
        PopupOptions::new(PopupSpec::text("Harbour").at(HARBOUR)).with_id("harbour-info"),
    )
}

#[test]
fn test_popup_open_and_close() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let popup = harbour_popup(&context);
    assert_eq!(popup.status().get(), PopupStatus::Closed);

    popup.open();
    assert!(engine.is_popup_open("harbour-info"));
    assert!(popup.is_open());

    popup.close();
    assert!(!engine.is_popup_open("harbour-info"));
    assert_eq!(popup.status().get(), PopupStatus::Closed);
}

#[test]
fn test_popup_created_open_when_requested() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let mut options = PopupOptions::new(PopupSpec::text("Harbour")).with_id("harbour-info");
    options.open = true;

    let popup = PopupFactory::new(&context, options);

    assert_eq!(popup.status().get(), PopupStatus::Open);
    assert!(engine.is_popup_open("harbour-info"));
}

#[test]
fn test_user_close_is_reflected_in_status() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let popup = harbour_popup(&context);
    popup.open();

    engine.user_close_popup("harbour-info");

    assert_eq!(popup.status().get(), PopupStatus::Closed);
}

#[test]
fn test_popup_setters_pass_through_while_live() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let popup = harbour_popup(&context);
    let moved = LngLat::new(4.5, 52.0);

    popup.set_lng_lat(moved);
    popup.set_content(PopupContent::Html("<b>Harbour</b>".to_string()));

    let live = engine.popup("harbour-info").expect("popup should exist");
    assert_eq!(live.lng_lat, Some(moved));
    assert_eq!(live.content, PopupContent::Html("<b>Harbour</b>".to_string()));
}

#[test]
fn test_marker_follows_its_popup() {
    // --- 1. ARRANGE ---
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let popup = harbour_popup(&context);
    let marker = MarkerFactory::new(
        &context,
        MarkerOptions::at(HARBOUR)
            .with_id("harbour")
            .with_popup("harbour-info"),
    );
    assert_eq!(marker.status().get(), MarkerStatus::Closed);
    assert_eq!(
        engine.marker("harbour").and_then(|spec| spec.popup),
        Some("harbour-info".to_string())
    );

    // --- 2. ACT & 3. ASSERT ---
    popup.open();
    assert_eq!(marker.status().get(), MarkerStatus::Open);

    engine.user_close_popup("harbour-info");
    assert_eq!(marker.status().get(), MarkerStatus::Closed);

    marker.attach_popup(None);
    assert_eq!(marker.status().get(), MarkerStatus::Created);
    popup.open();
    assert_eq!(marker.status().get(), MarkerStatus::Created, "Detached popups are ignored");
}

#[test]
fn test_marker_without_popup_makes_no_popup_call() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);

    let marker = MarkerFactory::new(&context, MarkerOptions::at(HARBOUR).with_id("harbour"));

    assert_eq!(marker.status().get(), MarkerStatus::Created);
    assert_eq!(engine.count(EngineOp::AddMarker), 1);
    assert_eq!(engine.count(EngineOp::SetMarkerPopup), 0);
}

#[test]
fn test_marker_setters_pass_through_while_live() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let marker = MarkerFactory::new(&context, MarkerOptions::at(HARBOUR).with_id("harbour"));
    let moved = LngLat::new(4.48, 51.93);

    marker.set_lng_lat(moved);
    marker.set_draggable(true);

    let live = engine.marker("harbour").expect("marker should exist");
    assert_eq!(live.lng_lat, moved);
    assert!(live.draggable);

    marker.remove();
    marker.set_lng_lat(HARBOUR);
    assert_eq!(engine.count(EngineOp::SetMarkerLngLat), 1);
    assert_eq!(marker.live_handle(), None);
}

#[test]
fn test_engine_replacement_moves_marker_and_popup() {
    // --- 1. ARRANGE ---
    let first = Rc::new(InMemoryEngine::new());
    let (handle, context) = mount(&first);
    let popup = harbour_popup(&context);
    let marker = MarkerFactory::new(
        &context,
        MarkerOptions::at(HARBOUR)
            .with_id("harbour")
            .with_popup("harbour-info"),
    );
    popup.open();
    let second = Rc::new(InMemoryEngine::new());

    // --- 2. ACT ---
    handle.set(Some(EngineRef::from(second.clone())));

    // --- 3. ASSERT ---
    assert!(!first.has_marker("harbour"));
    assert!(!first.has_popup("harbour-info"));
    assert!(second.has_popup("harbour-info"));
    assert!(second.is_popup_open("harbour-info"), "Open state is restored");
    assert_eq!(
        second.marker("harbour").and_then(|spec| spec.popup),
        Some("harbour-info".to_string())
    );
    assert_eq!(marker.status().get(), MarkerStatus::Open);
}

#[test]
fn test_dropping_factories_removes_everything() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let listeners_before = engine.listener_count();
    let popup = harbour_popup(&context);
    let marker = MarkerFactory::new(
        &context,
        MarkerOptions::at(HARBOUR)
            .with_id("harbour")
            .with_popup("harbour-info"),
    );

    drop(marker);
    drop(popup);

    assert!(!engine.has_marker("harbour"));
    assert!(!engine.has_popup("harbour-info"));
    assert_eq!(engine.listener_count(), listeners_before);
}

#[test]
fn test_half_added_marker_and_popup_are_rolled_back() {
    // --- 1. ARRANGE ---
    let engine = Rc::new(InMemoryEngine::new());
    engine.fail_next(EngineOp::AddPopup, FailureMode::RejectAfterApply);
    engine.fail_next(EngineOp::AddMarker, FailureMode::RejectAfterApply);
    let (_handle, context) = mount(&engine);

    // --- 2. ACT ---
    let popup = harbour_popup(&context);
    let marker = MarkerFactory::new(&context, MarkerOptions::at(HARBOUR).with_id("harbour"));

    // --- 3. ASSERT ---
    assert_eq!(popup.status().get(), PopupStatus::Error);
    assert_eq!(marker.status().get(), MarkerStatus::Error);
    assert!(!engine.has_popup("harbour-info"));
    assert!(!engine.has_marker("harbour"));
    assert_eq!(engine.count(EngineOp::RemovePopup), 1);
    assert_eq!(engine.count(EngineOp::RemoveMarker), 1);
}

#[test]
fn test_failed_rollback_still_reports_error() {
    let engine = Rc::new(InMemoryEngine::new());
    engine.fail_next(EngineOp::AddMarker, FailureMode::RejectAfterApply);
    engine.fail_next(EngineOp::RemoveMarker, FailureMode::Reject);
    let (_handle, context) = mount(&engine);

    let marker = MarkerFactory::new(&context, MarkerOptions::at(HARBOUR).with_id("harbour"));

    assert_eq!(marker.status().get(), MarkerStatus::Error);
    assert!(engine.has_marker("harbour"), "The rejected removal leaves it behind");
    assert_eq!(engine.count(EngineOp::RemoveMarker), 1);
}
