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

use mapsync_bindings::{ImageFactory, ImageOptions, ImageSource};
use mapsync_core::spec::ImageData;
use mapsync_core::{
    BindingContext, BindingError, BindingSettings, EngineError, EngineHandle, EngineRef,
    ImageStatus,
};
use mapsync_infra::{EngineOp, FailureMode, InMemoryEngine};

const PIN_URL: &str = "https://icons.example.org/pin.png";

fn mount(engine: &Rc<InMemoryEngine>) -> (EngineHandle, BindingContext) {
    let handle = EngineHandle::new(Some(EngineRef::from(engine.clone())));
    let context = BindingContext::new(handle.clone(), BindingSettings::default());
    (handle, context)
}

fn red() -> ImageData {
    ImageData::solid(2, 2, [255, 0, 0, 255])
}

fn blue() -> ImageData {
    ImageData::solid(2, 2, [0, 0, 255, 255])
}

#[test]
fn test_in_memory_pixels_register_immediately() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);

    let image = ImageFactory::new(&context, ImageOptions::new("pin", ImageSource::Data(red())));

    assert_eq!(image.status().get(), ImageStatus::Created);
    assert_eq!(engine.image("pin"), Some(red()));
    assert!(pollster::block_on(image.ready()).is_ok());
}

#[test]
fn test_url_image_resolves_ready_after_the_load() {
    // --- 1. ARRANGE ---
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let image = ImageFactory::new(
        &context,
        ImageOptions::new("pin", ImageSource::Url(PIN_URL.to_string())),
    );
    assert_eq!(image.status().get(), ImageStatus::Loading);
    assert_eq!(engine.pending_image_loads(), 1);
    let ready = image.ready();

    // --- 2. ACT ---
    assert!(engine.complete_image_load(PIN_URL, Ok(red())));

    // --- 3. ASSERT ---
    assert!(pollster::block_on(ready).is_ok());
    assert_eq!(image.status().get(), ImageStatus::Created);
    assert_eq!(engine.image("pin"), Some(red()));
}

#[test]
fn test_failed_load_rejects_ready() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let image = ImageFactory::new(
        &context,
        ImageOptions::new("pin", ImageSource::Url(PIN_URL.to_string())),
    );
    let pending = image.ready();

    engine.complete_image_load(PIN_URL, Err("404".to_string()));

    assert_eq!(image.status().get(), ImageStatus::Error);
    assert!(matches!(
        pollster::block_on(pending),
        Err(BindingError::Engine(EngineError::ImageLoad { .. }))
    ));
    // A late caller sees the same failure.
    assert!(matches!(
        pollster::block_on(image.ready()),
        Err(BindingError::Engine(EngineError::ImageLoad { .. }))
    ));
}

#[test]
fn test_stale_load_after_reload_is_dropped() {
    // --- 1. ARRANGE ---
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let image = ImageFactory::new(
        &context,
        ImageOptions::new("pin", ImageSource::Url(PIN_URL.to_string())),
    );

    // --- 2. ACT ---
    // The style swap starts a second fetch while the first is still in flight.
    engine.reload_style();
    assert_eq!(engine.pending_image_loads(), 2);
    engine.complete_image_load(PIN_URL, Ok(blue()));

    // --- 3. ASSERT ---
    assert_eq!(image.status().get(), ImageStatus::Loading);
    assert_eq!(engine.image("pin"), None);

    engine.complete_image_load(PIN_URL, Ok(red()));
    assert_eq!(image.status().get(), ImageStatus::Created);
    assert_eq!(engine.image("pin"), Some(red()));
    assert_eq!(engine.count(EngineOp::AddImage), 1);
}

#[test]
fn test_removal_rejects_pending_ready() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let image = ImageFactory::new(
        &context,
        ImageOptions::new("pin", ImageSource::Url(PIN_URL.to_string())),
    );
    let pending = image.ready();

    image.remove();
    // The fetch completing afterwards must not resurrect the image.
    engine.complete_image_load(PIN_URL, Ok(red()));

    assert!(matches!(
        pollster::block_on(pending),
        Err(BindingError::Removed { .. })
    ));
    assert_eq!(image.status().get(), ImageStatus::NotCreated);
    assert_eq!(engine.image("pin"), None);
}

#[test]
fn test_dropping_the_factory_rejects_pending_ready() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let image = ImageFactory::new(
        &context,
        ImageOptions::new("pin", ImageSource::Url(PIN_URL.to_string())),
    );
    let pending = image.ready();

    drop(image);

    assert!(pollster::block_on(pending).is_err());
}

#[test]
fn test_update_replaces_pixels_in_place() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let image = ImageFactory::new(&context, ImageOptions::new("pin", ImageSource::Data(red())));

    image.update(blue());

    assert_eq!(engine.count(EngineOp::AddImage), 1);
    assert_eq!(engine.count(EngineOp::UpdateImage), 1);
    assert_eq!(engine.image("pin"), Some(blue()));
}

#[test]
fn test_update_during_a_fetch_wins() {
    let engine = Rc::new(InMemoryEngine::new());
    let (_handle, context) = mount(&engine);
    let image = ImageFactory::new(
        &context,
        ImageOptions::new("pin", ImageSource::Url(PIN_URL.to_string())),
    );

    image.update(blue());
    engine.complete_image_load(PIN_URL, Ok(red()));

    assert_eq!(image.status().get(), ImageStatus::Created);
    assert_eq!(engine.image("pin"), Some(blue()));
}

#[test]
fn test_ready_survives_an_engine_replacement() {
    // --- 1. ARRANGE ---
    let first = Rc::new(InMemoryEngine::new());
    let (handle, context) = mount(&first);
    let image = ImageFactory::new(
        &context,
        ImageOptions::new("pin", ImageSource::Url(PIN_URL.to_string())),
    );
    let pending = image.ready();
    let second = Rc::new(InMemoryEngine::new());

    // --- 2. ACT ---
    handle.set(Some(EngineRef::from(second.clone())));
    second.complete_image_load(PIN_URL, Ok(red()));

    // --- 3. ASSERT ---
    assert!(pollster::block_on(pending).is_ok());
    assert_eq!(second.image("pin"), Some(red()));
    assert_eq!(first.image("pin"), None);
}

#[test]
fn test_rejected_registration_reports_error() {
    let engine = Rc::new(InMemoryEngine::new());
    engine.fail_next(EngineOp::AddImage, FailureMode::RejectAfterApply);
    let (_handle, context) = mount(&engine);
    let registrations = Rc::new(Cell::new(0));
    let counter = registrations.clone();

    let image = ImageFactory::with_registration(
        &context,
        ImageOptions::new("pin", ImageSource::Data(red())),
        move |_| counter.set(counter.get() + 1),
    );

    assert_eq!(image.status().get(), ImageStatus::Error);
    assert_eq!(engine.image("pin"), None, "Half-added image must be removed");
    assert_eq!(registrations.get(), 0);

    image.create();
    assert_eq!(image.status().get(), ImageStatus::Created);
    assert_eq!(registrations.get(), 1);
}
