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

// Mapsync Sandbox
// Drives one map view through mount, style reload, engine swap and unmount.

use std::rc::Rc;

use anyhow::{ensure, Result};
use mapsync_bindings::{
    FillLayer, ImageFactory, ImageOptions, ImageSource, LayerOptions, MarkerFactory,
    MarkerOptions, PopupFactory, PopupOptions, RegistrationBridge, SourceActions, SourceFactory,
    SourceOptions, SymbolLayer,
};
use mapsync_core::spec::{ImageData, LayerKind, LngLat, PopupSpec, SourceSpec};
use mapsync_core::{BindingContext, BindingSettings, EngineHandle, EngineRef, MapEngine};
use mapsync_infra::InMemoryEngine;
use serde_json::json;

const ICON_URL: &str = "https://icons.example.org/park.png";
const CENTER: LngLat = LngLat::new(2.3522, 48.8566);

fn parks() -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [CENTER.lng, CENTER.lat] },
            "properties": { "name": "Jardin du Luxembourg" }
        }]
    })
}

fn report(label: &str, engine: &InMemoryEngine) {
    log::info!(
        "[{label}] sources={:?} layers={:?} calls={}",
        engine.source_ids(),
        engine.layer_ids(),
        engine.calls().len()
    );
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("mapsync_infra", log::LevelFilter::Warn)
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => BindingSettings::from_file(path)?,
        None => BindingSettings::default(),
    };

    // The view mounts before its engine exists.
    let handle = EngineHandle::new(None);
    let context = BindingContext::new(handle.clone(), settings);
    let bridge = Rc::new(RegistrationBridge::<SourceActions>::new());

    let registrar = bridge.clone();
    let source = SourceFactory::with_registration(
        &context,
        SourceOptions::new(SourceSpec::geojson(parks())).with_id("parks"),
        move |actions| registrar.register(actions),
    );
    let fill = FillLayer::new(
        &context,
        source.dependency(),
        LayerOptions::new(LayerKind::Fill).with_id("parks-fill"),
    );
    fill.set_color("#2e7d32");
    fill.set_opacity(0.6);
    let icon = ImageFactory::new(
        &context,
        ImageOptions::new("park-icon", ImageSource::Url(ICON_URL.to_string())),
    );
    let labels = SymbolLayer::new(
        &context,
        source.dependency(),
        LayerOptions::new(LayerKind::Symbol).with_id("parks-labels"),
    );
    labels.set_icon_image("park-icon");
    labels.set_text_field(json!(["get", "name"]));
    let popup = PopupFactory::new(
        &context,
        PopupOptions::new(PopupSpec::text("Jardin du Luxembourg").at(CENTER)).with_id("park-info"),
    );
    let marker = MarkerFactory::new(
        &context,
        MarkerOptions::at(CENTER).with_id("park").with_popup("park-info"),
    );

    // The engine arrives with its style still loading.
    let engine = Rc::new(InMemoryEngine::unloaded());
    handle.set(Some(EngineRef::from(engine.clone())));
    ensure!(engine.source_ids().is_empty(), "nothing may be added before the style loads");
    engine.finish_style_load();
    engine.finish_source_load("parks");
    engine.complete_image_load(ICON_URL, Ok(ImageData::solid(16, 16, [46, 125, 50, 255])));
    pollster::block_on(icon.ready())?;
    report("mounted", &engine);
    log::info!("source status via bridge: {:?}", bridge.status().get());

    popup.open();
    log::info!("marker status: {:?}", marker.status().get());

    // A style swap wipes the engine; everything is rebuilt with the latest props.
    engine.reload_style();
    engine.finish_source_load("parks");
    engine.complete_image_load(ICON_URL, Ok(ImageData::solid(16, 16, [46, 125, 50, 255])));
    report("style reloaded", &engine);
    ensure!(engine.has_layer("parks-fill"), "fill layer must survive a style reload");

    // Swapping engines moves every resource.
    let replacement = Rc::new(InMemoryEngine::with_auto_load());
    handle.set(Some(EngineRef::from(replacement.clone())));
    replacement.complete_image_load(ICON_URL, Ok(ImageData::solid(16, 16, [46, 125, 50, 255])));
    report("old engine", &engine);
    report("new engine", &replacement);
    ensure!(
        replacement.paint_property("parks-fill", "fill-color") == Some(json!("#2e7d32")),
        "latest paint must be restored"
    );

    // Unmount.
    drop((marker, popup, labels, icon, fill, source));
    report("unmounted", &replacement);
    ensure!(replacement.layer_ids().is_empty(), "unmount must remove every layer");
    ensure!(replacement.source_ids().is_empty(), "unmount must remove the source");

    Ok(())
}
