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

//! Static paint/layout key tables for each supported layer kind.
//!
//! The tables follow the MapLibre style specification. For every kind the
//! paint and layout tables are disjoint, so a style key is routed to exactly
//! one setter.

use mapsync_core::spec::{LayerKind, PropertyMap};

const FILL_PAINT: &[&str] = &[
    "fill-antialias",
    "fill-opacity",
    "fill-color",
    "fill-outline-color",
    "fill-translate",
    "fill-translate-anchor",
    "fill-pattern",
];

const FILL_LAYOUT: &[&str] = &["fill-sort-key", "visibility"];

const CIRCLE_PAINT: &[&str] = &[
    "circle-radius",
    "circle-color",
    "circle-blur",
    "circle-opacity",
    "circle-translate",
    "circle-translate-anchor",
    "circle-pitch-scale",
    "circle-pitch-alignment",
    "circle-stroke-width",
    "circle-stroke-color",
    "circle-stroke-opacity",
];

const CIRCLE_LAYOUT: &[&str] = &["circle-sort-key", "visibility"];

const LINE_PAINT: &[&str] = &[
    "line-opacity",
    "line-color",
    "line-translate",
    "line-translate-anchor",
    "line-width",
    "line-gap-width",
    "line-offset",
    "line-blur",
    "line-dasharray",
    "line-pattern",
    "line-gradient",
];

const LINE_LAYOUT: &[&str] = &[
    "line-cap",
    "line-join",
    "line-miter-limit",
    "line-round-limit",
    "line-sort-key",
    "visibility",
];

const SYMBOL_PAINT: &[&str] = &[
    "icon-opacity",
    "icon-color",
    "icon-halo-color",
    "icon-halo-width",
    "icon-halo-blur",
    "icon-translate",
    "icon-translate-anchor",
    "text-opacity",
    "text-color",
    "text-halo-color",
    "text-halo-width",
    "text-halo-blur",
    "text-translate",
    "text-translate-anchor",
];

const SYMBOL_LAYOUT: &[&str] = &[
    "symbol-placement",
    "symbol-spacing",
    "symbol-avoid-edges",
    "symbol-sort-key",
    "symbol-z-order",
    "icon-allow-overlap",
    "icon-overlap",
    "icon-ignore-placement",
    "icon-optional",
    "icon-rotation-alignment",
    "icon-size",
    "icon-text-fit",
    "icon-text-fit-padding",
    "icon-image",
    "icon-rotate",
    "icon-padding",
    "icon-keep-upright",
    "icon-offset",
    "icon-anchor",
    "icon-pitch-alignment",
    "text-pitch-alignment",
    "text-rotation-alignment",
    "text-field",
    "text-font",
    "text-size",
    "text-max-width",
    "text-line-height",
    "text-letter-spacing",
    "text-justify",
    "text-radial-offset",
    "text-variable-anchor",
    "text-variable-anchor-offset",
    "text-anchor",
    "text-max-angle",
    "text-writing-mode",
    "text-rotate",
    "text-padding",
    "text-keep-upright",
    "text-transform",
    "text-offset",
    "text-allow-overlap",
    "text-overlap",
    "text-ignore-placement",
    "text-optional",
    "visibility",
];

/// Paint property names accepted by `kind`.
pub fn paint_keys(kind: LayerKind) -> &'static [&'static str] {
    match kind {
        LayerKind::Fill => FILL_PAINT,
        LayerKind::Circle => CIRCLE_PAINT,
        LayerKind::Line => LINE_PAINT,
        LayerKind::Symbol => SYMBOL_PAINT,
    }
}

/// Layout property names accepted by `kind`.
pub fn layout_keys(kind: LayerKind) -> &'static [&'static str] {
    match kind {
        LayerKind::Fill => FILL_LAYOUT,
        LayerKind::Circle => CIRCLE_LAYOUT,
        LayerKind::Line => LINE_LAYOUT,
        LayerKind::Symbol => SYMBOL_LAYOUT,
    }
}

/// Which setter a style key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyClass {
    /// Routed to `set_paint_property`.
    Paint,
    /// Routed to `set_layout_property`.
    Layout,
}

/// Classifies `key` for `kind`, or `None` if the kind does not know it.
pub fn classify(kind: LayerKind, key: &str) -> Option<PropertyClass> {
    if paint_keys(kind).contains(&key) {
        Some(PropertyClass::Paint)
    } else if layout_keys(kind).contains(&key) {
        Some(PropertyClass::Layout)
    } else {
        None
    }
}

/// A merged style object split by property class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StylePartition {
    /// Keys found in the paint table.
    pub paint: PropertyMap,
    /// Keys found in the layout table.
    pub layout: PropertyMap,
    /// Keys found in neither table, in input order.
    pub unknown: Vec<String>,
}

/// Splits `style` into paint and layout maps for `kind`.
pub fn partition_style(kind: LayerKind, style: &PropertyMap) -> StylePartition {
    let mut partition = StylePartition::default();
    for (key, value) in style {
        match classify(kind, key) {
            Some(PropertyClass::Paint) => {
                partition.paint.insert(key.clone(), value.clone());
            }
            Some(PropertyClass::Layout) => {
                partition.layout.insert(key.clone(), value.clone());
            }
            None => partition.unknown.push(key.clone()),
        }
    }
    partition
}
