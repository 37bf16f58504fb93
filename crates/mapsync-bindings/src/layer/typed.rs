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

//! Typed layer factories with convenience setters.
//!
//! Each wrapper is a [`LayerFactory`] pinned to one [`LayerKind`]. Numeric
//! setters run the soft checks from [`validate`](super::validate): a
//! suspicious value is logged as a warning and still sent to the engine.
//! NaN and infinities are logged and dropped, since they serialize as
//! `null` and `null` resets a property.

use std::ops::Deref;

use mapsync_core::spec::{LayerKind, SourceRef, Value};
use mapsync_core::{BindingContext, Signal};
use serde_json::Number;

use super::validate;
use super::{LayerActions, LayerFactory, LayerOptions};

macro_rules! typed_layer {
    ($(#[$meta:meta])* $name:ident => $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            factory: LayerFactory,
        }

        impl $name {
            /// Creates the layer factory. `options.kind` is overridden.
            pub fn new(
                context: &BindingContext,
                dependency: Signal<Option<SourceRef>>,
                options: LayerOptions,
            ) -> Self {
                let options = LayerOptions { kind: $kind, ..options };
                Self {
                    factory: LayerFactory::new(context, dependency, options),
                }
            }

            /// Like [`new`](Self::new), with a registration callback.
            pub fn with_registration(
                context: &BindingContext,
                dependency: Signal<Option<SourceRef>>,
                options: LayerOptions,
                on_register: impl Fn(&LayerActions) + 'static,
            ) -> Self {
                let options = LayerOptions { kind: $kind, ..options };
                Self {
                    factory: LayerFactory::with_registration(
                        context,
                        dependency,
                        options,
                        on_register,
                    ),
                }
            }

            /// The underlying action object.
            pub fn actions(&self) -> &LayerActions {
                self.factory.actions()
            }
        }

        impl Deref for $name {
            type Target = LayerActions;

            fn deref(&self) -> &Self::Target {
                self.factory.actions()
            }
        }
    };
}

typed_layer!(
    /// A `fill` layer: filled polygons.
    FillLayer => LayerKind::Fill
);
typed_layer!(
    /// A `circle` layer: points drawn as circles.
    CircleLayer => LayerKind::Circle
);
typed_layer!(
    /// A `line` layer: stroked lines.
    LineLayer => LayerKind::Line
);
typed_layer!(
    /// A `symbol` layer: icons and text labels.
    SymbolLayer => LayerKind::Symbol
);

fn number(name: &str, value: f64) -> Option<Value> {
    let number = Number::from_f64(value).map(Value::Number);
    if number.is_none() {
        log::warn!("{name} must be a finite number, got {value}; ignored");
    }
    number
}

fn numbers(name: &str, values: &[f64]) -> Option<Value> {
    let array = values
        .iter()
        .map(|value| Number::from_f64(*value).map(Value::Number))
        .collect::<Option<Vec<_>>>()
        .map(Value::Array);
    if array.is_none() {
        log::warn!("{name} must only hold finite numbers, got {values:?}; ignored");
    }
    array
}

fn unit_paint(actions: &LayerActions, name: &str, value: f64) {
    let Some(json) = number(name, value) else {
        return;
    };
    validate::warn(validate::unit_interval(name, value));
    actions.paint(name, json);
}

fn size_paint(actions: &LayerActions, name: &str, value: f64) {
    let Some(json) = number(name, value) else {
        return;
    };
    validate::warn(validate::non_negative(name, value));
    actions.paint(name, json);
}

fn size_layout(actions: &LayerActions, name: &str, value: f64) {
    let Some(json) = number(name, value) else {
        return;
    };
    validate::warn(validate::non_negative(name, value));
    actions.layout(name, json);
}

fn offset(name: &str, value: &[f64]) -> Option<Value> {
    let json = numbers(name, value)?;
    validate::warn(validate::offset_pair(name, value));
    Some(json)
}

impl FillLayer {
    /// `fill-color`.
    pub fn set_color(&self, color: impl Into<Value>) {
        self.paint("fill-color", color.into());
    }

    /// `fill-opacity`, expected within `[0, 1]`.
    pub fn set_opacity(&self, opacity: f64) {
        unit_paint(self, "fill-opacity", opacity);
    }

    /// `fill-outline-color`.
    pub fn set_outline_color(&self, color: impl Into<Value>) {
        self.paint("fill-outline-color", color.into());
    }

    /// `fill-antialias`.
    pub fn set_antialias(&self, antialias: bool) {
        self.paint("fill-antialias", Value::from(antialias));
    }

    /// `fill-translate`, an `[x, y]` pixel offset.
    pub fn set_translate(&self, translate: &[f64]) {
        if let Some(translate) = offset("fill-translate", translate) {
            self.paint("fill-translate", translate);
        }
    }

    /// `fill-pattern`, the name of a registered image.
    pub fn set_pattern(&self, pattern: impl Into<Value>) {
        self.paint("fill-pattern", pattern.into());
    }
}

impl CircleLayer {
    /// `circle-radius` in pixels.
    pub fn set_radius(&self, radius: f64) {
        size_paint(self, "circle-radius", radius);
    }

    /// `circle-color`.
    pub fn set_color(&self, color: impl Into<Value>) {
        self.paint("circle-color", color.into());
    }

    /// `circle-opacity`, expected within `[0, 1]`.
    pub fn set_opacity(&self, opacity: f64) {
        unit_paint(self, "circle-opacity", opacity);
    }

    /// `circle-blur`; `1` blurs to the center.
    pub fn set_blur(&self, blur: f64) {
        unit_paint(self, "circle-blur", blur);
    }

    /// `circle-stroke-width` in pixels.
    pub fn set_stroke_width(&self, width: f64) {
        size_paint(self, "circle-stroke-width", width);
    }

    /// `circle-stroke-color`.
    pub fn set_stroke_color(&self, color: impl Into<Value>) {
        self.paint("circle-stroke-color", color.into());
    }

    /// `circle-stroke-opacity`, expected within `[0, 1]`.
    pub fn set_stroke_opacity(&self, opacity: f64) {
        unit_paint(self, "circle-stroke-opacity", opacity);
    }

    /// `circle-translate`, an `[x, y]` pixel offset.
    pub fn set_translate(&self, translate: &[f64]) {
        if let Some(translate) = offset("circle-translate", translate) {
            self.paint("circle-translate", translate);
        }
    }
}

impl LineLayer {
    /// `line-color`.
    pub fn set_color(&self, color: impl Into<Value>) {
        self.paint("line-color", color.into());
    }

    /// `line-width` in pixels.
    pub fn set_width(&self, width: f64) {
        size_paint(self, "line-width", width);
    }

    /// `line-opacity`, expected within `[0, 1]`.
    pub fn set_opacity(&self, opacity: f64) {
        unit_paint(self, "line-opacity", opacity);
    }

    /// `line-blur` in pixels.
    pub fn set_blur(&self, blur: f64) {
        size_paint(self, "line-blur", blur);
    }

    /// `line-gap-width`, drawing a casing around the line.
    pub fn set_gap_width(&self, width: f64) {
        size_paint(self, "line-gap-width", width);
    }

    /// `line-offset`. Negative values are valid and offset to the left.
    pub fn set_offset(&self, offset: f64) {
        if let Some(offset) = number("line-offset", offset) {
            self.paint("line-offset", offset);
        }
    }

    /// `line-dasharray`, in line widths.
    pub fn set_dasharray(&self, dashes: &[f64]) {
        let Some(json) = numbers("line-dasharray", dashes) else {
            return;
        };
        if dashes.iter().any(|d| *d < 0.0) {
            log::warn!("line-dasharray should not contain negative lengths, got {dashes:?}");
        }
        self.paint("line-dasharray", json);
    }

    /// `line-cap`: `butt`, `round` or `square`.
    pub fn set_cap(&self, cap: &str) {
        self.layout("line-cap", Value::from(cap));
    }

    /// `line-join`: `bevel`, `round` or `miter`.
    pub fn set_join(&self, join: &str) {
        self.layout("line-join", Value::from(join));
    }
}

impl SymbolLayer {
    /// `icon-image`, the name of a registered image.
    pub fn set_icon_image(&self, image: impl Into<Value>) {
        self.layout("icon-image", image.into());
    }

    /// `icon-size`, a scale factor.
    pub fn set_icon_size(&self, size: f64) {
        size_layout(self, "icon-size", size);
    }

    /// `icon-opacity`, expected within `[0, 1]`.
    pub fn set_icon_opacity(&self, opacity: f64) {
        unit_paint(self, "icon-opacity", opacity);
    }

    /// `icon-offset`, an `[x, y]` offset.
    pub fn set_icon_offset(&self, icon_offset: &[f64]) {
        if let Some(icon_offset) = offset("icon-offset", icon_offset) {
            self.layout("icon-offset", icon_offset);
        }
    }

    /// `text-field`, a string or a format expression.
    pub fn set_text_field(&self, field: impl Into<Value>) {
        self.layout("text-field", field.into());
    }

    /// `text-size` in pixels.
    pub fn set_text_size(&self, size: f64) {
        size_layout(self, "text-size", size);
    }

    /// `text-color`.
    pub fn set_text_color(&self, color: impl Into<Value>) {
        self.paint("text-color", color.into());
    }

    /// `text-opacity`, expected within `[0, 1]`.
    pub fn set_text_opacity(&self, opacity: f64) {
        unit_paint(self, "text-opacity", opacity);
    }

    /// `text-offset`, an `[x, y]` offset in ems.
    pub fn set_text_offset(&self, text_offset: &[f64]) {
        if let Some(text_offset) = offset("text-offset", text_offset) {
            self.layout("text-offset", text_offset);
        }
    }

    /// `text-font`, a font stack.
    pub fn set_text_font(&self, fonts: &[&str]) {
        self.layout("text-font", Value::from(fonts.to_vec()));
    }
}
