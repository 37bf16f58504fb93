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

//! Soft guardrails for typed property setters.
//!
//! Each check returns a warning message instead of failing: the engine may
//! clamp or tolerate the value, so the setter still applies it.

use mapsync_core::spec::{MAX_ZOOM, MIN_ZOOM};
use mapsync_core::BindingError;

/// Warns about values outside `[0, 1]` (opacities, unit blurs).
pub fn unit_interval(name: &str, value: f64) -> Option<String> {
    if (0.0..=1.0).contains(&value) {
        None
    } else {
        Some(format!("{name} should be within [0, 1], got {value}"))
    }
}

/// Warns about negative widths, radii and sizes.
pub fn non_negative(name: &str, value: f64) -> Option<String> {
    if value >= 0.0 {
        None
    } else {
        Some(format!("{name} should not be negative, got {value}"))
    }
}

/// Warns about offset/translate arrays that are not exactly two finite numbers.
pub fn offset_pair(name: &str, value: &[f64]) -> Option<String> {
    if value.len() == 2 && value.iter().all(|v| v.is_finite()) {
        None
    } else {
        Some(format!("{name} should be two finite numbers, got {value:?}"))
    }
}

/// Rejects zoom ranges outside `[MIN_ZOOM, MAX_ZOOM]` or with `min >= max`.
pub fn zoom_range(min: f64, max: f64) -> Result<(), BindingError> {
    if min < MIN_ZOOM || max > MAX_ZOOM || min >= max || min.is_nan() || max.is_nan() {
        return Err(BindingError::InvalidZoomRange { min, max });
    }
    Ok(())
}

/// Logs `warning`, if any.
pub(crate) fn warn(warning: Option<String>) {
    if let Some(message) = warning {
        log::warn!("{message}");
    }
}
