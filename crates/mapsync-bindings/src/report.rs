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

//! Helpers shared by every factory.

use mapsync_core::{BindingSettings, EngineError, ResourceKind};

/// Logs an engine-rejected operation. Only surfaces at `error` level when the
/// owning factory runs in debug mode.
pub(crate) fn engine_failure(
    debug: bool,
    kind: ResourceKind,
    id: &str,
    operation: &str,
    err: &EngineError,
) {
    if debug {
        log::error!("{kind} '{id}': {operation} failed: {err}");
    } else {
        log::trace!("{kind} '{id}': {operation} failed: {err}");
    }
}

/// Returns the caller's id, or a generated `<prefix>-<uuid>` one.
pub(crate) fn resolve_id(requested: Option<String>, prefix: &str, kind: ResourceKind) -> String {
    match requested {
        Some(id) if !id.is_empty() => id,
        Some(_) => {
            log::warn!("Empty {kind} id ignored, generating one.");
            BindingSettings::generate_id(prefix)
        }
        None => BindingSettings::generate_id(prefix),
    }
}
