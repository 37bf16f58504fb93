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

//! Binding-wide configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BindingError;

/// Settings shared by every factory created from one `BindingContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingSettings {
    /// Log engine-rejected operations at `error` level.
    pub debug: bool,
    /// Prefix of generated layer ids.
    pub layer_id_prefix: String,
    /// Prefix of generated source ids.
    pub source_id_prefix: String,
    /// Prefix of generated image ids.
    pub image_id_prefix: String,
    /// Prefix of generated marker ids.
    pub marker_id_prefix: String,
    /// Prefix of generated popup ids.
    pub popup_id_prefix: String,
}

impl Default for BindingSettings {
    fn default() -> Self {
        Self {
            debug: false,
            layer_id_prefix: "layer".to_string(),
            source_id_prefix: "source".to_string(),
            image_id_prefix: "image".to_string(),
            marker_id_prefix: "marker".to_string(),
            popup_id_prefix: "popup".to_string(),
        }
    }
}

impl BindingSettings {
    /// Load settings from a JSON string. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, BindingError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BindingError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save settings to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), BindingError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Generates a unique id of the form `<prefix>-<uuid>`.
    pub fn generate_id(prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = BindingSettings::from_json(r#"{ "debug": true }"#).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.layer_id_prefix, "layer");
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = BindingSettings::from_json("{ debug: ").unwrap_err();
        assert!(matches!(err, BindingError::Settings(_)));
    }

    #[test]
    fn settings_round_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        let settings = BindingSettings {
            debug: true,
            source_id_prefix: "src".to_string(),
            ..BindingSettings::default()
        };

        settings.to_file(&path).unwrap();

        assert_eq!(BindingSettings::from_file(&path).unwrap(), settings);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();

        let result = BindingSettings::from_file(dir.path().join("missing.json"));

        match result {
            Err(BindingError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected an io error, got {other:?}"),
        }
    }

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = BindingSettings::generate_id("layer");
        let b = BindingSettings::generate_id("layer");
        assert!(a.starts_with("layer-"));
        assert_ne!(a, b);
    }
}
