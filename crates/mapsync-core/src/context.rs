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

//! The explicit context handed to every resource factory.

use std::rc::Rc;

use crate::engine::{EngineHandle, EngineRef};
use crate::reload::ReloadCoordinator;
use crate::settings::BindingSettings;

/// Binding context providing the engine handle, its reload coordinator and settings.
///
/// Created once by the component that owns the engine and passed down
/// explicitly; there is no ambient or global engine. Cloning is cheap and
/// every clone shares the same coordinator.
#[derive(Debug, Clone)]
pub struct BindingContext {
    engine: EngineHandle,
    reload: Rc<ReloadCoordinator>,
    settings: Rc<BindingSettings>,
}

impl BindingContext {
    /// Creates a context observing `engine`.
    pub fn new(engine: EngineHandle, settings: BindingSettings) -> Self {
        let reload = Rc::new(ReloadCoordinator::new(&engine));
        Self {
            engine,
            reload,
            settings: Rc::new(settings),
        }
    }

    /// The reactive engine cell.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// The engine currently handed to factories, if its style is loaded.
    pub fn ready_engine(&self) -> Option<EngineRef> {
        self.reload.ready_engine()
    }

    /// The shared reload coordinator.
    pub fn reload(&self) -> &ReloadCoordinator {
        &self.reload
    }

    /// Binding-wide settings.
    pub fn settings(&self) -> &BindingSettings {
        &self.settings
    }
}
