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

//! Lets a distant owner observe an action object registered by a descendant.
//!
//! The owner holds a [`RegistrationBridge`] and hands its `register` down.
//! Re-registering the same instance is free; registering a different one
//! swaps the subscription. The bridge subscribes with immediate firing, so a
//! late registration still sees the current status.

use std::cell::RefCell;
use std::fmt;

use mapsync_core::{
    ImageStatus, MarkerStatus, PopupStatus, ResourceStatus, Scope, Signal, SourceStatus,
};

use crate::image::ImageActions;
use crate::layer::LayerActions;
use crate::marker::MarkerActions;
use crate::popup::PopupActions;
use crate::source::SourceActions;

/// An action object exposing an observable status.
///
/// `PartialEq` must be identity: two values are equal only if they control the
/// same resource.
pub trait ObservableResource: Clone + PartialEq + 'static {
    /// The resource's status enum.
    type Status: Clone + PartialEq + 'static;

    /// The status signal.
    fn status_signal(&self) -> Signal<Self::Status>;
}

macro_rules! impl_observable {
    ($($actions:ty => $status:ty),* $(,)?) => {
        $(
            impl ObservableResource for $actions {
                type Status = $status;

                fn status_signal(&self) -> Signal<Self::Status> {
                    self.status()
                }
            }
        )*
    };
}

impl_observable!(
    LayerActions => ResourceStatus,
    SourceActions => SourceStatus,
    ImageActions => ImageStatus,
    MarkerActions => MarkerStatus,
    PopupActions => PopupStatus,
);

/// Republishes the status and identity of the most recently registered action object.
pub struct RegistrationBridge<A: ObservableResource> {
    status: Signal<Option<A::Status>>,
    actions: Signal<Option<A>>,
    subscription: RefCell<Option<Scope>>,
}

impl<A: ObservableResource> RegistrationBridge<A> {
    /// An empty bridge.
    pub fn new() -> Self {
        Self {
            status: Signal::new(None),
            actions: Signal::new(None),
            subscription: RefCell::new(None),
        }
    }

    /// Subscribes to `actions`. No-op if that instance is already registered.
    pub fn register(&self, actions: &A) {
        let registered = self.actions.with(|current| current.as_ref() == Some(actions));
        if registered && self.subscription.borrow().is_some() {
            log::trace!("RegistrationBridge: instance already registered.");
            return;
        }
        // Tear down the previous subscription before subscribing again.
        let previous = self.subscription.borrow_mut().take();
        drop(previous);

        let scope = Scope::new();
        let status = self.status.clone();
        let watcher = actions.status_signal().watch_immediate(move |value| {
            status.set(Some(value.clone()));
        });
        scope.add(watcher);
        *self.subscription.borrow_mut() = Some(scope);
        self.actions.set(Some(actions.clone()));
    }

    /// Drops the subscription and clears both published signals.
    pub fn unregister(&self) {
        let previous = self.subscription.borrow_mut().take();
        drop(previous);
        self.actions.set(None);
        self.status.set(None);
    }

    /// The registered instance's status, `None` while nothing is registered.
    pub fn status(&self) -> Signal<Option<A::Status>> {
        self.status.clone()
    }

    /// The registered instance.
    pub fn actions(&self) -> Signal<Option<A>> {
        self.actions.clone()
    }
}

impl<A: ObservableResource> Default for RegistrationBridge<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ObservableResource + fmt::Debug> fmt::Debug for RegistrationBridge<A>
where
    A::Status: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationBridge")
            .field("status", &self.status.get())
            .field("registered", &self.subscription.borrow().is_some())
            .finish()
    }
}
