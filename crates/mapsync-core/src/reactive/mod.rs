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

//! Single-threaded, push-based reactive primitives.
//!
//! Everything that changes over a resource's lifetime (the engine handle, a
//! layer's dependency, a factory's status) is carried by a [`Signal`].
//! Watchers run synchronously inside [`Signal::set`], so a change is fully
//! propagated before `set` returns.
//!
//! Cancellation is expressed with [`Disposer`]s: every subscription hands one
//! back, and owners collect them into a [`Scope`] that runs them exactly once.

mod scope;
mod signal;

pub use self::scope::{Disposer, Scope};
pub use self::signal::Signal;
