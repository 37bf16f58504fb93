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

use std::cell::{Cell, RefCell};
use std::fmt;

/// A one-shot teardown callback.
///
/// The callback runs at most once: either explicitly through [`Disposer::dispose`]
/// or implicitly when the disposer is dropped. Use [`Disposer::forget`] to keep
/// the underlying subscription alive for the rest of the program.
#[must_use = "dropping a Disposer immediately runs its teardown"]
pub struct Disposer(Option<Box<dyn FnOnce()>>);

impl Disposer {
    /// Wraps a teardown callback.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(teardown)))
    }

    /// A disposer that does nothing.
    pub fn noop() -> Self {
        Self(None)
    }

    /// Runs the teardown now. Subsequent calls and the eventual drop are no-ops.
    pub fn dispose(mut self) {
        self.run();
    }

    /// Drops the disposer without running its teardown.
    pub fn forget(mut self) {
        self.0 = None;
    }

    fn run(&mut self) {
        if let Some(teardown) = self.0.take() {
            teardown();
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("armed", &self.0.is_some())
            .finish()
    }
}

/// An ordered collection of [`Disposer`]s owned by one resource.
///
/// Disposing the scope runs every collected disposer in reverse registration
/// order, exactly once. Disposers added after disposal run immediately.
/// Dropping the scope disposes it.
#[derive(Default)]
pub struct Scope {
    disposers: RefCell<Vec<Disposer>>,
    disposed: Cell<bool>,
}

impl Scope {
    /// Creates an empty, live scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a disposer to the scope.
    pub fn add(&self, disposer: Disposer) {
        if self.disposed.get() {
            disposer.dispose();
            return;
        }
        self.disposers.borrow_mut().push(disposer);
    }

    /// Registers a cleanup callback.
    pub fn on_dispose(&self, teardown: impl FnOnce() + 'static) {
        self.add(Disposer::new(teardown));
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Number of disposers still waiting to run.
    pub fn len(&self) -> usize {
        self.disposers.borrow().len()
    }

    /// Returns `true` if the scope holds no pending disposers.
    pub fn is_empty(&self) -> bool {
        self.disposers.borrow().is_empty()
    }

    /// Runs every collected disposer, newest first.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        // Take the list first: a disposer may add to this scope while running.
        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        for disposer in disposers.into_iter().rev() {
            disposer.dispose();
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("pending", &self.len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn disposer_runs_once_on_drop() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        {
            let _d = Disposer::new(move || c.set(c.get() + 1));
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn forgotten_disposer_never_runs() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        Disposer::new(move || c.set(c.get() + 1)).forget();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn scope_disposes_in_reverse_order_exactly_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let scope = Scope::new();
        for i in 0..3 {
            let log = log.clone();
            scope.on_dispose(move || log.borrow_mut().push(i));
        }

        scope.dispose();
        scope.dispose();
        drop(scope);

        assert_eq!(*log.borrow(), vec![2, 1, 0]);
    }

    #[test]
    fn late_disposer_runs_immediately() {
        let count = Rc::new(Cell::new(0));
        let scope = Scope::new();
        scope.dispose();

        let c = count.clone();
        scope.on_dispose(move || c.set(c.get() + 1));

        assert_eq!(count.get(), 1);
        assert!(scope.is_empty());
    }
}
