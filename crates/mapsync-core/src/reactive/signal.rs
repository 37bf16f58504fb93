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
use std::rc::{Rc, Weak};

use super::Disposer;

type Watcher<T> = Rc<dyn Fn(&T)>;

struct SignalInner<T> {
    value: RefCell<T>,
    watchers: RefCell<Vec<(u64, Watcher<T>)>>,
    next_watcher: Cell<u64>,
    version: Cell<u64>,
}

/// A shared, observable cell.
///
/// Cloning a `Signal` is cheap and yields another handle to the same cell.
/// Watchers are notified synchronously with strict value comparison: setting
/// a value equal to the current one is silent. Use [`notify`](Self::notify)
/// to re-fire watchers without a change (e.g. the same engine object after
/// its internal tables were cleared).
///
/// Watchers may re-enter the signal. When a watcher sets a new value, the
/// nested notification delivers it to every watcher and the outer, now stale,
/// notification stops.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Creates a signal holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                watchers: RefCell::new(Vec::new()),
                next_watcher: Cell::new(0),
                version: Cell::new(0),
            }),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrows the current value for the duration of `f`.
    ///
    /// `f` must not set this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Stores `value` and notifies watchers if it differs from the current one.
    ///
    /// ## Returns
    /// `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.notify();
        true
    }

    /// Stores `value` unconditionally, notifies watchers and returns the previous value.
    pub fn replace(&self, value: T) -> T {
        let previous = self.inner.value.replace(value);
        self.notify();
        previous
    }

    /// Re-fires every watcher with the current value.
    pub fn notify(&self) {
        let version = self.inner.version.get().wrapping_add(1);
        self.inner.version.set(version);

        let snapshot = self.get();
        let watchers: Vec<(u64, Watcher<T>)> = self.inner.watchers.borrow().clone();
        for (id, watcher) in watchers {
            if self.inner.version.get() != version {
                // A watcher published a newer value, which has already reached everyone.
                break;
            }
            if !self.is_watching(id) {
                continue;
            }
            watcher(&snapshot);
        }
    }

    /// Subscribes `watcher` to future changes.
    ///
    /// The subscription lasts until the returned [`Disposer`] is dropped or disposed.
    pub fn watch(&self, watcher: impl Fn(&T) + 'static) -> Disposer {
        let id = self.inner.next_watcher.get();
        self.inner.next_watcher.set(id + 1);
        self.inner
            .watchers
            .borrow_mut()
            .push((id, Rc::new(watcher)));

        let weak: Weak<SignalInner<T>> = Rc::downgrade(&self.inner);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.watchers.borrow_mut().retain(|(w, _)| *w != id);
            }
        })
    }

    /// Like [`watch`](Self::watch), but also fires once with the current value
    /// before returning.
    pub fn watch_immediate(&self, watcher: impl Fn(&T) + 'static) -> Disposer {
        let watcher = Rc::new(watcher);
        let current = self.get();
        let forwarded = watcher.clone();
        let disposer = self.watch(move |value| forwarded(value));
        watcher(&current);
        disposer
    }

    /// Number of live watchers.
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }

    /// Returns `true` if both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn is_watching(&self, id: u64) -> bool {
        self.inner.watchers.borrow().iter().any(|(w, _)| *w == id)
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.inner.value.borrow())
            .field("watchers", &self.inner.watchers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_notifies_only_on_change() {
        let signal = Signal::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let _d = signal.watch(move |v| s.borrow_mut().push(*v));

        assert!(signal.set(2));
        assert!(!signal.set(2));
        signal.notify();

        assert_eq!(*seen.borrow(), vec![2, 2]);
    }

    #[test]
    fn dropping_disposer_unsubscribes() {
        let signal = Signal::new(0);
        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        let d = signal.watch(move |_| s.set(s.get() + 1));
        assert_eq!(signal.watcher_count(), 1);

        drop(d);
        signal.set(5);

        assert_eq!(seen.get(), 0);
        assert_eq!(signal.watcher_count(), 0);
    }

    #[test]
    fn watch_immediate_fires_with_current_value() {
        let signal = Signal::new("a".to_string());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let _d = signal.watch_immediate(move |v| s.borrow_mut().push(v.clone()));
        signal.set("b".to_string());

        assert_eq!(*seen.borrow(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn reentrant_set_stops_stale_notification() {
        let signal = Signal::new(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let bounce = signal.clone();
        let _first = signal.watch(move |v| {
            if *v == 1 {
                bounce.set(2);
            }
        });
        let s = seen.clone();
        let _second = signal.watch(move |v| s.borrow_mut().push(*v));

        signal.set(1);

        // The second watcher only ever sees the settled value.
        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(signal.get(), 2);
    }

    #[test]
    fn watcher_disposed_during_notification_is_skipped() {
        let signal = Signal::new(0);
        let count = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Disposer>>> = Rc::new(RefCell::new(None));

        let slot_for_first = slot.clone();
        let _first = signal.watch(move |_| {
            if let Some(d) = slot_for_first.borrow_mut().take() {
                d.dispose();
            }
        });
        let c = count.clone();
        *slot.borrow_mut() = Some(signal.watch(move |_| c.set(c.get() + 1)));

        signal.set(1);

        assert_eq!(count.get(), 0);
    }
}
