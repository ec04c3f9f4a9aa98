//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Current-value-plus-updates cells derived from streams.
//!
//! A [`Signal`] pairs a current value with a [`Stream`] of updates. Signals
//! are not protocol currency — nothing on the wire carries one — but
//! adapters built on the reactive layer use them to fold event streams into
//! observable state, so they live here alongside the primitives.

use super::{Stream, StreamController};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A current value plus a stream of updates.
///
/// Reading the value never blocks; observing [`updates`](Self::updates)
/// yields every subsequent distinct value in order. Signals are cheap
/// handles; clones share the same cell.
///
/// # Examples
///
/// ```rust
/// use remstream::reactive::SignalController;
///
/// let controller = SignalController::<i32, String>::new(1);
/// let signal = controller.signal();
/// assert_eq!(signal.get(), 1);
///
/// controller.update(2);
/// assert_eq!(signal.get(), 2);
/// ```
pub struct Signal<T, E> {
    value: Arc<Mutex<T>>,
    updates: Stream<T, E>,
}

impl<T, E> Clone for Signal<T, E> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            updates: self.updates.clone(),
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Signal<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.value.lock())
            .finish()
    }
}

impl<T, E> Signal<T, E>
where
    T: Clone + PartialEq + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Returns a signal stuck at `value`; its update stream never fires.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self {
            value: Arc::new(Mutex::new(value)),
            updates: StreamController::new().stream(),
        }
    }

    /// Returns a signal recomputed from `signals` through `comp` whenever
    /// any upstream signal updates.
    pub fn derived<U, F>(signals: &[Self], comp: F) -> Signal<U, E>
    where
        U: Clone + PartialEq + Send + 'static,
        F: Fn(&[T]) -> U + Send + Sync + 'static,
    {
        let comp = Arc::new(comp);
        let upstream: Vec<Self> = signals.to_vec();
        let recompute = Arc::new(move || {
            let values: Vec<T> = upstream.iter().map(Signal::get).collect();
            comp(&values)
        });

        let controller = SignalController::new(recompute());
        let derived = controller.signal();
        for signal in signals {
            let controller = controller.clone();
            let recompute = recompute.clone();
            let _ = signal.updates().listen(move |_| controller.update(recompute()));
        }
        derived
    }

    /// Returns a signal carrying `mapper` applied to this signal's value.
    pub fn map<U, F>(&self, mapper: F) -> Signal<U, E>
    where
        U: Clone + PartialEq + Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Self::derived(std::slice::from_ref(self), move |values| {
            mapper(values[0].clone())
        })
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    /// Returns the stream of subsequent values.
    #[must_use]
    pub fn updates(&self) -> Stream<T, E> {
        self.updates.clone()
    }
}

impl<E> Signal<bool, E>
where
    E: Clone + Send + 'static,
{
    /// Returns the boolean fold of `signals` under logical or.
    pub fn or(signals: &[Self]) -> Self {
        Self::derived(signals, |values| values.iter().any(|value| *value))
    }
}

/// The exclusive write side of a [`Signal`].
///
/// Updates that leave the value unchanged are suppressed: observers of the
/// update stream only see transitions.
pub struct SignalController<T, E> {
    signal: Signal<T, E>,
    updates: StreamController<T, E>,
}

impl<T, E> Clone for SignalController<T, E> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            updates: self.updates.clone(),
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for SignalController<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalController")
            .field("signal", &self.signal)
            .finish()
    }
}

impl<T, E> SignalController<T, E>
where
    T: Clone + PartialEq + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a controller and its signal with an initial value.
    #[must_use]
    pub fn new(initial: T) -> Self {
        let updates = StreamController::new();
        let signal = Signal {
            value: Arc::new(Mutex::new(initial)),
            updates: updates.stream(),
        };
        Self { signal, updates }
    }

    /// Returns a handle onto the controlled signal.
    #[must_use]
    pub fn signal(&self) -> Signal<T, E> {
        self.signal.clone()
    }

    /// Sets a new value, notifying update observers if it differs from the
    /// current one.
    pub fn update(&self, new_value: T) {
        {
            let mut value = self.signal.value.lock();
            if *value == new_value {
                return;
            }
            *value = new_value.clone();
        }
        self.updates.add(new_value);
    }
}
