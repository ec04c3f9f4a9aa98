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

//! Single-assignment asynchronous results.
//!
//! A [`Future`] resolves exactly once, to either a value or an error, and is
//! resolved exclusively through the [`Completer`] that created it. Consumers
//! may attach continuations before or after resolution; continuations
//! attached after the outcome is known are delivered on a fresh Tokio task
//! rather than synchronously, preserving asynchronous-completion semantics
//! for already-known values.
//!
//! This `Future` is a push-style protocol value, not an implementation of
//! [`std::future::Future`]; use [`Future::wait`] to bridge into async/await.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// A continuation waiting on a pending future.
struct Waiter<T, E> {
    on_value: Box<dyn FnOnce(T) + Send>,
    on_error: Box<dyn FnOnce(E) + Send>,
}

enum State<T, E> {
    Pending(Vec<Waiter<T, E>>),
    Completed(T),
    Failed(E),
}

/// A single-assignment asynchronous result.
///
/// Futures are cheap handles; cloning one yields another handle onto the
/// same eventual outcome. Only the [`Completer`] that created the future can
/// resolve it, and it can do so exactly once.
///
/// # Examples
///
/// ```rust
/// use remstream::reactive::Completer;
/// use std::sync::{Arc, Mutex};
///
/// let completer = Completer::<i32, String>::new();
/// let outcome = Arc::new(Mutex::new(None));
///
/// let slot = outcome.clone();
/// completer.future().subscribe(
///     move |value| *slot.lock().unwrap() = Some(value),
///     |_error| {},
/// );
///
/// completer.complete(42);
/// assert_eq!(*outcome.lock().unwrap(), Some(42));
/// ```
pub struct Future<T, E> {
    state: Arc<Mutex<State<T, E>>>,
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Future<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            State::Pending(waiters) => format!("pending ({} waiters)", waiters.len()),
            State::Completed(_) => "completed".to_string(),
            State::Failed(_) => "failed".to_string(),
        };
        f.debug_struct("Future").field("state", &state).finish()
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Pending(Vec::new()))),
        }
    }

    /// Returns a future that completes with `value` on a fresh turn of the
    /// event loop rather than synchronously.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn immediate(value: T) -> Self {
        let completer = Completer::new();
        let future = completer.future();
        tokio::spawn(async move {
            completer.complete(value);
        });
        future
    }

    /// Resolves with the ordered values of every input once all of them
    /// complete, or with the first error seen. After the first error, later
    /// outcomes from the other inputs are ignored; the inputs themselves are
    /// not cancelled.
    #[must_use]
    pub fn all(futures: Vec<Self>) -> Future<Vec<T>, E> {
        struct Gather<T> {
            slots: Vec<Option<T>>,
            remaining: usize,
            settled: bool,
        }

        let completer = Completer::new();
        let result = completer.future();
        if futures.is_empty() {
            completer.complete(Vec::new());
            return result;
        }

        let gather = Arc::new(Mutex::new(Gather {
            slots: futures.iter().map(|_| None).collect(),
            remaining: futures.len(),
            settled: false,
        }));

        for (index, future) in futures.into_iter().enumerate() {
            let on_value_gather = gather.clone();
            let on_value_completer = completer.clone();
            let on_error_gather = gather.clone();
            let on_error_completer = completer.clone();
            future.subscribe(
                move |value| {
                    let values = {
                        let mut gather = on_value_gather.lock();
                        if gather.settled {
                            return;
                        }
                        gather.slots[index] = Some(value);
                        gather.remaining -= 1;
                        if gather.remaining > 0 {
                            return;
                        }
                        gather.settled = true;
                        gather.slots.drain(..).flatten().collect::<Vec<_>>()
                    };
                    on_value_completer.complete(values);
                },
                move |error| {
                    {
                        let mut gather = on_error_gather.lock();
                        if gather.settled {
                            return;
                        }
                        gather.settled = true;
                    }
                    on_error_completer.error(error);
                },
            );
        }
        result
    }

    /// Returns `true` if the future has resolved (with a value or an error).
    #[must_use]
    pub fn is_completed(&self) -> bool {
        !matches!(&*self.state.lock(), State::Pending(_))
    }

    /// Returns `true` if `self` and `other` are handles onto the same
    /// underlying future.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Attaches a continuation for the future's outcome.
    ///
    /// On a pending future the matching callback runs synchronously at
    /// resolution time, in attach order. On an already-resolved future the
    /// callback is scheduled on a fresh Tokio task with the existing
    /// outcome, which requires a runtime to be active.
    pub fn subscribe<F, G>(&self, on_value: F, on_error: G)
    where
        F: FnOnce(T) + Send + 'static,
        G: FnOnce(E) + Send + 'static,
    {
        let outcome = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending(waiters) => {
                    waiters.push(Waiter {
                        on_value: Box::new(on_value),
                        on_error: Box::new(on_error),
                    });
                    return;
                }
                State::Completed(value) => Ok(value.clone()),
                State::Failed(error) => Err(error.clone()),
            }
        };
        tokio::spawn(async move {
            match outcome {
                Ok(value) => on_value(value),
                Err(error) => on_error(error),
            }
        });
    }

    /// Returns a future resolved from `handler`'s outcome: on a value,
    /// `handler` produces the next future to wait on; on an error, the
    /// error propagates to the returned future without running `handler`.
    pub fn then<U, F>(&self, handler: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Future<U, E> + Send + 'static,
    {
        let completer = Completer::new();
        let result = completer.future();
        let on_error_completer = completer.clone();
        self.subscribe(
            move |value| {
                let next_completer = completer.clone();
                let next_error_completer = completer;
                handler(value).subscribe(
                    move |next| next_completer.complete(next),
                    move |error| next_error_completer.error(error),
                );
            },
            move |error| on_error_completer.error(error),
        );
        result
    }

    /// Returns a future carrying `func` applied to this future's value.
    /// Errors propagate to the returned future unchanged.
    pub fn map<U, F>(&self, func: F) -> Future<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let completer = Completer::new();
        let result = completer.future();
        let on_error_completer = completer.clone();
        self.subscribe(
            move |value| completer.complete(func(value)),
            move |error| on_error_completer.error(error),
        );
        result
    }

    /// Suspends until the future resolves, yielding its outcome.
    ///
    /// This is the bridge between the protocol's push-style futures and
    /// async/await. If every handle to an unresolved future is dropped the
    /// call pends forever, matching the protocol's no-timeout model.
    pub async fn wait(&self) -> Result<T, E> {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let tx_err = tx.clone();
        self.subscribe(
            move |value| {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(Ok(value));
                }
            },
            move |error| {
                if let Some(tx) = tx_err.lock().take() {
                    let _ = tx.send(Err(error));
                }
            },
        );
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => std::future::pending().await,
        }
    }

    fn resolve(&self, outcome: Result<T, E>) {
        let waiters = {
            let mut state = self.state.lock();
            if !matches!(&*state, State::Pending(_)) {
                panic!("future already completed");
            }
            let next = match &outcome {
                Ok(value) => State::Completed(value.clone()),
                Err(error) => State::Failed(error.clone()),
            };
            match std::mem::replace(&mut *state, next) {
                State::Pending(waiters) => waiters,
                _ => Vec::new(),
            }
        };
        for waiter in waiters {
            match &outcome {
                Ok(value) => (waiter.on_value)(value.clone()),
                Err(error) => (waiter.on_error)(error.clone()),
            }
        }
    }
}

/// The exclusive resolver for one [`Future`].
///
/// Completers are cheap handles and may be cloned; all clones resolve the
/// same future, and resolving it more than once panics.
///
/// # Examples
///
/// ```rust
/// use remstream::reactive::Completer;
///
/// let completer = Completer::<&str, String>::new();
/// let future = completer.future();
/// assert!(!future.is_completed());
///
/// completer.complete("ready");
/// assert!(future.is_completed());
/// ```
pub struct Completer<T, E> {
    future: Future<T, E>,
}

impl<T, E> Clone for Completer<T, E> {
    fn clone(&self) -> Self {
        Self {
            future: self.future.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Completer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("future", &self.future)
            .finish()
    }
}

impl<T, E> Completer<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a completer and its future.
    #[must_use]
    pub fn new() -> Self {
        Self {
            future: Future::new(),
        }
    }

    /// Returns a handle onto the controlled future.
    #[must_use]
    pub fn future(&self) -> Future<T, E> {
        self.future.clone()
    }

    /// Resolves the future with a value.
    ///
    /// # Panics
    ///
    /// Panics if the future has already been resolved; a second resolution
    /// attempt is a contract violation by the completer's owner.
    pub fn complete(&self, value: T) {
        self.future.resolve(Ok(value));
    }

    /// Resolves the future with an error.
    ///
    /// # Panics
    ///
    /// Panics if the future has already been resolved.
    pub fn error(&self, error: E) {
        self.future.resolve(Err(error));
    }
}

impl<T, E> Default for Completer<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn test_subscribe_before_completion() {
        let completer = Completer::<i32, String>::new();
        let outcome = Arc::new(StdMutex::new(None));
        let slot = outcome.clone();
        completer
            .future()
            .subscribe(move |value| *slot.lock().unwrap() = Some(value), |_error| {});

        completer.complete(5);
        assert_eq!(*outcome.lock().unwrap(), Some(5));
        assert!(completer.future().is_completed());
    }

    #[tokio::test]
    async fn test_subscribe_after_completion_is_scheduled() {
        let completer = Completer::<i32, String>::new();
        completer.complete(5);

        // Late continuations run on a fresh task, observed through wait().
        let value = completer.future().wait().await;
        assert_eq!(value, Ok(5));
    }

    #[test]
    #[should_panic(expected = "future already completed")]
    fn test_double_completion_panics() {
        let completer = Completer::<i32, String>::new();
        completer.complete(1);
        completer.complete(2);
    }

    #[test]
    #[should_panic(expected = "future already completed")]
    fn test_error_after_completion_panics() {
        let completer = Completer::<i32, String>::new();
        completer.complete(1);
        completer.error("late".to_string());
    }

    #[test]
    fn test_error_reaches_error_handler() {
        let completer = Completer::<i32, String>::new();
        let errors = Arc::new(StdMutex::new(Vec::new()));
        let sink = errors.clone();
        completer
            .future()
            .subscribe(|_value| {}, move |error| sink.lock().unwrap().push(error));

        completer.error("boom".to_string());
        assert_eq!(*errors.lock().unwrap(), vec!["boom".to_string()]);
    }

    #[test]
    fn test_map_transforms_value() {
        let completer = Completer::<i32, String>::new();
        let mapped = completer.future().map(|value| value * 10);
        let outcome = Arc::new(StdMutex::new(None));
        let slot = outcome.clone();
        mapped.subscribe(move |value| *slot.lock().unwrap() = Some(value), |_error| {});

        completer.complete(4);
        assert_eq!(*outcome.lock().unwrap(), Some(40));
    }

    #[test]
    fn test_map_propagates_error() {
        let completer = Completer::<i32, String>::new();
        let mapped = completer.future().map(|value| value * 10);
        let errors = Arc::new(StdMutex::new(Vec::new()));
        let sink = errors.clone();
        mapped.subscribe(|_value| {}, move |error| sink.lock().unwrap().push(error));

        completer.error("boom".to_string());
        assert_eq!(*errors.lock().unwrap(), vec!["boom".to_string()]);
    }

    #[test]
    fn test_then_chains_futures() {
        let first = Completer::<i32, String>::new();
        let second = Completer::<i32, String>::new();
        let second_future = second.future();
        let chained = first.future().then(move |value| {
            assert_eq!(value, 1);
            second_future
        });
        let outcome = Arc::new(StdMutex::new(None));
        let slot = outcome.clone();
        chained.subscribe(move |value| *slot.lock().unwrap() = Some(value), |_error| {});

        first.complete(1);
        assert_eq!(*outcome.lock().unwrap(), None);
        second.complete(2);
        assert_eq!(*outcome.lock().unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_all_collects_in_input_order() {
        let a = Completer::<i32, String>::new();
        let b = Completer::<i32, String>::new();
        let c = Completer::<i32, String>::new();
        let all = Future::all(vec![a.future(), b.future(), c.future()]);

        // Complete out of order; results stay in input order.
        b.complete(2);
        c.complete(3);
        a.complete(1);

        assert_eq!(all.wait().await, Ok(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_all_first_error_wins() {
        let a = Completer::<i32, String>::new();
        let b = Completer::<i32, String>::new();
        let all = Future::all(vec![a.future(), b.future()]);

        a.error("first".to_string());
        // Later outcomes are ignored, not panicked on.
        b.error("second".to_string());

        assert_eq!(all.wait().await, Err("first".to_string()));
    }

    #[tokio::test]
    async fn test_all_empty_input() {
        let all = Future::<i32, String>::all(Vec::new());
        assert_eq!(all.wait().await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_immediate_resolves_on_a_fresh_turn() {
        let future = Future::<i32, String>::immediate(9);
        assert_eq!(future.wait().await, Ok(9));
    }

    #[tokio::test]
    async fn test_wait_observes_error() {
        let completer = Completer::<i32, String>::new();
        let future = completer.future();
        tokio::spawn(async move {
            completer.error("gone".to_string());
        });
        assert_eq!(future.wait().await, Err("gone".to_string()));
    }
}

// Made with Bob
