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

//! Multi-observer push streams.
//!
//! A [`Stream`] is an unbounded, push-only sequence of events terminated by
//! an explicit close with a reason. It is written exclusively through the
//! [`StreamController`] that created it. Observers attach and detach freely
//! while the stream is open; every observer receives an independent clone of
//! every event, in push order.
//!
//! # Lifecycle
//!
//! A stream is created open, delivers events and errors while open, and
//! becomes permanently inert once closed. Close is terminal and monotonic:
//! no event or error callback ever fires after the close callback has fired.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Callbacks registered by one observer.
struct Callbacks<T, E> {
    on_event: Box<dyn FnMut(T) + Send>,
    on_error: Option<Box<dyn FnMut(E) + Send>>,
    on_close: Option<Box<dyn FnMut(E) + Send>>,
}

/// One attached observer. The `active` flag is checked immediately before
/// every callback invocation so that [`Subscription::unsubscribe`] takes
/// effect even during an in-flight delivery.
struct Observer<T, E> {
    active: AtomicBool,
    callbacks: Mutex<Callbacks<T, E>>,
}

struct Shared<T, E> {
    observers: Mutex<Vec<Arc<Observer<T, E>>>>,
    closed: AtomicBool,
}

/// A multi-observer, push-only, unbounded sequence of events.
///
/// Streams are cheap handles; cloning one yields another handle onto the
/// same underlying sequence. Only the [`StreamController`] that created the
/// stream can push events, errors, or the terminal close into it.
///
/// # Examples
///
/// ```rust
/// use remstream::reactive::StreamController;
/// use std::sync::{Arc, Mutex};
///
/// let controller = StreamController::<i32, String>::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = seen.clone();
/// let _sub = controller.stream().listen(move |event| {
///     sink.lock().unwrap().push(event);
/// });
///
/// controller.add(1);
/// controller.add(2);
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
pub struct Stream<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Stream<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Stream<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("closed", &self.shared.closed.load(Ordering::SeqCst))
            .field("observers", &self.shared.observers.lock().len())
            .finish()
    }
}

impl<T, E> Stream<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                observers: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Returns `true` if the stream has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Returns `true` if `self` and `other` are handles onto the same
    /// underlying stream.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Attaches an observer that only cares about events.
    ///
    /// Errors delivered to this observer have no handler and are logged at
    /// error level; the close notification is silently discarded. Use
    /// [`subscribe`](Self::subscribe) to handle all three.
    ///
    /// The returned [`Subscription`] detaches the observer when
    /// [`unsubscribe`](Subscription::unsubscribe) is called. Dropping the
    /// handle does *not* detach.
    pub fn listen<F>(&self, on_event: F) -> Subscription<T, E>
    where
        F: FnMut(T) + Send + 'static,
    {
        self.attach(Box::new(on_event), None, None)
    }

    /// Attaches an observer with event, error, and close handlers.
    ///
    /// Delivery order matches push order, and multiple observers each
    /// receive an independent clone of every event.
    pub fn subscribe<F, G, H>(&self, on_event: F, on_error: G, on_close: H) -> Subscription<T, E>
    where
        F: FnMut(T) + Send + 'static,
        G: FnMut(E) + Send + 'static,
        H: FnMut(E) + Send + 'static,
    {
        self.attach(
            Box::new(on_event),
            Some(Box::new(on_error)),
            Some(Box::new(on_close)),
        )
    }

    fn attach(
        &self,
        on_event: Box<dyn FnMut(T) + Send>,
        on_error: Option<Box<dyn FnMut(E) + Send>>,
        on_close: Option<Box<dyn FnMut(E) + Send>>,
    ) -> Subscription<T, E> {
        let observer = Arc::new(Observer {
            active: AtomicBool::new(true),
            callbacks: Mutex::new(Callbacks {
                on_event,
                on_error,
                on_close,
            }),
        });
        self.shared.observers.lock().push(observer.clone());
        Subscription {
            stream: Arc::downgrade(&self.shared),
            observer,
        }
    }

    /// Returns a derived stream whose events are `func` applied to this
    /// stream's events. Errors are forwarded opaquely and the derived stream
    /// closes when this one closes.
    pub fn map<B, F>(&self, mut func: F) -> Stream<B, E>
    where
        B: Clone + Send + 'static,
        F: FnMut(T) -> B + Send + 'static,
    {
        let controller = StreamController::new();
        let stream = controller.stream();
        let events = controller.clone();
        let errors = controller.clone();
        let _ = self.subscribe(
            move |event| events.add(func(event)),
            move |error| errors.error(error),
            move |reason| controller.close(reason),
        );
        stream
    }

    /// Returns a derived stream that forwards only the events for which
    /// `pred` returns `true`. Errors and close propagate unchanged.
    pub fn filter<F>(&self, mut pred: F) -> Stream<T, E>
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        let controller = StreamController::new();
        let stream = controller.stream();
        let events = controller.clone();
        let errors = controller.clone();
        let _ = self.subscribe(
            move |event| {
                if pred(&event) {
                    events.add(event);
                }
            },
            move |error| errors.error(error),
            move |reason| controller.close(reason),
        );
        stream
    }

    /// Returns a derived stream that suppresses an event equal to the
    /// previous one. Errors and close propagate unchanged.
    pub fn distinct(&self) -> Stream<T, E>
    where
        T: PartialEq,
    {
        let controller = StreamController::new();
        let stream = controller.stream();
        let events = controller.clone();
        let errors = controller.clone();
        let mut last: Option<T> = None;
        let _ = self.subscribe(
            move |event| {
                if last.as_ref() != Some(&event) {
                    last = Some(event.clone());
                    events.add(event);
                }
            },
            move |error| errors.error(error),
            move |reason| controller.close(reason),
        );
        stream
    }

    fn emit(&self, event: T) {
        assert!(
            !self.shared.closed.load(Ordering::SeqCst),
            "event pushed to a closed stream"
        );
        for observer in self.snapshot() {
            if observer.active.load(Ordering::SeqCst) {
                let mut callbacks = observer.callbacks.lock();
                (callbacks.on_event)(event.clone());
            }
        }
    }

    fn emit_error(&self, error: E) {
        assert!(
            !self.shared.closed.load(Ordering::SeqCst),
            "error pushed to a closed stream"
        );
        for observer in self.snapshot() {
            if observer.active.load(Ordering::SeqCst) {
                let mut callbacks = observer.callbacks.lock();
                match callbacks.on_error.as_mut() {
                    Some(on_error) => on_error(error.clone()),
                    None => {
                        tracing::error!("stream error delivered to observer with no error handler");
                    }
                }
            }
        }
    }

    fn emit_close(&self, reason: E) {
        assert!(
            !self.shared.closed.swap(true, Ordering::SeqCst),
            "stream closed twice"
        );
        // The stream is inert from here on; release every observer.
        let observers = std::mem::take(&mut *self.shared.observers.lock());
        for observer in observers {
            if observer.active.load(Ordering::SeqCst) {
                let mut callbacks = observer.callbacks.lock();
                if let Some(on_close) = callbacks.on_close.as_mut() {
                    on_close(reason.clone());
                }
            }
        }
    }

    fn snapshot(&self) -> Vec<Arc<Observer<T, E>>> {
        self.shared.observers.lock().clone()
    }
}

/// The exclusive write side of a [`Stream`].
///
/// Only the controller that created a stream may push events or errors into
/// it or close it. Controllers are cheap handles and may be cloned; all
/// clones write to the same stream.
///
/// Pushes deliver synchronously on the pushing thread, holding each
/// observer's callback slot for the duration of its callback. An observer
/// callback therefore must not push back into its own source stream;
/// re-entrant pushes deadlock. Defer with `tokio::spawn` instead.
///
/// # Examples
///
/// ```rust
/// use remstream::reactive::StreamController;
///
/// let controller = StreamController::<&str, String>::new();
/// let stream = controller.stream();
///
/// controller.add("hello");
/// controller.close("done".to_string());
/// assert!(stream.is_closed());
/// ```
pub struct StreamController<T, E> {
    stream: Stream<T, E>,
}

impl<T, E> Clone for StreamController<T, E> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
        }
    }
}

impl<T, E> fmt::Debug for StreamController<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamController")
            .field("stream", &self.stream)
            .finish()
    }
}

impl<T, E> StreamController<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a controller and its stream.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stream: Stream::new(),
        }
    }

    /// Returns a handle onto the controlled stream.
    #[must_use]
    pub fn stream(&self) -> Stream<T, E> {
        self.stream.clone()
    }

    /// Pushes the next event to every attached observer.
    ///
    /// # Panics
    ///
    /// Panics if the stream has been closed. Pushing after close is a
    /// contract violation by the controller's owner.
    pub fn add(&self, event: T) {
        self.stream.emit(event);
    }

    /// Pushes an error to every attached observer.
    ///
    /// # Panics
    ///
    /// Panics if the stream has been closed.
    pub fn error(&self, error: E) {
        self.stream.emit_error(error);
    }

    /// Closes the stream, delivering `reason` to every observer's close
    /// handler. The stream is permanently inert afterwards.
    ///
    /// # Panics
    ///
    /// Panics if the stream has already been closed; close is terminal.
    pub fn close(&self, reason: E) {
        self.stream.emit_close(reason);
    }
}

impl<T, E> Default for StreamController<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A handle onto one attached stream observer.
///
/// Dropping a subscription does *not* detach the observer; call
/// [`unsubscribe`](Self::unsubscribe) to stop deliveries. This mirrors the
/// detachable-observer model of the wire protocol, where forwarding
/// subscriptions outlive the scope that created them.
pub struct Subscription<T, E> {
    stream: Weak<Shared<T, E>>,
    observer: Arc<Observer<T, E>>,
}

impl<T, E> fmt::Debug for Subscription<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl<T, E> Subscription<T, E> {
    /// Detaches the observer. Idempotent: unsubscribing twice is a no-op.
    ///
    /// No callback fires after this call returns, even if an unrelated
    /// delivery is in flight when it is made.
    pub fn unsubscribe(&self) {
        self.observer.active.store(false, Ordering::SeqCst);
        if let Some(shared) = self.stream.upgrade() {
            shared
                .observers
                .lock()
                .retain(|candidate| !Arc::ptr_eq(candidate, &self.observer));
        }
    }

    /// Returns `true` if the observer is still attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.observer.active.load(Ordering::SeqCst)
    }
}


// Made with Bob
