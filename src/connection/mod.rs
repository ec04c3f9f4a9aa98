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

//! The call/stream/future multiplexer over one channel.
//!
//! A [`Connection`] owns one [`Channel`] and multiplexes three interaction
//! shapes over it: one-shot method calls, push-based event streams, and
//! single-value futures. Streams and futures embedded anywhere inside call
//! arguments, return values, or events are rewritten on encode into id
//! references and hydrated on decode into local proxies, so values carrying
//! live asynchronous parts cross the wire transparently.
//!
//! # Id Spaces
//!
//! Each side allocates call, stream, and future ids from its own monotonic
//! counters, so the two directions can reuse the same numbers. Resolvers
//! for *remote*-sourced ids (what the peer allocated) and forwarders for
//! *locally*-sourced ids (what this side allocated) live in separate
//! registries, keyed in their respective spaces.
//!
//! # Protocol Faults
//!
//! Malformed records and references to ids with no registry entry are the
//! peer's bugs, not this side's: they are logged, published on
//! [`faults`](Connection::faults), and the connection carries on.

use crate::channel::Channel;
use crate::protocol::{ErrorBody, Message, ProtocolError, RpcError, Value};
use crate::protocol::{FUTURE_ID_KEY, STREAM_ID_KEY};
use crate::reactive::{Completer, Future, Stream, StreamController, Subscription};
use parking_lot::Mutex;
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// A registered method implementation.
///
/// Handlers receive decoded positional arguments and answer with a future;
/// completing it sends the `Return` record. A handler future that resolves
/// with an error is logged and answers nothing, leaving the caller pending.
pub type Handler = dyn Fn(Vec<Value>) -> Future<Value, RpcError> + Send + Sync;

/// One endpoint of a bidirectional RPC session.
///
/// Cloning is cheap and shares the endpoint. The connection reacts to
/// records as the channel delivers them; it spawns no polling task of its
/// own.
///
/// # Examples
///
/// ```rust
/// # async fn example() {
/// use remstream::{Connection, Future, MemoryChannel, Value};
///
/// let (left, right) = MemoryChannel::pair();
/// let server = Connection::new(left);
/// let client = Connection::new(right);
///
/// server.register("add", |args| {
///     let sum = args.iter().filter_map(Value::as_f64).sum::<f64>();
///     Future::immediate(Value::from(sum))
/// });
///
/// let result = client
///     .call("add", vec![Value::from(2.0), Value::from(3.0)])
///     .wait()
///     .await
///     .unwrap();
/// assert_eq!(result.as_f64(), Some(5.0));
/// # }
/// ```
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    id: Uuid,
    channel: Arc<dyn Channel>,
    next_call_id: AtomicU64,
    next_stream_id: AtomicU64,
    next_future_id: AtomicU64,
    /// Resolvers for calls this side issued, keyed by local call id.
    open_calls: Mutex<HashMap<u64, Completer<Value, RpcError>>>,
    /// Controllers for stream proxies hydrated from the peer, keyed in the
    /// peer's id space.
    open_streams: Mutex<HashMap<u64, StreamController<Value, RpcError>>>,
    /// Completers for future proxies hydrated from the peer, keyed in the
    /// peer's id space.
    open_futures: Mutex<HashMap<u64, Completer<Value, RpcError>>>,
    /// Forwarder subscriptions for streams this side transmitted, keyed by
    /// local stream id.
    stream_forwards: Mutex<HashMap<u64, Subscription<Value, RpcError>>>,
    /// Local ids of futures this side transmitted and not yet resolved.
    future_forwards: Mutex<HashSet<u64>>,
    methods: Mutex<HashMap<String, Arc<Handler>>>,
    faults: StreamController<ProtocolError, RpcError>,
    closed: AtomicBool,
}

impl Connection {
    /// Attaches an endpoint to a channel and starts reacting to its
    /// records.
    #[must_use]
    pub fn new<C: Channel + 'static>(channel: C) -> Self {
        let incoming = channel.incoming();
        let inner = Arc::new(Inner {
            id: Uuid::new_v4(),
            channel: Arc::new(channel),
            next_call_id: AtomicU64::new(0),
            next_stream_id: AtomicU64::new(0),
            next_future_id: AtomicU64::new(0),
            open_calls: Mutex::new(HashMap::new()),
            open_streams: Mutex::new(HashMap::new()),
            open_futures: Mutex::new(HashMap::new()),
            stream_forwards: Mutex::new(HashMap::new()),
            future_forwards: Mutex::new(HashSet::new()),
            methods: Mutex::new(HashMap::new()),
            faults: StreamController::new(),
            closed: AtomicBool::new(false),
        });

        let on_record = {
            let weak = Arc::downgrade(&inner);
            move |record: String| {
                if let Some(inner) = weak.upgrade() {
                    Inner::dispatch(&inner, &record);
                }
            }
        };
        let on_error = |error: RpcError| {
            tracing::warn!(%error, "channel error");
        };
        let on_close = {
            let weak = Arc::downgrade(&inner);
            move |reason: RpcError| {
                if let Some(inner) = weak.upgrade() {
                    Inner::teardown(&inner, &reason);
                }
            }
        };
        // The subscription handle is deliberately dropped; observers stay
        // attached until the channel stream closes.
        incoming.subscribe(on_record, on_error, on_close);

        Self { inner }
    }

    /// This endpoint's unique identity, for logging.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Registers a method handler under `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered on this connection.
    pub fn register<F>(&self, name: &str, handler: F)
    where
        F: Fn(Vec<Value>) -> Future<Value, RpcError> + Send + Sync + 'static,
    {
        let mut methods = self.inner.methods.lock();
        assert!(
            !methods.contains_key(name),
            "method {name:?} already registered",
        );
        methods.insert(name.to_string(), Arc::new(handler) as Arc<Handler>);
    }

    /// Invokes `method` on the peer with positional `args`.
    ///
    /// The returned future resolves when the peer answers. Calling on a
    /// closed connection fails immediately with
    /// [`RpcError::ConnectionClosed`]; otherwise the future stays pending
    /// until a `Return` or `Error` record arrives or the connection closes.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Future<Value, RpcError> {
        let inner = &self.inner;
        let completer = Completer::new();
        let future = completer.future();
        if inner.closed.load(Ordering::SeqCst) {
            completer.error(RpcError::ConnectionClosed {
                reason: "connection closed".to_string(),
            });
            return future;
        }
        let call_id = inner.next_call_id.fetch_add(1, Ordering::SeqCst);
        inner.open_calls.lock().insert(call_id, completer);
        let args = args
            .iter()
            .map(|arg| Inner::encode(inner, arg))
            .collect::<Vec<_>>();
        tracing::debug!(connection = %inner.id, call_id, method, "issuing call");
        inner.send(&Message::Call {
            call_id,
            method: method.to_string(),
            args,
        });
        future
    }

    /// The stream of protocol faults caused by the peer.
    ///
    /// It closes when the connection does.
    #[must_use]
    pub fn faults(&self) -> Stream<ProtocolError, RpcError> {
        self.inner.faults.stream()
    }

    /// Whether the underlying channel has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// The number of calls issued by this side and not yet answered.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.inner.open_calls.lock().len()
    }

    /// The number of live stream proxies hydrated from the peer.
    #[must_use]
    pub fn open_streams(&self) -> usize {
        self.inner.open_streams.lock().len()
    }

    /// The number of live future proxies hydrated from the peer.
    #[must_use]
    pub fn open_futures(&self) -> usize {
        self.inner.open_futures.lock().len()
    }
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// Serializes and sends one record, logging serialization failures.
    fn send(&self, message: &Message) {
        match message.to_text() {
            Ok(text) => self.channel.send(&text),
            Err(error) => {
                tracing::error!(connection = %self.id, %error, "record serialization failed");
            }
        }
    }

    /// Logs a peer-caused fault and publishes it on the faults stream.
    fn fault(&self, fault: ProtocolError) {
        tracing::error!(connection = %self.id, %fault, "protocol fault");
        if !self.closed.load(Ordering::SeqCst) {
            self.faults.add(fault);
        }
    }

    /// Rewrites a value into wire JSON, replacing embedded futures and
    /// streams with id references and attaching forwarders for them.
    ///
    /// A stream must be transmitted before it closes: a stream that is
    /// already closed at encode time gets a forwarder that never fires, so
    /// the remote proxy never sees its close and both sides' registry
    /// entries linger until teardown.
    fn encode(inner: &Arc<Self>, value: &Value) -> Json {
        match value {
            Value::Null => Json::Null,
            Value::Bool(flag) => Json::Bool(*flag),
            Value::Number(number) => serde_json::Number::from_f64(*number)
                .map_or(Json::Null, Json::Number),
            Value::Text(text) => Json::String(text.clone()),
            Value::List(items) => Json::Array(
                items.iter().map(|item| Self::encode(inner, item)).collect(),
            ),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(key, entry)| (key.clone(), Self::encode(inner, entry)))
                    .collect(),
            ),
            Value::Future(future) => {
                let future_id = inner.next_future_id.fetch_add(1, Ordering::SeqCst);
                inner.future_forwards.lock().insert(future_id);
                let on_value = {
                    let weak = Arc::downgrade(inner);
                    move |value: Value| {
                        if let Some(inner) = weak.upgrade() {
                            inner.future_forwards.lock().remove(&future_id);
                            if !inner.closed.load(Ordering::SeqCst) {
                                let value = Self::encode(&inner, &value);
                                inner.send(&Message::FutureCompleted { future_id, value });
                            }
                        }
                    }
                };
                let on_error = {
                    let weak = Arc::downgrade(inner);
                    move |error: RpcError| {
                        if let Some(inner) = weak.upgrade() {
                            inner.future_forwards.lock().remove(&future_id);
                            if !inner.closed.load(Ordering::SeqCst) {
                                let error = Self::encode(&inner, &Value::from(error));
                                inner.send(&Message::FutureError { future_id, error });
                            }
                        }
                    }
                };
                future.subscribe(on_value, on_error);
                reference(FUTURE_ID_KEY, future_id)
            }
            Value::Stream(stream) => {
                let stream_id = inner.next_stream_id.fetch_add(1, Ordering::SeqCst);
                let on_event = {
                    let weak = Arc::downgrade(inner);
                    move |event: Value| {
                        if let Some(inner) = weak.upgrade() {
                            if !inner.closed.load(Ordering::SeqCst) {
                                let event = Self::encode(&inner, &event);
                                inner.send(&Message::StreamEvent { stream_id, event });
                            }
                        }
                    }
                };
                let on_error = move |error: RpcError| {
                    tracing::warn!(stream_id, %error, "transmitted stream error has no wire form");
                };
                let on_close = {
                    let weak = Arc::downgrade(inner);
                    move |reason: RpcError| {
                        if let Some(inner) = weak.upgrade() {
                            inner.stream_forwards.lock().remove(&stream_id);
                            if !inner.closed.load(Ordering::SeqCst) {
                                let reason = Self::encode(&inner, &Value::from(reason));
                                inner.send(&Message::StreamClose { stream_id, reason });
                            }
                        }
                    }
                };
                let forward = stream.subscribe(on_event, on_error, on_close);
                inner.stream_forwards.lock().insert(stream_id, forward);
                reference(STREAM_ID_KEY, stream_id)
            }
        }
    }

    /// Rebuilds a value from wire JSON, hydrating id references into local
    /// proxies registered for later resolution.
    fn decode(inner: &Arc<Self>, json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(flag) => Value::Bool(*flag),
            Json::Number(number) => Value::Number(number.as_f64().unwrap_or_default()),
            Json::String(text) => Value::Text(text.clone()),
            Json::Array(items) => Value::List(
                items.iter().map(|item| Self::decode(inner, item)).collect(),
            ),
            Json::Object(entries) => {
                if let Some(future_id) = reference_id(entries, FUTURE_ID_KEY) {
                    let completer = Completer::new();
                    let future = completer.future();
                    inner.open_futures.lock().insert(future_id, completer);
                    return Value::Future(future);
                }
                if let Some(stream_id) = reference_id(entries, STREAM_ID_KEY) {
                    let controller = StreamController::new();
                    let stream = controller.stream();
                    inner.open_streams.lock().insert(stream_id, controller);
                    return Value::Stream(stream);
                }
                Value::Map(
                    entries
                        .iter()
                        .map(|(key, entry)| (key.clone(), Self::decode(inner, entry)))
                        .collect::<BTreeMap<_, _>>(),
                )
            }
        }
    }

    /// Parses and routes one incoming record.
    fn dispatch(inner: &Arc<Self>, record: &str) {
        match Message::from_text(record) {
            Ok(message) => Self::handle(inner, message),
            Err(fault) => inner.fault(fault),
        }
    }

    fn handle(inner: &Arc<Self>, message: Message) {
        match message {
            Message::Return { call_id, value } => {
                let Some(completer) = inner.open_calls.lock().remove(&call_id) else {
                    inner.fault(ProtocolError::NonexistentCall { call_id });
                    return;
                };
                completer.complete(Self::decode(inner, &value));
            }
            Message::StreamEvent { stream_id, event } => {
                let Some(controller) = inner.open_streams.lock().get(&stream_id).cloned() else {
                    inner.fault(ProtocolError::NonexistentStream { stream_id });
                    return;
                };
                controller.add(Self::decode(inner, &event));
            }
            Message::StreamClose { stream_id, reason } => {
                let Some(controller) = inner.open_streams.lock().remove(&stream_id) else {
                    inner.fault(ProtocolError::NonexistentStream { stream_id });
                    return;
                };
                controller.close(RpcError::Application(Self::decode(inner, &reason)));
            }
            Message::FutureCompleted { future_id, value } => {
                let Some(completer) = inner.open_futures.lock().remove(&future_id) else {
                    inner.fault(ProtocolError::NonexistentFuture { future_id });
                    return;
                };
                completer.complete(Self::decode(inner, &value));
            }
            Message::FutureError { future_id, error } => {
                let Some(completer) = inner.open_futures.lock().remove(&future_id) else {
                    inner.fault(ProtocolError::NonexistentFuture { future_id });
                    return;
                };
                completer.error(RpcError::Application(Self::decode(inner, &error)));
            }
            Message::Call {
                call_id,
                method,
                args,
            } => Self::handle_call(inner, call_id, &method, &args),
            Message::Error { error } => {
                let ErrorBody { method, call_id } = error;
                let Some(completer) = inner.open_calls.lock().remove(&call_id) else {
                    inner.fault(ProtocolError::NonexistentCall { call_id });
                    return;
                };
                completer.error(RpcError::NonexistentMethod { method, call_id });
            }
        }
    }

    fn handle_call(inner: &Arc<Self>, call_id: u64, method: &str, args: &[Json]) {
        let Some(handler) = inner.methods.lock().get(method).cloned() else {
            tracing::debug!(connection = %inner.id, call_id, method, "call to unknown method");
            inner.send(&Message::Error {
                error: ErrorBody {
                    method: method.to_string(),
                    call_id,
                },
            });
            return;
        };
        let args = args
            .iter()
            .map(|arg| Self::decode(inner, arg))
            .collect::<Vec<_>>();
        let method = method.to_string();
        let on_value = {
            let weak = Arc::downgrade(inner);
            move |value: Value| {
                if let Some(inner) = weak.upgrade() {
                    if !inner.closed.load(Ordering::SeqCst) {
                        let value = Self::encode(&inner, &value);
                        inner.send(&Message::Return { call_id, value });
                    }
                }
            }
        };
        let on_error = move |error: RpcError| {
            // No wire record answers a failed handler; the caller stays
            // pending, matching the no-timeout model.
            tracing::warn!(call_id, method, %error, "handler failed");
        };
        handler(args).subscribe(on_value, on_error);
    }

    /// Runs exactly once when the channel closes: fails every pending
    /// resolver with one shared reason and detaches every forwarder.
    fn teardown(inner: &Arc<Self>, cause: &RpcError) {
        if inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let reason = match cause {
            RpcError::ConnectionClosed { reason } => reason.clone(),
            other => other.to_string(),
        };
        tracing::info!(connection = %inner.id, reason, "connection closed");
        let notice = RpcError::ConnectionClosed { reason };

        // Collect under each lock, invoke outside all of them; resolver
        // callbacks may re-enter the connection.
        let calls = inner.open_calls.lock().drain().collect::<Vec<_>>();
        let futures = inner.open_futures.lock().drain().collect::<Vec<_>>();
        let streams = inner.open_streams.lock().drain().collect::<Vec<_>>();
        let forwards = inner.stream_forwards.lock().drain().collect::<Vec<_>>();
        inner.future_forwards.lock().clear();

        for (_, completer) in calls {
            completer.error(notice.clone());
        }
        for (_, completer) in futures {
            completer.error(notice.clone());
        }
        for (_, controller) in streams {
            controller.close(notice.clone());
        }
        for (_, forward) in forwards {
            forward.unsubscribe();
        }
        inner.faults.close(notice);
    }
}

/// Builds a single-key `{key: id}` reference object.
fn reference(key: &str, id: u64) -> Json {
    let mut entries = serde_json::Map::with_capacity(1);
    entries.insert(key.to_string(), Json::from(id));
    Json::Object(entries)
}

/// Extracts the id from a single-key reference object, if `entries` is one.
///
/// Objects merely *containing* a reference key alongside other fields are
/// ordinary maps; only the exact single-key shape is a reference.
fn reference_id(entries: &serde_json::Map<String, Json>, key: &str) -> Option<u64> {
    if entries.len() != 1 {
        return None;
    }
    entries.get(key)?.as_u64()
}

// Made with Bob
