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

//! End-to-end connection tests over paired in-memory channels.

use remstream::reactive::{Completer, StreamController};
use remstream::{
    Channel, Connection, Future, MemoryChannel, ProtocolError, RpcError, Value,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn connected_pair() -> (Connection, Connection) {
    let (left, right) = MemoryChannel::pair();
    (Connection::new(left), Connection::new(right))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

#[tokio::test]
async fn test_call_round_trip() {
    let (server, client) = connected_pair();
    server.register("add", |args| {
        let sum = args.iter().filter_map(Value::as_f64).sum::<f64>();
        Future::immediate(Value::from(sum))
    });
    let result = client
        .call("add", vec![Value::from(2.0), Value::from(3.0)])
        .wait()
        .await
        .unwrap();
    assert_eq!(result.as_f64(), Some(5.0));
    settle().await;
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_calls_resolve_independently() {
    let (server, client) = connected_pair();
    server.register("echo", |mut args| Future::immediate(args.remove(0)));
    let first = client.call("echo", vec![Value::from("first")]);
    let second = client.call("echo", vec![Value::from("second")]);
    assert_eq!(second.wait().await.unwrap().as_str(), Some("second"));
    assert_eq!(first.wait().await.unwrap().as_str(), Some("first"));
}

#[tokio::test]
async fn test_plain_values_round_trip_unchanged() {
    let (server, client) = connected_pair();
    server.register("echo", |mut args| Future::immediate(args.remove(0)));
    let mut inner = BTreeMap::new();
    inner.insert("flag".to_string(), Value::from(true));
    inner.insert("nothing".to_string(), Value::Null);
    inner.insert("label".to_string(), Value::from("nested"));
    let original = Value::List(vec![
        Value::from(1.5),
        Value::Map(inner),
        Value::List(vec![Value::from("a"), Value::from("b")]),
    ]);
    let echoed = client
        .call("echo", vec![original.clone()])
        .wait()
        .await
        .unwrap();
    assert_eq!(echoed, original);
}

#[tokio::test]
async fn test_unknown_method_fails_the_call() {
    let (_server, client) = connected_pair();
    let error = client
        .call("no_such_method", vec![])
        .wait()
        .await
        .unwrap_err();
    assert_eq!(
        error,
        RpcError::NonexistentMethod {
            method: "no_such_method".to_string(),
            call_id: 0,
        }
    );
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
#[should_panic(expected = "already registered")]
async fn test_duplicate_registration_panics() {
    let (server, _client) = connected_pair();
    server.register("dup", |_| Future::immediate(Value::Null));
    server.register("dup", |_| Future::immediate(Value::Null));
}

#[tokio::test]
async fn test_stream_in_return_value_forwards_events_in_order() {
    let (server, client) = connected_pair();
    let first = StreamController::new();
    let second = StreamController::new();
    let upstream = first.stream();
    server.register("watch_first", move |_| {
        Future::immediate(Value::from(upstream.clone()))
    });
    let upstream = second.stream();
    server.register("watch_second", move |_| {
        Future::immediate(Value::from(upstream.clone()))
    });
    server.register("echo", |mut args| Future::immediate(args.remove(0)));

    let result = client.call("watch_first", vec![]).wait().await.unwrap();
    let proxy = result.as_stream().unwrap().clone();
    let result = client.call("watch_second", vec![]).wait().await.unwrap();
    let proxy_second = result.as_stream().unwrap().clone();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let close_sink = closed.clone();
    proxy.subscribe(
        move |event| sink.lock().unwrap().push(event),
        |_| {},
        move |reason| *close_sink.lock().unwrap() = Some(reason),
    );
    let seen_second = Arc::new(Mutex::new(Vec::new()));
    let sink = seen_second.clone();
    proxy_second.subscribe(
        move |event| sink.lock().unwrap().push(event),
        |_| {},
        |_| {},
    );
    assert_eq!(client.open_streams(), 2);

    // Interleave unrelated traffic between the pushes: a sibling stream's
    // events and round-tripped calls share the wire with the watched one.
    first.add(Value::from(1.0));
    second.add(Value::from(10.0));
    client.call("echo", vec![Value::from("noise")]).wait().await.unwrap();
    first.add(Value::from(2.0));
    second.add(Value::from(20.0));
    client.call("echo", vec![Value::from("noise")]).wait().await.unwrap();
    first.add(Value::from(3.0));
    second.close(RpcError::from("done"));
    first.close(RpcError::from("finished"));
    settle().await;

    let events = seen.lock().unwrap().clone();
    assert_eq!(
        events.iter().map(|e| e.as_f64().unwrap()).collect::<Vec<_>>(),
        vec![1.0, 2.0, 3.0],
    );
    let events = seen_second.lock().unwrap().clone();
    assert_eq!(
        events.iter().map(|e| e.as_f64().unwrap()).collect::<Vec<_>>(),
        vec![10.0, 20.0],
    );
    let reason = closed.lock().unwrap().clone().unwrap();
    assert_eq!(
        reason,
        RpcError::Application(Value::from("finished")),
    );
    assert_eq!(client.open_streams(), 0);
}

#[tokio::test]
async fn test_stream_closed_before_transmit_leaves_proxy_open() {
    let (server, client) = connected_pair();
    server.register("stale", |_| {
        let controller = StreamController::<Value, RpcError>::new();
        let stream = controller.stream();
        controller.close(RpcError::from("gone"));
        Future::immediate(Value::from(stream))
    });

    let result = client.call("stale", vec![]).wait().await.unwrap();
    let proxy = result.as_stream().unwrap().clone();
    settle().await;

    // A stream already closed at encode time has nothing left to forward;
    // the proxy never learns of the close and stays registered until
    // teardown. Streams must be transmitted before they close.
    assert!(!proxy.is_closed());
    assert_eq!(client.open_streams(), 1);
}

#[tokio::test]
async fn test_future_in_argument_resolves_remotely() {
    let (server, client) = connected_pair();
    let received = Arc::new(Mutex::new(None));
    let sink = received.clone();
    server.register("track", move |mut args| {
        let sink = sink.clone();
        args.remove(0).as_future().unwrap().subscribe(
            move |value| *sink.lock().unwrap() = Some(value),
            |_| {},
        );
        Future::immediate(Value::Null)
    });

    let completer = Completer::new();
    client
        .call("track", vec![Value::from(completer.future())])
        .wait()
        .await
        .unwrap();
    settle().await;
    assert_eq!(server.open_futures(), 1);

    completer.complete(Value::from("later"));
    settle().await;
    assert_eq!(
        received.lock().unwrap().as_ref().and_then(Value::as_str),
        Some("later"),
    );
    assert_eq!(server.open_futures(), 0);
}

#[tokio::test]
async fn test_future_error_crosses_the_wire() {
    let (server, client) = connected_pair();
    let failure = Arc::new(Mutex::new(None));
    let sink = failure.clone();
    server.register("track", move |mut args| {
        let sink = sink.clone();
        args.remove(0).as_future().unwrap().subscribe(
            |_| {},
            move |error| *sink.lock().unwrap() = Some(error),
        );
        Future::immediate(Value::Null)
    });

    let completer = Completer::new();
    client
        .call("track", vec![Value::from(completer.future())])
        .wait()
        .await
        .unwrap();
    completer.error(RpcError::from("nope"));
    settle().await;

    assert_eq!(
        *failure.lock().unwrap(),
        Some(RpcError::Application(Value::from("nope"))),
    );
    assert_eq!(server.open_futures(), 0);
}

#[tokio::test]
async fn test_nested_references_hydrate_inside_structures() {
    let (server, client) = connected_pair();
    server.register("bundle", |_| {
        let controller = StreamController::<Value, RpcError>::new();
        controller.add(Value::from("early")); // before any observer, dropped
        let mut map = BTreeMap::new();
        map.insert("numbers".to_string(), Value::from(controller.stream()));
        map.insert(
            "answer".to_string(),
            Value::from(Future::immediate(Value::from(42.0))),
        );
        map.insert("label".to_string(), Value::from("bundle"));
        Future::immediate(Value::List(vec![Value::Map(map)]))
    });

    let result = client.call("bundle", vec![]).wait().await.unwrap();
    let map = result.as_list().unwrap()[0].as_map().unwrap();
    assert_eq!(map["label"].as_str(), Some("bundle"));
    assert!(map["numbers"].as_stream().is_some());
    let answer = map["answer"].as_future().unwrap();
    assert_eq!(answer.wait().await.unwrap().as_f64(), Some(42.0));
}

#[tokio::test]
async fn test_malformed_record_surfaces_a_fault() {
    let (channel, peer) = MemoryChannel::pair();
    let connection = Connection::new(peer);
    let faults = Arc::new(Mutex::new(Vec::new()));
    let sink = faults.clone();
    connection.faults().listen(move |fault| sink.lock().unwrap().push(fault));

    channel.send("this is not a record");
    settle().await;

    assert_eq!(
        *faults.lock().unwrap(),
        vec![ProtocolError::MalformedMessage {
            raw: "this is not a record".to_string(),
        }],
    );
    assert!(!connection.is_closed());
}

#[tokio::test]
async fn test_unknown_ids_fault_without_disrupting_traffic() {
    let (channel, peer) = MemoryChannel::pair();
    let connection = Connection::new(peer);
    connection.register("ping", |_| Future::immediate(Value::from("pong")));
    let faults = Arc::new(Mutex::new(Vec::new()));
    let sink = faults.clone();
    connection.faults().listen(move |fault| sink.lock().unwrap().push(fault));

    channel.send(r#"{"call_id":77,"value":1}"#);
    channel.send(r#"{"stream_id":8,"event":1}"#);
    channel.send(r#"{"future_id":9,"value":1}"#);
    settle().await;

    assert_eq!(
        *faults.lock().unwrap(),
        vec![
            ProtocolError::NonexistentCall { call_id: 77 },
            ProtocolError::NonexistentStream { stream_id: 8 },
            ProtocolError::NonexistentFuture { future_id: 9 },
        ],
    );

    // The connection still answers calls after faulting.
    let replies = Arc::new(Mutex::new(Vec::new()));
    let sink = replies.clone();
    channel.incoming().listen(move |record| sink.lock().unwrap().push(record));
    channel.send(r#"{"call_id":0,"method":"ping","args":[]}"#);
    settle().await;
    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("pong"));
}

#[tokio::test]
async fn test_teardown_fails_everything_with_one_reason() {
    let (left, right) = MemoryChannel::pair();
    let server = Connection::new(left);
    let client = Connection::new(right);

    let source = StreamController::new();
    let upstream = source.stream();
    server.register("watch", move |_| {
        Future::immediate(Value::from(upstream.clone()))
    });
    server.register("hang", |_| Completer::new().future());
    server.register("promise", |_| {
        // The inner future is never resolved; its proxy stays hydrated.
        Future::immediate(Value::from(Completer::new().future()))
    });

    let result = client.call("watch", vec![]).wait().await.unwrap();
    let proxy = result.as_stream().unwrap().clone();
    let result = client.call("promise", vec![]).wait().await.unwrap();
    let promised = result.as_future().unwrap().clone();
    let pending = client.call("hang", vec![]);
    assert_eq!(client.open_futures(), 1);

    let stream_close = Arc::new(Mutex::new(None));
    let sink = stream_close.clone();
    proxy.subscribe(|_| {}, |_| {}, move |reason| {
        *sink.lock().unwrap() = Some(reason);
    });
    let future_errors = Arc::new(Mutex::new(Vec::new()));
    let sink = future_errors.clone();
    promised.subscribe(|_| {}, move |error| sink.lock().unwrap().push(error));

    // Dropping the server drops its channel endpoint, closing both sides.
    drop(server);
    settle().await;

    let notice = RpcError::ConnectionClosed {
        reason: "memory channel dropped".to_string(),
    };
    assert!(client.is_closed());
    assert_eq!(pending.wait().await.unwrap_err(), notice);
    assert_eq!(*stream_close.lock().unwrap(), Some(notice.clone()));
    assert_eq!(*future_errors.lock().unwrap(), vec![notice]);
    assert_eq!(client.pending_calls(), 0);
    assert_eq!(client.open_streams(), 0);
    assert_eq!(client.open_futures(), 0);
}

#[tokio::test]
async fn test_call_after_close_fails_immediately() {
    let (left, right) = MemoryChannel::pair();
    let client = Connection::new(right);
    left.close("going away");
    settle().await;
    assert!(client.is_closed());
    let error = client.call("anything", vec![]).wait().await.unwrap_err();
    assert!(error.is_connection_closed());
}
