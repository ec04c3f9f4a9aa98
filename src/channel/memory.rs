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

//! In-memory paired channels.

use super::Channel;
use crate::protocol::RpcError;
use crate::reactive::{Stream, StreamController};
use tokio::sync::mpsc;

/// One delivery unit on the in-memory wire.
enum Frame {
    Record(String),
    Close(String),
}

/// One endpoint of an in-process channel pair.
///
/// Records sent on one endpoint appear, in order, on the other endpoint's
/// [`incoming`](Channel::incoming) stream. Dropping an endpoint closes both
/// sides with a `"memory channel dropped"` reason;
/// [`close`](MemoryChannel::close) closes both sides with an explicit one.
///
/// # Examples
///
/// ```rust
/// # async fn example() {
/// use remstream::{Channel, MemoryChannel};
///
/// let (left, right) = MemoryChannel::pair();
/// right.incoming().listen(|record| println!("received: {record}"));
/// left.send("hello");
/// # }
/// ```
pub struct MemoryChannel {
    incoming: Stream<String, RpcError>,
    tx_peer: mpsc::UnboundedSender<Frame>,
    tx_self: mpsc::UnboundedSender<Frame>,
}

impl MemoryChannel {
    /// Creates two endpoints wired back to back.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (tx_left, rx_left) = mpsc::unbounded_channel();
        let (tx_right, rx_right) = mpsc::unbounded_channel();
        let left = Self {
            incoming: Self::pump(rx_left),
            tx_peer: tx_right.clone(),
            tx_self: tx_left.clone(),
        };
        let right = Self {
            incoming: Self::pump(rx_right),
            tx_peer: tx_left,
            tx_self: tx_right,
        };
        (left, right)
    }

    /// Drains one endpoint's inbox into its incoming stream.
    fn pump(mut rx: mpsc::UnboundedReceiver<Frame>) -> Stream<String, RpcError> {
        let controller = StreamController::new();
        let stream = controller.stream();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Some(Frame::Record(record)) => controller.add(record),
                    Some(Frame::Close(reason)) => {
                        controller.close(RpcError::ConnectionClosed { reason });
                        return;
                    }
                    None => {
                        controller.close(RpcError::ConnectionClosed {
                            reason: "memory channel dropped".to_string(),
                        });
                        return;
                    }
                }
            }
        });
        stream
    }

    /// Closes both endpoints with the given reason.
    ///
    /// The first close wins; later closes and drops are ignored because
    /// each pump stops reading after its first close frame.
    pub fn close(&self, reason: &str) {
        let _ = self.tx_peer.send(Frame::Close(reason.to_string()));
        let _ = self.tx_self.send(Frame::Close(reason.to_string()));
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.close("memory channel dropped");
    }
}

impl Channel for MemoryChannel {
    fn incoming(&self) -> Stream<String, RpcError> {
        self.incoming.clone()
    }

    fn send(&self, record: &str) {
        // A dropped peer is reported through the incoming close, not here.
        let _ = self.tx_peer.send(Frame::Record(record.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn test_records_cross_in_order() {
        let (left, right) = MemoryChannel::pair();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        right.incoming().listen(move |record| sink.lock().unwrap().push(record));
        left.send("one");
        left.send("two");
        left.send("three");
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_both_directions_are_independent() {
        let (left, right) = MemoryChannel::pair();
        let left_seen = Arc::new(Mutex::new(Vec::new()));
        let right_seen = Arc::new(Mutex::new(Vec::new()));
        let sink = left_seen.clone();
        left.incoming().listen(move |record| sink.lock().unwrap().push(record));
        let sink = right_seen.clone();
        right.incoming().listen(move |record| sink.lock().unwrap().push(record));
        left.send("to-right");
        right.send("to-left");
        settle().await;
        assert_eq!(*left_seen.lock().unwrap(), vec!["to-left"]);
        assert_eq!(*right_seen.lock().unwrap(), vec!["to-right"]);
    }

    #[tokio::test]
    async fn test_close_reaches_both_sides() {
        let (left, right) = MemoryChannel::pair();
        let closes = Arc::new(Mutex::new(Vec::new()));
        for channel in [&left, &right] {
            let sink = closes.clone();
            channel.incoming().subscribe(
                |_| {},
                |_| {},
                move |reason| sink.lock().unwrap().push(reason),
            );
        }
        left.close("all done");
        settle().await;
        let closes = closes.lock().unwrap();
        assert_eq!(closes.len(), 2);
        for reason in closes.iter() {
            assert_eq!(
                reason,
                &RpcError::ConnectionClosed {
                    reason: "all done".to_string(),
                }
            );
        }
    }

    #[tokio::test]
    async fn test_dropping_an_endpoint_closes_the_peer() {
        let (left, right) = MemoryChannel::pair();
        let closed = Arc::new(Mutex::new(None));
        let sink = closed.clone();
        right.incoming().subscribe(
            |_| {},
            |_| {},
            move |reason| *sink.lock().unwrap() = Some(reason),
        );
        drop(left);
        settle().await;
        assert_eq!(
            *closed.lock().unwrap(),
            Some(RpcError::ConnectionClosed {
                reason: "memory channel dropped".to_string(),
            })
        );
    }
}

// Made with Bob
