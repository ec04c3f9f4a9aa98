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

//! Protocol error types.
//!
//! Two distinct families live here:
//!
//! - [`ProtocolError`]: violations detected at the dispatch boundary — an
//!   incoming record referenced an id this side never issued, or did not
//!   match any known message shape. These indicate a peer or encoding bug;
//!   they are logged, surfaced on the connection's fault stream, and never
//!   retried or swallowed.
//! - [`RpcError`]: the fault currency delivered *through* wire futures and
//!   streams — remote application error payloads, method-not-found
//!   failures reported back by the peer, and the one-shot connection-closed
//!   notification synthesized at teardown.
//!
//! Ordinary application failures are expected to travel as encoded values
//! through the normal payload path; neither taxonomy is for them.

use super::Value;
use thiserror::Error;

/// A protocol-shape violation raised at the dispatch boundary.
///
/// Each variant names the id or record that could not be matched against
/// local state. These are bugs on one side of the wire, not recoverable I/O
/// conditions; the connection reports them on its fault stream and carries
/// on dispatching.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// A Return or Error record referenced a call id with no pending call.
    ///
    /// The remote referenced a call this side never issued or has already
    /// resolved.
    #[error("return for unknown call id {call_id}")]
    NonexistentCall {
        /// The unmatched call id.
        call_id: u64,
    },

    /// A StreamEvent or StreamClose record referenced an unknown stream id.
    #[error("stream message for unknown stream id {stream_id}")]
    NonexistentStream {
        /// The unmatched stream id.
        stream_id: u64,
    },

    /// A FutureCompleted or FutureError record referenced an unknown
    /// future id.
    #[error("future message for unknown future id {future_id}")]
    NonexistentFuture {
        /// The unmatched future id.
        future_id: u64,
    },

    /// An incoming record did not match any known message shape.
    #[error("malformed message: {raw}")]
    MalformedMessage {
        /// The offending record text.
        raw: String,
    },
}

/// The fault delivered through a wire future or stream.
///
/// A call future resolves with one of these when something other than a
/// successful Return settles it; a hydrated proxy stream closes with one as
/// its reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// An error payload or close reason sent by the peer.
    ///
    /// This is the ordinary path for application-level failures: the value
    /// travels through the normal encode/decode walk like any other payload.
    #[error("remote error value: {0:?}")]
    Application(Value),

    /// The peer had no handler registered under the called method name.
    ///
    /// Reported back over the wire as an Error record and surfaced locally
    /// once that record is received. The connection stays open.
    #[error("no handler registered for method `{method}` (call {call_id})")]
    NonexistentMethod {
        /// The method name the call carried.
        method: String,
        /// The id of the failed call.
        call_id: u64,
    },

    /// The transport closed with outstanding work.
    ///
    /// Synthesized exactly once per teardown and delivered to every pending
    /// call and future as an error and to every open stream as its close
    /// reason.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// The transport's close reason.
        reason: String,
    },
}

impl RpcError {
    /// Returns `true` if this fault is the teardown notification.
    #[must_use]
    pub const fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed { .. })
    }
}

impl From<Value> for RpcError {
    fn from(value: Value) -> Self {
        Self::Application(value)
    }
}

impl From<&str> for RpcError {
    fn from(text: &str) -> Self {
        Self::Application(Value::from(text))
    }
}
