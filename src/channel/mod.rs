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

//! Ordered text-record transports.
//!
//! A [`Channel`] carries whole text records, in order, between exactly two
//! peers. It knows nothing about the records' contents; framing each record
//! as a single delivery unit is the channel's whole job. The connection
//! layer sits on top and never touches bytes.
//!
//! Two implementations are provided: [`MemoryChannel`] pairs two in-process
//! endpoints for tests and local wiring, and [`SocketChannel`] adapts a TCP
//! stream.

mod memory;
mod socket;

pub use self::memory::MemoryChannel;
pub use self::socket::SocketChannel;

use crate::protocol::RpcError;
use crate::reactive::Stream;

/// An ordered, bidirectional, record-oriented transport.
///
/// Implementations must deliver records losslessly and in order, and must
/// terminate [`incoming`](Channel::incoming) with a close carrying the
/// reason the transport ended.
pub trait Channel: Send + Sync {
    /// The stream of records received from the peer.
    ///
    /// The stream closes exactly once, when the transport ends; its close
    /// reason is an [`RpcError::ConnectionClosed`] naming the cause.
    fn incoming(&self) -> Stream<String, RpcError>;

    /// Queues one record for delivery to the peer.
    ///
    /// Sending on a closed channel is a no-op; the connection layer treats
    /// the close notification on [`incoming`](Channel::incoming) as the
    /// single source of truth for teardown.
    fn send(&self, record: &str);
}
