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

#![doc = include_str!("../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # Architecture
//!
//! remstream is organized into four layers, leaves first:
//!
//! - **[`reactive`]**: push streams, one-shot futures, their exclusive
//!   resolvers, and derived signals. Everything else in the crate operates
//!   on these types.
//! - **[`protocol`]**: the structured [`Value`] model, the wire [`Message`]
//!   records, and the error taxonomy.
//! - **[`channel`]**: the transport abstraction a connection sends and
//!   receives text records through.
//! - **[`connection`]**: the multiplexing session bound to one channel.
//!
//! # Concurrency Model
//!
//! Each [`Connection`] runs a single logical dispatch loop: incoming records
//! are processed one at a time, in transport order. Method handlers return
//! [`Future`]s and may settle whenever they like; the dispatcher never waits
//! for them, so replies go out in completion order, not request order. The
//! two ends of one transport are fully independent and share no state beyond
//! the wire.
//!
//! # Safety
//!
//! remstream is written in 100% safe Rust with `#![deny(unsafe_code)]`.
//! All scheduling is handled through Tokio's async runtime.

pub mod channel;
pub mod connection;
pub mod protocol;
pub mod reactive;

pub use channel::{Channel, MemoryChannel, SocketChannel};
pub use connection::{Connection, Handler};
pub use protocol::{Message, ProtocolError, RpcError, Value};
pub use reactive::{
    Completer, Future, Signal, SignalController, Stream, StreamController, Subscription,
};
