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

//! Reactive primitives for remstream.
//!
//! This module provides the asynchronous values that travel across a
//! connection: push-based [`Stream`]s, single-assignment [`Future`]s, and
//! derived [`Signal`] value cells. Each readable type is paired with an
//! exclusive write capability created alongside it:
//!
//! - [`Stream`] is written through its [`StreamController`]
//! - [`Future`] is resolved through its [`Completer`]
//! - [`Signal`] is updated through its [`SignalController`]
//!
//! # Fault Model
//!
//! All types are generic over an event type `T` and a fault/reason type `E`.
//! Errors and close reasons are delivered through the same `E`; the
//! connection layer instantiates everything at `<Value, RpcError>`.
//!
//! Misusing a resolver is a contract violation, not a recoverable condition:
//! pushing to a closed stream, closing it twice, or resolving a future twice
//! panics. See the `# Panics` sections on the individual operations.

mod future;
mod signal;
mod stream;

pub use future::{Completer, Future};
pub use signal::{Signal, SignalController};
pub use stream::{Stream, StreamController, Subscription};
