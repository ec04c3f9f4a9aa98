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

//! Wire model for remstream.
//!
//! This module defines what actually crosses a connection:
//!
//! - [`Value`]: the structured payload model, including the two embedded
//!   asynchronous variants that a connection rewrites into wire references
//! - [`Message`]: the discriminated wire records, one JSON text record per
//!   message
//! - [`ProtocolError`] and [`RpcError`]: the dispatch-boundary taxonomy and
//!   the fault currency delivered through wire futures and streams

mod error;
mod message;
mod value;

pub use error::{ProtocolError, RpcError};
pub use message::{ErrorBody, Message};
pub(crate) use message::{FUTURE_ID_KEY, STREAM_ID_KEY};
pub use value::{OpaqueValueError, Value};
