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

//! The discriminated wire records.
//!
//! Each message is one self-describing JSON text record, discriminated by
//! which fields are present — there is no explicit type tag on the wire.
//! [`Message`] makes the discrimination explicit as a tagged enum decoded
//! through one exhaustive match, while `#[serde(untagged)]` keeps the wire
//! format tag-free.
//!
//! # Dispatch Precedence
//!
//! Return and Call records can both carry a `call_id`, so field presence
//! alone is ambiguous. Classification picks the first matching shape in
//! this order, which is exactly the variant order of the enum:
//!
//! 1. Return (`call_id` + `value`)
//! 2. StreamEvent / StreamClose (`stream_id`)
//! 3. FutureCompleted / FutureError (`future_id`)
//! 4. Call (`method`)
//! 5. Error (`error`)
//!
//! Anything else is malformed.

use super::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// The payload key marking an embedded future reference.
pub(crate) const FUTURE_ID_KEY: &str = "__future_id__";

/// The payload key marking an embedded stream reference.
pub(crate) const STREAM_ID_KEY: &str = "__stream_id__";

/// One wire record.
///
/// Payload fields (`args`, `value`, `event`, `reason`, `error`) hold
/// already-encoded wire JSON; embedded references inside them are
/// single-key objects `{"__future_id__": n}` / `{"__stream_id__": n}`
/// naming an id in the *sender's* outgoing id space.
///
/// # Examples
///
/// ```rust
/// use remstream::Message;
/// use serde_json::json;
///
/// let record = r#"{"call_id":1,"method":"add","args":[2,3]}"#;
/// let message = Message::from_text(record).unwrap();
/// assert_eq!(
///     message,
///     Message::Call {
///         call_id: 1,
///         method: "add".to_string(),
///         args: vec![json!(2), json!(3)],
///     }
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// A successful call result.
    Return {
        /// The id of the call being answered.
        call_id: u64,
        /// The encoded result payload.
        value: Json,
    },

    /// The next value on a remotely-sourced stream.
    StreamEvent {
        /// The id of the stream, in its sender's id space.
        stream_id: u64,
        /// The encoded event payload.
        event: Json,
    },

    /// The terminal close of a stream.
    StreamClose {
        /// The id of the stream, in its sender's id space.
        stream_id: u64,
        /// The encoded close reason.
        reason: Json,
    },

    /// A transmitted future resolved with a value.
    FutureCompleted {
        /// The id of the future, in its sender's id space.
        future_id: u64,
        /// The encoded resolution payload.
        value: Json,
    },

    /// A transmitted future resolved with an error.
    FutureError {
        /// The id of the future, in its sender's id space.
        future_id: u64,
        /// The encoded error payload.
        error: Json,
    },

    /// A method invocation with positional arguments.
    Call {
        /// The caller-allocated call id.
        call_id: u64,
        /// The method name, case-sensitive and unique per connection.
        method: String,
        /// The encoded positional arguments.
        args: Vec<Json>,
    },

    /// The called method was not registered on the peer.
    Error {
        /// The identity of the failed call.
        error: ErrorBody,
    },
}

/// The nested body of an [`Message::Error`] record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The method name the failed call carried.
    pub method: String,
    /// The id of the failed call.
    pub call_id: u64,
}

impl Message {
    /// Serializes this message as one wire record.
    ///
    /// # Errors
    ///
    /// Returns the underlying serializer error; for well-formed payloads
    /// this does not occur.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses one wire record, classifying it by the dispatch precedence
    /// described at the module level.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedMessage`] carrying the raw record
    /// if it is not valid JSON or matches no known shape.
    pub fn from_text(record: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(record).map_err(|_| ProtocolError::MalformedMessage {
            raw: record.to_string(),
        })
    }
}


// Made with Bob
