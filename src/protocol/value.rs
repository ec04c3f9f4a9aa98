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

//! The structured payload model.
//!
//! [`Value`] is the tagged union of everything that may appear inside a
//! call's arguments, a return value, or a stream event: JSON-like plain
//! data plus two asynchronous variants, [`Value::Future`] and
//! [`Value::Stream`]. The recursive encode/decode walk over this type is
//! total — there is no reflective "is this object secretly a future" check
//! anywhere.
//!
//! Plain values convert losslessly to and from [`serde_json::Value`]. The
//! asynchronous variants deliberately do not: only a connection can encode
//! them, because doing so allocates a wire id and installs a forwarding
//! subscription.

use super::RpcError;
use crate::reactive::{Future, Stream};
use std::collections::BTreeMap;
use thiserror::Error;

/// A structured value as carried by the protocol.
///
/// # Examples
///
/// ```rust
/// use remstream::Value;
/// use std::collections::BTreeMap;
///
/// let value = Value::Map(BTreeMap::from([
///     ("name".to_string(), Value::from("remstream")),
///     ("version".to_string(), Value::from(1.0)),
/// ]));
///
/// let json = value.to_json().unwrap();
/// assert_eq!(Value::from_json(&json), value);
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// The absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. The wire format is JSON, so all numbers are `f64`.
    Number(f64),
    /// A text string.
    Text(String),
    /// An ordered sequence of values.
    List(Vec<Value>),
    /// A keyed map of values, ordered by key.
    Map(BTreeMap<String, Value>),
    /// A live future. Crossing the wire turns this into a
    /// `{"__future_id__": n}` reference and a forwarding subscription.
    Future(Future<Value, RpcError>),
    /// A live stream. Crossing the wire turns this into a
    /// `{"__stream_id__": n}` reference and a forwarding subscription.
    Stream(Stream<Value, RpcError>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            // Asynchronous variants compare by handle identity.
            (Self::Future(a), Self::Future(b)) => a.ptr_eq(b),
            (Self::Stream(a), Self::Stream(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// A plain-value conversion hit an embedded future or stream.
///
/// Only a connection may encode asynchronous values, because encoding one
/// allocates an id in the connection's outgoing id space.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("embedded futures and streams can only be encoded by a connection")]
pub struct OpaqueValueError;

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean if this is a [`Value::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the number if this is a [`Value::Number`].
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text if this is a [`Value::Text`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the elements if this is a [`Value::List`].
    #[must_use]
    pub const fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this is a [`Value::Map`].
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns the future if this is a [`Value::Future`].
    #[must_use]
    pub const fn as_future(&self) -> Option<&Future<Value, RpcError>> {
        match self {
            Self::Future(future) => Some(future),
            _ => None,
        }
    }

    /// Returns the stream if this is a [`Value::Stream`].
    #[must_use]
    pub const fn as_stream(&self) -> Option<&Stream<Value, RpcError>> {
        match self {
            Self::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// Converts a plain value to JSON.
    ///
    /// Non-finite numbers become JSON null (JSON has no representation for
    /// them).
    ///
    /// # Errors
    ///
    /// Returns [`OpaqueValueError`] if the value contains a [`Value::Future`]
    /// or [`Value::Stream`] at any depth.
    pub fn to_json(&self) -> Result<serde_json::Value, OpaqueValueError> {
        match self {
            Self::Null => Ok(serde_json::Value::Null),
            Self::Bool(value) => Ok(serde_json::Value::Bool(*value)),
            Self::Number(value) => Ok(serde_json::Number::from_f64(*value)
                .map_or(serde_json::Value::Null, serde_json::Value::Number)),
            Self::Text(value) => Ok(serde_json::Value::String(value.clone())),
            Self::List(items) => Ok(serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<_, _>>()?,
            )),
            Self::Map(entries) => Ok(serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), value.to_json()?)))
                    .collect::<Result<_, OpaqueValueError>>()?,
            )),
            Self::Future(_) | Self::Stream(_) => Err(OpaqueValueError),
        }
    }

    /// Converts JSON to a plain value, field by field.
    ///
    /// This conversion is structural and total; it does not recognize wire
    /// reference tokens (an object containing `__future_id__` stays an
    /// ordinary map). Hydration is the connection's job.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Bool(*value),
            serde_json::Value::Number(value) => Self::Number(value.as_f64().unwrap_or_default()),
            serde_json::Value::String(value) => Self::Text(value.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        // JSON numbers are doubles; very large ids lose precision here,
        // which matches what the wire itself can carry.
        #[allow(clippy::cast_precision_loss)]
        Self::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

impl From<Future<Value, RpcError>> for Value {
    fn from(future: Future<Value, RpcError>) -> Self {
        Self::Future(future)
    }
}

impl From<Stream<Value, RpcError>> for Value {
    fn from(stream: Stream<Value, RpcError>) -> Self {
        Self::Stream(stream)
    }
}

impl From<RpcError> for Value {
    /// Renders a fault as a payload value for the wire: application faults
    /// carry their value through unchanged, everything else degrades to its
    /// display text.
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::Application(value) => value,
            other => Self::Text(other.to_string()),
        }
    }
}


// Made with Bob
