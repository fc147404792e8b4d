//! Scalar attribute values stored on entities and edges.
//!
//! The store holds flat attribute maps: property name to scalar. The
//! Postgres backend persists these as JSONB; the in-memory backend holds
//! them directly. [`AttrValue`] is the common scalar model with lossless
//! round-trips through [`serde_json::Value`] for everything the
//! simulation writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A flat attribute map: property name to scalar value.
///
/// `BTreeMap` keeps iteration deterministic across processes.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer (ids, counters, ticks).
    Int(i64),
    /// Floating-point scalar (costs, strengths, resources).
    Float(f64),
    /// Text value (names, labels, serialized queues).
    Text(String),
}

impl AttrValue {
    /// Return the integer value, widening is not attempted.
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Return the value as a float. Integers widen losslessly enough for
    /// cost arithmetic; other variants return `None`.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Return the text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Return the boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert a JSON value into an attribute scalar, if it is one.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Convert this scalar into a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Text(s) => serde_json::Value::from(s.clone()),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Convert a whole attribute map to a JSON object.
pub fn attrs_to_json(attrs: &AttrMap) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = attrs
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    serde_json::Value::Object(map)
}

/// Convert a JSON object into an attribute map, skipping non-scalar
/// members.
pub fn attrs_from_json(value: &serde_json::Value) -> AttrMap {
    let mut attrs = AttrMap::new();
    if let serde_json::Value::Object(map) = value {
        for (k, v) in map {
            if let Some(scalar) = AttrValue::from_json(v) {
                attrs.insert(k.clone(), scalar);
            }
        }
    }
    attrs
}
