// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed bind values.
//!
//! Callers decide the kind of each value once, at the call boundary, by
//! constructing a [`BindingValue`]. On the wire every value travels as text
//! tagged with its SQL API type:
//!
//! | Variant | Wire type |
//! |---------|-----------|
//! | `Integer` | `FIXED` |
//! | `Real` | `REAL` |
//! | `Text` | `TEXT` |

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Named bind parameters for one statement.
pub type Bindings = BTreeMap<String, BindingValue>;

/// A bind value of a closed set of kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

/// SQL API type tag of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BindingType {
    Fixed,
    Real,
    Text,
}

/// Wire form of a binding: `{"type": "FIXED", "value": "10"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireBinding {
    #[serde(rename = "type")]
    pub binding_type: BindingType,
    pub value: String,
}

impl BindingValue {
    pub fn binding_type(&self) -> BindingType {
        match self {
            BindingValue::Integer(_) => BindingType::Fixed,
            BindingValue::Real(_) => BindingType::Real,
            BindingValue::Text(_) => BindingType::Text,
        }
    }

    /// Render the value as text for transport.
    pub fn to_wire(&self) -> WireBinding {
        WireBinding {
            binding_type: self.binding_type(),
            value: self.to_string(),
        }
    }
}

impl fmt::Display for BindingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingValue::Integer(v) => write!(f, "{}", v),
            // Debug keeps the fractional part of whole values ("1.0", not "1").
            BindingValue::Real(v) => write!(f, "{:?}", v),
            BindingValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for BindingValue {
    fn from(v: i64) -> Self {
        BindingValue::Integer(v)
    }
}

impl From<i32> for BindingValue {
    fn from(v: i32) -> Self {
        BindingValue::Integer(v.into())
    }
}

impl From<u32> for BindingValue {
    fn from(v: u32) -> Self {
        BindingValue::Integer(v.into())
    }
}

impl From<f64> for BindingValue {
    fn from(v: f64) -> Self {
        BindingValue::Real(v)
    }
}

impl From<f32> for BindingValue {
    fn from(v: f32) -> Self {
        BindingValue::Real(v.into())
    }
}

impl From<String> for BindingValue {
    fn from(v: String) -> Self {
        BindingValue::Text(v)
    }
}

impl From<&str> for BindingValue {
    fn from(v: &str) -> Self {
        BindingValue::Text(v.to_string())
    }
}

/// Format all bindings for the statement request body.
pub fn format_bindings(bindings: &Bindings) -> BTreeMap<String, WireBinding> {
    bindings
        .iter()
        .map(|(name, value)| (name.clone(), value.to_wire()))
        .collect()
}
