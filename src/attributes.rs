//! Attribute values and the attribute validator.
//!
//! Validation is a pure function from an operator's declared attribute specs
//! and a caller-supplied map to a fully-defaulted map.

use crate::config::GraphConfig;
use crate::error::OpsetError;
use crate::schema::{AttributeDefault, AttributeSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Bools(Vec<bool>),
    Strings(Vec<String>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum AttributeKind {
    Int,
    Float,
    Bool,
    String,
    Ints,
    Floats,
    Bools,
    Strings,
}

/// Attribute mapping attached to a node. Ordered by key so that iteration,
/// debug output and equality never depend on insertion order.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Int(_) => AttributeKind::Int,
            AttributeValue::Float(_) => AttributeKind::Float,
            AttributeValue::Bool(_) => AttributeKind::Bool,
            AttributeValue::String(_) => AttributeKind::String,
            AttributeValue::Ints(_) => AttributeKind::Ints,
            AttributeValue::Floats(_) => AttributeKind::Floats,
            AttributeValue::Bools(_) => AttributeKind::Bools,
            AttributeValue::Strings(_) => AttributeKind::Strings,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if let AttributeValue::Int(x) = self { Some(*x) } else { None }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(x) => Some(*x),
            AttributeValue::Int(x) => Some(*x as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let AttributeValue::Bool(x) = self { Some(*x) } else { None }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let AttributeValue::String(x) = self { Some(x.as_str()) } else { None }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        if let AttributeValue::Ints(x) = self { Some(x.as_slice()) } else { None }
    }

    /// Numeric view of the value: one entry for scalars, every entry for lists.
    pub(crate) fn numeric_values(&self) -> Vec<f64> {
        match self {
            AttributeValue::Int(x) => vec![*x as f64],
            AttributeValue::Float(x) => vec![*x],
            AttributeValue::Ints(x) => x.iter().map(|v| *v as f64).collect(),
            AttributeValue::Floats(x) => x.clone(),
            _ => vec![],
        }
    }

    fn string_values(&self) -> Vec<&str> {
        match self {
            AttributeValue::String(x) => vec![x.as_str()],
            AttributeValue::Strings(x) => x.iter().map(|v| v.as_str()).collect(),
            _ => vec![],
        }
    }

    /// Converts the value to `expected` when the conversion is lossless
    /// integer-to-float widening.
    fn widen_to(self, expected: AttributeKind) -> Result<Self, Self> {
        match (self, expected) {
            (AttributeValue::Int(x), AttributeKind::Float) => Ok(AttributeValue::Float(x as f64)),
            (AttributeValue::Ints(x), AttributeKind::Floats) => {
                Ok(AttributeValue::Floats(x.into_iter().map(|v| v as f64).collect()))
            }
            (other, _) => Err(other),
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Int(x) => write!(f, "{}", x),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::Bool(x) => write!(f, "{}", x),
            AttributeValue::String(x) => write!(f, "{}", x),
            AttributeValue::Ints(x) => write!(f, "{:?}", x),
            AttributeValue::Floats(x) => write!(f, "{:?}", x),
            AttributeValue::Bools(x) => write!(f, "{:?}", x),
            AttributeValue::Strings(x) => write!(f, "{:?}", x),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        AttributeValue::Float(value as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(value: Vec<i64>) -> Self {
        AttributeValue::Ints(value)
    }
}

impl From<&[i64]> for AttributeValue {
    fn from(value: &[i64]) -> Self {
        AttributeValue::Ints(value.to_vec())
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        AttributeValue::Floats(value)
    }
}

impl From<Vec<f32>> for AttributeValue {
    fn from(value: Vec<f32>) -> Self {
        AttributeValue::Floats(value.into_iter().map(|x| x as f64).collect())
    }
}

impl From<Vec<bool>> for AttributeValue {
    fn from(value: Vec<bool>) -> Self {
        AttributeValue::Bools(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(value: Vec<String>) -> Self {
        AttributeValue::Strings(value)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(value: Vec<&str>) -> Self {
        AttributeValue::Strings(value.into_iter().map(|x| x.to_string()).collect())
    }
}

fn check_supplied(
    op: &str,
    spec: &AttributeSpec,
    value: &AttributeValue,
    config: &GraphConfig,
) -> Result<AttributeValue, OpsetError> {
    let value = if value.kind() == spec.kind {
        value.clone()
    } else {
        let widened = if config.widen_int_attributes {
            value.clone().widen_to(spec.kind).ok()
        } else {
            None
        };
        widened.ok_or_else(|| OpsetError::AttributeTypeMismatch {
            op: op.to_string(),
            attribute: spec.name.to_string(),
            expected: spec.kind,
            actual: value.kind(),
        })?
    };

    if let Some(allowed) = spec.allowed {
        for s in value.string_values() {
            if !allowed.contains(&s) {
                return Err(OpsetError::InvalidEnumerationValue {
                    op: op.to_string(),
                    attribute: spec.name.to_string(),
                    value: s.to_string(),
                    allowed,
                });
            }
        }
    }

    if let Some(constraint) = &spec.constraint {
        if !constraint.check(&value) {
            return Err(OpsetError::AttributeConstraintViolation {
                op: op.to_string(),
                attribute: spec.name.to_string(),
                constraint: constraint.description(),
            });
        }
    }

    Ok(value)
}

/// Produces the validated, fully-defaulted attribute map for one node.
///
/// Unknown keys are reported before any per-attribute check, in key order, so
/// the error returned for a given input is always the same one.
pub fn validate_attributes(
    op: &str,
    specs: &[AttributeSpec],
    supplied: &AttributeMap,
    config: &GraphConfig,
) -> Result<AttributeMap, OpsetError> {
    for name in supplied.keys() {
        if !specs.iter().any(|spec| spec.name == name) {
            return Err(OpsetError::UnknownAttribute {
                op: op.to_string(),
                attribute: name.clone(),
            });
        }
    }

    let mut out = AttributeMap::new();
    for spec in specs {
        match supplied.get(spec.name) {
            Some(value) => {
                out.insert(spec.name.to_string(), check_supplied(op, spec, value, config)?);
            }
            None => match &spec.default {
                AttributeDefault::Required => {
                    return Err(OpsetError::MissingRequiredAttribute {
                        op: op.to_string(),
                        attribute: spec.name.to_string(),
                    });
                }
                AttributeDefault::Optional => {}
                AttributeDefault::Value(default) => {
                    log::trace!("{}: defaulting attribute {} to {:?}", op, spec.name, default);
                    out.insert(spec.name.to_string(), default.to_value());
                }
            },
        }
    }
    Ok(out)
}
