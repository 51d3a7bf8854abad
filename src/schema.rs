//! Static operator schemas.
//!
//! Schemas are plain data: one [`OperatorSchema`] per operator version, listing
//! its input roles, attribute declarations and the procedure that attaches
//! output descriptors. The catalog under `crate::ops` is built from these.

use crate::attributes::{AttributeKind, AttributeValue};
use crate::composite::CompositeKind;
use crate::registry::{ConstructFn, OpsetVersion};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Consumes every remaining input; at least `min` must be supplied.
    Variadic { min: usize },
}

#[derive(Copy, Clone, Debug)]
pub struct InputRole {
    pub name: &'static str,
    pub presence: Presence,
}

impl InputRole {
    pub const fn required(name: &'static str) -> Self {
        Self { name, presence: Presence::Required }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self { name, presence: Presence::Optional }
    }

    pub const fn variadic(name: &'static str, min: usize) -> Self {
        Self { name, presence: Presence::Variadic { min } }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(&'static str),
    Ints(&'static [i64]),
    Floats(&'static [f64]),
}

impl DefaultValue {
    pub fn to_value(&self) -> AttributeValue {
        match self {
            DefaultValue::Int(x) => AttributeValue::Int(*x),
            DefaultValue::Float(x) => AttributeValue::Float(*x),
            DefaultValue::Bool(x) => AttributeValue::Bool(*x),
            DefaultValue::Str(x) => AttributeValue::String(x.to_string()),
            DefaultValue::Ints(x) => AttributeValue::Ints(x.to_vec()),
            DefaultValue::Floats(x) => AttributeValue::Floats(x.to_vec()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AttributeDefault {
    Required,
    /// May be omitted; nothing is inserted when it is.
    Optional,
    Value(DefaultValue),
}

/// Numeric predicate on an attribute. List values must satisfy it element-wise.
#[derive(Copy, Clone, Debug)]
pub enum Constraint {
    NonNegative,
    Positive,
    Predicate {
        description: &'static str,
        check: fn(&AttributeValue) -> bool,
    },
}

impl Constraint {
    pub fn check(&self, value: &AttributeValue) -> bool {
        match self {
            Constraint::NonNegative => value.numeric_values().iter().all(|x| *x >= 0.0),
            Constraint::Positive => value.numeric_values().iter().all(|x| *x > 0.0),
            Constraint::Predicate { check, .. } => check(value),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Constraint::NonNegative => "must be non-negative",
            Constraint::Positive => "must be strictly positive",
            Constraint::Predicate { description, .. } => description,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub default: AttributeDefault,
    pub allowed: Option<&'static [&'static str]>,
    pub constraint: Option<Constraint>,
}

impl AttributeSpec {
    /// A required attribute; use the chained setters to relax it.
    pub const fn new(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            name,
            kind,
            default: AttributeDefault::Required,
            allowed: None,
            constraint: None,
        }
    }

    pub const fn with_default(self, default: DefaultValue) -> Self {
        Self { default: AttributeDefault::Value(default), ..self }
    }

    pub const fn optional(self) -> Self {
        Self { default: AttributeDefault::Optional, ..self }
    }

    pub const fn allowed(self, allowed: &'static [&'static str]) -> Self {
        Self { allowed: Some(allowed), ..self }
    }

    pub const fn constraint(self, constraint: Constraint) -> Self {
        Self { constraint: Some(constraint), ..self }
    }
}

#[derive(Copy, Clone)]
pub struct OperatorSchema {
    pub op_type: &'static str,
    /// First opset version that carries this schema.
    pub since: OpsetVersion,
    /// First opset version that no longer carries it, if any.
    pub until: Option<OpsetVersion>,
    pub inputs: &'static [InputRole],
    pub attributes: &'static [AttributeSpec],
    pub composite: Option<CompositeKind>,
    pub construct: ConstructFn,
}

impl OperatorSchema {
    pub const fn new(op_type: &'static str, since: OpsetVersion, construct: ConstructFn) -> Self {
        Self {
            op_type,
            since,
            until: None,
            inputs: &[],
            attributes: &[],
            composite: None,
            construct,
        }
    }

    pub const fn inputs(self, inputs: &'static [InputRole]) -> Self {
        Self { inputs, ..self }
    }

    pub const fn attributes(self, attributes: &'static [AttributeSpec]) -> Self {
        Self { attributes, ..self }
    }

    pub const fn until(self, until: OpsetVersion) -> Self {
        Self { until: Some(until), ..self }
    }

    pub const fn composite(self, kind: CompositeKind) -> Self {
        Self { composite: Some(kind), ..self }
    }

    pub fn available_in(&self, version: OpsetVersion) -> bool {
        self.since <= version && self.until.is_none_or(|until| version < until)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|x| x.name == name)
    }

    /// Upper bound on the number of inputs, `None` when the last role is variadic.
    pub fn max_inputs(&self) -> Option<usize> {
        match self.inputs.last() {
            Some(InputRole { presence: Presence::Variadic { .. }, .. }) => None,
            _ => Some(self.inputs.len()),
        }
    }
}

impl std::fmt::Debug for OperatorSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorSchema")
            .field("op_type", &self.op_type)
            .field("since", &self.since)
            .field("until", &self.until)
            .field("inputs", &self.inputs)
            .field("attributes", &self.attributes)
            .field("composite", &self.composite)
            .finish()
    }
}
