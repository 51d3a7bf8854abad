use crate::attributes::AttributeKind;
use crate::dtype::DTypeError;
use crate::literal::LiteralError;
use crate::registry::OpsetVersion;

/// Failure of a single node-construction call. Every variant aborts the call
/// before anything is linked into the graph.
#[derive(Debug, thiserror::Error)]
pub enum OpsetError {
    #[error("Invalid value for input {index} of {op}: {reason}")]
    InvalidInputKind {
        op: String,
        index: usize,
        reason: String,
    },
    #[error("Operator {op} is not registered in {version}")]
    UnknownOperator { op: String, version: OpsetVersion },
    #[error("Missing required attribute \"{attribute}\" for op {op}")]
    MissingRequiredAttribute { op: String, attribute: String },
    #[error("Attribute \"{attribute}\" is not declared for op {op}")]
    UnknownAttribute { op: String, attribute: String },
    #[error("Attribute \"{attribute}\" of op {op} expects {expected}, got {actual}")]
    AttributeTypeMismatch {
        op: String,
        attribute: String,
        expected: AttributeKind,
        actual: AttributeKind,
    },
    #[error("Attribute \"{attribute}\" of op {op} has value \"{value}\", allowed: {allowed:?}")]
    InvalidEnumerationValue {
        op: String,
        attribute: String,
        value: String,
        allowed: &'static [&'static str],
    },
    #[error("Attribute \"{attribute}\" of op {op} violates constraint: {constraint}")]
    AttributeConstraintViolation {
        op: String,
        attribute: String,
        constraint: &'static str,
    },
    #[error("Malformed descriptor for op {op}: {reason}")]
    MalformedCompositeDescriptor { op: String, reason: String },
    #[error("Missing required input \"{input}\" for op {op}")]
    MissingRequiredInput { op: String, input: &'static str },
    #[error("Op {op} accepts at most {max} inputs, got {actual}")]
    TooManyInputs { op: String, max: usize, actual: usize },
    #[error("Input {index} of op {op} is supplied after an omitted optional input")]
    InputAfterAbsent { op: String, index: usize },
    #[error("Invalid node name \"{0}\"")]
    InvalidName(String),
    #[error("Operator {op} registered twice in {version}")]
    DuplicateOperator { op: String, version: OpsetVersion },
    #[error("The process-wide opset registry is already installed")]
    RegistryAlreadyInstalled,
    #[error(transparent)]
    DTypeError(#[from] DTypeError),
    #[error(transparent)]
    LiteralError(#[from] LiteralError),
}
