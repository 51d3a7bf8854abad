//! Composite operators that carry a sub-graph body.

use crate::builder::NodeBuilder;
use crate::composite::{CompositeKind, CompositeSpec};
use crate::error::OpsetError;
use crate::graph::{Graph, NodeRef, OutputDescriptor};
use crate::normalize::NodeInput;
use crate::registry::{ConstructionContext, OpsetVersion};
use crate::schema::{InputRole, OperatorSchema};

const TENSOR_ITERATOR_INPUTS: &[InputRole] = &[InputRole::variadic("inputs", 0)];
const LOOP_INPUTS: &[InputRole] = &[
    InputRole::required("trip_count"),
    InputRole::required("execution_condition"),
    InputRole::variadic("inputs", 0),
];

pub(crate) const SCHEMAS: &[OperatorSchema] = &[
    OperatorSchema::new("TensorIterator", OpsetVersion::Opset1, construct_composite)
        .inputs(TENSOR_ITERATOR_INPUTS)
        .composite(CompositeKind::TensorIterator),
    OperatorSchema::new("Loop", OpsetVersion::Opset5, construct_composite)
        .inputs(LOOP_INPUTS)
        .composite(CompositeKind::Loop),
];

fn construct_composite(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    match ctx.composite {
        Some(composite) => Ok(composite.output_descriptors()),
        None => Err(OpsetError::MalformedCompositeDescriptor {
            op: ctx.op_type.to_string(),
            reason: "a sub-graph body is required".to_string(),
        }),
    }
}

pub fn tensor_iterator<I: Into<NodeInput>>(
    version: OpsetVersion,
    graph: &mut Graph,
    inputs: impl IntoIterator<Item = I>,
    body: CompositeSpec,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("TensorIterator", version)
        .inputs(inputs)
        .composite(body)
        .maybe_name(name)
        .build(graph)
}

/// A loop running at most `trip_count` iterations while the body condition
/// holds. Input descriptions index the node inputs, where 0 and 1 are
/// `trip_count` and `execution_condition`.
pub fn r#loop<I: Into<NodeInput>>(
    version: OpsetVersion,
    graph: &mut Graph,
    trip_count: impl Into<NodeInput>,
    execution_condition: impl Into<NodeInput>,
    inputs: impl IntoIterator<Item = I>,
    body: CompositeSpec,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("Loop", version)
        .input(trip_count)
        .input(execution_condition)
        .inputs(inputs)
        .composite(body)
        .maybe_name(name)
        .build(graph)
}
