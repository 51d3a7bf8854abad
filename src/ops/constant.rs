//! Graph sources: parameters and constants.
//!
//! These carry no inputs and no attributes, so they bypass the builder and go
//! straight into the arena once the opset has confirmed it knows them.

use crate::dtype::DType;
use crate::error::OpsetError;
use crate::graph::{Graph, NodeRef, OutputDescriptor};
use crate::literal::LiteralTensor;
use crate::registry::{self, ConstructionContext, NodeFactory, OpsetVersion};
use crate::schema::OperatorSchema;
use crate::shape::Shape;

pub(crate) const SCHEMAS: &[OperatorSchema] = &[
    OperatorSchema::new("Parameter", OpsetVersion::Opset1, construct_source),
    OperatorSchema::new("Constant", OpsetVersion::Opset1, construct_source),
];

fn construct_source(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    Err(OpsetError::InvalidInputKind {
        op: ctx.op_type.to_string(),
        index: 0,
        reason: "source nodes are created by their own factory, not from inputs".to_string(),
    })
}

pub fn parameter(
    version: OpsetVersion,
    graph: &mut Graph,
    shape: impl Into<Shape>,
    dtype: DType,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    registry::global()?.opset(version).lookup("Parameter")?;
    graph.parameter(dtype, shape.into(), Some(version), name)
}

/// Embeds `value`, cast to `dtype` when one is given.
pub fn constant(
    version: OpsetVersion,
    graph: &mut Graph,
    value: impl Into<LiteralTensor>,
    dtype: Option<DType>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    registry::global()?.opset(version).lookup("Constant")?;
    graph.constant(value.into(), dtype, Some(version), name)
}
