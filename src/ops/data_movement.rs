//! Gather, reshape and other data movement operators.

use crate::attributes::AttributeKind;
use crate::builder::NodeBuilder;
use crate::dtype::{DType, INDEX_TYPE_TAGS};
use crate::error::OpsetError;
use crate::graph::{Graph, NodeRef, OutputDescriptor};
use crate::normalize::NodeInput;
use crate::ops::{normalize_axis, same_as_input};
use crate::registry::{ConstructionContext, OpsetVersion};
use crate::schema::{AttributeSpec, Constraint, DefaultValue, InputRole, OperatorSchema};
use crate::shape::{Dimension, Shape, MAX_RANK};

const CONCAT_INPUTS: &[InputRole] = &[InputRole::variadic("inputs", 1)];
const CONCAT_ATTRIBUTES: &[AttributeSpec] = &[AttributeSpec::new("axis", AttributeKind::Int)];
const RESHAPE_INPUTS: &[InputRole] = &[InputRole::required("data"), InputRole::required("shape")];
const RESHAPE_ATTRIBUTES: &[AttributeSpec] = &[AttributeSpec::new("special_zero", AttributeKind::Bool)];
const TRANSPOSE_INPUTS: &[InputRole] = &[InputRole::required("data"), InputRole::required("input_order")];
const GATHER_INPUTS: &[InputRole] = &[
    InputRole::required("data"),
    InputRole::required("indices"),
    InputRole::required("axis"),
];
const DATA_INDICES_INPUTS: &[InputRole] = &[InputRole::required("data"), InputRole::required("indices")];
const GATHER_ND_ATTRIBUTES: &[AttributeSpec] = &[AttributeSpec::new("batch_dims", AttributeKind::Int)
    .with_default(DefaultValue::Int(0))
    .constraint(Constraint::NonNegative)];
const GATHER_ELEMENTS_ATTRIBUTES: &[AttributeSpec] =
    &[AttributeSpec::new("axis", AttributeKind::Int).with_default(DefaultValue::Int(0))];
const DATA_INPUT: &[InputRole] = &[InputRole::required("data")];
const SHAPE_OF_ATTRIBUTES: &[AttributeSpec] = &[AttributeSpec::new("output_type", AttributeKind::String)
    .with_default(DefaultValue::Str("i64"))
    .allowed(INDEX_TYPE_TAGS)];
const SOFTMAX_ATTRIBUTES: &[AttributeSpec] = &[AttributeSpec::new("axis", AttributeKind::Int)
    .with_default(DefaultValue::Int(1))
    .constraint(Constraint::NonNegative)];
const LOG_SOFTMAX_ATTRIBUTES: &[AttributeSpec] =
    &[AttributeSpec::new("axis", AttributeKind::Int).with_default(DefaultValue::Int(1))];

pub(crate) const SCHEMAS: &[OperatorSchema] = &[
    OperatorSchema::new("Concat", OpsetVersion::Opset1, construct_concat)
        .inputs(CONCAT_INPUTS)
        .attributes(CONCAT_ATTRIBUTES),
    OperatorSchema::new("Reshape", OpsetVersion::Opset1, construct_reshape)
        .inputs(RESHAPE_INPUTS)
        .attributes(RESHAPE_ATTRIBUTES),
    OperatorSchema::new("Transpose", OpsetVersion::Opset1, construct_transpose).inputs(TRANSPOSE_INPUTS),
    OperatorSchema::new("Gather", OpsetVersion::Opset1, construct_gathered).inputs(GATHER_INPUTS),
    OperatorSchema::new("GatherND", OpsetVersion::Opset5, construct_gathered)
        .inputs(DATA_INDICES_INPUTS)
        .attributes(GATHER_ND_ATTRIBUTES),
    OperatorSchema::new("GatherElements", OpsetVersion::Opset6, construct_gather_elements)
        .inputs(DATA_INDICES_INPUTS)
        .attributes(GATHER_ELEMENTS_ATTRIBUTES),
    OperatorSchema::new("ShapeOf", OpsetVersion::Opset1, construct_shape_of)
        .inputs(DATA_INPUT)
        .until(OpsetVersion::Opset3),
    OperatorSchema::new("ShapeOf", OpsetVersion::Opset3, construct_shape_of)
        .inputs(DATA_INPUT)
        .attributes(SHAPE_OF_ATTRIBUTES),
    OperatorSchema::new("Softmax", OpsetVersion::Opset1, same_as_input)
        .inputs(DATA_INPUT)
        .attributes(SOFTMAX_ATTRIBUTES),
    OperatorSchema::new("LogSoftmax", OpsetVersion::Opset5, same_as_input)
        .inputs(DATA_INPUT)
        .attributes(LOG_SOFTMAX_ATTRIBUTES),
];

fn construct_concat(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    let dtype = ctx.inputs.iter().find_map(|x| x.dtype);
    let ranked = ctx.inputs.iter().map(|x| x.shape.dims()).collect::<Option<Vec<_>>>();
    let shape = match (ranked, ctx.int("axis")) {
        (Some(ranked), Some(axis)) if !ranked.is_empty() => {
            let rank = ranked[0].len();
            match normalize_axis(axis, rank) {
                Some(axis) if ranked.iter().all(|x| x.len() == rank) => {
                    let mut dims = ranked[0].to_vec();
                    dims[axis] = ranked
                        .iter()
                        .try_fold(0u64, |acc, x| acc.checked_add(x[axis].value()?))
                        .map(Dimension::Known)
                        .unwrap_or(Dimension::Dynamic);
                    Shape::new(dims)
                }
                _ => Shape::DynamicRank,
            }
        }
        _ => Shape::DynamicRank,
    };
    Ok(vec![OutputDescriptor { dtype, shape }])
}

fn construct_reshape(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    // the target dims are values, only the rank is known from the shape input
    let shape = match ctx.input(1).and_then(|x| x.shape.resolve()).as_deref() {
        Some(&[rank]) if rank <= MAX_RANK as u64 => Shape::dynamic_of_rank(rank as usize),
        _ => Shape::DynamicRank,
    };
    Ok(vec![OutputDescriptor {
        dtype: ctx.input_dtype(0),
        shape,
    }])
}

fn construct_transpose(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    let shape = match ctx.input(0).and_then(|x| x.shape.rank()) {
        Some(rank) => Shape::dynamic_of_rank(rank),
        None => Shape::DynamicRank,
    };
    Ok(vec![OutputDescriptor {
        dtype: ctx.input_dtype(0),
        shape,
    }])
}

fn construct_gathered(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    Ok(vec![OutputDescriptor {
        dtype: ctx.input_dtype(0),
        shape: Shape::DynamicRank,
    }])
}

fn construct_gather_elements(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    Ok(vec![OutputDescriptor {
        dtype: ctx.input_dtype(0),
        shape: ctx.input(1).map(|x| x.shape.clone()).unwrap_or(Shape::DynamicRank),
    }])
}

fn construct_shape_of(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    let dim = match ctx.input(0).and_then(|x| x.shape.rank()) {
        Some(rank) => Dimension::from(rank),
        None => Dimension::Dynamic,
    };
    Ok(vec![OutputDescriptor {
        dtype: Some(ctx.dtype("output_type")?.unwrap_or(DType::I64)),
        shape: Shape::new([dim]),
    }])
}

pub fn concat<I: Into<NodeInput>>(
    version: OpsetVersion,
    graph: &mut Graph,
    inputs: impl IntoIterator<Item = I>,
    axis: i64,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("Concat", version)
        .inputs(inputs)
        .attr("axis", axis)
        .maybe_name(name)
        .build(graph)
}

pub fn reshape(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    shape: impl Into<NodeInput>,
    special_zero: bool,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    let shape: NodeInput = shape.into();
    let shape = shape.resolve_value("Reshape", 1)?;
    let shape = match shape {
        NodeInput::Literal { value, dtype: None } => NodeInput::literal_as(value, DType::I64),
        other => other,
    };
    NodeBuilder::new("Reshape", version)
        .input(data)
        .input(shape)
        .attr("special_zero", special_zero)
        .maybe_name(name)
        .build(graph)
}

pub fn transpose(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    input_order: impl Into<NodeInput>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("Transpose", version)
        .input(data)
        .input(input_order)
        .maybe_name(name)
        .build(graph)
}

pub fn gather(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    indices: impl Into<NodeInput>,
    axis: impl Into<NodeInput>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("Gather", version)
        .input(data)
        .input(indices)
        .input(axis)
        .maybe_name(name)
        .build(graph)
}

pub fn gather_nd(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    indices: impl Into<NodeInput>,
    batch_dims: Option<i64>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("GatherND", version)
        .input(data)
        .input(indices)
        .maybe_attr("batch_dims", batch_dims)
        .maybe_name(name)
        .build(graph)
}

pub fn gather_elements(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    indices: impl Into<NodeInput>,
    axis: Option<i64>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("GatherElements", version)
        .input(data)
        .input(indices)
        .maybe_attr("axis", axis)
        .maybe_name(name)
        .build(graph)
}

pub fn shape_of(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("ShapeOf", version).input(data).maybe_name(name).build(graph)
}

/// ShapeOf with a selectable output element type.
pub fn shape_of_typed(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    output_type: Option<DType>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("ShapeOf", version)
        .input(data)
        .maybe_attr("output_type", output_type.map(|x| x.tag()))
        .maybe_name(name)
        .build(graph)
}

pub fn softmax(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    axis: Option<i64>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("Softmax", version)
        .input(data)
        .maybe_attr("axis", axis)
        .maybe_name(name)
        .build(graph)
}

pub fn log_softmax(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    axis: Option<i64>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("LogSoftmax", version)
        .input(data)
        .maybe_attr("axis", axis)
        .maybe_name(name)
        .build(graph)
}
