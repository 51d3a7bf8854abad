//! Element-wise arithmetic and activations.

use crate::attributes::AttributeKind;
use crate::builder::{binary_node, unary_node, NodeBuilder};
use crate::dtype::{DType, ELEMENT_TYPE_TAGS};
use crate::error::OpsetError;
use crate::graph::{Graph, NodeRef, OutputDescriptor};
use crate::normalize::NodeInput;
use crate::ops::{broadcast_numpy, same_as_input, AUTO_BROADCAST};
use crate::registry::{ConstructionContext, OpsetVersion};
use crate::schema::{AttributeSpec, InputRole, OperatorSchema};
use crate::shape::Shape;

const BINARY_INPUTS: &[InputRole] = &[InputRole::required("a"), InputRole::required("b")];
const BINARY_ATTRIBUTES: &[AttributeSpec] = &[AUTO_BROADCAST];
const UNARY_INPUTS: &[InputRole] = &[InputRole::required("data")];
const SWISH_INPUTS: &[InputRole] = &[InputRole::required("data"), InputRole::optional("beta")];
const ROUND_ATTRIBUTES: &[AttributeSpec] =
    &[AttributeSpec::new("mode", AttributeKind::String).allowed(&["half_to_even", "half_away_from_zero"])];
const CONVERT_ATTRIBUTES: &[AttributeSpec] =
    &[AttributeSpec::new("destination_type", AttributeKind::String).allowed(ELEMENT_TYPE_TAGS)];

const fn binary(op_type: &'static str) -> OperatorSchema {
    OperatorSchema::new(op_type, OpsetVersion::Opset1, construct_binary)
        .inputs(BINARY_INPUTS)
        .attributes(BINARY_ATTRIBUTES)
}

const fn unary(op_type: &'static str, since: OpsetVersion) -> OperatorSchema {
    OperatorSchema::new(op_type, since, same_as_input).inputs(UNARY_INPUTS)
}

pub(crate) const SCHEMAS: &[OperatorSchema] = &[
    binary("Add"),
    binary("Subtract"),
    binary("Multiply"),
    binary("Divide"),
    binary("Maximum"),
    binary("Minimum"),
    binary("Power"),
    unary("Relu", OpsetVersion::Opset1),
    unary("Sigmoid", OpsetVersion::Opset1),
    unary("Tanh", OpsetVersion::Opset1),
    unary("Exp", OpsetVersion::Opset1),
    unary("Sqrt", OpsetVersion::Opset1),
    unary("Negative", OpsetVersion::Opset1),
    unary("Abs", OpsetVersion::Opset1),
    unary("Floor", OpsetVersion::Opset1),
    unary("Gelu", OpsetVersion::Opset2),
    unary("Mish", OpsetVersion::Opset4),
    unary("SoftPlus", OpsetVersion::Opset4),
    unary("HSwish", OpsetVersion::Opset4),
    OperatorSchema::new("Swish", OpsetVersion::Opset4, same_as_input).inputs(SWISH_INPUTS),
    unary("Round", OpsetVersion::Opset5).attributes(ROUND_ATTRIBUTES),
    OperatorSchema::new("Convert", OpsetVersion::Opset1, construct_convert)
        .inputs(UNARY_INPUTS)
        .attributes(CONVERT_ATTRIBUTES),
];

fn construct_binary(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    let (Some(a), Some(b)) = (ctx.input(0), ctx.input(1)) else {
        return Ok(vec![OutputDescriptor::unresolved()]);
    };
    let shape = match ctx.string("auto_broadcast") {
        Some("numpy") => broadcast_numpy(&a.shape, &b.shape),
        // pdpd broadcasts b into a, none requires equal shapes
        _ => a.shape.clone(),
    };
    Ok(vec![OutputDescriptor {
        dtype: a.dtype.or(b.dtype),
        shape,
    }])
}

fn construct_convert(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    Ok(vec![OutputDescriptor {
        dtype: ctx.dtype("destination_type")?,
        shape: ctx.input(0).map(|x| x.shape.clone()).unwrap_or(Shape::DynamicRank),
    }])
}

macro_rules! binary_factories {
    ($($name:ident => $op:literal),* $(,)?) => {
        $(
            pub fn $name(
                version: OpsetVersion,
                graph: &mut Graph,
                a: impl Into<NodeInput>,
                b: impl Into<NodeInput>,
                auto_broadcast: Option<&str>,
                name: Option<&str>,
            ) -> Result<NodeRef, OpsetError> {
                binary_node(version, graph, $op, a, b, auto_broadcast, name)
            }
        )*
    };
}

macro_rules! unary_factories {
    ($($name:ident => $op:literal),* $(,)?) => {
        $(
            pub fn $name(
                version: OpsetVersion,
                graph: &mut Graph,
                data: impl Into<NodeInput>,
                name: Option<&str>,
            ) -> Result<NodeRef, OpsetError> {
                unary_node(version, graph, $op, data, name)
            }
        )*
    };
}

binary_factories! {
    add => "Add",
    subtract => "Subtract",
    multiply => "Multiply",
    divide => "Divide",
    maximum => "Maximum",
    minimum => "Minimum",
    power => "Power",
}

unary_factories! {
    relu => "Relu",
    sigmoid => "Sigmoid",
    tanh => "Tanh",
    exp => "Exp",
    sqrt => "Sqrt",
    negative => "Negative",
    abs => "Abs",
    floor => "Floor",
    gelu => "Gelu",
    mish => "Mish",
    soft_plus => "SoftPlus",
    hswish => "HSwish",
}

pub fn swish(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    beta: impl Into<NodeInput>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("Swish", version)
        .input(data)
        .input(beta)
        .maybe_name(name)
        .build(graph)
}

pub fn round(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    mode: &str,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("Round", version)
        .input(data)
        .attr("mode", mode)
        .maybe_name(name)
        .build(graph)
}

pub fn convert(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    destination_type: DType,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("Convert", version)
        .input(data)
        .attr("destination_type", destination_type.tag())
        .maybe_name(name)
        .build(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_output_descriptor() {
        let mut graph = Graph::new();
        let a = graph.parameter(DType::F32, Shape::from_raw(&[4, 1]).unwrap(), None, None).unwrap();
        let b = graph.parameter(DType::F32, Shape::from_raw(&[3]).unwrap(), None, None).unwrap();
        let sum = add(OpsetVersion::Opset1, &mut graph, a, b, None, None).unwrap();
        let out = &graph.node(sum).unwrap().outputs()[0];
        assert_eq!(out.dtype, Some(DType::F32));
        assert_eq!(out.shape.to_string(), "[4,3]");

        let pdpd = add(OpsetVersion::Opset1, &mut graph, a, b, Some("pdpd"), None).unwrap();
        assert_eq!(graph.node(pdpd).unwrap().outputs()[0].shape.to_string(), "[4,1]");
    }

    #[test]
    fn test_convert() {
        let mut graph = Graph::new();
        let a = graph.parameter(DType::F32, Shape::from_raw(&[2]).unwrap(), None, None).unwrap();
        let c = convert(OpsetVersion::Opset1, &mut graph, a, DType::I8, None).unwrap();
        assert_eq!(graph.node(c).unwrap().outputs()[0].dtype, Some(DType::I8));
    }

    #[test]
    fn test_activation_versions() {
        let mut graph = Graph::new();
        let a = graph.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        assert!(matches!(
            mish(OpsetVersion::Opset3, &mut graph, a, None),
            Err(OpsetError::UnknownOperator { .. })
        ));
        mish(OpsetVersion::Opset4, &mut graph, a, None).unwrap();
        let s = swish(OpsetVersion::Opset4, &mut graph, a, NodeInput::Absent, None).unwrap();
        assert_eq!(graph.node(s).unwrap().inputs().len(), 1);
    }

    #[test]
    fn test_round_mode_checked() {
        let mut graph = Graph::new();
        let a = graph.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        let err = round(OpsetVersion::Opset5, &mut graph, a, "half_up", None).unwrap_err();
        assert!(matches!(err, OpsetError::InvalidEnumerationValue { .. }));
        assert_eq!(graph.len(), 1);
    }
}
