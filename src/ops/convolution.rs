//! Convolution and binary (xnor-popcount) convolution.

use crate::attributes::AttributeKind;
use crate::builder::NodeBuilder;
use crate::error::OpsetError;
use crate::graph::{Graph, NodeRef, OutputDescriptor};
use crate::normalize::NodeInput;
use crate::registry::{ConstructionContext, OpsetVersion};
use crate::schema::{AttributeSpec, Constraint, DefaultValue, InputRole, OperatorSchema};
use crate::shape::{Dimension, Shape};

const CONVOLUTION_INPUTS: &[InputRole] = &[InputRole::required("data"), InputRole::required("filters")];
const CONVOLUTION_ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec::new("strides", AttributeKind::Ints).constraint(Constraint::Positive),
    AttributeSpec::new("pads_begin", AttributeKind::Ints).constraint(Constraint::NonNegative),
    AttributeSpec::new("pads_end", AttributeKind::Ints).constraint(Constraint::NonNegative),
    AttributeSpec::new("dilations", AttributeKind::Ints).constraint(Constraint::Positive),
    AttributeSpec::new("auto_pad", AttributeKind::String)
        .with_default(DefaultValue::Str("explicit"))
        .allowed(&["explicit", "same_upper", "same_lower", "valid"]),
];
const BINARY_CONVOLUTION_ATTRIBUTES: &[AttributeSpec] = &[
    CONVOLUTION_ATTRIBUTES[0],
    CONVOLUTION_ATTRIBUTES[1],
    CONVOLUTION_ATTRIBUTES[2],
    CONVOLUTION_ATTRIBUTES[3],
    CONVOLUTION_ATTRIBUTES[4],
    AttributeSpec::new("mode", AttributeKind::String).allowed(&["xnor-popcount"]),
    AttributeSpec::new("pad_value", AttributeKind::Float),
];

pub(crate) const SCHEMAS: &[OperatorSchema] = &[
    OperatorSchema::new("Convolution", OpsetVersion::Opset1, construct_convolution)
        .inputs(CONVOLUTION_INPUTS)
        .attributes(CONVOLUTION_ATTRIBUTES),
    OperatorSchema::new("BinaryConvolution", OpsetVersion::Opset1, construct_convolution)
        .inputs(CONVOLUTION_INPUTS)
        .attributes(BINARY_CONVOLUTION_ATTRIBUTES),
];

/// Attributes shared by both convolution flavours.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionAttributes {
    pub strides: Vec<i64>,
    pub pads_begin: Vec<i64>,
    pub pads_end: Vec<i64>,
    pub dilations: Vec<i64>,
    pub auto_pad: Option<String>,
}

impl ConvolutionAttributes {
    /// Unit strides and dilations, no padding.
    pub fn new(spatial_rank: usize) -> Self {
        Self {
            strides: vec![1; spatial_rank],
            pads_begin: vec![0; spatial_rank],
            pads_end: vec![0; spatial_rank],
            dilations: vec![1; spatial_rank],
            auto_pad: None,
        }
    }

    fn apply(&self, builder: NodeBuilder) -> NodeBuilder {
        builder
            .attr("strides", self.strides.clone())
            .attr("pads_begin", self.pads_begin.clone())
            .attr("pads_end", self.pads_end.clone())
            .attr("dilations", self.dilations.clone())
            .maybe_attr("auto_pad", self.auto_pad.clone())
    }
}

struct SpatialParams<'a> {
    strides: &'a [i64],
    pads_begin: &'a [i64],
    pads_end: &'a [i64],
    dilations: &'a [i64],
    auto_pad: &'a str,
}

impl SpatialParams<'_> {
    fn output_dim(&self, i: usize, input: Dimension, kernel: Dimension) -> Dimension {
        self.checked_output_dim(i, input, kernel)
            .map(Dimension::Known)
            .unwrap_or(Dimension::Dynamic)
    }

    /// `None` when a dim is unknown, the arithmetic overflows, or the kernel
    /// is larger than the padded input (reported downstream).
    fn checked_output_dim(&self, i: usize, input: Dimension, kernel: Dimension) -> Option<u64> {
        let input = i64::try_from(input.value()?).ok()?;
        let stride = *self.strides.get(i)?;
        match self.auto_pad {
            "same_upper" | "same_lower" => {
                let out = input.checked_add(stride.checked_sub(1)?)?.checked_div(stride)?;
                u64::try_from(out).ok()
            }
            _ => {
                let kernel = i64::try_from(kernel.value()?).ok()?;
                let dilation = *self.dilations.get(i)?;
                let (begin, end) = if self.auto_pad == "valid" {
                    (0, 0)
                } else {
                    (*self.pads_begin.get(i)?, *self.pads_end.get(i)?)
                };
                let effective_kernel = (kernel - 1).checked_mul(dilation)?.checked_add(1)?;
                let span = input
                    .checked_add(begin)?
                    .checked_add(end)?
                    .checked_sub(effective_kernel)?;
                if span < 0 {
                    return None;
                }
                u64::try_from(span.checked_div(stride)? + 1).ok()
            }
        }
    }
}

/// Forward convolution output shape: `[N, C_out, spatial...]` with batch from
/// the data, channels from the first filter dim.
fn construct_convolution(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    let dtype = ctx.input_dtype(0);
    let (Some(data), Some(filters)) = (ctx.input(0), ctx.input(1)) else {
        return Ok(vec![OutputDescriptor::unresolved()]);
    };
    let Some(rank) = data.shape.rank().or(filters.shape.rank()) else {
        return Ok(vec![OutputDescriptor {
            dtype,
            shape: Shape::DynamicRank,
        }]);
    };
    let params = SpatialParams {
        strides: ctx.ints("strides").unwrap_or_default(),
        pads_begin: ctx.ints("pads_begin").unwrap_or_default(),
        pads_end: ctx.ints("pads_end").unwrap_or_default(),
        dilations: ctx.ints("dilations").unwrap_or_default(),
        auto_pad: ctx.string("auto_pad").unwrap_or("explicit"),
    };
    let mut dims = vec![data.shape.dim(0), filters.shape.dim(0)];
    for i in 0..rank.saturating_sub(2) {
        dims.push(params.output_dim(i, data.shape.dim(i + 2), filters.shape.dim(i + 2)));
    }
    Ok(vec![OutputDescriptor {
        dtype,
        shape: Shape::new(dims),
    }])
}

pub fn convolution(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    filters: impl Into<NodeInput>,
    attributes: &ConvolutionAttributes,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    let builder = NodeBuilder::new("Convolution", version).input(data).input(filters);
    attributes.apply(builder).maybe_name(name).build(graph)
}

#[allow(clippy::too_many_arguments)]
pub fn binary_convolution(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    filters: impl Into<NodeInput>,
    attributes: &ConvolutionAttributes,
    mode: &str,
    pad_value: f32,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    let builder = NodeBuilder::new("BinaryConvolution", version).input(data).input(filters);
    attributes
        .apply(builder)
        .attr("mode", mode)
        .attr("pad_value", pad_value)
        .maybe_name(name)
        .build(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    fn setup(data: &[i64], filters: &[i64]) -> (Graph, NodeRef, NodeRef) {
        let mut graph = Graph::new();
        let d = graph.parameter(DType::F32, Shape::from_raw(data).unwrap(), None, None).unwrap();
        let f = graph.parameter(DType::F32, Shape::from_raw(filters).unwrap(), None, None).unwrap();
        (graph, d, f)
    }

    #[test]
    fn test_binary_convolution_explicit_pads() {
        let (mut graph, d, f) = setup(&[1, 1, 5, 5], &[1, 1, 3, 3]);
        let attrs = ConvolutionAttributes::new(2);
        let conv = binary_convolution(OpsetVersion::Opset1, &mut graph, d, f, &attrs, "xnor-popcount", 0.0, None)
            .unwrap();
        let node = graph.node(conv).unwrap();
        assert_eq!(node.outputs()[0].shape.to_string(), "[1,1,3,3]");
        assert_eq!(node.attributes()["auto_pad"].as_str(), Some("explicit"));
    }

    #[test]
    fn test_strided_dilated_padded() {
        let (mut graph, d, f) = setup(&[2, 3, 10, 9], &[8, 3, 3, 3]);
        let attrs = ConvolutionAttributes {
            strides: vec![2, 1],
            pads_begin: vec![1, 0],
            pads_end: vec![1, 0],
            dilations: vec![1, 2],
            auto_pad: None,
        };
        let conv = convolution(OpsetVersion::Opset1, &mut graph, d, f, &attrs, None).unwrap();
        assert_eq!(graph.node(conv).unwrap().outputs()[0].shape.to_string(), "[2,8,5,5]");
    }

    #[test]
    fn test_auto_pad_modes() {
        let (mut graph, d, f) = setup(&[1, 1, 7, -1], &[4, 1, 3, 3]);
        let mut attrs = ConvolutionAttributes::new(2);
        attrs.strides = vec![2, 2];
        attrs.pads_begin = vec![5, 5];
        attrs.auto_pad = Some("same_upper".to_string());
        let same = convolution(OpsetVersion::Opset1, &mut graph, d, f, &attrs, None).unwrap();
        assert_eq!(graph.node(same).unwrap().outputs()[0].shape.to_string(), "[1,4,4,?]");

        attrs.auto_pad = Some("valid".to_string());
        let valid = convolution(OpsetVersion::Opset1, &mut graph, d, f, &attrs, None).unwrap();
        assert_eq!(graph.node(valid).unwrap().outputs()[0].shape.to_string(), "[1,4,3,?]");
    }

    #[test]
    fn test_overflowing_spatial_arithmetic_is_dynamic() {
        let (mut graph, d, f) = setup(&[1, 1, 5], &[1, 1, 3]);
        let mut attrs = ConvolutionAttributes::new(1);
        attrs.dilations = vec![i64::MAX];
        let conv = convolution(OpsetVersion::Opset1, &mut graph, d, f, &attrs, None).unwrap();
        assert_eq!(graph.node(conv).unwrap().outputs()[0].shape.to_string(), "[1,1,?]");

        let mut attrs = ConvolutionAttributes::new(1);
        attrs.pads_begin = vec![i64::MAX];
        attrs.pads_end = vec![i64::MAX];
        let conv = convolution(OpsetVersion::Opset1, &mut graph, d, f, &attrs, None).unwrap();
        assert_eq!(graph.node(conv).unwrap().outputs()[0].shape.to_string(), "[1,1,?]");

        attrs.auto_pad = Some("same_lower".to_string());
        attrs.strides = vec![i64::MAX];
        let conv = convolution(OpsetVersion::Opset1, &mut graph, d, f, &attrs, None).unwrap();
        assert_eq!(graph.node(conv).unwrap().outputs()[0].shape.to_string(), "[1,1,?]");
    }

    #[test]
    fn test_attribute_checks() {
        let (mut graph, d, f) = setup(&[1, 1, 5, 5], &[1, 1, 3, 3]);
        let mut attrs = ConvolutionAttributes::new(2);
        attrs.strides = vec![0, 1];
        let err = convolution(OpsetVersion::Opset1, &mut graph, d, f, &attrs, None).unwrap_err();
        assert!(matches!(err, OpsetError::AttributeConstraintViolation { .. }));

        let attrs = ConvolutionAttributes::new(2);
        let err = binary_convolution(OpsetVersion::Opset1, &mut graph, d, f, &attrs, "xor", 0.0, None).unwrap_err();
        assert!(matches!(err, OpsetError::InvalidEnumerationValue { .. }));
        assert_eq!(graph.len(), 2);
    }
}
