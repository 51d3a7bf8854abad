//! Sequence decoding and top-k selection.

use crate::attributes::AttributeKind;
use crate::builder::NodeBuilder;
use crate::dtype::{DType, INDEX_TYPE_TAGS};
use crate::error::OpsetError;
use crate::graph::{Graph, NodeRef, OutputDescriptor};
use crate::normalize::NodeInput;
use crate::ops::normalize_axis;
use crate::registry::{ConstructionContext, OpsetVersion};
use crate::schema::{AttributeSpec, DefaultValue, InputRole, OperatorSchema};
use crate::shape::{Dimension, Shape};

const CTC_INPUTS: &[InputRole] = &[InputRole::required("data"), InputRole::required("sequence_mask")];
const CTC_ATTRIBUTES: &[AttributeSpec] = &[AttributeSpec::new("ctc_merge_repeated", AttributeKind::Bool)];
const CTC_SEQ_LEN_INPUTS: &[InputRole] = &[
    InputRole::required("data"),
    InputRole::required("sequence_length"),
    InputRole::optional("blank_index"),
];
const CTC_SEQ_LEN_ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec::new("merge_repeated", AttributeKind::Bool).with_default(DefaultValue::Bool(true)),
    AttributeSpec::new("classes_index_type", AttributeKind::String)
        .with_default(DefaultValue::Str("i32"))
        .allowed(INDEX_TYPE_TAGS),
    AttributeSpec::new("sequence_length_type", AttributeKind::String)
        .with_default(DefaultValue::Str("i32"))
        .allowed(INDEX_TYPE_TAGS),
];
const TOP_K_INPUTS: &[InputRole] = &[InputRole::required("data"), InputRole::required("k")];
const TOP_K_ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec::new("axis", AttributeKind::Int),
    AttributeSpec::new("mode", AttributeKind::String).allowed(&["max", "min"]),
    AttributeSpec::new("sort", AttributeKind::String).allowed(&["none", "index", "value"]),
];
const TOP_K_TYPED_ATTRIBUTES: &[AttributeSpec] = &[
    TOP_K_ATTRIBUTES[0],
    TOP_K_ATTRIBUTES[1],
    TOP_K_ATTRIBUTES[2],
    AttributeSpec::new("index_element_type", AttributeKind::String)
        .with_default(DefaultValue::Str("i32"))
        .allowed(INDEX_TYPE_TAGS),
];

pub(crate) const SCHEMAS: &[OperatorSchema] = &[
    OperatorSchema::new("CTCGreedyDecoder", OpsetVersion::Opset1, construct_ctc_greedy_decoder)
        .inputs(CTC_INPUTS)
        .attributes(CTC_ATTRIBUTES),
    OperatorSchema::new("CTCGreedyDecoderSeqLen", OpsetVersion::Opset6, construct_ctc_greedy_decoder_seq_len)
        .inputs(CTC_SEQ_LEN_INPUTS)
        .attributes(CTC_SEQ_LEN_ATTRIBUTES),
    OperatorSchema::new("TopK", OpsetVersion::Opset1, construct_top_k)
        .inputs(TOP_K_INPUTS)
        .attributes(TOP_K_ATTRIBUTES)
        .until(OpsetVersion::Opset3),
    OperatorSchema::new("TopK", OpsetVersion::Opset3, construct_top_k)
        .inputs(TOP_K_INPUTS)
        .attributes(TOP_K_TYPED_ATTRIBUTES),
];

fn data_dim(ctx: &ConstructionContext, index: usize) -> Dimension {
    ctx.input(0).map(|x| x.shape.dim(index)).unwrap_or(Dimension::Dynamic)
}

/// data is `[T, N, C]`, the decoded output `[N, T, 1, 1]`.
fn construct_ctc_greedy_decoder(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    let shape = Shape::new([data_dim(ctx, 1), data_dim(ctx, 0), Dimension::Known(1), Dimension::Known(1)]);
    Ok(vec![OutputDescriptor {
        dtype: ctx.input_dtype(0),
        shape,
    }])
}

/// data is `[N, T, C]`; outputs are the classes `[N, T]` and the decoded
/// lengths `[N]`.
fn construct_ctc_greedy_decoder_seq_len(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    let batch = data_dim(ctx, 0);
    let time = data_dim(ctx, 1);
    Ok(vec![
        OutputDescriptor {
            dtype: ctx.dtype("classes_index_type")?,
            shape: Shape::new([batch, time]),
        },
        OutputDescriptor {
            dtype: ctx.dtype("sequence_length_type")?,
            shape: Shape::new([batch]),
        },
    ])
}

fn construct_top_k(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    let shape = match (ctx.input(0).and_then(|x| x.shape.dims()), ctx.int("axis")) {
        (Some(dims), Some(axis)) => match normalize_axis(axis, dims.len()) {
            Some(axis) => {
                // k is a value, not known here
                let mut dims = dims.to_vec();
                dims[axis] = Dimension::Dynamic;
                Shape::new(dims)
            }
            None => Shape::DynamicRank,
        },
        _ => Shape::DynamicRank,
    };
    let index_type = ctx.dtype("index_element_type")?.unwrap_or(DType::I32);
    Ok(vec![
        OutputDescriptor {
            dtype: ctx.input_dtype(0),
            shape: shape.clone(),
        },
        OutputDescriptor::new(index_type, shape),
    ])
}

pub fn ctc_greedy_decoder(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    sequence_mask: impl Into<NodeInput>,
    ctc_merge_repeated: bool,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("CTCGreedyDecoder", version)
        .input(data)
        .input(sequence_mask)
        .attr("ctc_merge_repeated", ctc_merge_repeated)
        .maybe_name(name)
        .build(graph)
}

/// Greedy CTC decoding with explicit per-batch sequence lengths.
/// `blank_index` may be [`NodeInput::Absent`], in which case the last class
/// is the blank.
#[allow(clippy::too_many_arguments)]
pub fn ctc_greedy_decoder_seq_len(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    sequence_length: impl Into<NodeInput>,
    blank_index: impl Into<NodeInput>,
    merge_repeated: Option<bool>,
    classes_index_type: Option<DType>,
    sequence_length_type: Option<DType>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("CTCGreedyDecoderSeqLen", version)
        .input(data)
        .input(sequence_length)
        .input(blank_index)
        .maybe_attr("merge_repeated", merge_repeated)
        .maybe_attr("classes_index_type", classes_index_type.map(|x| x.tag()))
        .maybe_attr("sequence_length_type", sequence_length_type.map(|x| x.tag()))
        .maybe_name(name)
        .build(graph)
}

#[allow(clippy::too_many_arguments)]
pub fn top_k(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    k: impl Into<NodeInput>,
    axis: i64,
    mode: &str,
    sort: &str,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    top_k_typed(version, graph, data, k, axis, mode, sort, None, name)
}

/// TopK with a selectable index element type.
#[allow(clippy::too_many_arguments)]
pub fn top_k_typed(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    k: impl Into<NodeInput>,
    axis: i64,
    mode: &str,
    sort: &str,
    index_element_type: Option<DType>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("TopK", version)
        .input(data)
        .input(k)
        .attr("axis", axis)
        .attr("mode", mode)
        .attr("sort", sort)
        .maybe_attr("index_element_type", index_element_type.map(|x| x.tag()))
        .maybe_name(name)
        .build(graph)
}
