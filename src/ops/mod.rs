//! The operator catalog.
//!
//! Each family module declares its schemas as constant data and exposes
//! version-generic factory functions. The `crate::opsets` modules bind those
//! functions to a fixed version.

pub mod constant;
pub mod control_flow;
pub mod convolution;
pub mod data_movement;
pub mod elementwise;
pub mod normalization;
pub mod sequence;

use crate::attributes::AttributeKind;
use crate::error::OpsetError;
use crate::graph::OutputDescriptor;
use crate::registry::ConstructionContext;
use crate::schema::{AttributeSpec, DefaultValue, OperatorSchema};
use crate::shape::{Dimension, Shape};

pub(crate) const CATALOG: &[&[OperatorSchema]] = &[
    constant::SCHEMAS,
    elementwise::SCHEMAS,
    data_movement::SCHEMAS,
    sequence::SCHEMAS,
    convolution::SCHEMAS,
    normalization::SCHEMAS,
    control_flow::SCHEMAS,
];

pub(crate) const AUTO_BROADCAST: AttributeSpec = AttributeSpec::new("auto_broadcast", AttributeKind::String)
    .with_default(DefaultValue::Str("numpy"))
    .allowed(&["none", "numpy", "pdpd"]);

/// One output with the descriptor of the first input.
pub(crate) fn same_as_input(ctx: &ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError> {
    Ok(vec![ctx.input(0).cloned().unwrap_or_else(OutputDescriptor::unresolved)])
}

/// Resolves a possibly negative axis against a known rank.
pub(crate) fn normalize_axis(axis: i64, rank: usize) -> Option<usize> {
    let rank = rank as i64;
    let axis = if axis < 0 { axis + rank } else { axis };
    (0..rank).contains(&axis).then_some(axis as usize)
}

/// Numpy-style broadcast of two shapes. Incompatible known dims come out
/// dynamic; rejecting them is left to shape inference downstream.
pub(crate) fn broadcast_numpy(a: &Shape, b: &Shape) -> Shape {
    let (Some(a), Some(b)) = (a.dims(), b.dims()) else {
        return Shape::DynamicRank;
    };
    let rank = a.len().max(b.len());
    let padded = |dims: &[Dimension], i: usize| {
        let offset = rank - dims.len();
        if i < offset { Dimension::Known(1) } else { dims[i - offset] }
    };
    Shape::new((0..rank).map(|i| match (padded(a, i), padded(b, i)) {
        (Dimension::Known(1), x) | (x, Dimension::Known(1)) => x,
        (Dimension::Known(x), Dimension::Known(y)) if x == y => Dimension::Known(x),
        (Dimension::Known(_), Dimension::Known(_)) => Dimension::Dynamic,
        (Dimension::Dynamic, Dimension::Known(x)) | (Dimension::Known(x), Dimension::Dynamic) => Dimension::Known(x),
        (Dimension::Dynamic, Dimension::Dynamic) => Dimension::Dynamic,
    }))
}
