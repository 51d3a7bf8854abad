//! Sub-graph bodies and iteration descriptors for TensorIterator and Loop.
//!
//! A body is its own [`Graph`] arena. The enclosing node never holds edges into
//! it; it refers to body parameters and results only by position, through the
//! descriptors below.

use crate::error::OpsetError;
use crate::graph::{Graph, NodeKind, NodeRef, OutputDescriptor, OutputRef};
use crate::shape::Shape;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompositeKind {
    TensorIterator,
    Loop,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubGraph {
    graph: Arc<Graph>,
    parameters: Vec<NodeRef>,
    results: Vec<OutputRef>,
}

impl SubGraph {
    pub fn new(graph: Graph, parameters: Vec<NodeRef>, results: Vec<OutputRef>) -> Self {
        Self {
            graph: Arc::new(graph),
            parameters,
            results,
        }
    }

    /// Uses every parameter of `graph`, in declaration order.
    pub fn from_results(graph: Graph, results: Vec<OutputRef>) -> Self {
        let parameters = graph.parameters().collect();
        Self::new(graph, parameters, results)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn parameters(&self) -> &[NodeRef] {
        &self.parameters
    }

    pub fn results(&self) -> &[OutputRef] {
        &self.results
    }

    pub fn result_descriptor(&self, index: usize) -> Option<&OutputDescriptor> {
        self.graph.output_descriptor(self.results.get(index)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InputDescription {
    /// The whole tensor is fed to the body on every iteration.
    Invariant {
        input_index: usize,
        body_parameter_index: usize,
    },
    /// One slice along `axis` per iteration.
    Sliced {
        input_index: usize,
        body_parameter_index: usize,
        start: i64,
        stride: i64,
        part_size: i64,
        end: i64,
        axis: i64,
    },
    /// Initial value from the input, then the body result `body_value_index`
    /// of the previous iteration.
    Merged {
        input_index: usize,
        body_parameter_index: usize,
        body_value_index: usize,
    },
}

impl InputDescription {
    pub fn input_index(&self) -> usize {
        match self {
            InputDescription::Invariant { input_index, .. }
            | InputDescription::Sliced { input_index, .. }
            | InputDescription::Merged { input_index, .. } => *input_index,
        }
    }

    pub fn body_parameter_index(&self) -> usize {
        match self {
            InputDescription::Invariant { body_parameter_index, .. }
            | InputDescription::Sliced { body_parameter_index, .. }
            | InputDescription::Merged { body_parameter_index, .. } => *body_parameter_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OutputDescription {
    /// The body result at iteration `iteration`, `-1` for the last one.
    Body {
        body_value_index: usize,
        output_index: usize,
        iteration: i64,
    },
    /// Body results of all iterations concatenated along `axis`.
    Concat {
        body_value_index: usize,
        output_index: usize,
        start: i64,
        stride: i64,
        part_size: i64,
        end: i64,
        axis: i64,
    },
}

impl OutputDescription {
    pub fn body_value_index(&self) -> usize {
        match self {
            OutputDescription::Body { body_value_index, .. }
            | OutputDescription::Concat { body_value_index, .. } => *body_value_index,
        }
    }

    pub fn output_index(&self) -> usize {
        match self {
            OutputDescription::Body { output_index, .. } | OutputDescription::Concat { output_index, .. } => {
                *output_index
            }
        }
    }
}

/// Loop-only body ports. `-1` marks a port as unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpecialBodyPorts {
    pub current_iteration_input_idx: i64,
    pub body_condition_output_idx: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositeSpec {
    pub body: SubGraph,
    pub inputs: Vec<InputDescription>,
    pub outputs: Vec<OutputDescription>,
    pub special_ports: Option<SpecialBodyPorts>,
}

fn malformed(op: &str, reason: impl Into<String>) -> OpsetError {
    OpsetError::MalformedCompositeDescriptor {
        op: op.to_string(),
        reason: reason.into(),
    }
}

fn check_axis(op: &str, what: &str, axis: i64, shape: Option<&Shape>) -> Result<(), OpsetError> {
    if let Some(rank) = shape.and_then(|x| x.rank()) {
        let rank = rank as i64;
        if axis < -rank || axis >= rank {
            return Err(malformed(op, format!("{} axis {} is outside rank {}", what, axis, rank)));
        }
    }
    Ok(())
}

fn check_slicing(op: &str, what: &str, stride: i64, part_size: i64) -> Result<(), OpsetError> {
    if stride == 0 {
        return Err(malformed(op, format!("{} has zero stride", what)));
    }
    if part_size <= 0 {
        return Err(malformed(op, format!("{} has non-positive part_size {}", what, part_size)));
    }
    Ok(())
}

impl CompositeSpec {
    /// Structural validation against the node's normalized inputs.
    pub fn validate(&self, op: &str, kind: CompositeKind, inputs: &[OutputDescriptor]) -> Result<(), OpsetError> {
        let body = &self.body;
        for parameter in body.parameters() {
            match body.graph().node(*parameter).map(|x| x.kind()) {
                Some(NodeKind::Parameter) => {}
                _ => return Err(malformed(op, "body parameter list refers to a non-parameter node")),
            }
        }
        for (i, result) in body.results().iter().enumerate() {
            if body.graph().output_descriptor(result).is_none() {
                return Err(malformed(op, format!("body result {} is not an output of the body", i)));
            }
        }

        // Loop reserves inputs 0 and 1 for trip_count and execution_condition
        let first_data_input = match kind {
            CompositeKind::TensorIterator => 0,
            CompositeKind::Loop => 2,
        };

        let mut fed = HashSet::new();
        for description in &self.inputs {
            let input_index = description.input_index();
            if input_index < first_data_input || input_index >= inputs.len() {
                return Err(malformed(op, format!("input description refers to input {}", input_index)));
            }
            let parameter = description.body_parameter_index();
            if parameter >= body.parameters().len() {
                return Err(malformed(
                    op,
                    format!("body parameter index {} out of range ({} parameters)", parameter, body.parameters().len()),
                ));
            }
            if !fed.insert(parameter) {
                return Err(malformed(op, format!("body parameter {} is fed more than once", parameter)));
            }
            match description {
                InputDescription::Invariant { .. } => {}
                InputDescription::Sliced {
                    stride, part_size, axis, ..
                } => {
                    check_slicing(op, "sliced input", *stride, *part_size)?;
                    check_axis(op, "sliced input", *axis, Some(&inputs[input_index].shape))?;
                }
                InputDescription::Merged { body_value_index, .. } => {
                    if *body_value_index >= body.results().len() {
                        return Err(malformed(
                            op,
                            format!("merged input refers to body result {}", body_value_index),
                        ));
                    }
                }
            }
        }

        let mut output_indices = Vec::with_capacity(self.outputs.len());
        for description in &self.outputs {
            let value = description.body_value_index();
            if value >= body.results().len() {
                return Err(malformed(op, format!("output description refers to body result {}", value)));
            }
            match description {
                OutputDescription::Body { iteration, .. } if *iteration < -1 => {
                    return Err(malformed(op, format!("invalid body output iteration {}", iteration)));
                }
                OutputDescription::Body { .. } => {}
                OutputDescription::Concat {
                    stride, part_size, axis, ..
                } => {
                    check_slicing(op, "concat output", *stride, *part_size)?;
                    check_axis(op, "concat output", *axis, body.result_descriptor(value).map(|x| &x.shape))?;
                }
            }
            output_indices.push(description.output_index());
        }
        output_indices.sort();
        if output_indices.iter().enumerate().any(|(i, x)| i != *x) {
            return Err(malformed(op, "output indices must cover 0..n exactly once"));
        }

        match (kind, &self.special_ports) {
            (CompositeKind::TensorIterator, None) => {}
            (CompositeKind::TensorIterator, Some(_)) => {
                return Err(malformed(op, "TensorIterator has no special body ports"));
            }
            (CompositeKind::Loop, None) => {
                return Err(malformed(op, "Loop requires special body ports"));
            }
            (CompositeKind::Loop, Some(ports)) => {
                let condition = ports.body_condition_output_idx;
                if condition < 0 || condition as usize >= body.results().len() {
                    return Err(malformed(op, format!("body condition output {} out of range", condition)));
                }
                let iteration = ports.current_iteration_input_idx;
                if iteration >= 0 {
                    let iteration = iteration as usize;
                    if iteration >= body.parameters().len() {
                        return Err(malformed(op, format!("current iteration input {} out of range", iteration)));
                    }
                    if fed.contains(&iteration) {
                        return Err(malformed(op, "current iteration input is also fed by an input description"));
                    }
                } else if iteration != -1 {
                    return Err(malformed(op, format!("invalid current iteration input {}", iteration)));
                }
            }
        }
        Ok(())
    }

    /// Output descriptors of the enclosing node, ordered by output index.
    pub fn output_descriptors(&self) -> Vec<OutputDescriptor> {
        let mut outputs = vec![OutputDescriptor::unresolved(); self.outputs.len()];
        for description in &self.outputs {
            let Some(result) = self.body.result_descriptor(description.body_value_index()) else {
                continue;
            };
            let shape = match description {
                OutputDescription::Body { .. } => result.shape.clone(),
                // iteration count is not known here
                OutputDescription::Concat { axis, .. } => match result.shape.dims() {
                    Some(dims) => {
                        let rank = dims.len() as i64;
                        let axis = (if *axis < 0 { axis + rank } else { *axis }) as usize;
                        let mut dims = dims.to_vec();
                        if let Some(dim) = dims.get_mut(axis) {
                            *dim = crate::shape::Dimension::Dynamic;
                        }
                        Shape::new(dims)
                    }
                    None => Shape::DynamicRank,
                },
            };
            outputs[description.output_index()] = OutputDescriptor {
                dtype: result.dtype,
                shape,
            };
        }
        outputs
    }
}
