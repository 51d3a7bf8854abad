//! Input normalization: turns caller-supplied values into edges.

use crate::dtype::DType;
use crate::error::OpsetError;
use crate::graph::{constant_node, NodeRef, OutputRef, Staging};
use crate::literal::{LiteralElement, LiteralTensor};
use crate::registry::OpsetVersion;
use crate::schema::{InputRole, Presence};
use ndarray::{ArcArray, Array, Dimension};

/// One caller-supplied input value.
#[derive(Debug, Clone)]
pub enum NodeInput {
    /// An output of an existing node, passed through unchanged.
    Output(OutputRef),
    /// A literal, embedded as a new constant node. `dtype` overrides the
    /// element type inferred from the value.
    Literal {
        value: LiteralTensor,
        dtype: Option<DType>,
    },
    /// Untyped data, such as a value read from JSON. Numbers and rectangular
    /// nested arrays of numbers or booleans become literals, `null` is absent.
    Value(serde_json::Value),
    /// An omitted optional input.
    Absent,
}

impl NodeInput {
    pub fn literal_as(value: impl Into<LiteralTensor>, dtype: DType) -> Self {
        NodeInput::Literal {
            value: value.into(),
            dtype: Some(dtype),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, NodeInput::Absent | NodeInput::Value(serde_json::Value::Null))
    }

    /// Converts [`NodeInput::Value`] into a literal or absent marker.
    pub(crate) fn resolve_value(self, op: &str, index: usize) -> Result<NodeInput, OpsetError> {
        match self {
            NodeInput::Value(serde_json::Value::Null) => Ok(NodeInput::Absent),
            NodeInput::Value(value) => {
                let value = literal_from_json(&value).map_err(|reason| OpsetError::InvalidInputKind {
                    op: op.to_string(),
                    index,
                    reason,
                })?;
                Ok(NodeInput::Literal { value, dtype: None })
            }
            other => Ok(other),
        }
    }
}

impl From<OutputRef> for NodeInput {
    fn from(value: OutputRef) -> Self {
        NodeInput::Output(value)
    }
}

impl From<NodeRef> for NodeInput {
    fn from(value: NodeRef) -> Self {
        NodeInput::Output(value.output(0))
    }
}

impl From<LiteralTensor> for NodeInput {
    fn from(value: LiteralTensor) -> Self {
        NodeInput::Literal { value, dtype: None }
    }
}

impl From<serde_json::Value> for NodeInput {
    fn from(value: serde_json::Value) -> Self {
        NodeInput::Value(value)
    }
}

impl<T: Into<NodeInput>> From<Option<T>> for NodeInput {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(NodeInput::Absent)
    }
}

impl<T: LiteralElement> From<Vec<T>> for NodeInput {
    fn from(value: Vec<T>) -> Self {
        LiteralTensor::from(value).into()
    }
}

impl<T: LiteralElement, D: Dimension> From<Array<T, D>> for NodeInput {
    fn from(value: Array<T, D>) -> Self {
        LiteralTensor::from(value).into()
    }
}

impl<T: LiteralElement, D: Dimension> From<ArcArray<T, D>> for NodeInput {
    fn from(value: ArcArray<T, D>) -> Self {
        LiteralTensor::from(value).into()
    }
}

macro_rules! impl_scalar_input {
    ($($t:ty),*) => {
        $(
            impl From<$t> for NodeInput {
                fn from(value: $t) -> Self {
                    LiteralTensor::scalar(value).into()
                }
            }
        )*
    };
}

impl_scalar_input!(f64, f32, half::bf16, half::f16, i64, u64, i32, u32, i16, u16, i8, u8, bool);

fn flatten_json(
    value: &serde_json::Value,
    depth: usize,
    dims: &mut Vec<usize>,
    out: &mut Vec<serde_json::Value>,
) -> Result<(), String> {
    match value {
        serde_json::Value::Array(items) => {
            if !out.is_empty() && depth >= dims.len() {
                return Err("nested arrays are not rectangular".to_string());
            }
            if dims.len() == depth {
                dims.push(items.len());
            } else if dims.get(depth) != Some(&items.len()) {
                return Err("nested arrays are not rectangular".to_string());
            }
            for item in items {
                flatten_json(item, depth + 1, dims, out)?;
            }
            Ok(())
        }
        serde_json::Value::Number(_) | serde_json::Value::Bool(_) => {
            if depth != dims.len() {
                return Err("nested arrays are not rectangular".to_string());
            }
            out.push(value.clone());
            Ok(())
        }
        serde_json::Value::String(_) => Err("strings are not numeric literals".to_string()),
        serde_json::Value::Object(_) => Err("objects are not numeric literals".to_string()),
        serde_json::Value::Null => Err("null inside an array literal".to_string()),
    }
}

fn literal_from_json(value: &serde_json::Value) -> Result<LiteralTensor, String> {
    let mut dims = vec![];
    let mut elements = vec![];
    flatten_json(value, 0, &mut dims, &mut elements)?;
    if dims.iter().try_fold(1usize, |acc, x| acc.checked_mul(*x)) != Some(elements.len()) {
        return Err("nested arrays are not rectangular".to_string());
    }

    let literal = if elements.iter().all(|x| x.is_boolean()) && !elements.is_empty() {
        let values = elements.iter().filter_map(|x| x.as_bool()).collect();
        LiteralTensor::from_vec_shape(values, &dims)
    } else if elements.iter().all(|x| x.is_i64()) {
        let values = elements.iter().filter_map(|x| x.as_i64()).collect();
        LiteralTensor::from_vec_shape(values, &dims)
    } else if elements.iter().all(|x| x.is_number()) {
        let values = elements.iter().filter_map(|x| x.as_f64()).collect();
        LiteralTensor::from_vec_shape::<f64>(values, &dims)
    } else {
        return Err("mixed booleans and numbers".to_string());
    };
    literal.map_err(|err| err.to_string())
}

/// The role that governs input `index`; a trailing variadic role covers
/// every remaining position.
fn role_for(roles: &[InputRole], index: usize) -> Option<&InputRole> {
    roles.get(index).or_else(|| match roles.last() {
        Some(role @ InputRole { presence: Presence::Variadic { .. }, .. }) => Some(role),
        _ => None,
    })
}

/// Checks `inputs` against the declared roles, stages a constant node for each
/// literal and returns the edge list. Trailing absent inputs are dropped.
pub(crate) fn normalize_inputs(
    op: &str,
    version: OpsetVersion,
    roles: &[InputRole],
    max_inputs: Option<usize>,
    inputs: Vec<NodeInput>,
    staging: &mut Staging,
) -> Result<Vec<OutputRef>, OpsetError> {
    let mut inputs = inputs
        .into_iter()
        .enumerate()
        .map(|(i, x)| x.resolve_value(op, i))
        .collect::<Result<Vec<_>, _>>()?;
    while inputs.last().is_some_and(|x| x.is_absent()) {
        inputs.pop();
    }

    if let Some(max) = max_inputs {
        if inputs.len() > max {
            return Err(OpsetError::TooManyInputs {
                op: op.to_string(),
                max,
                actual: inputs.len(),
            });
        }
    }

    let mut seen_absent = false;
    for (i, input) in inputs.iter().enumerate() {
        let Some(role) = role_for(roles, i) else {
            continue;
        };
        match (input.is_absent(), role.presence) {
            (true, Presence::Optional) => seen_absent = true,
            (true, Presence::Required) => {
                return Err(OpsetError::MissingRequiredInput {
                    op: op.to_string(),
                    input: role.name,
                });
            }
            (true, Presence::Variadic { .. }) => {
                return Err(OpsetError::InvalidInputKind {
                    op: op.to_string(),
                    index: i,
                    reason: format!("variadic input \"{}\" cannot be omitted", role.name),
                });
            }
            (false, _) if seen_absent => {
                return Err(OpsetError::InputAfterAbsent {
                    op: op.to_string(),
                    index: i,
                });
            }
            (false, _) => {}
        }
    }
    for (i, role) in roles.iter().enumerate() {
        match role.presence {
            Presence::Required if i >= inputs.len() => {
                return Err(OpsetError::MissingRequiredInput {
                    op: op.to_string(),
                    input: role.name,
                });
            }
            Presence::Variadic { min } if inputs.len() < i + min => {
                return Err(OpsetError::MissingRequiredInput {
                    op: op.to_string(),
                    input: role.name,
                });
            }
            _ => {}
        }
    }

    let mut edges = Vec::with_capacity(inputs.len());
    for (i, input) in inputs.into_iter().enumerate() {
        match input {
            NodeInput::Output(output) => {
                if output.graph != staging.graph().id() {
                    return Err(OpsetError::InvalidInputKind {
                        op: op.to_string(),
                        index: i,
                        reason: "node belongs to a different graph".to_string(),
                    });
                }
                if staging.output_descriptor(&output).is_none() {
                    return Err(OpsetError::InvalidInputKind {
                        op: op.to_string(),
                        index: i,
                        reason: format!("no output {} on node {}", output.index, output.node.index()),
                    });
                }
                edges.push(output);
            }
            NodeInput::Literal { value, dtype } => {
                log::trace!("{}: input {} is a literal {:?} {}", op, i, value.dtype(), value.shape());
                let node = staging.stage(constant_node(value, dtype, Some(version), None));
                edges.push(node.output(0));
            }
            // trailing absents are gone and absents before a present input were rejected
            NodeInput::Absent | NodeInput::Value(_) => {}
        }
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::shape::Shape;

    static ROLES: &[InputRole] = &[
        InputRole::required("data"),
        InputRole::required("lengths"),
        InputRole::optional("blank"),
        InputRole::optional("extra"),
    ];

    fn normalize(graph: &Graph, inputs: Vec<NodeInput>) -> Result<(Vec<OutputRef>, usize), OpsetError> {
        let mut staging = Staging::new(graph);
        let edges = normalize_inputs("Probe", OpsetVersion::Opset1, ROLES, Some(ROLES.len()), inputs, &mut staging)?;
        Ok((edges, staging.into_pending().len()))
    }

    #[test]
    fn test_literals_are_staged() {
        let mut graph = Graph::new();
        let p = graph.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        let (edges, staged) = normalize(&graph, vec![p.into(), 3i32.into(), NodeInput::Absent]).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0], p.output(0));
        assert_eq!(edges[1].node.index(), 1);
        assert_eq!(staged, 1);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_missing_required() {
        let graph = Graph::new();
        let err = normalize(&graph, vec![1.0f32.into()]).unwrap_err();
        assert!(matches!(err, OpsetError::MissingRequiredInput { input: "lengths", .. }));
    }

    #[test]
    fn test_input_after_absent() {
        let graph = Graph::new();
        let inputs = vec![1.0f32.into(), 2i32.into(), NodeInput::Absent, 0i32.into()];
        let err = normalize(&graph, inputs).unwrap_err();
        assert!(matches!(err, OpsetError::InputAfterAbsent { index: 3, .. }));
    }

    #[test]
    fn test_too_many() {
        let graph = Graph::new();
        let inputs = vec![1i32.into(), 1i32.into(), 1i32.into(), 1i32.into(), 1i32.into()];
        assert!(matches!(normalize(&graph, inputs), Err(OpsetError::TooManyInputs { max: 4, actual: 5, .. })));
    }

    #[test]
    fn test_foreign_and_dangling_refs() {
        let mut other = Graph::new();
        let foreign = other.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        let graph = Graph::new();
        let err = normalize(&graph, vec![foreign.into(), 1i32.into()]).unwrap_err();
        assert!(matches!(err, OpsetError::InvalidInputKind { index: 0, .. }));

        let mut graph = Graph::new();
        let p = graph.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        let err = normalize(&graph, vec![p.output(1).into(), 1i32.into()]).unwrap_err();
        assert!(matches!(err, OpsetError::InvalidInputKind { index: 0, .. }));
    }

    #[test]
    fn test_json_values() {
        let graph = Graph::new();
        let inputs = vec![
            serde_json::json!([[1, 2], [3, 4]]).into(),
            serde_json::json!(0.5).into(),
            serde_json::Value::Null.into(),
        ];
        let (edges, staged) = normalize(&graph, inputs).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(staged, 2);

        let err = normalize(&graph, vec![serde_json::json!("abc").into(), 1i32.into()]).unwrap_err();
        assert!(matches!(err, OpsetError::InvalidInputKind { index: 0, .. }));
        let err = normalize(&graph, vec![serde_json::json!([[1], [2, 3]]).into(), 1i32.into()]).unwrap_err();
        assert!(matches!(err, OpsetError::InvalidInputKind { index: 0, .. }));
    }

    #[test]
    fn test_json_literal_types() {
        let ints = literal_from_json(&serde_json::json!([[1, 2, 3]])).unwrap();
        assert_eq!(ints.dtype(), DType::I64);
        assert_eq!(ints.dims(), vec![1, 3]);
        assert_eq!(literal_from_json(&serde_json::json!([1, 2.5])).unwrap().dtype(), DType::F64);
        assert_eq!(literal_from_json(&serde_json::json!(true)).unwrap().dtype(), DType::BOOL);
    }
}
