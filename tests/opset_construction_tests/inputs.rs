use crate::opset_construction_tests::float_parameter;
use opset_graph::graph::{Graph, NodeKind};
use opset_graph::ops::{data_movement, elementwise};
use opset_graph::{DType, LiteralTensor, NodeInput, OpsetError, OpsetVersion};

pub fn test_literal_becomes_constant(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[3]);
    let add = elementwise::add(version, &mut graph, x, vec![0.5f32, -1.0, 2.25], None, None).unwrap();

    let node = graph.node(add).unwrap();
    assert_eq!(node.inputs()[0], x.output(0));
    let constant = graph.node(node.inputs()[1].node_ref()).unwrap();
    assert!(matches!(constant.kind(), NodeKind::Constant(_)));
    assert!(constant.inputs().is_empty());
    assert_eq!(
        constant.constant_value(),
        Some(&LiteralTensor::from(vec![0.5f32, -1.0, 2.25]))
    );
}

pub fn test_equal_literals_are_not_shared(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[1]);
    let a = elementwise::multiply(version, &mut graph, x, 2.0f32, None, None).unwrap();
    let b = elementwise::multiply(version, &mut graph, x, 2.0f32, None, None).unwrap();

    let a_const = graph.node(a).unwrap().inputs()[1];
    let b_const = graph.node(b).unwrap().inputs()[1];
    assert_ne!(a_const, b_const);
    assert_eq!(graph.len(), 5);
}

pub fn test_json_literal_input(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[2, 2]);
    let sub = elementwise::subtract(version, &mut graph, x, serde_json::json!([[1, 2], [3, 4]]), None, None).unwrap();
    let constant = graph.node(graph.node(sub).unwrap().inputs()[1].node_ref()).unwrap();
    let value = constant.constant_value().unwrap();
    // promoted to the element type of the other operand
    assert_eq!(value.dtype(), DType::F32);
    assert_eq!(value.dims(), vec![2, 2]);
    assert_eq!(value.to_f64_vec(), vec![1.0, 2.0, 3.0, 4.0]);

    let before = graph.len();
    let err = elementwise::subtract(version, &mut graph, x, serde_json::json!({"a": 1}), None, None).unwrap_err();
    assert!(matches!(err, OpsetError::InvalidInputKind { index: 1, .. }));
    assert_eq!(graph.len(), before);
}

pub fn test_foreign_node_rejected(version: OpsetVersion) {
    let mut other = Graph::new();
    let foreign = float_parameter(version, &mut other, &[1]);
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[1]);
    let err = elementwise::add(version, &mut graph, x, foreign, None, None).unwrap_err();
    assert!(matches!(err, OpsetError::InvalidInputKind { index: 1, .. }));
    assert_eq!(graph.len(), 1);
}

pub fn test_failed_call_commits_no_constants(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[4]);
    // k is a literal, mode is invalid
    let err = opset_graph::ops::sequence::top_k(version, &mut graph, x, 2i64, 0, "largest", "value", None).unwrap_err();
    assert!(matches!(err, OpsetError::InvalidEnumerationValue { .. }));
    assert_eq!(graph.len(), 1);

    let err = data_movement::reshape(version, &mut graph, x, NodeInput::Absent, false, None).unwrap_err();
    assert!(matches!(err, OpsetError::MissingRequiredInput { input: "shape", .. }));
    assert_eq!(graph.len(), 1);
}
