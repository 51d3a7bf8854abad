use crate::opset_construction_tests::float_parameter;
use opset_graph::config::GraphConfig;
use opset_graph::graph::Graph;
use opset_graph::ops::data_movement;
use opset_graph::registry::{self, NodeFactory};
use opset_graph::{AttributeKind, AttributeMap, AttributeValue, NodeInput, OpsetError, OpsetVersion};

fn create(
    version: OpsetVersion,
    graph: &mut Graph,
    op_type: &str,
    inputs: Vec<NodeInput>,
    attributes: &[(&str, AttributeValue)],
) -> Result<opset_graph::NodeRef, OpsetError> {
    let attributes: AttributeMap = attributes.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    registry::global()
        .unwrap()
        .opset(version)
        .create(graph, op_type, inputs, attributes, None)
}

pub fn test_default_is_filled(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[2, 5]);
    let softmax = data_movement::softmax(version, &mut graph, x, None, None).unwrap();
    let attrs = graph.node(softmax).unwrap().attributes();
    assert_eq!(attrs.len(), 1);
    assert_eq!(attrs["axis"], AttributeValue::Int(1));
}

pub fn test_unknown_attribute(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[2]);
    let err = create(version, &mut graph, "Relu", vec![x.into()], &[("alpha", AttributeValue::Float(0.1))]).unwrap_err();
    assert!(matches!(err, OpsetError::UnknownAttribute { ref attribute, .. } if attribute == "alpha"));
    assert_eq!(graph.len(), 1);
}

pub fn test_wrong_attribute_kind(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[2, 3]);
    let err = create(
        version,
        &mut graph,
        "Reshape",
        vec![x.into(), vec![3i64, 2].into()],
        &[("special_zero", AttributeValue::from("yes"))],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        OpsetError::AttributeTypeMismatch {
            expected: AttributeKind::Bool,
            actual: AttributeKind::String,
            ..
        }
    ));
    assert_eq!(graph.len(), 1);
}

pub fn test_missing_required_attribute(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[2]);
    let err = create(version, &mut graph, "Concat", vec![x.into(), x.into()], &[]).unwrap_err();
    assert!(matches!(err, OpsetError::MissingRequiredAttribute { ref attribute, .. } if attribute == "axis"));
    assert_eq!(graph.len(), 1);
}

pub fn test_unknown_operator(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[2]);
    let err = create(version, &mut graph, "Softsign", vec![x.into()], &[]).unwrap_err();
    assert!(matches!(err, OpsetError::UnknownOperator { version: v, .. } if v == version));
    assert_eq!(graph.len(), 1);
}

pub fn test_int_widening_follows_config(version: OpsetVersion) {
    let attributes = [
        ("strides", AttributeValue::from(vec![1i64, 1])),
        ("pads_begin", AttributeValue::from(vec![0i64, 0])),
        ("pads_end", AttributeValue::from(vec![0i64, 0])),
        ("dilations", AttributeValue::from(vec![1i64, 1])),
        ("mode", AttributeValue::from("xnor-popcount")),
        ("pad_value", AttributeValue::Int(0)),
    ];

    let mut graph = Graph::new();
    let data = float_parameter(version, &mut graph, &[1, 1, 4, 4]);
    let filters = float_parameter(version, &mut graph, &[2, 1, 3, 3]);
    let conv = create(version, &mut graph, "BinaryConvolution", vec![data.into(), filters.into()], &attributes).unwrap();
    assert_eq!(graph.node(conv).unwrap().attributes()["pad_value"], AttributeValue::Float(0.0));

    let config = GraphConfig {
        widen_int_attributes: false,
        ..GraphConfig::default()
    };
    let mut graph = Graph::with_config(config);
    let data = float_parameter(version, &mut graph, &[1, 1, 4, 4]);
    let filters = float_parameter(version, &mut graph, &[2, 1, 3, 3]);
    let err = create(version, &mut graph, "BinaryConvolution", vec![data.into(), filters.into()], &attributes)
        .unwrap_err();
    assert!(matches!(err, OpsetError::AttributeTypeMismatch { .. }));
}
