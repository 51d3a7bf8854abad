use crate::opset_construction_tests::{float_parameter, topology};
use opset_graph::graph::Graph;
use opset_graph::ops::{data_movement, elementwise};
use opset_graph::{OpsetError, OpsetVersion};

fn build_block(version: OpsetVersion, graph: &mut Graph) {
    let x = float_parameter(version, graph, &[4, 8]);
    let scaled = elementwise::multiply(version, graph, x, 0.125f32, None, None).unwrap();
    let activated = elementwise::relu(version, graph, scaled, None).unwrap();
    let joined = data_movement::concat(version, graph, [activated, x], 1, None).unwrap();
    data_movement::softmax(version, graph, joined, None, None).unwrap();
}

pub fn test_identical_sequences_give_identical_graphs(version: OpsetVersion) {
    let mut a = Graph::new();
    let mut b = Graph::new();
    build_block(version, &mut a);
    build_block(version, &mut b);

    assert_eq!(topology(&a), topology(&b));
    for (x, y) in a.nodes().zip(b.nodes()) {
        assert_eq!(x.name(), y.name());
        assert_eq!(x.attributes(), y.attributes());
        assert_eq!(x.outputs(), y.outputs());
    }
    let names: Vec<_> = a.nodes().map(|x| x.name().to_string()).collect();
    assert_eq!(
        names,
        ["Parameter_0", "Constant_1", "Multiply_2", "Relu_3", "Concat_4", "Softmax_5"]
    );
}

pub fn test_explicit_names(version: OpsetVersion) {
    let mut graph = Graph::new();
    let x = float_parameter(version, &mut graph, &[2]);
    let relu = elementwise::relu(version, &mut graph, x, Some("act")).unwrap();
    let node = graph.node(relu).unwrap();
    assert_eq!(node.name(), "act");
    assert!(node.has_explicit_name());
    assert_eq!(graph.find_by_name("act"), Some(relu));

    let err = elementwise::relu(version, &mut graph, x, Some("")).unwrap_err();
    assert!(matches!(err, OpsetError::InvalidName(_)));
    assert_eq!(graph.len(), 2);
}
