use paste::paste;
mod opset_construction_tests;
use opset_construction_tests::attributes::*;
use opset_construction_tests::inputs::*;
use opset_construction_tests::naming::*;

use opset_graph::attributes::AttributeMap;
use opset_graph::config::{GraphConfig, NameScope};
use opset_graph::graph::Graph;
use opset_graph::opsets::{opset5, opset6};
use opset_graph::{AttributeValue, DType, NodeInput, OpsetError, OpsetVersion, Shape};

macro_rules! do_test {
    ($version:expr, $runner_name:ident, $test_name:ident) => {
        paste! {
            #[allow(non_snake_case)]
            #[test]
            fn [<$runner_name _ $test_name>]() {
                $test_name($version);
            }
        }
    };
}

macro_rules! do_tests {
    ($version:expr, $runner_name:ident) => {
        do_test!($version, $runner_name, test_literal_becomes_constant);
        do_test!($version, $runner_name, test_equal_literals_are_not_shared);
        do_test!($version, $runner_name, test_json_literal_input);
        do_test!($version, $runner_name, test_foreign_node_rejected);
        do_test!($version, $runner_name, test_failed_call_commits_no_constants);
        do_test!($version, $runner_name, test_default_is_filled);
        do_test!($version, $runner_name, test_unknown_attribute);
        do_test!($version, $runner_name, test_wrong_attribute_kind);
        do_test!($version, $runner_name, test_missing_required_attribute);
        do_test!($version, $runner_name, test_unknown_operator);
        do_test!($version, $runner_name, test_int_widening_follows_config);
        do_test!($version, $runner_name, test_identical_sequences_give_identical_graphs);
        do_test!($version, $runner_name, test_explicit_names);
    };
}

do_tests!(OpsetVersion::Opset1, opset1);
do_tests!(OpsetVersion::Opset2, opset2);
do_tests!(OpsetVersion::Opset3, opset3);
do_tests!(OpsetVersion::Opset4, opset4);
do_tests!(OpsetVersion::Opset5, opset5);
do_tests!(OpsetVersion::Opset6, opset6);

fn decoder_inputs(graph: &mut Graph) -> (opset_graph::NodeRef, opset_graph::NodeRef) {
    let data = opset6::parameter(graph, Shape::from_raw(&[2, 16, 10]).unwrap(), DType::F32, Some("data")).unwrap();
    let lengths = opset6::parameter(graph, Shape::from_raw(&[2]).unwrap(), DType::I32, Some("lengths")).unwrap();
    (data, lengths)
}

#[test]
fn test_literal_operand_value_is_preserved() {
    let mut graph = Graph::new();
    let x = opset6::parameter(&mut graph, Shape::from_raw(&[4]).unwrap(), DType::I32, None).unwrap();
    for (literal, dtype, expected) in [
        (NodeInput::from(7i64), DType::I32, 7.0),
        (NodeInput::from(1.5f64), DType::F64, 1.5),
        (NodeInput::from(3_000_000_000i64), DType::I64, 3_000_000_000.0),
    ] {
        let add = opset6::add(&mut graph, x, literal, None, None).unwrap();
        let constant = graph.node(graph.node(add).unwrap().inputs()[1].node_ref()).unwrap();
        let value = constant.constant_value().unwrap();
        assert_eq!(value.dtype(), dtype);
        assert_eq!(value.to_f64_vec(), vec![expected]);
    }
}

#[test]
fn test_gather_elements_default_axis() {
    let mut graph = Graph::new();
    let data = opset6::parameter(&mut graph, Shape::from_raw(&[3, 4]).unwrap(), DType::F32, None).unwrap();
    let indices = opset6::parameter(&mut graph, Shape::from_raw(&[3, 4]).unwrap(), DType::I64, None).unwrap();
    let node = opset6::gather_elements(&mut graph, data, indices, None, None).unwrap();

    let node = graph.node(node).unwrap();
    assert_eq!(node.op_type(), "GatherElements");
    assert_eq!(node.inputs(), &[data.output(0), indices.output(0)]);
    let expected: AttributeMap = [("axis".to_string(), AttributeValue::Int(0))].into_iter().collect();
    assert_eq!(node.attributes(), &expected);
}

#[test]
fn test_ctc_greedy_decoder_seq_len_defaults() {
    let mut graph = Graph::new();
    let (data, lengths) = decoder_inputs(&mut graph);
    let node = opset6::ctc_greedy_decoder_seq_len(&mut graph, data, lengths, NodeInput::Absent, None, None, None, None)
        .unwrap();

    let node = graph.node(node).unwrap();
    assert_eq!(node.inputs(), &[data.output(0), lengths.output(0)]);
    let expected: AttributeMap = [
        ("merge_repeated".to_string(), AttributeValue::Bool(true)),
        ("classes_index_type".to_string(), AttributeValue::from("i32")),
        ("sequence_length_type".to_string(), AttributeValue::from("i32")),
    ]
    .into_iter()
    .collect();
    assert_eq!(node.attributes(), &expected);
    assert_eq!(node.outputs().len(), 2);
    assert_eq!(node.outputs()[0].dtype, Some(DType::I32));
}

#[test]
fn test_ctc_greedy_decoder_seq_len_blank_index() {
    let mut graph = Graph::new();
    let (data, lengths) = decoder_inputs(&mut graph);
    let node = opset6::ctc_greedy_decoder_seq_len(&mut graph, data, lengths, 9i32, Some(false), None, None, None)
        .unwrap();
    let node = graph.node(node).unwrap();
    assert_eq!(node.inputs().len(), 3);
    assert_eq!(node.attributes()["merge_repeated"], AttributeValue::Bool(false));
}

#[test]
fn test_string_for_boolean_attribute() {
    let mut graph = Graph::new();
    let (data, lengths) = decoder_inputs(&mut graph);
    let attributes: AttributeMap = [("merge_repeated".to_string(), AttributeValue::from("true"))]
        .into_iter()
        .collect();
    let before = graph.len();
    let err = opset6::create(&mut graph, "CTCGreedyDecoderSeqLen", vec![data.into(), lengths.into()], attributes, None)
        .unwrap_err();
    assert!(matches!(err, OpsetError::AttributeTypeMismatch { .. }));
    assert_eq!(graph.len(), before);
}

#[test]
fn test_operator_missing_from_older_opset() {
    let mut graph = Graph::new();
    let data = opset5::parameter(&mut graph, Shape::from_raw(&[3, 4]).unwrap(), DType::F32, None).unwrap();
    let err = opset5::create(&mut graph, "GatherElements", vec![data.into(), data.into()], AttributeMap::new(), None)
        .unwrap_err();
    assert!(matches!(
        err,
        OpsetError::UnknownOperator {
            version: OpsetVersion::Opset5,
            ..
        }
    ));
    assert_eq!(graph.len(), 1);
}

#[test]
fn test_process_scoped_names() {
    let config = GraphConfig {
        name_scope: NameScope::Process,
        ..GraphConfig::default()
    };
    let mut a = Graph::with_config(config.clone());
    let mut b = Graph::with_config(config);
    let x = opset6::parameter(&mut a, Shape::scalar(), DType::F32, None).unwrap();
    let y = opset6::parameter(&mut b, Shape::scalar(), DType::F32, None).unwrap();
    assert_ne!(a.node(x).unwrap().name(), b.node(y).unwrap().name());
}

#[test]
fn test_concurrent_construction() {
    let names = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let mut graph = Graph::new();
                    let (data, lengths) = decoder_inputs(&mut graph);
                    let probs = opset6::softmax(&mut graph, data, Some(2), None).unwrap();
                    opset6::ctc_greedy_decoder_seq_len(
                        &mut graph,
                        probs,
                        lengths,
                        NodeInput::Absent,
                        None,
                        None,
                        None,
                        None,
                    )
                    .unwrap();
                    graph.nodes().map(|x| x.name().to_string()).collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|x| x.join().unwrap()).collect::<Vec<_>>()
    });
    assert!(names.windows(2).all(|x| x[0] == x[1]));
    assert_eq!(names[0].last().map(String::as_str), Some("CTCGreedyDecoderSeqLen_3"));
}
