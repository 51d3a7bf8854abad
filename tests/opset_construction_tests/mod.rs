pub mod attributes;
pub mod inputs;
pub mod naming;

use opset_graph::graph::{Graph, NodeRef};
use opset_graph::ops::constant;
use opset_graph::{DType, OpsetVersion, Shape};

pub fn float_parameter(version: OpsetVersion, graph: &mut Graph, dims: &[i64]) -> NodeRef {
    constant::parameter(version, graph, Shape::from_raw(dims).unwrap(), DType::F32, None).unwrap()
}

/// Edge topology of a graph as `(op_type, [(input node index, output index)])`.
pub fn topology(graph: &Graph) -> Vec<(String, Vec<(usize, usize)>)> {
    graph
        .nodes()
        .map(|node| {
            let edges = node.inputs().iter().map(|x| (x.node.index(), x.index)).collect();
            (node.op_type().to_string(), edges)
        })
        .collect()
}
