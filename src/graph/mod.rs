//! The graph arena and its nodes.
//!
//! A [`Graph`] owns its nodes in construction order. Nodes are only ever
//! appended, and an edge can only point at a node that already exists in the
//! same arena, so every graph is a DAG by construction.

pub mod naming;

use crate::attributes::AttributeMap;
use crate::composite::CompositeSpec;
use crate::config::GraphConfig;
use crate::dtype::DType;
use crate::error::OpsetError;
use crate::literal::LiteralTensor;
use crate::registry::OpsetVersion;
use crate::shape::Shape;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize)]
pub struct GraphId(usize);

#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Handle to a node in a specific graph. Handles come only from the graph that
/// owns the node, so they serialize but do not deserialize:
///
/// ```compile_fail
/// let forged: opset_graph::NodeRef = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize)]
pub struct NodeRef {
    pub graph: GraphId,
    pub node: NodeId,
}

impl NodeRef {
    pub fn output(&self, index: usize) -> OutputRef {
        OutputRef {
            graph: self.graph,
            node: self.node,
            index,
        }
    }
}

/// An input edge: one output of one node.
#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize)]
pub struct OutputRef {
    pub graph: GraphId,
    pub node: NodeId,
    pub index: usize,
}

impl OutputRef {
    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            graph: self.graph,
            node: self.node,
        }
    }
}

/// Element type and shape of a node output. `dtype` is `None` until the
/// downstream engine resolves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    pub dtype: Option<DType>,
    pub shape: Shape,
}

impl OutputDescriptor {
    pub fn new(dtype: DType, shape: Shape) -> Self {
        Self {
            dtype: Some(dtype),
            shape,
        }
    }

    pub fn unresolved() -> Self {
        Self {
            dtype: None,
            shape: Shape::DynamicRank,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum NodeKind {
    Operation,
    /// An operation carrying a sub-graph body and its iteration descriptors.
    Composite(Box<CompositeSpec>),
    Constant(LiteralTensor),
    Parameter,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    id: NodeId,
    op_type: String,
    opset: Option<OpsetVersion>,
    kind: NodeKind,
    inputs: Vec<OutputRef>,
    outputs: Vec<OutputDescriptor>,
    attributes: AttributeMap,
    name: String,
    explicit_name: bool,
}

impl GraphNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn op_type(&self) -> &str {
        &self.op_type
    }

    pub fn opset(&self) -> Option<OpsetVersion> {
        self.opset
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[OutputRef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputDescriptor] {
        &self.outputs
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the caller chose the name, as opposed to it being synthesized.
    pub fn has_explicit_name(&self) -> bool {
        self.explicit_name
    }

    pub fn constant_value(&self) -> Option<&LiteralTensor> {
        if let NodeKind::Constant(x) = &self.kind {
            Some(x)
        } else {
            None
        }
    }

    pub fn composite(&self) -> Option<&CompositeSpec> {
        if let NodeKind::Composite(x) = &self.kind {
            Some(x)
        } else {
            None
        }
    }
}

/// A node that has passed validation but is not yet part of the graph.
#[derive(Debug, Clone)]
pub(crate) struct StagedNode {
    pub op_type: String,
    pub opset: Option<OpsetVersion>,
    pub kind: NodeKind,
    pub inputs: Vec<OutputRef>,
    pub outputs: Vec<OutputDescriptor>,
    pub attributes: AttributeMap,
    pub name: Option<String>,
}

/// Nodes prepared for one construction call. The graph is borrowed for the
/// whole staging phase, so the ids handed out here stay valid until commit.
pub(crate) struct Staging<'g> {
    graph: &'g Graph,
    pending: Vec<StagedNode>,
}

impl<'g> Staging<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            pending: Vec::new(),
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn stage(&mut self, node: StagedNode) -> NodeRef {
        let node_ref = NodeRef {
            graph: self.graph.id,
            node: NodeId(self.graph.nodes.len() + self.pending.len()),
        };
        self.pending.push(node);
        node_ref
    }

    pub fn output_descriptor(&self, output: &OutputRef) -> Option<&OutputDescriptor> {
        if output.graph != self.graph.id {
            return None;
        }
        let base = self.graph.nodes.len();
        if output.node.0 < base {
            self.graph.output_descriptor(output)
        } else {
            self.pending
                .get(output.node.0 - base)?
                .outputs
                .get(output.index)
        }
    }

    pub fn into_pending(self) -> Vec<StagedNode> {
        self.pending
    }
}

#[derive(Debug, Serialize)]
pub struct Graph {
    id: GraphId,
    config: GraphConfig,
    nodes: Vec<GraphNode>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            id: GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed)),
            config,
            nodes: Vec::new(),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in construction order, which is also a topological order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    pub fn node(&self, node: NodeRef) -> Option<&GraphNode> {
        if node.graph != self.id {
            return None;
        }
        self.nodes.get(node.node.0)
    }

    pub fn output_descriptor(&self, output: &OutputRef) -> Option<&OutputDescriptor> {
        self.node(output.node_ref())?.outputs.get(output.index)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeRef> {
        self.nodes.iter().find(|x| x.name == name).map(|x| NodeRef {
            graph: self.id,
            node: x.id,
        })
    }

    pub fn parameters(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.nodes
            .iter()
            .filter(|x| matches!(x.kind, NodeKind::Parameter))
            .map(|x| NodeRef {
                graph: self.id,
                node: x.id,
            })
    }

    /// Declares an external input of the graph.
    pub fn parameter(
        &mut self,
        dtype: DType,
        shape: Shape,
        opset: Option<OpsetVersion>,
        name: Option<&str>,
    ) -> Result<NodeRef, OpsetError> {
        let name = name.map(naming::validate_explicit_name).transpose()?;
        let staged = StagedNode {
            op_type: "Parameter".to_string(),
            opset,
            kind: NodeKind::Parameter,
            inputs: vec![],
            outputs: vec![OutputDescriptor::new(dtype, shape)],
            attributes: AttributeMap::new(),
            name,
        };
        Ok(self.commit(vec![staged])[0])
    }

    /// Embeds a literal as a constant node, cast to `dtype` when one is given.
    pub fn constant(
        &mut self,
        value: LiteralTensor,
        dtype: Option<DType>,
        opset: Option<OpsetVersion>,
        name: Option<&str>,
    ) -> Result<NodeRef, OpsetError> {
        let name = name.map(naming::validate_explicit_name).transpose()?;
        let staged = constant_node(value, dtype, opset, name);
        Ok(self.commit(vec![staged])[0])
    }

    /// Appends staged nodes in order, assigning their final names.
    pub(crate) fn commit(&mut self, staged: Vec<StagedNode>) -> Vec<NodeRef> {
        let mut refs = Vec::with_capacity(staged.len());
        for node in staged {
            let id = NodeId(self.nodes.len());
            let explicit_name = node.name.is_some();
            let name = match node.name {
                Some(name) => name,
                None => naming::synthesize_name(&node.op_type, id.0, self.config.name_scope),
            };
            log::debug!(
                "graph {:?}: node {} {} ({}) with {} inputs",
                self.id,
                id.0,
                node.op_type,
                node.opset.map(|x| x.to_string()).unwrap_or_else(|| "no opset".to_string()),
                node.inputs.len()
            );
            self.nodes.push(GraphNode {
                id,
                op_type: node.op_type,
                opset: node.opset,
                kind: node.kind,
                inputs: node.inputs,
                outputs: node.outputs,
                attributes: node.attributes,
                name,
                explicit_name,
            });
            refs.push(NodeRef { graph: self.id, node: id });
        }
        refs
    }
}

pub(crate) fn constant_node(
    value: LiteralTensor,
    dtype: Option<DType>,
    opset: Option<OpsetVersion>,
    name: Option<String>,
) -> StagedNode {
    let value = match dtype {
        Some(dtype) => value.cast(dtype),
        None => value,
    };
    StagedNode {
        op_type: "Constant".to_string(),
        opset,
        outputs: vec![OutputDescriptor::new(value.dtype(), value.shape())],
        kind: NodeKind::Constant(value),
        inputs: vec![],
        attributes: AttributeMap::new(),
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_and_constant() {
        let mut graph = Graph::new();
        let p = graph
            .parameter(DType::F32, Shape::from_raw(&[1, -1]).unwrap(), None, Some("x"))
            .unwrap();
        let c = graph.constant(LiteralTensor::from(vec![1i32, 2]), Some(DType::I64), None, None).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.find_by_name("x"), Some(p));
        let c_node = graph.node(c).unwrap();
        assert_eq!(c_node.name(), "Constant_1");
        assert!(!c_node.has_explicit_name());
        assert_eq!(c_node.constant_value().unwrap().dtype(), DType::I64);
        assert_eq!(c_node.outputs()[0], OutputDescriptor::new(DType::I64, Shape::from(vec![2])));
        assert_eq!(graph.parameters().collect::<Vec<_>>(), vec![p]);
    }

    #[test]
    fn test_refs_are_scoped_to_their_graph() {
        let mut a = Graph::new();
        let b = Graph::new();
        let p = a.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.node(p).is_some());
        assert!(b.node(p).is_none());
        assert!(b.output_descriptor(&p.output(0)).is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut graph = Graph::new();
        let err = graph.parameter(DType::F32, Shape::scalar(), None, Some("  ")).unwrap_err();
        assert!(matches!(err, OpsetError::InvalidName(_)));
        assert!(graph.is_empty());
    }
}
