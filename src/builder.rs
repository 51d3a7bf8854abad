//! Node construction.
//!
//! [`NodeBuilder`] is the single path by which operation nodes enter a graph:
//! name check, schema lookup, attribute validation, input normalization into a
//! staging area, descriptor validation, output construction, then one commit.
//! Any failure before the commit leaves the graph untouched.

use crate::attributes::{validate_attributes, AttributeMap, AttributeValue};
use crate::composite::CompositeSpec;
use crate::error::OpsetError;
use crate::graph::naming::validate_explicit_name;
use crate::graph::{Graph, NodeKind, NodeRef, StagedNode, Staging};
use crate::normalize::{normalize_inputs, NodeInput};
use crate::registry::{self, ConstructionContext, NodeFactory, OpsetVersion};

#[derive(Debug, Clone)]
pub struct NodeBuilder {
    op_type: String,
    version: OpsetVersion,
    inputs: Vec<NodeInput>,
    attributes: AttributeMap,
    name: Option<String>,
    composite: Option<CompositeSpec>,
}

impl NodeBuilder {
    pub fn new(op_type: impl Into<String>, version: OpsetVersion) -> Self {
        Self {
            op_type: op_type.into(),
            version,
            inputs: vec![],
            attributes: AttributeMap::new(),
            name: None,
            composite: None,
        }
    }

    pub fn input(mut self, input: impl Into<NodeInput>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn inputs<I: Into<NodeInput>>(mut self, inputs: impl IntoIterator<Item = I>) -> Self {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Sets the attribute only when a value is given, leaving the schema
    /// default in place otherwise.
    pub fn maybe_attr<V: Into<AttributeValue>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    pub fn attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn maybe_name(mut self, name: Option<&str>) -> Self {
        self.name = name.map(str::to_string);
        self
    }

    pub fn composite(mut self, composite: CompositeSpec) -> Self {
        self.composite = Some(composite);
        self
    }

    /// Builds against the process-wide registry.
    pub fn build(self, graph: &mut Graph) -> Result<NodeRef, OpsetError> {
        let opset = registry::global()?.opset(self.version);
        self.build_in(opset, graph)
    }

    pub fn build_in<F: NodeFactory + ?Sized>(self, factory: &F, graph: &mut Graph) -> Result<NodeRef, OpsetError> {
        let op = self.op_type.as_str();
        let name = self.name.as_deref().map(validate_explicit_name).transpose()?;
        let schema = factory.lookup(op)?;
        let attributes = validate_attributes(op, schema.attributes, &self.attributes, graph.config())?;

        match (schema.composite, &self.composite) {
            (Some(_), None) => {
                return Err(OpsetError::MalformedCompositeDescriptor {
                    op: op.to_string(),
                    reason: "a sub-graph body is required".to_string(),
                });
            }
            (None, Some(_)) => {
                return Err(OpsetError::MalformedCompositeDescriptor {
                    op: op.to_string(),
                    reason: "operator does not take a sub-graph body".to_string(),
                });
            }
            _ => {}
        }

        let mut staging = Staging::new(graph);
        let edges = normalize_inputs(
            op,
            factory.version(),
            schema.inputs,
            schema.max_inputs(),
            self.inputs,
            &mut staging,
        )?;
        let input_descriptors = edges
            .iter()
            .filter_map(|x| staging.output_descriptor(x).cloned())
            .collect::<Vec<_>>();

        if let (Some(kind), Some(composite)) = (schema.composite, &self.composite) {
            composite.validate(op, kind, &input_descriptors)?;
        }

        let outputs = (schema.construct)(&ConstructionContext {
            op_type: op,
            version: factory.version(),
            inputs: &input_descriptors,
            attributes: &attributes,
            composite: self.composite.as_ref(),
        })?;

        let kind = match self.composite {
            Some(composite) => NodeKind::Composite(Box::new(composite)),
            None => NodeKind::Operation,
        };
        let node = staging.stage(StagedNode {
            op_type: self.op_type.clone(),
            opset: Some(factory.version()),
            kind,
            inputs: edges,
            outputs,
            attributes,
            name,
        });
        let pending = staging.into_pending();
        graph.commit(pending);
        Ok(node)
    }
}

/// Builds a single-operand operator.
pub fn unary_node(
    version: OpsetVersion,
    graph: &mut Graph,
    op_type: &str,
    input: impl Into<NodeInput>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new(op_type, version).input(input).maybe_name(name).build(graph)
}

/// Builds a two-operand operator with an `auto_broadcast` attribute. A literal
/// operand without an explicit element type takes the element type of the
/// other operand when that one is a node output and every literal value is
/// representable in it. Otherwise the literal keeps its own element type.
pub fn binary_node(
    version: OpsetVersion,
    graph: &mut Graph,
    op_type: &str,
    lhs: impl Into<NodeInput>,
    rhs: impl Into<NodeInput>,
    auto_broadcast: Option<&str>,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    let lhs = lhs.into().resolve_value(op_type, 0)?;
    let rhs = rhs.into().resolve_value(op_type, 1)?;
    let (lhs, rhs) = promote_literals(graph, lhs, rhs);
    NodeBuilder::new(op_type, version)
        .input(lhs)
        .input(rhs)
        .maybe_attr("auto_broadcast", auto_broadcast)
        .maybe_name(name)
        .build(graph)
}

fn promote_literals(graph: &Graph, lhs: NodeInput, rhs: NodeInput) -> (NodeInput, NodeInput) {
    let dtype_of = |input: &NodeInput| match input {
        NodeInput::Output(output) => graph.output_descriptor(output).and_then(|x| x.dtype),
        _ => None,
    };
    let promote = |input: NodeInput, other: &NodeInput| match input {
        NodeInput::Literal { value, dtype: None } => {
            let value = dtype_of(other).and_then(|x| value.cast_exact(x)).unwrap_or(value);
            NodeInput::Literal { value, dtype: None }
        }
        input => input,
    };
    let new_lhs = promote(lhs, &rhs);
    let new_rhs = promote(rhs, &new_lhs);
    (new_lhs, new_rhs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::shape::Shape;

    #[test]
    fn test_binary_promotes_literal() {
        let mut graph = Graph::new();
        let x = graph.parameter(DType::F16, Shape::from(vec![2u64, 2]), None, None).unwrap();
        let add = binary_node(OpsetVersion::Opset1, &mut graph, "Add", x, 1.0f64, None, None).unwrap();

        let node = graph.node(add).unwrap();
        let constant = graph.node(node.inputs()[1].node_ref()).unwrap();
        assert_eq!(constant.constant_value().unwrap().dtype(), DType::F16);
        assert_eq!(node.attributes()["auto_broadcast"], AttributeValue::from("numpy"));
    }

    #[test]
    fn test_lossy_literal_keeps_own_type() {
        let mut graph = Graph::new();
        let x = graph.parameter(DType::I32, Shape::scalar(), None, None).unwrap();
        let whole = binary_node(OpsetVersion::Opset1, &mut graph, "Add", x, 2.0f64, None, None).unwrap();
        let fraction = binary_node(OpsetVersion::Opset1, &mut graph, "Add", x, 1.5f64, None, None).unwrap();
        let wide = binary_node(OpsetVersion::Opset1, &mut graph, "Add", 3_000_000_000i64, x, None, None).unwrap();

        let constant_of = |node: NodeRef, index: usize| {
            let node = graph.node(node).unwrap();
            graph.node(node.inputs()[index].node_ref()).unwrap().constant_value().unwrap().clone()
        };
        assert_eq!(constant_of(whole, 1).dtype(), DType::I32);
        assert_eq!(constant_of(fraction, 1).dtype(), DType::F64);
        assert_eq!(constant_of(fraction, 1).to_f64_vec(), vec![1.5]);
        assert_eq!(constant_of(wide, 0).dtype(), DType::I64);
        assert_eq!(constant_of(wide, 0).to_f64_vec(), vec![3_000_000_000.0]);
    }

    #[test]
    fn test_explicit_literal_type_is_kept() {
        let mut graph = Graph::new();
        let x = graph.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        let rhs = NodeInput::literal_as(crate::literal::LiteralTensor::scalar(2i64), DType::I32);
        let mul = binary_node(OpsetVersion::Opset1, &mut graph, "Multiply", x, rhs, Some("none"), None).unwrap();
        let node = graph.node(mul).unwrap();
        let constant = graph.node(node.inputs()[1].node_ref()).unwrap();
        assert_eq!(constant.outputs()[0].dtype, Some(DType::I32));
    }

    #[test]
    fn test_failed_build_leaves_graph_unchanged() {
        let mut graph = Graph::new();
        let x = graph.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        let err = NodeBuilder::new("Add", OpsetVersion::Opset1)
            .input(x)
            .input(3.0f32)
            .attr("auto_broadcast", "sideways")
            .build(&mut graph)
            .unwrap_err();
        assert!(matches!(err, OpsetError::InvalidEnumerationValue { .. }));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_composite_body_required() {
        let mut graph = Graph::new();
        let x = graph.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        let err = NodeBuilder::new("TensorIterator", OpsetVersion::Opset1)
            .input(x)
            .build(&mut graph)
            .unwrap_err();
        assert!(matches!(err, OpsetError::MalformedCompositeDescriptor { .. }));
    }
}
