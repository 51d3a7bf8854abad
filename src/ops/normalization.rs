use crate::attributes::AttributeKind;
use crate::builder::NodeBuilder;
use crate::error::OpsetError;
use crate::graph::{Graph, NodeRef};
use crate::normalize::NodeInput;
use crate::ops::same_as_input;
use crate::registry::OpsetVersion;
use crate::schema::{AttributeSpec, Constraint, DefaultValue, InputRole, OperatorSchema};

const MVN_INPUTS: &[InputRole] = &[InputRole::required("data")];
const MVN_ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec::new("across_channels", AttributeKind::Bool).with_default(DefaultValue::Bool(false)),
    AttributeSpec::new("normalize_variance", AttributeKind::Bool).with_default(DefaultValue::Bool(true)),
    AttributeSpec::new("eps", AttributeKind::Float).constraint(Constraint::Positive),
];
const MVN_AXES_INPUTS: &[InputRole] = &[InputRole::required("data"), InputRole::required("axes")];
const MVN_AXES_ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec::new("normalize_variance", AttributeKind::Bool),
    AttributeSpec::new("eps", AttributeKind::Float).constraint(Constraint::Positive),
    AttributeSpec::new("eps_mode", AttributeKind::String).allowed(&["inside_sqrt", "outside_sqrt"]),
];

pub(crate) const SCHEMAS: &[OperatorSchema] = &[
    OperatorSchema::new("MVN", OpsetVersion::Opset2, same_as_input)
        .inputs(MVN_INPUTS)
        .attributes(MVN_ATTRIBUTES)
        .until(OpsetVersion::Opset6),
    OperatorSchema::new("MVN", OpsetVersion::Opset6, same_as_input)
        .inputs(MVN_AXES_INPUTS)
        .attributes(MVN_AXES_ATTRIBUTES),
];

/// Mean-variance normalization over all dims after the batch dim, optionally
/// excluding channels.
pub fn mvn(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    across_channels: Option<bool>,
    normalize_variance: Option<bool>,
    eps: f64,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("MVN", version)
        .input(data)
        .maybe_attr("across_channels", across_channels)
        .maybe_attr("normalize_variance", normalize_variance)
        .attr("eps", eps)
        .maybe_name(name)
        .build(graph)
}

/// Mean-variance normalization over the axes given as the second input.
#[allow(clippy::too_many_arguments)]
pub fn mvn_axes(
    version: OpsetVersion,
    graph: &mut Graph,
    data: impl Into<NodeInput>,
    axes: impl Into<NodeInput>,
    normalize_variance: bool,
    eps: f64,
    eps_mode: &str,
    name: Option<&str>,
) -> Result<NodeRef, OpsetError> {
    NodeBuilder::new("MVN", version)
        .input(data)
        .input(axes)
        .attr("normalize_variance", normalize_variance)
        .attr("eps", eps)
        .attr("eps_mode", eps_mode)
        .maybe_name(name)
        .build(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::shape::Shape;

    #[test]
    fn test_mvn_schema_changes_in_opset6() {
        let mut graph = Graph::new();
        let x = graph.parameter(DType::F32, Shape::from_raw(&[1, 3, 8]).unwrap(), None, None).unwrap();

        let v2 = mvn(OpsetVersion::Opset2, &mut graph, x, None, None, 1e-9, None).unwrap();
        let attrs = graph.node(v2).unwrap().attributes();
        assert_eq!(attrs["across_channels"].as_bool(), Some(false));
        assert_eq!(attrs["normalize_variance"].as_bool(), Some(true));

        let err = mvn(OpsetVersion::Opset6, &mut graph, x, Some(true), None, 1e-9, None).unwrap_err();
        assert!(matches!(err, OpsetError::UnknownAttribute { .. }));

        let v6 = mvn_axes(OpsetVersion::Opset6, &mut graph, x, vec![2i64], true, 1e-9, "inside_sqrt", None).unwrap();
        assert_eq!(graph.node(v6).unwrap().inputs().len(), 2);
    }

    #[test]
    fn test_mvn_eps_positive() {
        let mut graph = Graph::new();
        let x = graph.parameter(DType::F32, Shape::scalar(), None, None).unwrap();
        let err = mvn(OpsetVersion::Opset2, &mut graph, x, None, None, 0.0, None).unwrap_err();
        assert!(matches!(err, OpsetError::AttributeConstraintViolation { .. }));
    }
}
