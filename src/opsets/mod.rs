//! Per-version factory surfaces.
//!
//! Selecting a module such as [`opset6`] selects a closed set of operator
//! factories bound to that version. A factory never falls back to another
//! version: an operator missing from the selected opset is an
//! [`crate::error::OpsetError::UnknownOperator`].

macro_rules! opset_module {
    ($version:expr; $(fn $name:ident($($arg:ident: $ty:ty),* $(,)?) => $family:ident::$target:ident;)*) => {
        #[allow(unused_imports)]
        use crate::{
            attributes::AttributeMap,
            composite::CompositeSpec,
            dtype::DType,
            error::OpsetError,
            graph::{Graph, NodeRef},
            literal::LiteralTensor,
            normalize::NodeInput,
            ops::convolution::ConvolutionAttributes,
            registry::{NodeFactory, Opset, OpsetVersion},
            shape::Shape,
        };

        pub const VERSION: OpsetVersion = $version;

        /// The operator set of this version in the process-wide registry.
        pub fn opset() -> Result<&'static Opset, OpsetError> {
            Ok(crate::registry::global()?.opset(VERSION))
        }

        /// Generic entry point: builds `op_type` from raw inputs and attributes.
        pub fn create(
            graph: &mut Graph,
            op_type: &str,
            inputs: Vec<NodeInput>,
            attributes: AttributeMap,
            name: Option<&str>,
        ) -> Result<NodeRef, OpsetError> {
            opset()?.create(graph, op_type, inputs, attributes, name)
        }

        $(
            #[allow(clippy::too_many_arguments)]
            pub fn $name(graph: &mut Graph, $($arg: $ty,)* name: Option<&str>) -> Result<NodeRef, OpsetError> {
                crate::ops::$family::$target(VERSION, graph, $($arg,)* name)
            }
        )*
    };
}

pub mod opset1;
pub mod opset2;
pub mod opset3;
pub mod opset4;
pub mod opset5;
pub mod opset6;
