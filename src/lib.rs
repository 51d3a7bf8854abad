pub mod attributes;
pub mod builder;
pub mod composite;
pub mod config;
pub mod dtype;
pub mod error;
pub mod graph;
pub mod literal;
pub mod normalize;
pub mod ops;
pub mod opsets;
pub mod registry;
pub mod schema;
pub mod shape;

pub use attributes::{AttributeKind, AttributeMap, AttributeValue};
pub use builder::NodeBuilder;
pub use config::GraphConfig;
pub use dtype::DType;
pub use error::OpsetError;
pub use graph::{Graph, NodeRef, OutputRef};
pub use literal::LiteralTensor;
pub use normalize::NodeInput;
pub use registry::{NodeFactory, OpsetVersion};
pub use shape::{Dimension, Shape};
