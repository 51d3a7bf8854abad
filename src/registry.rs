//! Opset versions and the process-wide operator registry.
//!
//! Every [`Opset`] is a closed capability set: the operator schemas that exist
//! in exactly that version. The [`OpsetRegistry`] is assembled once through an
//! [`OpsetRegistryBuilder`], frozen, and afterwards only read.

use crate::attributes::{AttributeMap, AttributeValue};
use crate::builder::NodeBuilder;
use crate::composite::CompositeSpec;
use crate::dtype::DType;
use crate::error::OpsetError;
use crate::graph::{Graph, NodeRef, OutputDescriptor};
use crate::normalize::NodeInput;
use crate::ops;
use crate::schema::OperatorSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize, EnumIter)]
pub enum OpsetVersion {
    Opset1,
    Opset2,
    Opset3,
    Opset4,
    Opset5,
    Opset6,
}

impl OpsetVersion {
    pub fn number(&self) -> u32 {
        match self {
            OpsetVersion::Opset1 => 1,
            OpsetVersion::Opset2 => 2,
            OpsetVersion::Opset3 => 3,
            OpsetVersion::Opset4 => 4,
            OpsetVersion::Opset5 => 5,
            OpsetVersion::Opset6 => 6,
        }
    }

    pub fn from_number(number: u32) -> Option<Self> {
        Self::iter().find(|x| x.number() == number)
    }

    pub fn latest() -> Self {
        OpsetVersion::Opset6
    }
}

impl std::fmt::Display for OpsetVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "opset{}", self.number())
    }
}

/// Attaches output descriptors to a node that has passed validation.
pub type ConstructFn = fn(&ConstructionContext) -> Result<Vec<OutputDescriptor>, OpsetError>;

/// Everything a construction procedure may look at.
pub struct ConstructionContext<'a> {
    pub op_type: &'a str,
    pub version: OpsetVersion,
    pub inputs: &'a [OutputDescriptor],
    pub attributes: &'a AttributeMap,
    pub composite: Option<&'a CompositeSpec>,
}

impl ConstructionContext<'_> {
    pub fn input(&self, index: usize) -> Option<&OutputDescriptor> {
        self.inputs.get(index)
    }

    pub fn input_dtype(&self, index: usize) -> Option<DType> {
        self.input(index).and_then(|x| x.dtype)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.attribute(name).and_then(|x| x.as_int())
    }

    pub fn ints(&self, name: &str) -> Option<&[i64]> {
        self.attribute(name).and_then(|x| x.as_ints())
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(|x| x.as_str())
    }

    /// Reads an element type tag attribute, such as `"i32"`.
    pub fn dtype(&self, name: &str) -> Result<Option<DType>, OpsetError> {
        Ok(self.string(name).map(DType::from_tag).transpose()?)
    }
}

/// A versioned node factory: resolves operator names to schemas and builds
/// nodes from them.
pub trait NodeFactory {
    fn version(&self) -> OpsetVersion;

    fn lookup(&self, op_type: &str) -> Result<&'static OperatorSchema, OpsetError>;

    fn supports(&self, op_type: &str) -> bool {
        self.lookup(op_type).is_ok()
    }

    fn create(
        &self,
        graph: &mut Graph,
        op_type: &str,
        inputs: Vec<NodeInput>,
        attributes: AttributeMap,
        name: Option<&str>,
    ) -> Result<NodeRef, OpsetError> {
        NodeBuilder::new(op_type, self.version())
            .inputs(inputs)
            .attributes(attributes)
            .maybe_name(name)
            .build_in(self, graph)
    }
}

#[derive(Debug, Clone)]
pub struct Opset {
    version: OpsetVersion,
    operators: HashMap<&'static str, &'static OperatorSchema>,
}

impl Opset {
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn operator_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.operators.keys().copied().collect();
        names.sort();
        names
    }
}

impl NodeFactory for Opset {
    fn version(&self) -> OpsetVersion {
        self.version
    }

    fn lookup(&self, op_type: &str) -> Result<&'static OperatorSchema, OpsetError> {
        self.operators
            .get(op_type)
            .copied()
            .ok_or_else(|| OpsetError::UnknownOperator {
                op: op_type.to_string(),
                version: self.version,
            })
    }
}

#[derive(Default)]
pub struct OpsetRegistryBuilder {
    opsets: BTreeMap<OpsetVersion, HashMap<&'static str, &'static OperatorSchema>>,
}

impl OpsetRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, version: OpsetVersion, schema: &'static OperatorSchema) -> Result<(), OpsetError> {
        let operators = self.opsets.entry(version).or_default();
        if operators.insert(schema.op_type, schema).is_some() {
            return Err(OpsetError::DuplicateOperator {
                op: schema.op_type.to_string(),
                version,
            });
        }
        Ok(())
    }

    /// Registers each schema in every version it is available in.
    pub fn register_all(&mut self, schemas: &'static [OperatorSchema]) -> Result<(), OpsetError> {
        for schema in schemas {
            for version in OpsetVersion::iter().filter(|v| schema.available_in(*v)) {
                self.register(version, schema)?;
            }
        }
        Ok(())
    }

    pub fn freeze(mut self) -> OpsetRegistry {
        let opsets = OpsetVersion::iter()
            .map(|version| {
                let operators = self.opsets.remove(&version).unwrap_or_default();
                (version, Opset { version, operators })
            })
            .collect();
        OpsetRegistry { opsets }
    }
}

/// Read-only mapping from opset version to its operator set.
#[derive(Debug, Clone)]
pub struct OpsetRegistry {
    opsets: BTreeMap<OpsetVersion, Opset>,
}

impl OpsetRegistry {
    pub fn builder() -> OpsetRegistryBuilder {
        OpsetRegistryBuilder::new()
    }

    /// The registry holding the crate's operator catalog.
    pub fn with_default_catalog() -> Result<Self, OpsetError> {
        let mut builder = Self::builder();
        for schemas in ops::CATALOG {
            builder.register_all(schemas)?;
        }
        Ok(builder.freeze())
    }

    pub fn opset(&self, version: OpsetVersion) -> &Opset {
        // freeze() inserts every version
        &self.opsets[&version]
    }

    pub fn opsets(&self) -> impl Iterator<Item = &Opset> {
        self.opsets.values()
    }
}

static GLOBAL_REGISTRY: OnceLock<OpsetRegistry> = OnceLock::new();

fn log_installed(registry: &OpsetRegistry) {
    for opset in registry.opsets() {
        log::info!("{}: {} operators", opset.version(), opset.len());
    }
}

/// Installs `registry` as the process-wide registry. Must happen before the
/// first factory call; afterwards the registry can no longer be replaced.
pub fn install(registry: OpsetRegistry) -> Result<&'static OpsetRegistry, OpsetError> {
    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| OpsetError::RegistryAlreadyInstalled)?;
    let registry = global()?;
    log_installed(registry);
    Ok(registry)
}

/// The process-wide registry, initialised with the default catalog on first
/// use when nothing was installed.
pub fn global() -> Result<&'static OpsetRegistry, OpsetError> {
    if let Some(registry) = GLOBAL_REGISTRY.get() {
        return Ok(registry);
    }
    let registry = OpsetRegistry::with_default_catalog()?;
    let mut initialized = false;
    let registry = GLOBAL_REGISTRY.get_or_init(|| {
        initialized = true;
        registry
    });
    if initialized {
        log_installed(registry);
    }
    Ok(registry)
}
