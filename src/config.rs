use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// Scope within which synthesized node names are unique.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameScope {
    /// Names derive from the node's position in its own graph, so identical
    /// construction sequences on fresh graphs produce identical names.
    #[default]
    Graph,
    /// Names derive from a process-wide counter shared by every graph.
    Process,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub name_scope: NameScope,
    /// Accept integer attribute values where floats are declared.
    pub widen_int_attributes: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            name_scope: NameScope::Graph,
            widen_int_attributes: true,
        }
    }
}

impl GraphConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }
}
