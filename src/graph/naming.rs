use crate::config::NameScope;
use crate::error::OpsetError;
use std::sync::atomic::{AtomicUsize, Ordering};

static PROCESS_NAME_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Explicit names are attached verbatim; they only need to be non-blank.
/// Uniqueness across a graph is left to the consuming engine.
pub fn validate_explicit_name(name: &str) -> Result<String, OpsetError> {
    if name.trim().is_empty() {
        return Err(OpsetError::InvalidName(name.to_string()));
    }
    Ok(name.to_string())
}

/// Name for a node the caller left unnamed. `position` is the node's index in
/// its graph arena.
pub(crate) fn synthesize_name(op_type: &str, position: usize, scope: NameScope) -> String {
    let counter = match scope {
        NameScope::Graph => position,
        NameScope::Process => PROCESS_NAME_COUNTER.fetch_add(1, Ordering::Relaxed),
    };
    format!("{}_{}", op_type, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_scope_is_positional() {
        assert_eq!(synthesize_name("Add", 3, NameScope::Graph), "Add_3");
        assert_eq!(synthesize_name("Add", 3, NameScope::Graph), "Add_3");
    }

    #[test]
    fn test_process_scope_never_repeats() {
        let a = synthesize_name("Relu", 0, NameScope::Process);
        let b = synthesize_name("Relu", 0, NameScope::Process);
        assert_ne!(a, b);
    }

    #[test]
    fn test_explicit_names() {
        assert_eq!(validate_explicit_name("conv1").unwrap(), "conv1");
        assert!(validate_explicit_name("").is_err());
    }
}
