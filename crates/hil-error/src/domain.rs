use hil_core::NodeId;

/// Structured, non-fatal failures collected by the driver at step
/// boundaries (`spec.md §7`): resolver failures after fixed point,
/// coercion/type mismatches, and import-search misses that don't amount to
/// a cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("module not found in any search directory: {0}")]
    ImportNotFound(String),

    #[error("unresolved name: {0}")]
    UnresolvedName(String),

    #[error("unresolved operator for node {0}")]
    UnresolvedOperator(NodeId),

    #[error("ambiguous operator for node {node}: candidates {candidates:?}")]
    AmbiguousOperator {
        node: NodeId,
        candidates: Vec<String>,
    },

    #[error("cannot coerce {from} to {to}")]
    CoercionFailure { from: String, to: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("node {0} not found in the graph")]
    NotFound(NodeId),
}
