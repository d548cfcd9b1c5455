use hil_core::NodeId;

/// Errors that abort the pipeline immediately, with no attempt to collect
/// further diagnostics (`spec.md §7`: "InvariantViolation aborts
/// immediately"; "ResolverDiverged: iteration cap exceeded").
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FatalError {
    #[error("parse error in {file}:{line}: {message}")]
    Parse {
        file: String,
        line: u32,
        message: String,
    },

    #[error("duplicate module registered for UID {0}")]
    DuplicateModule(String),

    #[error("resolver failed to reach a fixed point after {iterations} iterations")]
    ResolverDiverged { iterations: u32 },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("import cycle detected while eagerly importing: {0:?}")]
    ImportCycle(Vec<String>),
}

impl FatalError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        FatalError::InvariantViolation(msg.into())
    }

    /// Convenience constructor for the two-parents / dangling-weak-ref class
    /// of bugs named in `spec.md §8` invariant 1.
    pub fn two_parents(node: NodeId) -> Self {
        FatalError::InvariantViolation(format!("node {node} has more than one parent"))
    }
}
