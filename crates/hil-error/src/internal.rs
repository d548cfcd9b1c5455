/// Errors indicating a bug in the compiler itself rather than in the input
/// program (distinct from [`crate::FatalError::InvariantViolation`] in that
/// these are recoverable enough to report through the normal error-set
/// instead of aborting — e.g. a plugin hook that returned inconsistent
/// data).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InternalError {
    #[error("compiler error: {0}")]
    CompilerError(String),

    #[error("not yet implemented: {0}")]
    NotImplemented(String),
}
