//! Error types specific to `hil-ast`.
//!
//! One crate-local `thiserror`-derived enum that wraps the lower-level
//! failure modes, with `From` conversions both inward (from `hil_core`) and
//! outward (into `hil_error::Error` at the crate boundary).

use hil_core::NodeId;
use thiserror::Error;

use crate::module::ModuleUid;

/// The primary error type for `hil-ast`'s node substrate, module registry,
/// and pipeline driver (`spec.md §7`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AstError {
    #[error("multiple errors occurred:\n{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<AstError>),

    #[error("node {0} not found in this AST context")]
    NotFound(NodeId),

    #[error("duplicate module registered for UID {0:?}")]
    DuplicateModule(ModuleUid),

    #[error("module not found in any search directory: {0}")]
    ImportFailure(String),

    /// `spec.md §7` reserves this for a cycle "detected during eager
    /// inclusion" — a textual-inclusion mechanism this on-demand-import core
    /// doesn't model. Mutual/circular imports through
    /// [`crate::module::ModuleRegistry::import_module`] are not an error
    /// (`spec.md §1`, "honoring circular imports"); nothing in this crate
    /// constructs this variant today.
    #[error("import cycle detected: {0:?}")]
    ImportCycle(Vec<String>),

    #[error("unresolved name: {0}")]
    UnresolvedName(String),

    #[error("unresolved operator at node {0}")]
    UnresolvedOperator(NodeId),

    #[error("ambiguous operator at node {node}: candidates {candidates:?}")]
    AmbiguousOperator {
        node: NodeId,
        candidates: Vec<String>,
    },

    #[error("cannot coerce {from} to {to}")]
    CoercionFailure { from: String, to: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("resolver failed to converge after {0} iterations")]
    ResolverDiverged(u32),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("attempted to set child {index} to a node that already has a parent")]
    ChildAlreadyParented { index: usize },
}

impl From<AstError> for hil_error::Error {
    fn from(err: AstError) -> Self {
        match err {
            AstError::InvariantViolation(msg) => hil_error::FatalError::InvariantViolation(msg).into(),
            AstError::ChildAlreadyParented { index } => {
                hil_error::FatalError::InvariantViolation(format!(
                    "child slot {index} already has a parent"
                ))
                .into()
            }
            AstError::DuplicateModule(uid) => {
                hil_error::FatalError::DuplicateModule(format!("{uid:?}")).into()
            }
            AstError::ImportCycle(path) => hil_error::FatalError::ImportCycle(path).into(),
            AstError::ResolverDiverged(n) => {
                hil_error::FatalError::ResolverDiverged { iterations: n }.into()
            }
            AstError::ImportFailure(path) => hil_error::DomainError::ImportNotFound(path).into(),
            AstError::UnresolvedName(name) => hil_error::DomainError::UnresolvedName(name).into(),
            AstError::UnresolvedOperator(id) => {
                hil_error::DomainError::UnresolvedOperator(id).into()
            }
            AstError::AmbiguousOperator { node, candidates } => {
                hil_error::DomainError::AmbiguousOperator {
                    node,
                    candidates,
                }
                .into()
            }
            AstError::CoercionFailure { from, to } => {
                hil_error::DomainError::CoercionFailure { from, to }.into()
            }
            AstError::TypeMismatch { expected, found } => {
                hil_error::DomainError::TypeMismatch { expected, found }.into()
            }
            AstError::NotFound(id) => hil_error::DomainError::NotFound(id).into(),
            AstError::Multiple(errs) => hil_error::InternalError::CompilerError(
                errs.into_iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "),
            )
            .into(),
        }
    }
}

/// A severity-tagged diagnostic with source location, returned in batches
/// by `Driver::process_ast` on failure (`spec.md §6`, "Outbound: ... returns
/// a list of `(Location, severity, message)` tuples").
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub location: Option<crate::node::Location>,
    pub severity: hil_error::Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(location: Option<crate::node::Location>, error: &AstError) -> Self {
        let hil_err: hil_error::Error = error.clone().into();
        Diagnostic {
            location,
            severity: hil_err.severity(),
            message: hil_err.to_string(),
        }
    }
}
