//! Fundamental ID and namespace types shared across the HIL/SPD compiler
//! front-end.
//!
//! Every declaration, type, and AST node produced by `hil-ast` is identified
//! through the types defined here rather than through raw pointers, so that
//! identity survives serialization, cross-module comparison, and (per
//! `spec.md §9`) an eventual port to an arena-of-handles representation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root namespace all per-crate namespaces are derived from via UUID v5.
///
/// Keeping this fixed means that running the pipeline twice on the same
/// crate name + version always derives the same [`Uuid::new_v5`] namespace,
/// which is what makes canonical IDs (`spec.md §4.7`) reproducible across
/// runs.
pub const PROJECT_NAMESPACE_UUID: Uuid = Uuid::from_bytes([
    0x4c, 0x49, 0x4c, 0x48, 0x41, 0x53, 0x54, 0x01, 0x53, 0x50, 0x44, 0x01, 0x00, 0x00, 0x00, 0x01,
]);

/// Derives the namespace UUID for one module, scoped by name and an
/// import-scope discriminator (`spec.md §3`, Module UID).
///
/// Same inputs always produce the same namespace, which is the property
/// canonical IDs need.
pub fn derive_module_namespace(name: &str, scope: &str) -> Uuid {
    let key = format!("{name}@{scope}");
    Uuid::new_v5(&PROJECT_NAMESPACE_UUID, key.as_bytes())
}

/// Unique identifier for an AST node (declaration, statement, expression,
/// type, production, ...).
///
/// - `Path` IDs are derived deterministically from a module's namespace plus
///   the node's position in that module's declaration path; they are stable
///   across runs and are what canonical IDs (`spec.md §4.7`) are ultimately
///   built from.
/// - `Synthetic` IDs are assigned during the raw parse before any module
///   namespace is known (`spec.md §6`, "a raw AST has ... no canonical
///   IDs"); the ID assigner never needs to rewrite them; it only *also*
///   stamps a `canonicalID` string onto the declaration once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    Path(Uuid),
    Synthetic(Uuid),
}

impl NodeId {
    /// Deterministically derives a `Path` node ID from a module namespace,
    /// the dot-joined scope path leading to the declaration, and its local
    /// name. Two invocations with identical inputs always produce the same
    /// ID, which is the stability contract `spec.md §4.7` requires of
    /// `canonicalID`.
    pub fn derive(module_namespace: Uuid, scope_path: &[String], local_name: &str) -> Self {
        let joined = scope_path.join("::");
        let key = format!("{joined}::{local_name}");
        NodeId::Path(Uuid::new_v5(&module_namespace, key.as_bytes()))
    }

    /// Allocates a fresh synthetic ID for a node discovered during raw
    /// parsing, before any module namespace is assigned.
    pub fn new_synthetic() -> Self {
        NodeId::Synthetic(Uuid::new_v4())
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeId::Synthetic(_))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeId::Path(u) => write!(f, "path:{u}"),
            NodeId::Synthetic(u) => write!(f, "synthetic:{u}"),
        }
    }
}
