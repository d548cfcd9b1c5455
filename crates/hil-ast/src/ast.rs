//! AST entities (`spec.md §4.9`, component C3): declarations, statements,
//! expressions, and literal constructors. Each variant owns the
//! [`NodeHandle`]s of its fixed-position children directly, the way the
//! reference headers describe accessors like "child 0 is the type, child 1
//! is the body" — callers that only need structural traversal go through
//! [`crate::node::AstContext::children`]; callers that need typed access
//! match on the variant here.

use serde::{Deserialize, Serialize};

use crate::node::NodeHandle;
use crate::types::UnqualifiedType;

/// The closed set of node variants a [`crate::node::NodeSlot`] may hold
/// (`spec.md §3`: "polymorphic over the kinds enumerated in C3 plus type
/// kinds"). Matches `spec.md §9`'s "closed tagged union" design note: the
/// visitor dispatches over this enum exhaustively, so adding a kind without
/// updating every visitor is a compile error, not a silent no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstKind {
    Root,
    Module(ModuleDecl),
    Declaration(Declaration),
    Statement(Statement),
    Expression(Expression),
    Ctor(Ctor),
    Type(UnqualifiedType),
    /// Parser-description unit extensions (`spec.md §4.9`, last bullet).
    Spd(crate::spd::SpdNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linkage {
    Private,
    Public,
    Struct,
    Init,
    PreInit,
}

/// Subkinds of [`Declaration`] (`spec.md §3`: "Subkinds include: module,
/// type declaration, global/local variable, parameter, constant, function,
/// struct/union field, enum label, expression alias"). `Module` itself is
/// represented by the sibling [`ModuleDecl`] node kind rather than here,
/// since a module is also the thing [`crate::module::ModuleRegistry`]
/// indexes by UID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclKind {
    Type { ty: NodeHandle },
    GlobalVar { ty: NodeHandle, init: Option<NodeHandle> },
    LocalVar { ty: NodeHandle, init: Option<NodeHandle> },
    Parameter { ty: NodeHandle, default: Option<NodeHandle> },
    Constant { ty: NodeHandle, value: NodeHandle },
    Function {
        params: Vec<NodeHandle>,
        result: NodeHandle,
        body: Option<NodeHandle>,
    },
    Field { ty: NodeHandle },
    EnumLabel { value: Option<i64> },
    ExprAlias { expr: NodeHandle },
}

/// A named binding (`spec.md §3`, C3). `fully_qualified_id` and
/// `canonical_id` start `None` and are stamped in by [`crate::idassign`];
/// `spec.md §4.7`'s idempotence contract depends on that assigner treating
/// an already-`Some` `canonical_id` as done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: String,
    pub linkage: Linkage,
    pub fully_qualified_id: Option<String>,
    pub canonical_id: Option<String>,
    pub doc: Option<String>,
    pub kind: DeclKind,
}

impl Declaration {
    pub fn new(id: impl Into<String>, linkage: Linkage, kind: DeclKind) -> Self {
        Declaration {
            id: id.into(),
            linkage,
            fully_qualified_id: None,
            canonical_id: None,
            doc: None,
            kind,
        }
    }
}

/// A module node (`spec.md §3`: "A top-level declaration with a UID").
/// Carries the same identity fields the registry key is built from; see
/// [`crate::module::ModuleUid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub uid: crate::module::ModuleUid,
    pub fully_qualified_id: Option<String>,
    pub canonical_id: Option<String>,
    /// Names this module's top-level imports reference, in source order
    /// (`spec.md §4.3`, "direct set = modules named in uid's top-level
    /// imports").
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Block { statements: Vec<NodeHandle> },
    Declaration { decl: NodeHandle },
    If {
        condition: NodeHandle,
        then_branch: NodeHandle,
        else_branch: Option<NodeHandle>,
    },
    For {
        init: Option<NodeHandle>,
        condition: Option<NodeHandle>,
        step: Option<NodeHandle>,
        body: NodeHandle,
    },
    While { condition: NodeHandle, body: NodeHandle },
    /// `spec.md §4.9`: "switch (with cases; each case preprocesses
    /// expressions to `__x == E`)". The desugared comparison for each case
    /// is built once by the resolver and stored alongside the original
    /// label expression so later passes never re-derive it.
    Switch {
        scrutinee: NodeHandle,
        cases: Vec<SwitchCase>,
        default: Option<NodeHandle>,
    },
    TryCatch {
        body: NodeHandle,
        catches: Vec<CatchClause>,
    },
    Return { value: Option<NodeHandle> },
    Yield { value: Option<NodeHandle> },
    Throw { value: NodeHandle },
    Assert { condition: NodeHandle, message: Option<NodeHandle> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub label: NodeHandle,
    /// The `__x == E` desugaring of `label`, filled in during resolve.
    pub desugared_condition: Option<NodeHandle>,
    pub body: NodeHandle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param_type: NodeHandle,
    pub param_decl: Option<NodeHandle>,
    pub body: NodeHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyword {
    SelfValue,
    Input,
    Current,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Resolves to a declaration by name; `target` is `None` until the
    /// resolver finds it (`spec.md §3`: "weak... consumers must tolerate a
    /// null weak-lookup").
    NameRef { name: String, target: Option<NodeHandle> },
    Member { base: NodeHandle, field: String },
    /// Before resolution: candidate operator kind plus raw operands.
    UnresolvedOperator {
        kind: crate::operators::OperatorKind,
        operands: Vec<NodeHandle>,
    },
    /// After resolution: the chosen operator and its bound operands.
    ResolvedOperator {
        operator: crate::operators::OperatorId,
        operands: Vec<NodeHandle>,
        result_type: NodeHandle,
    },
    LogicalAnd { lhs: NodeHandle, rhs: NodeHandle },
    LogicalOr { lhs: NodeHandle, rhs: NodeHandle },
    /// A cast: wraps `inner` to be interpreted as `target_type`.
    TypeWrapped { inner: NodeHandle, target_type: NodeHandle },
    Void,
    TypeInfo { of: NodeHandle },
    Keyword(Keyword),
    Ctor(NodeHandle),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ctor {
    Bool(bool),
    Integer { value: i128, bits: u16, signed: bool },
    Real { value: f64, bits: u16 },
    Str(String),
    Bytes(Vec<u8>),
    Address(String),
    Port(u16),
    Interval { start: NodeHandle, end: NodeHandle },
    Time(i64),
    Regexp { pattern: String, nosub: bool },
    List(Vec<NodeHandle>),
    Vector(Vec<NodeHandle>),
    Set(Vec<NodeHandle>),
    Map(Vec<(NodeHandle, NodeHandle)>),
    Tuple(Vec<NodeHandle>),
    Struct { ty: NodeHandle, fields: Vec<(String, NodeHandle)> },
    Union { ty: NodeHandle, field: String, value: NodeHandle },
    /// References an enum label by name; resolved to the label declaration
    /// once the enum's declaration is in scope.
    EnumLabel { enum_type: NodeHandle, label: String },
    Optional(Option<NodeHandle>),
    Reference { kind: crate::types::RefKind, target: NodeHandle },
    Stream(Vec<NodeHandle>),
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_starts_without_canonical_id() {
        let decl = Declaration::new(
            "x",
            Linkage::Public,
            DeclKind::GlobalVar {
                ty: NodeHandle::default(),
                init: None,
            },
        );
        assert!(decl.canonical_id.is_none());
        assert!(decl.fully_qualified_id.is_none());
    }
}
