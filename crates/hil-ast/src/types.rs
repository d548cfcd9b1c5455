//! The type system (`spec.md §4.2`, component C2).
//!
//! `UnqualifiedType` describes a type's structure; `QualifiedType` wraps one
//! with constness and side. Unification strings (assigned by [`crate::unify`])
//! live on the unqualified type and drive [`same`] and [`sameExceptForConstness`]-style
//! comparisons.

use serde::{Deserialize, Serialize};

use crate::node::NodeHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constness {
    Const,
    NonConst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Lhs,
    Rhs,
}

/// Reference flavor for `strong_ref<T>` / `weak_ref<T>` / `value_ref<T>`
/// (`spec.md §4.9`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    Strong,
    Weak,
    Value,
}

/// The canonical serialization state of an [`UnqualifiedType`]
/// (`spec.md §4.6`): unset until the unifier visits it, `NeverMatch` for
/// placeholders that must never compare equal even to themselves, or a set
/// string once unification succeeds.
///
/// `original_source/` represents `NeverMatch` with a reserved empty-string
/// sentinel that happens to compare not-equal to everything including
/// itself; we promote that convention to an explicit enum variant so the
/// "never equal, not even to itself" rule is enforced by the type system
/// rather than by string-equality folklore at every call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unification {
    Unset,
    NeverMatch,
    Set(String),
}

impl Unification {
    pub fn is_set(&self) -> bool {
        matches!(self, Unification::Set(_))
    }

    /// Structural equality per `spec.md §4.6`: two *set* strings that match.
    /// `NeverMatch` never equals anything, including another `NeverMatch`.
    pub fn equals(&self, other: &Unification) -> bool {
        match (self, other) {
            (Unification::Set(a), Unification::Set(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Unification::Set(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// The closed set of structural/nominal type kinds from `spec.md §4.9`.
/// Each variant owns the handles to its structural children (if any); the
/// same handles are also reachable as tree children through
/// [`crate::node::AstContext`] so that traversal and typed access agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeClass {
    Void,
    Null,
    Unknown,
    Error,
    Bool,
    Integer { bits: u16, signed: bool },
    Real { bits: u16 },
    Str,
    Bytes,
    Address,
    Port,
    Interval,
    Time,
    Regexp { nosub: bool },
    Tuple { fields: Vec<NodeHandle> },
    List { element: NodeHandle },
    Vector { element: NodeHandle },
    Set { element: NodeHandle },
    Map { key: NodeHandle, value: NodeHandle },
    Stream { element: NodeHandle },
    Optional { inner: NodeHandle },
    Result { ok: NodeHandle, err: NodeHandle },
    Reference { kind: RefKind, inner: NodeHandle },
    Struct {
        fields: Vec<NodeHandle>,
        parameters: Vec<NodeHandle>,
        self_ref: Option<NodeHandle>,
    },
    Union { fields: Vec<NodeHandle> },
    Enum { labels: Vec<String> },
    Bitfield { ranges: Vec<(u16, u16)> },
    Function { params: Vec<NodeHandle>, result: NodeHandle },
    /// Unresolved reference by name; resolved away by [`follow`].
    Name { path: String, target: Option<NodeHandle> },
    Member { base: NodeHandle, field: String },
    TypeValue { of: NodeHandle },
    /// Opaque type identified by a caller-supplied library-qualified name.
    Library { name: String },
    /// Internal-only overload signature carrier (`spec.md §4.9`,
    /// "operand-list"), never produced by user syntax.
    OperandList { operands: Vec<NodeHandle> },
}

impl TypeClass {
    /// Stable short string unique per kind (`spec.md §3`, `typeClass`).
    pub fn tag(&self) -> &'static str {
        match self {
            TypeClass::Void => "void",
            TypeClass::Null => "null",
            TypeClass::Unknown => "unknown",
            TypeClass::Error => "error",
            TypeClass::Bool => "bool",
            TypeClass::Integer { .. } => "integer",
            TypeClass::Real { .. } => "real",
            TypeClass::Str => "string",
            TypeClass::Bytes => "bytes",
            TypeClass::Address => "address",
            TypeClass::Port => "port",
            TypeClass::Interval => "interval",
            TypeClass::Time => "time",
            TypeClass::Regexp { .. } => "regexp",
            TypeClass::Tuple { .. } => "tuple",
            TypeClass::List { .. } => "list",
            TypeClass::Vector { .. } => "vector",
            TypeClass::Set { .. } => "set",
            TypeClass::Map { .. } => "map",
            TypeClass::Stream { .. } => "stream",
            TypeClass::Optional { .. } => "optional",
            TypeClass::Result { .. } => "result",
            TypeClass::Reference { .. } => "reference",
            TypeClass::Struct { .. } => "struct",
            TypeClass::Union { .. } => "union",
            TypeClass::Enum { .. } => "enum",
            TypeClass::Bitfield { .. } => "bitfield",
            TypeClass::Function { .. } => "function",
            TypeClass::Name { .. } => "name",
            TypeClass::Member { .. } => "member",
            TypeClass::TypeValue { .. } => "type-value",
            TypeClass::Library { .. } => "library",
            TypeClass::OperandList { .. } => "operand-list",
        }
    }
}

/// A structural or nominal type description (`spec.md §3`, C2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnqualifiedType {
    pub class: TypeClass,
    pub unification: Unification,
    pub is_wildcard: bool,
    pub allocable: bool,
    pub mutable: bool,
    /// Compared nominally (by declaration identity) rather than
    /// structurally, e.g. `struct`/`union`/`enum`.
    pub name_type: bool,
    pub reference_type: bool,
    pub sortable: bool,
    pub resolved: bool,
    /// Weak back-reference to the type declaration that introduced this
    /// type, if any.
    pub declaration: Option<NodeHandle>,
}

impl UnqualifiedType {
    pub fn new(class: TypeClass) -> Self {
        let name_type = matches!(
            class,
            TypeClass::Struct { .. } | TypeClass::Union { .. } | TypeClass::Enum { .. }
        );
        let reference_type = matches!(class, TypeClass::Reference { .. });
        UnqualifiedType {
            class,
            unification: Unification::Unset,
            is_wildcard: false,
            allocable: true,
            mutable: true,
            name_type,
            reference_type,
            sortable: false,
            resolved: false,
            declaration: None,
        }
    }

    pub fn wildcard(class: TypeClass) -> Self {
        let mut t = Self::new(class);
        t.is_wildcard = true;
        t
    }

    pub fn never_match(class: TypeClass) -> Self {
        let mut t = Self::new(class);
        t.unification = Unification::NeverMatch;
        t
    }
}

/// Pairs an [`UnqualifiedType`] (by handle, looked up through an
/// [`crate::node::AstContext`]) with `(constness, side)` (`spec.md §3`).
///
/// An "external" qualified type holds a weak link to an unqualified type
/// living elsewhere in the tree rather than owning a fresh one, used to
/// break reference cycles such as a struct's `self` parameter pointing back
/// at the enclosing struct type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifiedType {
    pub constness: Constness,
    pub side: Side,
    pub unqualified: NodeHandle,
    pub external: bool,
}

impl QualifiedType {
    pub fn new(unqualified: NodeHandle, constness: Constness, side: Side) -> Self {
        QualifiedType {
            constness,
            side,
            unqualified,
            external: false,
        }
    }

    pub fn external(unqualified: NodeHandle, constness: Constness, side: Side) -> Self {
        QualifiedType {
            constness,
            side,
            unqualified,
            external: true,
        }
    }

    pub fn recreate_as_const(&self) -> Self {
        QualifiedType {
            constness: Constness::Const,
            ..self.clone()
        }
    }

    pub fn recreate_as_lhs(&self) -> Self {
        QualifiedType {
            side: Side::Lhs,
            ..self.clone()
        }
    }
}

/// Follows a chain of `Name` types to their resolved target, stopping at
/// the first unresolved `Name` or non-`Name` type (`spec.md §4.2`).
/// Terminates because `spec.md §8` invariant 4 forbids a `Name -> Name ->
/// ...` cycle surviving resolution; a defensive step cap guards against a
/// bug in that invariant rather than a legitimate long chain.
pub fn follow(ctx: &crate::node::AstContext, start: NodeHandle) -> NodeHandle {
    let mut current = start;
    for _ in 0..4096 {
        let Some(crate::ast::AstKind::Type(t)) = ctx.kind(current) else {
            return current;
        };
        match &t.class {
            TypeClass::Name {
                target: Some(target),
                ..
            } => current = *target,
            _ => return current,
        }
    }
    current
}

/// `spec.md §4.2`: true iff both are resolved and either their unification
/// strings are set and equal, or at least one is a wildcard whose
/// `typeClass` matches the other's.
pub fn same(a: &UnqualifiedType, b: &UnqualifiedType) -> bool {
    if !a.resolved || !b.resolved {
        return false;
    }
    if a.is_wildcard || b.is_wildcard {
        return a.class.tag() == b.class.tag();
    }
    a.unification.equals(&b.unification)
}

/// Like [`same`] but only for the wildcard/unification-string shortcut;
/// never compares constness (constness lives on [`QualifiedType`], not
/// here, so this is identical to [`same`] for unqualified types).
pub fn same_except_for_constness(a: &UnqualifiedType, b: &UnqualifiedType) -> bool {
    same(a, b)
}

/// `same` for qualified types additionally requires matching constness
/// (`spec.md §4.2`).
pub fn same_qualified(
    ctx: &crate::node::AstContext,
    a: &QualifiedType,
    b: &QualifiedType,
) -> bool {
    if a.constness != b.constness {
        return false;
    }
    let (Some(crate::ast::AstKind::Type(ta)), Some(crate::ast::AstKind::Type(tb))) =
        (ctx.kind(a.unqualified), ctx.kind(b.unqualified))
    else {
        return false;
    };
    same(ta, tb)
}

/// Propagates an outer qualification onto a freshly wrapped container's
/// element type, e.g. a `list<T>` inherits the enclosing qualification's
/// constness onto `T` (`spec.md §4.2`, "newlyQualified hook").
pub fn newly_qualified(outer: &QualifiedType, element_unqualified: NodeHandle) -> QualifiedType {
    QualifiedType::new(element_unqualified, outer.constness, outer.side)
}
