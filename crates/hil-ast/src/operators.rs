//! Operator & coercion registry (`spec.md §4.5`, component C9).
//!
//! An [`Operator`] declares a [`Signature`]; the resolver enumerates
//! candidates for an unresolved operator expression, scores each by how its
//! operands coerce, and either replaces the node with the unique best match
//! or reports [`crate::error::AstError::AmbiguousOperator`] on a tie.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::error::AstError;
use crate::node::NodeHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    Call,
    MemberAccess,
    Equality,
    Inequality,
    Arithmetic(ArithmeticOp),
    Indexing,
    Dereference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// How an operand is passed (`spec.md §4.5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandMode {
    In,
    InOut,
    Copy,
    Move,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperandSpec {
    pub mode: OperandMode,
    pub ty: NodeHandle,
    pub default: Option<NodeHandle>,
    pub optional: bool,
}

/// The expected operand list, result type, and commutativity of an
/// [`Operator`] (`spec.md §4.5`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub operands: Vec<OperandSpec>,
    pub result: NodeHandle,
    pub commutative: bool,
}

/// Stable handle into an [`OperatorRegistry`], stamped onto a
/// `ResolvedOperator` expression node once resolution picks a winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId(pub u32);

/// A builder callback invoked once an operator is chosen for a call site,
/// producing the resolved node or a failure (`spec.md §4.5`,
/// `instantiate(builder, operands, meta)`).
pub trait Instantiate {
    fn instantiate(
        &self,
        operands: &[NodeHandle],
        meta: &InstantiateMeta,
    ) -> Result<ResolvedOperator, AstError>;
}

#[derive(Debug, Clone, Default)]
pub struct InstantiateMeta {
    pub call_site: Option<NodeHandle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOperator {
    pub operator: OperatorId,
    pub result_type: NodeHandle,
}

pub struct Operator {
    pub kind: OperatorKind,
    pub signature: Signature,
    pub declaring_scope: Option<NodeHandle>,
    pub instantiate: Box<dyn Instantiate>,
}

/// Bitmask selecting which coercions [`coerce`] is allowed to consider
/// (`spec.md §4.5`). Mirrors a plain C-style flags set: explicit requests
/// get only [`CoercionStyle::EXPLICIT_ONLY`]; the resolver's implicit pass
/// for operand matching ORs in [`CoercionStyle::IMPLICIT_ALLOWED`] and,
/// where the destination is narrower, [`CoercionStyle::NARROWING_ALLOWED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoercionStyle(u8);

impl CoercionStyle {
    pub const EXPLICIT_ONLY: CoercionStyle = CoercionStyle(1 << 0);
    pub const IMPLICIT_ALLOWED: CoercionStyle = CoercionStyle(1 << 1);
    pub const NARROWING_ALLOWED: CoercionStyle = CoercionStyle(1 << 2);
    pub const REFERENCE_LEVEL: CoercionStyle = CoercionStyle(1 << 3);

    pub fn contains(self, other: CoercionStyle) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CoercionStyle {
    type Output = CoercionStyle;
    fn bitor(self, rhs: CoercionStyle) -> CoercionStyle {
        CoercionStyle(self.0 | rhs.0)
    }
}

/// Outcome of attempting to fit a ctor/expression to a destination type
/// (`spec.md §4.5`): unchanged success, a new wrapper node, or failure that
/// (outside of explicit coercion) simply removes the candidate rather than
/// raising an error.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercionResult {
    Unchanged(NodeHandle),
    Wrapped(NodeHandle),
    Failed,
}

/// Attempts to coerce `value` (already of type `from_type`) to
/// `destination_type` under `style`. Built-in rule: identical unification
/// strings always succeed unchanged; a narrowing numeric conversion needs
/// [`CoercionStyle::NARROWING_ALLOWED`] set, unless `style` is
/// [`CoercionStyle::EXPLICIT_ONLY`] (an explicit request may narrow without
/// that flag); everything else needs [`CoercionStyle::IMPLICIT_ALLOWED`].
/// Every non-identical case still has to match the built-in conversion
/// table below — an explicit request doesn't bypass it.
pub fn coerce(
    ctx: &crate::node::AstContext,
    value: NodeHandle,
    from_type: NodeHandle,
    destination_type: NodeHandle,
    style: CoercionStyle,
) -> CoercionResult {
    let (Some(crate::ast::AstKind::Type(from)), Some(crate::ast::AstKind::Type(to))) =
        (ctx.kind(from_type), ctx.kind(destination_type))
    else {
        return CoercionResult::Failed;
    };
    if crate::types::same(from, to) {
        return CoercionResult::Unchanged(value);
    }
    let explicit_only = style.contains(CoercionStyle::EXPLICIT_ONLY) && !style.contains(CoercionStyle::IMPLICIT_ALLOWED);
    if !explicit_only && !style.contains(CoercionStyle::IMPLICIT_ALLOWED) {
        return CoercionResult::Failed;
    }
    // An explicit request additionally permits narrowing without the caller
    // having to set NARROWING_ALLOWED; it still only matches the built-in
    // conversion table below, so e.g. struct-to-function stays a failure.
    let narrowing_allowed = explicit_only || style.contains(CoercionStyle::NARROWING_ALLOWED);
    match (&from.class, &to.class) {
        (
            crate::types::TypeClass::Integer { bits: fb, .. },
            crate::types::TypeClass::Integer { bits: tb, .. },
        ) => {
            if tb >= fb || narrowing_allowed {
                CoercionResult::Wrapped(value)
            } else {
                CoercionResult::Failed
            }
        }
        (crate::types::TypeClass::Integer { .. }, crate::types::TypeClass::Real { .. }) => {
            CoercionResult::Wrapped(value)
        }
        (crate::types::TypeClass::Real { .. }, crate::types::TypeClass::Integer { .. })
            if narrowing_allowed =>
        {
            CoercionResult::Wrapped(value)
        }
        _ => CoercionResult::Failed,
    }
}

/// Relative quality of a match, used to pick the unique maximum
/// (`spec.md §4.5`: "exact > implicit coercion > variadic").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchScore {
    Variadic,
    ImplicitCoercion,
    Exact,
}

pub struct Candidate {
    pub operator: OperatorId,
    pub score: MatchScore,
}

/// Declarations contributing operators plus the process-wide built-ins
/// (`spec.md §4.5`).
#[derive(Default)]
pub struct OperatorRegistry {
    operators: Vec<Operator>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        OperatorRegistry::default()
    }

    pub fn register(&mut self, operator: Operator) -> OperatorId {
        let id = OperatorId(self.operators.len() as u32);
        self.operators.push(operator);
        id
    }

    pub fn get(&self, id: OperatorId) -> Option<&Operator> {
        self.operators.get(id.0 as usize)
    }

    fn candidates_for(&self, kind: OperatorKind) -> impl Iterator<Item = (OperatorId, &Operator)> {
        self.operators
            .iter()
            .enumerate()
            .filter(move |(_, op)| op.kind == kind)
            .map(|(i, op)| (OperatorId(i as u32), op))
    }

    fn score_candidate(
        &self,
        ctx: &crate::node::AstContext,
        op: &Operator,
        operand_types: &[NodeHandle],
    ) -> Option<MatchScore> {
        if operand_types.len() > op.signature.operands.len() {
            return None;
        }
        let mut score = MatchScore::Exact;
        for (spec, actual) in op.signature.operands.iter().zip(operand_types) {
            let result = coerce(
                ctx,
                *actual,
                *actual,
                spec.ty,
                CoercionStyle::IMPLICIT_ALLOWED,
            );
            match result {
                CoercionResult::Unchanged(_) => {}
                CoercionResult::Wrapped(_) => {
                    score = MatchScore::ImplicitCoercion;
                }
                CoercionResult::Failed => return None,
            }
        }
        if operand_types.len() < op.signature.operands.len() {
            let missing_all_optional = op.signature.operands[operand_types.len()..]
                .iter()
                .all(|spec| spec.optional);
            if !missing_all_optional {
                return None;
            }
            score = MatchScore::Variadic;
        }
        Some(score)
    }

    /// Scores every candidate of `kind` against `operand_types`, returning
    /// the unique best match. `Ok(None)` means no candidate matched at all
    /// (resolution leaves the expression unresolved for a later round);
    /// `Err(AmbiguousOperator)` means two or more candidates tied for best.
    pub fn resolve(
        &self,
        ctx: &crate::node::AstContext,
        site: hil_core::NodeId,
        kind: OperatorKind,
        operand_types: &[NodeHandle],
    ) -> Result<Option<OperatorId>, AstError> {
        let mut best: Option<(OperatorId, MatchScore)> = None;
        let mut tied: Vec<OperatorId> = Vec::new();
        for (id, op) in self.candidates_for(kind) {
            let Some(score) = self.score_candidate(ctx, op, operand_types) else {
                continue;
            };
            match &best {
                None => {
                    best = Some((id, score));
                    tied = vec![id];
                }
                Some((_, best_score)) => {
                    if score > *best_score {
                        best = Some((id, score));
                        tied = vec![id];
                    } else if score == *best_score {
                        tied.push(id);
                    }
                }
            }
        }
        match tied.len() {
            0 => Ok(None),
            1 => Ok(Some(tied[0])),
            _ => Err(AstError::AmbiguousOperator {
                node: site,
                candidates: tied.iter().map(|id| format!("{id:?}")).collect(),
            }),
        }
    }
}
