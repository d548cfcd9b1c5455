//! Type unifier (`spec.md §4.6`, component C6).
//!
//! Assigns each [`crate::types::UnqualifiedType`] a canonical string such
//! that structurally equal types share a string. A depth-first walk of a
//! type's structural children accumulates tokens; a cycle through a `Name`
//! that points back into the current traversal aborts just this round
//! (`spec.md §9`: "do not attempt one-shot serialization").

use std::collections::HashSet;

use crate::ast::AstKind;
use crate::node::{AstContext, NodeHandle};
use crate::types::{TypeClass, Unification};

/// Result of one fixed-point round over every type node reachable from the
/// root (`spec.md §4.8`, "resolve loop": "alternate unify types... until a
/// full round produces no modification and no new types were unified").
#[derive(Debug, Clone, Copy, Default)]
pub struct UnifyRound {
    pub newly_set: usize,
}

/// Runs one round of unification over `type_nodes`, mutating any `Unset`
/// type whose children are already resolvable. Already-`Set` or
/// `NeverMatch` types are left untouched, per `spec.md §4.6`'s invariant
/// that "once set, a unification string is never changed".
pub fn unify_round(ctx: &mut AstContext, type_nodes: &[NodeHandle]) -> UnifyRound {
    let mut round = UnifyRound::default();
    for &handle in type_nodes {
        let already_set = matches!(
            ctx.kind(handle),
            Some(AstKind::Type(t)) if !matches!(t.unification, Unification::Unset)
        );
        if already_set {
            continue;
        }
        let mut in_progress = HashSet::new();
        if let Some(outcome) = serialize(ctx, handle, &mut in_progress) {
            if let Some(AstKind::Type(t)) = ctx.kind_mut(handle) {
                t.unification = outcome;
                t.resolved = true;
                round.newly_set += 1;
            }
        }
    }
    round
}

/// Depth-first structural serialization of `handle`. Returns `None` when
/// the walk re-enters a node already on the current stack (a cycle through
/// an unresolved `Name`) or when a child is itself not yet resolvable;
/// both cases leave the type `Unset` for another round to retry once an
/// independent resolution step (e.g. a reference wrapper closing the loop)
/// breaks the cycle.
fn serialize(
    ctx: &AstContext,
    handle: NodeHandle,
    in_progress: &mut HashSet<NodeHandle>,
) -> Option<Unification> {
    let Some(AstKind::Type(t)) = ctx.kind(handle) else {
        return None;
    };
    match &t.unification {
        Unification::Set(s) => return Some(Unification::Set(s.clone())),
        Unification::NeverMatch => return Some(Unification::NeverMatch),
        Unification::Unset => {}
    }
    if !in_progress.insert(handle) {
        return None;
    }
    let result = serialize_class(ctx, &t.class, in_progress);
    in_progress.remove(&handle);
    result
}

fn serialize_class(
    ctx: &AstContext,
    class: &TypeClass,
    in_progress: &mut HashSet<NodeHandle>,
) -> Option<Unification> {
    let tag = class.tag();
    let token = |rest: String| Some(Unification::Set(format!("{tag}{rest}")));
    match class {
        TypeClass::Void
        | TypeClass::Null
        | TypeClass::Unknown
        | TypeClass::Error
        | TypeClass::Bool
        | TypeClass::Str
        | TypeClass::Bytes
        | TypeClass::Address
        | TypeClass::Port
        | TypeClass::Interval
        | TypeClass::Time => token(String::new()),
        TypeClass::Integer { bits, signed } => {
            token(format!("<{bits}{}>", if *signed { "s" } else { "u" }))
        }
        TypeClass::Real { bits } => token(format!("<{bits}>")),
        TypeClass::Regexp { nosub } => token(format!("<{nosub}>")),
        TypeClass::Tuple { fields } => {
            let tokens = serialize_each(ctx, fields, in_progress)?;
            token(format!("<{}>", tokens.join(",")))
        }
        TypeClass::List { element }
        | TypeClass::Vector { element }
        | TypeClass::Set { element }
        | TypeClass::Stream { element } => {
            let elem = serialize_one(ctx, *element, in_progress)?;
            token(format!("<{elem}>"))
        }
        TypeClass::Map { key, value } => {
            let k = serialize_one(ctx, *key, in_progress)?;
            let v = serialize_one(ctx, *value, in_progress)?;
            token(format!("<{k},{v}>"))
        }
        TypeClass::Optional { inner } => {
            let inner = serialize_one(ctx, *inner, in_progress)?;
            token(format!("<{inner}>"))
        }
        TypeClass::Result { ok, err } => {
            let ok = serialize_one(ctx, *ok, in_progress)?;
            let err = serialize_one(ctx, *err, in_progress)?;
            token(format!("<{ok},{err}>"))
        }
        TypeClass::Reference { kind, inner } => {
            let inner = serialize_one(ctx, *inner, in_progress)?;
            token(format!("<{kind:?},{inner}>"))
        }
        TypeClass::Struct {
            fields,
            parameters,
            self_ref,
        } => {
            if self_ref.is_some() {
                // A self-reference participates through its own `Reference`
                // wrapper node, which breaks the cycle by tokenizing
                // `kind` before recursing; serializing the struct's other
                // fields is enough to produce a string.
            }
            let field_tokens = serialize_each(ctx, fields, in_progress)?;
            let param_tokens = serialize_each(ctx, parameters, in_progress)?;
            token(format!(
                "{{{}}}({})",
                field_tokens.join(","),
                param_tokens.join(",")
            ))
        }
        TypeClass::Union { fields } => {
            let tokens = serialize_each(ctx, fields, in_progress)?;
            token(format!("{{{}}}", tokens.join(",")))
        }
        TypeClass::Enum { labels } => token(format!("<{}>", labels.join(","))),
        TypeClass::Bitfield { ranges } => {
            let tokens: Vec<String> = ranges.iter().map(|(a, b)| format!("{a}:{b}")).collect();
            token(format!("<{}>", tokens.join(",")))
        }
        TypeClass::Function { params, result } => {
            let param_tokens = serialize_each(ctx, params, in_progress)?;
            let result_token = serialize_one(ctx, *result, in_progress)?;
            token(format!("({})->{}", param_tokens.join(","), result_token))
        }
        TypeClass::Name { target, .. } => {
            let target = (*target)?;
            // A reference to a name_type (struct/union/enum) compares
            // nominally, so its token is the target's identity, not a
            // recursive expansion of its body — this is what lets a
            // `strong_ref<L>` field inside `L` itself resolve on the round
            // after `Name` links up, instead of looping forever through
            // the struct's own fields.
            // Gated on `resolved` too: a struct whose declaration hasn't
            // been linked yet by the name-resolution step still has to be
            // walked structurally, the same as any other unresolved type,
            // so a cycle through it is still caught by `in_progress`.
            let is_name_type =
                matches!(ctx.kind(target), Some(AstKind::Type(t)) if t.name_type && t.resolved);
            if is_name_type {
                let Some(AstKind::Type(t)) = ctx.kind(target) else {
                    return None;
                };
                Some(Unification::Set(format!("name<{}:{target}>", t.class.tag())))
            } else {
                serialize(ctx, target, in_progress)
            }
        }
        TypeClass::Member { base, field } => {
            let base = serialize_one(ctx, *base, in_progress)?;
            token(format!(".{base}.{field}"))
        }
        TypeClass::TypeValue { of } => {
            let of = serialize_one(ctx, *of, in_progress)?;
            token(format!("<{of}>"))
        }
        TypeClass::Library { name } => token(format!("<{name}>")),
        TypeClass::OperandList { operands } => {
            let tokens = serialize_each(ctx, operands, in_progress)?;
            token(format!("({})", tokens.join(",")))
        }
    }
}

fn serialize_one(
    ctx: &AstContext,
    handle: NodeHandle,
    in_progress: &mut HashSet<NodeHandle>,
) -> Option<String> {
    match serialize(ctx, handle, in_progress)? {
        Unification::Set(s) => Some(s),
        Unification::NeverMatch => Some(String::new()),
        Unification::Unset => None,
    }
}

fn serialize_each(
    ctx: &AstContext,
    handles: &[NodeHandle],
    in_progress: &mut HashSet<NodeHandle>,
) -> Option<Vec<String>> {
    handles
        .iter()
        .map(|h| serialize_one(ctx, *h, in_progress))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Location;
    use crate::types::{RefKind, UnqualifiedType};

    fn alloc_type(ctx: &mut AstContext, ty: UnqualifiedType) -> NodeHandle {
        ctx.alloc(AstKind::Type(ty), Location::synthetic())
    }

    #[test]
    fn scalar_unifies_in_one_round() {
        let mut ctx = AstContext::new();
        let int_handle = alloc_type(
            &mut ctx,
            UnqualifiedType::new(TypeClass::Integer {
                bits: 32,
                signed: true,
            }),
        );
        let round = unify_round(&mut ctx, &[int_handle]);
        assert_eq!(round.newly_set, 1);
        let Some(AstKind::Type(t)) = ctx.kind(int_handle) else {
            panic!()
        };
        assert_eq!(t.unification.as_str(), Some("integer<32s>"));
    }

    #[test]
    fn recursive_type_needs_two_rounds() {
        // `type L = struct { next: strong_ref<L>; val: int<32>; };` (spec
        // scenario S4): `next`'s type is a reference wrapping a `Name("L")`
        // that, once linked, points back at the struct itself.
        let mut ctx = AstContext::new();
        let leaf_int = alloc_type(
            &mut ctx,
            UnqualifiedType::new(TypeClass::Integer {
                bits: 32,
                signed: true,
            }),
        );
        let struct_handle = alloc_type(
            &mut ctx,
            UnqualifiedType::new(TypeClass::Struct {
                fields: vec![],
                parameters: vec![],
                self_ref: None,
            }),
        );
        let name_handle = alloc_type(
            &mut ctx,
            UnqualifiedType::new(TypeClass::Name {
                path: "L".to_string(),
                target: Some(struct_handle),
            }),
        );
        let reference_handle = alloc_type(
            &mut ctx,
            UnqualifiedType::new(TypeClass::Reference {
                kind: RefKind::Strong,
                inner: name_handle,
            }),
        );
        if let Some(AstKind::Type(t)) = ctx.kind_mut(struct_handle) {
            t.class = TypeClass::Struct {
                fields: vec![reference_handle, leaf_int],
                parameters: vec![],
                self_ref: Some(reference_handle),
            };
        }

        let nodes = [leaf_int, name_handle, struct_handle, reference_handle];
        let first = unify_round(&mut ctx, &nodes);
        assert_eq!(first.newly_set, 1, "only the leaf int resolves in round one");

        // Simulates the resolve-names step the driver runs between unify
        // rounds (`spec.md §4.8`): the struct's declaration links up,
        // independent of unification.
        if let Some(AstKind::Type(t)) = ctx.kind_mut(struct_handle) {
            t.resolved = true;
        }

        let second = unify_round(&mut ctx, &nodes);
        assert_eq!(
            second.newly_set, 3,
            "name, reference, and struct all close the cycle in round two"
        );
    }
}
