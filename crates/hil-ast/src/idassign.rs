//! ID assigner (`spec.md §4.7`, component C7).
//!
//! Computes `fullyQualifiedID = module.id :: enclosingScopes :: decl.id` and
//! a `canonicalID` disambiguated by a stable suffix when two declarations
//! would otherwise collide, e.g. overloaded functions suffixed by their
//! parameter unification strings.

use std::collections::HashMap;

use itertools::Itertools;

use crate::ast::{AstKind, DeclKind};
use crate::error::AstError;
use crate::node::{AstContext, NodeHandle};

/// One enclosing-scope frame: a module name or a named declaration (struct,
/// function) that nests further declarations under it.
pub fn fully_qualified_id(scope_path: &[&str], decl_id: &str) -> String {
    let mut parts: Vec<&str> = scope_path.to_vec();
    parts.push(decl_id);
    parts.join("::")
}

/// Parameter-unification-string-derived suffix for overload disambiguation
/// (`spec.md §4.7`). Returns `None` when any parameter type is still
/// unresolved, in which case the caller should retry on a later round.
fn overload_suffix(ctx: &AstContext, params: &[NodeHandle]) -> Option<String> {
    let mut tokens = Vec::with_capacity(params.len());
    for &param in params {
        let Some(AstKind::Declaration(decl)) = ctx.kind(param) else {
            return None;
        };
        let DeclKind::Parameter { ty, .. } = &decl.kind else {
            return None;
        };
        let Some(AstKind::Type(t)) = ctx.kind(*ty) else {
            return None;
        };
        tokens.push(t.unification.as_str()?.to_string());
    }
    Some(tokens.iter().join(","))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssignRound {
    pub newly_assigned: usize,
}

/// Assigns `fullyQualifiedID`/`canonicalID` to every declaration in
/// `declarations` that doesn't already have one. Idempotent: a declaration
/// that already carries a `canonical_id` is left untouched, so re-running
/// with an unchanged set is a no-op (`spec.md §4.7`).
///
/// `scope_of` maps a declaration handle to its enclosing scope path (module
/// name first, then nested container names), computed by the scope-
/// building step ([`crate::driver`]) before this runs.
pub fn assign_round(
    ctx: &mut AstContext,
    declarations: &[NodeHandle],
    scope_of: &HashMap<NodeHandle, Vec<String>>,
) -> Result<AssignRound, AstError> {
    let mut round = AssignRound::default();
    let mut seen_fqid: HashMap<String, NodeHandle> = HashMap::new();
    let mut pending_overloads: HashMap<String, Vec<NodeHandle>> = HashMap::new();

    for &handle in declarations {
        let already_done = matches!(
            ctx.kind(handle),
            Some(AstKind::Declaration(d)) if d.canonical_id.is_some()
        );
        if already_done {
            if let Some(AstKind::Declaration(d)) = ctx.kind(handle) {
                seen_fqid
                    .entry(d.fully_qualified_id.clone().unwrap_or_default())
                    .or_insert(handle);
            }
            continue;
        }
        let Some(scope) = scope_of.get(&handle) else {
            continue;
        };
        let scope_refs: Vec<&str> = scope.iter().map(String::as_str).collect();
        let Some(AstKind::Declaration(decl)) = ctx.kind(handle) else {
            continue;
        };
        let fqid = fully_qualified_id(&scope_refs, &decl.id);
        if let Some(&other) = seen_fqid.get(&fqid) {
            if other != handle {
                pending_overloads.entry(fqid.clone()).or_default().push(handle);
                continue;
            }
        }
        seen_fqid.insert(fqid.clone(), handle);
        if let Some(AstKind::Declaration(decl)) = ctx.kind_mut(handle) {
            tracing::debug!(target: "declarations", fqid = %fqid, "assigned canonical id");
            decl.fully_qualified_id = Some(fqid.clone());
            decl.canonical_id = Some(fqid);
            round.newly_assigned += 1;
        }
    }

    for (fqid, overloads) in pending_overloads {
        for handle in overloads {
            let params = match ctx.kind(handle) {
                Some(AstKind::Declaration(d)) => match &d.kind {
                    DeclKind::Function { params, .. } => params.clone(),
                    _ => {
                        return Err(AstError::InvariantViolation(format!(
                            "fullyQualifiedID collision on non-overloadable declaration {fqid}"
                        )))
                    }
                },
                _ => continue,
            };
            let Some(suffix) = overload_suffix(ctx, &params) else {
                continue;
            };
            let canonical = format!("{fqid}#{suffix}");
            if let Some(AstKind::Declaration(decl)) = ctx.kind_mut(handle) {
                decl.fully_qualified_id = Some(fqid.clone());
                decl.canonical_id = Some(canonical);
                round.newly_assigned += 1;
            }
        }
    }

    Ok(round)
}

/// `spec.md §4.7`: "Debug mode aborts execution when any declaration is
/// missing a canonical ID after assignment." Called by the driver at the
/// end of the resolve loop when built with debug assertions enabled.
pub fn debug_assert_all_assigned(ctx: &AstContext, declarations: &[NodeHandle]) {
    for &handle in declarations {
        debug_assert!(
            matches!(
                ctx.kind(handle),
                Some(AstKind::Declaration(d)) if d.canonical_id.is_some()
            ),
            "declaration {handle} missing a canonical ID after assignment",
        );
    }
}

/// `spec.md §8` invariant 2: every canonical ID is non-empty and unique.
pub fn check_unique_canonical_ids(
    ctx: &AstContext,
    declarations: &[NodeHandle],
) -> Result<(), AstError> {
    let mut seen: HashMap<String, NodeHandle> = HashMap::new();
    for &handle in declarations {
        let Some(AstKind::Declaration(decl)) = ctx.kind(handle) else {
            continue;
        };
        let Some(id) = &decl.canonical_id else {
            continue;
        };
        if id.is_empty() {
            return Err(AstError::InvariantViolation(format!(
                "declaration {handle} has an empty canonical ID"
            )));
        }
        if let Some(&other) = seen.get(id) {
            if other != handle {
                return Err(AstError::InvariantViolation(format!(
                    "duplicate canonical ID {id:?} shared by {other} and {handle}"
                )));
            }
        }
        seen.insert(id.clone(), handle);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Declaration, Linkage};
    use crate::node::Location;

    fn alloc_global(ctx: &mut AstContext, id: &str) -> NodeHandle {
        let decl = Declaration::new(
            id,
            Linkage::Public,
            DeclKind::GlobalVar {
                ty: NodeHandle::default(),
                init: None,
            },
        );
        ctx.alloc(AstKind::Declaration(decl), Location::synthetic())
    }

    #[test]
    fn assigns_module_scoped_fqid() {
        let mut ctx = AstContext::new();
        let x = alloc_global(&mut ctx, "x");
        let mut scope = HashMap::new();
        scope.insert(x, vec!["mod".to_string()]);
        let round = assign_round(&mut ctx, &[x], &scope).unwrap();
        assert_eq!(round.newly_assigned, 1);
        let Some(AstKind::Declaration(d)) = ctx.kind(x) else {
            panic!()
        };
        assert_eq!(d.canonical_id.as_deref(), Some("mod::x"));
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut ctx = AstContext::new();
        let x = alloc_global(&mut ctx, "x");
        let mut scope = HashMap::new();
        scope.insert(x, vec!["mod".to_string()]);
        assign_round(&mut ctx, &[x], &scope).unwrap();
        let second = assign_round(&mut ctx, &[x], &scope).unwrap();
        assert_eq!(second.newly_assigned, 0);
    }
}
