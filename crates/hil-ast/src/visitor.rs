//! Visitor & rewriter (`spec.md §4.4`, component C5).
//!
//! The reference headers describe an iterator that walks the children
//! vector depth-first in one of two orders, optionally visiting null
//! slots, with a mutation API layered on top that the driver polls for
//! "did anything change" between fixed-point rounds.

use crate::node::{AstContext, NodeHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Pre,
    Post,
}

/// Read-only tree visitor. `dispatch` in `spec.md §4.1` ("invoke the
/// visitor's overload matching this node's variant") is this trait's
/// [`Visitor::visit`] call, keyed by `order` rather than by a separate
/// per-variant method, since the closed [`crate::ast::AstKind`] union lets
/// callers match exhaustively inside one method instead.
pub trait Visitor {
    fn visit(&mut self, ctx: &AstContext, handle: NodeHandle, order: Order);

    /// Called for a null child slot at `parent`'s `index` when `walk` is
    /// invoked with `include_empty = true`. No-op by default, since most
    /// visitors only care about present nodes.
    fn visit_empty(&mut self, _ctx: &AstContext, _parent: NodeHandle, _index: usize) {}
}

/// Depth-first walk of `root`'s subtree. Null child slots are skipped
/// unless `include_empty` is set, in which case [`Visitor::visit_empty`]
/// is called for each one (`spec.md §4.1`, `child(i)`: "null slots are
/// permitted and skipped during traversal unless includeEmpty is set").
/// Visits `root` itself at both `Pre` and `Post` so a visitor can bracket
/// work around a subtree without special-casing the top.
pub fn walk<V: Visitor>(ctx: &AstContext, root: NodeHandle, visitor: &mut V, include_empty: bool) {
    if !ctx.is_live(root) {
        return;
    }
    visitor.visit(ctx, root, Order::Pre);
    for (index, child) in ctx.children(root).iter().enumerate() {
        match child {
            Some(handle) => walk(ctx, *handle, visitor, include_empty),
            None if include_empty => visitor.visit_empty(ctx, root, index),
            None => {}
        }
    }
    visitor.visit(ctx, root, Order::Post);
}

/// One structural or non-structural change recorded by a
/// [`MutatingVisitor`], used by [`crate::driver`] to decide whether another
/// fixed-point round is needed.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub node: NodeHandle,
    pub message: String,
    pub structural: bool,
}

/// Wraps a normal visitor with the mutation API from `spec.md §4.4`.
/// Per the open question in `spec.md §9`, a node swapped in by
/// [`MutatingVisitor::replace_node`] is **not** re-visited during the
/// current walk; callers that need the replacement visited run another
/// pass, which is also how the fixed-point driver in `spec.md §4.8`
/// naturally converges (a pass that changes the tree always gets at least
/// one more round).
pub struct MutatingVisitor<V> {
    pub inner: V,
    changes: Vec<ChangeRecord>,
}

impl<V> MutatingVisitor<V> {
    pub fn new(inner: V) -> Self {
        MutatingVisitor {
            inner,
            changes: Vec::new(),
        }
    }

    /// Locates `old`'s slot in its parent and swaps in `new`
    /// (`spec.md §4.4`, `replaceNode(oldPtr, new, msg)`). Fails if `old` has
    /// no parent (e.g. it is the root) or `new` is already parented.
    pub fn replace_node(
        &mut self,
        ctx: &mut AstContext,
        old: NodeHandle,
        new: NodeHandle,
        message: impl Into<String>,
    ) -> Result<(), crate::error::AstError> {
        let parent = ctx
            .parent(old)
            .ok_or_else(|| crate::error::AstError::InvariantViolation(
                "replaceNode called on a node with no parent".to_string(),
            ))?;
        let index = ctx
            .children(parent)
            .iter()
            .position(|c| *c == Some(old))
            .ok_or_else(|| crate::error::AstError::InvariantViolation(
                "old node not found among its parent's children".to_string(),
            ))?;
        ctx.set_child(parent, index, Some(new))?;
        self.changes.push(ChangeRecord {
            node: new,
            message: message.into(),
            structural: true,
        });
        Ok(())
    }

    /// Marks the visitor as having modified the AST without a structural
    /// replacement, e.g. stamping a resolved name or a unification string
    /// onto an existing node (`spec.md §4.4`, `recordChange`).
    pub fn record_change(&mut self, node: NodeHandle, message: impl Into<String>) {
        self.changes.push(ChangeRecord {
            node,
            message: message.into(),
            structural: false,
        });
    }

    pub fn is_modified(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn clear_modified(&mut self) {
        self.changes.clear();
    }

    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }
}

impl<V: Visitor> Visitor for MutatingVisitor<V> {
    fn visit(&mut self, ctx: &AstContext, handle: NodeHandle, order: Order) {
        self.inner.visit(ctx, handle, order);
    }

    fn visit_empty(&mut self, ctx: &AstContext, parent: NodeHandle, index: usize) {
        self.inner.visit_empty(ctx, parent, index);
    }
}
