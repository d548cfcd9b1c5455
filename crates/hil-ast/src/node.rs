//! The node substrate (`spec.md §4.1`, component C1).
//!
//! The reference implementation represents every AST entity as a
//! reference-counted cell with weak back-references. `spec.md §9` asks for
//! an arena owned by the AST context instead, with small-integer handles in
//! place of pointers and a generation counter so that a weak reference to a
//! freed slot is detectable rather than dangling silently. That's what this
//! module builds: [`AstContext`] owns a single `Vec<NodeSlot>`; every node,
//! type, and cross-tree relation elsewhere in the crate is a [`NodeHandle`]
//! into that vec, never a pointer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::AstKind;
use crate::error::AstError;

/// A stable-address handle into one [`AstContext`]'s node arena.
///
/// Two handles compare equal iff they name the same arena slot *and* the
/// same generation of that slot's lifetime. A handle whose generation is
/// stale (the slot was freed and reused) is a dangling weak reference,
/// exactly the case `spec.md §3` calls out for cross-tree back-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}

/// Source location metadata carried by every node (`spec.md §3`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line_start: u32,
    pub line_end: u32,
}

impl Location {
    pub fn synthetic() -> Self {
        Location {
            file: String::from("<synthesized>"),
            line_start: 0,
            line_end: 0,
        }
    }
}

/// Atomic values a node's diagnostic/dump property map may hold
/// (`spec.md §3`: "a properties map (string -> atomic value)").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Ordered list of `&tag(optional-expression)` attributes (`spec.md §3`).
/// Multiple attributes may share a tag; [`Attributes::first_with_tag`]
/// picks the first in declaration order, following `original_source/`'s
/// behavior where `spec.md` leaves the tie-break unspecified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes(Vec<Attribute>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub tag: String,
    pub argument: Option<NodeHandle>,
}

impl Attributes {
    pub fn push(&mut self, attr: Attribute) {
        self.0.push(attr);
    }

    pub fn first_with_tag(&self, tag: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.tag == tag)
    }

    pub fn all_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Attribute> {
        self.0.iter().filter(move |a| a.tag == tag)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }
}

struct NodeSlot {
    generation: u32,
    alive: bool,
    parent: Option<NodeHandle>,
    children: Vec<Option<NodeHandle>>,
    location: Location,
    properties: HashMap<String, PropertyValue>,
    attributes: Attributes,
    kind: AstKind,
}

/// Process-wide (per compilation) holder of the node arena and module
/// registry (`spec.md §3`, "ASTContext (C4)").
///
/// Owns every node transitively through the root; "cross-tree" references
/// (declaration <-> type, overload <-> function, label <-> enum) never go
/// through here as ownership, only as [`NodeHandle`] lookups performed by
/// the caller.
pub struct AstContext {
    arena: Vec<NodeSlot>,
    free_list: Vec<u32>,
    root: Option<NodeHandle>,
    pub(crate) modules: crate::module::ModuleRegistry,
    anon_struct_counter: u64,
    /// Set when a structural change may have invalidated previously-built
    /// scope tables (`spec.md §3`, `rebuildScopes` flag).
    pub(crate) rebuild_scopes: bool,
    /// Set once the fixed point in `spec.md §4.8` has been reached.
    pub(crate) resolved: bool,
    /// True only while a `Driver::process_ast` call is on the stack
    /// (`spec.md §5`: "A running processAST stores Driver* in the context;
    /// passes read it only while the call is on the stack").
    processing: bool,
    /// Per-container symbol table, keyed by the container node (module,
    /// function declaration, struct/union type) and populated by
    /// `crate::driver`'s `build_scopes` step.
    scopes: HashMap<NodeHandle, HashMap<String, NodeHandle>>,
    /// Enclosing scope-name path for every declaration seen by the last
    /// `build_scopes` walk, cached so `resolve_loop` doesn't have to
    /// recompute it on every iteration.
    decl_scope_paths: HashMap<NodeHandle, Vec<String>>,
}

impl Default for AstContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AstContext {
    pub fn new() -> Self {
        AstContext {
            arena: Vec::new(),
            free_list: Vec::new(),
            root: None,
            modules: crate::module::ModuleRegistry::new(),
            anon_struct_counter: 0,
            rebuild_scopes: true,
            resolved: false,
            processing: false,
            scopes: HashMap::new(),
            decl_scope_paths: HashMap::new(),
        }
    }

    /// Read access to the module registry tied to this context's nodes
    /// (`spec.md §4.3`, component C3).
    pub fn modules(&self) -> &crate::module::ModuleRegistry {
        &self.modules
    }

    /// Mutable access to the module registry, used by parsers wiring new
    /// modules into this context.
    pub fn modules_mut(&mut self) -> &mut crate::module::ModuleRegistry {
        &mut self.modules
    }

    /// Installs the result of a `build_scopes` walk, replacing whatever
    /// scope tables were computed on the previous walk.
    pub(crate) fn install_scopes(
        &mut self,
        scopes: HashMap<NodeHandle, HashMap<String, NodeHandle>>,
        decl_scope_paths: HashMap<NodeHandle, Vec<String>>,
    ) {
        self.scopes = scopes;
        self.decl_scope_paths = decl_scope_paths;
    }

    /// The symbol table owned by `container` (a module, function, or
    /// struct/union type node), if `build_scopes` has run since it was last
    /// invalidated.
    pub fn scope_table(&self, container: NodeHandle) -> Option<&HashMap<String, NodeHandle>> {
        self.scopes.get(&container)
    }

    /// The enclosing scope-name path recorded for `decl` by the last
    /// `build_scopes` walk.
    pub fn scope_path(&self, decl: NodeHandle) -> Option<&[String]> {
        self.decl_scope_paths.get(&decl).map(Vec::as_slice)
    }

    /// Allocates a fresh, unparented node and returns its handle.
    pub fn alloc(&mut self, kind: AstKind, location: Location) -> NodeHandle {
        let slot = NodeSlot {
            generation: 0,
            alive: true,
            parent: None,
            children: Vec::new(),
            location,
            properties: HashMap::new(),
            attributes: Attributes::default(),
            kind,
        };
        if let Some(index) = self.free_list.pop() {
            let generation = self.arena[index as usize].generation + 1;
            self.arena[index as usize] = NodeSlot { generation, ..slot };
            NodeHandle { index, generation }
        } else {
            let index = self.arena.len() as u32;
            self.arena.push(slot);
            NodeHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Sets the singleton "ast-root" node. Must be called exactly once.
    pub fn set_root(&mut self, root: NodeHandle) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    fn slot(&self, handle: NodeHandle) -> Option<&NodeSlot> {
        self.arena
            .get(handle.index as usize)
            .filter(|s| s.alive && s.generation == handle.generation)
    }

    fn slot_mut(&mut self, handle: NodeHandle) -> Option<&mut NodeSlot> {
        self.arena
            .get_mut(handle.index as usize)
            .filter(|s| s.alive && s.generation == handle.generation)
    }

    /// True iff `handle` still names a live slot at the generation it was
    /// minted with; false means the weak reference is dangling
    /// (`spec.md §3`: "consumers must tolerate a null weak-lookup").
    pub fn is_live(&self, handle: NodeHandle) -> bool {
        self.slot(handle).is_some()
    }

    /// Derives a stable, cross-crate [`hil_core::NodeId`] for diagnostics
    /// that must outlive this arena (`spec.md §7`'s `(Location, severity,
    /// message)` tuples). A declaration with a canonical ID already
    /// assigned hashes deterministically from that ID; anything else (not
    /// yet resolved, or not a declaration) gets a fresh synthetic ID, which
    /// is fine for a diagnostic's identity since it is never looked back up.
    pub fn stable_id(&self, handle: NodeHandle) -> hil_core::NodeId {
        if let Some(AstKind::Declaration(d)) = self.kind(handle) {
            if let Some(canonical) = &d.canonical_id {
                return hil_core::NodeId::derive(
                    hil_core::PROJECT_NAMESPACE_UUID,
                    &[],
                    canonical,
                );
            }
        }
        hil_core::NodeId::new_synthetic()
    }

    pub fn kind(&self, handle: NodeHandle) -> Option<&AstKind> {
        self.slot(handle).map(|s| &s.kind)
    }

    pub fn kind_mut(&mut self, handle: NodeHandle) -> Option<&mut AstKind> {
        self.slot_mut(handle).map(|s| &mut s.kind)
    }

    pub fn location(&self, handle: NodeHandle) -> Option<&Location> {
        self.slot(handle).map(|s| &s.location)
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.slot(handle).and_then(|s| s.parent)
    }

    pub fn attributes(&self, handle: NodeHandle) -> Option<&Attributes> {
        self.slot(handle).map(|s| &s.attributes)
    }

    pub fn push_attribute(&mut self, handle: NodeHandle, attr: Attribute) {
        if let Some(slot) = self.slot_mut(handle) {
            slot.attributes.push(attr);
        }
    }

    pub fn set_property(&mut self, handle: NodeHandle, key: impl Into<String>, value: PropertyValue) {
        if let Some(slot) = self.slot_mut(handle) {
            slot.properties.insert(key.into(), value);
        }
    }

    pub fn property(&self, handle: NodeHandle, key: &str) -> Option<&PropertyValue> {
        self.slot(handle).and_then(|s| s.properties.get(key))
    }

    /// Ordered sequence of child handles. Null slots (`None`) are included;
    /// filter with [`AstContext::children_present`] to skip them the way
    /// traversal does by default.
    pub fn children(&self, handle: NodeHandle) -> &[Option<NodeHandle>] {
        self.slot(handle).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    pub fn children_present(&self, handle: NodeHandle) -> impl Iterator<Item = NodeHandle> + '_ {
        self.children(handle).iter().filter_map(|c| *c)
    }

    pub fn child(&self, handle: NodeHandle, index: usize) -> Option<NodeHandle> {
        self.slot(handle).and_then(|s| s.children.get(index).copied().flatten())
    }

    /// Appends `child` as a new trailing slot, parenting it to `handle`.
    pub fn add_child(&mut self, handle: NodeHandle, child: NodeHandle) -> Result<(), AstError> {
        if self.parent(child).is_some() {
            return Err(AstError::ChildAlreadyParented {
                index: self.children(handle).len(),
            });
        }
        let index = self.children(handle).len();
        if let Some(slot) = self.slot_mut(handle) {
            slot.children.push(Some(child));
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(NodeHandle {
                index: handle.index,
                generation: handle.generation,
            });
        }
        let _ = index;
        Ok(())
    }

    /// Replaces child slot `index`, detaching whatever previously occupied
    /// it and parenting the replacement. Fails with
    /// [`AstError::ChildAlreadyParented`] if `new` already has a parent,
    /// matching `spec.md §4.1`'s `setChild` contract.
    pub fn set_child(
        &mut self,
        handle: NodeHandle,
        index: usize,
        new: Option<NodeHandle>,
    ) -> Result<(), AstError> {
        if let Some(new_handle) = new {
            if self.parent(new_handle).is_some() {
                return Err(AstError::ChildAlreadyParented { index });
            }
        }
        let old = self
            .slot_mut(handle)
            .and_then(|s| s.children.get_mut(index))
            .map(|slot| std::mem::replace(slot, new));
        if let Some(Some(old_handle)) = old {
            if let Some(slot) = self.slot_mut(old_handle) {
                slot.parent = None;
            }
        }
        if let Some(new_handle) = new {
            if let Some(slot) = self.slot_mut(new_handle) {
                slot.parent = Some(handle);
            }
        }
        Ok(())
    }

    /// Truncates the trailing region `[start, end)`, detaching each removed
    /// child (`spec.md §4.1`, `removeChildren(range)`).
    pub fn remove_children(&mut self, handle: NodeHandle, start: usize, end: usize) {
        let removed: Vec<NodeHandle> = self
            .slot_mut(handle)
            .map(|s| {
                let end = end.min(s.children.len());
                s.children
                    .splice(start..end, std::iter::empty())
                    .flatten()
                    .collect()
            })
            .unwrap_or_default();
        for child in removed {
            if let Some(slot) = self.slot_mut(child) {
                slot.parent = None;
            }
        }
    }

    /// Frees an unparented node's slot, bumping its generation so that any
    /// remaining weak handle to it becomes detectably stale.
    pub fn free(&mut self, handle: NodeHandle) {
        if self.parent(handle).is_some() {
            return;
        }
        if let Some(slot) = self.arena.get_mut(handle.index as usize) {
            slot.alive = false;
            slot.children.clear();
        }
        self.free_list.push(handle.index);
    }

    /// Deterministic counter for anonymous struct names, kept on the
    /// context (not a process-wide static) so that two compilations running
    /// in different contexts never share state (`spec.md §9`).
    pub fn next_anon_struct_id(&mut self) -> u64 {
        self.anon_struct_counter += 1;
        self.anon_struct_counter
    }

    /// True only while a `Driver::process_ast` call is active (`spec.md §5`).
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub(crate) fn begin_processing(&mut self) {
        self.processing = true;
    }

    pub(crate) fn end_processing(&mut self) {
        self.processing = false;
    }
}
