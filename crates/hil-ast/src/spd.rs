//! Parser-description (SPD) extensions (`spec.md §4.9`, last bullet).
//!
//! SPD lowers into HIL through the `transform` step of [`crate::driver`]
//! (`spec.md §6`: "a plugin supplies... a transformer"). Besides the
//! production graph, lowering synthesizes the struct and parse-function
//! declarations a unit's fields describe (`spec.md §8`, scenario S6);
//! grammar/production code generation itself is explicitly out of scope
//! (`spec.md §1`).

use serde::{Deserialize, Serialize};

use crate::ast::{AstKind, DeclKind, Declaration, Linkage};
use crate::error::AstError;
use crate::node::{AstContext, Location, NodeHandle};
use crate::types::{TypeClass, UnqualifiedType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    Sync,
    Async,
    Generator,
}

/// A unit type's field before resolution: ctor- or type-driven, an optional
/// container repeat, a guard condition, constructor arguments, attached
/// sinks, and hooks (`spec.md §4.9`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitField {
    pub name: String,
    pub field_type: FieldType,
    pub repeat: Option<NodeHandle>,
    pub guard: Option<NodeHandle>,
    pub arguments: Vec<NodeHandle>,
    pub sinks: Vec<NodeHandle>,
    pub hooks: Vec<NodeHandle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    Ctor(NodeHandle),
    Type(NodeHandle),
    /// Name-only until resolve (`spec.md §4.9`, "unresolved field").
    Unresolved(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyItem {
    pub name: String,
    pub value: NodeHandle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkType {
    pub name: String,
    pub target_field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDecl {
    pub name: String,
    pub engine: EngineKind,
    pub body: NodeHandle,
}

/// One node in the production graph generated while lowering a unit
/// (`spec.md §4.9`). Consumed by the out-of-scope code generator; the
/// resolver only needs enough structure to validate references and assign
/// canonical IDs to the synthesized declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Production {
    Atomic { field: NodeHandle },
    Sequence { items: Vec<NodeHandle> },
    Counter { count: NodeHandle, body: NodeHandle },
    Switch { scrutinee: NodeHandle, branches: Vec<(NodeHandle, NodeHandle)> },
    Reference { target: NodeHandle },
    /// Placeholder left by a partial lowering pass, swapped for a concrete
    /// production once the referent resolves.
    ResolvedPlaceholder { resolved: Option<NodeHandle> },
}

/// A unit type: fields, variables, sinks, switches, hooks, and properties
/// (`spec.md §4.9`). `name` is the unit's own declared name (e.g. the `U`
/// in `public type U = unit { ... }`), used to name the struct and parse
/// function `transform` synthesizes from it (`spec.md §8`, scenario S6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub name: String,
    pub fields: Vec<UnitField>,
    pub variables: Vec<NodeHandle>,
    pub sinks: Vec<SinkType>,
    pub hooks: Vec<HookDecl>,
    pub properties: Vec<PropertyItem>,
}

/// Node kinds SPD contributes to the shared [`crate::ast::AstKind`] union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpdNode {
    Unit(UnitType),
    Production(Production),
}

/// Resolves every `FieldType::Unresolved` field on `unit` against
/// `named_decls` (declaration/type handles keyed by name in the unit's
/// enclosing scope), the way a plugin's `resolve` hook lowers an SPD unit
/// toward HIL (`spec.md §6`'s "transform" step, `spec.md §4.9`'s
/// "unresolved field"). A field stays unresolved (and is left untouched)
/// when its name isn't found yet, so a later resolve round can retry it;
/// a name that resolves to neither a declaration nor a type is a hard
/// `UnresolvedName`, since SPD fields only ever reference one of the two.
pub fn resolve_unit_fields(
    ctx: &AstContext,
    unit: &mut UnitType,
    named_decls: &std::collections::HashMap<String, NodeHandle>,
) -> Result<usize, AstError> {
    let mut resolved = 0;
    for field in &mut unit.fields {
        let FieldType::Unresolved(name) = &field.field_type else {
            continue;
        };
        let Some(&target) = named_decls.get(name) else {
            continue;
        };
        field.field_type = match ctx.kind(target) {
            Some(AstKind::Ctor(_)) => FieldType::Ctor(target),
            Some(AstKind::Type(_)) => FieldType::Type(target),
            _ => return Err(AstError::UnresolvedName(name.clone())),
        };
        resolved += 1;
    }
    Ok(resolved)
}

/// Lowers one field to a production node (`spec.md §4.9`, "SPD lowers into
/// HIL"). A `repeat` wraps the base production in a [`Production::Counter`];
/// a `guard` wraps that in a single-branch [`Production::Switch`]; trailing
/// `arguments`, if any, turn the whole thing into a [`Production::Sequence`]
/// so constructor arguments are reachable alongside the field itself.
fn lower_field(ctx: &mut AstContext, location: &Location, field: &UnitField) -> NodeHandle {
    let base = match &field.field_type {
        FieldType::Unresolved(_) => ctx.alloc(
            AstKind::Spd(SpdNode::Production(Production::ResolvedPlaceholder { resolved: None })),
            location.clone(),
        ),
        FieldType::Ctor(target) | FieldType::Type(target) => ctx.alloc(
            AstKind::Spd(SpdNode::Production(Production::Atomic { field: *target })),
            location.clone(),
        ),
    };
    let counted = match field.repeat {
        Some(count) => ctx.alloc(
            AstKind::Spd(SpdNode::Production(Production::Counter { count, body: base })),
            location.clone(),
        ),
        None => base,
    };
    let guarded = match field.guard {
        Some(guard) => ctx.alloc(
            AstKind::Spd(SpdNode::Production(Production::Switch {
                scrutinee: guard,
                branches: vec![(guard, counted)],
            })),
            location.clone(),
        ),
        None => counted,
    };
    if field.arguments.is_empty() {
        guarded
    } else {
        let mut items = vec![guarded];
        items.extend(field.arguments.iter().copied());
        ctx.alloc(
            AstKind::Spd(SpdNode::Production(Production::Sequence { items })),
            location.clone(),
        )
    }
}

/// Lowers a fully-resolved unit to its production graph: one lowered
/// production per field, a [`Production::Reference`] per sink pointing at
/// the field it drains, and one per hook pointing at the hook body, all
/// wrapped in a top-level [`Production::Sequence`] (`spec.md §4.9`, last
/// bullet: "SPD lowers into HIL through the transform step"). Fails with
/// `UnresolvedName` if a sink names a field that doesn't exist on the unit.
pub fn lower_unit(
    ctx: &mut AstContext,
    location: &Location,
    unit: &UnitType,
) -> Result<NodeHandle, AstError> {
    let mut by_name: std::collections::HashMap<&str, NodeHandle> = std::collections::HashMap::new();
    let mut items: Vec<NodeHandle> = Vec::with_capacity(unit.fields.len());
    for field in &unit.fields {
        let node = lower_field(ctx, location, field);
        by_name.insert(field.name.as_str(), node);
        items.push(node);
    }
    for sink in &unit.sinks {
        let &target = by_name
            .get(sink.target_field.as_str())
            .ok_or_else(|| AstError::UnresolvedName(sink.target_field.clone()))?;
        items.push(ctx.alloc(
            AstKind::Spd(SpdNode::Production(Production::Reference { target })),
            location.clone(),
        ));
    }
    for hook in &unit.hooks {
        items.push(ctx.alloc(
            AstKind::Spd(SpdNode::Production(Production::Reference { target: hook.body })),
            location.clone(),
        ));
    }
    Ok(ctx.alloc(
        AstKind::Spd(SpdNode::Production(Production::Sequence { items })),
        location.clone(),
    ))
}

/// The type a fully-resolved field is backed by, for struct-field synthesis.
/// Both `Ctor`- and `Type`-backed fields resolve to a handle usable as the
/// field's declared type (`spec.md §4.9` models a field as binding to
/// either a type name or a constant; the struct synthesized from it treats
/// either as "the field's type").
fn field_underlying_type(field: &UnitField) -> Option<NodeHandle> {
    match field.field_type {
        FieldType::Type(target) | FieldType::Ctor(target) => Some(target),
        FieldType::Unresolved(_) => None,
    }
}

/// Synthesizes the struct `unit.name` names and a parse function for it
/// (`spec.md §8`, scenario S6: "module contains a struct `U` with fields
/// `x`, `y` and a synthesized parse function"). One `Declaration` per
/// field (`DeclKind::Field`) becomes a child of the new struct `Type` node,
/// which becomes a child of a new `Declaration` (`DeclKind::Type`); the
/// parse function is a second new `Declaration` (`DeclKind::Function`)
/// with no body, since emitting the parser body is the out-of-scope
/// code-generation step. Both declarations are returned as new children to
/// attach to the unit's enclosing module.
fn synthesize_struct_and_parser(
    ctx: &mut AstContext,
    location: &Location,
    unit: &UnitType,
) -> (NodeHandle, NodeHandle) {
    let field_decls: Vec<NodeHandle> = unit
        .fields
        .iter()
        .map(|field| {
            let ty = field_underlying_type(field).unwrap_or_else(|| {
                ctx.alloc(
                    AstKind::Type(UnqualifiedType::new(TypeClass::Unknown)),
                    location.clone(),
                )
            });
            ctx.alloc(
                AstKind::Declaration(Declaration::new(
                    field.name.clone(),
                    Linkage::Struct,
                    DeclKind::Field { ty },
                )),
                location.clone(),
            )
        })
        .collect();

    let struct_type = ctx.alloc(
        AstKind::Type(UnqualifiedType::new(TypeClass::Struct {
            fields: field_decls.clone(),
            parameters: Vec::new(),
            self_ref: None,
        })),
        location.clone(),
    );
    for &field_decl in &field_decls {
        ctx.add_child(struct_type, field_decl)
            .expect("freshly allocated field declaration has no parent yet");
    }

    let struct_decl = ctx.alloc(
        AstKind::Declaration(Declaration::new(
            unit.name.clone(),
            Linkage::Public,
            DeclKind::Type { ty: struct_type },
        )),
        location.clone(),
    );
    ctx.add_child(struct_decl, struct_type)
        .expect("freshly allocated struct type has no parent yet");
    if let Some(AstKind::Type(t)) = ctx.kind_mut(struct_type) {
        t.declaration = Some(struct_decl);
    }

    let parse_fn = ctx.alloc(
        AstKind::Declaration(Declaration::new(
            format!("parse{}", unit.name),
            Linkage::Public,
            DeclKind::Function {
                params: Vec::new(),
                result: struct_type,
                body: None,
            },
        )),
        location.clone(),
    );

    (struct_decl, parse_fn)
}

/// Walks up from `handle` to its enclosing module, the attachment point
/// for declarations `transform` synthesizes from a unit.
fn enclosing_module(ctx: &AstContext, handle: NodeHandle) -> Option<NodeHandle> {
    let mut current = ctx.parent(handle);
    while let Some(h) = current {
        if matches!(ctx.kind(h), Some(AstKind::Module(_))) {
            return Some(h);
        }
        current = ctx.parent(h);
    }
    None
}

/// Walks up from `handle` to the nearest container with a symbol table (or
/// a module, which always counts even before its own scope table is
/// populated), the scope an SPD field name not already bound within its own
/// unit should be looked up against.
fn enclosing_scope_container(ctx: &AstContext, handle: NodeHandle) -> Option<NodeHandle> {
    let mut current = ctx.parent(handle);
    while let Some(h) = current {
        if ctx.scope_table(h).is_some() || matches!(ctx.kind(h), Some(AstKind::Module(_))) {
            return Some(h);
        }
        current = ctx.parent(h);
    }
    None
}

/// Names visible to `unit`'s unresolved fields: sibling fields already typed
/// within the same unit, then module-level `Type`/`Constant` declarations
/// visible in `container`'s scope table.
fn named_context(
    ctx: &AstContext,
    container: Option<NodeHandle>,
    unit: &UnitType,
) -> std::collections::HashMap<String, NodeHandle> {
    let mut named = std::collections::HashMap::new();
    for field in &unit.fields {
        match &field.field_type {
            FieldType::Ctor(h) | FieldType::Type(h) => {
                named.insert(field.name.clone(), *h);
            }
            FieldType::Unresolved(_) => {}
        }
    }
    let Some(container) = container else {
        return named;
    };
    let Some(scope) = ctx.scope_table(container) else {
        return named;
    };
    for (name, &decl_handle) in scope {
        if named.contains_key(name) {
            continue;
        }
        let target = match ctx.kind(decl_handle) {
            Some(AstKind::Declaration(d)) => match &d.kind {
                DeclKind::Type { ty } => Some(*ty),
                DeclKind::Constant { value, .. } => Some(*value),
                _ => None,
            },
            _ => None,
        };
        if let Some(target) = target {
            named.insert(name.clone(), target);
        }
    }
    named
}

fn collect_unit_nodes(ctx: &AstContext, modules: &[NodeHandle]) -> Vec<NodeHandle> {
    let mut out = Vec::new();
    struct Collector<'a>(&'a mut Vec<NodeHandle>);
    impl crate::visitor::Visitor for Collector<'_> {
        fn visit(&mut self, ctx: &AstContext, handle: NodeHandle, order: crate::visitor::Order) {
            if order != crate::visitor::Order::Pre {
                return;
            }
            if matches!(ctx.kind(handle), Some(AstKind::Spd(SpdNode::Unit(_)))) {
                self.0.push(handle);
            }
        }
    }
    let mut collector = Collector(&mut out);
    for &module in modules {
        crate::visitor::walk(ctx, module, &mut collector, false);
    }
    out
}

/// The [`crate::driver::Plugin`] that lowers SPD units into HIL production
/// graphs (`spec.md §4.9`/§6). `resolve` wires up any `Unresolved` field it
/// can now reach by name; `transform` lowers every unit whose fields have
/// all resolved into a production graph hung off the unit node.
#[derive(Debug, Default)]
pub struct SpdLoweringPlugin;

impl crate::driver::Plugin for SpdLoweringPlugin {
    fn process_extension(&self) -> &str {
        "spd"
    }

    fn pre_validate(&mut self, _ctx: &AstContext, _modules: &[NodeHandle]) -> Vec<AstError> {
        Vec::new()
    }

    fn resolve(
        &mut self,
        ctx: &mut AstContext,
        modules: &[NodeHandle],
        visitor: &mut crate::visitor::MutatingVisitor<crate::driver::NoopVisitor>,
    ) -> Result<(), AstError> {
        let units = collect_unit_nodes(ctx, modules);
        for handle in units {
            let container = enclosing_scope_container(ctx, handle);
            let Some(AstKind::Spd(SpdNode::Unit(unit))) = ctx.kind(handle) else {
                continue;
            };
            let mut unit = unit.clone();
            let named = named_context(ctx, container, &unit);
            let resolved = resolve_unit_fields(ctx, &mut unit, &named)?;
            if resolved > 0 {
                if let Some(AstKind::Spd(SpdNode::Unit(slot))) = ctx.kind_mut(handle) {
                    *slot = unit;
                }
                visitor.record_change(handle, "resolved spd unit field names");
            }
        }
        Ok(())
    }

    fn post_validate(&mut self, ctx: &AstContext, modules: &[NodeHandle]) -> Vec<AstError> {
        collect_unit_nodes(ctx, modules)
            .into_iter()
            .filter_map(|h| match ctx.kind(h) {
                Some(AstKind::Spd(SpdNode::Unit(unit))) => {
                    unit.fields.iter().find_map(|f| match &f.field_type {
                        FieldType::Unresolved(name) => Some(AstError::UnresolvedName(name.clone())),
                        _ => None,
                    })
                }
                _ => None,
            })
            .collect()
    }

    fn transform(&mut self, ctx: &mut AstContext, modules: &[NodeHandle]) -> Result<bool, AstError> {
        let units = collect_unit_nodes(ctx, modules);
        let mut changed = false;
        for handle in units {
            if !ctx.children(handle).is_empty() {
                continue;
            }
            let Some(AstKind::Spd(SpdNode::Unit(unit))) = ctx.kind(handle) else {
                continue;
            };
            if unit.fields.iter().any(|f| matches!(f.field_type, FieldType::Unresolved(_))) {
                continue;
            }
            let unit = unit.clone();
            let location = ctx.location(handle).cloned().unwrap_or_else(Location::synthetic);
            let production = lower_unit(ctx, &location, &unit)?;
            ctx.add_child(handle, production)?;

            // The unit declaration itself is retained (`spec.md §8`, S6:
            // "retained or removed per plugin policy" — this plugin keeps
            // it); the struct and parse function it describes are new
            // sibling declarations in the enclosing module.
            let module = enclosing_module(ctx, handle).ok_or_else(|| {
                AstError::InvariantViolation("SPD unit has no enclosing module".to_string())
            })?;
            let (struct_decl, parse_fn) = synthesize_struct_and_parser(ctx, &location, &unit);
            ctx.add_child(module, struct_decl)?;
            ctx.add_child(module, parse_fn)?;

            changed = true;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ctor;
    use crate::node::Location;
    use crate::types::UnqualifiedType;

    fn field(name: &str) -> UnitField {
        UnitField {
            name: name.to_string(),
            field_type: FieldType::Unresolved(name.to_string()),
            repeat: None,
            guard: None,
            arguments: Vec::new(),
            sinks: Vec::new(),
            hooks: Vec::new(),
        }
    }

    #[test]
    fn resolves_ctor_and_type_fields_leaves_unknown_names_pending() {
        let mut ctx = AstContext::new();
        let int_ctor = ctx.alloc(
            AstKind::Ctor(Ctor::Integer { value: 1, bits: 32, signed: true }),
            Location::synthetic(),
        );
        let str_ty = ctx.alloc(
            AstKind::Type(UnqualifiedType::new(crate::types::TypeClass::Str)),
            Location::synthetic(),
        );

        let mut named = std::collections::HashMap::new();
        named.insert("header".to_string(), int_ctor);
        named.insert("payload".to_string(), str_ty);

        let mut unit = UnitType {
            name: "Frame".to_string(),
            fields: vec![field("header"), field("payload"), field("trailer")],
            variables: Vec::new(),
            sinks: Vec::new(),
            hooks: Vec::new(),
            properties: Vec::new(),
        };

        let resolved = resolve_unit_fields(&ctx, &mut unit, &named).unwrap();
        assert_eq!(resolved, 2);
        assert_eq!(unit.fields[0].field_type, FieldType::Ctor(int_ctor));
        assert_eq!(unit.fields[1].field_type, FieldType::Type(str_ty));
        assert_eq!(unit.fields[2].field_type, FieldType::Unresolved("trailer".to_string()));
    }

    #[test]
    fn lower_field_wraps_repeat_and_guard() {
        let mut ctx = AstContext::new();
        let loc = Location::synthetic();
        let int_ctor = ctx.alloc(
            AstKind::Ctor(Ctor::Integer { value: 1, bits: 8, signed: false }),
            loc.clone(),
        );
        let count = ctx.alloc(AstKind::Ctor(Ctor::Integer { value: 4, bits: 32, signed: true }), loc.clone());
        let guard = ctx.alloc(AstKind::Ctor(Ctor::Bool(true)), loc.clone());

        let mut f = field("header");
        f.field_type = FieldType::Ctor(int_ctor);
        f.repeat = Some(count);
        f.guard = Some(guard);

        let node = lower_field(&mut ctx, &loc, &f);
        let Some(AstKind::Spd(SpdNode::Production(Production::Switch { scrutinee, branches }))) =
            ctx.kind(node)
        else {
            panic!("expected a guard to produce a Switch");
        };
        assert_eq!(*scrutinee, guard);
        assert_eq!(branches.len(), 1);
        let (_, counted) = branches[0];
        assert!(matches!(
            ctx.kind(counted),
            Some(AstKind::Spd(SpdNode::Production(Production::Counter { .. })))
        ));
    }

    #[test]
    fn lower_unit_appends_sink_and_hook_references() {
        let mut ctx = AstContext::new();
        let loc = Location::synthetic();
        let int_ctor = ctx.alloc(
            AstKind::Ctor(Ctor::Integer { value: 1, bits: 8, signed: false }),
            loc.clone(),
        );
        let hook_body = ctx.alloc(AstKind::Expression(crate::ast::Expression::Void), loc.clone());

        let mut header = field("header");
        header.field_type = FieldType::Ctor(int_ctor);

        let unit = UnitType {
            name: "Frame".to_string(),
            fields: vec![header],
            variables: Vec::new(),
            sinks: vec![SinkType { name: "out".to_string(), target_field: "header".to_string() }],
            hooks: vec![HookDecl {
                name: "onStart".to_string(),
                engine: EngineKind::Sync,
                body: hook_body,
            }],
            properties: Vec::new(),
        };

        let sequence = lower_unit(&mut ctx, &loc, &unit).unwrap();
        let Some(AstKind::Spd(SpdNode::Production(Production::Sequence { items }))) = ctx.kind(sequence)
        else {
            panic!("expected a top-level Sequence");
        };
        // one lowered field + one sink reference + one hook reference
        assert_eq!(items.len(), 3);
        assert!(matches!(
            ctx.kind(items[1]),
            Some(AstKind::Spd(SpdNode::Production(Production::Reference { target }))) if *target == items[0]
        ));
        assert!(matches!(
            ctx.kind(items[2]),
            Some(AstKind::Spd(SpdNode::Production(Production::Reference { target }))) if *target == hook_body
        ));
    }

    #[test]
    fn synthesize_struct_and_parser_builds_fields_and_function() {
        let mut ctx = AstContext::new();
        let loc = Location::synthetic();
        let uint8 = ctx.alloc(
            AstKind::Type(UnqualifiedType::new(crate::types::TypeClass::Integer { bits: 8, signed: false })),
            loc.clone(),
        );
        let bytes = ctx.alloc(
            AstKind::Type(UnqualifiedType::new(crate::types::TypeClass::Bytes)),
            loc.clone(),
        );
        let mut x = field("x");
        x.field_type = FieldType::Type(uint8);
        let mut y = field("y");
        y.field_type = FieldType::Type(bytes);

        let unit = UnitType {
            name: "U".to_string(),
            fields: vec![x, y],
            variables: Vec::new(),
            sinks: Vec::new(),
            hooks: Vec::new(),
            properties: Vec::new(),
        };

        let (struct_decl, parse_fn) = synthesize_struct_and_parser(&mut ctx, &loc, &unit);

        let Some(AstKind::Declaration(decl)) = ctx.kind(struct_decl) else {
            panic!("expected a struct declaration");
        };
        assert_eq!(decl.id, "U");
        let DeclKind::Type { ty } = &decl.kind else {
            panic!("expected DeclKind::Type");
        };
        let ty = *ty;
        let Some(AstKind::Type(t)) = ctx.kind(ty) else {
            panic!("expected a type node");
        };
        let crate::types::TypeClass::Struct { fields, .. } = &t.class else {
            panic!("expected TypeClass::Struct");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(t.declaration, Some(struct_decl));

        let field_names: Vec<&str> = fields
            .iter()
            .map(|&h| match ctx.kind(h) {
                Some(AstKind::Declaration(d)) => d.id.as_str(),
                _ => panic!("expected a field declaration"),
            })
            .collect();
        assert_eq!(field_names, vec!["x", "y"]);

        let Some(AstKind::Declaration(parse_decl)) = ctx.kind(parse_fn) else {
            panic!("expected a function declaration");
        };
        assert_eq!(parse_decl.id, "parseU");
        assert!(matches!(
            parse_decl.kind,
            DeclKind::Function { result, body: None, .. } if result == ty
        ));
    }

    #[test]
    fn lower_unit_rejects_sink_with_unknown_target() {
        let mut ctx = AstContext::new();
        let loc = Location::synthetic();
        let unit = UnitType {
            name: "Frame".to_string(),
            fields: Vec::new(),
            variables: Vec::new(),
            sinks: vec![SinkType { name: "out".to_string(), target_field: "missing".to_string() }],
            hooks: Vec::new(),
            properties: Vec::new(),
        };
        let err = lower_unit(&mut ctx, &loc, &unit).unwrap_err();
        assert!(matches!(err, AstError::UnresolvedName(_)));
    }
}
