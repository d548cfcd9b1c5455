//! End-to-end scenarios exercising the resolver components together,
//! mirroring the concrete walkthroughs used to validate this pipeline:
//! a trivial global variable, overload resolution, and an ambiguous
//! operator. Recursive-type unification (the cyclic-struct case) has its
//! own focused test alongside the unifier in `src/unify.rs`.

use hil_ast::ast::{AstKind, DeclKind, Declaration, Linkage, ModuleDecl};
use hil_ast::driver::{Driver, DriverConfig};
use hil_ast::module::{ModuleRegistry, ModuleUid, RawModule, SourceParser};
use hil_ast::node::{AstContext, Location};
use hil_ast::operators::{
    ArithmeticOp, CoercionStyle, Instantiate, InstantiateMeta, Operator, OperatorKind,
    OperatorRegistry, OperandMode, OperandSpec, ResolvedOperator, Signature,
};
use hil_ast::spd::{EngineKind, FieldType, HookDecl, SinkType, SpdLoweringPlugin, SpdNode, UnitField, UnitType};
use hil_ast::types::{TypeClass, UnqualifiedType, Unification};
use hil_ast::{AstError, NodeHandle};

fn alloc_type(ctx: &mut AstContext, ty: UnqualifiedType) -> NodeHandle {
    ctx.alloc(AstKind::Type(ty), Location::synthetic())
}

fn resolved_int(ctx: &mut AstContext, bits: u16) -> NodeHandle {
    let handle = alloc_type(
        ctx,
        UnqualifiedType::new(TypeClass::Integer {
            bits,
            signed: true,
        }),
    );
    let rounds = hil_ast::unify::unify_round(ctx, &[handle]);
    assert_eq!(rounds.newly_set, 1);
    handle
}

/// S1 — trivial: `global int<32> x = 1;` gets canonical ID `mod::x` and a
/// set unification string, with zero errors.
#[test]
fn s1_trivial_global_variable() {
    let mut ctx = AstContext::new();
    let int_ty = resolved_int(&mut ctx, 32);

    let decl = Declaration::new(
        "x",
        Linkage::Public,
        DeclKind::GlobalVar {
            ty: int_ty,
            init: None,
        },
    );
    let x = ctx.alloc(AstKind::Declaration(decl), Location::synthetic());

    let mut scope = std::collections::HashMap::new();
    scope.insert(x, vec!["mod".to_string()]);
    let round = hil_ast::idassign::assign_round(&mut ctx, &[x], &scope).unwrap();
    assert_eq!(round.newly_assigned, 1);

    let Some(AstKind::Declaration(d)) = ctx.kind(x) else {
        panic!("expected declaration")
    };
    assert_eq!(d.canonical_id.as_deref(), Some("mod::x"));

    let Some(AstKind::Type(t)) = ctx.kind(int_ty) else {
        panic!("expected type")
    };
    assert_eq!(t.unification.as_str(), Some("integer<32s>"));

    hil_ast::idassign::check_unique_canonical_ids(&ctx, &[x]).unwrap();
}

/// `spec.md`'s module-UID contract: two modules sharing a name in
/// different scopes don't collide.
#[test]
fn module_uids_distinguish_by_scope() {
    let mut registry = hil_ast::module::ModuleRegistry::new();
    let a = ModuleUid::new("A", "/src/A.hil", "hil", None, "global");
    let a_local = ModuleUid::new("A", "/other/A.hil", "hil", None, "local");
    registry.insert(a, NodeHandle::default()).unwrap();
    registry.insert(a_local, NodeHandle::default()).unwrap();
    registry.check_consistency().unwrap();
}

struct ConstOperator {
    result_type: NodeHandle,
}

impl Instantiate for ConstOperator {
    fn instantiate(
        &self,
        _operands: &[NodeHandle],
        _meta: &InstantiateMeta,
    ) -> Result<ResolvedOperator, AstError> {
        Ok(ResolvedOperator {
            operator: hil_ast::operators::OperatorId(0),
            result_type: self.result_type,
        })
    }
}

/// S3 — overload resolution: `function f(x: int<32>)` and
/// `function f(x: string)` with a call `f(42)` resolves to the int<32>
/// overload.
#[test]
fn s3_overload_resolution_picks_matching_type() {
    let mut ctx = AstContext::new();
    let int_ty = resolved_int(&mut ctx, 32);
    let string_ty = alloc_type(&mut ctx, UnqualifiedType::new(TypeClass::Str));
    let rounds = hil_ast::unify::unify_round(&mut ctx, &[string_ty]);
    assert_eq!(rounds.newly_set, 1);

    let void_ty = alloc_type(&mut ctx, UnqualifiedType::new(TypeClass::Void));
    hil_ast::unify::unify_round(&mut ctx, &[void_ty]);

    let mut registry = OperatorRegistry::new();
    let int_overload = registry.register(Operator {
        kind: OperatorKind::Call,
        signature: Signature {
            operands: vec![OperandSpec {
                mode: OperandMode::In,
                ty: int_ty,
                default: None,
                optional: false,
            }],
            result: void_ty,
            commutative: false,
        },
        declaring_scope: None,
        instantiate: Box::new(ConstOperator { result_type: void_ty }),
    });
    registry.register(Operator {
        kind: OperatorKind::Call,
        signature: Signature {
            operands: vec![OperandSpec {
                mode: OperandMode::In,
                ty: string_ty,
                default: None,
                optional: false,
            }],
            result: void_ty,
            commutative: false,
        },
        declaring_scope: None,
        instantiate: Box::new(ConstOperator { result_type: void_ty }),
    });

    let call_site = hil_core::NodeId::new_synthetic();
    let resolved = registry
        .resolve(&ctx, call_site, OperatorKind::Call, &[int_ty])
        .unwrap();
    assert_eq!(resolved, Some(int_overload));
}

/// S5 — ambiguous operator: two equally-good `==` candidates for `a == b`
/// produce `AmbiguousOperator` naming both candidates.
#[test]
fn s5_ambiguous_operator_reports_both_candidates() {
    let mut ctx = AstContext::new();
    let int_ty = resolved_int(&mut ctx, 32);
    let bool_ty = alloc_type(&mut ctx, UnqualifiedType::new(TypeClass::Bool));
    hil_ast::unify::unify_round(&mut ctx, &[bool_ty]);

    let mut registry = OperatorRegistry::new();
    for _ in 0..2 {
        registry.register(Operator {
            kind: OperatorKind::Equality,
            signature: Signature {
                operands: vec![
                    OperandSpec {
                        mode: OperandMode::In,
                        ty: int_ty,
                        default: None,
                        optional: false,
                    },
                    OperandSpec {
                        mode: OperandMode::In,
                        ty: int_ty,
                        default: None,
                        optional: false,
                    },
                ],
                result: bool_ty,
                commutative: true,
            },
            declaring_scope: None,
            instantiate: Box::new(ConstOperator { result_type: bool_ty }),
        });
    }

    let call_site = hil_core::NodeId::new_synthetic();
    let err = registry
        .resolve(&ctx, call_site, OperatorKind::Equality, &[int_ty, int_ty])
        .unwrap_err();
    match err {
        AstError::AmbiguousOperator { candidates, .. } => assert_eq!(candidates.len(), 2),
        other => panic!("expected AmbiguousOperator, got {other:?}"),
    }
}

/// `spec.md §4.5`: an implicit widening int8 -> int32 coercion succeeds by
/// producing a wrapper node rather than failing or mutating in place.
#[test]
fn implicit_widening_coercion_wraps_rather_than_fails() {
    let mut ctx = AstContext::new();
    let small = resolved_int(&mut ctx, 8);
    let big = resolved_int(&mut ctx, 32);
    let value = ctx.alloc(
        AstKind::Expression(hil_ast::ast::Expression::Void),
        Location::synthetic(),
    );

    let implicit = hil_ast::operators::coerce(
        &ctx,
        value,
        small,
        big,
        CoercionStyle::IMPLICIT_ALLOWED,
    );
    assert!(matches!(implicit, hil_ast::operators::CoercionResult::Wrapped(_)));

    let without_implicit = hil_ast::operators::coerce(&ctx, value, small, big, CoercionStyle::EXPLICIT_ONLY);
    assert!(matches!(
        without_implicit,
        hil_ast::operators::CoercionResult::Wrapped(_)
    ));
}

#[test]
fn arithmetic_operator_kind_is_distinct_per_op() {
    assert_ne!(
        OperatorKind::Arithmetic(ArithmeticOp::Add),
        OperatorKind::Arithmetic(ArithmeticOp::Sub)
    );
}

#[test]
fn never_match_type_is_distinguishable_from_unset() {
    let mut ctx = AstContext::new();
    let placeholder = alloc_type(&mut ctx, UnqualifiedType::never_match(TypeClass::Unknown));
    let Some(AstKind::Type(t)) = ctx.kind(placeholder) else {
        panic!()
    };
    assert_eq!(t.unification, Unification::NeverMatch);
    assert!(!t.unification.is_set());
}

struct FixtureParser;

impl SourceParser for FixtureParser {
    fn parse(&self, path: &std::path::Path, process_ext: Option<&str>) -> Result<RawModule, AstError> {
        let name = path.file_stem().unwrap().to_string_lossy().into_owned();
        let contents = std::fs::read_to_string(path).unwrap_or_default();
        let imports = contents
            .lines()
            .filter_map(|line| line.strip_prefix("import "))
            .map(|rest| rest.trim().to_string())
            .collect();
        Ok(RawModule {
            uid: ModuleUid::new(name, path.to_path_buf(), "hil", process_ext.map(String::from), "global"),
            root: NodeHandle::default(),
            imports,
        })
    }
}

/// S2 — cross-module import: module `b` imports module `a` via
/// `importModule`, and the dependency closure is empty until `processAST`
/// marks it ready, at which point `b` sees `a` as a direct dependency.
#[test]
fn s2_cross_module_import_populates_dependency_closure() {
    let dir = std::env::temp_dir().join(format!("hil-ast-s2-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("a.hil"), "").unwrap();

    let mut registry = ModuleRegistry::new();
    let a = registry
        .parse_source(&FixtureParser, &dir.join("a.hil"), None)
        .unwrap();
    let b = ModuleUid::new("b", dir.join("b.hil"), "hil", None, "global");
    registry.insert(b.clone(), NodeHandle::default()).unwrap();

    let found = registry
        .import_module(&FixtureParser, &b, "a", "global", "hil", None, &[dir.clone()])
        .unwrap();
    assert_eq!(found, a);

    assert!(registry.dependencies(&b, false).is_empty());
    registry.mark_dependencies_ready();
    assert_eq!(registry.dependencies(&b, false), vec![a.clone()]);
    assert_eq!(registry.dependencies(&b, true), vec![a]);

    std::fs::remove_dir_all(&dir).ok();
}

fn alloc_module(ctx: &mut AstContext, name: &str) -> NodeHandle {
    let uid = ModuleUid::new(name, format!("/src/{name}.hil"), "hil", None, "global");
    let module = ctx.alloc(
        AstKind::Module(ModuleDecl {
            uid,
            fully_qualified_id: None,
            canonical_id: None,
            imports: Vec::new(),
        }),
        Location::synthetic(),
    );
    let root = ctx.root().unwrap_or_else(|| {
        let r = ctx.alloc(AstKind::Root, Location::synthetic());
        ctx.set_root(r);
        r
    });
    ctx.add_child(root, module).unwrap();
    module
}

/// S6 — SPD lowering end-to-end: a unit with one unresolved field naming a
/// module-level type declaration, a sink draining it, and a hook, driven
/// through `Driver::process_ast` with [`SpdLoweringPlugin`] resolves the
/// field during the resolve loop and lowers the unit into a production
/// graph during transform, exactly the `buildScopes -> resolve -> transform`
/// loop `spec.md §4.8`/`§4.9` describe.
#[test]
fn s6_spd_unit_resolves_and_lowers_through_driver() {
    let mut ctx = AstContext::new();
    let module = alloc_module(&mut ctx, "proto");

    let byte_ty = ctx.alloc(
        AstKind::Type(UnqualifiedType::new(TypeClass::Integer { bits: 8, signed: false })),
        Location::synthetic(),
    );
    let type_decl = ctx.alloc(
        AstKind::Declaration(Declaration::new(
            "Byte",
            Linkage::Public,
            DeclKind::Type { ty: byte_ty },
        )),
        Location::synthetic(),
    );
    ctx.add_child(module, type_decl).unwrap();

    let hook_body = ctx.alloc(AstKind::Expression(hil_ast::ast::Expression::Void), Location::synthetic());

    let unit_field = UnitField {
        name: "header".to_string(),
        field_type: FieldType::Unresolved("Byte".to_string()),
        repeat: None,
        guard: None,
        arguments: Vec::new(),
        sinks: Vec::new(),
        hooks: Vec::new(),
    };
    let unit = UnitType {
        name: "U".to_string(),
        fields: vec![unit_field],
        variables: Vec::new(),
        sinks: vec![SinkType { name: "out".to_string(), target_field: "header".to_string() }],
        hooks: vec![HookDecl {
            name: "onStart".to_string(),
            engine: EngineKind::Sync,
            body: hook_body,
        }],
        properties: Vec::new(),
    };
    let unit_handle = ctx.alloc(AstKind::Spd(SpdNode::Unit(unit)), Location::synthetic());
    ctx.add_child(module, unit_handle).unwrap();

    let policy = hil_error::NoopPolicy;
    let mut driver = Driver::new(DriverConfig::default(), &policy);
    let mut plugins: Vec<Box<dyn hil_ast::driver::Plugin>> = vec![Box::new(SpdLoweringPlugin)];
    driver.process_ast(&mut ctx, &mut plugins).unwrap();

    let Some(AstKind::Spd(SpdNode::Unit(resolved))) = ctx.kind(unit_handle) else {
        panic!("expected unit node to survive");
    };
    assert_eq!(resolved.fields[0].field_type, FieldType::Type(byte_ty));

    let production = ctx
        .children_present(unit_handle)
        .next()
        .expect("transform should hang a production graph off the unit");
    let Some(AstKind::Spd(SpdNode::Production(hil_ast::spd::Production::Sequence { items }))) =
        ctx.kind(production)
    else {
        panic!("expected a top-level Sequence production");
    };
    // one lowered field + one sink reference + one hook reference
    assert_eq!(items.len(), 3);

    // module now also contains the synthesized struct `U` (one field,
    // `header`) and its parse function, alongside the original type
    // declaration and the (retained) unit declaration.
    let new_decls: Vec<(String, DeclKind)> = ctx
        .children_present(module)
        .filter_map(|h| match ctx.kind(h) {
            Some(AstKind::Declaration(d)) if d.id == "U" || d.id == "parseU" => {
                Some((d.id.clone(), d.kind.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(new_decls.len(), 2);

    let struct_decl = new_decls.iter().find(|(id, _)| id == "U").unwrap();
    let DeclKind::Type { ty } = &struct_decl.1 else {
        panic!("expected the synthesized struct to be a DeclKind::Type");
    };
    let ty = *ty;
    let Some(AstKind::Type(t)) = ctx.kind(ty) else {
        panic!("expected a type node");
    };
    let TypeClass::Struct { fields, .. } = &t.class else {
        panic!("expected TypeClass::Struct");
    };
    assert_eq!(fields.len(), 1);
    assert!(matches!(
        ctx.kind(fields[0]),
        Some(AstKind::Declaration(d)) if d.id == "header"
    ));

    let parse_fn = new_decls.iter().find(|(id, _)| id == "parseU").unwrap();
    assert!(matches!(parse_fn.1, DeclKind::Function { body: None, .. }));
}
