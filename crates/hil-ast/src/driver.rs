//! Pass driver (`spec.md §4.8`, component C8).
//!
//! Central fixed-point state machine. For each registered [`Plugin`], in
//! registration order, runs buildScopes, pre-validate, the resolve loop
//! (unify types / assign IDs / resolve names & operators), post-validate,
//! transform, and — for the final plugin only — optimize.

use std::collections::HashMap;

use colored::Colorize;
use hil_error::{ErrorPolicy, Severity};

use crate::ast::{AstKind, DeclKind, Expression, Statement};
use crate::error::{AstError, Diagnostic};
use crate::node::{AstContext, Location, NodeHandle};
use crate::operators::OperatorKind;
use crate::types::{TypeClass, UnqualifiedType};
use crate::visitor::MutatingVisitor;

/// `spec.md §4.8`: "Idle -> Parsing -> Processing(plugin=i, step=s) -> (back
/// to Processing or) Done | Failed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Parsing,
    Processing { plugin: usize, step: Step },
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    BuildScopes,
    ValidatePre,
    Resolve,
    ValidatePost,
    Transform,
    Optimize,
}

/// Tunables the driver reads instead of process-wide globals (`spec.md
/// §4.8`: "a hard iteration cap (default 50)"; `spec.md §6`: "debug
/// streams... configured at startup and immutable").
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub max_resolve_iterations: u32,
    /// Caps how many times a single plugin's build-scopes..transform
    /// sequence can repeat when `transform` keeps reporting a change
    /// (`spec.md §4.8`'s "each plugin transformer runs at most once per
    /// outer iteration" presupposes this cap; exceeding it is also
    /// `ResolverDiverged`).
    pub max_outer_iterations: u32,
    /// "Give up after first fatal" policy (`spec.md §5`), on by default.
    pub stop_on_first_fatal: bool,
    /// Named debug channels active for this run (`spec.md §6`).
    pub debug_streams: Vec<String>,
    /// When set, `_saveIterationAST` writes a dump per (plugin, round, tag)
    /// under this directory (`spec.md §4.8`, "Iteration dumps").
    pub iteration_dump_dir: Option<std::path::PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            max_resolve_iterations: 50,
            max_outer_iterations: 50,
            stop_on_first_fatal: true,
            debug_streams: Vec::new(),
            iteration_dump_dir: None,
        }
    }
}

/// A plugin's hooks, called by the driver in the order specified in
/// `spec.md §4.8`. A plugin owns one or more parse-extensions and exactly
/// one process-extension (`spec.md §6`).
pub trait Plugin {
    fn process_extension(&self) -> &str;

    fn pre_validate(&mut self, ctx: &AstContext, modules: &[NodeHandle]) -> Vec<AstError>;

    /// Resolver visitor: attempts to resolve names and operators on this
    /// pass, recording every change through `visitor`. Returning an `Err`
    /// aborts the driver immediately (reserved for `InvariantViolation`).
    fn resolve(
        &mut self,
        ctx: &mut AstContext,
        modules: &[NodeHandle],
        visitor: &mut MutatingVisitor<NoopVisitor>,
    ) -> Result<(), AstError>;

    fn post_validate(&mut self, ctx: &AstContext, modules: &[NodeHandle]) -> Vec<AstError>;

    /// Lowering pass; may add new declarations, which re-enter the
    /// pipeline on the next outer iteration (`spec.md §4.8`).
    fn transform(
        &mut self,
        ctx: &mut AstContext,
        modules: &[NodeHandle],
    ) -> Result<bool, AstError>;

    /// Only invoked for the final registered plugin (`spec.md §4.8`).
    fn optimize(&mut self, _ctx: &mut AstContext, _modules: &[NodeHandle]) -> Result<bool, AstError> {
        Ok(false)
    }
}

/// A `Visitor` that does nothing, handed to plugins that only need the
/// `MutatingVisitor` change-tracking half and not the read-only dispatch
/// half.
#[derive(Default)]
pub struct NoopVisitor;

impl crate::visitor::Visitor for NoopVisitor {
    fn visit(&mut self, _ctx: &AstContext, _handle: NodeHandle, _order: crate::visitor::Order) {}
}

/// Orchestrates the fixed point across every registered plugin
/// (`spec.md §4.8`).
pub struct Driver<'a> {
    pub config: DriverConfig,
    pub policy: &'a dyn ErrorPolicy,
    state: DriverState,
}

impl<'a> Driver<'a> {
    pub fn new(config: DriverConfig, policy: &'a dyn ErrorPolicy) -> Self {
        Driver {
            config,
            policy,
            state: DriverState::Idle,
        }
    }

    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// Runs every plugin to a fixed point over `ctx`'s current module list.
    /// On success the root's modules are each fully resolved; on failure
    /// returns the collected `(Location, severity, message)` diagnostics
    /// from `spec.md §6`'s outbound contract, leaving the AST in whatever
    /// partial state resolution reached.
    pub fn process_ast(
        &mut self,
        ctx: &mut AstContext,
        plugins: &mut [Box<dyn Plugin>],
    ) -> Result<(), Vec<Diagnostic>> {
        self.state = DriverState::Parsing;
        ctx.begin_processing();
        let result = self.run(ctx, plugins);
        ctx.end_processing();
        match &result {
            Ok(()) => {
                self.state = DriverState::Done;
                ctx.modules.mark_dependencies_ready();
                if self.config.debug_streams.iter().any(|s| s == "ast-stats") {
                    println!("{}", self.ast_stats_line(ctx, plugins.len()));
                }
            }
            Err(_) => self.state = DriverState::Failed,
        }
        result
    }

    fn run(
        &mut self,
        ctx: &mut AstContext,
        plugins: &mut [Box<dyn Plugin>],
    ) -> Result<(), Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();
        let plugin_count = plugins.len();

        for (i, plugin) in plugins.iter_mut().enumerate() {
            // Each plugin's build-scopes..transform sequence re-enters
            // itself whenever `transform` reports a change, so declarations
            // synthesized by this plugin get scopes, resolution, and
            // validation within this same `process_ast` call instead of
            // only being picked up by a later plugin (`spec.md §2(f)`,
            // `spec.md §4.8` step 5).
            let mut outer_iteration = 0;
            loop {
                if outer_iteration >= self.config.max_outer_iterations {
                    diagnostics.push(Diagnostic::from_error(
                        None,
                        &AstError::ResolverDiverged(self.config.max_outer_iterations),
                    ));
                    return Err(diagnostics);
                }

                let modules: Vec<NodeHandle> = ctx
                    .root()
                    .map(|r| ctx.children_present(r).collect())
                    .unwrap_or_default();

                self.state = DriverState::Processing {
                    plugin: i,
                    step: Step::BuildScopes,
                };
                if ctx.rebuild_scopes {
                    build_scopes(ctx, &modules);
                    ctx.rebuild_scopes = false;
                }

                self.state = DriverState::Processing {
                    plugin: i,
                    step: Step::ValidatePre,
                };
                let pre_errors = plugin.pre_validate(ctx, &modules);
                if self.collect_and_check_fatal(&mut diagnostics, pre_errors) {
                    return Err(diagnostics);
                }

                self.state = DriverState::Processing {
                    plugin: i,
                    step: Step::Resolve,
                };
                if let Err(e) = self.resolve_loop(ctx, &modules, plugin.as_mut()) {
                    diagnostics.push(Diagnostic::from_error(None, &e));
                    return Err(diagnostics);
                }

                self.state = DriverState::Processing {
                    plugin: i,
                    step: Step::ValidatePost,
                };
                let post_errors = plugin.post_validate(ctx, &modules);
                if self.collect_and_check_fatal(&mut diagnostics, post_errors) {
                    return Err(diagnostics);
                }

                self.state = DriverState::Processing {
                    plugin: i,
                    step: Step::Transform,
                };
                let changed = match plugin.transform(ctx, &modules) {
                    Ok(changed) => changed,
                    Err(e) => {
                        diagnostics.push(Diagnostic::from_error(None, &e));
                        return Err(diagnostics);
                    }
                };

                outer_iteration += 1;
                if !changed {
                    break;
                }
                ctx.rebuild_scopes = true;
            }

            if i + 1 == plugin_count {
                let modules: Vec<NodeHandle> = ctx
                    .root()
                    .map(|r| ctx.children_present(r).collect())
                    .unwrap_or_default();
                self.state = DriverState::Processing {
                    plugin: i,
                    step: Step::Optimize,
                };
                if let Err(e) = plugin.optimize(ctx, &modules) {
                    diagnostics.push(Diagnostic::from_error(None, &e));
                    return Err(diagnostics);
                }
            }
        }

        if diagnostics.iter().any(|d| d.severity == Severity::Fatal) {
            return Err(diagnostics);
        }
        Ok(())
    }

    /// `spec.md §4.8`'s resolve loop: alternate unify / assign IDs /
    /// resolve names & operators until a full round is a no-op, capped at
    /// `max_resolve_iterations` (exceeding it is `ResolverDiverged`).
    fn resolve_loop(
        &mut self,
        ctx: &mut AstContext,
        modules: &[NodeHandle],
        plugin: &mut dyn Plugin,
    ) -> Result<(), AstError> {
        let type_nodes = collect_type_nodes(ctx, modules);
        let decl_nodes = collect_declaration_nodes(ctx, modules);
        let scope_of: HashMap<NodeHandle, Vec<String>> = decl_nodes
            .iter()
            .filter_map(|&h| ctx.scope_path(h).map(|path| (h, path.to_vec())))
            .collect();

        for iteration in 0..self.config.max_resolve_iterations {
            let unify_result = crate::unify::unify_round(ctx, &type_nodes);
            let assign_result = crate::idassign::assign_round(ctx, &decl_nodes, &scope_of)?;
            let desugared = desugar_switch_cases(ctx, modules);

            let mut visitor = MutatingVisitor::new(NoopVisitor);
            plugin.resolve(ctx, modules, &mut visitor)?;
            self.dump_iteration(ctx, iteration);

            tracing::debug!(
                target: "resolver",
                iteration,
                newly_set = unify_result.newly_set,
                newly_assigned = assign_result.newly_assigned,
                desugared,
                modified = visitor.is_modified(),
                "resolve round",
            );

            let no_progress = unify_result.newly_set == 0
                && assign_result.newly_assigned == 0
                && desugared == 0
                && !visitor.is_modified();
            if no_progress {
                if cfg!(debug_assertions) {
                    crate::idassign::debug_assert_all_assigned(ctx, &decl_nodes);
                }
                return Ok(());
            }
        }
        Err(AstError::ResolverDiverged(self.config.max_resolve_iterations))
    }

    fn collect_and_check_fatal(
        &mut self,
        diagnostics: &mut Vec<Diagnostic>,
        errors: Vec<AstError>,
    ) -> bool {
        let mut saw_fatal = false;
        for error in errors {
            let diagnostic = Diagnostic::from_error(None, &error);
            if diagnostic.severity == Severity::Fatal {
                saw_fatal = true;
            }
            let hil_err: hil_error::Error = error.into();
            self.policy.emit(&hil_err);
            diagnostics.push(diagnostic);
        }
        saw_fatal && self.config.stop_on_first_fatal
    }

    /// One-line colorized summary for the `ast-stats` debug stream
    /// (`spec.md §6`).
    fn ast_stats_line(&self, ctx: &AstContext, plugin_count: usize) -> String {
        let module_count = ctx
            .root()
            .map(|r| ctx.children_present(r).count())
            .unwrap_or(0);
        format!(
            "{} modules={} plugins={}",
            "ast-stats".blue().bold(),
            module_count.to_string().green(),
            plugin_count.to_string().green(),
        )
    }

    fn dump_iteration(&self, ctx: &AstContext, iteration: u32) {
        let Some(dir) = &self.config.iteration_dump_dir else {
            return;
        };
        if self.config.debug_streams.is_empty() {
            return;
        }
        let structural_path = dir.join(format!("iter-{iteration:03}.struct.json"));
        let _ = std::fs::create_dir_all(dir);
        let _ = std::fs::write(
            structural_path,
            serde_json::to_string_pretty(&ctx.root()).unwrap_or_default(),
        );
    }
}

/// Walks every module, populating per-scope symbol tables on container
/// nodes (module, function, struct/union type) and caching each
/// declaration's enclosing scope path (`spec.md §4.8`, step 1). Installed
/// onto `ctx` via [`AstContext::install_scopes`] so `resolve_loop` and
/// [`crate::spd`]'s name lookup can both read it without re-walking.
fn build_scopes(ctx: &mut AstContext, modules: &[NodeHandle]) {
    let mut builder = ScopeBuilder::default();
    for &module in modules {
        builder.stack.clear();
        crate::visitor::walk(ctx, module, &mut builder, false);
    }
    ctx.install_scopes(builder.scopes, builder.decl_scope_paths);
}

/// Name under which `handle` introduces a scope, if it does. A module, a
/// function declaration, and a struct/union type are the container kinds
/// `spec.md §4.8` means by "per-scope symbol tables".
fn container_name(ctx: &AstContext, handle: NodeHandle) -> Option<String> {
    match ctx.kind(handle) {
        Some(AstKind::Module(m)) => Some(m.uid.name.clone()),
        Some(AstKind::Declaration(d)) if matches!(d.kind, DeclKind::Function { .. }) => {
            Some(d.id.clone())
        }
        Some(AstKind::Type(t)) if matches!(t.class, TypeClass::Struct { .. } | TypeClass::Union { .. }) => {
            Some(anon_container_name(ctx, handle, t))
        }
        _ => None,
    }
}

/// A struct/union type's name is carried by the declaration that introduced
/// it, not by the type node itself; falls back to a handle-derived name for
/// an anonymous struct literal with no owning declaration.
fn anon_container_name(ctx: &AstContext, handle: NodeHandle, t: &UnqualifiedType) -> String {
    if let Some(decl_handle) = t.declaration {
        if let Some(AstKind::Declaration(d)) = ctx.kind(decl_handle) {
            return d.id.clone();
        }
    }
    format!("anon{handle}")
}

/// Collects per-container symbol tables and per-declaration scope paths in
/// a single walk. A [`Visitor`](crate::visitor::Visitor) only gets read
/// access to the context, so results are accumulated here and installed
/// onto `ctx` once the walk finishes.
#[derive(Default)]
struct ScopeBuilder {
    scopes: HashMap<NodeHandle, HashMap<String, NodeHandle>>,
    decl_scope_paths: HashMap<NodeHandle, Vec<String>>,
    stack: Vec<(NodeHandle, String)>,
}

impl ScopeBuilder {
    fn current_path(&self) -> Vec<String> {
        self.stack.iter().map(|(_, name)| name.clone()).collect()
    }
}

impl crate::visitor::Visitor for ScopeBuilder {
    fn visit(&mut self, ctx: &AstContext, handle: NodeHandle, order: crate::visitor::Order) {
        if order == crate::visitor::Order::Pre {
            if let Some(AstKind::Declaration(d)) = ctx.kind(handle) {
                self.decl_scope_paths.insert(handle, self.current_path());
                if let Some(&(container, _)) = self.stack.last() {
                    self.scopes
                        .entry(container)
                        .or_default()
                        .insert(d.id.clone(), handle);
                }
            }
            if let Some(name) = container_name(ctx, handle) {
                self.stack.push((handle, name));
            }
        } else if container_name(ctx, handle).is_some() {
            self.stack.pop();
        }
    }
}

/// Desugars every unresolved `switch` case to `scrutinee == label`
/// (`spec.md §4.9`: "each case preprocesses expressions to `__x == E`"),
/// building the comparison once per case and leaving it for the normal
/// operator-resolution machinery to resolve like any other equality
/// expression. Returns how many cases were newly desugared this round.
fn desugar_switch_cases(ctx: &mut AstContext, modules: &[NodeHandle]) -> usize {
    let switches = collect_switch_nodes(ctx, modules);
    let mut newly_built = 0;
    for handle in switches {
        let location = ctx
            .location(handle)
            .cloned()
            .unwrap_or_else(Location::synthetic);
        let Some(AstKind::Statement(Statement::Switch { scrutinee, cases, .. })) = ctx.kind(handle)
        else {
            continue;
        };
        let scrutinee = *scrutinee;
        let pending: Vec<(usize, NodeHandle)> = cases
            .iter()
            .enumerate()
            .filter(|(_, case)| case.desugared_condition.is_none())
            .map(|(i, case)| (i, case.label))
            .collect();
        for (index, label) in pending {
            let condition = ctx.alloc(
                AstKind::Expression(Expression::UnresolvedOperator {
                    kind: OperatorKind::Equality,
                    operands: vec![scrutinee, label],
                }),
                location.clone(),
            );
            if let Some(AstKind::Statement(Statement::Switch { cases, .. })) = ctx.kind_mut(handle) {
                cases[index].desugared_condition = Some(condition);
                newly_built += 1;
            }
        }
    }
    newly_built
}

fn collect_switch_nodes(ctx: &AstContext, modules: &[NodeHandle]) -> Vec<NodeHandle> {
    let mut out = Vec::new();
    let mut visitor = SwitchCollector(&mut out);
    for &module in modules {
        crate::visitor::walk(ctx, module, &mut visitor, false);
    }
    out
}

struct SwitchCollector<'a>(&'a mut Vec<NodeHandle>);

impl crate::visitor::Visitor for SwitchCollector<'_> {
    fn visit(&mut self, ctx: &AstContext, handle: NodeHandle, order: crate::visitor::Order) {
        if order != crate::visitor::Order::Pre {
            return;
        }
        if matches!(ctx.kind(handle), Some(AstKind::Statement(Statement::Switch { .. }))) {
            self.0.push(handle);
        }
    }
}

fn collect_type_nodes(ctx: &AstContext, modules: &[NodeHandle]) -> Vec<NodeHandle> {
    let mut out = Vec::new();
    let mut visitor = TypeCollector(&mut out);
    for &module in modules {
        crate::visitor::walk(ctx, module, &mut visitor, false);
    }
    out
}

struct TypeCollector<'a>(&'a mut Vec<NodeHandle>);

impl crate::visitor::Visitor for TypeCollector<'_> {
    fn visit(&mut self, ctx: &AstContext, handle: NodeHandle, order: crate::visitor::Order) {
        if order != crate::visitor::Order::Pre {
            return;
        }
        if matches!(ctx.kind(handle), Some(AstKind::Type(_))) {
            self.0.push(handle);
        }
    }
}

fn collect_declaration_nodes(ctx: &AstContext, modules: &[NodeHandle]) -> Vec<NodeHandle> {
    let mut out = Vec::new();
    let mut visitor = DeclCollector(&mut out);
    for &module in modules {
        crate::visitor::walk(ctx, module, &mut visitor, false);
    }
    out
}

struct DeclCollector<'a>(&'a mut Vec<NodeHandle>);

impl crate::visitor::Visitor for DeclCollector<'_> {
    fn visit(&mut self, ctx: &AstContext, handle: NodeHandle, order: crate::visitor::Order) {
        if order != crate::visitor::Order::Pre {
            return;
        }
        if matches!(ctx.kind(handle), Some(AstKind::Declaration(_))) {
            self.0.push(handle);
        }
    }
}

