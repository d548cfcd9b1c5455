#![doc = r#"
hil-ast — the AST processing core of the HIL/SPD compiler front-end.

Five interlocking subsystems built around a single arena-owned node
substrate and generalized to this crate's own node/type/module model:

- [`node`]: the node substrate (arena + generation-checked handles).
- [`types`]: unqualified/qualified types and the `follow`/`same` helpers.
- [`ast`]: the closed union of declaration/statement/expression/ctor kinds.
- [`module`]: the module registry (dedup by UID / path / (name, scope)).
- [`visitor`]: pre/post traversal plus the mutating rewriter.
- [`unify`]: the type unifier's canonical-string assignment.
- [`idassign`]: fully-qualified and canonical ID assignment.
- [`operators`]: operator overload resolution and coercion.
- [`driver`]: the fixed-point pass orchestrator.
- [`spd`]: parser-description unit/production node kinds.
"#]

pub mod ast;
pub mod driver;
pub mod error;
pub mod idassign;
pub mod module;
pub mod node;
pub mod operators;
pub mod spd;
pub mod types;
pub mod unify;
pub mod visitor;

pub use ast::AstKind;
pub use driver::{Driver, DriverConfig, DriverState, Plugin};
pub use error::{AstError, Diagnostic};
pub use module::{ModuleRegistry, ModuleUid};
pub use node::{AstContext, NodeHandle};
pub use spd::SpdLoweringPlugin;
