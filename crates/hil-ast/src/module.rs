//! Module registry (`spec.md §4.3`, component C4).
//!
//! Keeps a primary module map plus a `path_index` and `name_scope_index`
//! alongside it so lookups by UID, by file path, and by `(name, scope)`
//! all stay cheap: `UID -> module`, `path -> module`, `(name, scope) ->
//! module`.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AstError;
use crate::node::NodeHandle;

/// `(name, path, parse-extension, process-extension, scope)`
/// (`spec.md §3`, "Module"). Modules are compared and stored by this tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleUid {
    pub name: String,
    pub path: PathBuf,
    pub parse_ext: String,
    pub process_ext: Option<String>,
    pub scope: String,
}

impl ModuleUid {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        parse_ext: impl Into<String>,
        process_ext: Option<String>,
        scope: impl Into<String>,
    ) -> Self {
        ModuleUid {
            name: name.into(),
            path: path.into(),
            parse_ext: parse_ext.into(),
            process_ext,
            scope: scope.into(),
        }
    }

    fn name_scope_key(&self) -> (String, String) {
        (self.name.clone(), self.scope.clone())
    }

    /// Deterministic namespace UUID for this module: same name and scope
    /// always derive the same namespace, which node/type IDs within the
    /// module are then derived from via [`hil_core::NodeId::derive`].
    pub fn namespace(&self) -> uuid::Uuid {
        hil_core::derive_module_namespace(&self.name, &self.scope)
    }
}

/// Abstracts the external parser (`spec.md §6`, "To the parser (inbound)"):
/// `(input-stream, filename) -> Module | ParseError`. Out of scope for this
/// crate's own implementation; a HIL/SPD front-end binary supplies it.
pub trait SourceParser {
    fn parse(&self, path: &std::path::Path, process_ext: Option<&str>) -> Result<RawModule, AstError>;
}

/// A freshly parsed module with no canonical IDs, no scope tables, and no
/// resolved types, exactly as `spec.md §6` requires of the parser's output.
pub struct RawModule {
    pub uid: ModuleUid,
    pub root: NodeHandle,
    pub imports: Vec<String>,
}

struct ModuleEntry {
    handle: NodeHandle,
}

/// Dedup & storage of modules by UID / path / (name, scope) (`spec.md
/// §4.3`). Holds no nodes itself; every entry is a [`NodeHandle`] resolved
/// through the owning [`crate::node::AstContext`].
#[derive(Default)]
pub struct ModuleRegistry {
    by_uid: HashMap<ModuleUid, ModuleEntry>,
    by_path: HashMap<PathBuf, ModuleUid>,
    by_name_scope: HashMap<(String, String), ModuleUid>,
    /// Populated only after `processAST` succeeds (`spec.md §4.3`,
    /// `dependencies`: "Available only once processAST has succeeded").
    dependencies_ready: bool,
    direct_deps: HashMap<ModuleUid, Vec<ModuleUid>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry::default()
    }

    /// Inserts a module under all three indices at once, enforcing
    /// `spec.md §4.3`'s invariant that a module appears in all three
    /// consistently and that inserting an already-indexed key fails with
    /// `DuplicateModule`.
    pub fn insert(&mut self, uid: ModuleUid, handle: NodeHandle) -> Result<(), AstError> {
        if self.by_uid.contains_key(&uid) {
            return Err(AstError::DuplicateModule(uid));
        }
        if self.by_path.contains_key(&uid.path) {
            return Err(AstError::DuplicateModule(uid));
        }
        let name_scope = uid.name_scope_key();
        if self.by_name_scope.contains_key(&name_scope) {
            return Err(AstError::DuplicateModule(uid));
        }
        self.by_path.insert(uid.path.clone(), uid.clone());
        self.by_name_scope.insert(name_scope, uid.clone());
        self.by_uid.insert(uid, ModuleEntry { handle });
        Ok(())
    }

    pub fn get_module(&self, uid: &ModuleUid) -> Option<NodeHandle> {
        self.by_uid.get(uid).map(|e| e.handle)
    }

    pub fn get_by_path(&self, path: &std::path::Path) -> Option<&ModuleUid> {
        self.by_path.get(path)
    }

    pub fn get_by_name_scope(&self, name: &str, scope: &str) -> Option<&ModuleUid> {
        self.by_name_scope
            .get(&(name.to_string(), scope.to_string()))
    }

    pub fn contains_path(&self, path: &std::path::Path) -> bool {
        self.by_path.contains_key(path)
    }

    /// `parseSource(path, processExt?)` (`spec.md §4.3`): if `path` already
    /// mapped, returns its UID without reparsing; otherwise invokes
    /// `parser`, then registers the result.
    pub fn parse_source(
        &mut self,
        parser: &dyn SourceParser,
        path: &std::path::Path,
        process_ext: Option<&str>,
    ) -> Result<ModuleUid, AstError> {
        if let Some(uid) = self.get_by_path(path) {
            return Ok(uid.clone());
        }
        let raw = parser.parse(path, process_ext)?;
        self.insert(raw.uid.clone(), raw.root)?;
        self.direct_deps.insert(
            raw.uid.clone(),
            raw.imports
                .iter()
                .filter_map(|name| self.get_by_name_scope(name, &raw.uid.scope).cloned())
                .collect(),
        );
        Ok(raw.uid)
    }

    /// `importModule(importer, id, scope?, parse_ext, process_ext?,
    /// searchDirs)` (`spec.md §4.3`): canonicalizes `(id, scope)`, and on a
    /// miss, tries each directory in order, parsing the first match. Unlike
    /// `parse_source`, this is the forward/on-demand import path, so it also
    /// backfills `importer`'s `direct_deps` entry with the resolved target.
    ///
    /// Mutual and longer circular imports between modules are not rejected
    /// here: `spec.md §1` names "honoring circular imports" as one of the
    /// registry's core responsibilities, and this on-demand path is never
    /// the "eager inclusion" `spec.md §7` reserves `ImportFailure`'s cycle
    /// case for (there is no textual-inclusion mechanism in this core to be
    /// eager about). `dependencies(uid, true)` is cycle-safe regardless,
    /// via its own `seen` set.
    pub fn import_module(
        &mut self,
        parser: &dyn SourceParser,
        importer: &ModuleUid,
        id: &str,
        scope: &str,
        parse_ext: &str,
        process_ext: Option<&str>,
        search_dirs: &[PathBuf],
    ) -> Result<ModuleUid, AstError> {
        let target = self.resolve_target(parser, id, scope, parse_ext, process_ext, search_dirs)?;
        let deps = self.direct_deps.entry(importer.clone()).or_default();
        if !deps.contains(&target) {
            deps.push(target.clone());
        }
        Ok(target)
    }

    fn resolve_target(
        &mut self,
        parser: &dyn SourceParser,
        id: &str,
        scope: &str,
        parse_ext: &str,
        process_ext: Option<&str>,
        search_dirs: &[PathBuf],
    ) -> Result<ModuleUid, AstError> {
        if let Some(uid) = self.get_by_name_scope(id, scope) {
            return Ok(uid.clone());
        }
        for dir in search_dirs {
            let candidate = dir.join(format!("{id}.{parse_ext}"));
            if candidate.exists() {
                return self.parse_source(parser, &candidate, process_ext);
            }
        }
        // Direct join missed; fall back to a recursive scan of each search
        // directory rather than assuming a flat layout.
        let file_name = format!("{id}.{parse_ext}");
        for dir in search_dirs {
            let found = walkdir::WalkDir::new(dir)
                .into_iter()
                .filter_map(Result::ok)
                .find(|entry| {
                    entry.file_type().is_file()
                        && entry.file_name().to_string_lossy().as_ref() == file_name
                });
            if let Some(entry) = found {
                return self.parse_source(parser, entry.path(), process_ext);
            }
        }
        log::warn!(target: "module-import", "import {id} not found in {} search dirs", search_dirs.len());
        Err(AstError::ImportFailure(id.to_string()))
    }

    pub fn mark_dependencies_ready(&mut self) {
        self.dependencies_ready = true;
    }

    /// Direct or transitive import closure (`spec.md §4.3`). Returns an
    /// empty vector before `processAST` has succeeded, exactly as spec'd.
    pub fn dependencies(&self, uid: &ModuleUid, recursive: bool) -> Vec<ModuleUid> {
        if !self.dependencies_ready {
            return Vec::new();
        }
        let Some(direct) = self.direct_deps.get(uid) else {
            return Vec::new();
        };
        if !recursive {
            return direct.clone();
        }
        let mut seen: std::collections::HashSet<ModuleUid> = direct.iter().cloned().collect();
        let mut stack: Vec<ModuleUid> = direct.clone();
        while let Some(next) = stack.pop() {
            if let Some(children) = self.direct_deps.get(&next) {
                for child in children {
                    if seen.insert(child.clone()) {
                        stack.push(child.clone());
                    }
                }
            }
        }
        seen.into_iter().collect()
    }

    /// `spec.md §8` invariant 5: for every module, the three indices agree.
    pub fn check_consistency(&self) -> Result<(), AstError> {
        for uid in self.by_uid.keys() {
            let by_path_ok = self.by_path.get(&uid.path) == Some(uid);
            let by_name_scope_ok = self.by_name_scope.get(&uid.name_scope_key()) == Some(uid);
            if !by_path_ok || !by_name_scope_ok {
                return Err(AstError::InvariantViolation(format!(
                    "module registry indices disagree for {uid:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(name: &str) -> ModuleUid {
        ModuleUid::new(name, format!("/src/{name}.hil"), "hil", None, "global")
    }

    #[test]
    fn duplicate_uid_rejected() {
        let mut reg = ModuleRegistry::new();
        reg.insert(uid("a"), NodeHandle::default()).unwrap();
        let err = reg.insert(uid("a"), NodeHandle::default()).unwrap_err();
        assert!(matches!(err, AstError::DuplicateModule(_)));
    }

    #[test]
    fn dependencies_empty_until_ready() {
        let mut reg = ModuleRegistry::new();
        reg.insert(uid("a"), NodeHandle::default()).unwrap();
        assert!(reg.dependencies(&uid("a"), false).is_empty());
        reg.mark_dependencies_ready();
        assert!(reg.dependencies(&uid("a"), false).is_empty());
    }

    #[test]
    fn indices_stay_consistent_after_insert() {
        let mut reg = ModuleRegistry::new();
        reg.insert(uid("a"), NodeHandle::default()).unwrap();
        reg.insert(uid("b"), NodeHandle::default()).unwrap();
        reg.check_consistency().unwrap();
    }

    #[test]
    fn namespace_is_deterministic_and_scope_sensitive() {
        let a = ModuleUid::new("A", "/src/A.hil", "hil", None, "global");
        let a_again = ModuleUid::new("A", "/other/A.hil", "hil", None, "global");
        let a_local = ModuleUid::new("A", "/src/A.hil", "hil", None, "local");
        assert_eq!(a.namespace(), a_again.namespace());
        assert_ne!(a.namespace(), a_local.namespace());
    }

    struct FakeParser;

    impl SourceParser for FakeParser {
        fn parse(&self, path: &std::path::Path, process_ext: Option<&str>) -> Result<RawModule, AstError> {
            let name = path.file_stem().unwrap().to_string_lossy().into_owned();
            Ok(RawModule {
                uid: ModuleUid::new(name, path.to_path_buf(), "hil", process_ext.map(String::from), "global"),
                root: NodeHandle::default(),
                imports: Vec::new(),
            })
        }
    }

    /// `spec.md §8` scenario S2: importing `b` from a nested subdirectory
    /// of a search directory succeeds without the caller pre-computing the
    /// exact file path, via the recursive walk rather than a flat
    /// one-level join.
    #[test]
    fn import_module_finds_file_in_nested_search_dir() {
        let dir = std::env::temp_dir().join(format!("hil-ast-test-{}", std::process::id()));
        let nested = dir.join("nested").join("deeper");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("b.hil"), "").unwrap();

        let mut reg = ModuleRegistry::new();
        let importer = uid("root");
        let found = reg
            .import_module(&FakeParser, &importer, "b", "global", "hil", None, &[dir.clone()])
            .unwrap();
        assert_eq!(found.name, "b");

        std::fs::remove_dir_all(&dir).ok();
    }

    /// `spec.md §1`: the registry must "honor circular imports" rather than
    /// reject them — two modules importing each other is ordinary, not an
    /// error, since resolution is on-demand and cross-module references are
    /// weak lookups that tolerate not-yet-resolved targets.
    #[test]
    fn import_module_allows_mutual_imports() {
        let mut reg = ModuleRegistry::new();
        let a = uid("a");
        let b = uid("b");
        reg.insert(a.clone(), NodeHandle::default()).unwrap();
        reg.insert(b.clone(), NodeHandle::default()).unwrap();

        reg.import_module(&FakeParser, &b, "a", "global", "hil", None, &[])
            .unwrap();
        reg.import_module(&FakeParser, &a, "b", "global", "hil", None, &[])
            .unwrap();

        reg.mark_dependencies_ready();
        assert_eq!(reg.dependencies(&b, false), vec![a.clone()]);
        assert_eq!(reg.dependencies(&a, false), vec![b.clone()]);
        // The recursive closure must terminate despite the cycle.
        assert_eq!(reg.dependencies(&a, true).len(), 1);
    }

    /// A module naming itself as an import is the degenerate one-node cycle;
    /// it must resolve (to itself) rather than error, for the same reason.
    #[test]
    fn import_module_allows_self_import() {
        let mut reg = ModuleRegistry::new();
        let a = uid("a");
        reg.insert(a.clone(), NodeHandle::default()).unwrap();
        let found = reg
            .import_module(&FakeParser, &a, "a", "global", "hil", None, &[])
            .unwrap();
        assert_eq!(found, a);
        reg.mark_dependencies_ready();
        assert_eq!(reg.dependencies(&a, true), vec![a]);
    }
}
