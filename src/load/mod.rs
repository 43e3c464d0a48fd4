//! Program loader.
//!
//! Builds the typed whole-program IR from a set of package patterns. The
//! language-specific frontend has already parsed, type-checked, and lowered
//! the program into a snapshot (`program.json` at the workspace root); the
//! loader resolves patterns against it, applies build tags, materialises
//! test variants when requested, and interns everything into the
//! [`crate::ir::Program`] arena.
//!
//! Test variants mirror the build system's behavior: for a package `p` with
//! test material the loader surfaces the in-package test variant (same
//! import path, test files merged in), the external test package `p_test`,
//! and a synthetic test executable `p.test` whose `main` drives the test
//! functions. Duplicated declarations share source positions with their
//! originals; downstream stages canonicalise by position.

pub mod patterns;
pub mod snapshot;

use crate::error::{Error, Result};
use crate::ir::{
    Function, FuncId, MethodSig, Package, PkgId, PkgVariant, Position, Program, Signature, Site,
    SiteKind, SourceFile, SymbolRef, TypeDef, TypeId, TypeKind, ValId, ValKind, ValueDecl, Xref,
};
use snapshot::{
    split_symbol, SnapshotFile, SnapshotFunction, SnapshotPackage, SnapshotProgram, SnapshotSite,
    SnapshotType, SnapshotValue, SnapshotXref,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the frontend's export at the workspace root.
pub const SNAPSHOT_FILE: &str = "program.json";

/// The import path of the testing support package.
const TESTING_PATH: &str = "testing";

/// Loader options.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Include test variants as first-class packages.
    pub tests: bool,
    /// Extra build tags; files demanding other tags are dropped.
    pub tags: Vec<String>,
    /// Workspace root. Empty means the current directory.
    pub dir: PathBuf,
}

/// A loaded program plus the pattern-matched initial package set.
#[derive(Debug)]
pub struct Loaded {
    pub program: Program,
    pub initial: Vec<PkgId>,
}

/// Load the packages matching `patterns` and their whole dependency
/// closure.
pub fn load(pkg_patterns: &[String], opts: &LoadOptions) -> Result<Loaded> {
    if pkg_patterns.is_empty() {
        return Err(Error::Load("no package patterns".into()));
    }

    let path = snapshot_path(&opts.dir);
    let data = std::fs::read_to_string(&path)
        .map_err(|e| Error::Load(format!("{}: {e}", path.display())))?;
    let snap: SnapshotProgram = serde_json::from_str(&data)
        .map_err(|e| Error::Load(format!("{}: {e}", path.display())))?;

    let tags: HashSet<String> = opts.tags.iter().cloned().collect();
    let instances = build_instances(snap, opts.tests, &tags);

    let mut interner = Interner::new(instances);
    let program = interner.intern()?;

    let ill_typed: Vec<&str> = program
        .packages
        .iter()
        .filter(|p| !p.diagnostics.is_empty())
        .map(|p| p.path.as_str())
        .collect();
    if !ill_typed.is_empty() {
        return Err(Error::Type(ill_typed.join(", ")));
    }

    let initial = match_initial(&program, pkg_patterns)?;
    info!(
        packages = program.packages.len(),
        initial = initial.len(),
        "program loaded"
    );
    Ok(Loaded { program, initial })
}

fn snapshot_path(dir: &Path) -> PathBuf {
    if dir.as_os_str().is_empty() {
        PathBuf::from(SNAPSHOT_FILE)
    } else {
        dir.join(SNAPSHOT_FILE)
    }
}

/// Resolve each pattern against the loaded set; every pattern must match at
/// least one package.
fn match_initial(program: &Program, pkg_patterns: &[String]) -> Result<Vec<PkgId>> {
    let mut initial: Vec<PkgId> = Vec::new();
    for pattern in pkg_patterns {
        let mut matched = false;
        for pkg in &program.packages {
            if patterns::match_pattern(pattern, pkg.base_path()) {
                matched = true;
                if !initial.contains(&pkg.id) {
                    initial.push(pkg.id);
                }
            }
        }
        if !matched {
            return Err(Error::Load(format!("no packages matched pattern {pattern:?}")));
        }
    }
    initial.sort();
    Ok(initial)
}

/// One package instance to intern: a primary package or a materialised test
/// variant of one.
#[derive(Debug, Clone)]
struct Instance {
    path: String,
    base: String,
    name: String,
    module: Option<String>,
    variant: PkgVariant,
    imports: Vec<String>,
    files: Vec<SnapshotFile>,
    types: Vec<SnapshotType>,
    consts: Vec<SnapshotValue>,
    vars: Vec<SnapshotValue>,
    functions: Vec<SnapshotFunction>,
    xrefs: Vec<SnapshotXref>,
    diagnostics: Vec<String>,
    /// Base path of the test group this instance belongs to. Members of a
    /// group resolve references to the base path against the test variant
    /// rather than the primary instance.
    group: Option<String>,
}

fn variant_rank(v: PkgVariant) -> u8 {
    match v {
        PkgVariant::Primary => 0,
        PkgVariant::TestVariant => 1,
        PkgVariant::ExternalTest => 2,
        PkgVariant::TestMain => 3,
    }
}

/// Drop files whose build tags are not satisfied, along with every
/// declaration and cross-reference positioned in a dropped file.
fn apply_tags(pkg: &mut SnapshotPackage, enabled: &HashSet<String>) {
    let dropped: HashSet<String> = pkg
        .files
        .iter()
        .filter(|f| !f.tags.iter().all(|t| enabled.contains(t)))
        .map(|f| f.path.clone())
        .collect();
    if dropped.is_empty() {
        return;
    }
    debug!(package = %pkg.path, files = dropped.len(), "dropping tag-gated files");
    pkg.files.retain(|f| !dropped.contains(&f.path));
    pkg.types.retain(|t| !dropped.contains(&t.pos.file));
    pkg.consts.retain(|v| !dropped.contains(&v.pos.file));
    pkg.vars.retain(|v| !dropped.contains(&v.pos.file));
    pkg.functions.retain(|f| !dropped.contains(&f.pos.file));
    pkg.xrefs.retain(|x| !dropped.contains(&x.file));
    if let Some(tests) = &mut pkg.tests {
        tests.files.retain(|f| f.tags.iter().all(|t| enabled.contains(t)));
    }
}

fn build_instances(
    snap: SnapshotProgram,
    tests: bool,
    tags: &HashSet<String>,
) -> Vec<Instance> {
    let mut instances = Vec::new();
    let mut have_testing = false;
    let mut materialised_tests = false;

    for mut pkg in snap.packages {
        apply_tags(&mut pkg, tags);
        if pkg.path == TESTING_PATH {
            have_testing = true;
        }

        let test_data = pkg.tests.take();
        instances.push(Instance {
            path: pkg.path.clone(),
            base: pkg.path.clone(),
            name: pkg.name.clone(),
            module: pkg.module.clone(),
            variant: PkgVariant::Primary,
            imports: pkg.imports.clone(),
            files: pkg.files.clone(),
            types: pkg.types.clone(),
            consts: pkg.consts.clone(),
            vars: pkg.vars.clone(),
            functions: pkg.functions.clone(),
            xrefs: pkg.xrefs.clone(),
            diagnostics: pkg.diagnostics.clone(),
            group: None,
        });

        if !tests {
            continue;
        }
        let Some(t) = test_data else { continue };
        materialised_tests = true;

        // In-package test variant: same import path, test files merged in.
        // Every duplicated declaration keeps its original source position.
        let mut variant = instances.last().unwrap().clone();
        variant.variant = PkgVariant::TestVariant;
        variant.group = Some(pkg.path.clone());
        variant.files.extend(t.files.clone());
        variant.functions.extend(t.functions.clone());
        variant.xrefs.extend(t.xrefs.clone());
        for imp in &t.imports {
            if !variant.imports.contains(imp) {
                variant.imports.push(imp.clone());
            }
        }
        instances.push(variant);

        // External test package.
        let mut test_fn_syms: Vec<String> = t
            .functions
            .iter()
            .filter(|f| is_test_function(f))
            .map(|f| format!("{}.{}", pkg.path, f.name))
            .collect();
        let mut main_imports = vec![pkg.path.clone()];

        if let Some(ext) = t.external {
            let ext_path = format!("{}_test", pkg.path);
            let mut ext_imports = ext.imports.clone();
            if !ext_imports.contains(&pkg.path) {
                ext_imports.push(pkg.path.clone());
            }
            test_fn_syms.extend(
                ext.functions
                    .iter()
                    .filter(|f| is_test_function(f))
                    .map(|f| format!("{ext_path}.{}", f.name)),
            );
            main_imports.push(ext_path.clone());
            instances.push(Instance {
                path: ext_path.clone(),
                base: pkg.path.clone(),
                name: format!("{}_test", pkg.name),
                module: pkg.module.clone(),
                variant: PkgVariant::ExternalTest,
                imports: ext_imports,
                files: ext.files,
                types: vec![],
                consts: vec![],
                vars: vec![],
                functions: ext.functions,
                xrefs: ext.xrefs,
                diagnostics: vec![],
                group: Some(pkg.path.clone()),
            });
        }

        // Synthetic test executable: a generated main that drives every
        // test function of the group.
        main_imports.push(TESTING_PATH.to_string());
        let main_file = format!("{}/_testmain.src", pkg.path);
        let body: Vec<SnapshotSite> = test_fn_syms
            .iter()
            .map(|sym| SnapshotSite::Call {
                to: sym.clone(),
                line: 1,
                col: 1,
            })
            .collect();
        instances.push(Instance {
            path: format!("{}.test", pkg.path),
            base: pkg.path.clone(),
            name: "main".into(),
            module: pkg.module.clone(),
            variant: PkgVariant::TestMain,
            imports: main_imports,
            files: vec![SnapshotFile {
                path: main_file.clone(),
                generated: true,
                tags: vec![],
            }],
            types: vec![],
            consts: vec![],
            vars: vec![],
            functions: vec![SnapshotFunction {
                name: "main".into(),
                receiver: None,
                pos: snapshot::SnapshotPos {
                    file: main_file,
                    line: 1,
                    col: 1,
                },
                sig: "()".into(),
                params: vec![],
                results: vec![],
                nparams: 0,
                nresults: 0,
                body: Some(body),
                empty: false,
                anon: vec![],
                synthetic: false,
            }],
            xrefs: vec![],
            diagnostics: vec![],
            group: Some(pkg.path.clone()),
        });
    }

    // The test executables import the testing support package; give them a
    // resolvable target even when the snapshot omits it.
    if materialised_tests && !have_testing {
        instances.push(Instance {
            path: TESTING_PATH.into(),
            base: TESTING_PATH.into(),
            name: TESTING_PATH.into(),
            module: None,
            variant: PkgVariant::Primary,
            imports: vec![],
            files: vec![],
            types: vec![],
            consts: vec![],
            vars: vec![],
            functions: vec![],
            xrefs: vec![],
            diagnostics: vec![],
            group: None,
        });
    }

    instances.sort_by(|a, b| {
        (a.path.as_str(), variant_rank(a.variant)).cmp(&(b.path.as_str(), variant_rank(b.variant)))
    });
    instances
}

fn is_test_function(f: &SnapshotFunction) -> bool {
    f.receiver.is_none()
        && ["Test", "Benchmark", "Example", "Fuzz"]
            .iter()
            .any(|p| f.name.starts_with(p))
}

/// Per-instance symbol tables built during the first interning pass.
#[derive(Debug, Default)]
struct SymbolTable {
    funcs: HashMap<String, FuncId>,
    types: HashMap<String, TypeId>,
    values: HashMap<String, ValId>,
}

struct Interner {
    instances: Vec<Instance>,
    /// Default resolution: path -> instance index.
    by_path: HashMap<String, usize>,
    /// Test groups: base path -> test-variant instance index.
    variant_of: HashMap<String, usize>,
    symbols: Vec<SymbolTable>,
    program: Program,
    /// (function id, owning instance, snapshot data) for the body pass.
    pending: Vec<(FuncId, usize, SnapshotFunction)>,
}

impl Interner {
    fn new(instances: Vec<Instance>) -> Self {
        let mut by_path = HashMap::new();
        let mut variant_of = HashMap::new();
        for (i, inst) in instances.iter().enumerate() {
            match inst.variant {
                PkgVariant::TestVariant => {
                    variant_of.insert(inst.path.clone(), i);
                }
                _ => {
                    by_path.entry(inst.path.clone()).or_insert(i);
                }
            }
        }
        Self {
            instances,
            by_path,
            variant_of,
            symbols: Vec::new(),
            program: Program::default(),
            pending: Vec::new(),
        }
    }

    fn intern(&mut self) -> Result<Program> {
        self.intern_declarations()?;
        self.resolve_aliases()?;
        self.intern_bodies()?;
        self.intern_packages()?;
        Ok(std::mem::take(&mut self.program))
    }

    /// Resolve an import-path reference made from inside `from`: members of
    /// a test group see the in-package test variant at the group's base
    /// path, everything else sees primaries.
    fn resolve_path(&self, from: usize, path: &str) -> Option<usize> {
        if let Some(group) = &self.instances[from].group {
            if group == path {
                return self.variant_of.get(path).copied();
            }
        }
        self.by_path.get(path).copied()
    }

    fn resolve_func(&self, from: usize, sym: &str) -> Result<FuncId> {
        let (path, name) =
            split_symbol(sym).ok_or_else(|| Error::Load(format!("malformed symbol {sym:?}")))?;
        self.resolve_path(from, path)
            .and_then(|i| self.symbols[i].funcs.get(name).copied())
            .ok_or_else(|| Error::Load(format!("unresolved function symbol {sym:?}")))
    }

    fn resolve_type(&self, from: usize, sym: &str) -> Result<TypeId> {
        let (path, name) =
            split_symbol(sym).ok_or_else(|| Error::Load(format!("malformed symbol {sym:?}")))?;
        self.resolve_path(from, path)
            .and_then(|i| self.symbols[i].types.get(name).copied())
            .ok_or_else(|| Error::Load(format!("unresolved type symbol {sym:?}")))
    }

    fn resolve_symbol(&self, from: usize, sym: &str) -> Result<SymbolRef> {
        let (path, name) =
            split_symbol(sym).ok_or_else(|| Error::Load(format!("malformed symbol {sym:?}")))?;
        let i = self
            .resolve_path(from, path)
            .ok_or_else(|| Error::Load(format!("unresolved package in symbol {sym:?}")))?;
        let table = &self.symbols[i];
        if let Some(&f) = table.funcs.get(name) {
            return Ok(SymbolRef::Func(f));
        }
        if let Some(&t) = table.types.get(name) {
            return Ok(SymbolRef::Type(t));
        }
        if let Some(&v) = table.values.get(name) {
            return Ok(SymbolRef::Value(v));
        }
        Err(Error::Load(format!("unresolved symbol {sym:?}")))
    }

    /// First pass: assign ids for every declaration, in deterministic
    /// (file, line, column) order within each instance.
    fn intern_declarations(&mut self) -> Result<()> {
        for idx in 0..self.instances.len() {
            let pkg_id = PkgId(idx as u32);
            let mut table = SymbolTable::default();

            let mut types = self.instances[idx].types.clone();
            types.sort_by(|a, b| pos_key(&a.pos).cmp(&pos_key(&b.pos)));
            for ty in &types {
                let id = TypeId(self.program.types.len() as u32);
                let kind = match (&ty.interface, &ty.alias) {
                    (Some(methods), _) => TypeKind::Interface {
                        methods: methods
                            .iter()
                            .map(|m| MethodSig {
                                name: m.name.clone(),
                                sig: m.sig.clone(),
                            })
                            .collect(),
                    },
                    (None, Some(_)) => TypeKind::Alias { target: None },
                    (None, None) => TypeKind::Concrete { methods: vec![] },
                };
                self.program.types.push(TypeDef {
                    id,
                    package: pkg_id,
                    name: ty.name.clone(),
                    position: Position::new(&ty.pos.file, ty.pos.line, ty.pos.col),
                    kind,
                });
                table.types.insert(ty.name.clone(), id);
            }

            for (vals, kind) in [
                (self.instances[idx].consts.clone(), ValKind::Const),
                (self.instances[idx].vars.clone(), ValKind::Var),
            ] {
                let mut vals = vals;
                vals.sort_by(|a, b| pos_key(&a.pos).cmp(&pos_key(&b.pos)));
                for val in &vals {
                    let id = ValId(self.program.values.len() as u32);
                    self.program.values.push(ValueDecl {
                        id,
                        package: pkg_id,
                        name: val.name.clone(),
                        kind,
                        position: Position::new(&val.pos.file, val.pos.line, val.pos.col),
                    });
                    table.values.insert(val.name.clone(), id);
                }
            }

            let mut functions = self.instances[idx].functions.clone();
            functions.sort_by(|a, b| pos_key(&a.pos).cmp(&pos_key(&b.pos)));
            for f in &functions {
                self.intern_function(idx, pkg_id, f, None, 0, &mut table)?;
            }

            self.symbols.push(table);
        }
        Ok(())
    }

    fn intern_function(
        &mut self,
        inst: usize,
        pkg_id: PkgId,
        f: &SnapshotFunction,
        parent: Option<FuncId>,
        anon_index: u32,
        table: &mut SymbolTable,
    ) -> Result<FuncId> {
        let id = FuncId(self.program.functions.len() as u32);
        let receiver = match &f.receiver {
            Some(tname) => Some(*table.types.get(tname).ok_or_else(|| {
                Error::Load(format!(
                    "method {}.{} has unknown receiver type {tname:?}",
                    self.instances[inst].path, f.name
                ))
            })?),
            None => None,
        };

        self.program.functions.push(Function {
            id,
            package: pkg_id,
            name: if parent.is_some() { String::new() } else { f.name.clone() },
            receiver,
            parent,
            anon_index,
            synthetic: f.synthetic,
            position: Position::new(&f.pos.file, f.pos.line, f.pos.col),
            sig: Signature {
                key: f.sig.clone(),
                param_count: f.nparams,
                result_count: f.nresults,
                ..Signature::default()
            },
            body: None,
            empty_body: f.empty,
        });

        if let Some(recv) = receiver {
            if let TypeKind::Concrete { methods } =
                &mut self.program.types[recv.0 as usize].kind
            {
                methods.push(id);
            }
        }

        // Registered by name so bodies elsewhere can reference it; the name
        // "init" is reserved for the synthetic package initialiser, and
        // anonymous functions have no referable name.
        if parent.is_none() && f.name != "init" {
            let key = match &f.receiver {
                Some(t) => format!("{t}.{}", f.name),
                None => f.name.clone(),
            };
            table.funcs.insert(key, id);
        }

        for (i, anon) in f.anon.iter().enumerate() {
            self.intern_function(inst, pkg_id, anon, Some(id), (i + 1) as u32, table)?;
        }
        self.pending.push((id, inst, f.clone()));
        Ok(id)
    }

    fn resolve_aliases(&mut self) -> Result<()> {
        for idx in 0..self.instances.len() {
            let types = self.instances[idx].types.clone();
            for ty in &types {
                let Some(alias) = &ty.alias else { continue };
                if alias.is_empty() {
                    continue;
                }
                let target = self.resolve_type(idx, alias)?;
                let id = self.symbols[idx].types[&ty.name];
                self.program.types[id.0 as usize].kind = TypeKind::Alias {
                    target: Some(target),
                };
            }
        }
        Ok(())
    }

    /// Second pass: resolve signatures and lower bodies now that every
    /// declaration in every package has an id.
    fn intern_bodies(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        for (id, inst, snap_fn) in &pending {
            let params = self.resolve_type_list(*inst, &snap_fn.params)?;
            let results = self.resolve_type_list(*inst, &snap_fn.results)?;
            let body = match &snap_fn.body {
                None => None,
                Some(sites) => {
                    let file = snap_fn.pos.file.clone();
                    let mut out = Vec::with_capacity(sites.len());
                    for site in sites {
                        out.push(self.lower_site(*inst, &file, site)?);
                    }
                    Some(out)
                }
            };
            let f = &mut self.program.functions[id.0 as usize];
            f.sig.params = params;
            f.sig.results = results;
            f.body = body;
        }
        Ok(())
    }

    fn resolve_type_list(&self, inst: usize, syms: &[String]) -> Result<Vec<TypeId>> {
        syms.iter().map(|s| self.resolve_type(inst, s)).collect()
    }

    fn lower_site(&self, inst: usize, file: &str, site: &SnapshotSite) -> Result<Site> {
        let (line, col) = site.line_col();
        let position = Position::new(file, line, col);
        let kind = match site {
            SnapshotSite::Call { to, .. } => SiteKind::Call(self.resolve_func(inst, to)?),
            SnapshotSite::DynCall { iface, method, .. } => SiteKind::DynCall {
                iface: self.resolve_type(inst, iface)?,
                method: method.clone(),
            },
            SnapshotSite::Indirect { sig, .. } => SiteKind::Indirect { sig: sig.clone() },
            SnapshotSite::FuncRef { to, .. } => {
                SiteKind::FuncRef(self.resolve_func(inst, to)?)
            }
            SnapshotSite::Alloc { ty, .. } => SiteKind::Alloc(self.resolve_type(inst, ty)?),
            SnapshotSite::Convert { ty, .. } => {
                SiteKind::Convert(self.resolve_type(inst, ty)?)
            }
            SnapshotSite::TypeRef { ty, .. } => {
                SiteKind::TypeRef(self.resolve_type(inst, ty)?)
            }
        };
        Ok(Site { kind, position })
    }

    /// Final pass: package records, imports, cross-references, and the
    /// synthetic per-package initialiser (import inits first, then the
    /// package's own source-level `init` functions in declaration order).
    fn intern_packages(&mut self) -> Result<()> {
        for idx in 0..self.instances.len() {
            let pkg_id = PkgId(idx as u32);
            let inst = self.instances[idx].clone();

            let mut imports = Vec::new();
            for imp in &inst.imports {
                let target = self.resolve_path(idx, imp).ok_or_else(|| {
                    Error::Load(format!(
                        "package {}: unknown import path {imp:?}",
                        inst.path
                    ))
                })?;
                let target = PkgId(target as u32);
                if !imports.contains(&target) {
                    imports.push(target);
                }
            }

            let mut functions: Vec<FuncId> = self
                .program
                .functions
                .iter()
                .filter(|f| f.package == pkg_id && f.parent.is_none())
                .map(|f| f.id)
                .collect();
            functions.sort();

            let mut xrefs = Vec::new();
            for x in &inst.xrefs {
                xrefs.push(Xref {
                    file: x.file.clone(),
                    target: self.resolve_symbol(idx, &x.to)?,
                    position: Position::new(&x.file, x.line, x.col),
                });
            }

            self.program.packages.push(Package {
                id: pkg_id,
                path: inst.path.clone(),
                name: inst.name.clone(),
                module: inst.module.clone(),
                variant: inst.variant,
                imports,
                files: inst
                    .files
                    .iter()
                    .map(|f| SourceFile {
                        path: f.path.clone(),
                        generated: f.generated,
                    })
                    .collect(),
                functions,
                types: self
                    .program
                    .types
                    .iter()
                    .filter(|t| t.package == pkg_id)
                    .map(|t| t.id)
                    .collect(),
                values: self
                    .program
                    .values
                    .iter()
                    .filter(|v| v.package == pkg_id)
                    .map(|v| v.id)
                    .collect(),
                init: FuncId(0), // patched below
                diagnostics: inst.diagnostics.clone(),
                xrefs,
            });
        }

        // Synthetic initialisers, two steps: ids for all packages first, so
        // init bodies can call the inits of imported packages.
        let base = self.program.functions.len() as u32;
        for idx in 0..self.program.packages.len() {
            let id = FuncId(base + idx as u32);
            self.program.packages[idx].init = id;
            self.program.functions.push(Function {
                id,
                package: PkgId(idx as u32),
                name: "init".into(),
                receiver: None,
                parent: None,
                anon_index: 0,
                synthetic: true,
                position: Position::none(),
                sig: Signature::default(),
                body: None,
                empty_body: false,
            });
        }
        for idx in 0..self.program.packages.len() {
            let mut body: Vec<Site> = self.program.packages[idx]
                .imports
                .iter()
                .map(|&imp| Site {
                    kind: SiteKind::Call(self.program.packages[imp.0 as usize].init),
                    position: Position::none(),
                })
                .collect();
            let user_inits: Vec<FuncId> = self.program.packages[idx]
                .functions
                .iter()
                .copied()
                .filter(|&f| {
                    let fun = &self.program.functions[f.0 as usize];
                    fun.is_init() && fun.body.is_some()
                })
                .collect();
            body.extend(user_inits.into_iter().map(|f| Site {
                kind: SiteKind::Call(f),
                position: Position::none(),
            }));
            let init = self.program.packages[idx].init;
            self.program.functions[init.0 as usize].body = Some(body);
        }
        Ok(())
    }
}

fn pos_key(pos: &snapshot::SnapshotPos) -> (String, u32, u32) {
    (pos.file.clone(), pos.line, pos.col)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_snapshot(dir: &Path, contents: &str) {
        std::fs::write(dir.join(SNAPSHOT_FILE), contents).unwrap();
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("deadwood-load-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const MINIMAL: &str = r#"{
      "packages": [
        {
          "path": "example.com/app",
          "name": "main",
          "module": "example.com/app",
          "imports": ["example.com/app/lib"],
          "files": [{"path": "main.src"}],
          "functions": [
            {"name": "main", "pos": {"file": "main.src", "line": 3},
             "body": [{"kind": "call", "to": "example.com/app/lib.F", "line": 4}]}
          ]
        },
        {
          "path": "example.com/app/lib",
          "name": "lib",
          "module": "example.com/app",
          "files": [{"path": "lib/lib.src"}],
          "functions": [
            {"name": "F", "pos": {"file": "lib/lib.src", "line": 1}, "body": []},
            {"name": "G", "pos": {"file": "lib/lib.src", "line": 5}, "body": []}
          ]
        }
      ]
    }"#;

    #[test]
    fn test_load_minimal() {
        let dir = temp_dir("minimal");
        write_snapshot(&dir, MINIMAL);
        let opts = LoadOptions {
            dir: dir.clone(),
            ..Default::default()
        };
        let loaded = load(&["./...".into()], &opts).unwrap();
        assert_eq!(loaded.program.packages.len(), 2);
        assert_eq!(loaded.initial.len(), 2);

        let main_pkg = loaded
            .program
            .packages
            .iter()
            .find(|p| p.name == "main")
            .unwrap();
        assert!(loaded.program.is_executable(main_pkg.id));
        assert_eq!(main_pkg.imports.len(), 1);
    }

    #[test]
    fn test_unmatched_pattern() {
        let dir = temp_dir("unmatched");
        write_snapshot(&dir, MINIMAL);
        let opts = LoadOptions {
            dir,
            ..Default::default()
        };
        let err = load(&["example.com/nothing".into()], &opts).unwrap_err();
        assert!(matches!(err, Error::Load(_)));
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = temp_dir("missing");
        let _ = std::fs::remove_file(dir.join(SNAPSHOT_FILE));
        let opts = LoadOptions {
            dir,
            ..Default::default()
        };
        assert!(matches!(
            load(&["./...".into()], &opts),
            Err(Error::Load(_))
        ));
    }

    #[test]
    fn test_type_error() {
        let dir = temp_dir("illtyped");
        write_snapshot(
            &dir,
            r#"{"packages": [{"path": "p", "name": "p", "diagnostics": ["undefined: x"]}]}"#,
        );
        let opts = LoadOptions {
            dir,
            ..Default::default()
        };
        assert!(matches!(load(&["./...".into()], &opts), Err(Error::Type(_))));
    }

    #[test]
    fn test_synthetic_init_calls_imports() {
        let dir = temp_dir("inits");
        write_snapshot(&dir, MINIMAL);
        let opts = LoadOptions {
            dir,
            ..Default::default()
        };
        let loaded = load(&["./...".into()], &opts).unwrap();
        let program = &loaded.program;
        let main_pkg = program.packages.iter().find(|p| p.name == "main").unwrap();
        let lib_pkg = program.packages.iter().find(|p| p.name == "lib").unwrap();
        let init = program.func(main_pkg.init);
        let body = init.body.as_ref().unwrap();
        assert!(body
            .iter()
            .any(|s| matches!(s.kind, SiteKind::Call(f) if f == lib_pkg.init)));
    }
}
