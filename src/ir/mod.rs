//! Typed whole-program intermediate representation.
//!
//! The language frontend exports the typed program as a snapshot; the loader
//! interns it into this arena. Ids are plain indices into the `Program`
//! vectors, so every iteration order is the deterministic interning order
//! (packages sorted by path, members sorted by file/line within a package).

mod position;

pub use position::Position;

use serde::Serialize;
use std::collections::HashSet;

/// Index of a package in [`Program::packages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PkgId(pub u32);

/// Index of a function in [`Program::functions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

/// Index of a named type in [`Program::types`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Index of a constant or variable in [`Program::values`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValId(pub u32);

/// How a package instance came to be loaded.
///
/// With tests enabled the loader materialises up to three extra instances
/// per package: the in-package test variant (same import path, test files
/// merged in), the external test package (`<path>_test`) and the synthetic
/// test executable (`<path>.test`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkgVariant {
    Primary,
    TestVariant,
    ExternalTest,
    TestMain,
}

/// A source file belonging to a package.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    /// File bears the language's machine-generated marker.
    pub generated: bool,
}

/// A type-check cross-reference: some file in this package names `target`.
///
/// Records uses of constants, variables, types, and functions that never
/// become a call-graph edge.
#[derive(Debug, Clone)]
pub struct Xref {
    pub file: String,
    pub target: SymbolRef,
    pub position: Position,
}

/// A resolved reference to a top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolRef {
    Func(FuncId),
    Type(TypeId),
    Value(ValId),
}

/// A compilation unit with a stable import path.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PkgId,
    pub path: String,
    pub name: String,
    /// Module the package belongs to, when known.
    pub module: Option<String>,
    pub variant: PkgVariant,
    pub imports: Vec<PkgId>,
    pub files: Vec<SourceFile>,
    /// Top-level named functions and methods, in file/line order.
    /// Does not include the synthetic package initialiser.
    pub functions: Vec<FuncId>,
    pub types: Vec<TypeId>,
    pub values: Vec<ValId>,
    /// The synthetic package initialiser.
    pub init: FuncId,
    pub diagnostics: Vec<String>,
    pub xrefs: Vec<Xref>,
}

impl Package {
    /// The import path with the conventional external-test suffix removed.
    pub fn base_path(&self) -> &str {
        match self.variant {
            PkgVariant::ExternalTest => self.path.strip_suffix("_test").unwrap_or(&self.path),
            PkgVariant::TestMain => self.path.strip_suffix(".test").unwrap_or(&self.path),
            _ => &self.path,
        }
    }
}

/// Signature of a function, reduced to what the analysis needs: the named
/// types mentioned in parameters and results, and a canonical key used to
/// match calls through function values.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
    pub key: String,
    /// Total parameter count, including parameters of unnamed type.
    pub param_count: u32,
    pub result_count: u32,
}

/// One interesting operation in a function body.
#[derive(Debug, Clone)]
pub struct Site {
    pub kind: SiteKind,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub enum SiteKind {
    /// Static call of a named function or method.
    Call(FuncId),
    /// Dynamic call through an interface method.
    DynCall { iface: TypeId, method: String },
    /// Call through a function value; resolved by signature key.
    Indirect { sig: String },
    /// A named function escapes as a value.
    FuncRef(FuncId),
    /// A concrete named type is instantiated.
    Alloc(TypeId),
    /// A concrete named type is converted into an interface.
    Convert(TypeId),
    /// A non-call type mention: assertion or conversion target, composite
    /// literal, field or element type, generic type argument.
    TypeRef(TypeId),
}

/// A source-level named function or method.
#[derive(Debug, Clone)]
pub struct Function {
    pub id: FuncId,
    pub package: PkgId,
    /// Simple name. Empty for anonymous functions (see `parent`).
    pub name: String,
    /// Receiver type for methods.
    pub receiver: Option<TypeId>,
    /// Enclosing function for anonymous functions.
    pub parent: Option<FuncId>,
    /// 1-based index among the parent's anonymous children; 0 for named.
    pub anon_index: u32,
    /// Compiler-emitted: wrappers, generic instantiations, package inits.
    pub synthetic: bool,
    pub position: Position,
    pub sig: Signature,
    /// `None` for declarations without a body.
    pub body: Option<Vec<Site>>,
    /// The body exists and contains no statements at all.
    pub empty_body: bool,
}

impl Function {
    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }

    pub fn is_init(&self) -> bool {
        self.name == "init"
    }
}

/// Method of an interface: name plus canonical signature key.
#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: String,
    pub sig: String,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Named non-interface type with its declared method set
    /// (value and pointer receivers collapsed).
    Concrete { methods: Vec<FuncId> },
    Interface { methods: Vec<MethodSig> },
    /// Alias of another named type; `None` when the target is unnamed.
    Alias { target: Option<TypeId> },
}

/// A named type declared in some package.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub id: TypeId,
    pub package: PkgId,
    pub name: String,
    pub position: Position,
    pub kind: TypeKind,
}

impl TypeDef {
    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValKind {
    Const,
    Var,
}

/// A named constant or variable.
#[derive(Debug, Clone)]
pub struct ValueDecl {
    pub id: ValId,
    pub package: PkgId,
    pub name: String,
    pub kind: ValKind,
    pub position: Position,
}

impl ValueDecl {
    pub fn exported(&self) -> bool {
        is_exported(&self.name)
    }
}

/// The visibility rule of the language: an identifier is visible across
/// package boundaries iff its name starts with an uppercase letter. Applied
/// uniformly to functions, methods, types, constants, and variables.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

/// The whole program: every loaded package with full type information.
#[derive(Debug, Default)]
pub struct Program {
    pub packages: Vec<Package>,
    pub functions: Vec<Function>,
    pub types: Vec<TypeDef>,
    pub values: Vec<ValueDecl>,
}

impl Program {
    pub fn package(&self, id: PkgId) -> &Package {
        &self.packages[id.0 as usize]
    }

    pub fn func(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.0 as usize]
    }

    pub fn value(&self, id: ValId) -> &ValueDecl {
        &self.values[id.0 as usize]
    }

    /// Import path of the function's package.
    pub fn func_pkg_path(&self, id: FuncId) -> &str {
        &self.package(self.func(id).package).path
    }

    /// Follow an alias chain to the final named type. Cycles cannot occur in
    /// a well-typed program, but malformed input is cut off at the arena size.
    pub fn resolve_alias(&self, mut id: TypeId) -> TypeId {
        for _ in 0..self.types.len() {
            match &self.type_def(id).kind {
                TypeKind::Alias { target: Some(t) } => id = *t,
                _ => break,
            }
        }
        id
    }

    /// Look up a declared method by name on a concrete type.
    pub fn method_of(&self, ty: TypeId, name: &str) -> Option<FuncId> {
        let ty = self.resolve_alias(ty);
        match &self.type_def(ty).kind {
            TypeKind::Concrete { methods } => methods
                .iter()
                .copied()
                .find(|&m| self.func(m).name == name),
            _ => None,
        }
    }

    /// Whether the method set of concrete type `ty` satisfies interface
    /// `iface`: every interface method has a declared counterpart with the
    /// same name and signature key. An empty key in the interface matches
    /// any signature.
    pub fn implements(&self, ty: TypeId, iface: TypeId) -> bool {
        let iface = self.resolve_alias(iface);
        let TypeKind::Interface { methods } = &self.type_def(iface).kind else {
            return false;
        };
        if methods.is_empty() {
            return false;
        }
        methods.iter().all(|ms| {
            self.method_of(ty, &ms.name)
                .map(|m| ms.sig.is_empty() || self.func(m).sig.key == ms.sig)
                .unwrap_or(false)
        })
    }

    /// The user-facing name of a function, without the punctuation the IR
    /// uses internally: a method on `T` or `*T` renders as `T.M`, anonymous
    /// children as `Parent$N` (1-based). With `qualified`, the package path
    /// is prepended.
    pub fn pretty_name(&self, id: FuncId, qualified: bool) -> String {
        let mut out = String::new();
        if qualified {
            out.push_str(self.func_pkg_path(id));
            out.push('.');
        }
        self.format_name(id, &mut out);
        out
    }

    fn format_name(&self, id: FuncId, out: &mut String) {
        let fun = self.func(id);
        if let Some(parent) = fun.parent {
            self.format_name(parent, out);
            out.push('$');
            out.push_str(&fun.anon_index.to_string());
            return;
        }
        if let Some(recv) = fun.receiver {
            out.push_str(&self.type_def(recv).name);
            out.push('.');
        }
        out.push_str(&fun.name);
    }

    /// Usage-index key for a function: `path.Name` or `path.Type.Method`.
    pub fn func_key(&self, id: FuncId) -> String {
        self.pretty_name(id, true)
    }

    /// Whether `pkg` imports, directly or transitively, a package with the
    /// given import path.
    pub fn transitively_imports(&self, pkg: PkgId, path: &str) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![pkg];
        while let Some(p) = stack.pop() {
            if !seen.insert(p) {
                continue;
            }
            for &imp in &self.package(p).imports {
                if self.package(imp).path == path {
                    return true;
                }
                stack.push(imp);
            }
        }
        false
    }

    /// An executable package defines the program entry point.
    pub fn is_executable(&self, pkg: PkgId) -> bool {
        let p = self.package(pkg);
        p.name == "main"
            && p.functions.iter().any(|&f| {
                let fun = self.func(f);
                fun.name == "main" && fun.receiver.is_none() && fun.body.is_some()
            })
    }

    /// The `main` function of an executable package.
    pub fn main_of(&self, pkg: PkgId) -> Option<FuncId> {
        self.package(pkg)
            .functions
            .iter()
            .copied()
            .find(|&f| self.func(f).name == "main" && self.func(f).receiver.is_none())
    }

    /// Map from each function to its anonymous children, in declaration
    /// order. Anonymous functions are reachable iff their parent is.
    pub fn anon_children_map(&self) -> std::collections::HashMap<FuncId, Vec<FuncId>> {
        let mut map: std::collections::HashMap<FuncId, Vec<FuncId>> =
            std::collections::HashMap::new();
        for f in &self.functions {
            if let Some(parent) = f.parent {
                map.entry(parent).or_default().push(f.id);
            }
        }
        map
    }

    /// Whether the file at `path` within `pkg` bears the generated marker.
    pub fn is_generated_file(&self, pkg: PkgId, path: &str) -> bool {
        self.package(pkg)
            .files
            .iter()
            .any(|f| f.path == path && f.generated)
    }
}
