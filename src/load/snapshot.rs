//! Serde model of the frontend's program snapshot.
//!
//! The language-specific frontend parses, type-checks, and lowers the
//! program, then exports it as `program.json` at the workspace root. The
//! shapes here mirror that export one-to-one; the loader interns them into
//! the [`crate::ir`] arena and never hands them to the rest of the crate.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotProgram {
    pub packages: Vec<SnapshotPackage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPackage {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub files: Vec<SnapshotFile>,
    #[serde(default)]
    pub types: Vec<SnapshotType>,
    #[serde(default)]
    pub consts: Vec<SnapshotValue>,
    #[serde(default)]
    pub vars: Vec<SnapshotValue>,
    #[serde(default)]
    pub functions: Vec<SnapshotFunction>,
    #[serde(default)]
    pub xrefs: Vec<SnapshotXref>,
    /// Type-check diagnostics; non-empty means the package is ill-typed.
    #[serde(default)]
    pub diagnostics: Vec<String>,
    /// Test material, materialised only when tests are requested.
    #[serde(default)]
    pub tests: Option<SnapshotTests>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotFile {
    pub path: String,
    #[serde(default)]
    pub generated: bool,
    /// Build tags that must all be enabled for this file to be loaded.
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPos {
    pub file: String,
    pub line: u32,
    #[serde(default = "default_col")]
    pub col: u32,
}

fn default_col() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotType {
    pub name: String,
    pub pos: SnapshotPos,
    /// Present iff this is an interface type.
    #[serde(default)]
    pub interface: Option<Vec<SnapshotMethodSig>>,
    /// Present iff this is an alias; the symbol of the aliased named type,
    /// or empty when the target is unnamed.
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotMethodSig {
    pub name: String,
    #[serde(default)]
    pub sig: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotValue {
    pub name: String,
    pub pos: SnapshotPos,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotFunction {
    pub name: String,
    /// Name of the receiver type, declared in the same package.
    #[serde(default)]
    pub receiver: Option<String>,
    pub pos: SnapshotPos,
    #[serde(default)]
    pub sig: String,
    /// Named types mentioned in the parameter list, as `path.Name` symbols.
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub results: Vec<String>,
    /// Total parameter/result counts, including unnamed types.
    #[serde(default)]
    pub nparams: u32,
    #[serde(default)]
    pub nresults: u32,
    /// `None` when the declaration has no body.
    #[serde(default)]
    pub body: Option<Vec<SnapshotSite>>,
    /// The body exists and is empty (marker-method detection).
    #[serde(default)]
    pub empty: bool,
    /// Anonymous functions nested in this one, in source order.
    #[serde(default)]
    pub anon: Vec<SnapshotFunction>,
    /// Compiler-emitted: wrappers and generic instantiations.
    #[serde(default)]
    pub synthetic: bool,
}

/// One lowered operation in a function body. Symbols are `path.Name` or
/// `path.Type.Method` strings resolved by the loader.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotSite {
    Call {
        to: String,
        line: u32,
        #[serde(default = "default_col")]
        col: u32,
    },
    DynCall {
        iface: String,
        method: String,
        line: u32,
        #[serde(default = "default_col")]
        col: u32,
    },
    Indirect {
        sig: String,
        line: u32,
        #[serde(default = "default_col")]
        col: u32,
    },
    FuncRef {
        to: String,
        line: u32,
        #[serde(default = "default_col")]
        col: u32,
    },
    Alloc {
        ty: String,
        line: u32,
        #[serde(default = "default_col")]
        col: u32,
    },
    Convert {
        ty: String,
        line: u32,
        #[serde(default = "default_col")]
        col: u32,
    },
    TypeRef {
        ty: String,
        line: u32,
        #[serde(default = "default_col")]
        col: u32,
    },
}

impl SnapshotSite {
    pub fn line_col(&self) -> (u32, u32) {
        match *self {
            SnapshotSite::Call { line, col, .. }
            | SnapshotSite::DynCall { line, col, .. }
            | SnapshotSite::Indirect { line, col, .. }
            | SnapshotSite::FuncRef { line, col, .. }
            | SnapshotSite::Alloc { line, col, .. }
            | SnapshotSite::Convert { line, col, .. }
            | SnapshotSite::TypeRef { line, col, .. } => (line, col),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotXref {
    pub file: String,
    /// Symbol of the referenced declaration.
    pub to: String,
    pub line: u32,
    #[serde(default = "default_col")]
    pub col: u32,
}

/// Test material of a package: extra in-package test files and functions,
/// and the optional external test package.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotTests {
    #[serde(default)]
    pub files: Vec<SnapshotFile>,
    #[serde(default)]
    pub functions: Vec<SnapshotFunction>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub xrefs: Vec<SnapshotXref>,
    #[serde(default)]
    pub external: Option<SnapshotExternalTest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotExternalTest {
    #[serde(default)]
    pub files: Vec<SnapshotFile>,
    #[serde(default)]
    pub functions: Vec<SnapshotFunction>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub xrefs: Vec<SnapshotXref>,
}

/// Split a `path.Name` symbol into its package path and member name. The
/// member may itself be dotted (`Type.Method`); the split point is the
/// first dot after the last slash.
pub fn split_symbol(sym: &str) -> Option<(&str, &str)> {
    let start = sym.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = sym[start..].find('.')? + start;
    Some((&sym[..dot], &sym[dot + 1..]))
}
