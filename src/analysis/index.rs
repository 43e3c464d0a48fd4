//! Source-identifier index.
//!
//! One entry per top-level named declaration across the loaded program,
//! annotated with everything the verdict engines need: position,
//! exportedness, whether the declaring file is machine-generated, and
//! whether a method is a marker method. Synthetic IR functions and
//! anonymous functions are excluded; an anonymous function is reachable
//! iff its parent is, so reporting it would be noise.

use crate::ir::{is_exported, FuncId, Package, PkgId, Position, Program, TypeId};
use rayon::prelude::*;

/// What a reportable declaration is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Function,
    Method,
    Type,
    Const,
    Var,
}

impl IdentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentKind::Function => "func",
            IdentKind::Method => "method",
            IdentKind::Type => "type",
            IdentKind::Const => "const",
            IdentKind::Var => "var",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, IdentKind::Function | IdentKind::Method)
    }
}

/// One reportable top-level declaration.
#[derive(Debug, Clone)]
pub struct IdentEntry {
    /// Source name; methods are `Type.Method`.
    pub name: String,
    pub kind: IdentKind,
    pub package: PkgId,
    /// Set for function and method entries.
    pub func: Option<FuncId>,
    /// Receiver type for method entries.
    pub receiver: Option<TypeId>,
    pub position: Position,
    pub exported: bool,
    /// The declaring file bears the machine-generated marker.
    pub generated: bool,
    /// Empty-bodied unexported method whose receiver implements an
    /// interface declared in the same package.
    pub marker: bool,
    /// Usage-index key: `path.Name` or `path.Type.Method`.
    pub key: String,
}

/// The index over every loaded package, in package order and (file, line,
/// column) order within a package.
#[derive(Debug, Default)]
pub struct IdentIndex {
    pub entries: Vec<IdentEntry>,
}

impl IdentIndex {
    /// Function and method entries only, in index order.
    pub fn functions(&self) -> impl Iterator<Item = &IdentEntry> {
        self.entries.iter().filter(|e| e.kind.is_callable())
    }
}

/// Build the index. The per-package walks are pure and run in parallel;
/// the result order is the deterministic package order.
pub fn build(program: &Program) -> IdentIndex {
    let per_package: Vec<Vec<IdentEntry>> = program
        .packages
        .par_iter()
        .map(|pkg| build_package(program, pkg))
        .collect();
    IdentIndex {
        entries: per_package.into_iter().flatten().collect(),
    }
}

fn build_package(program: &Program, pkg: &Package) -> Vec<IdentEntry> {
    let mut entries = Vec::new();

    for &f in &pkg.functions {
        let fun = program.func(f);
        if fun.synthetic || fun.parent.is_some() {
            continue;
        }
        let (name, kind) = match fun.receiver {
            Some(recv) => (
                format!("{}.{}", program.type_def(recv).name, fun.name),
                IdentKind::Method,
            ),
            None => (fun.name.clone(), IdentKind::Function),
        };
        entries.push(IdentEntry {
            key: format!("{}.{name}", pkg.path),
            kind,
            package: pkg.id,
            func: Some(f),
            receiver: fun.receiver,
            position: fun.position.clone(),
            exported: fun.exported(),
            generated: program.is_generated_file(pkg.id, &fun.position.file),
            marker: is_marker_method(program, pkg, f),
            name,
        });
    }

    for &t in &pkg.types {
        let ty = program.type_def(t);
        entries.push(IdentEntry {
            name: ty.name.clone(),
            kind: IdentKind::Type,
            package: pkg.id,
            func: None,
            receiver: None,
            position: ty.position.clone(),
            exported: ty.exported(),
            generated: program.is_generated_file(pkg.id, &ty.position.file),
            marker: false,
            key: format!("{}.{}", pkg.path, ty.name),
        });
    }

    for &v in &pkg.values {
        let val = program.value(v);
        entries.push(IdentEntry {
            name: val.name.clone(),
            kind: match val.kind {
                crate::ir::ValKind::Const => IdentKind::Const,
                crate::ir::ValKind::Var => IdentKind::Var,
            },
            package: pkg.id,
            func: None,
            receiver: None,
            position: val.position.clone(),
            exported: val.exported(),
            generated: program.is_generated_file(pkg.id, &val.position.file),
            marker: false,
            key: format!("{}.{}", pkg.path, val.name),
        });
    }

    entries.sort_by(|a, b| {
        (&a.position.file, a.position.line, a.position.col, &a.name).cmp(&(
            &b.position.file,
            b.position.line,
            b.position.col,
            &b.name,
        ))
    });
    entries
}

/// A marker method tags a type as implementing a sealed interface: it is
/// an unexported method with no parameters, no results, and an empty body,
/// and its receiver implements at least one interface declared in the same
/// package. Reporting one as dead would be noise.
fn is_marker_method(program: &Program, pkg: &Package, f: FuncId) -> bool {
    let fun = program.func(f);
    let Some(recv) = fun.receiver else {
        return false;
    };
    if is_exported(&fun.name)
        || fun.sig.param_count != 0
        || fun.sig.result_count != 0
        || !fun.empty_body
    {
        return false;
    }
    pkg.types
        .iter()
        .any(|&t| program.type_def(t).is_interface() && program.implements(recv, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        Function, MethodSig, PkgVariant, Signature, SourceFile, TypeDef, TypeKind, ValId,
    };

    /// lib declares interface sealed { marker() } and type T with an
    /// empty-bodied unexported method marker(), plus an exported F in a
    /// generated file.
    fn marker_program() -> Program {
        let mut program = Program::default();
        let pkg = PkgId(0);

        program.types.push(TypeDef {
            id: TypeId(0),
            package: pkg,
            name: "sealed".into(),
            position: Position::new("lib.src", 1, 6),
            kind: TypeKind::Interface {
                methods: vec![MethodSig {
                    name: "marker".into(),
                    sig: "()".into(),
                }],
            },
        });
        program.types.push(TypeDef {
            id: TypeId(1),
            package: pkg,
            name: "T".into(),
            position: Position::new("lib.src", 4, 6),
            kind: TypeKind::Concrete {
                methods: vec![FuncId(0)],
            },
        });

        program.functions.push(Function {
            id: FuncId(0),
            package: pkg,
            name: "marker".into(),
            receiver: Some(TypeId(1)),
            parent: None,
            anon_index: 0,
            synthetic: false,
            position: Position::new("lib.src", 6, 1),
            sig: Signature {
                key: "()".into(),
                ..Signature::default()
            },
            body: Some(vec![]),
            empty_body: true,
        });
        program.functions.push(Function {
            id: FuncId(1),
            package: pkg,
            name: "F".into(),
            receiver: None,
            parent: None,
            anon_index: 0,
            synthetic: false,
            position: Position::new("lib_gen.src", 2, 1),
            sig: Signature::default(),
            body: Some(vec![]),
            empty_body: true,
        });

        program.packages.push(Package {
            id: pkg,
            path: "example.com/lib".into(),
            name: "lib".into(),
            module: None,
            variant: PkgVariant::Primary,
            imports: vec![],
            files: vec![
                SourceFile {
                    path: "lib.src".into(),
                    generated: false,
                },
                SourceFile {
                    path: "lib_gen.src".into(),
                    generated: true,
                },
            ],
            functions: vec![FuncId(0), FuncId(1)],
            types: vec![TypeId(0), TypeId(1)],
            values: Vec::<ValId>::new(),
            init: FuncId(0),
            diagnostics: vec![],
            xrefs: vec![],
        });
        program
    }

    #[test]
    fn test_marker_method_flagged() {
        let program = marker_program();
        let index = build(&program);
        let marker = index
            .entries
            .iter()
            .find(|e| e.name == "T.marker")
            .unwrap();
        assert!(marker.marker);
        assert_eq!(marker.kind, IdentKind::Method);
        assert!(!marker.exported);
    }

    #[test]
    fn test_generated_flag_from_file() {
        let program = marker_program();
        let index = build(&program);
        let f = index.entries.iter().find(|e| e.name == "F").unwrap();
        assert!(f.generated);
        assert!(f.exported);
    }

    #[test]
    fn test_non_empty_body_is_not_marker() {
        let mut program = marker_program();
        program.functions[0].empty_body = false;
        let index = build(&program);
        let marker = index
            .entries
            .iter()
            .find(|e| e.name == "T.marker")
            .unwrap();
        assert!(!marker.marker);
    }

    #[test]
    fn test_entries_ordered_by_file_then_line() {
        let program = marker_program();
        let index = build(&program);
        let positions: Vec<(&str, u32)> = index
            .entries
            .iter()
            .map(|e| (e.position.file.as_str(), e.position.line))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }
}
