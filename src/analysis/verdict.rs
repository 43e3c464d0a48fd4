//! Verdict computation: which index entries are dead, and which exported
//! entries are only used inside their own package.

use super::index::IdentIndex;
use super::rta::RtaResult;
use super::usage::UsageIndex;
use crate::filter::PackageFilter;
use crate::ir::{FuncId, PkgId, Position, Program};
use crate::load::patterns;
use std::collections::HashSet;
use tracing::debug;

/// A function with no path from any entry point.
#[derive(Debug, Clone)]
pub struct DeadFunction {
    pub func: FuncId,
    /// Pretty name without package qualifier (`F`, `T.M`, `F$1`).
    pub name: String,
    pub package: PkgId,
    pub position: Position,
    pub generated: bool,
}

/// An exported identifier with no external witness.
#[derive(Debug, Clone)]
pub struct OverExport {
    pub name: String,
    pub kind: &'static str,
    pub position: Position,
    pub pkg_path: String,
}

/// The positions of every reachable function. Test variants compile the
/// same declaration into multiple IR functions; position is the canonical
/// identity, so if any variant is live, all of them are. Synthetic
/// initialisers have no position but are recorded anyway so their zero
/// position never leaks into verdicts.
pub fn reachable_positions(program: &Program, rta: &RtaResult) -> HashSet<Position> {
    let mut positions = HashSet::new();
    for &f in &rta.reachable {
        let fun = program.func(f);
        if fun.position.is_valid() || fun.is_init() {
            positions.insert(fun.position.clone());
        }
    }
    positions
}

/// Every source-level function whose position is not reachable, except
/// marker methods and (unless requested) functions in generated files.
/// Duplicates from test variants are collapsed by position.
pub fn dead_functions(
    program: &Program,
    index: &IdentIndex,
    rta: &RtaResult,
    include_generated: bool,
) -> Vec<DeadFunction> {
    let mut seen = reachable_positions(program, rta);
    let mut dead = Vec::new();

    for entry in index.functions() {
        if seen.contains(&entry.position) {
            continue;
        }
        // Suppress duplicates at the same position.
        seen.insert(entry.position.clone());

        if entry.generated && !include_generated {
            continue;
        }
        if entry.marker {
            continue;
        }
        let func = entry.func.expect("function entries carry their id");
        dead.push(DeadFunction {
            func,
            name: program.pretty_name(func, false),
            package: entry.package,
            position: entry.position.clone(),
            generated: entry.generated,
        });
    }

    dead.sort_by(|a, b| {
        let ap = &program.package(a.package).path;
        let bp = &program.package(b.package).path;
        (ap, &a.position.file, a.position.line, a.position.col).cmp(&(
            bp,
            &b.position.file,
            b.position.line,
            b.position.col,
        ))
    });
    debug!(count = dead.len(), "dead functions");
    dead
}

/// Every exported entry of a target package with no entry in the usage
/// index, after the generated, filter, and exclude rules.
#[allow(clippy::too_many_arguments)]
pub fn over_exported(
    program: &Program,
    index: &IdentIndex,
    usage: &UsageIndex,
    targets: &HashSet<String>,
    include_generated: bool,
    filter: &PackageFilter,
    exclude: &[String],
) -> Vec<OverExport> {
    let mut seen_keys = HashSet::new();
    let mut out = Vec::new();

    for entry in &index.entries {
        let pkg = program.package(entry.package);
        if !targets.contains(&pkg.path) || !entry.exported {
            continue;
        }
        // A method of an unexported type has no external surface even when
        // its own name is exported.
        if let Some(recv) = entry.receiver {
            if !program.type_def(recv).exported() {
                continue;
            }
        }
        // Test variants duplicate every declaration under the same key.
        if !seen_keys.insert(entry.key.clone()) {
            continue;
        }
        if usage.contains(&entry.key, &entry.position) {
            continue;
        }
        if entry.generated && !include_generated {
            continue;
        }
        if !filter.matches(&pkg.path) {
            continue;
        }
        if patterns::match_any(exclude, &pkg.path) {
            continue;
        }
        out.push(OverExport {
            name: entry.name.clone(),
            kind: entry.kind.as_str(),
            position: entry.position.clone(),
            pkg_path: pkg.path.clone(),
        });
    }

    out.sort_by(|a, b| {
        (&a.pkg_path, &a.position.file, a.position.line, a.position.col, &a.name).cmp(&(
            &b.pkg_path,
            &b.position.file,
            b.position.line,
            b.position.col,
            &b.name,
        ))
    });
    debug!(count = out.len(), "over-exported identifiers");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, build_index};
    use crate::ir::{
        Function, MethodSig, Package, PkgVariant, Signature, Site, SiteKind, SourceFile, TypeDef,
        TypeId, TypeKind, ValId, ValKind, ValueDecl,
    };

    /// main calls lib.F; lib.G is dead; lib exports const K used only
    /// inside lib.
    fn two_package_program() -> Program {
        let mut program = Program::default();

        // lib: F (line 1), G (line 5), const K (line 8)
        program.functions.push(Function {
            id: FuncId(0),
            package: PkgId(0),
            name: "F".into(),
            receiver: None,
            parent: None,
            anon_index: 0,
            synthetic: false,
            position: Position::new("lib/lib.src", 1, 1),
            sig: Signature::default(),
            body: Some(vec![]),
            empty_body: true,
        });
        program.functions.push(Function {
            id: FuncId(1),
            package: PkgId(0),
            name: "G".into(),
            receiver: None,
            parent: None,
            anon_index: 0,
            synthetic: false,
            position: Position::new("lib/lib.src", 5, 1),
            sig: Signature::default(),
            body: Some(vec![]),
            empty_body: true,
        });
        program.values.push(ValueDecl {
            id: ValId(0),
            package: PkgId(0),
            name: "K".into(),
            kind: ValKind::Const,
            position: Position::new("lib/lib.src", 8, 7),
        });
        program.packages.push(Package {
            id: PkgId(0),
            path: "example.com/lib".into(),
            name: "lib".into(),
            module: Some("example.com".into()),
            variant: PkgVariant::Primary,
            imports: vec![],
            files: vec![SourceFile {
                path: "lib/lib.src".into(),
                generated: false,
            }],
            functions: vec![FuncId(0), FuncId(1)],
            types: Vec::<TypeId>::new(),
            values: vec![ValId(0)],
            init: FuncId(3),
            diagnostics: vec![],
            xrefs: vec![],
        });

        // main: calls lib.F
        program.functions.push(Function {
            id: FuncId(2),
            package: PkgId(1),
            name: "main".into(),
            receiver: None,
            parent: None,
            anon_index: 0,
            synthetic: false,
            position: Position::new("main.src", 3, 1),
            sig: Signature::default(),
            body: Some(vec![Site {
                kind: SiteKind::Call(FuncId(0)),
                position: Position::new("main.src", 4, 2),
            }]),
            empty_body: false,
        });
        program.packages.push(Package {
            id: PkgId(1),
            path: "example.com/app".into(),
            name: "main".into(),
            module: Some("example.com".into()),
            variant: PkgVariant::Primary,
            imports: vec![PkgId(0)],
            files: vec![SourceFile {
                path: "main.src".into(),
                generated: false,
            }],
            functions: vec![FuncId(2)],
            types: Vec::<TypeId>::new(),
            values: Vec::<ValId>::new(),
            init: FuncId(4),
            diagnostics: vec![],
            xrefs: vec![],
        });

        for (idx, pkg) in [(3u32, PkgId(0)), (4u32, PkgId(1))] {
            program.functions.push(Function {
                id: FuncId(idx),
                package: pkg,
                name: "init".into(),
                receiver: None,
                parent: None,
                anon_index: 0,
                synthetic: true,
                position: Position::none(),
                sig: Signature::default(),
                body: Some(vec![]),
                empty_body: false,
            });
        }
        program
    }

    #[test]
    fn test_basic_dead_function() {
        let program = two_package_program();
        let rta = analyze(&program, &[FuncId(2), FuncId(4)], false).unwrap();
        let index = build_index(&program);
        let dead = dead_functions(&program, &index, &rta, false);

        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].name, "G");
        assert_eq!(dead[0].position, Position::new("lib/lib.src", 5, 1));
    }

    #[test]
    fn test_over_exported_const() {
        let program = two_package_program();
        let rta = analyze(&program, &[FuncId(2), FuncId(4)], true).unwrap();
        let index = build_index(&program);
        let graph = rta.call_graph.as_ref().unwrap();
        let targets: HashSet<String> = ["example.com/lib".to_string()].into();
        let usage = crate::analysis::build_usage(&program, &rta, graph, &targets, false);

        let filter = PackageFilter::disabled();
        let reports = over_exported(&program, &index, &usage, &targets, false, &filter, &[]);
        let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
        // F is called from app; K and G have no external witness.
        assert!(names.contains(&"K"));
        assert!(names.contains(&"G"));
        assert!(!names.contains(&"F"));
    }

    #[test]
    fn test_position_collapse_across_variants() {
        let mut program = two_package_program();
        // A test-variant duplicate of G at the same position, reachable.
        program.functions.push(Function {
            id: FuncId(5),
            package: PkgId(0),
            name: "G".into(),
            receiver: None,
            parent: None,
            anon_index: 0,
            synthetic: false,
            position: Position::new("lib/lib.src", 5, 1),
            sig: Signature::default(),
            body: Some(vec![]),
            empty_body: true,
        });
        let rta = analyze(&program, &[FuncId(2), FuncId(5)], false).unwrap();
        let index = build_index(&program);
        let dead = dead_functions(&program, &index, &rta, false);
        assert!(
            dead.iter().all(|d| d.name != "G"),
            "a live variant keeps every same-position duplicate alive"
        );
    }

    #[test]
    fn test_marker_interface_suppression() {
        let mut program = two_package_program();
        program.types.push(TypeDef {
            id: TypeId(0),
            package: PkgId(0),
            name: "sealed".into(),
            position: Position::new("lib/lib.src", 11, 6),
            kind: TypeKind::Interface {
                methods: vec![MethodSig {
                    name: "m".into(),
                    sig: "()".into(),
                }],
            },
        });
        program.types.push(TypeDef {
            id: TypeId(1),
            package: PkgId(0),
            name: "T".into(),
            position: Position::new("lib/lib.src", 13, 6),
            kind: TypeKind::Concrete {
                methods: vec![FuncId(5)],
            },
        });
        program.functions.push(Function {
            id: FuncId(5),
            package: PkgId(0),
            name: "m".into(),
            receiver: Some(TypeId(1)),
            parent: None,
            anon_index: 0,
            synthetic: false,
            position: Position::new("lib/lib.src", 15, 1),
            sig: Signature {
                key: "()".into(),
                ..Signature::default()
            },
            body: Some(vec![]),
            empty_body: true,
        });
        program.packages[0].functions.push(FuncId(5));
        program.packages[0].types = vec![TypeId(0), TypeId(1)];

        let rta = analyze(&program, &[FuncId(2), FuncId(4)], false).unwrap();
        let index = build_index(&program);
        let dead = dead_functions(&program, &index, &rta, false);
        assert!(
            dead.iter().all(|d| d.name != "T.m"),
            "marker methods are never reported"
        );
    }
}
