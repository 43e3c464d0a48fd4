//! External-usage index for over-export analysis.
//!
//! An exported declaration counts as externally used when any of these
//! witnesses exists:
//!
//! 1. a call-graph edge from a function in a different package;
//! 2. a type mention in a reachable function of a different package
//!    (signature types, assertions, conversions, allocations, composite
//!    literals, element types, generic type arguments);
//! 3. a type-check cross-reference from a file in a different package
//!    (constants, variables, aliases, and types that never become a call
//!    edge);
//! 4. a position match with any of the above: a generic instantiation is a
//!    distinct IR node sharing the position of its source-level origin, so
//!    usage is unioned by position as well as by key;
//! 5. membership of the type in the runtime-type set: it escaped into
//!    dynamic dispatch.
//!
//! A type that enters the runtime-type set only through an unreachable
//! reflective site is not counted; RTA does not invent edges for
//! reflection, and neither does this index.
//!
//! Package comparison strips the conventional `_test` suffix from the
//! referencing side when tests are not loaded as first-class packages;
//! with tests included, the external test package is a distinct package
//! and its references legitimately witness external use.

use super::rta::RtaResult;
use crate::graph::CallGraph;
use crate::ir::{Position, Program, SiteKind, SymbolRef, TypeId};
use std::collections::HashSet;
use tracing::debug;

/// The set of externally-used declarations, queryable by key and by
/// declaration position.
#[derive(Debug, Default)]
pub struct UsageIndex {
    keys: HashSet<String>,
    positions: HashSet<Position>,
}

impl UsageIndex {
    pub fn contains(&self, key: &str, position: &Position) -> bool {
        self.keys.contains(key) || (position.is_valid() && self.positions.contains(position))
    }

    fn mark(&mut self, key: String, position: &Position) {
        self.keys.insert(key);
        if position.is_valid() {
            self.positions.insert(position.clone());
        }
    }
}

/// Build the usage index for the packages in `targets` (a set of import
/// paths).
pub fn build(
    program: &Program,
    rta: &RtaResult,
    graph: &CallGraph,
    targets: &HashSet<String>,
    include_tests: bool,
) -> UsageIndex {
    let mut index = UsageIndex::default();
    let normalize = |path: &str| -> String {
        if !include_tests {
            path.strip_suffix("_test").unwrap_or(path).to_string()
        } else {
            path.to_string()
        }
    };

    // 1. Cross-package call edges.
    for (caller, callee, _) in graph.edges() {
        let caller_pkg = normalize(program.func_pkg_path(caller));
        let callee_pkg = program.func_pkg_path(callee);
        if targets.contains(callee_pkg) && caller_pkg != callee_pkg {
            index.mark(program.func_key(callee), &program.func(callee).position);
        }
    }

    // 2. Type mentions in reachable functions.
    for fun in &program.functions {
        if !rta.reachable.contains(&fun.id) {
            continue;
        }
        let caller_pkg = normalize(program.func_pkg_path(fun.id));
        let mention = |ty: TypeId, index: &mut UsageIndex| {
            mark_type(program, ty, &caller_pkg, targets, index);
        };
        for &ty in fun.sig.params.iter().chain(&fun.sig.results) {
            mention(ty, &mut index);
        }
        let Some(body) = &fun.body else { continue };
        for site in body {
            match &site.kind {
                SiteKind::Alloc(ty) | SiteKind::Convert(ty) | SiteKind::TypeRef(ty) => {
                    mention(*ty, &mut index)
                }
                SiteKind::DynCall { iface, .. } => mention(*iface, &mut index),
                _ => {}
            }
        }
    }

    // 3. Type-check cross-references, from every loaded file.
    for pkg in &program.packages {
        let caller_pkg = normalize(&pkg.path);
        for xref in &pkg.xrefs {
            let (decl_pkg, exported, key, position) = describe(program, xref.target);
            if targets.contains(decl_pkg) && caller_pkg != decl_pkg && exported {
                index.mark(key, position);
            }
        }
    }

    // 5. Types that escaped into dynamic dispatch.
    for &ty in &rta.runtime_types {
        let td = program.type_def(ty);
        let pkg_path = &program.package(td.package).path;
        if targets.contains(pkg_path) {
            index.mark(format!("{pkg_path}.{}", td.name), &td.position);
        }
    }

    debug!(
        keys = index.keys.len(),
        positions = index.positions.len(),
        "usage index built"
    );
    index
}

fn mark_type(
    program: &Program,
    ty: TypeId,
    caller_pkg: &str,
    targets: &HashSet<String>,
    index: &mut UsageIndex,
) {
    let td = program.type_def(ty);
    let pkg_path = &program.package(td.package).path;
    if targets.contains(pkg_path) && caller_pkg != pkg_path.as_str() && td.exported() {
        index.mark(format!("{pkg_path}.{}", td.name), &td.position);
    }
}

/// Declaring package, exportedness, usage key, and position of a
/// referenced declaration.
fn describe(program: &Program, sym: SymbolRef) -> (&str, bool, String, &Position) {
    match sym {
        SymbolRef::Func(f) => {
            let fun = program.func(f);
            (
                program.func_pkg_path(f),
                fun.exported(),
                program.func_key(f),
                &fun.position,
            )
        }
        SymbolRef::Type(t) => {
            let td = program.type_def(t);
            let path = &program.package(td.package).path;
            (
                path,
                td.exported(),
                format!("{path}.{}", td.name),
                &td.position,
            )
        }
        SymbolRef::Value(v) => {
            let val = program.value(v);
            let path = &program.package(val.package).path;
            (
                path,
                val.exported(),
                format!("{path}.{}", val.name),
                &val.position,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_by_key_or_position() {
        let mut index = UsageIndex::default();
        let pos = Position::new("lib.src", 3, 1);
        index.mark("example.com/lib.F".into(), &pos);

        assert!(index.contains("example.com/lib.F", &Position::none()));
        // A distinct key sharing the position: the generic-instantiation
        // case.
        assert!(index.contains("example.com/lib.F[int]", &pos));
        assert!(!index.contains("example.com/lib.G", &Position::new("lib.src", 9, 1)));
    }

    #[test]
    fn test_invalid_positions_never_match() {
        let mut index = UsageIndex::default();
        index.mark("k".into(), &Position::none());
        assert!(!index.contains("other", &Position::none()));
    }
}
