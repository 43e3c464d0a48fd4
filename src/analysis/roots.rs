//! Entry-point selection.
//!
//! Every executable package in the initial set contributes its program
//! entry function and its package initialiser as reachability roots. The
//! list is ordered for path searches: roots from packages that do not
//! depend on the testing package come first, and entry functions come
//! before initialisers.

use crate::error::{Error, Result};
use crate::ir::{FuncId, PkgId, Program};
use tracing::debug;

const TESTING_PATH: &str = "testing";

/// Collect the root functions of the executable packages in `initial`, in
/// preferred order.
pub fn collect_roots(program: &Program, initial: &[PkgId]) -> Result<Vec<FuncId>> {
    let mut roots: Vec<FuncId> = Vec::new();
    for &pkg in initial {
        if !program.is_executable(pkg) {
            continue;
        }
        debug!(package = %program.package(pkg).path, "root package");
        if let Some(main) = program.main_of(pkg) {
            roots.push(main);
        }
        roots.push(program.package(pkg).init);
    }
    if roots.is_empty() {
        return Err(Error::NoMainPackages);
    }

    // Preferred order, applied as tie-breakers: non-test packages before
    // test packages, entry functions before initialisers, otherwise stable.
    roots.sort_by_key(|&f| {
        let fun = program.func(f);
        let test = program.transitively_imports(fun.package, TESTING_PATH);
        (test, fun.is_init())
    });
    Ok(roots)
}
