//! Integration tests for path explanation.

use deadwood::analysis::{self, RtaResult};
use deadwood::graph::CallGraph;
use deadwood::load::{self, LoadOptions};
use deadwood::report;
use deadwood::{Error, IdentIndex, Program};
use std::path::PathBuf;

fn fixtures_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

struct Pipeline {
    program: Program,
    roots: Vec<deadwood::ir::FuncId>,
    rta: RtaResult,
    graph: CallGraph,
    index: IdentIndex,
}

fn pipeline(fixture: &str) -> Pipeline {
    let opts = LoadOptions {
        tests: false,
        tags: vec![],
        dir: fixtures_path(fixture),
    };
    let loaded = load::load(&["./...".to_string()], &opts).expect("fixture loads");
    let program = loaded.program;
    let roots = analysis::collect_roots(&program, &loaded.initial).unwrap();
    let rta = analysis::analyze(&program, &roots, true).unwrap();
    let graph = rta.call_graph.as_ref().unwrap().without_synthetic(&program);
    let index = analysis::build_index(&program);
    Pipeline {
        program,
        roots,
        rta,
        graph,
        index,
    }
}

fn explain(p: &Pipeline, target: &str) -> deadwood::Result<Vec<report::JsonEdge>> {
    let (root, path) = analysis::why_live(&p.program, &p.graph, &p.roots, &p.index, &p.rta, target)?;
    Ok(report::edges_to_json(&p.program, root, &path))
}

#[test]
fn test_path_through_dynamic_dispatch() {
    let p = pipeline("whylive");
    let edges = explain(&p, "example.com/w/pkg.Impl.Read").unwrap();

    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0].initial, "example.com/w.main");
    assert_eq!(edges[0].kind, "static");
    assert_eq!(edges[0].callee, "example.com/w.run");
    assert!(edges[1].initial.is_empty());
    assert_eq!(edges[1].kind, "dynamic");
    assert_eq!(edges[1].callee, "example.com/w/pkg.Impl.Read");
    assert_eq!(edges[1].position.line, 11);
}

#[test]
fn test_static_path_preferred() {
    // run is reachable purely statically; no dynamic edge may appear even
    // though dynamic edges exist in the graph.
    let p = pipeline("whylive");
    let edges = explain(&p, "example.com/w.run").unwrap();
    assert_eq!(edges.len(), 1);
    assert!(edges.iter().all(|e| e.kind == "static"));
}

#[test]
fn test_not_found() {
    let p = pipeline("whylive");
    assert!(matches!(
        explain(&p, "example.com/w/pkg.NoSuch"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_is_dead() {
    let p = pipeline("whylive");
    assert!(matches!(
        explain(&p, "example.com/w/pkg.Other.Read"),
        Err(Error::IsDead(_))
    ));
}

#[test]
fn test_is_root() {
    let p = pipeline("whylive");
    assert!(matches!(
        explain(&p, "example.com/w.main"),
        Err(Error::IsRoot(_))
    ));
}

#[test]
fn test_reflective_only() {
    // Force a function into the reachable set without any call edge, the
    // shape RTA produces for targets kept alive through reflection.
    let mut p = pipeline("whylive");
    let other_read = p
        .index
        .functions()
        .find(|e| p.program.pretty_name(e.func.unwrap(), true) == "example.com/w/pkg.Other.Read")
        .and_then(|e| e.func)
        .unwrap();
    p.rta.reachable.insert(other_read);
    assert!(matches!(
        explain(&p, "example.com/w/pkg.Other.Read"),
        Err(Error::ReflectiveOnly(_))
    ));
}

#[test]
fn test_text_rendering() {
    let p = pipeline("whylive");
    let edges = explain(&p, "example.com/w/pkg.Impl.Read").unwrap();
    let text = report::render_edges_text(&edges);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "                   example.com/w.main");
    assert_eq!(lines[1], "  static@L0006 --> example.com/w.run");
    assert_eq!(lines[2], " dynamic@L0011 --> example.com/w/pkg.Impl.Read");
}

#[test]
fn test_json_edges() {
    let p = pipeline("whylive");
    let edges = explain(&p, "example.com/w/pkg.Impl.Read").unwrap();
    let json = serde_json::to_string(&edges).unwrap();
    assert!(json.contains(r#""Kind":"dynamic""#));
    assert!(json.contains(r#""Callee":"example.com/w/pkg.Impl.Read""#));
    // Initial is omitted on non-first edges.
    assert_eq!(json.matches("Initial").count(), 1);
}

#[test]
fn test_dynamic_edges_reach_fixed_point_deterministically() {
    let p1 = pipeline("whylive");
    let p2 = pipeline("whylive");
    let e1 = explain(&p1, "example.com/w/pkg.Impl.Read").unwrap();
    let e2 = explain(&p2, "example.com/w/pkg.Impl.Read").unwrap();
    assert_eq!(
        serde_json::to_string(&e1).unwrap(),
        serde_json::to_string(&e2).unwrap()
    );
}
