//! Path explanation: why is a function not dead?
//!
//! Finds a shortest call chain from an entry point to the named function.
//! The search runs in two passes, first over static edges only, then
//! allowing dynamic edges, so explanations prefer chains a reader can
//! follow without reasoning about dispatch. Roots are tried in the
//! preferred order of the entry-point selector; the first path found wins.
//! Synthetic wrappers must be flattened out of the graph before calling in
//! (see [`crate::graph::CallGraph::without_synthetic`]).

use super::index::IdentIndex;
use super::rta::RtaResult;
use super::verdict::reachable_positions;
use crate::error::{Error, Result};
use crate::graph::{CallGraph, CallKind};
use crate::ir::{FuncId, Position, Program};
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet, VecDeque};

/// One step of an explanation path.
#[derive(Debug, Clone)]
pub struct PathEdge {
    pub caller: FuncId,
    pub callee: FuncId,
    pub kind: CallKind,
    pub position: Position,
}

/// Find a shortest path from some root to a function whose qualified
/// pretty name equals `target` (`path.Func` or `path.Type.Method`).
/// Returns the chosen root and the edges from it to the target.
pub fn why_live(
    program: &Program,
    graph: &CallGraph,
    roots: &[FuncId],
    index: &IdentIndex,
    rta: &RtaResult,
    target: &str,
) -> Result<(FuncId, Vec<PathEdge>)> {
    let mut targets: HashSet<FuncId> = index
        .functions()
        .filter_map(|e| e.func)
        .filter(|&f| program.pretty_name(f, true) == target)
        .collect();
    if targets.is_empty() {
        return Err(Error::NotFound(target.to_string()));
    }

    // Drop the unreachable candidates; position identity keeps test-variant
    // duplicates of a live declaration in the target set.
    let live = reachable_positions(program, rta);
    targets.retain(|&f| live.contains(&program.func(f).position));
    if targets.is_empty() {
        return Err(Error::IsDead(target.to_string()));
    }

    for allow_dynamic in [false, true] {
        // One visited map per pass, shared across roots: a node fully
        // explored from an earlier root cannot reach the target.
        let mut seen: HashMap<NodeIndex, Option<(NodeIndex, PathEdge)>> = HashMap::new();
        for &root in roots {
            let Some(start) = graph.node(root) else {
                continue;
            };
            if let Some(path) = bfs(graph, start, &targets, allow_dynamic, &mut seen) {
                if path.is_empty() {
                    return Err(Error::IsRoot(program.pretty_name(root, true)));
                }
                return Ok((root, path));
            }
        }
    }

    // Reachable per RTA, but no explaining edge chain: the function is
    // kept alive by something the call graph does not model.
    Err(Error::ReflectiveOnly(target.to_string()))
}

fn bfs(
    graph: &CallGraph,
    start: NodeIndex,
    targets: &HashSet<FuncId>,
    allow_dynamic: bool,
    seen: &mut HashMap<NodeIndex, Option<(NodeIndex, PathEdge)>>,
) -> Option<Vec<PathEdge>> {
    if seen.contains_key(&start) {
        return None;
    }
    seen.insert(start, None);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        if targets.contains(&graph.func_of(node)) {
            // Walk predecessors back to the root.
            let mut path = Vec::new();
            let mut cur = node;
            while let Some(Some((pred, edge))) = seen.get(&cur) {
                path.push(edge.clone());
                cur = *pred;
            }
            path.reverse();
            return Some(path);
        }

        for (next, site) in graph.out_edges(node) {
            if !allow_dynamic && site.kind == CallKind::Dynamic {
                continue;
            }
            if seen.contains_key(&next) {
                continue;
            }
            seen.insert(
                next,
                Some((
                    node,
                    PathEdge {
                        caller: graph.func_of(node),
                        callee: graph.func_of(next),
                        kind: site.kind,
                        position: site.position.clone(),
                    },
                )),
            );
            queue.push_back(next);
        }
    }
    None
}
