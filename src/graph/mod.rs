//! The call graph produced by reachability analysis.
//!
//! Nodes are functions, edges are call sites tagged static or dynamic. The
//! graph is a multigraph: two distinct sites calling the same callee keep
//! their own edges and positions.

use crate::ir::{FuncId, Position, Program};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashMap;

/// How a call site selects its callee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// Callee determined by the call site alone.
    Static,
    /// Callee determined by the runtime type of the receiver or value.
    Dynamic,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Static => "static",
            CallKind::Dynamic => "dynamic",
        }
    }
}

/// One call edge: where the call happens and how it dispatches.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub kind: CallKind,
    pub position: Position,
}

/// Directed multigraph over reachable functions.
#[derive(Debug, Default)]
pub struct CallGraph {
    inner: DiGraph<FuncId, CallSite>,
    node_map: HashMap<FuncId, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the function as a node, returning the existing node if present.
    pub fn ensure_node(&mut self, f: FuncId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&f) {
            return idx;
        }
        let idx = self.inner.add_node(f);
        self.node_map.insert(f, idx);
        idx
    }

    pub fn add_edge(&mut self, caller: FuncId, callee: FuncId, site: CallSite) {
        let from = self.ensure_node(caller);
        let to = self.ensure_node(callee);
        self.inner.add_edge(from, to, site);
    }

    pub fn node(&self, f: FuncId) -> Option<NodeIndex> {
        self.node_map.get(&f).copied()
    }

    pub fn func_of(&self, idx: NodeIndex) -> FuncId {
        self.inner[idx]
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Outgoing edges of a node as (target, site) pairs.
    pub fn out_edges(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &CallSite)> {
        self.inner
            .edges_directed(idx, petgraph::Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
    }

    /// Every edge as a (caller, callee, site) triple.
    pub fn edges(&self) -> impl Iterator<Item = (FuncId, FuncId, &CallSite)> {
        self.inner
            .edge_references()
            .map(|e| (self.inner[e.source()], self.inner[e.target()], e.weight()))
    }

    /// A copy of the graph with synthetic functions flattened away, so path
    /// explanations describe source-level callers. Package initialisers
    /// stay visible. An edge into a synthetic node is spliced through to
    /// every non-synthetic function the synthetic subgraph reaches, keeping
    /// the original site's kind and position.
    pub fn without_synthetic(&self, program: &Program) -> CallGraph {
        let keep = |f: FuncId| {
            let fun = program.func(f);
            !fun.synthetic || fun.is_init()
        };

        let mut out = CallGraph::new();
        for idx in self.inner.node_indices() {
            let f = self.inner[idx];
            if !keep(f) {
                continue;
            }
            out.ensure_node(f);
            for (target, site) in self.out_edges(idx) {
                let t = self.inner[target];
                if keep(t) {
                    out.add_edge(f, t, site.clone());
                    continue;
                }
                // Walk through the synthetic region to its non-synthetic
                // frontier, carrying the original site.
                let mut stack = vec![target];
                let mut seen = vec![target];
                while let Some(n) = stack.pop() {
                    for (next, _) in self.out_edges(n) {
                        let nf = self.inner[next];
                        if keep(nf) {
                            out.add_edge(f, nf, site.clone());
                        } else if !seen.contains(&next) {
                            seen.push(next);
                            stack.push(next);
                        }
                    }
                }
            }
        }
        out
    }
}
