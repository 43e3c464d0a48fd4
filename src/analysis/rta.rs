//! Rapid Type Analysis.
//!
//! The engine co-grows two sets until neither changes: the functions
//! reachable from the roots, and the concrete types that have escaped into
//! dynamic-dispatch contexts. A dynamic call site dispatches only to the
//! methods of currently-live types; when a new type becomes live, every
//! previously seen dynamic site is revisited. Calls through function values
//! resolve against the functions whose addresses have been taken, matched
//! by signature key.
//!
//! The result is deterministic: the worklist is seeded with the roots in
//! order, bodies are scanned in site order, and recorded sites and live
//! types are revisited in insertion order.

use crate::error::{Error, Result};
use crate::graph::{CallGraph, CallKind, CallSite};
use crate::ir::{FuncId, Position, Program, SiteKind, TypeId, TypeKind};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Output of the reachability engine.
#[derive(Debug)]
pub struct RtaResult {
    /// Functions reachable from any root.
    pub reachable: HashSet<FuncId>,
    /// Concrete named types observed escaping into dynamic dispatch, in
    /// discovery order.
    pub runtime_types: Vec<TypeId>,
    /// The full edge set, retained only when requested.
    pub call_graph: Option<CallGraph>,
}

/// A dynamic dispatch site seen so far; revisited as new types go live.
struct DynSite {
    caller: FuncId,
    iface: TypeId,
    method: String,
    position: Position,
}

/// A function-value call site seen so far, keyed by signature.
struct IndirectSite {
    caller: FuncId,
    sig: String,
    position: Position,
}

struct Engine<'a> {
    program: &'a Program,
    reachable: HashSet<FuncId>,
    worklist: VecDeque<FuncId>,
    live: HashSet<TypeId>,
    live_order: Vec<TypeId>,
    dyn_sites: Vec<DynSite>,
    indirect_sites: Vec<IndirectSite>,
    escaped: Vec<FuncId>,
    escaped_set: HashSet<FuncId>,
    anon_children: HashMap<FuncId, Vec<FuncId>>,
    graph: Option<CallGraph>,
}

/// Compute reachability from the given roots. With `build_call_graph` the
/// full edge set is retained for path explanation; otherwise only the
/// reachable-function and runtime-type sets are kept.
pub fn analyze(
    program: &Program,
    roots: &[FuncId],
    build_call_graph: bool,
) -> Result<RtaResult> {
    if roots.is_empty() {
        return Err(Error::AnalysisFailed("no root functions".into()));
    }

    let mut engine = Engine {
        program,
        reachable: HashSet::new(),
        worklist: VecDeque::new(),
        live: HashSet::new(),
        live_order: Vec::new(),
        dyn_sites: Vec::new(),
        indirect_sites: Vec::new(),
        escaped: Vec::new(),
        escaped_set: HashSet::new(),
        anon_children: program.anon_children_map(),
        graph: build_call_graph.then(CallGraph::new),
    };

    for &root in roots {
        if let Some(g) = &mut engine.graph {
            g.ensure_node(root);
        }
        engine.add_reachable(root);
    }

    while let Some(f) = engine.worklist.pop_front() {
        engine.scan(f)?;
    }

    debug!(
        reachable = engine.reachable.len(),
        runtime_types = engine.live_order.len(),
        "fixed point reached"
    );
    Ok(RtaResult {
        reachable: engine.reachable,
        runtime_types: engine.live_order,
        call_graph: engine.graph,
    })
}

impl Engine<'_> {
    fn add_reachable(&mut self, f: FuncId) {
        if self.reachable.insert(f) {
            self.worklist.push_back(f);
        }
    }

    fn add_edge(&mut self, caller: FuncId, callee: FuncId, kind: CallKind, position: &Position) {
        if let Some(g) = &mut self.graph {
            g.add_edge(
                caller,
                callee,
                CallSite {
                    kind,
                    position: position.clone(),
                },
            );
        }
    }

    /// Scan one function body, discovering callees, escaping functions, and
    /// live types.
    fn scan(&mut self, f: FuncId) -> Result<()> {
        // Anonymous functions are values of their parent: reachable with
        // it, and candidates for calls through function values.
        let children = self.anon_children.get(&f).cloned().unwrap_or_default();
        for child in children {
            self.escape(child);
        }

        let Some(body) = self.program.func(f).body.clone() else {
            return Ok(());
        };
        for site in body {
            match site.kind {
                SiteKind::Call(callee) => {
                    self.add_edge(f, callee, CallKind::Static, &site.position);
                    self.add_reachable(callee);
                }
                SiteKind::FuncRef(target) => {
                    self.escape(target);
                }
                SiteKind::Indirect { sig } => {
                    for i in 0..self.escaped.len() {
                        let g = self.escaped[i];
                        if self.program.func(g).sig.key == sig {
                            self.add_edge(f, g, CallKind::Dynamic, &site.position);
                        }
                    }
                    self.indirect_sites.push(IndirectSite {
                        caller: f,
                        sig,
                        position: site.position,
                    });
                }
                SiteKind::DynCall { iface, method } => {
                    let iface = self.program.resolve_alias(iface);
                    if !self.program.type_def(iface).is_interface() {
                        return Err(Error::AnalysisFailed(format!(
                            "dynamic call through non-interface type {}",
                            self.program.type_def(iface).name
                        )));
                    }
                    for i in 0..self.live_order.len() {
                        let ty = self.live_order[i];
                        self.dispatch(f, ty, iface, &method, &site.position);
                    }
                    self.dyn_sites.push(DynSite {
                        caller: f,
                        iface,
                        method,
                        position: site.position,
                    });
                }
                SiteKind::Alloc(ty) | SiteKind::Convert(ty) => {
                    self.make_live(ty);
                }
                SiteKind::TypeRef(_) => {}
            }
        }
        Ok(())
    }

    /// A function's address is taken: it is reachable, and every recorded
    /// call through a function value of its signature can now target it.
    fn escape(&mut self, target: FuncId) {
        if !self.escaped_set.insert(target) {
            return;
        }
        self.escaped.push(target);
        self.add_reachable(target);
        let key = self.program.func(target).sig.key.clone();
        for i in 0..self.indirect_sites.len() {
            if self.indirect_sites[i].sig == key {
                let caller = self.indirect_sites[i].caller;
                let position = self.indirect_sites[i].position.clone();
                self.add_edge(caller, target, CallKind::Dynamic, &position);
            }
        }
    }

    /// A concrete type escaped into a dynamic-dispatch context: revisit
    /// every dynamic site recorded so far.
    fn make_live(&mut self, ty: TypeId) {
        let ty = self.program.resolve_alias(ty);
        if !matches!(self.program.type_def(ty).kind, TypeKind::Concrete { .. }) {
            return;
        }
        if !self.live.insert(ty) {
            return;
        }
        self.live_order.push(ty);
        for i in 0..self.dyn_sites.len() {
            let caller = self.dyn_sites[i].caller;
            let iface = self.dyn_sites[i].iface;
            let method = self.dyn_sites[i].method.clone();
            let position = self.dyn_sites[i].position.clone();
            self.dispatch(caller, ty, iface, &method, &position);
        }
    }

    /// Add the dispatch edge for one (site, live type) pair, if the type's
    /// method set satisfies the interface.
    fn dispatch(
        &mut self,
        caller: FuncId,
        ty: TypeId,
        iface: TypeId,
        method: &str,
        position: &Position,
    ) {
        if !self.program.implements(ty, iface) {
            return;
        }
        if let Some(target) = self.program.method_of(ty, method) {
            self.add_edge(caller, target, CallKind::Dynamic, position);
            self.add_reachable(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        Function, MethodSig, Package, PkgId, PkgVariant, Signature, Site, TypeDef, ValId,
    };

    /// A tiny hand-built program: main allocates Impl, converts it into
    /// Reader, and calls Read dynamically; Unused.Read exists but its type
    /// never escapes.
    fn dispatch_program() -> Program {
        let mut program = Program::default();
        let pkg = PkgId(0);

        program.types.push(TypeDef {
            id: TypeId(0),
            package: pkg,
            name: "Reader".into(),
            position: Position::new("lib.src", 1, 6),
            kind: TypeKind::Interface {
                methods: vec![MethodSig {
                    name: "Read".into(),
                    sig: "()".into(),
                }],
            },
        });
        program.types.push(TypeDef {
            id: TypeId(1),
            package: pkg,
            name: "Impl".into(),
            position: Position::new("lib.src", 4, 6),
            kind: TypeKind::Concrete {
                methods: vec![FuncId(1)],
            },
        });
        program.types.push(TypeDef {
            id: TypeId(2),
            package: pkg,
            name: "Unused".into(),
            position: Position::new("lib.src", 10, 6),
            kind: TypeKind::Concrete {
                methods: vec![FuncId(2)],
            },
        });

        let sig = Signature {
            key: "()".into(),
            ..Signature::default()
        };
        let mk_fn = |id: u32, name: &str, receiver: Option<TypeId>, body: Vec<Site>| Function {
            id: FuncId(id),
            package: pkg,
            name: name.into(),
            receiver,
            parent: None,
            anon_index: 0,
            synthetic: false,
            position: Position::new("lib.src", id + 1, 1),
            sig: sig.clone(),
            body: Some(body),
            empty_body: false,
        };

        program.functions.push(mk_fn(
            0,
            "main",
            None,
            vec![
                Site {
                    kind: SiteKind::Alloc(TypeId(1)),
                    position: Position::new("main.src", 2, 1),
                },
                Site {
                    kind: SiteKind::Convert(TypeId(1)),
                    position: Position::new("main.src", 3, 1),
                },
                Site {
                    kind: SiteKind::DynCall {
                        iface: TypeId(0),
                        method: "Read".into(),
                    },
                    position: Position::new("main.src", 4, 1),
                },
            ],
        ));
        program.functions.push(mk_fn(1, "Read", Some(TypeId(1)), vec![]));
        program.functions.push(mk_fn(2, "Read", Some(TypeId(2)), vec![]));

        program.packages.push(Package {
            id: pkg,
            path: "example.com/lib".into(),
            name: "main".into(),
            module: None,
            variant: PkgVariant::Primary,
            imports: vec![],
            files: vec![],
            functions: vec![FuncId(0), FuncId(1), FuncId(2)],
            types: vec![TypeId(0), TypeId(1), TypeId(2)],
            values: Vec::<ValId>::new(),
            init: FuncId(0),
            diagnostics: vec![],
            xrefs: vec![],
        });
        program
    }

    #[test]
    fn test_dynamic_dispatch_to_live_type_only() {
        let program = dispatch_program();
        let res = analyze(&program, &[FuncId(0)], true).unwrap();

        assert!(res.reachable.contains(&FuncId(0)));
        assert!(res.reachable.contains(&FuncId(1)), "Impl.Read dispatched");
        assert!(
            !res.reachable.contains(&FuncId(2)),
            "Unused.Read must stay dead: its type never escapes"
        );
        assert_eq!(res.runtime_types, vec![TypeId(1)]);

        let graph = res.call_graph.unwrap();
        let dynamic_edges: Vec<_> = graph
            .edges()
            .filter(|(_, _, s)| s.kind == CallKind::Dynamic)
            .collect();
        assert_eq!(dynamic_edges.len(), 1);
        assert_eq!(dynamic_edges[0].1, FuncId(1));
    }

    #[test]
    fn test_type_liveness_revisits_earlier_sites() {
        // The dynamic call is scanned before the type goes live: the
        // fixed point must still find the dispatch target.
        let mut program = dispatch_program();
        let body = program.functions[0].body.as_mut().unwrap();
        body.rotate_left(2); // dyncall first, alloc/convert after
        let res = analyze(&program, &[FuncId(0)], false).unwrap();
        assert!(res.reachable.contains(&FuncId(1)));
    }

    #[test]
    fn test_indirect_call_matches_escaped_signature() {
        let mut program = dispatch_program();
        // main takes Impl.Read's address and calls through a value.
        program.functions[0].body = Some(vec![
            Site {
                kind: SiteKind::Indirect { sig: "()".into() },
                position: Position::new("main.src", 2, 1),
            },
            Site {
                kind: SiteKind::FuncRef(FuncId(1)),
                position: Position::new("main.src", 3, 1),
            },
        ]);
        let res = analyze(&program, &[FuncId(0)], true).unwrap();
        assert!(res.reachable.contains(&FuncId(1)));
        let graph = res.call_graph.unwrap();
        assert!(graph
            .edges()
            .any(|(c, t, s)| c == FuncId(0) && t == FuncId(1) && s.kind == CallKind::Dynamic));
    }

    #[test]
    fn test_reachability_closure() {
        // Every statically-targeted callee of a reachable function is
        // itself reachable.
        let program = dispatch_program();
        let res = analyze(&program, &[FuncId(0)], false).unwrap();
        for &f in &res.reachable {
            let Some(body) = &program.func(f).body else {
                continue;
            };
            for site in body {
                if let SiteKind::Call(callee) = site.kind {
                    assert!(res.reachable.contains(&callee));
                }
            }
        }
    }

    #[test]
    fn test_empty_roots_fail() {
        let program = dispatch_program();
        assert!(matches!(
            analyze(&program, &[], false),
            Err(Error::AnalysisFailed(_))
        ));
    }
}
