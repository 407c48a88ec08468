//! Control-flow graph over lowered IR.
//!
//! Built with `petgraph`'s `Graph`, mirroring the teacher's use of
//! `petgraph::stable_graph::StableGraph` for its own dual computational
//! graph. Every block-opening statement gets a matching `Sink` node
//! recording which node opened it (`CfgNode::Sink::source`), so a scope
//! walk can always find the unique node that closes any open block
//! (spec.md §3's CFG invariant).

use petgraph::graph::{Graph, NodeIndex};
use petgraph::Direction;

use crate::ir::{BlockKind, Stmt};

/// One CFG node: either a plain statement, or the `Sink` marking the end
/// of a block opened by `source`.
#[derive(Debug, Clone)]
pub enum CfgPayload {
    Stmt(Stmt),
    /// Closes the block opened at `source`.
    Sink { kind: BlockKind, source: NodeIndex },
}

/// The control-flow graph for one gear body: a directed graph of
/// [`CfgPayload`] nodes. Back-edges (loop bodies returning to their
/// test) are ordinary graph edges, distinguished from forward edges only
/// by target-index-before-source-index order -- `petgraph::Direction`
/// walks both uniformly.
pub struct Cfg {
    pub graph: Graph<CfgPayload, ()>,
    pub entry: NodeIndex,
}

impl Cfg {
    /// Builds the CFG for a gear body's statement sequence.
    pub fn build(body: &[Stmt]) -> Self {
        let mut graph = Graph::new();
        let entry = graph.add_node(CfgPayload::Stmt(Stmt::BaseBlock(Vec::new())));
        let mut builder = Builder { graph: &mut graph };
        let exit = builder.lower_sequence(entry, body);
        let _ = exit;
        Cfg { graph, entry }
    }

    /// All `Sink` nodes in the graph, in node-index order (which is also
    /// construction order since `petgraph::Graph` never reuses indices).
    pub fn sinks(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|n| matches!(self.graph[*n], CfgPayload::Sink { .. }))
            .collect()
    }

    /// The predecessors of `node`, in insertion order.
    pub fn predecessors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph.neighbors_directed(node, Direction::Incoming).collect()
    }

    pub fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.graph.neighbors_directed(node, Direction::Outgoing).collect()
    }
}

struct Builder<'g> {
    graph: &'g mut Graph<CfgPayload, ()>,
}

impl<'g> Builder<'g> {
    /// Lowers a flat statement sequence into a chain of CFG nodes
    /// starting at `from`, returning the last node of the chain (the
    /// point later statements attach to).
    fn lower_sequence(&mut self, from: NodeIndex, stmts: &[Stmt]) -> NodeIndex {
        let mut cur = from;
        for stmt in stmts {
            cur = self.lower_stmt(cur, stmt);
        }
        cur
    }

    fn lower_stmt(&mut self, prev: NodeIndex, stmt: &Stmt) -> NodeIndex {
        match stmt {
            Stmt::HDLBlock(branches) => {
                let open = self.graph.add_node(CfgPayload::Stmt(stmt.clone()));
                self.graph.add_edge(prev, open, ());
                let mut branch_ends = Vec::new();
                for branch in branches {
                    branch_ends.push(self.lower_sequence(open, &branch.stmts));
                }
                let sink = self.graph.add_node(CfgPayload::Sink { kind: BlockKind::HDLBlock, source: open });
                for end in branch_ends {
                    self.graph.add_edge(end, sink, ());
                }
                sink
            }
            Stmt::LoopBlock { stmts, .. } => {
                let open = self.graph.add_node(CfgPayload::Stmt(stmt.clone()));
                self.graph.add_edge(prev, open, ());
                let body_end = self.lower_sequence(open, stmts);
                // Back-edge: the loop body's tail returns to the test.
                self.graph.add_edge(body_end, open, ());
                let sink = self.graph.add_node(CfgPayload::Sink { kind: BlockKind::LoopBlock, source: open });
                self.graph.add_edge(open, sink, ());
                sink
            }
            Stmt::IntfBlock { stmts, .. } => {
                let open = self.graph.add_node(CfgPayload::Stmt(stmt.clone()));
                self.graph.add_edge(prev, open, ());
                let body_end = self.lower_sequence(open, stmts);
                let sink = self.graph.add_node(CfgPayload::Sink { kind: BlockKind::IntfBlock, source: open });
                self.graph.add_edge(body_end, sink, ());
                sink
            }
            Stmt::IntfLoop { stmts, .. } => {
                let open = self.graph.add_node(CfgPayload::Stmt(stmt.clone()));
                self.graph.add_edge(prev, open, ());
                let body_end = self.lower_sequence(open, stmts);
                self.graph.add_edge(body_end, open, ());
                let sink = self.graph.add_node(CfgPayload::Sink { kind: BlockKind::IntfLoop, source: open });
                self.graph.add_edge(open, sink, ());
                sink
            }
            Stmt::ContainerBlock(arms) => {
                let open = self.graph.add_node(CfgPayload::Stmt(stmt.clone()));
                self.graph.add_edge(prev, open, ());
                let mut arm_ends = Vec::new();
                for (_, body) in arms {
                    arm_ends.push(self.lower_sequence(open, body));
                }
                let sink = self.graph.add_node(CfgPayload::Sink { kind: BlockKind::ContainerBlock, source: open });
                for end in arm_ends {
                    self.graph.add_edge(end, sink, ());
                }
                sink
            }
            Stmt::BaseBlock(stmts) => {
                let open = self.graph.add_node(CfgPayload::Stmt(stmt.clone()));
                self.graph.add_edge(prev, open, ());
                let body_end = self.lower_sequence(open, stmts);
                let sink = self.graph.add_node(CfgPayload::Sink { kind: BlockKind::BaseBlock, source: open });
                self.graph.add_edge(body_end, sink, ());
                sink
            }
            leaf => {
                let node = self.graph.add_node(CfgPayload::Stmt(leaf.clone()));
                self.graph.add_edge(prev, node, ());
                node
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, ResValue};
    use hwgears_core::types::HwType;

    fn lit(v: i64) -> Expr {
        Expr::Res { value: ResValue::Int(v), dtype: HwType::uint(1) }
    }

    #[test]
    fn every_block_has_a_matching_sink() {
        let body = vec![Stmt::LoopBlock {
            test: lit(1),
            stmts: vec![Stmt::Await(lit(0))],
        }];
        let cfg = Cfg::build(&body);
        let sinks = cfg.sinks();
        assert_eq!(sinks.len(), 1);
        if let CfgPayload::Sink { kind, .. } = &cfg.graph[sinks[0]] {
            assert_eq!(*kind, BlockKind::LoopBlock);
        } else {
            panic!("expected a sink node");
        }
    }

    #[test]
    fn loop_body_has_back_edge_to_its_open() {
        let body = vec![Stmt::LoopBlock { test: lit(1), stmts: vec![Stmt::Await(lit(0))] }];
        let cfg = Cfg::build(&body);
        let open = cfg.successors(cfg.entry)[0];
        let await_node = cfg.successors(open)[0];
        let back_targets = cfg.successors(await_node);
        assert!(back_targets.contains(&open));
    }

    #[test]
    fn sequential_statements_chain_forward() {
        let body = vec![Stmt::AssignValue { target: "a".into(), value: lit(1) }, Stmt::FuncReturn(lit(1))];
        let cfg = Cfg::build(&body);
        assert_eq!(cfg.graph.node_count(), 3); // synthetic entry + 2 statements
    }
}
