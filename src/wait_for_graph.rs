//! Deadlock detection via wait-for graph cycle search (§4.D), grounded
//! directly in the teacher's `transaction::wait_for_graph::WaitForGraph`
//! (same `HashMap<Tid, HashSet<Tid>>` adjacency + DFS shape), with the
//! "would this edge close a cycle" query from xdb's lock manager folded
//! in as `would_cycle`.

use std::collections::{HashMap, HashSet};

use crate::transaction_id::TransactionId;

/// Edges point from a waiting transaction to the transaction(s) it is
/// waiting on.
#[derive(Default)]
pub struct WaitForGraph {
    edges: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl WaitForGraph {
    pub fn new() -> Self {
        WaitForGraph {
            edges: HashMap::new(),
        }
    }

    pub fn add_edge(&mut self, from: TransactionId, to: TransactionId) {
        if from == to {
            return;
        }
        self.edges.entry(from).or_insert_with(HashSet::new).insert(to);
    }

    pub fn remove_edge(&mut self, from: TransactionId, to: TransactionId) {
        if let Some(out) = self.edges.get_mut(&from) {
            out.remove(&to);
        }
    }

    /// Remove every edge originating from `tid` (called once its wait
    /// is resolved, whether by grant or abort).
    pub fn remove_waiter(&mut self, tid: TransactionId) {
        self.edges.remove(&tid);
    }

    /// `true` if adding an edge `from -> to` would close a cycle,
    /// i.e. `to` can already (transitively) reach `from`. Does not
    /// mutate the graph — callers add the edge only once they've
    /// decided to actually wait.
    pub fn would_cycle(&self, from: TransactionId, to: TransactionId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![to];
        while let Some(node) = stack.pop() {
            if node == from {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(out) = self.edges.get(&node) {
                stack.extend(out.iter().copied());
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid() -> TransactionId {
        TransactionId::new()
    }

    #[test]
    fn no_cycle_among_independent_waiters() {
        let graph = WaitForGraph::new();
        let (a, b) = (tid(), tid());
        assert!(!graph.would_cycle(a, b));
    }

    #[test]
    fn direct_cycle_detected() {
        let mut graph = WaitForGraph::new();
        let (a, b) = (tid(), tid());
        graph.add_edge(a, b);
        assert!(graph.would_cycle(b, a));
    }

    #[test]
    fn transitive_cycle_detected() {
        let mut graph = WaitForGraph::new();
        let (a, b, c) = (tid(), tid(), tid());
        graph.add_edge(a, b);
        graph.add_edge(b, c);
        assert!(graph.would_cycle(c, a));
        assert!(!graph.would_cycle(a, c));
    }

    #[test]
    fn removing_waiter_clears_its_edges() {
        let mut graph = WaitForGraph::new();
        let (a, b) = (tid(), tid());
        graph.add_edge(a, b);
        graph.remove_waiter(a);
        assert!(!graph.would_cycle(b, a));
    }
}
