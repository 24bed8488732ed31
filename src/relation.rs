//! Dense boolean relation matrices over a fixed node set (component 2).
//!
//! Grounded in spec §4.2 directly; the dense-array shape follows the
//! teacher's instinct to index a fixed node set densely (`dag.rs`'s
//! `NodeIndex`-keyed `StableDiGraph`), reimplemented here as a flat `Vec<bool>`
//! since `petgraph` has no dense boolean-relation primitive and the matrix,
//! not a graph, owns the closure/saturation algorithms this engine needs.
//! `as_graph` hands out a `petgraph` view for callers that want its
//! algorithms (spec §4.2's `asGraph` adjacency view).

use petgraph::graph::DiGraph;

/// A dense `n x n` boolean relation over node indices `0..n`.
#[derive(Debug, Clone)]
pub struct RelationMatrix {
    n: usize,
    bits: Vec<bool>,
}

impl RelationMatrix {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            bits: vec![false; n * n],
        }
    }

    pub fn nodes(&self) -> usize {
        self.n
    }

    #[inline]
    fn idx(&self, i: usize, j: usize) -> usize {
        i * self.n + j
    }

    pub fn get(&self, i: usize, j: usize) -> bool {
        self.bits[self.idx(i, j)]
    }

    pub fn set(&mut self, i: usize, j: usize, value: bool) {
        let k = self.idx(i, j);
        self.bits[k] = value;
    }

    pub fn add(&mut self, i: usize, j: usize) {
        self.set(i, j, true);
    }

    /// In-place union: `self |= other`. Panics on mismatched size.
    pub fn union_with(&mut self, other: &RelationMatrix) {
        assert_eq!(self.n, other.n);
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            *a |= *b;
        }
    }

    /// Floyd–Warshall transitive closure. Returns whether any bit flipped.
    pub fn transitive_closure(&mut self) -> bool {
        let n = self.n;
        let mut changed = false;
        for k in 0..n {
            for i in 0..n {
                if !self.get(i, k) {
                    continue;
                }
                for j in 0..n {
                    if self.get(k, j) && !self.get(i, j) {
                        self.set(i, j, true);
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Removes edges implied by transitivity: `i -> j` is dropped if some
    /// `k != i, j` has `i -> k` and `k -> j`.
    pub fn transitive_reduction(&self) -> RelationMatrix {
        let n = self.n;
        let mut out = self.clone();
        for i in 0..n {
            for j in 0..n {
                if !self.get(i, j) {
                    continue;
                }
                for k in 0..n {
                    if k != i && k != j && self.get(i, k) && self.get(k, j) {
                        out.set(i, j, false);
                        break;
                    }
                }
            }
        }
        out
    }

    /// `true` iff no node relates to itself: required of every order used by
    /// a consistency checker.
    pub fn is_irreflexive(&self) -> bool {
        (0..self.n).all(|i| !self.get(i, i))
    }

    /// The `asGraph` adjacency view (spec §4.2): a `petgraph` digraph over
    /// the same `0..n` node indices, one edge per set bit.
    pub fn as_graph(&self) -> DiGraph<usize, ()> {
        let mut graph = DiGraph::with_capacity(self.n, 0);
        let nodes: Vec<_> = (0..self.n).map(|i| graph.add_node(i)).collect();
        for i in 0..self.n {
            for j in 0..self.n {
                if self.get(i, j) {
                    graph.add_edge(nodes[i], nodes[j], ());
                }
            }
        }
        graph
    }

    pub fn transpose(&self) -> RelationMatrix {
        let mut out = RelationMatrix::new(self.n);
        for i in 0..self.n {
            for j in 0..self.n {
                if self.get(i, j) {
                    out.set(j, i, true);
                }
            }
        }
        out
    }

    /// Adds every pair `(order[k], order[k'])` for `k < k'` — the relation
    /// induced by a fixed linear order over (a subset of) the nodes.
    pub fn add_total_ordering(&mut self, order: &[usize]) {
        for (a, &i) in order.iter().enumerate() {
            for &j in &order[a + 1..] {
                self.set(i, j, true);
            }
        }
    }

    /// Repeatedly applies a caller-supplied three-node saturation rule
    /// (`rule(self, i, k, j)` should add `i -> j` to `additions` whenever the
    /// rule fires on `i -> k -> j`) until a fixpoint is reached. Used by the
    /// sequential-consistency checker's coherence-closure saturation, whose
    /// closure rule is not plain transitivity.
    pub fn saturate_with<F>(&mut self, mut rule: F) -> bool
    where
        F: FnMut(&RelationMatrix, usize, usize, usize) -> bool,
    {
        let n = self.n;
        let mut changed_any = false;
        loop {
            let mut additions = Vec::new();
            for i in 0..n {
                for k in 0..n {
                    if !self.get(i, k) {
                        continue;
                    }
                    for j in 0..n {
                        if self.get(i, j) {
                            continue;
                        }
                        if rule(self, i, k, j) {
                            additions.push((i, j));
                        }
                    }
                }
            }
            if additions.is_empty() {
                break;
            }
            for (i, j) in additions {
                self.set(i, j, true);
                changed_any = true;
            }
        }
        changed_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitive_closure_chains_edges() {
        let mut m = RelationMatrix::new(3);
        m.add(0, 1);
        m.add(1, 2);
        m.transitive_closure();
        assert!(m.get(0, 2));
    }

    #[test]
    fn irreflexive_detects_self_loop() {
        let mut m = RelationMatrix::new(2);
        assert!(m.is_irreflexive());
        m.add(0, 0);
        assert!(!m.is_irreflexive());
    }

    #[test]
    fn transpose_flips_edges() {
        let mut m = RelationMatrix::new(2);
        m.add(0, 1);
        let t = m.transpose();
        assert!(t.get(1, 0));
        assert!(!t.get(0, 1));
    }

    #[test]
    fn total_ordering_adds_all_pairs() {
        let mut m = RelationMatrix::new(3);
        m.add_total_ordering(&[2, 0, 1]);
        assert!(m.get(2, 0));
        assert!(m.get(2, 1));
        assert!(m.get(0, 1));
        assert!(!m.get(1, 0));
    }

    #[test]
    fn as_graph_matches_petgraph_cycle_detection() {
        let mut m = RelationMatrix::new(3);
        m.add(0, 1);
        m.add(1, 2);
        assert!(!petgraph::algo::is_cyclic_directed(&m.as_graph()));
        m.add(2, 0);
        assert!(petgraph::algo::is_cyclic_directed(&m.as_graph()));
    }
}
