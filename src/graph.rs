//! Topological sorting and bounded linear-extension enumeration over a
//! [`RelationMatrix`] (component 3).
//!
//! Grounded in spec §4.3; the shape follows `petgraph::algo::toposort`, but
//! reimplemented directly against the dense matrix since the matrix — not a
//! `petgraph::Graph` — owns the fixed node set these checkers work over.

use crate::relation::RelationMatrix;

/// Kahn's algorithm. Returns `None` if `order` is not a DAG (some node never
/// reaches in-degree zero).
pub fn kahn_toposort(order: &RelationMatrix) -> Option<Vec<usize>> {
    let n = order.nodes();
    let mut indegree = vec![0usize; n];
    for i in 0..n {
        for j in 0..n {
            if order.get(i, j) {
                indegree[j] += 1;
            }
        }
    }
    let mut ready: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut result = Vec::with_capacity(n);
    while let Some(node) = ready.pop() {
        result.push(node);
        for succ in 0..n {
            if order.get(node, succ) {
                indegree[succ] -= 1;
                if indegree[succ] == 0 {
                    ready.push(succ);
                }
            }
        }
    }
    if result.len() == n {
        Some(result)
    } else {
        None
    }
}

/// The result of enumerating linear extensions of a partial order: either
/// the complete set, or a bounded, possibly-truncated prefix.
#[derive(Debug, Clone)]
pub struct LinearExtensions {
    pub extensions: Vec<Vec<usize>>,
    pub truncated: bool,
}

/// Enumerates every linear extension of `order` (a DFS over ready-sets), up
/// to `bound` results. If `bound` is reached before exhaustion, `truncated`
/// is set and the caller (the sequential-consistency checker) must treat the
/// result as incomplete rather than as proof of consistency.
pub fn all_linear_extensions_bounded(order: &RelationMatrix, bound: usize) -> LinearExtensions {
    let n = order.nodes();
    let mut indegree = vec![0usize; n];
    for i in 0..n {
        for j in 0..n {
            if order.get(i, j) {
                indegree[j] += 1;
            }
        }
    }
    let mut extensions = Vec::new();
    let mut truncated = false;
    let mut current = Vec::with_capacity(n);
    let mut remaining_indegree = indegree.clone();
    let mut used = vec![false; n];
    extend(
        order,
        &mut remaining_indegree,
        &mut used,
        &mut current,
        &mut extensions,
        bound,
        &mut truncated,
    );
    LinearExtensions { extensions, truncated }
}

fn extend(
    order: &RelationMatrix,
    indegree: &mut [usize],
    used: &mut [bool],
    current: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
    bound: usize,
    truncated: &mut bool,
) {
    if out.len() >= bound {
        *truncated = true;
        return;
    }
    let n = order.nodes();
    if current.len() == n {
        out.push(current.clone());
        return;
    }
    for node in 0..n {
        if used[node] || indegree[node] != 0 {
            continue;
        }
        used[node] = true;
        current.push(node);
        for succ in 0..n {
            if order.get(node, succ) {
                indegree[succ] -= 1;
            }
        }
        extend(order, indegree, used, current, out, bound, truncated);
        for succ in 0..n {
            if order.get(node, succ) {
                indegree[succ] += 1;
            }
        }
        current.pop();
        used[node] = false;
        if out.len() >= bound {
            *truncated = true;
            return;
        }
    }
}
