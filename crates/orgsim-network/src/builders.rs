//! Canned topologies for tests, demos, and quick experiments.

use crate::topology::{EdgeRecord, NodeRecord, TopologySpec};

/// Undirected ring of `n` nodes, each linked to its next `k` neighbors.
///
/// Node ids are `"0"` through `"n-1"`. With `k >= n` some links would wrap
/// onto themselves or repeat; those are skipped or collapse at build time.
pub fn ring_lattice(n: usize, k: usize) -> TopologySpec {
    let nodes = (0..n).map(|i| NodeRecord::new(i.to_string())).collect();
    let mut edges = Vec::with_capacity(n.saturating_mul(k));
    for i in 0..n {
        for offset in 1..=k {
            let Some(j) = i.saturating_add(offset).checked_rem(n) else {
                continue;
            };
            if j != i {
                edges.push(EdgeRecord::new(i.to_string(), j.to_string()));
            }
        }
    }
    TopologySpec {
        directed: false,
        nodes,
        edges,
    }
}

/// Star with one hub (`"hub"`) and `leaves` spokes (`"0"`..).
pub fn star(leaves: usize) -> TopologySpec {
    let mut nodes = vec![NodeRecord::new("hub")];
    nodes.extend((0..leaves).map(|i| NodeRecord::new(i.to_string())));
    let edges = (0..leaves)
        .map(|i| EdgeRecord::new("hub", i.to_string()))
        .collect();
    TopologySpec {
        directed: false,
        nodes,
        edges,
    }
}
