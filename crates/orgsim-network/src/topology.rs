//! Graph topology: nodes with attribute maps, edges with optional weights.
//!
//! The [`GraphTopology`] is the substrate agents are placed on. Nodes are
//! stored in a flat vector in declaration order; everything downstream
//! (agent arenas, neighbor lookups) addresses them by that index. A
//! `BTreeMap<NodeId, usize>` resolves external ids to indices.
//!
//! Adjacency is a per-node list of [`Neighbor`]s built once at
//! construction. Undirected edges are indexed from both ends; directed
//! edges only from their source, so a node's neighbors are its successors.

use std::collections::BTreeMap;

use orgsim_types::{NodeId, Scalar};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NetworkError;

/// A node as supplied by the data layer: an `id` plus arbitrary attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node identifier.
    pub id: NodeId,
    /// Every other field of the record.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Scalar>,
}

impl NodeRecord {
    /// A node with no attributes.
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute insert.
    pub fn with_attribute(mut self, key: &str, value: impl Into<Scalar>) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }
}

/// An edge as supplied by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
    /// Optional tie strength.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Every other field of the record.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Scalar>,
}

impl EdgeRecord {
    /// An unweighted edge.
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style weight.
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// Generic node/edge description a topology is built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySpec {
    /// Whether edges are ordered pairs. Undirected by default.
    #[serde(default)]
    pub directed: bool,
    /// Declared nodes.
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Declared edges.
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

/// A node of a built topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// External identifier.
    pub id: NodeId,
    /// Static attributes.
    pub attributes: BTreeMap<String, Scalar>,
}

/// An edge of a built topology, with endpoints resolved to node indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Index of the source node.
    pub source: usize,
    /// Index of the target node.
    pub target: usize,
    /// Optional tie strength.
    pub weight: Option<f64>,
    /// Extra edge attributes.
    pub attributes: BTreeMap<String, Scalar>,
}

/// One entry in a node's adjacency list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the neighboring node.
    pub node: usize,
    /// Weight of the connecting edge, if any.
    pub weight: Option<f64>,
}

/// Immutable graph of nodes and edges.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphTopology {
    /// Nodes in declaration order.
    nodes: Vec<Node>,
    /// External id -> node index.
    index: BTreeMap<NodeId, usize>,
    /// Unique edges in first-declaration order.
    edges: Vec<Edge>,
    /// Per-node neighbor lists.
    adjacency: Vec<Vec<Neighbor>>,
}

impl GraphTopology {
    /// Build and validate a topology from a node/edge description.
    ///
    /// Repeated edges between the same pair collapse into one; the last
    /// declaration's weight and attributes win. Self-loops are kept and make
    /// a node its own neighbor.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DuplicateNode`] for a repeated node id,
    /// [`NetworkError::UnknownEndpoint`] when an edge names an undeclared
    /// node, and [`NetworkError::InvalidWeight`] for a NaN/infinite weight.
    pub fn from_spec(spec: TopologySpec) -> Result<Self, NetworkError> {
        let TopologySpec {
            directed,
            nodes: node_records,
            edges: edge_records,
        } = spec;

        let mut nodes = Vec::with_capacity(node_records.len());
        let mut index = BTreeMap::new();
        for record in node_records {
            if index.contains_key(&record.id) {
                return Err(NetworkError::DuplicateNode(record.id));
            }
            index.insert(record.id.clone(), nodes.len());
            nodes.push(Node {
                id: record.id,
                attributes: record.attributes,
            });
        }

        let mut edges: Vec<Edge> = Vec::with_capacity(edge_records.len());
        let mut edge_slots: BTreeMap<(usize, usize), usize> = BTreeMap::new();
        for record in edge_records {
            let Some(&source) = index.get(&record.source) else {
                return Err(NetworkError::UnknownEndpoint {
                    missing: record.source.clone(),
                    from: record.source,
                    to: record.target,
                });
            };
            let Some(&target) = index.get(&record.target) else {
                return Err(NetworkError::UnknownEndpoint {
                    missing: record.target.clone(),
                    from: record.source,
                    to: record.target,
                });
            };
            if let Some(weight) = record.weight
                && !weight.is_finite()
            {
                return Err(NetworkError::InvalidWeight {
                    from: record.source,
                    to: record.target,
                    weight,
                });
            }

            let key = if directed {
                (source, target)
            } else {
                (source.min(target), source.max(target))
            };
            let edge = Edge {
                source,
                target,
                weight: record.weight,
                attributes: record.attributes,
            };
            if let Some(slot) = edge_slots.get(&key).and_then(|&i| edges.get_mut(i)) {
                *slot = edge;
            } else {
                edge_slots.insert(key, edges.len());
                edges.push(edge);
            }
        }

        let mut adjacency: Vec<Vec<Neighbor>> = vec![Vec::new(); nodes.len()];
        for edge in &edges {
            if let Some(list) = adjacency.get_mut(edge.source) {
                list.push(Neighbor {
                    node: edge.target,
                    weight: edge.weight,
                });
            }
            if !directed
                && edge.source != edge.target
                && let Some(list) = adjacency.get_mut(edge.target)
            {
                list.push(Neighbor {
                    node: edge.source,
                    weight: edge.weight,
                });
            }
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            directed,
            "Topology built"
        );

        Ok(Self {
            nodes,
            index,
            edges,
            adjacency,
        })
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of unique edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node at an index.
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All unique edges.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Resolve an external id to its node index.
    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Whether a node id is declared.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Neighbors of a node (successors when directed).
    ///
    /// Out-of-range indices have no neighbors.
    pub fn neighbors(&self, index: usize) -> &[Neighbor] {
        self.adjacency.get(index).map_or(&[], Vec::as_slice)
    }

    /// Number of neighbors of a node.
    pub fn degree(&self, index: usize) -> usize {
        self.neighbors(index).len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn triangle_spec() -> TopologySpec {
        TopologySpec {
            directed: false,
            nodes: vec![
                NodeRecord::new("a").with_attribute("opinion", 0.2),
                NodeRecord::new("b"),
                NodeRecord::new("c"),
            ],
            edges: vec![
                EdgeRecord::new("a", "b").with_weight(2.0),
                EdgeRecord::new("b", "c"),
                EdgeRecord::new("c", "a"),
            ],
        }
    }

    #[test]
    fn builds_undirected_adjacency() {
        let topo = GraphTopology::from_spec(triangle_spec()).unwrap();
        assert_eq!(topo.node_count(), 3);
        assert_eq!(topo.edge_count(), 3);
        for i in 0..3 {
            assert_eq!(topo.degree(i), 2);
        }
        let a = topo.index_of(&NodeId::from("a")).unwrap();
        let b = topo.index_of(&NodeId::from("b")).unwrap();
        let ab = topo.neighbors(a).iter().find(|n| n.node == b).unwrap();
        assert_eq!(ab.weight, Some(2.0));
        assert_eq!(
            topo.node(a).unwrap().attributes.get("opinion"),
            Some(&Scalar::Float(0.2))
        );
    }

    #[test]
    fn directed_neighbors_are_successors() {
        let mut spec = triangle_spec();
        spec.directed = true;
        let topo = GraphTopology::from_spec(spec).unwrap();
        for i in 0..3 {
            assert_eq!(topo.degree(i), 1);
        }
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut spec = triangle_spec();
        spec.edges.push(EdgeRecord::new("a", "ghost"));
        let err = GraphTopology::from_spec(spec).unwrap_err();
        assert!(matches!(
            err,
            NetworkError::UnknownEndpoint { ref missing, .. } if *missing == NodeId::from("ghost")
        ));
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut spec = triangle_spec();
        spec.nodes.push(NodeRecord::new("b"));
        assert!(matches!(
            GraphTopology::from_spec(spec),
            Err(NetworkError::DuplicateNode(_))
        ));
    }

    #[test]
    fn non_finite_weight_is_rejected() {
        let mut spec = triangle_spec();
        spec.edges.push(EdgeRecord::new("a", "c").with_weight(f64::NAN));
        assert!(matches!(
            GraphTopology::from_spec(spec),
            Err(NetworkError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn repeated_edges_collapse() {
        let mut spec = triangle_spec();
        spec.edges.push(EdgeRecord::new("b", "a").with_weight(5.0));
        let topo = GraphTopology::from_spec(spec).unwrap();
        assert_eq!(topo.edge_count(), 3);
        assert_eq!(topo.degree(0), 2);
        assert_eq!(topo.edges()[0].weight, Some(5.0));
    }

    #[test]
    fn self_loop_counts_once() {
        let spec = TopologySpec {
            directed: false,
            nodes: vec![NodeRecord::new("solo")],
            edges: vec![EdgeRecord::new("solo", "solo")],
        };
        let topo = GraphTopology::from_spec(spec).unwrap();
        assert_eq!(topo.neighbors(0), &[Neighbor { node: 0, weight: None }]);
    }

    #[test]
    fn parses_data_layer_json() {
        let json = r#"{
            "nodes": [{"id": 1, "department": "eng", "opinion": 0.7}, {"id": 2}],
            "edges": [{"source": 1, "target": 2, "weight": 0.5, "kind": "reports_to"}]
        }"#;
        let spec: TopologySpec = serde_json::from_str(json).unwrap();
        assert!(!spec.directed);
        let topo = GraphTopology::from_spec(spec).unwrap();
        let node = topo.node(0).unwrap();
        assert_eq!(node.id, NodeId::from("1"));
        assert_eq!(
            node.attributes.get("department"),
            Some(&Scalar::Text("eng".to_owned()))
        );
        assert_eq!(
            topo.edges()[0].attributes.get("kind"),
            Some(&Scalar::Text("reports_to".to_owned()))
        );
    }
}
