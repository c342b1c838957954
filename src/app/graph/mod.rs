mod build;
pub(super) mod interaction;
pub(super) mod view;

use std::collections::{BTreeSet, HashMap, HashSet};

pub(super) use build::build_graph_model;

#[derive(Clone, Debug, PartialEq)]
pub(super) struct GraphNode {
    pub(super) id: String,
    pub(super) text: String,
    pub(super) tags: BTreeSet<String>,
    pub(super) is_tag: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(super) struct GraphEdge {
    pub(super) source: usize,
    pub(super) target: usize,
}

impl GraphEdge {
    pub(super) fn touches(self, index: usize) -> bool {
        self.source == index || self.target == index
    }
}

/// Nodes and edges of one render cycle. Edge endpoints index into `nodes`.
#[derive(Debug, Default)]
pub(super) struct GraphModel {
    pub(super) nodes: Vec<GraphNode>,
    pub(super) edges: Vec<GraphEdge>,
    pub(super) index_by_id: HashMap<String, usize>,
    pub(super) focus: String,
    degrees: Vec<usize>,
}

impl GraphModel {
    pub(super) fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>, focus: String) -> Self {
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();

        let mut degrees = vec![0; nodes.len()];
        for edge in &edges {
            degrees[edge.source] += 1;
            if edge.target != edge.source {
                degrees[edge.target] += 1;
            }
        }

        Self {
            nodes,
            edges,
            index_by_id,
            focus,
            degrees,
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(super) fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub(super) fn degree(&self, index: usize) -> usize {
        self.degrees.get(index).copied().unwrap_or(0)
    }

    /// Collision radius; grows with the number of incident edges in this model.
    pub(super) fn radius(&self, index: usize) -> f32 {
        2.0 + (self.degree(index) as f32).sqrt()
    }

    pub(super) fn neighbours(&self, index: usize) -> HashSet<usize> {
        let mut neighbours = HashSet::new();
        for edge in self.edges.iter().filter(|edge| edge.touches(index)) {
            neighbours.insert(edge.source);
            neighbours.insert(edge.target);
        }
        neighbours
    }
}
