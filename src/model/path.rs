//! WeightedPath: the result of a shortest-path query.

use serde::{Deserialize, Serialize};
use super::NodeId;

/// Node ids from source to target, inclusive, with the summed edge weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPath {
    pub nodes: Vec<NodeId>,
    pub cost: f64,
}

impl WeightedPath {
    pub fn single(node: impl Into<NodeId>) -> Self {
        Self { nodes: vec![node.into()], cost: 0.0 }
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn start(&self) -> Option<&NodeId> {
        self.nodes.first()
    }

    pub fn end(&self) -> Option<&NodeId> {
        self.nodes.last()
    }
}
