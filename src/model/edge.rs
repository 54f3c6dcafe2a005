//! Edge (directed, labeled, weighted relationship) in the property graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use super::{NodeId, PropertyMap, Value};

/// Identity of an edge: the ordered `(from, to, label)` triple.
///
/// Displays as the canonical key `"{from}->{to}:{label}"`. The display form
/// is ambiguous when an id contains `->` or `:`, so backends key records by
/// the structured triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
}

impl EdgeKey {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into(), label: label.into() }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.from, self.to, self.label)
    }
}

/// A directed edge. Weight must be non-negative for shortest-path queries
/// that traverse it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
    pub weight: f64,
    #[serde(default)]
    pub properties: PropertyMap,
}

impl Edge {
    pub fn new(
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        label: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: label.into(),
            weight,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from.as_str(), self.to.as_str(), self.label.as_str())
    }

    /// True if `(from, to, label)` is this edge's identity.
    pub fn has_key(&self, key: &EdgeKey) -> bool {
        self.from == key.from && self.to == key.to && self.label == key.label
    }

    /// True if the node is either endpoint.
    pub fn touches(&self, id: &str) -> bool {
        self.from == id || self.to == id
    }
}
