//! # Graph Store
//!
//! The concurrent in-memory graph index with write-through persistence.
//!
//! One `RwLock` guards the node map and the adjacency map together. Reads
//! take the shared lock and never touch the backend. Mutations take the
//! exclusive lock for their whole span, including the synchronous backend
//! call, so no reader ever sees a half-applied change.
//!
//! Every mutation persists first and only then changes memory. When the
//! backend refuses a write, memory is untouched and the error is returned as
//! `Error::Persistence`. Multi-entity deletes that fail part-way re-save the
//! edges they removed so the durable side converges back.
//!
//! ## Delete policy
//!
//! Deleting a node cascades: every edge with the node as either endpoint is
//! removed with it. Deleting something that does not exist is an error
//! (`NodeNotFound` / `EdgeNotFound`). A backend that reports an entity as
//! already gone during a delete is treated as in agreement.

pub mod pattern;
pub mod shortest_path;

use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::index::{self, PropertyFilter};
use crate::model::*;
use crate::storage::{open_backend, BackendConfig, StorageBackend, StorageError, StorageResult};
use crate::{Error, Result};

pub use pattern::{EdgePattern, Segment};
pub use shortest_path::{Item, PriorityQueue};

// ============================================================================
// GraphIndex
// ============================================================================

/// The lock-guarded aggregate.
#[derive(Debug, Default)]
pub(crate) struct GraphIndex {
    pub(crate) nodes: HashMap<NodeId, Node>,
    /// from-node id → outgoing edges in insertion order
    pub(crate) adjacency: HashMap<NodeId, Vec<Edge>>,
}

impl GraphIndex {
    pub(crate) fn outgoing(&self, id: &str) -> &[Edge] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.adjacency.values().flatten()
    }

    fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.outgoing(&key.from).iter().any(|e| e.has_key(key))
    }

    fn matching(&self, pattern: &EdgePattern) -> Vec<Edge> {
        match pattern.source() {
            Some(from) => self
                .outgoing(from)
                .iter()
                .filter(|e| pattern.matches(e))
                .cloned()
                .collect(),
            None => self.edges().filter(|e| pattern.matches(e)).cloned().collect(),
        }
    }

    /// Insert or replace by key, keeping bucket order for existing keys.
    fn upsert_edge(&mut self, edge: Edge) {
        let bucket = self.adjacency.entry(edge.from.clone()).or_default();
        match bucket.iter_mut().find(|e| e.to == edge.to && e.label == edge.label) {
            Some(existing) => *existing = edge,
            None => bucket.push(edge),
        }
    }

    fn remove_edges(&mut self, doomed: impl Fn(&Edge) -> bool) {
        self.adjacency.retain(|_, bucket| {
            bucket.retain(|e| !doomed(e));
            !bucket.is_empty()
        });
    }

    fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }
}

/// A backend `NotFound` during a delete means the durable side already
/// agrees with the deletion.
fn tolerate_missing(result: StorageResult<()>) -> StorageResult<()> {
    match result {
        Err(StorageError::NotFound(what)) => {
            warn!(%what, "already absent from storage");
            Ok(())
        }
        other => other,
    }
}

/// NaN and infinities anywhere in the map have no stored form.
fn check_properties(properties: &PropertyMap) -> Result<()> {
    match properties
        .iter()
        .filter(|(_, v)| !v.is_finite())
        .map(|(k, _)| k)
        .min()
    {
        Some(key) => Err(Error::NonFiniteProperty(key.clone())),
        None => Ok(()),
    }
}

// ============================================================================
// GraphStore
// ============================================================================

/// Property graph with write-through persistence to `B`.
pub struct GraphStore<B: StorageBackend> {
    index: RwLock<GraphIndex>,
    backend: B,
}

impl GraphStore<Box<dyn StorageBackend>> {
    /// Open the configured backend and load its nodes, then its edges.
    pub fn open(config: &BackendConfig) -> Result<Self> {
        let backend = open_backend(config)?;
        Self::restore(backend)
    }
}

impl<B: StorageBackend> GraphStore<B> {
    /// Empty store over `backend`. Nothing is loaded.
    pub fn new(backend: B) -> Self {
        Self { index: RwLock::new(GraphIndex::default()), backend }
    }

    /// Store over `backend` populated with everything it holds.
    pub fn restore(backend: B) -> Result<Self> {
        let store = Self::new(backend);
        store.load_nodes()?;
        store.load_edges()?;
        Ok(store)
    }

    /// Access the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Close the backend. Later mutations fail with `Error::Persistence`.
    pub fn close(&self) -> Result<()> {
        self.backend.close()?;
        info!("graph store closed");
        Ok(())
    }

    // ========================================================================
    // Bulk load
    // ========================================================================

    /// Load every stored node, replacing in-memory nodes with the same id.
    pub fn load_nodes(&self) -> Result<usize> {
        let mut index = self.index.write();
        let nodes = self.backend.load_nodes()?;
        let count = nodes.len();
        for node in nodes {
            index.nodes.insert(node.id.clone(), node);
        }
        info!(count, "loaded nodes");
        Ok(count)
    }

    /// Load every stored edge, replacing in-memory edges with the same key.
    ///
    /// Endpoints are not re-validated; edges whose nodes are missing are kept
    /// and logged.
    pub fn load_edges(&self) -> Result<usize> {
        let mut index = self.index.write();
        let edges = self.backend.load_edges()?;
        let count = edges.len();
        for edge in edges {
            if !index.nodes.contains_key(&edge.from) || !index.nodes.contains_key(&edge.to) {
                warn!(edge = %edge.key(), "loaded edge references a missing node");
            }
            index.upsert_edge(edge);
        }
        info!(count, "loaded edges");
        Ok(count)
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    pub fn add_node(
        &self,
        id: impl Into<NodeId>,
        label: impl Into<String>,
        properties: PropertyMap,
    ) -> Result<()> {
        check_properties(&properties)?;
        let node = Node::new(id, label).with_properties(properties);

        let mut index = self.index.write();
        if index.nodes.contains_key(&node.id) {
            return Err(Error::DuplicateNode(node.id));
        }

        if let Err(e) = self.backend.save_node(&node) {
            warn!(id = %node.id, error = %e, "add_node rolled back");
            return Err(e.into());
        }

        debug!(id = %node.id, label = %node.label, "node added");
        index.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn get_node(&self, id: &str) -> Result<Node> {
        self.index
            .read()
            .nodes
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    /// Delete a node and every edge it is an endpoint of.
    pub fn delete_node(&self, id: &str) -> Result<()> {
        let mut index = self.index.write();
        if !index.nodes.contains_key(id) {
            return Err(Error::NodeNotFound(id.to_string()));
        }

        let doomed: Vec<Edge> = index.edges().filter(|e| e.touches(id)).cloned().collect();
        let keys: Vec<EdgeKey> = doomed.iter().map(Edge::key).collect();

        if let Err(e) = self.delete_node_durably(id, &keys) {
            warn!(%id, edges = doomed.len(), error = %e, "delete_node rolled back");
            self.resave_edges(&doomed);
            return Err(e.into());
        }

        index.remove_edges(|e| e.touches(id));
        index.nodes.remove(id);
        debug!(%id, edges = doomed.len(), "node deleted");
        Ok(())
    }

    // ========================================================================
    // Edges
    // ========================================================================

    pub fn add_edge(
        &self,
        from: &str,
        to: &str,
        label: impl Into<String>,
        weight: f64,
        properties: PropertyMap,
    ) -> Result<()> {
        if !weight.is_finite() {
            return Err(Error::InvalidWeight(weight));
        }
        check_properties(&properties)?;

        let mut index = self.index.write();
        if !index.nodes.contains_key(from) {
            return Err(Error::NodeNotFound(from.to_string()));
        }
        if !index.nodes.contains_key(to) {
            return Err(Error::NodeNotFound(to.to_string()));
        }

        let edge = Edge::new(from, to, label, weight).with_properties(properties);
        let key = edge.key();
        if index.contains_edge(&key) {
            return Err(Error::DuplicateEdge(key.to_string()));
        }

        if let Err(e) = self.backend.save_edge(&edge) {
            warn!(edge = %key, error = %e, "add_edge rolled back");
            return Err(e.into());
        }

        debug!(edge = %key, weight, "edge added");
        index.adjacency.entry(edge.from.clone()).or_default().push(edge);
        Ok(())
    }

    /// Edges matching a `from->to:label` pattern.
    pub fn search_edges(&self, pattern: &str) -> Result<Vec<Edge>> {
        let pattern = EdgePattern::parse(pattern)?;
        Ok(self.find_edges(&pattern))
    }

    /// Edges matching an already compiled pattern.
    pub fn find_edges(&self, pattern: &EdgePattern) -> Vec<Edge> {
        self.index.read().matching(pattern)
    }

    /// Edges matching the field filter; an empty field or `*` matches any value.
    pub fn get_edge(&self, from: &str, to: &str, label: &str) -> Vec<Edge> {
        self.find_edges(&EdgePattern::from_filter(from, to, label))
    }

    /// Delete every edge matching the field filter as one unit.
    /// Returns how many were removed.
    pub fn delete_edge(&self, from: &str, to: &str, label: &str) -> Result<usize> {
        let pattern = EdgePattern::from_filter(from, to, label);

        let mut index = self.index.write();
        let doomed = index.matching(&pattern);
        if doomed.is_empty() {
            return Err(Error::EdgeNotFound(pattern.to_string()));
        }

        let keys: Vec<EdgeKey> = doomed.iter().map(Edge::key).collect();
        if let Err(e) = tolerate_missing(self.backend.delete_edges(&keys)) {
            warn!(%pattern, edges = doomed.len(), error = %e, "delete_edge rolled back");
            self.resave_edges(&doomed);
            return Err(e.into());
        }

        index.remove_edges(|e| pattern.matches(e));
        debug!(%pattern, count = doomed.len(), "edges deleted");
        Ok(doomed.len())
    }

    /// Outgoing edges of a node, in insertion order.
    pub fn edges_from(&self, id: &str) -> Result<Vec<Edge>> {
        let index = self.index.read();
        if !index.nodes.contains_key(id) {
            return Err(Error::NodeNotFound(id.to_string()));
        }
        Ok(index.outgoing(id).to_vec())
    }

    /// Edge removals first, then the node.
    fn delete_node_durably(&self, id: &str, keys: &[EdgeKey]) -> StorageResult<()> {
        if !keys.is_empty() {
            tolerate_missing(self.backend.delete_edges(keys))?;
        }
        tolerate_missing(self.backend.delete_node(id))
    }

    /// Put back edges a failed multi-entity delete may have removed durably.
    fn resave_edges(&self, edges: &[Edge]) {
        for edge in edges {
            if let Err(e) = self.backend.save_edge(edge) {
                error!(edge = %edge.key(), error = %e, "could not restore edge in storage");
            }
        }
    }

    // ========================================================================
    // Degrees and counts
    // ========================================================================

    pub fn in_degree(&self, id: &str) -> Result<usize> {
        let index = self.index.read();
        if !index.nodes.contains_key(id) {
            return Err(Error::NodeNotFound(id.to_string()));
        }
        Ok(index.edges().filter(|e| e.to == id).count())
    }

    pub fn out_degree(&self, id: &str) -> Result<usize> {
        let index = self.index.read();
        if !index.nodes.contains_key(id) {
            return Err(Error::NodeNotFound(id.to_string()));
        }
        Ok(index.outgoing(id).len())
    }

    pub fn node_count(&self) -> usize {
        self.index.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.index.read().edge_count()
    }

    /// All nodes, sorted by id.
    pub fn nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.index.read().nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Node ids along the cheapest path, both endpoints included.
    pub fn find_shortest_path_weighted(&self, from: &str, to: &str) -> Result<Vec<NodeId>> {
        self.find_shortest_path_with_cost(from, to).map(|path| path.nodes)
    }

    /// Like `find_shortest_path_weighted`, also reporting the total weight.
    pub fn find_shortest_path_with_cost(&self, from: &str, to: &str) -> Result<WeightedPath> {
        if from == to {
            return Ok(WeightedPath::single(from));
        }
        let index = self.index.read();
        shortest_path::dijkstra(&index, from, to)
    }

    /// Nodes whose properties satisfy every key of `filter`, sorted by id.
    pub fn find_nodes_by_properties(&self, filter: &PropertyFilter) -> Vec<Node> {
        index::scan(self.index.read().nodes.values(), filter)
    }
}

impl<B: StorageBackend> std::fmt::Debug for GraphStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.index.read();
        f.debug_struct("GraphStore")
            .field("nodes", &index.nodes.len())
            .field("edges", &index.edge_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
