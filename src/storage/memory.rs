//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageBackend`.
//! It keeps ordered maps behind one RwLock inside an `Arc`.
//!
//! ## Sharing
//!
//! Clones share the stored data but each handle has its own open/closed
//! state. Building a second `GraphStore` over a clone is how tests simulate a
//! process restart.
//!
//! ## Fault injection
//!
//! `fail_after(n)` lets the next `n` mutating calls succeed and fails every
//! later one with `StorageError::Injected` until `clear_failures()`.
//! `fail_once_after(n)` fails only the call after those `n`. Loads are never
//! failed. A failed call changes nothing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::{Mutex, RwLock};

use crate::model::{Edge, EdgeKey, Node};
use super::{StorageBackend, StorageError, StorageResult};

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory persistence gateway.
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
    closed: AtomicBool,
}

struct MemoryInner {
    state: RwLock<MemoryState>,
    fail_plan: Mutex<Option<FailPlan>>,
}

#[derive(Debug, Clone, Copy)]
struct FailPlan {
    /// Mutating calls allowed before the injected failure.
    remaining_ok: usize,
    /// Keep failing after the first injected failure.
    sticky: bool,
}

#[derive(Default)]
struct MemoryState {
    nodes: BTreeMap<String, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                state: RwLock::new(MemoryState::default()),
                fail_plan: Mutex::new(None),
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// Let `n` more mutating calls succeed, then fail the rest.
    pub fn fail_after(&self, n: usize) {
        *self.inner.fail_plan.lock() = Some(FailPlan { remaining_ok: n, sticky: true });
    }

    /// Let `n` more mutating calls succeed, fail the next one, then recover.
    pub fn fail_once_after(&self, n: usize) {
        *self.inner.fail_plan.lock() = Some(FailPlan { remaining_ok: n, sticky: false });
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        *self.inner.fail_plan.lock() = None;
    }

    pub fn node_count(&self) -> usize {
        self.inner.state.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.state.read().edges.len()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.inner.state.read().nodes.contains_key(id)
    }

    pub fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.inner.state.read().edges.contains_key(key)
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    /// Gate for every mutating call: closed handles and a due injected
    /// failure both refuse the write.
    fn begin_write(&self, op: &'static str) -> StorageResult<()> {
        self.check_open()?;
        let mut plan = self.inner.fail_plan.lock();
        match plan.as_mut() {
            Some(p) if p.remaining_ok > 0 => {
                p.remaining_ok -= 1;
                Ok(())
            }
            Some(p) => {
                if !p.sticky {
                    *plan = None;
                }
                Err(StorageError::Injected(op))
            }
            None => Ok(()),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryBackend {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            closed: AtomicBool::new(false),
        }
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("MemoryBackend")
            .field("nodes", &state.nodes.len())
            .field("edges", &state.edges.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

impl StorageBackend for MemoryBackend {
    fn save_node(&self, node: &Node) -> StorageResult<()> {
        self.begin_write("save_node")?;
        self.inner.state.write().nodes.insert(node.id.clone(), node.clone());
        Ok(())
    }

    fn save_edge(&self, edge: &Edge) -> StorageResult<()> {
        self.begin_write("save_edge")?;
        self.inner.state.write().edges.insert(edge.key(), edge.clone());
        Ok(())
    }

    fn delete_node(&self, id: &str) -> StorageResult<()> {
        self.begin_write("delete_node")?;
        match self.inner.state.write().nodes.remove(id) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(format!("node {id}"))),
        }
    }

    fn delete_edge(&self, key: &EdgeKey) -> StorageResult<()> {
        self.begin_write("delete_edge")?;
        match self.inner.state.write().edges.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(format!("edge {key}"))),
        }
    }

    /// Atomic: one budget check, one lock.
    fn delete_nodes(&self, ids: &[&str]) -> StorageResult<()> {
        self.begin_write("delete_nodes")?;
        let mut state = self.inner.state.write();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| state.nodes.remove(**id).is_none())
            .map(|id| format!("node {id}"))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StorageError::NotFound(missing.join(", ")))
        }
    }

    /// Atomic: one budget check, one lock.
    fn delete_edges(&self, keys: &[EdgeKey]) -> StorageResult<()> {
        self.begin_write("delete_edges")?;
        let mut state = self.inner.state.write();
        let missing: Vec<String> = keys
            .iter()
            .filter(|key| state.edges.remove(*key).is_none())
            .map(|key| format!("edge {key}"))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StorageError::NotFound(missing.join(", ")))
        }
    }

    fn load_nodes(&self) -> StorageResult<Vec<Node>> {
        self.check_open()?;
        Ok(self.inner.state.read().nodes.values().cloned().collect())
    }

    fn load_edges(&self) -> StorageResult<Vec<Edge>> {
        self.check_open()?;
        Ok(self.inner.state.read().edges.values().cloned().collect())
    }

    fn close(&self) -> StorageResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_save_and_load_node() {
        let db = MemoryBackend::new();
        let node = Node::new("1", "Person").with_property("name", "Ada");
        db.save_node(&node).unwrap();

        assert_eq!(db.load_nodes().unwrap(), vec![node]);
    }

    #[test]
    fn test_save_is_upsert() {
        let db = MemoryBackend::new();
        db.save_edge(&Edge::new("1", "2", "knows", 1.0)).unwrap();
        db.save_edge(&Edge::new("1", "2", "knows", 7.0)).unwrap();

        let edges = db.load_edges().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].weight, 7.0);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let db = MemoryBackend::new();
        assert!(db.delete_node("nope").unwrap_err().is_not_found());
        assert!(db.delete_edge(&EdgeKey::new("a", "b", "c")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_batch_delete_removes_present_and_reports_missing() {
        let db = MemoryBackend::new();
        db.save_edge(&Edge::new("1", "2", "knows", 1.0)).unwrap();
        db.save_edge(&Edge::new("2", "3", "knows", 1.0)).unwrap();

        let err = db
            .delete_edges(&[EdgeKey::new("1", "2", "knows"), EdgeKey::new("9", "9", "x")])
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(db.edge_count(), 1);
        assert!(db.contains_edge(&EdgeKey::new("2", "3", "knows")));
    }

    #[test]
    fn test_batch_node_delete() {
        let db = MemoryBackend::new();
        for id in ["1", "2", "3"] {
            db.save_node(&Node::new(id, "A")).unwrap();
        }

        db.delete_nodes(&["1", "3"]).unwrap();
        assert_eq!(db.node_count(), 1);
        assert!(db.contains_node("2"));
        assert!(db.delete_nodes(&["2", "9"]).unwrap_err().is_not_found());
        assert_eq!(db.node_count(), 0);
    }

    #[test]
    fn test_fail_after_budget() {
        let db = MemoryBackend::new();
        db.fail_after(1);

        db.save_node(&Node::new("1", "A")).unwrap();
        let err = db.save_node(&Node::new("2", "A")).unwrap_err();
        assert!(matches!(err, StorageError::Injected("save_node")));
        assert_eq!(db.node_count(), 1);

        // Loads keep working while writes fail
        assert_eq!(db.load_nodes().unwrap().len(), 1);

        db.clear_failures();
        db.save_node(&Node::new("2", "A")).unwrap();
        assert_eq!(db.node_count(), 2);
    }

    #[test]
    fn test_fail_once_recovers() {
        let db = MemoryBackend::new();
        db.fail_once_after(0);

        assert!(db.save_node(&Node::new("1", "A")).is_err());
        db.save_node(&Node::new("1", "A")).unwrap();
        db.save_node(&Node::new("2", "A")).unwrap();
        assert_eq!(db.node_count(), 2);
    }

    #[test]
    fn test_clones_share_data_not_closed_state() {
        let db = MemoryBackend::new();
        let other = db.clone();
        db.save_node(&Node::new("1", "A").with_property("n", Value::Int(1))).unwrap();

        db.close().unwrap();
        db.close().unwrap();
        assert!(matches!(db.load_nodes(), Err(StorageError::Closed)));
        assert!(matches!(db.save_node(&Node::new("2", "A")), Err(StorageError::Closed)));

        assert_eq!(other.load_nodes().unwrap().len(), 1);
    }
}
