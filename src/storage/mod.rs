//! # Storage Backend Trait
//!
//! This is THE contract between the graph store and any durable engine.
//! The store only ever writes through it and reads from it at load time.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | Shared in-memory maps, fault injection for tests |
//! | `RedbBackend` | `redb` | Per-entity records in a redb file (feature `redb`) |

pub mod memory;
#[cfg(feature = "redb")]
pub mod redb;

use serde::{Deserialize, Serialize};

use crate::model::{Edge, EdgeKey, Node};

pub use memory::MemoryBackend;
#[cfg(feature = "redb")]
pub use self::redb::RedbBackend;

// ============================================================================
// Errors
// ============================================================================

/// Errors reported by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The entity is not in the durable store. Reported separately from
    /// faults so the caller can decide whether absence is acceptable.
    #[error("not found in storage: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend is closed")]
    Closed,

    /// Failure produced on purpose by `MemoryBackend` fault injection.
    #[error("injected storage failure on {0}")]
    Injected(&'static str),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ============================================================================
// Backend Configuration
// ============================================================================

/// Which backend to open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-memory (lost with the process)
    #[default]
    Memory,

    /// redb database file, created if missing
    #[cfg(feature = "redb")]
    Redb {
        path: std::path::PathBuf,
    },
}

/// Open the backend described by `config`.
pub fn open_backend(config: &BackendConfig) -> StorageResult<Box<dyn StorageBackend>> {
    match config {
        BackendConfig::Memory => Ok(Box::new(MemoryBackend::new())),
        #[cfg(feature = "redb")]
        BackendConfig::Redb { path } => Ok(Box::new(RedbBackend::open(path)?)),
    }
}

// ============================================================================
// StorageBackend Trait
// ============================================================================

/// The durable persistence contract.
///
/// Saves are upserts keyed by identity: node id, or the `(from, to, label)`
/// triple of an edge. Two distinct triples must never share a record, even
/// when their display keys coincide. Whatever goes through `save_*` must come
/// back from `load_*` with identical fields and property values.
///
/// Deleting an entity that is not stored returns `StorageError::NotFound`.
/// Batch deletes remove every entity that is present and report the missing
/// ones afterwards, so a `NotFound` from a batch never leaves present
/// entities behind.
pub trait StorageBackend: Send + Sync {
    // ========================================================================
    // Writes
    // ========================================================================

    fn save_node(&self, node: &Node) -> StorageResult<()>;

    fn save_edge(&self, edge: &Edge) -> StorageResult<()>;

    fn delete_node(&self, id: &str) -> StorageResult<()>;

    fn delete_edge(&self, key: &EdgeKey) -> StorageResult<()>;

    /// Delete several nodes.
    ///
    /// Default falls back to sequential `delete_node` calls and is not atomic.
    fn delete_nodes(&self, ids: &[&str]) -> StorageResult<()> {
        let mut missing = Vec::new();
        for id in ids {
            match self.delete_node(id) {
                Ok(()) => {}
                Err(StorageError::NotFound(what)) => missing.push(what),
                Err(e) => return Err(e),
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StorageError::NotFound(missing.join(", ")))
        }
    }

    /// Delete several edges.
    ///
    /// Default falls back to sequential `delete_edge` calls and is not atomic.
    fn delete_edges(&self, keys: &[EdgeKey]) -> StorageResult<()> {
        let mut missing = Vec::new();
        for key in keys {
            match self.delete_edge(key) {
                Ok(()) => {}
                Err(StorageError::NotFound(what)) => missing.push(what),
                Err(e) => return Err(e),
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StorageError::NotFound(missing.join(", ")))
        }
    }

    // ========================================================================
    // Startup enumeration
    // ========================================================================

    fn load_nodes(&self) -> StorageResult<Vec<Node>>;

    fn load_edges(&self) -> StorageResult<Vec<Edge>>;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release underlying resources. Calling it again is a no-op.
    fn close(&self) -> StorageResult<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn save_node(&self, node: &Node) -> StorageResult<()> { (**self).save_node(node) }
    fn save_edge(&self, edge: &Edge) -> StorageResult<()> { (**self).save_edge(edge) }
    fn delete_node(&self, id: &str) -> StorageResult<()> { (**self).delete_node(id) }
    fn delete_edge(&self, key: &EdgeKey) -> StorageResult<()> { (**self).delete_edge(key) }
    fn delete_nodes(&self, ids: &[&str]) -> StorageResult<()> { (**self).delete_nodes(ids) }
    fn delete_edges(&self, keys: &[EdgeKey]) -> StorageResult<()> { (**self).delete_edges(keys) }
    fn load_nodes(&self) -> StorageResult<Vec<Node>> { (**self).load_nodes() }
    fn load_edges(&self) -> StorageResult<Vec<Edge>> { (**self).load_edges() }
    fn close(&self) -> StorageResult<()> { (**self).close() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_memory() {
        assert_eq!(BackendConfig::default(), BackendConfig::Memory);
    }

    #[test]
    fn test_config_from_json() {
        let config: BackendConfig = serde_json::from_str(r#"{"kind": "memory"}"#).unwrap();
        assert_eq!(config, BackendConfig::Memory);
    }

    #[cfg(feature = "redb")]
    #[test]
    fn test_redb_config_from_json() {
        let config: BackendConfig =
            serde_json::from_str(r#"{"kind": "redb", "path": "/tmp/graph.redb"}"#).unwrap();
        assert_eq!(
            config,
            BackendConfig::Redb { path: std::path::PathBuf::from("/tmp/graph.redb") }
        );
    }

    #[test]
    fn test_open_memory_backend() {
        let backend = open_backend(&BackendConfig::Memory).unwrap();
        backend.save_node(&Node::new("1", "Person")).unwrap();
        assert_eq!(backend.load_nodes().unwrap().len(), 1);
    }
}
