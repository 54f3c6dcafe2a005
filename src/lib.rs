//! # propgraph: Embeddable Property Graph Store
//!
//! Labeled nodes and labeled, weighted edges held in memory, persisted
//! write-through to a pluggable key-value backend.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StorageBackend` is the contract between the graph store and durability
//! 2. **Plain DTOs**: `Node`, `Edge`, `Value` cross all boundaries
//! 3. **One lock**: a single `RwLock` guards the whole index so cross-entity invariants hold
//! 4. **Persist, then publish**: memory changes only after the backend accepted the write
//!
//! ## Quick Start
//!
//! ```rust
//! use propgraph::{GraphStore, MemoryBackend, PropertyMap, Value};
//!
//! # fn main() -> propgraph::Result<()> {
//! let graph = GraphStore::new(MemoryBackend::new());
//!
//! let mut props = PropertyMap::new();
//! props.insert("name".into(), Value::from("Ada"));
//! graph.add_node("1", "Person", props)?;
//! graph.add_node("2", "Person", PropertyMap::new())?;
//! graph.add_edge("1", "2", "knows", 1.0, PropertyMap::new())?;
//!
//! assert_eq!(graph.search_edges("1->*:knows")?.len(), 1);
//! assert_eq!(graph.find_shortest_path_weighted("1", "2")?, vec!["1", "2"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Memory | (default) | Shared in-memory maps, fault injection for tests |
//! | Redb | `redb` (default) | One record per entity in a redb file |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod graph;
pub mod index;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, Edge, EdgeKey, WeightedPath, Value, PropertyMap,
    NodeId,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{
    StorageBackend, StorageError, BackendConfig, MemoryBackend,
};
#[cfg(feature = "redb")]
pub use storage::RedbBackend;

// ============================================================================
// Re-exports: Graph
// ============================================================================

pub use graph::{GraphStore, EdgePattern};
pub use index::PropertyFilter;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node with ID {0} already exists")]
    DuplicateNode(NodeId),

    #[error("edge {0} already exists")]
    DuplicateEdge(String),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("no edge matches {0}")]
    EdgeNotFound(String),

    #[error("negative weight edge detected from {from} to {to}: {weight}")]
    NegativeWeight { from: NodeId, to: NodeId, weight: f64 },

    #[error("no path found from {from} to {to}")]
    NoPath { from: NodeId, to: NodeId },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("edge weight must be finite, got {0}")]
    InvalidWeight(f64),

    #[error("property {0} holds a non-finite float")]
    NonFiniteProperty(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, Error>;
