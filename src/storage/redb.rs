//! # redb-backed storage
//!
//! Durable persistence gateway over a redb database file.
//!
//! Two tables hold one record per entity:
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `nodes` | node id | JSON-encoded `Node` |
//! | `edges` | JSON-encoded `EdgeKey` | JSON-encoded `Edge` |
//!
//! Edge records are keyed by the JSON form of the `(from, to, label)` triple
//! rather than the display key, which is ambiguous once an id contains `:`
//! or `->`.
//!
//! Every write is its own committed transaction; batch deletes share one.
//! Values are JSON so property kinds (int vs float vs string, nested
//! lists/maps) survive the round trip.

use std::path::{Path, PathBuf};

use ::redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::model::{Edge, EdgeKey, Node};
use super::{StorageBackend, StorageError, StorageResult};

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

/// Node id -> JSON `Node`
const NODES: Table = TableDefinition::new("nodes");

/// JSON `EdgeKey` -> JSON `Edge`
const EDGES: Table = TableDefinition::new("edges");

fn backend_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(e.to_string())
}

fn edge_record_key(key: &EdgeKey) -> StorageResult<String> {
    Ok(serde_json::to_string(key)?)
}

/// A persistence gateway backed by a redb file.
pub struct RedbBackend {
    /// `None` once closed.
    db: RwLock<Option<Database>>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .field("open", &self.db.read().is_some())
            .finish()
    }
}

impl RedbBackend {
    /// Open or create the database at `path` and make sure both tables exist.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "opening redb storage");

        let db = Database::create(&path).map_err(backend_err)?;
        {
            let write_txn = db.begin_write().map_err(backend_err)?;
            write_txn.open_table(NODES).map_err(backend_err)?;
            write_txn.open_table(EDGES).map_err(backend_err)?;
            write_txn.commit().map_err(backend_err)?;
        }

        Ok(Self { db: RwLock::new(Some(db)), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the open database.
    fn with_db<T>(&self, f: impl FnOnce(&Database) -> StorageResult<T>) -> StorageResult<T> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StorageError::Closed)?;
        f(db)
    }

    fn put(&self, table: Table, key: &str, bytes: &[u8]) -> StorageResult<()> {
        self.with_db(|db| {
            let write_txn = db.begin_write().map_err(backend_err)?;
            {
                let mut t = write_txn.open_table(table).map_err(backend_err)?;
                t.insert(key, bytes).map_err(backend_err)?;
            }
            write_txn.commit().map_err(backend_err)
        })
    }

    /// Remove every key in one transaction. Missing keys do not stop the
    /// others from being removed; they are reported after the commit.
    fn remove_all(
        &self,
        table: Table,
        kind: &str,
        keys: &[String],
    ) -> StorageResult<()> {
        let missing = self.with_db(|db| {
            let write_txn = db.begin_write().map_err(backend_err)?;
            let mut missing = Vec::new();
            {
                let mut t = write_txn.open_table(table).map_err(backend_err)?;
                for key in keys {
                    if t.remove(key.as_str()).map_err(backend_err)?.is_none() {
                        missing.push(format!("{kind} {key}"));
                    }
                }
            }
            write_txn.commit().map_err(backend_err)?;
            Ok(missing)
        })?;

        if missing.is_empty() {
            Ok(())
        } else {
            debug!(?missing, "batch delete skipped missing keys");
            Err(StorageError::NotFound(missing.join(", ")))
        }
    }

    fn scan<T: serde::de::DeserializeOwned>(
        &self,
        table: Table,
    ) -> StorageResult<Vec<T>> {
        self.with_db(|db| {
            let read_txn = db.begin_read().map_err(backend_err)?;
            let t = read_txn.open_table(table).map_err(backend_err)?;
            let mut out = Vec::new();
            for entry in t.iter().map_err(backend_err)? {
                let (_, value) = entry.map_err(backend_err)?;
                out.push(serde_json::from_slice(value.value())?);
            }
            Ok(out)
        })
    }
}

impl StorageBackend for RedbBackend {
    fn save_node(&self, node: &Node) -> StorageResult<()> {
        let bytes = serde_json::to_vec(node)?;
        self.put(NODES, &node.id, &bytes)
    }

    fn save_edge(&self, edge: &Edge) -> StorageResult<()> {
        let bytes = serde_json::to_vec(edge)?;
        self.put(EDGES, &edge_record_key(&edge.key())?, &bytes)
    }

    fn delete_node(&self, id: &str) -> StorageResult<()> {
        self.remove_all(NODES, "node", &[id.to_string()])
    }

    fn delete_edge(&self, key: &EdgeKey) -> StorageResult<()> {
        self.remove_all(EDGES, "edge", &[edge_record_key(key)?])
    }

    fn delete_nodes(&self, ids: &[&str]) -> StorageResult<()> {
        let keys: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        self.remove_all(NODES, "node", &keys)
    }

    fn delete_edges(&self, keys: &[EdgeKey]) -> StorageResult<()> {
        let keys = keys.iter().map(edge_record_key).collect::<StorageResult<Vec<_>>>()?;
        self.remove_all(EDGES, "edge", &keys)
    }

    fn load_nodes(&self) -> StorageResult<Vec<Node>> {
        self.scan(NODES)
    }

    fn load_edges(&self) -> StorageResult<Vec<Edge>> {
        self.scan(EDGES)
    }

    fn close(&self) -> StorageResult<()> {
        if self.db.write().take().is_some() {
            info!(path = %self.path.display(), "closed redb storage");
        }
        Ok(())
    }
}
