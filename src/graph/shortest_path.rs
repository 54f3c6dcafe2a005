//! Weighted shortest path (Dijkstra) over the in-memory adjacency index.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashMap;

use crate::model::WeightedPath;
use crate::{Error, Result};
use super::GraphIndex;

// ============================================================================
// Priority queue
// ============================================================================

/// A queued value with its priority.
#[derive(Debug, Clone)]
pub struct Item<T> {
    pub value: T,
    pub priority: f64,
}

impl<T> PartialEq for Item<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority.total_cmp(&other.priority) == Ordering::Equal
    }
}

impl<T> Eq for Item<T> {}

impl<T> PartialOrd for Item<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Item<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the std max-heap pops the smallest priority first
        other.priority.total_cmp(&self.priority)
    }
}

/// Binary min-heap keyed by `f64` priority.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Item<T>>,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self { heap: BinaryHeap::new() }
    }

    pub fn push(&mut self, value: T, priority: f64) {
        self.heap.push(Item { value, priority });
    }

    /// Remove and return the item with the smallest priority.
    pub fn pop(&mut self) -> Option<Item<T>> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&Item<T>> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Dijkstra
// ============================================================================

/// Shortest weighted path from `from` to `to` over `index`.
///
/// Callers handle `from == to` before getting here. Stale queue entries
/// (popped with a priority above the node's recorded distance) are skipped.
/// A negative weight on any edge leaving a popped node fails the whole query.
pub(crate) fn dijkstra<'a>(index: &'a GraphIndex, from: &'a str, to: &'a str) -> Result<WeightedPath> {
    if !index.nodes.contains_key(from) {
        return Err(Error::NodeNotFound(from.to_string()));
    }
    if !index.nodes.contains_key(to) {
        return Err(Error::NodeNotFound(to.to_string()));
    }

    let mut dist: HashMap<&'a str, f64> = index
        .nodes
        .keys()
        .map(|id| (id.as_str(), f64::INFINITY))
        .collect();
    let mut prev: HashMap<&'a str, &'a str> = HashMap::new();
    let mut queue = PriorityQueue::new();

    dist.insert(from, 0.0);
    queue.push(from, 0.0);

    while let Some(Item { value: current, priority }) = queue.pop() {
        if current == to {
            break;
        }

        let best = dist.get(current).copied().unwrap_or(f64::INFINITY);
        if priority > best {
            continue;
        }

        for edge in index.outgoing(current) {
            if edge.weight < 0.0 {
                return Err(Error::NegativeWeight {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    weight: edge.weight,
                });
            }

            let alt = best + edge.weight;
            let neighbor = edge.to.as_str();
            if alt < dist.get(neighbor).copied().unwrap_or(f64::INFINITY) {
                dist.insert(neighbor, alt);
                prev.insert(neighbor, current);
                queue.push(neighbor, alt);
            }
        }
    }

    let cost = dist.get(to).copied().unwrap_or(f64::INFINITY);
    if cost.is_infinite() {
        return Err(Error::NoPath { from: from.to_string(), to: to.to_string() });
    }

    let mut nodes = vec![to.to_string()];
    let mut cursor = to;
    while let Some(&p) = prev.get(cursor) {
        nodes.push(p.to_string());
        cursor = p;
    }
    nodes.reverse();

    Ok(WeightedPath { nodes, cost })
}
