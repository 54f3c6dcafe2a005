//! Property tests over random operation sequences, against memory and redb storage.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use propgraph::storage::StorageBackend;
use propgraph::{Edge, Error, GraphStore, MemoryBackend, Node, PropertyMap, Value};

#[derive(Debug, Clone)]
enum Operation {
    AddNode { id: String, props: BTreeMap<String, Value> },
    AddEdge { from: String, to: String, label: String, weight: f64 },
    DeleteNode { id: String },
    DeleteEdge { from: String, to: String, label: String },
}

const PLAIN_IDS: &[&str] = &["a", "b", "c", "d", "e"];
const PLAIN_LABELS: &[&str] = &["knows", "likes"];

/// Ids and labels whose display keys collide, e.g. `a->b:c:d`.
const TRICKY_IDS: &[&str] = &["a", "b", "b:c", "a->b", ":", "c"];
const TRICKY_LABELS: &[&str] = &["d", "c:d", "->", ""];

/// Floats are unrestricted, NaN and infinities included.
fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_map(Value::Float),
        prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(f64::NEG_INFINITY)]
            .prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::List),
            prop::collection::hash_map("[a-z]{1,3}", inner, 0..3).prop_map(Value::Map),
        ]
    })
}

fn arb_operation_over(
    ids: &'static [&'static str],
    labels: &'static [&'static str],
) -> impl Strategy<Value = Operation> {
    let id = move || prop::sample::select(ids).prop_map(str::to_string);
    let label = move || prop::sample::select(labels).prop_map(str::to_string);
    prop_oneof![
        (id(), prop::collection::btree_map("[a-z]{1,4}", arb_value(), 0..=3))
            .prop_map(|(id, props)| Operation::AddNode { id, props }),
        (id(), id(), label(), 0.0f64..10.0)
            .prop_map(|(from, to, label, weight)| Operation::AddEdge { from, to, label, weight }),
        id().prop_map(|id| Operation::DeleteNode { id }),
        (id(), id(), label()).prop_map(|(from, to, label)| Operation::DeleteEdge { from, to, label }),
    ]
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    arb_operation_over(PLAIN_IDS, PLAIN_LABELS)
}

fn snapshot<B: StorageBackend>(g: &GraphStore<B>) -> (Vec<Node>, Vec<Edge>) {
    let mut edges = g.search_edges("*->*:*").unwrap();
    edges.sort_by_key(Edge::key);
    (g.nodes(), edges)
}

fn apply<B: StorageBackend>(g: &GraphStore<B>, op: Operation) -> Result<(), Error> {
    match op {
        Operation::AddNode { id, props } => {
            g.add_node(id, "N", props.into_iter().collect::<PropertyMap>())
        }
        Operation::AddEdge { from, to, label, weight } => {
            g.add_edge(&from, &to, label, weight, PropertyMap::new())
        }
        Operation::DeleteNode { id } => g.delete_node(&id),
        Operation::DeleteEdge { from, to, label } => g.delete_edge(&from, &to, &label).map(|_| ()),
    }
}

fn all_finite(g: &GraphStore<impl StorageBackend>) -> bool {
    g.nodes()
        .iter()
        .flat_map(|n| n.properties.values())
        .all(Value::is_finite)
}

proptest! {
    #[test]
    fn prop_restart_reproduces_surviving_graph(ops in prop::collection::vec(arb_operation(), 1..60)) {
        let backend = MemoryBackend::new();
        let g = GraphStore::new(backend.clone());
        for op in ops {
            let _ = apply(&g, op);
        }

        let restarted = GraphStore::restore(backend).unwrap();
        prop_assert_eq!(snapshot(&restarted), snapshot(&g));
    }

    #[test]
    fn prop_no_dangling_edges(ops in prop::collection::vec(arb_operation(), 1..60)) {
        let g = GraphStore::new(MemoryBackend::new());
        for op in ops {
            let _ = apply(&g, op);
        }

        let ids: BTreeSet<String> = g.nodes().into_iter().map(|n| n.id).collect();
        for edge in g.search_edges("*->*:*").unwrap() {
            prop_assert!(ids.contains(&edge.from));
            prop_assert!(ids.contains(&edge.to));
        }
    }

    #[test]
    fn prop_second_add_is_duplicate(
        id in "[a-z]{1,6}",
        first in arb_value(),
        second in arb_value(),
    ) {
        let g = GraphStore::new(MemoryBackend::new());
        let mut p = PropertyMap::new();
        p.insert("v".into(), first.clone());
        let added = g.add_node(id.as_str(), "N", p);
        if !first.is_finite() {
            prop_assert!(matches!(added, Err(Error::NonFiniteProperty(_))));
            prop_assert_eq!(g.node_count(), 0);
            return Ok(());
        }
        added.unwrap();

        let mut q = PropertyMap::new();
        q.insert("v".into(), second.clone());
        let again = g.add_node(id.as_str(), "M", q);
        if second.is_finite() {
            prop_assert!(matches!(again, Err(Error::DuplicateNode(_))));
        } else {
            prop_assert!(matches!(again, Err(Error::NonFiniteProperty(_))));
        }

        let node = g.get_node(&id).unwrap();
        prop_assert_eq!(node.label.as_str(), "N");
        prop_assert_eq!(node.get("v"), Some(&first));
    }

    #[test]
    fn prop_failed_write_changes_nothing(
        ops in prop::collection::vec(arb_operation(), 1..30),
        failing in arb_operation(),
    ) {
        let g = GraphStore::new(MemoryBackend::new());
        for op in ops {
            let _ = apply(&g, op);
        }
        let before = snapshot(&g);

        g.backend().fail_after(0);
        let _ = apply(&g, failing);
        prop_assert_eq!(snapshot(&g), before);
    }
}

#[cfg(feature = "redb")]
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_redb_reopen_reproduces_surviving_graph(
        ops in prop::collection::vec(arb_operation_over(TRICKY_IDS, TRICKY_LABELS), 1..40),
    ) {
        use propgraph::RedbBackend;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prop.redb");

        let before = {
            let g = GraphStore::restore(RedbBackend::open(&path).unwrap()).unwrap();
            for op in ops {
                let _ = apply(&g, op);
            }
            prop_assert!(all_finite(&g));
            let snap = snapshot(&g);
            g.close().unwrap();
            snap
        };

        let reopened = GraphStore::restore(RedbBackend::open(&path).unwrap());
        prop_assert!(reopened.is_ok(), "reopen failed: {:?}", reopened.as_ref().err());
        let reopened = reopened.unwrap();
        prop_assert_eq!(snapshot(&reopened), before);
    }
}
